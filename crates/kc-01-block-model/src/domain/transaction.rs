//! Transactions as carried in block bodies
//!
//! Only the stateless shape is checked here. Balances and nonces belong to
//! the account tree; signature verification is an external collaborator.

use serde::{Deserialize, Serialize};
use shared_types::{
    Address, CodecError, CodecResult, Decode, Encode, Hash, SerialReader, SerialWriter,
};

use crate::error::{BlockError, BlockResult};

/// Maximum length of the free-form data field
pub const TRANSACTION_DATA_MAX: usize = u8::MAX as usize;

/// A value transfer between two accounts
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transaction {
    sender: Address,
    recipient: Address,
    value: u64,
    fee: u64,
    nonce: u32,
    data: Vec<u8>,
}

impl Transaction {
    /// Build a transaction, enforcing the stateless rules.
    pub fn new(
        sender: Address,
        recipient: Address,
        value: u64,
        fee: u64,
        nonce: u32,
        data: Vec<u8>,
    ) -> BlockResult<Self> {
        if value == 0 {
            return Err(BlockError::InvalidTransaction("zero value".into()));
        }
        if sender == recipient {
            return Err(BlockError::InvalidTransaction(
                "sender equals recipient".into(),
            ));
        }
        if value.checked_add(fee).is_none() {
            return Err(BlockError::InvalidTransaction("value + fee overflows".into()));
        }
        if data.len() > TRANSACTION_DATA_MAX {
            return Err(BlockError::FieldTooLong {
                field: "transaction.data",
                len: data.len(),
                max: TRANSACTION_DATA_MAX,
            });
        }
        Ok(Self {
            sender,
            recipient,
            value,
            fee,
            nonce,
            data,
        })
    }

    pub fn sender(&self) -> &Address {
        &self.sender
    }

    pub fn recipient(&self) -> &Address {
        &self.recipient
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn fee(&self) -> u64 {
        self.fee
    }

    pub fn nonce(&self) -> u32 {
        self.nonce
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Amount debited from the sender.
    pub fn total_cost(&self) -> u64 {
        self.value + self.fee
    }

    /// Identity of the transaction.
    pub fn hash(&self) -> Hash {
        Hash::digest(&self.to_bytes())
    }
}

impl Encode for Transaction {
    fn encode(&self, writer: &mut SerialWriter) {
        self.sender.encode(writer);
        self.recipient.encode(writer);
        writer.write_u64(self.value);
        writer.write_u64(self.fee);
        writer.write_u32(self.nonce);
        writer.write_var_bytes_u8(&self.data);
    }

    fn serialized_size(&self) -> usize {
        20 + 20 + 8 + 8 + 4 + 1 + self.data.len()
    }
}

impl Decode for Transaction {
    fn decode(reader: &mut SerialReader<'_>) -> CodecResult<Self> {
        let sender = Address::decode(reader)?;
        let recipient = Address::decode(reader)?;
        let value = reader.read_u64()?;
        let fee = reader.read_u64()?;
        let nonce = reader.read_u32()?;
        let data = reader.read_var_bytes_u8()?;
        Self::new(sender, recipient, value, fee, nonce, data).map_err(CodecError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Address {
        Address([1u8; 20])
    }

    fn bob() -> Address {
        Address([2u8; 20])
    }

    #[test]
    fn test_rejects_zero_value() {
        assert!(matches!(
            Transaction::new(alice(), bob(), 0, 1, 0, vec![]),
            Err(BlockError::InvalidTransaction(_))
        ));
    }

    #[test]
    fn test_rejects_self_transfer() {
        assert!(Transaction::new(alice(), alice(), 5, 1, 0, vec![]).is_err());
    }

    #[test]
    fn test_wire_size_matches_encoding() {
        let tx = Transaction::new(alice(), bob(), 10, 2, 7, b"memo".to_vec()).unwrap();
        assert_eq!(tx.serialized_size(), tx.to_bytes().len());
        assert_eq!(Transaction::from_bytes(&tx.to_bytes()).unwrap(), tx);
        assert_eq!(tx.total_cost(), 12);
    }

    #[test]
    fn test_decode_applies_stateless_rules() {
        let mut writer = SerialWriter::new();
        alice().encode(&mut writer);
        alice().encode(&mut writer);
        writer.write_u64(10);
        writer.write_u64(0);
        writer.write_u32(0);
        writer.write_var_bytes_u8(&[]);
        assert!(matches!(
            Transaction::from_bytes(writer.as_slice()),
            Err(CodecError::InvalidValue { .. })
        ));
    }
}
