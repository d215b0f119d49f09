//! Block body
//!
//! The body hash is a tree root over the miner address, the extra data and
//! every transaction in order, so the header commits to who gets paid as
//! well as to the transactions.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use shared_types::{
    Address, CodecError, CodecResult, Decode, Encode, Hash, SerialReader, SerialWriter,
};

use crate::domain::merkle::{merkle_root, TRANSACTION_ROOT_POLICY};
use crate::domain::transaction::Transaction;
use crate::error::{BlockError, BlockResult};

/// Maximum length of the miner's extra data
pub const EXTRA_DATA_MAX: usize = u8::MAX as usize;

/// Maximum number of transactions in one body
pub const TRANSACTIONS_MAX: usize = u16::MAX as usize;

/// Block body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Body {
    miner_address: Address,
    extra_data: Vec<u8>,
    transactions: Vec<Transaction>,
}

impl Body {
    pub fn new(
        miner_address: Address,
        extra_data: Vec<u8>,
        transactions: Vec<Transaction>,
    ) -> BlockResult<Self> {
        if extra_data.len() > EXTRA_DATA_MAX {
            return Err(BlockError::FieldTooLong {
                field: "body.extra_data",
                len: extra_data.len(),
                max: EXTRA_DATA_MAX,
            });
        }
        if transactions.len() > TRANSACTIONS_MAX {
            return Err(BlockError::FieldTooLong {
                field: "body.transactions",
                len: transactions.len(),
                max: TRANSACTIONS_MAX,
            });
        }
        Ok(Self {
            miner_address,
            extra_data,
            transactions,
        })
    }

    pub fn miner_address(&self) -> &Address {
        &self.miner_address
    }

    pub fn extra_data(&self) -> &[u8] {
        &self.extra_data
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Sum of transaction fees, saturating.
    pub fn total_fees(&self) -> u64 {
        self.transactions
            .iter()
            .fold(0u64, |acc, tx| acc.saturating_add(tx.fee()))
    }

    /// Commitment stored in the header.
    pub fn hash(&self) -> Hash {
        let mut leaves = Vec::with_capacity(self.transactions.len() + 2);
        leaves.push(Hash::digest(self.miner_address.as_ref()));
        leaves.push(Hash::digest(&self.extra_data));
        leaves.extend(self.transactions.iter().map(Transaction::hash));
        merkle_root(&leaves, TRANSACTION_ROOT_POLICY)
    }

    /// Root over the transactions alone.
    pub fn transaction_root(&self) -> Hash {
        let leaves: Vec<Hash> = self.transactions.iter().map(Transaction::hash).collect();
        merkle_root(&leaves, TRANSACTION_ROOT_POLICY)
    }

    /// Stateless body rules: no transaction appears twice.
    pub fn verify(&self) -> BlockResult<()> {
        let mut seen = HashSet::with_capacity(self.transactions.len());
        for tx in &self.transactions {
            let hash = tx.hash();
            if !seen.insert(hash) {
                return Err(BlockError::DuplicateTransaction(hash));
            }
        }
        Ok(())
    }
}

impl Encode for Body {
    fn encode(&self, writer: &mut SerialWriter) {
        self.miner_address.encode(writer);
        writer.write_var_bytes_u8(&self.extra_data);
        writer.write_list_u16(&self.transactions);
    }

    fn serialized_size(&self) -> usize {
        20 + 1
            + self.extra_data.len()
            + 2
            + self
                .transactions
                .iter()
                .map(Encode::serialized_size)
                .sum::<usize>()
    }
}

impl Decode for Body {
    fn decode(reader: &mut SerialReader<'_>) -> CodecResult<Self> {
        let miner_address = Address::decode(reader)?;
        let extra_data = reader.read_var_bytes_u8()?;
        let transactions = reader.read_list_u16("body.transactions", TRANSACTIONS_MAX)?;
        Self::new(miner_address, extra_data, transactions).map_err(CodecError::from)
    }
}
