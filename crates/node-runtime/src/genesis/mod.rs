//! # Genesis
//!
//! Derives the genesis block from the node configuration. Every node on a
//! network must end up with the same hash here.

use kc_01_block_model::{create_genesis_block, Block, BlockError, ConsensusPolicy, GenesisConfig};
use tracing::info;

/// Build and log the genesis block.
pub fn build_genesis(policy: &ConsensusPolicy, config: &GenesisConfig) -> Result<Block, BlockError> {
    let genesis = create_genesis_block(policy, config)?;
    info!(
        hash = %genesis.hash(),
        timestamp = genesis.header.timestamp,
        "Genesis block ready"
    );
    Ok(genesis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kc_01_block_model::test_utils::{genesis_block, test_genesis_config};

    #[test]
    fn test_same_config_same_genesis() {
        let policy = ConsensusPolicy::for_testing();
        let a = build_genesis(&policy, &test_genesis_config()).unwrap();
        let b = build_genesis(&policy, &test_genesis_config()).unwrap();
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.hash(), genesis_block(&policy).hash());
    }

    #[test]
    fn test_extra_data_changes_genesis() {
        let policy = ConsensusPolicy::for_testing();
        let other = GenesisConfig {
            extra_data: b"another network".to_vec(),
            ..test_genesis_config()
        };
        let a = build_genesis(&policy, &test_genesis_config()).unwrap();
        let b = build_genesis(&policy, &other).unwrap();
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_oversized_extra_data_is_refused() {
        let config = GenesisConfig {
            extra_data: vec![0; 256],
            ..test_genesis_config()
        };
        assert!(build_genesis(&ConsensusPolicy::for_testing(), &config).is_err());
    }
}
