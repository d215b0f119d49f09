//! # Sync Scenarios
//!
//! A node joining late catches up over `GetBlocks`/`GetData` rounds, and
//! nodes that mined apart converge on the heavier chain.

#[cfg(test)]
mod tests {
    use kc_04_blockchain::test_utils::extend;
    use node_runtime::{NodeConfig, NodeContext};

    use crate::integration::network::{connect, node, wait_for_head, MINER_A, MINER_B};

    #[tokio::test]
    async fn test_late_node_catches_up() {
        let a = node("a");
        let b = node("b");
        extend(a.blockchain(), 6, MINER_A).await;

        let link = connect(&a, &b);
        link.established().await;

        assert_eq!(b.blockchain().head_hash(), a.blockchain().head_hash());
        assert_eq!(b.blockchain().height(), 7);
        assert_eq!(b.blockchain().total_work(), a.blockchain().total_work());
    }

    #[tokio::test]
    async fn test_sync_spans_several_rounds() {
        let mut config = NodeConfig::for_testing();
        config.agent.max_inv_size = 3;
        let a = node("a");
        let b = NodeContext::new(config).unwrap();
        b.start();
        extend(a.blockchain(), 10, MINER_A).await;

        let link = connect(&a, &b);
        link.established().await;
        assert_eq!(b.blockchain().head_hash(), a.blockchain().head_hash());
    }

    #[tokio::test]
    async fn test_nodes_converge_on_heavier_chain() {
        let a = node("a");
        let b = node("b");
        extend(a.blockchain(), 2, MINER_A).await;
        let heavier = extend(b.blockchain(), 4, MINER_B).await;
        let heavier_head = heavier.last().unwrap().hash();

        let link = connect(&a, &b);
        link.established().await;
        wait_for_head(&a, heavier_head).await;

        assert_eq!(b.blockchain().head_hash(), heavier_head);
        assert_eq!(a.blockchain().total_work(), b.blockchain().total_work());
        // Height 2 now holds `b`'s block.
        let at_two = a.blockchain().get_block_at(2).await.unwrap().unwrap();
        assert_eq!(at_two.hash(), heavier[0].hash());
    }
}
