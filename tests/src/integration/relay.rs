//! # Relay Scenarios
//!
//! Blocks and transactions travel hop by hop: every node announces what it
//! accepts to its subscribed peers, which fetch it with `GetData`.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use kc_01_block_model::Transaction;
    use kc_04_blockchain::test_utils::extend;
    use kc_06_consensus_agent::Mempool;
    use shared_types::Address;

    use crate::integration::network::{connect, node, wait_for_head, wait_until, MINER_A, MINER_B};

    #[tokio::test]
    async fn test_block_crosses_a_line_of_nodes() {
        let (a, b, c) = (node("a"), node("b"), node("c"));
        let ab = connect(&a, &b);
        let bc = connect(&b, &c);
        ab.established().await;
        bc.established().await;

        let mined = extend(a.blockchain(), 1, MINER_A).await;
        wait_for_head(&c, mined[0].hash()).await;
        assert_eq!(b.blockchain().head_hash(), mined[0].hash());

        // And back the other way.
        let mined = extend(c.blockchain(), 2, MINER_B).await;
        wait_for_head(&a, mined[1].hash()).await;
        assert_eq!(a.blockchain().height(), 4);
    }

    #[tokio::test]
    async fn test_transaction_crosses_a_line_of_nodes() {
        let (a, b, c) = (node("a"), node("b"), node("c"));
        let ab = connect(&a, &b);
        let bc = connect(&b, &c);
        ab.established().await;
        bc.established().await;

        let tx = Transaction::new(Address([1; 20]), Address([2; 20]), 10, 1, 0, vec![]).unwrap();
        let hash = a.mempool().push_transaction(tx).unwrap();

        let mempool = Arc::clone(c.mempool());
        wait_until("transaction to reach c", move || mempool.contains(&hash)).await;
        assert!(b.mempool().contains(&hash));
        assert_eq!(c.mempool().len(), 1);
    }

    #[tokio::test]
    async fn test_relay_stops_at_disconnected_peer() {
        let (a, b) = (node("a"), node("b"));
        let link = connect(&a, &b);
        link.established().await;

        link.a.close();
        wait_until("agents to unregister", || a.agents().is_empty() && b.agents().is_empty())
            .await;

        extend(a.blockchain(), 1, MINER_A).await;
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        assert_eq!(b.blockchain().height(), 1);
    }
}
