//! # Light Sync Scenarios
//!
//! A light node asks a full peer for a chain proof before downloading
//! anything, and only downloads when the proof beats its own chain.

#[cfg(test)]
mod tests {
    use kc_04_blockchain::test_utils::extend;

    use crate::integration::network::{
        connect, light_node, node, wait_for_head, MINER_A, MINER_B,
    };

    #[tokio::test]
    async fn test_light_node_follows_stronger_proof() {
        let full = node("full");
        let light = light_node("light");
        let blocks = extend(full.blockchain(), 6, MINER_A).await;

        let link = connect(&full, &light);
        link.established().await;

        assert_eq!(light.blockchain().head_hash(), blocks[5].hash());
        assert_eq!(light.blockchain().height(), 7);
        assert_eq!(light.blockchain().total_work(), full.blockchain().total_work());
    }

    #[tokio::test]
    async fn test_light_node_keeps_heavier_chain() {
        let full = node("full");
        let light = light_node("light");
        extend(full.blockchain(), 2, MINER_A).await;
        let own = extend(light.blockchain(), 4, MINER_B).await;
        let own_head = own[3].hash();

        let link = connect(&full, &light);
        link.established().await;
        assert_eq!(light.blockchain().head_hash(), own_head);

        // The full side still syncs the light node's heavier chain.
        wait_for_head(&full, own_head).await;
    }

    #[tokio::test]
    async fn test_light_node_relays_after_sync() {
        let full = node("full");
        let light = light_node("light");
        extend(full.blockchain(), 3, MINER_A).await;
        let link = connect(&full, &light);
        link.established().await;

        let mined = extend(full.blockchain(), 1, MINER_A).await;
        wait_for_head(&light, mined[0].hash()).await;
        assert_eq!(light.blockchain().height(), 5);
    }
}
