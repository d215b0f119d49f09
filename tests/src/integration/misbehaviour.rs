//! # Misbehaviour Scenarios
//!
//! Peers sending corrupt frames or invalid blocks are banned by address and
//! refused on reconnect, while honest connections carry on.

#[cfg(test)]
mod tests {
    use kc_04_blockchain::test_utils::{mine_next, test_blockchain};
    use kc_05_wire_protocol::{Message, MessageFactory, RejectCode};
    use kc_06_consensus_agent::{AgentState, CloseReason};
    use shared_types::ErrorKind;

    use crate::integration::network::{connect, node, RawPeer, MINER_A};

    #[tokio::test]
    async fn test_corrupt_frame_bans_the_address() {
        let honest = node("honest");
        let (mut mallory, _handle, task) = RawPeer::attach(&honest, "mallory");
        mallory
            .handshake(&honest, honest.blockchain().genesis_hash())
            .await;

        let mut frame = MessageFactory::encode(&Message::Ping(7));
        let last = frame.len() - 1;
        frame[last] ^= 0xFF;
        mallory.send_raw(frame).await;
        mallory.closed().await;

        assert_eq!(
            task.await.unwrap(),
            CloseReason::Misbehaviour(ErrorKind::CorruptMessage)
        );
        assert!(honest.bans().is_banned(&"mallory".into()));
        assert_eq!(
            honest.bans().entry(&"mallory".into()).unwrap().reason,
            ErrorKind::CorruptMessage
        );
    }

    #[tokio::test]
    async fn test_banned_address_is_refused_on_reconnect() {
        let honest = node("honest");
        honest.bans().ban(&"mallory".into(), 3_600, ErrorKind::InvalidBlock);

        let (mut mallory, _handle, task) = RawPeer::attach(&honest, "mallory");
        assert_eq!(task.await.unwrap(), CloseReason::Banned);
        assert_eq!(mallory.recv().await, None);

        // Other addresses are still welcome.
        let (mut carol, handle, _task) = RawPeer::attach(&honest, "carol");
        carol
            .handshake(&honest, honest.blockchain().genesis_hash())
            .await;
        assert_ne!(handle.state(), AgentState::Closed);
    }

    #[tokio::test]
    async fn test_invalid_block_bans_sender_but_not_neighbours() {
        let honest = node("honest");
        let neighbour = node("neighbour");
        let link = connect(&honest, &neighbour);
        link.established().await;

        let (mut mallory, _handle, task) = RawPeer::attach(&honest, "mallory");
        mallory
            .handshake(&honest, honest.blockchain().genesis_hash())
            .await;

        let mut block = mine_next(&test_blockchain(), MINER_A).await;
        while block.header.verify_proof_of_work() {
            block.header.nonce = block.header.nonce.wrapping_add(1);
        }
        let hash = block.hash();
        mallory.send(&Message::block(block)).await;

        let reject = loop {
            match mallory.recv().await {
                Some(Message::Reject(reject)) => break reject,
                Some(_) => continue,
                None => panic!("closed without a reject"),
            }
        };
        assert_eq!(reject.code, RejectCode::Invalid);
        mallory.closed().await;

        assert_eq!(
            task.await.unwrap(),
            CloseReason::Misbehaviour(ErrorKind::InvalidBlock)
        );
        assert!(honest.bans().is_banned(&"mallory".into()));
        assert!(!honest.blockchain().contains(&hash).await.unwrap());
        assert!(!neighbour.bans().is_banned(&"honest".into()));
        assert_eq!(link.a.state(), AgentState::Established);
        assert_eq!(link.b.state(), AgentState::Established);
    }
}
