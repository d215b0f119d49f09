//! In-process transport.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::{ChannelError, PeerAddress};
use crate::ports::outbound::PeerChannel;

/// One end of an in-process frame pipe.
pub struct MemoryChannel {
    peer: PeerAddress,
    outbound: Option<mpsc::UnboundedSender<Vec<u8>>>,
    inbound: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl MemoryChannel {
    /// Connected ends. The first faces `right`, the second faces `left`.
    pub fn pair(left: PeerAddress, right: PeerAddress) -> (Self, Self) {
        let (left_tx, right_rx) = mpsc::unbounded_channel();
        let (right_tx, left_rx) = mpsc::unbounded_channel();
        (
            Self {
                peer: right,
                outbound: Some(left_tx),
                inbound: left_rx,
            },
            Self {
                peer: left,
                outbound: Some(right_tx),
                inbound: right_rx,
            },
        )
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.as_ref().map_or(true, |tx| tx.is_closed())
    }
}

#[async_trait]
impl PeerChannel for MemoryChannel {
    fn peer_address(&self) -> &PeerAddress {
        &self.peer
    }

    async fn send(&mut self, frame: Vec<u8>) -> Result<(), ChannelError> {
        let outbound = self.outbound.as_ref().ok_or(ChannelError::Closed)?;
        outbound.send(frame).map_err(|_| ChannelError::Closed)
    }

    async fn recv(&mut self) -> Option<Vec<u8>> {
        if self.outbound.is_none() {
            return None;
        }
        self.inbound.recv().await
    }

    async fn close(&mut self) {
        self.outbound = None;
        self.inbound.close();
    }
}
