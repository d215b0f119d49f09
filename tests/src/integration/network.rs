//! Test network fixtures.

use std::time::Duration;

use kc_05_wire_protocol::{
    Message, MessageFactory, Services, Subscription, VersionMessage, CHALLENGE_SIZE,
    PROTOCOL_VERSION,
};
use kc_06_consensus_agent::{
    AgentHandle, AgentState, CloseReason, MemoryChannel, PeerChannel, SyncMode,
};
use node_runtime::{NodeConfig, NodeContext, NodeIdentity};
use shared_types::{Address, Hash};
use tokio::task::JoinHandle;

pub const MINER_A: Address = Address([0xA1; 20]);
pub const MINER_B: Address = Address([0xB2; 20]);

const WAIT: Duration = Duration::from_secs(15);

/// Full node on the testing network.
pub fn node(name: &str) -> NodeContext {
    let config = NodeConfig {
        identity: NodeIdentity { name: name.into() },
        ..NodeConfig::for_testing()
    };
    let context = NodeContext::new(config).unwrap();
    context.start();
    context
}

/// Light node on the testing network.
pub fn light_node(name: &str) -> NodeContext {
    let mut config = NodeConfig {
        identity: NodeIdentity { name: name.into() },
        ..NodeConfig::for_testing()
    };
    config.agent.sync_mode = SyncMode::Light;
    let context = NodeContext::new(config).unwrap();
    context.start();
    context
}

/// Both ends of a connection between two nodes.
pub struct Link {
    /// `a`'s agent facing `b`
    pub a: AgentHandle,
    pub a_task: JoinHandle<CloseReason>,
    /// `b`'s agent facing `a`
    pub b: AgentHandle,
    pub b_task: JoinHandle<CloseReason>,
}

impl Link {
    pub async fn established(&self) {
        let (a, b) = (self.a.clone(), self.b.clone());
        wait_until("link established", move || {
            a.state() == AgentState::Established && b.state() == AgentState::Established
        })
        .await;
        // Each side's Subscribe may still be queued behind its sync.
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

/// Connect `a` and `b`, naming each by the other's identity.
pub fn connect(a: &NodeContext, b: &NodeContext) -> Link {
    let (a_end, b_end) = MemoryChannel::pair(
        a.config().identity.name.as_str().into(),
        b.config().identity.name.as_str().into(),
    );
    let (a_handle, a_task) = a.connect(a_end);
    let (b_handle, b_task) = b.connect(b_end);
    Link {
        a: a_handle,
        a_task,
        b: b_handle,
        b_task,
    }
}

/// Poll `condition` until it holds.
pub async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let polled = tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(polled.is_ok(), "timed out waiting for {what}");
}

/// Wait for `node` to adopt `head`.
pub async fn wait_for_head(node: &NodeContext, head: Hash) {
    let chain = std::sync::Arc::clone(node.blockchain());
    wait_until("head to propagate", move || chain.head_hash() == head).await;
}

/// Raw end of a connection, driven by the test instead of an agent.
pub struct RawPeer {
    pub channel: MemoryChannel,
}

impl RawPeer {
    /// Attach a raw peer named `name` to `node`.
    pub fn attach(node: &NodeContext, name: &str) -> (Self, AgentHandle, JoinHandle<CloseReason>) {
        let (node_end, raw_end) =
            MemoryChannel::pair(node.config().identity.name.as_str().into(), name.into());
        let (handle, task) = node.connect(node_end);
        (Self { channel: raw_end }, handle, task)
    }

    pub async fn send(&mut self, message: &Message) {
        self.send_raw(MessageFactory::encode(message)).await;
    }

    pub async fn send_raw(&mut self, frame: Vec<u8>) {
        self.channel.send(frame).await.unwrap();
    }

    /// Next message, `None` once the node closed the connection.
    pub async fn recv(&mut self) -> Option<Message> {
        let frame = tokio::time::timeout(WAIT, self.channel.recv())
            .await
            .expect("node answers in time")?;
        Some(MessageFactory::parse(&frame).unwrap())
    }

    /// Complete the handshake, claiming `head` as our chain head.
    pub async fn handshake(&mut self, node: &NodeContext, head: Hash) {
        assert!(matches!(self.recv().await, Some(Message::Version(_))));
        let version = VersionMessage::new(
            PROTOCOL_VERSION,
            Services::FULL,
            node.blockchain().genesis_hash(),
            head,
            [0x5A; CHALLENGE_SIZE],
            Some("raw-peer".into()),
        )
        .unwrap();
        self.send(&Message::Version(version)).await;
        self.send(&Message::VerAck).await;
        assert_eq!(self.recv().await, Some(Message::VerAck));
        assert!(matches!(self.recv().await, Some(Message::Subscribe(_))));
        self.send(&Message::Subscribe(Subscription::Any)).await;
    }

    /// Drain until the node closes the connection.
    pub async fn closed(&mut self) {
        while self.recv().await.is_some() {}
    }
}
