//! Ordered per-partition record sources.

use crate::error::ConsumerError;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// A record as delivered by the log transport, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub payload: Option<Vec<u8>>,
}

impl RawMessage {
    pub fn new(partition: i32, offset: i64, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            partition,
            offset,
            key: None,
            payload: Some(payload.into()),
        }
    }
}

/// The ordered stream of one partition.
///
/// `recv` yields messages in the order the transport delivers them and
/// returns `None` once the source is closed. A source that is never closed
/// simply never returns `None`.
#[async_trait]
pub trait PartitionSource: Send {
    fn partition(&self) -> i32;

    async fn recv(&mut self) -> Option<Result<RawMessage, ConsumerError>>;
}

/// In-process partition source fed through a channel.
///
/// The source closes when every sender has been dropped.
pub struct ChannelSource {
    partition: i32,
    receiver: mpsc::Receiver<RawMessage>,
}

/// Create a channel-backed source for `partition`.
pub fn channel_source(partition: i32, capacity: usize) -> (mpsc::Sender<RawMessage>, ChannelSource) {
    let (sender, receiver) = mpsc::channel(capacity);
    (
        sender,
        ChannelSource {
            partition,
            receiver,
        },
    )
}

#[async_trait]
impl PartitionSource for ChannelSource {
    fn partition(&self) -> i32 {
        self.partition
    }

    async fn recv(&mut self) -> Option<Result<RawMessage, ConsumerError>> {
        self.receiver.recv().await.map(Ok)
    }
}
