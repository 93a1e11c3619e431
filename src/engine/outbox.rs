use super::event::Event;
use crate::room::RoomId;
use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::mpsc::unbounded_channel;

/// Asynchronous fan-out seam for side effects the core must not own:
/// wallet settlement on `Transaction` events, profile statistics, audit.
/// Published events are already persisted facts; consumers may lag.
#[async_trait]
pub trait Outbox: Send + Sync {
    async fn publish(&self, room: &str, event: &Event);
}

#[async_trait]
impl Outbox for super::broadcast::Silent {
    async fn publish(&self, _room: &str, _event: &Event) {}
}

/// Channel-backed outbox; the consumer half drains into whatever the
/// deployment wires up (a queue, the ledger service, a test).
pub struct Spool {
    tx: UnboundedSender<(RoomId, Event)>,
}

impl Spool {
    pub fn pair() -> (Self, UnboundedReceiver<(RoomId, Event)>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Outbox for Spool {
    async fn publish(&self, room: &str, event: &Event) {
        self.tx
            .send((room.to_string(), event.clone()))
            .map(|_| ())
            .inspect_err(|_| log::warn!("outbox consumer went away, dropping {}", event.name))
            .ok();
    }
}
