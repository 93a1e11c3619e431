use super::event::Event;
use super::outcome::Outcome;
use super::outcome::StateView;
use async_trait::async_trait;

/// Push seam toward the room's subscribers. The WebSocket hub lives at the
/// edge; the core only promises ordering: for one action, the state goes
/// out first, then each event as emitted. Pushes across rooms are
/// independent.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn state(&self, room: &str, view: &StateView);

    async fn event(&self, room: &str, event: &Event);

    async fn result(&self, room: &str, outcome: &Outcome) {
        if outcome.broadcast {
            if let Some(view) = &outcome.state {
                self.state(room, view).await;
            }
        }
        for event in &outcome.events {
            self.event(room, event).await;
        }
    }
}

/// No-op sink for tests, tools, and rooms nobody watches.
pub struct Silent;

#[async_trait]
impl Broadcaster for Silent {
    async fn state(&self, _room: &str, _view: &StateView) {}
    async fn event(&self, _room: &str, _event: &Event) {}
}

#[cfg(test)]
pub mod recorder {
    use super::*;
    use std::sync::Mutex;

    /// Test double that records push order.
    #[derive(Default)]
    pub struct Recorder {
        pub log: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Broadcaster for Recorder {
        async fn state(&self, room: &str, _view: &StateView) {
            self.log.lock().unwrap().push(format!("state:{}", room));
        }
        async fn event(&self, room: &str, event: &Event) {
            self.log.lock().unwrap().push(format!("event:{}:{}", room, event.name));
        }
    }
}
