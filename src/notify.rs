use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::model::Event;

const CHANNEL_CAPACITY: usize = 256;

/// Per-block broadcast of ledger events, for views that show vacancy.
#[derive(Default)]
pub struct NotifyHub {
    channels: DashMap<String, broadcast::Sender<Event>>,
}

impl NotifyHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events for `block`. Creates the channel if needed.
    pub fn subscribe(&self, block: &str) -> broadcast::Receiver<Event> {
        self.channels
            .entry(block.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// No-op if nobody is listening.
    pub fn send(&self, block: &str, event: &Event) {
        if let Some(sender) = self.channels.get(block) {
            let _ = sender.send(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    fn cancelled() -> Event {
        Event::BookingCancelled {
            id: Ulid::new(),
            cancelled_at: "2025-11-01T10:00:00".parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn subscriber_receives_block_events() {
        let hub = NotifyHub::new();
        let mut a = hub.subscribe("A");
        let mut b = hub.subscribe("B");

        let event = cancelled();
        hub.send("A", &event);

        assert_eq!(a.recv().await.unwrap(), event);
        assert!(matches!(b.try_recv(), Err(broadcast::error::TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn send_without_subscribers_is_noop() {
        let hub = NotifyHub::new();
        hub.send("Old C", &cancelled());
    }
}
