//! Fan-out of watch events to subscriber queues.

use tokio::sync::mpsc;

use super::types::WatchEvent;

/// Set of unbounded subscriber queues.
///
/// Publishing never blocks; subscribers whose receiver was dropped are
/// pruned on the next publish.
#[derive(Debug, Default)]
pub(crate) struct Outlet {
    senders: Vec<mpsc::UnboundedSender<WatchEvent>>,
}

impl Outlet {
    pub(crate) fn subscribe(&mut self) -> mpsc::UnboundedReceiver<WatchEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.push(tx);
        rx
    }

    pub(crate) fn publish(&mut self, event: &WatchEvent) {
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Drop every sender so receivers end once drained.
    pub(crate) fn close(&mut self) {
        self.senders.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::StopReason;
    use std::path::PathBuf;

    fn stopped(id: &str) -> WatchEvent {
        WatchEvent::TailStopped {
            id: id.to_string(),
            path: PathBuf::from("/tmp/a.log"),
            reason: StopReason::Requested,
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let mut outlet = Outlet::default();
        let mut rx1 = outlet.subscribe();
        let mut rx2 = outlet.subscribe();

        outlet.publish(&stopped("w1"));

        assert_eq!(rx1.recv().await.unwrap().watch_id(), "w1");
        assert_eq!(rx2.recv().await.unwrap().watch_id(), "w1");
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let mut outlet = Outlet::default();
        let rx = outlet.subscribe();
        let _kept = outlet.subscribe();
        drop(rx);

        outlet.publish(&stopped("w1"));
        assert_eq!(outlet.senders.len(), 1);
    }

    #[tokio::test]
    async fn test_close_ends_receivers() {
        let mut outlet = Outlet::default();
        let mut rx = outlet.subscribe();
        outlet.publish(&stopped("w1"));
        outlet.close();

        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
    }
}
