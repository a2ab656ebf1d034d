//! Change notification for stores.
//!
//! Each store owns a [`ChangeNotifier`]; subscribers receive a
//! `watch::Receiver<u64>` whose value is a revision counter bumped on every
//! committed mutation. Renderers await `changed()` and re-read the store.

use tokio::sync::watch;

/// Revision counter broadcast to store subscribers.
#[derive(Debug)]
pub struct ChangeNotifier {
    tx: watch::Sender<u64>,
}

impl ChangeNotifier {
    /// Create a notifier at revision 0.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx }
    }

    /// Bump the revision and wake subscribers.
    pub fn notify(&self) {
        self.tx.send_modify(|revision| *revision = revision.wrapping_add(1));
    }

    /// Subscribe to revision changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }

    /// Current revision.
    #[must_use]
    pub fn revision(&self) -> u64 {
        *self.tx.borrow()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_sees_change() {
        let notifier = ChangeNotifier::new();
        let mut rx = notifier.subscribe();
        assert!(!rx.has_changed().unwrap());

        notifier.notify();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 1);
        assert_eq!(notifier.revision(), 1);
    }

    #[test]
    fn test_notify_without_subscribers() {
        let notifier = ChangeNotifier::default();
        notifier.notify();
        notifier.notify();
        assert_eq!(notifier.revision(), 2);
    }
}
