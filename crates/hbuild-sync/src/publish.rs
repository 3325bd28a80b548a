use std::sync::{Arc, Mutex};

use tokio::sync::watch;

/// Write side of a watched value that can be closed for good.
///
/// Every update and the close run under one lock, so once `close` returns no
/// update can land: subscribers see the channel closed instead.
pub(crate) struct Publisher<T> {
    sender: Arc<Mutex<Option<watch::Sender<T>>>>,
}

impl<T> Clone for Publisher<T> {
    fn clone(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
        }
    }
}

impl<T> Publisher<T> {
    pub(crate) fn new(initial: T) -> (Self, watch::Receiver<T>) {
        let (tx, rx) = watch::channel(initial);
        (
            Self {
                sender: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    /// Mutate the published value. Returns `false` once closed.
    pub(crate) fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        let guard = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        match guard.as_ref() {
            Some(tx) => {
                tx.send_modify(f);
                true
            }
            None => false,
        }
    }

    /// Drop the sender. Idempotent.
    pub(crate) fn close(&self) {
        let mut guard = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        guard.take();
    }

    /// Publish a last update and close in one step. No-op once closed.
    pub(crate) fn close_with(&self, f: impl FnOnce(&mut T)) {
        let mut guard = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(tx) = guard.take() {
            tx.send_modify(f);
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updates_until_closed() {
        let (publisher, mut rx) = Publisher::new(0u32);
        assert!(publisher.update(|v| *v = 1));
        assert_eq!(*rx.borrow_and_update(), 1);

        publisher.close();
        publisher.close();
        assert!(publisher.is_closed());
        assert!(!publisher.update(|v| *v = 2));
        assert_eq!(*rx.borrow(), 1);
        assert!(rx.has_changed().is_err());
    }

    #[test]
    fn close_with_applies_final_value_once() {
        let (publisher, rx) = Publisher::new(0u32);
        publisher.close_with(|v| *v = 9);
        publisher.close_with(|v| *v = 10);
        assert_eq!(*rx.borrow(), 9);
        assert!(publisher.is_closed());
    }
}
