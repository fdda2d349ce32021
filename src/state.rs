use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rand::Rng;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::storage::Storage;

/// Change-bus capacity. Signals carry no payload, so a receiver that lags
/// and skips ahead observes the same thing as one coalesced notification.
const CHANGE_BUS_CAPACITY: usize = 16;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Storage>,
    pub control: Control,
}

/// Current read/write permission flags, as reported by `GET /permissions`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Permissions {
    pub read: bool,
    pub write: bool,
}

/// Operator-facing handle over the mutable server state: the session PIN,
/// the permission flags, the transient busy indicator and the change bus.
///
/// Cheap to clone; a desktop shell keeps one clone while the router holds
/// another. Flag reads happen on every request and always observe the
/// latest write.
#[derive(Clone)]
pub struct Control {
    shared: Arc<Shared>,
}

struct Shared {
    pin: RwLock<String>,
    read_allowed: AtomicBool,
    write_allowed: AtomicBool,
    busy: AtomicBool,
    changes: broadcast::Sender<()>,
}

impl Control {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUS_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                pin: RwLock::new(generate_pin()),
                read_allowed: AtomicBool::new(true),
                write_allowed: AtomicBool::new(true),
                busy: AtomicBool::new(false),
                changes,
            }),
        }
    }

    pub fn pin(&self) -> String {
        self.shared.pin.read().clone()
    }

    /// Replaces the PIN with a fresh one, atomically invalidating every
    /// outstanding session cookie. The new PIN always differs from the old.
    pub fn regenerate_pin(&self) -> String {
        let mut current = self.shared.pin.write();
        let mut pin = generate_pin();
        while pin == *current {
            pin = generate_pin();
        }
        *current = pin.clone();
        pin
    }

    pub fn permissions(&self) -> Permissions {
        Permissions {
            read: self.read_allowed(),
            write: self.write_allowed(),
        }
    }

    pub fn read_allowed(&self) -> bool {
        self.shared.read_allowed.load(Ordering::SeqCst)
    }

    pub fn set_read_allowed(&self, allowed: bool) {
        self.shared.read_allowed.store(allowed, Ordering::SeqCst);
    }

    pub fn write_allowed(&self) -> bool {
        self.shared.write_allowed.load(Ordering::SeqCst)
    }

    pub fn set_write_allowed(&self, allowed: bool) {
        self.shared.write_allowed.store(allowed, Ordering::SeqCst);
    }

    /// True while an upload is being written to disk.
    pub fn busy(&self) -> bool {
        self.shared.busy.load(Ordering::SeqCst)
    }

    pub fn set_busy(&self, busy: bool) {
        self.shared.busy.store(busy, Ordering::SeqCst);
    }

    /// Registers a new subscriber on the change bus. Dropping the receiver
    /// unsubscribes it.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shared.changes.subscribe()
    }

    /// Fire-and-forget "something changed" signal to everyone currently
    /// subscribed. Succeeds trivially when nobody is listening.
    pub fn notify(&self) {
        let _ = self.shared.changes.send(());
    }
}

impl Default for Control {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_pin() -> String {
    format!("{:04}", rand::thread_rng().gen_range(0..10_000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_is_four_digits() {
        let control = Control::new();
        let pin = control.pin();
        assert_eq!(pin.len(), 4);
        assert!(pin.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn regenerated_pin_differs_from_old() {
        let control = Control::new();
        let old = control.pin();
        let new = control.regenerate_pin();
        assert_ne!(old, new);
        assert_eq!(control.pin(), new);
    }

    #[test]
    fn permission_flags_default_to_allowed() {
        let control = Control::new();
        assert!(control.read_allowed());
        assert!(control.write_allowed());
        control.set_write_allowed(false);
        assert!(!control.permissions().write);
        assert!(control.permissions().read);
    }

    #[tokio::test]
    async fn notify_reaches_every_subscriber() {
        let control = Control::new();
        let mut first = control.subscribe();
        let mut second = control.subscribe();
        control.notify();
        assert!(first.recv().await.is_ok());
        assert!(second.recv().await.is_ok());
    }

    #[tokio::test]
    async fn dropped_subscriber_does_not_affect_others() {
        let control = Control::new();
        let first = control.subscribe();
        let mut second = control.subscribe();
        drop(first);
        control.notify();
        assert!(second.recv().await.is_ok());
    }

    #[test]
    fn notify_without_subscribers_is_a_no_op() {
        let control = Control::new();
        control.notify();
    }
}
