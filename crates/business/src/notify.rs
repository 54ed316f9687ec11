//! Notification Relay
//!
//! An owned registry of observers. Publishing never blocks the caller and
//! never fails it: notifications are queued to one delivery task, which
//! hands them to observers in publish order. An observer whose delivery
//! fails is dropped from the registry without affecting the rest.

use async_trait::async_trait;
use biogate_core::Notification;
use biogate_persistence::JournalStore;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Notify, RwLock};
use tracing::{debug, warn};

/// Delivery failures reported by observers
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Observer {name} channel is full")]
    ChannelFull { name: String },

    #[error("Observer {name} channel is closed")]
    ChannelClosed { name: String },

    #[error("Journal write failed: {0}")]
    Journal(String),

    #[error("Delivery to {name} failed: {reason}")]
    DeliveryFailed { name: String, reason: String },
}

/// Receiver of published notifications.
#[async_trait]
pub trait Observer: Send + Sync {
    /// Observer name (for logging)
    fn name(&self) -> &str;

    /// Deliver one notification. An error removes the observer.
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Handle returned by [`NotificationRelay::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Resolves to the number of successful deliveries of one publish.
/// Dropping it does not cancel the delivery.
pub type Delivery = oneshot::Receiver<usize>;

type Queued = (Notification, oneshot::Sender<usize>);

#[derive(Default)]
struct RelayInner {
    observers: RwLock<Vec<(ObserverId, Arc<dyn Observer>)>>,
    next_id: AtomicU64,
    queue: OnceLock<mpsc::UnboundedSender<Queued>>,
    in_flight: AtomicUsize,
    idle: Notify,
}

/// Cloneable relay; clones share one registry and one delivery queue.
#[derive(Clone, Default)]
pub struct NotificationRelay {
    inner: Arc<RelayInner>,
}

impl NotificationRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, observer: Arc<dyn Observer>) -> ObserverId {
        let id = ObserverId(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        debug!(observer = observer.name(), "Observer subscribed");
        self.inner.observers.write().await.push((id, observer));
        id
    }

    /// Remove an observer; `false` if it was already gone
    pub async fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self.inner.observers.write().await;
        let before = observers.len();
        observers.retain(|(oid, _)| *oid != id);
        observers.len() != before
    }

    pub async fn observer_count(&self) -> usize {
        self.inner.observers.read().await.len()
    }

    /// Fire-and-forget broadcast. Notifications reach each observer in the
    /// order they were published. Must be called inside a tokio runtime.
    pub fn publish(&self, notification: Notification) -> Delivery {
        let (done, delivery) = oneshot::channel();
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        if let Err(mpsc::error::SendError((notification, _))) =
            self.queue().send((notification, done))
        {
            warn!(kind = %notification.kind, "Delivery task gone, notification dropped");
            self.finish_one();
        }
        delivery
    }

    /// Wait until every published notification has been delivered
    pub async fn flush(&self) {
        loop {
            let idle = self.inner.idle.notified();
            if self.inner.in_flight.load(Ordering::SeqCst) == 0 {
                return;
            }
            idle.await;
        }
    }

    /// Sender of the delivery queue, starting the delivery task on first use
    fn queue(&self) -> &mpsc::UnboundedSender<Queued> {
        self.inner.queue.get_or_init(|| {
            let (sender, receiver) = mpsc::unbounded_channel();
            tokio::spawn(Self::run_deliveries(Arc::downgrade(&self.inner), receiver));
            sender
        })
    }

    /// The task holds the registry weakly; it ends once every relay clone
    /// (and with them the queue sender) is dropped.
    async fn run_deliveries(
        inner: Weak<RelayInner>,
        mut receiver: mpsc::UnboundedReceiver<Queued>,
    ) {
        while let Some((notification, done)) = receiver.recv().await {
            let Some(inner) = inner.upgrade() else {
                break;
            };
            let relay = NotificationRelay { inner };
            let delivered = relay.deliver(&notification).await;
            let _ = done.send(delivered);
            relay.finish_one();
        }
    }

    fn finish_one(&self) {
        if self.inner.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.idle.notify_waiters();
        }
    }

    /// Deliver to every observer in subscription order, removing the ones
    /// that fail. Returns the number of successful deliveries.
    pub async fn deliver(&self, notification: &Notification) -> usize {
        let snapshot: Vec<(ObserverId, Arc<dyn Observer>)> =
            self.inner.observers.read().await.clone();

        let mut delivered = 0;
        let mut failed = Vec::new();
        for (id, observer) in snapshot {
            match observer.deliver(notification).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(
                        observer = observer.name(),
                        kind = %notification.kind,
                        error = %e,
                        "Dropping observer after failed delivery"
                    );
                    failed.push(id);
                }
            }
        }

        if !failed.is_empty() {
            self.inner
                .observers
                .write()
                .await
                .retain(|(id, _)| !failed.contains(id));
        }
        delivered
    }
}

// ============================================================================
// Observers
// ============================================================================

/// Forwards notifications into a bounded channel (a live connection).
pub struct ChannelObserver {
    name: String,
    sender: mpsc::Sender<Notification>,
}

impl ChannelObserver {
    /// Observer plus the receiving end of its channel
    pub fn channel(name: &str, capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                name: name.to_string(),
                sender,
            },
            receiver,
        )
    }
}

#[async_trait]
impl Observer for ChannelObserver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sender
            .try_send(notification.clone())
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => NotifyError::ChannelFull {
                    name: self.name.clone(),
                },
                mpsc::error::TrySendError::Closed(_) => NotifyError::ChannelClosed {
                    name: self.name.clone(),
                },
            })
    }
}

/// Appends every notification to the JSONL journal.
pub struct JournalObserver {
    store: Arc<JournalStore>,
}

impl JournalObserver {
    pub fn new(store: Arc<JournalStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Observer for JournalObserver {
    fn name(&self) -> &str {
        "journal"
    }

    /// The append is blocking file I/O, so it runs on the blocking pool.
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        let store = Arc::clone(&self.store);
        let notification = notification.clone();
        tokio::task::spawn_blocking(move || store.append(&notification))
            .await
            .map_err(|e| NotifyError::Journal(e.to_string()))?
            .map(|_| ())
            .map_err(|e| NotifyError::Journal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biogate_core::NotificationKind;
    use biogate_persistence::JournalReader;
    use chrono::NaiveDate;
    use serde_json::json;
    use tempfile::tempdir;

    fn notification(n: i64) -> Notification {
        let at = NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        Notification::new(NotificationKind::CheckIn, json!({ "member_id": n }), at)
    }

    struct Failing;

    #[async_trait]
    impl Observer for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn deliver(&self, _: &Notification) -> Result<(), NotifyError> {
            Err(NotifyError::DeliveryFailed {
                name: "failing".to_string(),
                reason: "socket reset".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct Counting(AtomicUsize);

    #[async_trait]
    impl Observer for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        async fn deliver(&self, _: &Notification) -> Result<(), NotifyError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failing_observer_is_isolated_and_removed() {
        let relay = NotificationRelay::new();
        let counting = Arc::new(Counting::default());
        relay.subscribe(Arc::new(Failing)).await;
        relay.subscribe(counting.clone()).await;

        assert_eq!(relay.deliver(&notification(1)).await, 1);
        assert_eq!(relay.observer_count().await, 1);

        assert_eq!(relay.deliver(&notification(2)).await, 1);
        assert_eq!(counting.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_channel_observer_full_and_closed() {
        let relay = NotificationRelay::new();
        let (full, _keep) = ChannelObserver::channel("full", 1);
        let (closed, receiver) = ChannelObserver::channel("closed", 4);
        drop(receiver);
        let (live, mut live_rx) = ChannelObserver::channel("live", 8);

        relay.subscribe(Arc::new(full)).await;
        relay.subscribe(Arc::new(closed)).await;
        relay.subscribe(Arc::new(live)).await;

        // first delivery fills "full" and kills "closed"
        assert_eq!(relay.deliver(&notification(1)).await, 2);
        assert_eq!(relay.observer_count().await, 2);

        // second overflows "full"
        assert_eq!(relay.deliver(&notification(2)).await, 1);
        assert_eq!(relay.observer_count().await, 1);

        assert_eq!(live_rx.recv().await.unwrap().payload["member_id"], 1);
        assert_eq!(live_rx.recv().await.unwrap().payload["member_id"], 2);
    }

    #[tokio::test]
    async fn test_publish_without_observers() {
        let relay = NotificationRelay::new();
        assert_eq!(relay.publish(notification(1)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_flush_waits_for_deliveries() {
        let relay = NotificationRelay::new();
        let counting = Arc::new(Counting::default());
        relay.subscribe(counting.clone()).await;

        for n in 0..10 {
            drop(relay.publish(notification(n)));
        }
        relay.flush().await;
        assert_eq!(counting.0.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_publish_order_is_delivery_order() {
        let relay = NotificationRelay::new();
        let (observer, mut rx) = ChannelObserver::channel("ordered", 64);
        relay.subscribe(Arc::new(observer)).await;

        for n in 0..50 {
            drop(relay.publish(notification(n)));
        }
        relay.flush().await;

        for n in 0..50 {
            assert_eq!(rx.recv().await.unwrap().payload["member_id"], n);
        }
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let relay = NotificationRelay::new();
        let id = relay.subscribe(Arc::new(Counting::default())).await;
        assert!(relay.unsubscribe(id).await);
        assert!(!relay.unsubscribe(id).await);
        assert_eq!(relay.observer_count().await, 0);
    }

    #[tokio::test]
    async fn test_journal_observer_appends() {
        let dir = tempdir().unwrap();
        let store = Arc::new(JournalStore::new(dir.path()).unwrap());
        let relay = NotificationRelay::new();
        relay
            .subscribe(Arc::new(JournalObserver::new(store.clone())))
            .await;

        relay.publish(notification(5)).await.unwrap();
        relay.publish(notification(6)).await.unwrap();

        let entries = JournalReader::new(dir.path()).read_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].id, "NTF_000002");
        assert_eq!(entries[1].notification.payload["member_id"], 6);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_journal_sequence_follows_publish_order() {
        let dir = tempdir().unwrap();
        let store = Arc::new(JournalStore::new(dir.path()).unwrap());
        let relay = NotificationRelay::new();
        relay.subscribe(Arc::new(JournalObserver::new(store))).await;

        for n in 1..=20 {
            drop(relay.publish(notification(n)));
        }
        relay.flush().await;

        let entries = JournalReader::new(dir.path()).read_all().unwrap();
        assert_eq!(entries.len(), 20);
        for (n, entry) in (1..=20).zip(&entries) {
            assert_eq!(entry.sequence(), Some(n as u64));
            assert_eq!(entry.notification.payload["member_id"], n);
        }
    }
}
