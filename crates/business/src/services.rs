//! Service context
//!
//! Everything a service needs, owned in one place and injected: the pool,
//! the clock, the notification relay, the attendance lock table and the
//! device link.

use crate::attendance::AttendanceLocks;
use crate::device::{DeviceLink, TcpProbeLink};
use crate::notify::{JournalObserver, NotificationRelay};
use biogate_core::{Clock, Notification, SystemClock};
use biogate_persistence::Database;
use chrono::NaiveDateTime;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

/// Context for business operations
pub struct ServiceContext {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    relay: NotificationRelay,
    locks: AttendanceLocks,
    link: Arc<dyn DeviceLink>,
}

impl ServiceContext {
    /// Context over `db` with the system clock and a TCP probe link.
    ///
    /// When the database carries a journal, a [`JournalObserver`] is
    /// subscribed to the relay.
    pub async fn new(db: &Database, connect_timeout: Duration) -> Self {
        let relay = NotificationRelay::new();
        if let Some(journal) = db.journal() {
            relay.subscribe(Arc::new(JournalObserver::new(journal))).await;
        }
        Self::from_parts(
            db.pool().clone(),
            Arc::new(SystemClock),
            relay,
            Arc::new(TcpProbeLink::new(connect_timeout)),
        )
    }

    /// Create from parts directly
    pub fn from_parts(
        pool: SqlitePool,
        clock: Arc<dyn Clock>,
        relay: NotificationRelay,
        link: Arc<dyn DeviceLink>,
    ) -> Self {
        Self {
            pool,
            clock,
            relay,
            locks: AttendanceLocks::default(),
            link,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_link(mut self, link: Arc<dyn DeviceLink>) -> Self {
        self.link = link;
        self
    }

    /// Get database pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub fn relay(&self) -> &NotificationRelay {
        &self.relay
    }

    pub fn locks(&self) -> &AttendanceLocks {
        &self.locks
    }

    pub fn link(&self) -> &dyn DeviceLink {
        self.link.as_ref()
    }

    /// Best-effort broadcast; never waits for observers
    pub fn notify(&self, notification: Notification) {
        drop(self.relay.publish(notification));
    }
}
