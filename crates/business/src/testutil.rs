//! Shared fixtures for service tests

use crate::device::{DeviceLink, LinkError, NewDevice, SyncSummary};
use crate::member::NewMember;
use crate::notify::{ChannelObserver, NotificationRelay};
use crate::services::ServiceContext;
use crate::{DeviceService, MemberService};
use async_trait::async_trait;
use biogate_core::{Clock, Device, FingerIndex, FixedClock, Member, MemberStatus, Notification};
use biogate_persistence::Database;
use chrono::NaiveDateTime;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Link whose reachability is toggled by the test
pub(crate) struct MockLink {
    reachable: AtomicBool,
}

impl MockLink {
    pub(crate) const NAME: &'static str = "mock";

    pub(crate) fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }
}

#[async_trait]
impl DeviceLink for MockLink {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn connect(&self, device: &Device) -> Result<(), LinkError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LinkError::Unreachable {
                address: device.address(),
                reason: "connection refused".to_string(),
            })
        }
    }

    async fn sync(&self, _device: &Device) -> Result<SyncSummary, LinkError> {
        Ok(SyncSummary {
            users: 3,
            records: 12,
        })
    }

    /// Template bytes name the device and finger
    async fn enroll(&self, device: &Device, finger: FingerIndex) -> Result<Vec<u8>, LinkError> {
        self.connect(device).await?;
        Ok(format!("TPL-{}-{}", device.id, finger).into_bytes())
    }
}

pub(crate) struct TestEnv {
    pub ctx: ServiceContext,
    pub clock: Arc<FixedClock>,
    pub link: Arc<MockLink>,
    _db: Database,
}

impl TestEnv {
    /// In-memory store, clock at Monday 2026-03-02 09:00:00
    pub(crate) async fn new() -> Self {
        let db = Database::in_memory().await.unwrap();
        let clock = Arc::new(FixedClock::at(2026, 3, 2, 9, 0, 0).unwrap());
        let link = Arc::new(MockLink {
            reachable: AtomicBool::new(true),
        });
        let ctx = ServiceContext::from_parts(
            db.pool().clone(),
            clock.clone(),
            NotificationRelay::new(),
            link.clone(),
        );
        Self {
            ctx,
            clock,
            link,
            _db: db,
        }
    }

    pub(crate) fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub(crate) fn set_time(&self, hour: u32, min: u32) {
        let at = self.now().date().and_hms_opt(hour, min, 0).unwrap();
        self.clock.set(at);
    }

    pub(crate) async fn subscribe_channel(&self) -> mpsc::Receiver<Notification> {
        let (observer, rx) = ChannelObserver::channel("test", 64);
        self.ctx.relay().subscribe(Arc::new(observer)).await;
        rx
    }

    pub(crate) async fn member(&self, name: &str, phone: &str) -> Member {
        MemberService::new(&self.ctx)
            .create(NewMember::new(name, phone))
            .await
            .unwrap()
    }

    pub(crate) async fn member_with_status(
        &self,
        name: &str,
        phone: &str,
        status: MemberStatus,
    ) -> Member {
        let mut input = NewMember::new(name, phone);
        input.status = status;
        MemberService::new(&self.ctx).create(input).await.unwrap()
    }

    pub(crate) async fn device(&self, name: &str, ip: &str) -> Device {
        DeviceService::new(&self.ctx)
            .register(NewDevice::new(name, ip))
            .await
            .unwrap()
    }
}
