//! Devices - registry administration and the vendor link capability
//!
//! Talking to a reader goes through [`DeviceLink`]. The shipped
//! [`TcpProbeLink`] only checks that the reader accepts TCP connections;
//! pulling users and punch records or capturing a fingerprint needs a vendor
//! driver.

use crate::error::{BusinessError, BusinessResult};
use crate::services::ServiceContext;
use anyhow::Context;
use async_trait::async_trait;
use biogate_core::{AccessDirection, Device, DeviceStatus, FingerIndex, Notification};
use biogate_persistence::DeviceRepo;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tracing::{info, warn};

/// Failures talking to a physical reader
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Device at {address} unreachable: {reason}")]
    Unreachable { address: String, reason: String },

    #[error("Device at {address} did not answer within {millis} ms")]
    Timeout { address: String, millis: u64 },

    #[error("Operation not supported by this link: {0}")]
    Unsupported(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Counts pulled from a reader by [`DeviceLink::sync`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub users: u32,
    pub records: u32,
}

/// Capability to reach a physical reader.
#[async_trait]
pub trait DeviceLink: Send + Sync {
    fn name(&self) -> &str;

    /// Establish (or verify) connectivity
    async fn connect(&self, device: &Device) -> Result<(), LinkError>;

    /// Pull enrolled users and punch records
    async fn sync(&self, device: &Device) -> Result<SyncSummary, LinkError>;

    /// Capture a finger on the reader and return its template bytes
    async fn enroll(&self, device: &Device, finger: FingerIndex) -> Result<Vec<u8>, LinkError>;
}

/// TCP reachability probe with a connect timeout.
#[derive(Debug, Clone)]
pub struct TcpProbeLink {
    timeout: Duration,
}

impl TcpProbeLink {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl DeviceLink for TcpProbeLink {
    fn name(&self) -> &str {
        "tcp-probe"
    }

    async fn connect(&self, device: &Device) -> Result<(), LinkError> {
        let address = device.address();
        match tokio::time::timeout(self.timeout, TcpStream::connect(&address)).await {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(e)) => Err(LinkError::Unreachable {
                address,
                reason: e.to_string(),
            }),
            Err(_) => Err(LinkError::Timeout {
                address,
                millis: self.timeout.as_millis() as u64,
            }),
        }
    }

    async fn sync(&self, _device: &Device) -> Result<SyncSummary, LinkError> {
        Err(LinkError::Unsupported(
            "record sync requires a vendor driver".to_string(),
        ))
    }

    async fn enroll(&self, _device: &Device, _finger: FingerIndex) -> Result<Vec<u8>, LinkError> {
        Err(LinkError::Unsupported(
            "fingerprint capture requires a vendor driver".to_string(),
        ))
    }
}

/// Input for [`DeviceService::register`]
#[derive(Debug, Clone)]
pub struct NewDevice {
    pub name: String,
    pub ip_address: String,
    pub port: u16,
    pub device_type: String,
    pub location: Option<String>,
    pub branch_id: Option<i64>,
    pub access_direction: AccessDirection,
}

impl NewDevice {
    pub fn new(name: &str, ip_address: &str) -> Self {
        Self {
            name: name.to_string(),
            ip_address: ip_address.to_string(),
            port: Device::DEFAULT_PORT,
            device_type: "fingerprint".to_string(),
            location: None,
            branch_id: None,
            access_direction: AccessDirection::Both,
        }
    }
}

/// Partial update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct DeviceUpdate {
    pub name: Option<String>,
    pub ip_address: Option<String>,
    pub port: Option<u16>,
    pub device_type: Option<String>,
    pub location: Option<String>,
    pub branch_id: Option<i64>,
    pub access_direction: Option<AccessDirection>,
}

/// Device Service - registry, connect and sync
pub struct DeviceService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> DeviceService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn register(&self, input: NewDevice) -> BusinessResult<Device> {
        if input.name.trim().is_empty() || input.ip_address.trim().is_empty() {
            return Err(BusinessError::InvalidInput(
                "device name and ip address are required".to_string(),
            )
            .into());
        }
        self.require_unique_address(&input.ip_address, None).await?;
        if let Some(branch_id) = input.branch_id {
            self.require_branch(branch_id).await?;
        }

        let now = self.ctx.now();
        let mut device = Device::new(0, &input.name, &input.ip_address, now);
        device.port = input.port;
        device.device_type = input.device_type;
        device.location = input.location;
        device.branch_id = input.branch_id;
        device.access_direction = input.access_direction;

        device.id = DeviceRepo::insert(self.ctx.pool(), &device)
            .await
            .context("Failed to insert device")?;

        info!(device_id = device.id, address = %device.address(), "Device registered");
        Ok(device)
    }

    pub async fn update(&self, id: i64, update: DeviceUpdate) -> BusinessResult<Device> {
        let mut device = self.get(id).await?;

        if let Some(ip) = update.ip_address {
            self.require_unique_address(&ip, Some(id)).await?;
            device.ip_address = ip;
        }
        if let Some(branch_id) = update.branch_id {
            self.require_branch(branch_id).await?;
            device.branch_id = Some(branch_id);
        }
        if let Some(name) = update.name {
            device.name = name;
        }
        if let Some(port) = update.port {
            device.port = port;
        }
        if let Some(device_type) = update.device_type {
            device.device_type = device_type;
        }
        if update.location.is_some() {
            device.location = update.location;
        }
        if let Some(direction) = update.access_direction {
            device.access_direction = direction;
        }

        device.updated_at = self.ctx.now();
        DeviceRepo::update(self.ctx.pool(), &device)
            .await
            .context("Failed to update device")?;
        Ok(device)
    }

    pub async fn delete(&self, id: i64) -> BusinessResult<()> {
        self.get(id).await?;
        DeviceRepo::delete(self.ctx.pool(), id)
            .await
            .context("Failed to delete device")?;
        info!(device_id = id, "Device deleted");
        Ok(())
    }

    pub async fn get(&self, id: i64) -> BusinessResult<Device> {
        DeviceRepo::find_by_id(self.ctx.pool(), id)
            .await?
            .ok_or_else(|| BusinessError::DeviceNotFound(id).into())
    }

    pub async fn list(&self, branch_id: Option<i64>) -> BusinessResult<Vec<Device>> {
        Ok(DeviceRepo::list(self.ctx.pool(), branch_id).await?)
    }

    /// Connect through the link. Success marks the device online and stamps
    /// its heartbeat; failure marks it offline and surfaces the cause.
    pub async fn connect(&self, id: i64) -> BusinessResult<Device> {
        let mut device = self.get(id).await?;

        match self.ctx.link().connect(&device).await {
            Ok(()) => {
                let now = self.ctx.now();
                self.set_status(&mut device, DeviceStatus::Online, Some(now))
                    .await?;
                info!(device_id = id, link = self.ctx.link().name(), "Device connected");
                Ok(device)
            }
            Err(e) => {
                warn!(device_id = id, error = %e, "Device connect failed");
                if device.status != DeviceStatus::Offline {
                    self.set_status(&mut device, DeviceStatus::Offline, None)
                        .await?;
                }
                Err(BusinessError::link_failed(id, e).into())
            }
        }
    }

    pub async fn disconnect(&self, id: i64) -> BusinessResult<Device> {
        let mut device = self.get(id).await?;
        if device.status != DeviceStatus::Offline {
            self.set_status(&mut device, DeviceStatus::Offline, None)
                .await?;
            info!(device_id = id, "Device disconnected");
        }
        Ok(device)
    }

    /// Pull users and records; the device must be online
    pub async fn sync(&self, id: i64) -> BusinessResult<SyncSummary> {
        let device = self.get(id).await?;
        if !device.is_online() {
            return Err(BusinessError::DeviceOffline(id).into());
        }

        let summary = self
            .ctx
            .link()
            .sync(&device)
            .await
            .map_err(|e| BusinessError::link_failed(id, e))?;

        DeviceRepo::update_status(
            self.ctx.pool(),
            id,
            DeviceStatus::Online,
            Some(self.ctx.now()),
            self.ctx.now(),
        )
        .await?;

        info!(
            device_id = id,
            users = summary.users,
            records = summary.records,
            "Device synced"
        );
        Ok(summary)
    }

    async fn set_status(
        &self,
        device: &mut Device,
        status: DeviceStatus,
        heartbeat: Option<chrono::NaiveDateTime>,
    ) -> BusinessResult<()> {
        let now = self.ctx.now();
        DeviceRepo::update_status(self.ctx.pool(), device.id, status, heartbeat, now).await?;

        device.status = status;
        if heartbeat.is_some() {
            device.last_heartbeat = heartbeat;
        }
        device.updated_at = now;
        self.ctx.notify(Notification::device_status(device, now));
        Ok(())
    }

    async fn require_unique_address(&self, ip: &str, except: Option<i64>) -> BusinessResult<()> {
        match DeviceRepo::find_by_ip(self.ctx.pool(), ip).await? {
            Some(existing) if Some(existing.id) != except => {
                Err(BusinessError::DuplicateDeviceAddress(ip.to_string()).into())
            }
            _ => Ok(()),
        }
    }

    async fn require_branch(&self, branch_id: i64) -> BusinessResult<()> {
        match biogate_persistence::BranchRepo::find_by_id(self.ctx.pool(), branch_id).await? {
            Some(_) => Ok(()),
            None => Err(BusinessError::BranchNotFound(branch_id).into()),
        }
    }
}
