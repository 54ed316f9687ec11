//! # Biogate Business
//!
//! Business logic layer - Authorization Engine, Attendance Tracker,
//! Notification Relay, device links, fingerprint enrollment and
//! administration of members, branches, devices and permission rules.
//!
//! Every service borrows a [`ServiceContext`] that owns the pool, the
//! clock, the relay, the attendance lock table and the device link.

pub mod access;
pub mod attendance;
pub mod branch;
pub mod device;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod member;
pub mod notify;
pub mod permission;
pub mod services;
pub mod statistics;

#[cfg(test)]
pub(crate) mod testutil;

pub use access::{AccessRequest, AccessResult, AccessService};
pub use attendance::{
    AttendanceLocks, AttendanceRejection, AttendanceService, CheckOutcome, TodayStatus,
};
pub use branch::{BranchService, BranchUpdate, NewBranch};
pub use device::{
    DeviceLink, DeviceService, DeviceUpdate, LinkError, NewDevice, SyncSummary, TcpProbeLink,
};
pub use engine::{evaluate, Decision};
pub use error::{BusinessError, BusinessResult};
pub use fingerprint::{Enrollment, FingerprintService};
pub use member::{MemberService, MemberUpdate, NewMember};
pub use notify::{
    ChannelObserver, Delivery, JournalObserver, NotificationRelay, NotifyError, Observer,
    ObserverId,
};
pub use permission::{NewPermission, PermissionService, PermissionUpdate};
pub use services::ServiceContext;
pub use statistics::{Overview, StatisticsService};
