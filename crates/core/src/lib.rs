//! # Biogate Core
//!
//! Domain types shared by every Biogate crate: members, devices, branches,
//! permission rules, access decisions, attendance records, fingerprint
//! templates and the evaluation clock.
//!
//! Nothing in this crate touches storage or the network.

pub mod access;
pub mod attendance;
pub mod branch;
pub mod clock;
pub mod device;
pub mod error;
pub mod event;
pub mod fingerprint;
pub mod member;
pub mod permission;

pub use access::{
    AccessDecisionRecord, AccessOutcome, AccessType, DenialReason, RecognitionOutcome,
};
pub use attendance::{AttendanceRecord, AttendanceState, AttendanceStatus, CheckType};
pub use branch::{Branch, BranchStatus};
pub use clock::{Clock, EvalInstant, FixedClock, SystemClock};
pub use device::{AccessDirection, Device, DeviceStatus};
pub use error::{CoreError, CoreResult};
pub use event::{Notification, NotificationKind};
pub use fingerprint::{EnrollmentLog, EnrollmentStatus, FingerIndex, FingerprintTemplate};
pub use member::{Member, MemberInfo, MemberStatus};
pub use permission::{DaysOfWeek, PermissionRule, RuleStatus};
