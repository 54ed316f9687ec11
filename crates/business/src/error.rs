//! Business layer errors
//!
//! Uses anyhow for error aggregation with custom error types. Callers recover
//! the structured error with `downcast_ref::<BusinessError>()`.

use thiserror::Error;

/// Business operation errors.
///
/// Denials and attendance rejections are not errors; they come back as
/// values. These are caller errors and infrastructure failures.
#[derive(Debug, Error)]
pub enum BusinessError {
    // === Not found errors ===
    #[error("Member not found: {0}")]
    MemberNotFound(i64),

    #[error("Device not found: {0}")]
    DeviceNotFound(i64),

    #[error("Permission not found: {0}")]
    PermissionNotFound(i64),

    #[error("Branch not found: {0}")]
    BranchNotFound(i64),

    #[error("Fingerprint template not found: {0}")]
    TemplateNotFound(i64),

    // === Device errors ===
    #[error("Device {0} is offline")]
    DeviceOffline(i64),

    #[error("Device {device_id} link failed: {reason}")]
    DeviceLinkFailed { device_id: i64, reason: String },

    // === Conflict errors ===
    #[error("Phone number already registered: {0}")]
    DuplicatePhone(String),

    #[error("Branch code already exists: {0}")]
    DuplicateBranchCode(String),

    #[error("Device address already registered: {0}")]
    DuplicateDeviceAddress(String),

    #[error("Member {member_id} already has a template for finger {finger_index}")]
    DuplicateFingerprint { member_id: i64, finger_index: u8 },

    #[error("Branch {branch_id} still has {dependents} members or devices")]
    BranchInUse { branch_id: i64, dependents: i64 },

    // === Validation errors ===
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // === Wrapped errors ===
    #[error("Persistence error: {0}")]
    Persistence(#[from] biogate_persistence::PersistenceError),

    #[error("Core error: {0}")]
    Core(#[from] biogate_core::CoreError),
}

/// Result type alias for business operations
pub type BusinessResult<T> = anyhow::Result<T>;

impl BusinessError {
    /// Stable identifying code for callers
    pub fn code(&self) -> &'static str {
        match self {
            BusinessError::MemberNotFound(_) => "MEMBER_NOT_FOUND",
            BusinessError::DeviceNotFound(_) => "DEVICE_NOT_FOUND",
            BusinessError::PermissionNotFound(_) => "PERMISSION_NOT_FOUND",
            BusinessError::BranchNotFound(_) => "BRANCH_NOT_FOUND",
            BusinessError::TemplateNotFound(_) => "TEMPLATE_NOT_FOUND",
            BusinessError::DeviceOffline(_) => "DEVICE_OFFLINE",
            BusinessError::DeviceLinkFailed { .. } => "DEVICE_LINK_FAILED",
            BusinessError::DuplicatePhone(_) => "DUPLICATE_PHONE",
            BusinessError::DuplicateBranchCode(_) => "DUPLICATE_BRANCH_CODE",
            BusinessError::DuplicateDeviceAddress(_) => "DUPLICATE_DEVICE_ADDRESS",
            BusinessError::DuplicateFingerprint { .. } => "DUPLICATE_FINGERPRINT",
            BusinessError::BranchInUse { .. } => "BRANCH_IN_USE",
            BusinessError::InvalidInput(_) | BusinessError::Core(_) => "INVALID_INPUT",
            BusinessError::Persistence(_) => "STORAGE_ERROR",
        }
    }

    pub fn link_failed(device_id: i64, reason: impl ToString) -> Self {
        Self::DeviceLinkFailed {
            device_id,
            reason: reason.to_string(),
        }
    }

    /// Code of a business error inside an `anyhow::Error`, if it is one
    pub fn code_of(err: &anyhow::Error) -> Option<&'static str> {
        err.downcast_ref::<BusinessError>().map(BusinessError::code)
    }
}
