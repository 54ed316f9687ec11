//! SQLite persistence module
//!
//! Repository pattern for SQLite database access.

pub mod repos;
pub mod schema;

pub use repos::{
    create_pool, init_database, init_in_memory, run_migrations, AccessLogFilter, AccessLogRepo,
    AttendanceFilter, AttendanceRepo, BranchRepo, DeviceRepo, EnrollmentLogRepo, MemberFilter,
    MemberRepo, PermissionRepo, RecognitionLogRepo, TemplateRepo, DEFAULT_PAGE_SIZE,
};
pub use schema::{
    AccessLogRow, AttendanceRow, BranchRow, DeviceRow, EnrollmentLogRow, FingerprintTemplateRow,
    MemberRow, PermissionRow, RecognitionLogRow,
};
