//! # Biogate Reports
//!
//! Attendance statistics and report export - CSV, JSON, Markdown.
//!
//! Everything here is a pure function of already-loaded attendance records;
//! loading them is the business layer's job.
//!
//! ## Exporters
//!
//! - [`CsvExporter`] - CSV format with proper escaping
//! - [`JsonExporter`] - JSON format (pretty or compact)
//! - [`MarkdownExporter`] - Markdown tables for documentation
//!
//! ## Reports
//!
//! - [`AttendanceStatistics`] - per-member attendance over a date range
//! - [`AttendanceReport`] - statistics of many members, exportable
//! - [`DailySummary`] - check-in/check-out counts of one day
//!
//! ## Example
//!
//! ```rust,ignore
//! use biogate_reports::{AttendanceReport, ExportFormat};
//!
//! let report = AttendanceReport::build(start, end, &members, &records, now);
//! let output = ExportFormat::Markdown.exporter().export(&report);
//! ```

pub mod daily;
pub mod exporters;
pub mod statistics;

pub use daily::DailySummary;
pub use exporters::{
    CsvExporter, ExportFormat, JsonExporter, MarkdownExporter, ReportData, ReportExporter,
};
pub use statistics::{round2, AttendanceReport, AttendanceStatistics};
