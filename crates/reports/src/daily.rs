//! Daily attendance summary

use crate::exporters::ReportData;
use crate::statistics::round2;
use biogate_core::AttendanceRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Check-in/check-out counts of one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_records: i64,
    pub checked_in: i64,
    pub checked_out: i64,
    /// Checked in but not yet out
    pub still_in: i64,
    pub average_duration_minutes: f64,
    pub average_duration_hours: f64,
}

impl DailySummary {
    /// Summarize the records dated `date`; others are ignored
    pub fn compute(date: NaiveDate, records: &[AttendanceRecord]) -> Self {
        let mut total_records = 0i64;
        let mut checked_in = 0i64;
        let mut checked_out = 0i64;
        let mut durations = 0i64;
        let mut total_minutes = 0i64;

        for record in records.iter().filter(|r| r.date == date) {
            total_records += 1;
            if record.check_in_time.is_some() {
                checked_in += 1;
            }
            if record.check_out_time.is_some() {
                checked_out += 1;
            }
            if let Some(minutes) = record.duration_minutes {
                durations += 1;
                total_minutes += minutes;
            }
        }

        let average_minutes = if durations > 0 {
            total_minutes as f64 / durations as f64
        } else {
            0.0
        };

        Self {
            date,
            total_records,
            checked_in,
            checked_out,
            still_in: (checked_in - checked_out).max(0),
            average_duration_minutes: round2(average_minutes),
            average_duration_hours: round2(average_minutes / 60.0),
        }
    }
}

impl ReportData for DailySummary {
    fn title(&self) -> &str {
        "Daily Attendance Summary"
    }

    fn headers(&self) -> Vec<String> {
        vec!["Metric".to_string(), "Value".to_string()]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        [
            ("Total Records", self.total_records.to_string()),
            ("Checked In", self.checked_in.to_string()),
            ("Checked Out", self.checked_out.to_string()),
            ("Still In", self.still_in.to_string()),
            (
                "Average Duration (min)",
                format!("{:.2}", self.average_duration_minutes),
            ),
            (
                "Average Duration (h)",
                format!("{:.2}", self.average_duration_hours),
            ),
        ]
        .into_iter()
        .map(|(k, v)| vec![k.to_string(), v])
        .collect()
    }

    fn summary(&self) -> Vec<(String, String)> {
        vec![("Date".to_string(), self.date.to_string())]
    }
}
