//! Attendance statistics over a date range

use crate::exporters::ReportData;
use biogate_core::AttendanceRecord;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Round to 2 decimal places for reporting
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Attendance figures of one member over `[start_date, end_date]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceStatistics {
    pub member_id: i64,
    pub member_name: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Inclusive day count; 0 for an inverted range
    pub total_days: i64,
    pub present_days: i64,
    pub absent_days: i64,
    pub total_hours: f64,
    pub average_hours: f64,
    /// Percent of days present
    pub attendance_rate: f64,
}

impl AttendanceStatistics {
    /// Compute from `records`; records of other members or outside the
    /// range are ignored.
    pub fn compute(
        member_id: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
        records: &[AttendanceRecord],
    ) -> Self {
        let total_days = if end_date < start_date {
            0
        } else {
            (end_date - start_date).num_days() + 1
        };

        let in_range = records.iter().filter(|r| {
            r.member_id == member_id && r.date >= start_date && r.date <= end_date
        });

        let mut present_days = 0i64;
        let mut total_minutes = 0i64;
        for record in in_range {
            if record.check_in_time.is_some() {
                present_days += 1;
            }
            if let Some(minutes) = record.duration_minutes {
                total_minutes += minutes;
            }
        }

        let total_hours = total_minutes as f64 / 60.0;
        let average_hours = if present_days > 0 {
            total_hours / present_days as f64
        } else {
            0.0
        };
        let attendance_rate = if total_days > 0 {
            present_days as f64 / total_days as f64 * 100.0
        } else {
            0.0
        };

        Self {
            member_id,
            member_name: None,
            start_date,
            end_date,
            total_days,
            present_days,
            absent_days: (total_days - present_days).max(0),
            total_hours: round2(total_hours),
            average_hours: round2(average_hours),
            attendance_rate: round2(attendance_rate),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.member_name = Some(name.to_string());
        self
    }
}

/// Statistics of several members over one range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceReport {
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub members: Vec<AttendanceStatistics>,
    pub generated_at: NaiveDateTime,
}

impl AttendanceReport {
    /// One row per `(member_id, name)` in `members`, in the given order
    pub fn build(
        start_date: NaiveDate,
        end_date: NaiveDate,
        members: &[(i64, String)],
        records: &[AttendanceRecord],
        generated_at: NaiveDateTime,
    ) -> Self {
        let rows = members
            .iter()
            .map(|(id, name)| {
                AttendanceStatistics::compute(*id, start_date, end_date, records).with_name(name)
            })
            .collect();

        Self {
            title: format!("Attendance Report {} - {}", start_date, end_date),
            start_date,
            end_date,
            members: rows,
            generated_at,
        }
    }

    /// Mean attendance rate across members, 0 when empty
    pub fn average_rate(&self) -> f64 {
        if self.members.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.members.iter().map(|m| m.attendance_rate).sum();
        round2(sum / self.members.len() as f64)
    }
}

impl ReportData for AttendanceReport {
    fn title(&self) -> &str {
        &self.title
    }

    fn headers(&self) -> Vec<String> {
        [
            "Member ID",
            "Name",
            "Total Days",
            "Present",
            "Absent",
            "Total Hours",
            "Average Hours",
            "Attendance Rate (%)",
        ]
        .iter()
        .map(|h| h.to_string())
        .collect()
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.members
            .iter()
            .map(|s| {
                vec![
                    s.member_id.to_string(),
                    s.member_name.clone().unwrap_or_default(),
                    s.total_days.to_string(),
                    s.present_days.to_string(),
                    s.absent_days.to_string(),
                    format!("{:.2}", s.total_hours),
                    format!("{:.2}", s.average_hours),
                    format!("{:.2}", s.attendance_rate),
                ]
            })
            .collect()
    }

    fn summary(&self) -> Vec<(String, String)> {
        let total_hours: f64 = self.members.iter().map(|m| m.total_hours).sum();
        vec![
            (
                "Period".to_string(),
                format!("{} - {}", self.start_date, self.end_date),
            ),
            ("Members".to_string(), self.members.len().to_string()),
            ("Total Hours".to_string(), format!("{:.2}", round2(total_hours))),
            (
                "Average Attendance Rate (%)".to_string(),
                format!("{:.2}", self.average_rate()),
            ),
            (
                "Generated At".to_string(),
                self.generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biogate_core::AttendanceStatus;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn complete(member_id: i64, day: u32, minutes: i64) -> AttendanceRecord {
        let check_in = date(day).and_hms_opt(9, 0, 0).unwrap();
        AttendanceRecord {
            id: day as i64,
            member_id,
            device_id: 1,
            date: date(day),
            check_in_time: Some(check_in),
            check_out_time: Some(check_in + chrono::TimeDelta::minutes(minutes)),
            duration_minutes: Some(minutes),
            status: AttendanceStatus::Complete,
        }
    }

    #[test]
    fn test_five_day_range_three_present() {
        let records = vec![complete(1, 2, 420), complete(1, 3, 480), complete(1, 5, 360)];
        let stats = AttendanceStatistics::compute(1, date(2), date(6), &records);

        assert_eq!(stats.total_days, 5);
        assert_eq!(stats.present_days, 3);
        assert_eq!(stats.absent_days, 2);
        assert_eq!(stats.total_hours, 21.0);
        assert_eq!(stats.average_hours, 7.0);
        assert_eq!(stats.attendance_rate, 60.0);
    }

    #[test]
    fn test_no_presence_avoids_division_by_zero() {
        let stats = AttendanceStatistics::compute(1, date(2), date(8), &[]);
        assert_eq!(stats.total_days, 7);
        assert_eq!(stats.present_days, 0);
        assert_eq!(stats.average_hours, 0.0);
        assert_eq!(stats.attendance_rate, 0.0);
        assert!(stats.average_hours.is_finite());
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let records = vec![complete(1, 3, 60)];
        let stats = AttendanceStatistics::compute(1, date(5), date(2), &records);
        assert_eq!(stats.total_days, 0);
        assert_eq!(stats.present_days, 0);
        assert_eq!(stats.absent_days, 0);
        assert_eq!(stats.attendance_rate, 0.0);
    }

    #[test]
    fn test_incomplete_day_counts_present_without_hours() {
        let mut open = complete(1, 2, 0);
        open.check_out_time = None;
        open.duration_minutes = None;
        open.status = AttendanceStatus::Incomplete;

        let stats = AttendanceStatistics::compute(1, date(2), date(2), &[open]);
        assert_eq!(stats.present_days, 1);
        assert_eq!(stats.total_hours, 0.0);
        assert_eq!(stats.attendance_rate, 100.0);
    }

    #[test]
    fn test_rounding_happens_after_accumulation() {
        // 3 x 20 minutes = 1 hour; per-record rounding would give 0.99
        let records = vec![complete(1, 2, 20), complete(1, 3, 20), complete(1, 4, 20)];
        let stats = AttendanceStatistics::compute(1, date(2), date(4), &records);
        assert_eq!(stats.total_hours, 1.0);
        assert_eq!(stats.average_hours, 0.33);
        assert_eq!(stats.attendance_rate, 100.0);

        let stats = AttendanceStatistics::compute(1, date(2), date(4), &records[..1]);
        assert_eq!(stats.attendance_rate, 33.33);
    }

    #[test]
    fn test_other_members_ignored() {
        let records = vec![complete(1, 2, 60), complete(2, 2, 120)];
        let stats = AttendanceStatistics::compute(2, date(2), date(2), &records);
        assert_eq!(stats.total_hours, 2.0);
    }

    #[test]
    fn test_report_rows_and_summary() {
        let records = vec![complete(1, 2, 420), complete(2, 2, 60)];
        let members = vec![(1, "Alice".to_string()), (2, "Bob".to_string())];
        let generated = date(7).and_hms_opt(18, 0, 0).unwrap();
        let report = AttendanceReport::build(date(2), date(3), &members, &records, generated);

        assert_eq!(report.members.len(), 2);
        assert_eq!(report.members[0].member_name.as_deref(), Some("Alice"));
        assert_eq!(report.average_rate(), 50.0);

        let rows = report.rows();
        assert_eq!(rows[0][1], "Alice");
        assert_eq!(rows[0][5], "7.00");
        assert_eq!(rows[1][7], "50.00");

        let summary = report.summary();
        assert!(summary.iter().any(|(k, v)| k == "Total Hours" && v == "8.00"));
    }
}
