//! # Permission Module
//!
//! Per-member access grants scoped by device, date range, weekday and time
//! of day. There is no deny rule type: a rule either matches an instant and
//! grants access, or it does not apply.

use crate::clock::EvalInstant;
use crate::error::CoreError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Set of weekdays encoded 1 = Monday .. 7 = Sunday.
///
/// Stored as the compact digit string (`"12345"`), parsed into a bit set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DaysOfWeek(u8);

impl DaysOfWeek {
    pub const ALL: DaysOfWeek = DaysOfWeek(0b111_1111);
    pub const WEEKDAYS: DaysOfWeek = DaysOfWeek(0b001_1111);
    pub const NONE: DaysOfWeek = DaysOfWeek(0);

    /// Membership test; anything outside 1..=7 is never contained
    pub fn contains(&self, weekday: u8) -> bool {
        (1..=7).contains(&weekday) && self.0 & (1 << (weekday - 1)) != 0
    }

    pub fn insert(&mut self, weekday: u8) -> bool {
        if !(1..=7).contains(&weekday) {
            return false;
        }
        self.0 |= 1 << (weekday - 1);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl Default for DaysOfWeek {
    fn default() -> Self {
        Self::ALL
    }
}

impl FromStr for DaysOfWeek {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut days = DaysOfWeek::NONE;
        for c in s.trim().chars() {
            let day = c
                .to_digit(10)
                .filter(|d| (1..=7).contains(d))
                .ok_or_else(|| CoreError::InvalidDaysOfWeek(s.to_string()))?;
            days.insert(day as u8);
        }
        Ok(days)
    }
}

impl fmt::Display for DaysOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for day in 1..=7u8 {
            if self.contains(day) {
                write!(f, "{}", day)?;
            }
        }
        Ok(())
    }
}

impl Serialize for DaysOfWeek {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DaysOfWeek {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Lifecycle status of a rule; only active rules are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    Active,
    Inactive,
}

impl RuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleStatus::Active => "active",
            RuleStatus::Inactive => "inactive",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(RuleStatus::Active),
            "inactive" => Some(RuleStatus::Inactive),
            _ => None,
        }
    }
}

impl fmt::Display for RuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A time/date/device-scoped access grant for one member.
///
/// Rules of a member are ordered by `id` (creation sequence). Order never
/// changes the allow/deny outcome, only which rule an audit entry cites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionRule {
    pub id: i64,
    pub member_id: i64,
    /// `None` applies to every device
    pub device_id: Option<i64>,
    /// Free-form label, "full" by default
    pub permission_type: String,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub days_of_week: DaysOfWeek,
    pub status: RuleStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl PermissionRule {
    /// Unrestricted active rule for `member_id`
    pub fn new(id: i64, member_id: i64, created_at: NaiveDateTime) -> Self {
        Self {
            id,
            member_id,
            device_id: None,
            permission_type: "full".to_string(),
            start_time: None,
            end_time: None,
            start_date: None,
            end_date: None,
            days_of_week: DaysOfWeek::ALL,
            status: RuleStatus::Active,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn for_device(mut self, device_id: i64) -> Self {
        self.device_id = Some(device_id);
        self
    }

    pub fn on_days(mut self, days: DaysOfWeek) -> Self {
        self.days_of_week = days;
        self
    }

    pub fn between_times(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    pub fn between_dates(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == RuleStatus::Active
    }

    /// Whether this rule grants passage through `device_id` at `at`.
    ///
    /// All predicates must hold. The time window only applies when both
    /// bounds are set and is inclusive at both ends. Status is not checked
    /// here; callers evaluate active rules only.
    pub fn matches(&self, device_id: i64, at: &EvalInstant) -> bool {
        if self.device_id.is_some_and(|d| d != device_id) {
            return false;
        }
        if self.start_date.is_some_and(|start| at.date < start) {
            return false;
        }
        if self.end_date.is_some_and(|end| at.date > end) {
            return false;
        }
        if !self.days_of_week.contains(at.weekday) {
            return false;
        }
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            if at.time < start || at.time > end {
                return false;
            }
        }
        true
    }

    /// Reject rules whose bounds are inverted
    pub fn validate(&self) -> Result<(), CoreError> {
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            if start > end {
                return Err(CoreError::InvalidTimeWindow {
                    start: start.to_string(),
                    end: end.to_string(),
                });
            }
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(CoreError::InvalidDateRange {
                    start: start.to_string(),
                    end: end.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, FixedClock};

    fn created() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap()
    }

    fn at(day: u32, hour: u32, min: u32, sec: u32) -> EvalInstant {
        // March 2026: the 2nd is a Monday
        FixedClock::at(2026, 3, day, hour, min, sec).unwrap().instant()
    }

    fn hm(hour: u32, min: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, min, 0).unwrap()
    }

    #[test]
    fn test_days_of_week_parse_and_display() {
        let days: DaysOfWeek = "12345".parse().unwrap();
        assert!(days.contains(1));
        assert!(days.contains(5));
        assert!(!days.contains(6));
        assert!(!days.contains(0));
        assert!(!days.contains(8));
        assert_eq!(days, DaysOfWeek::WEEKDAYS);
        assert_eq!(days.to_string(), "12345");

        let unordered: DaysOfWeek = "7311".parse().unwrap();
        assert_eq!(unordered.to_string(), "137");

        assert!("1238".parse::<DaysOfWeek>().is_err());
        assert!("mon".parse::<DaysOfWeek>().is_err());
        assert!("".parse::<DaysOfWeek>().unwrap().is_empty());
    }

    #[test]
    fn test_days_of_week_serde() {
        let json = serde_json::to_string(&DaysOfWeek::ALL).unwrap();
        assert_eq!(json, "\"1234567\"");
        let back: DaysOfWeek = serde_json::from_str("\"67\"").unwrap();
        assert!(back.contains(6) && back.contains(7) && !back.contains(1));
    }

    #[test]
    fn test_unrestricted_rule_matches_anything() {
        let rule = PermissionRule::new(1, 10, created());
        assert!(rule.matches(1, &at(2, 0, 0, 0)));
        assert!(rule.matches(99, &at(8, 23, 59, 59)));
    }

    #[test]
    fn test_device_scope() {
        let rule = PermissionRule::new(1, 10, created()).for_device(4);
        assert!(rule.matches(4, &at(2, 10, 0, 0)));
        assert!(!rule.matches(5, &at(2, 10, 0, 0)));
    }

    #[test]
    fn test_weekday_filter_saturday() {
        let rule = PermissionRule::new(1, 10, created())
            .for_device(4)
            .on_days(DaysOfWeek::WEEKDAYS);
        // 2026-03-07 is a Saturday
        assert!(!rule.matches(4, &at(7, 10, 0, 0)));
        assert!(rule.matches(4, &at(6, 10, 0, 0)));
    }

    #[test]
    fn test_time_window_inclusive_bounds() {
        let rule = PermissionRule::new(1, 10, created()).between_times(hm(9, 0), hm(18, 0));

        assert!(rule.matches(1, &at(2, 9, 0, 0)));
        assert!(rule.matches(1, &at(2, 18, 0, 0)));
        assert!(!rule.matches(1, &at(2, 8, 59, 59)));
        assert!(!rule.matches(1, &at(2, 18, 0, 1)));
    }

    #[test]
    fn test_half_open_time_window_is_unrestricted() {
        let mut rule = PermissionRule::new(1, 10, created());
        rule.start_time = Some(hm(9, 0));
        assert!(rule.matches(1, &at(2, 3, 0, 0)));
    }

    #[test]
    fn test_date_range() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 3);
        let end = NaiveDate::from_ymd_opt(2026, 3, 5);
        let rule = PermissionRule::new(1, 10, created()).between_dates(start, end);

        assert!(!rule.matches(1, &at(2, 12, 0, 0)));
        assert!(rule.matches(1, &at(3, 0, 0, 0)));
        assert!(rule.matches(1, &at(5, 23, 59, 59)));
        assert!(!rule.matches(1, &at(6, 0, 0, 0)));

        let open_end = PermissionRule::new(2, 10, created()).between_dates(start, None);
        assert!(open_end.matches(1, &at(31, 12, 0, 0)));
    }

    #[test]
    fn test_validate_inverted_bounds() {
        let rule = PermissionRule::new(1, 10, created()).between_times(hm(18, 0), hm(9, 0));
        assert!(rule.validate().unwrap_err().is_range_error());

        let rule = PermissionRule::new(1, 10, created()).between_dates(
            NaiveDate::from_ymd_opt(2026, 5, 1),
            NaiveDate::from_ymd_opt(2026, 4, 1),
        );
        assert!(rule.validate().is_err());

        assert!(PermissionRule::new(1, 10, created()).validate().is_ok());
    }
}
