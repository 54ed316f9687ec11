//! # Member Module
//!
//! Members enrolled at the facility and their membership lifecycle.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a member.
///
/// Only `Active` members can ever be authorized. Storage may hold values
/// outside the known set; those are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Active,
    Inactive,
    Expired,
    #[serde(untagged)]
    Other(String),
}

impl MemberStatus {
    /// Code string stored in the DB
    pub fn as_str(&self) -> &str {
        match self {
            MemberStatus::Active => "active",
            MemberStatus::Inactive => "inactive",
            MemberStatus::Expired => "expired",
            MemberStatus::Other(s) => s.as_str(),
        }
    }

    /// Parse from the stored string. Never fails; unknown values map to `Other`.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "active" => MemberStatus::Active,
            "inactive" => MemberStatus::Inactive,
            "expired" => MemberStatus::Expired,
            _ => MemberStatus::Other(s.to_string()),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, MemberStatus::Active)
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A person enrolled at the facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub name: String,
    /// Unique contact number
    pub phone: String,
    pub email: Option<String>,
    pub status: MemberStatus,
    pub branch_id: Option<i64>,
    /// Card / membership number printed for the member
    pub member_number: Option<String>,
    /// Membership plan label (monthly, annual, ...)
    pub membership_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Member {
    /// New active member without branch or membership window
    pub fn new(id: i64, name: &str, phone: &str, created_at: NaiveDateTime) -> Self {
        Self {
            id,
            name: name.to_string(),
            phone: phone.to_string(),
            email: None,
            status: MemberStatus::Active,
            branch_id: None,
            member_number: None,
            membership_type: None,
            start_date: None,
            end_date: None,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn with_status(mut self, status: MemberStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_branch(mut self, branch_id: i64) -> Self {
        self.branch_id = Some(branch_id);
        self
    }

    pub fn with_membership(mut self, member_number: &str, membership_type: &str) -> Self {
        self.member_number = Some(member_number.to_string());
        self.membership_type = Some(membership_type.to_string());
        self
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Summary handed back to the gate on an allowed decision
    pub fn info(&self) -> MemberInfo {
        MemberInfo {
            id: self.id,
            name: self.name.clone(),
            member_number: self.member_number.clone(),
            membership_type: self.membership_type.clone(),
        }
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{} - {})", self.name, self.id, self.status)
    }
}

/// Member details returned with an allowed decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    pub id: i64,
    pub name: String,
    pub member_number: Option<String>,
    pub membership_type: Option<String>,
}
