//! Authorization Engine - pure decision function
//!
//! `evaluate` never touches storage or the clock; the access service loads
//! its inputs and persists the audit record.

use biogate_core::{DenialReason, EvalInstant, Member, MemberInfo, MemberStatus, PermissionRule};
use serde::Serialize;

/// Outcome of one authorization evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Decision {
    Allowed {
        /// Rule that granted passage; `None` when the member has no active rules
        rule_id: Option<i64>,
        member: MemberInfo,
    },
    Denied {
        reason: DenialReason,
    },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }

    pub fn rule_id(&self) -> Option<i64> {
        match self {
            Decision::Allowed { rule_id, .. } => *rule_id,
            Decision::Denied { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<DenialReason> {
        match self {
            Decision::Allowed { .. } => None,
            Decision::Denied { reason } => Some(*reason),
        }
    }
}

fn denial_for(status: &MemberStatus) -> DenialReason {
    match status {
        MemberStatus::Expired => DenialReason::MembershipExpired,
        MemberStatus::Inactive => DenialReason::MembershipSuspended,
        _ => DenialReason::MembershipAbnormal,
    }
}

/// Decide whether `member` may pass `device_id` at `at`.
///
/// `rules` are the member's rules in creation order. Inactive rules are
/// skipped. With no active rule the member is allowed; otherwise the first
/// matching rule allows and no match denies.
pub fn evaluate(
    member: Option<&Member>,
    rules: &[PermissionRule],
    device_id: i64,
    at: &EvalInstant,
) -> Decision {
    let Some(member) = member else {
        return Decision::Denied {
            reason: DenialReason::MemberNotFound,
        };
    };

    if !member.is_active() {
        return Decision::Denied {
            reason: denial_for(&member.status),
        };
    }

    let mut active = rules.iter().filter(|r| r.is_active()).peekable();
    if active.peek().is_none() {
        return Decision::Allowed {
            rule_id: None,
            member: member.info(),
        };
    }

    match active.find(|rule| rule.matches(device_id, at)) {
        Some(rule) => Decision::Allowed {
            rule_id: Some(rule.id),
            member: member.info(),
        },
        None => Decision::Denied {
            reason: DenialReason::NoApplicablePermission,
        },
    }
}
