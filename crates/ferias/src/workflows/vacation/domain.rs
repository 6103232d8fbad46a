use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Registration number ("matrícula") identifying an employee.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmployeeId(pub String);

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for vacation requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Organizational unit sigla an employee reports into.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrgUnit(pub String);

/// Label of a 365-day acquisition cycle, formatted "YYYY/YYYY".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CycleLabel(pub String);

impl CycleLabel {
    /// Label covering a cycle from its start and end dates.
    pub fn spanning(starts_on: NaiveDate, ends_on: NaiveDate) -> Self {
        Self(format!("{}/{}", starts_on.year(), ends_on.year()))
    }
}

impl fmt::Display for CycleLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Workforce record as provided by HR onboarding.
///
/// The admission date stays optional: incomplete HR records exist and must
/// not block entitlement generation for everyone else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub admission_date: Option<NaiveDate>,
    pub unit: OrgUnit,
    pub manager: Option<EmployeeId>,
    pub executive: Option<EmployeeId>,
}

/// Lifecycle of an acquisition period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodStatus {
    Open,
    Requested,
    Granted,
    Closed,
}

impl PeriodStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PeriodStatus::Open => "open",
            PeriodStatus::Requested => "requested",
            PeriodStatus::Granted => "granted",
            PeriodStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for PeriodStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A 365-day entitlement cycle anchored to the employee's admission date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionPeriod {
    pub employee: EmployeeId,
    pub label: CycleLabel,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub status: PeriodStatus,
}

/// Position of a request within the two-tier approval chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStage {
    PendingManager,
    PendingExecutive,
    Approved,
    Rejected,
}

impl RequestStage {
    pub const fn label(self) -> &'static str {
        match self {
            RequestStage::PendingManager => "pending_manager",
            RequestStage::PendingExecutive => "pending_executive",
            RequestStage::Approved => "approved",
            RequestStage::Rejected => "rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, RequestStage::Approved | RequestStage::Rejected)
    }
}

impl fmt::Display for RequestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An employee's request against exactly one acquisition period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacationRequest {
    pub id: RequestId,
    pub employee: EmployeeId,
    pub period_label: CycleLabel,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    /// Inclusive span of the requested range, in days.
    pub day_count: u32,
    pub stage: RequestStage,
    pub manager_observation: Option<String>,
    pub executive_observation: Option<String>,
}

/// Leave category carried on a grant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveType {
    #[default]
    Regular,
    Collective,
}

impl LeaveType {
    pub const fn label(self) -> &'static str {
        match self {
            LeaveType::Regular => "regular",
            LeaveType::Collective => "collective",
        }
    }
}

/// Terms the executive supplies when confirming a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantTerms {
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub balance_days: i64,
    #[serde(default)]
    pub leave_type: LeaveType,
}

/// Finalized leave-enjoyment record.
///
/// Exists exactly when its request reached `Approved`; immutable afterwards
/// (balance consumption belongs to a separate process).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub request: RequestId,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub balance_days: u32,
    pub leave_type: LeaveType,
    pub year: i32,
}

/// Outcome recorded for a single decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub const fn label(self) -> &'static str {
        match self {
            Decision::Approved => "approved",
            Decision::Rejected => "rejected",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Append-only audit record of one decision on a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalHistoryEntry {
    pub request: RequestId,
    pub actor: EmployeeId,
    /// Stage the request was in when the decision was taken.
    pub stage: RequestStage,
    pub decision: Decision,
    pub observation: Option<String>,
    pub recorded_at: DateTime<Utc>,
}
