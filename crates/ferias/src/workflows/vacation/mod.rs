//! Vacation ("férias") entitlement tracking and two-tier approval workflow.
//!
//! An employee earns one acquisition period per 365 days of service. A
//! request files against an open period, travels through the line manager
//! and then the executive, and on final approval becomes an immutable leave
//! grant with a day balance. Every decision is appended to the approval
//! history and announced through the notifier.

pub mod domain;
pub(crate) mod grant;
pub(crate) mod history;
pub(crate) mod ledger;
pub mod repository;
pub mod router;
pub mod service;
pub(crate) mod validator;

#[cfg(test)]
mod tests;

pub use domain::{
    AcquisitionPeriod, ApprovalHistoryEntry, CycleLabel, Decision, Employee, EmployeeId, Grant,
    GrantTerms, LeaveType, OrgUnit, PeriodStatus, RequestId, RequestStage, VacationRequest,
};
pub use grant::{GrantError, GrantRecorder};
pub use history::HistoryLog;
pub use ledger::{LedgerError, PeriodLedger};
pub use repository::{
    AccessDirectory, DirectoryError, LifecycleNotice, Notifier, NotifyError, RepositoryError,
    RequestStatusView, VacationStore,
};
pub use router::vacation_router;
pub use service::{VacationService, VacationServiceError};
pub use validator::{day_count, RequestValidator, ValidationError};
