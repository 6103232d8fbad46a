use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{
    AcquisitionPeriod, ApprovalHistoryEntry, CycleLabel, Employee, EmployeeId, Grant, RequestId,
    RequestStage, VacationRequest,
};

/// Storage abstraction so the workflow can be exercised in isolation.
///
/// Period and request statuses are only ever mutated through the transition
/// methods, and every transition is conditional: the store compares the
/// current status against the expected one inside a single transaction and
/// answers `Stale` when a concurrent writer got there first. Plain
/// read-then-write sequences are not part of the contract.
pub trait VacationStore: Send + Sync {
    fn insert_employee(&self, employee: Employee) -> Result<(), RepositoryError>;
    fn employee(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError>;

    /// Creates an `Open` period; `Conflict` when the (employee, label) pair
    /// already exists.
    fn insert_period(&self, period: AcquisitionPeriod) -> Result<(), RepositoryError>;
    fn period(
        &self,
        employee: &EmployeeId,
        label: &CycleLabel,
    ) -> Result<Option<AcquisitionPeriod>, RepositoryError>;
    fn periods_for(&self, employee: &EmployeeId)
        -> Result<Vec<AcquisitionPeriod>, RepositoryError>;

    fn request(&self, id: &RequestId) -> Result<Option<VacationRequest>, RepositoryError>;
    fn requests_for(&self, employee: &EmployeeId)
        -> Result<Vec<VacationRequest>, RepositoryError>;
    fn requests_in_stage(&self, stage: RequestStage)
        -> Result<Vec<VacationRequest>, RepositoryError>;

    /// Files a new request in one transaction: moves its period
    /// `Open -> Requested` (`Stale` when the period is no longer open) and
    /// enforces the no-overlap exclusion against the employee's live
    /// requests (`Conflict` when another range intersects).
    fn open_request(&self, request: VacationRequest) -> Result<VacationRequest, RepositoryError>;

    /// Replaces a request after a non-terminal transition, conditional on
    /// its stored stage still being `expected`.
    fn advance_request(
        &self,
        request: VacationRequest,
        expected: RequestStage,
    ) -> Result<(), RepositoryError>;

    /// Terminal rejection: stage CAS plus the period transition
    /// `Requested -> Open`, together.
    fn reject_request(
        &self,
        request: VacationRequest,
        expected: RequestStage,
    ) -> Result<(), RepositoryError>;

    /// Terminal approval: stage CAS from `PendingExecutive`, the grant
    /// insert, and the period transition `Requested -> Granted` are one
    /// transaction; either all three land or none do.
    fn approve_request(&self, request: VacationRequest, grant: Grant)
        -> Result<(), RepositoryError>;

    fn grant_for(&self, request: &RequestId) -> Result<Option<Grant>, RepositoryError>;

    fn append_history(&self, entry: ApprovalHistoryEntry) -> Result<(), RepositoryError>;
    fn history_for(
        &self,
        request: &RequestId,
    ) -> Result<Vec<ApprovalHistoryEntry>, RepositoryError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("status changed concurrently")]
    Stale,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Identity collaborator answering the typed capability check: may `actor`
/// decide requests of `employee` at `stage`?
pub trait AccessDirectory: Send + Sync {
    fn can_decide(
        &self,
        actor: &EmployeeId,
        employee: &EmployeeId,
        stage: RequestStage,
    ) -> Result<bool, DirectoryError>;
}

/// Directory lookup error.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Trait describing outbound notification hooks (e-mail, in-app inbox).
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: LifecycleNotice) -> Result<(), NotifyError>;
}

/// Payload handed to the notifier after a lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleNotice {
    pub recipient: EmployeeId,
    pub request: RequestId,
    pub stage: RequestStage,
    pub message: String,
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Sanitized representation of a request for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct RequestStatusView {
    pub request_id: RequestId,
    pub employee_id: EmployeeId,
    pub period: CycleLabel,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub day_count: u32,
    pub stage: &'static str,
}

impl VacationRequest {
    pub fn status_view(&self) -> RequestStatusView {
        RequestStatusView {
            request_id: self.id.clone(),
            employee_id: self.employee.clone(),
            period: self.period_label.clone(),
            starts_on: self.starts_on,
            ends_on: self.ends_on,
            day_count: self.day_count,
            stage: self.stage.label(),
        }
    }
}
