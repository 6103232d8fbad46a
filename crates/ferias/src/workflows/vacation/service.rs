use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use super::domain::{
    AcquisitionPeriod, ApprovalHistoryEntry, CycleLabel, Decision, Employee, EmployeeId, Grant,
    GrantTerms, RequestId, RequestStage, VacationRequest,
};
use super::grant::{GrantError, GrantRecorder};
use super::history::HistoryLog;
use super::ledger::PeriodLedger;
use super::repository::{
    AccessDirectory, DirectoryError, LifecycleNotice, Notifier, RepositoryError, VacationStore,
};
use super::validator::{RequestValidator, ValidationError};

/// Facade over the vacation approval state machine, composing the period
/// ledger, the request validator, the grant recorder, and the history log
/// against the store, directory, and notifier collaborators.
pub struct VacationService<S, D, N> {
    store: Arc<S>,
    directory: Arc<D>,
    notifier: Arc<N>,
    ledger: PeriodLedger<S>,
    validator: RequestValidator,
    recorder: GrantRecorder,
    log: HistoryLog<S>,
}

static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> RequestId {
    let id = REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RequestId(format!("req-{id:06}"))
}

impl<S, D, N> VacationService<S, D, N>
where
    S: VacationStore + 'static,
    D: AccessDirectory + 'static,
    N: Notifier + 'static,
{
    pub fn new(store: Arc<S>, directory: Arc<D>, notifier: Arc<N>) -> Self {
        Self {
            ledger: PeriodLedger::new(store.clone()),
            log: HistoryLog::new(store.clone()),
            validator: RequestValidator,
            recorder: GrantRecorder,
            store,
            directory,
            notifier,
        }
    }

    /// Derive every missing acquisition period for an employee (idempotent).
    pub fn ensure_periods(
        &self,
        employee_id: &EmployeeId,
        today: NaiveDate,
    ) -> Result<Vec<AcquisitionPeriod>, VacationServiceError> {
        let employee = self.employee(employee_id)?;
        Ok(self.ledger.ensure_periods(&employee, today)?)
    }

    /// Periods the employee may still file a request against.
    pub fn open_periods(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<Vec<AcquisitionPeriod>, VacationServiceError> {
        let employee = self.employee(employee_id)?;
        Ok(self.ledger.open_periods(&employee.id)?)
    }

    /// File a new request against an open acquisition period.
    ///
    /// The store repeats the period status check and the overlap exclusion
    /// under one transaction, so two simultaneous submissions cannot both
    /// land; the loser gets the same typed error a sequential caller would.
    pub fn submit_request(
        &self,
        employee_id: &EmployeeId,
        label: &CycleLabel,
        starts_on: NaiveDate,
        ends_on: NaiveDate,
    ) -> Result<VacationRequest, VacationServiceError> {
        let employee = self.employee(employee_id)?;
        let period = self.period(employee_id, label)?;
        let existing = self.store.requests_for(employee_id)?;
        let day_count = self
            .validator
            .validate(&period, starts_on, ends_on, &existing)?;

        let request = VacationRequest {
            id: next_request_id(),
            employee: employee.id.clone(),
            period_label: period.label.clone(),
            starts_on,
            ends_on,
            day_count,
            stage: RequestStage::PendingManager,
            manager_observation: None,
            executive_observation: None,
        };

        let request = match self.store.open_request(request) {
            Ok(request) => request,
            Err(err @ (RepositoryError::Stale | RepositoryError::Conflict)) => {
                // A concurrent submission won the race; re-run the checks
                // against fresh state for the precise error.
                let period = self.period(employee_id, label)?;
                let existing = self.store.requests_for(employee_id)?;
                self.validator
                    .validate(&period, starts_on, ends_on, &existing)?;
                return Err(err.into());
            }
            Err(err) => return Err(err.into()),
        };

        if let Some(manager) = employee.manager.clone() {
            self.dispatch(LifecycleNotice {
                recipient: manager,
                request: request.id.clone(),
                stage: request.stage,
                message: format!("Nova solicitação de férias de {}", employee.name),
            });
        }

        info!(request = %request.id, employee = %employee.id, "vacation request submitted");
        Ok(request)
    }

    /// Apply a manager or executive decision to a pending request.
    ///
    /// Executive approval must carry grant terms; recording the grant and
    /// marking the request approved are one store transaction.
    pub fn decide(
        &self,
        request_id: &RequestId,
        actor_id: &EmployeeId,
        approved: bool,
        observation: Option<String>,
        terms: Option<GrantTerms>,
    ) -> Result<VacationRequest, VacationServiceError> {
        let request = self
            .store
            .request(request_id)?
            .ok_or_else(|| VacationServiceError::UnknownRequest(request_id.clone()))?;
        let stage = request.stage;
        if stage.is_terminal() {
            return Err(VacationServiceError::AlreadyDecided(request_id.clone()));
        }

        let employee = self.employee(&request.employee)?;
        if !self.directory.can_decide(actor_id, &employee.id, stage)? {
            return Err(VacationServiceError::Unauthorized {
                actor: actor_id.clone(),
                employee: employee.id.clone(),
                stage,
            });
        }

        let decided = match stage {
            RequestStage::PendingManager if approved => {
                self.advance_to_executive(request, observation.clone())?
            }
            RequestStage::PendingExecutive if approved => {
                let terms = terms.ok_or(GrantError::MissingTerms)?;
                self.approve(request, observation.clone(), terms)?
            }
            _ => self.reject(request, stage, observation.clone())?,
        };

        let decision = if approved {
            Decision::Approved
        } else {
            Decision::Rejected
        };
        self.log.record(ApprovalHistoryEntry {
            request: decided.id.clone(),
            actor: actor_id.clone(),
            stage,
            decision,
            observation,
            recorded_at: Utc::now(),
        });
        self.notify_decision(&employee, &decided, stage, decision);

        info!(
            request = %decided.id,
            actor = %actor_id,
            stage = %stage,
            decision = %decision,
            "vacation request decided",
        );
        Ok(decided)
    }

    /// Requests awaiting the given actor at a pending stage.
    pub fn list_pending(
        &self,
        actor_id: &EmployeeId,
        stage: RequestStage,
    ) -> Result<Vec<VacationRequest>, VacationServiceError> {
        let mut pending = Vec::new();
        for request in self.store.requests_in_stage(stage)? {
            if self
                .directory
                .can_decide(actor_id, &request.employee, stage)?
            {
                pending.push(request);
            }
        }
        Ok(pending)
    }

    /// Decision trail for a request, most recent first.
    pub fn history(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<ApprovalHistoryEntry>, VacationServiceError> {
        if self.store.request(request_id)?.is_none() {
            return Err(VacationServiceError::UnknownRequest(request_id.clone()));
        }
        Ok(self.log.history(request_id)?)
    }

    /// The grant recorded for a request, present once it is approved.
    pub fn grant_for(
        &self,
        request_id: &RequestId,
    ) -> Result<Option<Grant>, VacationServiceError> {
        Ok(self.store.grant_for(request_id)?)
    }

    fn advance_to_executive(
        &self,
        mut request: VacationRequest,
        observation: Option<String>,
    ) -> Result<VacationRequest, VacationServiceError> {
        let expected = request.stage;
        request.stage = RequestStage::PendingExecutive;
        request.manager_observation = observation;
        match self.store.advance_request(request.clone(), expected) {
            Ok(()) => Ok(request),
            Err(RepositoryError::Stale) => Err(VacationServiceError::AlreadyDecided(request.id)),
            Err(err) => Err(err.into()),
        }
    }

    fn reject(
        &self,
        mut request: VacationRequest,
        stage: RequestStage,
        observation: Option<String>,
    ) -> Result<VacationRequest, VacationServiceError> {
        request.stage = RequestStage::Rejected;
        match stage {
            RequestStage::PendingManager => request.manager_observation = observation,
            _ => request.executive_observation = observation,
        }
        match self.store.reject_request(request.clone(), stage) {
            Ok(()) => Ok(request),
            Err(RepositoryError::Stale) => Err(VacationServiceError::AlreadyDecided(request.id)),
            Err(err) => Err(err.into()),
        }
    }

    fn approve(
        &self,
        mut request: VacationRequest,
        observation: Option<String>,
        terms: GrantTerms,
    ) -> Result<VacationRequest, VacationServiceError> {
        let grant = self.recorder.materialize(&request, terms)?;
        request.stage = RequestStage::Approved;
        request.executive_observation = observation;
        match self.store.approve_request(request.clone(), grant) {
            Ok(()) => Ok(request),
            Err(RepositoryError::Stale) => Err(VacationServiceError::AlreadyDecided(request.id)),
            Err(err) => Err(err.into()),
        }
    }

    fn notify_decision(
        &self,
        employee: &Employee,
        request: &VacationRequest,
        decided_stage: RequestStage,
        decision: Decision,
    ) {
        let message = match request.stage {
            RequestStage::PendingExecutive => {
                "Sua solicitação de férias foi aprovada pelo gerente.".to_string()
            }
            RequestStage::Approved => {
                "Sua solicitação de férias foi confirmada. Gozo registrado.".to_string()
            }
            _ => "Sua solicitação de férias foi reprovada.".to_string(),
        };
        self.dispatch(LifecycleNotice {
            recipient: employee.id.clone(),
            request: request.id.clone(),
            stage: request.stage,
            message,
        });

        if decided_stage == RequestStage::PendingManager {
            if let Some(executive) = employee.executive.clone() {
                let verdict = match decision {
                    Decision::Approved => "aprovada",
                    Decision::Rejected => "reprovada",
                };
                self.dispatch(LifecycleNotice {
                    recipient: executive,
                    request: request.id.clone(),
                    stage: request.stage,
                    message: format!(
                        "Solicitação de férias de {} foi {verdict} pelo gerente.",
                        employee.name
                    ),
                });
            }
        }
    }

    fn dispatch(&self, notice: LifecycleNotice) {
        if let Err(err) = self.notifier.notify(notice) {
            warn!(%err, "lifecycle notification failed");
        }
    }

    fn employee(&self, id: &EmployeeId) -> Result<Employee, VacationServiceError> {
        self.store
            .employee(id)?
            .ok_or_else(|| VacationServiceError::UnknownEmployee(id.clone()))
    }

    fn period(
        &self,
        employee: &EmployeeId,
        label: &CycleLabel,
    ) -> Result<AcquisitionPeriod, VacationServiceError> {
        self.store.period(employee, label)?.ok_or_else(|| {
            VacationServiceError::UnknownPeriod(employee.clone(), label.clone())
        })
    }
}

/// Error raised by the vacation service facade.
#[derive(Debug, thiserror::Error)]
pub enum VacationServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Grant(#[from] GrantError),
    #[error("employee {0} is not registered")]
    UnknownEmployee(EmployeeId),
    #[error("employee {0} has no acquisition period {1}")]
    UnknownPeriod(EmployeeId, CycleLabel),
    #[error("request {0} not found")]
    UnknownRequest(RequestId),
    #[error("{actor} may not decide for {employee} at stage {stage}")]
    Unauthorized {
        actor: EmployeeId,
        employee: EmployeeId,
        stage: RequestStage,
    },
    #[error("request {0} was already decided")]
    AlreadyDecided(RequestId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}
