use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use crate::workflows::vacation::domain::{
    AcquisitionPeriod, ApprovalHistoryEntry, CycleLabel, Employee, EmployeeId, Grant, GrantTerms,
    LeaveType, OrgUnit, PeriodStatus, RequestId, RequestStage, VacationRequest,
};
use crate::workflows::vacation::repository::{
    AccessDirectory, DirectoryError, LifecycleNotice, Notifier, NotifyError, RepositoryError,
    VacationStore,
};
use crate::workflows::vacation::service::VacationService;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn servidor() -> Employee {
    Employee {
        id: EmployeeId("1001".to_string()),
        name: "Ana Beatriz Lima".to_string(),
        admission_date: Some(date(2023, 1, 10)),
        unit: OrgUnit("GTI".to_string()),
        manager: Some(EmployeeId("2001".to_string())),
        executive: Some(EmployeeId("3001".to_string())),
    }
}

pub(super) fn gerente() -> Employee {
    Employee {
        id: EmployeeId("2001".to_string()),
        name: "Bruno Carvalho".to_string(),
        admission_date: Some(date(2015, 3, 2)),
        unit: OrgUnit("GTI".to_string()),
        manager: None,
        executive: Some(EmployeeId("3001".to_string())),
    }
}

pub(super) fn executiva() -> Employee {
    Employee {
        id: EmployeeId("3001".to_string()),
        name: "Carla Menezes".to_string(),
        admission_date: Some(date(2010, 7, 19)),
        unit: OrgUnit("GAB".to_string()),
        manager: None,
        executive: None,
    }
}

pub(super) fn gerente_outra_unidade() -> Employee {
    Employee {
        id: EmployeeId("2002".to_string()),
        name: "Diego Rocha".to_string(),
        admission_date: Some(date(2018, 11, 5)),
        unit: OrgUnit("GRH".to_string()),
        manager: None,
        executive: Some(EmployeeId("3001".to_string())),
    }
}

pub(super) fn grant_terms(balance_days: i64) -> GrantTerms {
    GrantTerms {
        starts_on: date(2024, 3, 1),
        ends_on: date(2024, 3, 10),
        balance_days,
        leave_type: LeaveType::Regular,
    }
}

pub(super) fn period(employee: &Employee, label: &str, status: PeriodStatus) -> AcquisitionPeriod {
    AcquisitionPeriod {
        employee: employee.id.clone(),
        label: CycleLabel(label.to_string()),
        starts_on: date(2023, 1, 10),
        ends_on: date(2024, 1, 10),
        status,
    }
}

pub(super) fn request(
    id: &str,
    employee: &Employee,
    starts_on: NaiveDate,
    ends_on: NaiveDate,
    stage: RequestStage,
) -> VacationRequest {
    VacationRequest {
        id: RequestId(id.to_string()),
        employee: employee.id.clone(),
        period_label: CycleLabel("2023/2024".to_string()),
        starts_on,
        ends_on,
        day_count: ((ends_on - starts_on).num_days() + 1) as u32,
        stage,
        manager_observation: None,
        executive_observation: None,
    }
}

#[derive(Default)]
struct StoreInner {
    employees: HashMap<EmployeeId, Employee>,
    periods: HashMap<(EmployeeId, CycleLabel), AcquisitionPeriod>,
    requests: HashMap<RequestId, VacationRequest>,
    grants: HashMap<RequestId, Grant>,
    history: Vec<ApprovalHistoryEntry>,
}

/// Reference store keeping every table behind one mutex so each transition
/// really is atomic.
#[derive(Default, Clone)]
pub(super) struct MemoryStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl MemoryStore {
    pub(super) fn period_count(&self) -> usize {
        self.inner.lock().expect("store mutex poisoned").periods.len()
    }
}

impl VacationStore for MemoryStore {
    fn insert_employee(&self, employee: Employee) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        if inner.employees.contains_key(&employee.id) {
            return Err(RepositoryError::Conflict);
        }
        inner.employees.insert(employee.id.clone(), employee);
        Ok(())
    }

    fn employee(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner.employees.get(id).cloned())
    }

    fn insert_period(&self, period: AcquisitionPeriod) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        let key = (period.employee.clone(), period.label.clone());
        if inner.periods.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }
        inner.periods.insert(key, period);
        Ok(())
    }

    fn period(
        &self,
        employee: &EmployeeId,
        label: &CycleLabel,
    ) -> Result<Option<AcquisitionPeriod>, RepositoryError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner
            .periods
            .get(&(employee.clone(), label.clone()))
            .cloned())
    }

    fn periods_for(
        &self,
        employee: &EmployeeId,
    ) -> Result<Vec<AcquisitionPeriod>, RepositoryError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner
            .periods
            .values()
            .filter(|period| &period.employee == employee)
            .cloned()
            .collect())
    }

    fn request(&self, id: &RequestId) -> Result<Option<VacationRequest>, RepositoryError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner.requests.get(id).cloned())
    }

    fn requests_for(
        &self,
        employee: &EmployeeId,
    ) -> Result<Vec<VacationRequest>, RepositoryError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner
            .requests
            .values()
            .filter(|request| &request.employee == employee)
            .cloned()
            .collect())
    }

    fn requests_in_stage(
        &self,
        stage: RequestStage,
    ) -> Result<Vec<VacationRequest>, RepositoryError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner
            .requests
            .values()
            .filter(|request| request.stage == stage)
            .cloned()
            .collect())
    }

    fn open_request(&self, request: VacationRequest) -> Result<VacationRequest, RepositoryError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        let conflicting = inner.requests.values().any(|existing| {
            existing.employee == request.employee
                && (!existing.stage.is_terminal()
                    || (existing.stage == RequestStage::Approved
                        && existing.starts_on <= request.ends_on
                        && existing.ends_on >= request.starts_on))
        });
        if conflicting || inner.requests.contains_key(&request.id) {
            return Err(RepositoryError::Conflict);
        }
        let key = (request.employee.clone(), request.period_label.clone());
        let Some(period) = inner.periods.get(&key) else {
            return Err(RepositoryError::NotFound);
        };
        if period.status != PeriodStatus::Open {
            return Err(RepositoryError::Stale);
        }
        if let Some(period) = inner.periods.get_mut(&key) {
            period.status = PeriodStatus::Requested;
        }
        inner.requests.insert(request.id.clone(), request.clone());
        Ok(request)
    }

    fn advance_request(
        &self,
        request: VacationRequest,
        expected: RequestStage,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        let Some(current) = inner.requests.get_mut(&request.id) else {
            return Err(RepositoryError::NotFound);
        };
        if current.stage != expected {
            return Err(RepositoryError::Stale);
        }
        *current = request;
        Ok(())
    }

    fn reject_request(
        &self,
        request: VacationRequest,
        expected: RequestStage,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        {
            let Some(current) = inner.requests.get_mut(&request.id) else {
                return Err(RepositoryError::NotFound);
            };
            if current.stage != expected {
                return Err(RepositoryError::Stale);
            }
            *current = request.clone();
        }
        let key = (request.employee.clone(), request.period_label.clone());
        if let Some(period) = inner.periods.get_mut(&key) {
            if period.status == PeriodStatus::Requested {
                period.status = PeriodStatus::Open;
            }
        }
        Ok(())
    }

    fn approve_request(
        &self,
        request: VacationRequest,
        grant: Grant,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        if inner.grants.contains_key(&grant.request) {
            return Err(RepositoryError::Conflict);
        }
        {
            let Some(current) = inner.requests.get_mut(&request.id) else {
                return Err(RepositoryError::NotFound);
            };
            if current.stage != RequestStage::PendingExecutive {
                return Err(RepositoryError::Stale);
            }
            *current = request.clone();
        }
        let key = (request.employee.clone(), request.period_label.clone());
        if let Some(period) = inner.periods.get_mut(&key) {
            if period.status == PeriodStatus::Requested {
                period.status = PeriodStatus::Granted;
            }
        }
        inner.grants.insert(grant.request.clone(), grant);
        Ok(())
    }

    fn grant_for(&self, request: &RequestId) -> Result<Option<Grant>, RepositoryError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner.grants.get(request).cloned())
    }

    fn append_history(&self, entry: ApprovalHistoryEntry) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner.history.push(entry);
        Ok(())
    }

    fn history_for(
        &self,
        request: &RequestId,
    ) -> Result<Vec<ApprovalHistoryEntry>, RepositoryError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner
            .history
            .iter()
            .filter(|entry| &entry.request == request)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ActorRole {
    Staff,
    Manager,
    Executive,
}

/// Directory granting manager capability within the same unit and executive
/// capability organization-wide.
#[derive(Default, Clone)]
pub(super) struct UnitDirectory {
    entries: Arc<Mutex<HashMap<EmployeeId, (ActorRole, OrgUnit)>>>,
}

impl UnitDirectory {
    pub(super) fn register(&self, id: EmployeeId, role: ActorRole, unit: OrgUnit) {
        self.entries
            .lock()
            .expect("directory mutex poisoned")
            .insert(id, (role, unit));
    }
}

impl AccessDirectory for UnitDirectory {
    fn can_decide(
        &self,
        actor: &EmployeeId,
        employee: &EmployeeId,
        stage: RequestStage,
    ) -> Result<bool, DirectoryError> {
        let entries = self.entries.lock().expect("directory mutex poisoned");
        let Some((actor_role, actor_unit)) = entries.get(actor) else {
            return Ok(false);
        };
        match stage {
            RequestStage::PendingManager => {
                let Some((_, employee_unit)) = entries.get(employee) else {
                    return Ok(false);
                };
                Ok(*actor_role == ActorRole::Manager && actor_unit == employee_unit)
            }
            RequestStage::PendingExecutive => Ok(*actor_role == ActorRole::Executive),
            RequestStage::Approved | RequestStage::Rejected => Ok(false),
        }
    }
}

#[derive(Default, Clone)]
pub(super) struct RecordingNotifier {
    notices: Arc<Mutex<Vec<LifecycleNotice>>>,
}

impl RecordingNotifier {
    pub(super) fn notices(&self) -> Vec<LifecycleNotice> {
        self.notices.lock().expect("notifier mutex poisoned").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: LifecycleNotice) -> Result<(), NotifyError> {
        self.notices
            .lock()
            .expect("notifier mutex poisoned")
            .push(notice);
        Ok(())
    }
}

pub(super) struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn notify(&self, _notice: LifecycleNotice) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp relay offline".to_string()))
    }
}

/// Store whose history appends fail while every transition still lands, for
/// exercising the observer's no-rollback rule.
#[derive(Default, Clone)]
pub(super) struct HistoryFailStore {
    pub(super) inner: MemoryStore,
}

impl VacationStore for HistoryFailStore {
    fn insert_employee(&self, employee: Employee) -> Result<(), RepositoryError> {
        self.inner.insert_employee(employee)
    }

    fn employee(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        self.inner.employee(id)
    }

    fn insert_period(&self, period: AcquisitionPeriod) -> Result<(), RepositoryError> {
        self.inner.insert_period(period)
    }

    fn period(
        &self,
        employee: &EmployeeId,
        label: &CycleLabel,
    ) -> Result<Option<AcquisitionPeriod>, RepositoryError> {
        self.inner.period(employee, label)
    }

    fn periods_for(
        &self,
        employee: &EmployeeId,
    ) -> Result<Vec<AcquisitionPeriod>, RepositoryError> {
        self.inner.periods_for(employee)
    }

    fn request(&self, id: &RequestId) -> Result<Option<VacationRequest>, RepositoryError> {
        self.inner.request(id)
    }

    fn requests_for(
        &self,
        employee: &EmployeeId,
    ) -> Result<Vec<VacationRequest>, RepositoryError> {
        self.inner.requests_for(employee)
    }

    fn requests_in_stage(
        &self,
        stage: RequestStage,
    ) -> Result<Vec<VacationRequest>, RepositoryError> {
        self.inner.requests_in_stage(stage)
    }

    fn open_request(&self, request: VacationRequest) -> Result<VacationRequest, RepositoryError> {
        self.inner.open_request(request)
    }

    fn advance_request(
        &self,
        request: VacationRequest,
        expected: RequestStage,
    ) -> Result<(), RepositoryError> {
        self.inner.advance_request(request, expected)
    }

    fn reject_request(
        &self,
        request: VacationRequest,
        expected: RequestStage,
    ) -> Result<(), RepositoryError> {
        self.inner.reject_request(request, expected)
    }

    fn approve_request(
        &self,
        request: VacationRequest,
        grant: Grant,
    ) -> Result<(), RepositoryError> {
        self.inner.approve_request(request, grant)
    }

    fn grant_for(&self, request: &RequestId) -> Result<Option<Grant>, RepositoryError> {
        self.inner.grant_for(request)
    }

    fn append_history(&self, _entry: ApprovalHistoryEntry) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("audit volume full".to_string()))
    }

    fn history_for(
        &self,
        request: &RequestId,
    ) -> Result<Vec<ApprovalHistoryEntry>, RepositoryError> {
        self.inner.history_for(request)
    }
}

pub(super) fn seed(store: &MemoryStore, directory: &UnitDirectory) {
    for employee in [servidor(), gerente(), executiva(), gerente_outra_unidade()] {
        let role = match employee.id.0.as_str() {
            "2001" | "2002" => ActorRole::Manager,
            "3001" => ActorRole::Executive,
            _ => ActorRole::Staff,
        };
        directory.register(employee.id.clone(), role, employee.unit.clone());
        store.insert_employee(employee).expect("seed employee");
    }
}

pub(super) fn build_service() -> (
    VacationService<MemoryStore, UnitDirectory, RecordingNotifier>,
    Arc<MemoryStore>,
    Arc<RecordingNotifier>,
) {
    let store = Arc::new(MemoryStore::default());
    let directory = Arc::new(UnitDirectory::default());
    let notifier = Arc::new(RecordingNotifier::default());
    seed(&store, &directory);
    let service = VacationService::new(store.clone(), directory, notifier.clone());
    (service, store, notifier)
}

/// Generates the servidor's periods and files the canonical March request.
pub(super) fn submit_march_request(
    service: &VacationService<MemoryStore, UnitDirectory, RecordingNotifier>,
) -> VacationRequest {
    service
        .ensure_periods(&servidor().id, date(2024, 2, 1))
        .expect("periods generated");
    service
        .submit_request(
            &servidor().id,
            &CycleLabel("2023/2024".to_string()),
            date(2024, 3, 1),
            date(2024, 3, 10),
        )
        .expect("request submitted")
}
