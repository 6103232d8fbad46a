use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;

use ferias::workflows::vacation::{
    AccessDirectory, AcquisitionPeriod, ApprovalHistoryEntry, CycleLabel, DirectoryError,
    Employee, EmployeeId, Grant, LifecycleNotice, Notifier, NotifyError, OrgUnit, PeriodStatus,
    RepositoryError, RequestId, RequestStage, VacationRequest, VacationStore,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct StoreInner {
    employees: HashMap<EmployeeId, Employee>,
    periods: HashMap<(EmployeeId, CycleLabel), AcquisitionPeriod>,
    requests: HashMap<RequestId, VacationRequest>,
    grants: HashMap<RequestId, Grant>,
    history: Vec<ApprovalHistoryEntry>,
}

/// In-memory store backing the service until the relational adapter lands.
/// One mutex over every table keeps each transition atomic, matching the
/// transactional contract the trait demands.
#[derive(Default, Clone)]
pub(crate) struct InMemoryVacationStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl VacationStore for InMemoryVacationStore {
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
pub(crate) enum ActorRole {
    Staff,
    Manager,
    Executive,
}

/// Directory resolving decision capability from role and unit membership:
/// managers decide for their own unit, the executive for the organization.
#[derive(Default, Clone)]
pub(crate) struct UnitDirectory {
    entries: Arc<Mutex<HashMap<EmployeeId, (ActorRole, OrgUnit)>>>,
}

impl UnitDirectory {
    pub(crate) fn register(&self, id: EmployeeId, role: ActorRole, unit: OrgUnit) {
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

/// Notifier keeping notices in memory so the demo can print the inbox.
#[derive(Default, Clone)]
pub(crate) struct InMemoryNotifier {
    notices: Arc<Mutex<Vec<LifecycleNotice>>>,
}

impl InMemoryNotifier {
    pub(crate) fn notices(&self) -> Vec<LifecycleNotice> {
        self.notices.lock().expect("notifier mutex poisoned").clone()
    }
}

impl Notifier for InMemoryNotifier {
    fn notify(&self, notice: LifecycleNotice) -> Result<(), NotifyError> {
        self.notices
            .lock()
            .expect("notifier mutex poisoned")
            .push(notice);
        Ok(())
    }
}

fn employee(
    id: &str,
    name: &str,
    admitted: Option<NaiveDate>,
    unit: &str,
    manager: Option<&str>,
    executive: Option<&str>,
) -> Employee {
    Employee {
        id: EmployeeId(id.to_string()),
        name: name.to_string(),
        admission_date: admitted,
        unit: OrgUnit(unit.to_string()),
        manager: manager.map(|id| EmployeeId(id.to_string())),
        executive: executive.map(|id| EmployeeId(id.to_string())),
    }
}

/// Seed the default workforce: one executive, two unit managers, two
/// servidores reporting into GTI.
pub(crate) fn seed_workforce(store: &InMemoryVacationStore, directory: &UnitDirectory) {
    let admitted = |year, month, day| NaiveDate::from_ymd_opt(year, month, day);
    let workforce = [
        (
            employee("3001", "Carla Menezes", admitted(2010, 7, 19), "GAB", None, None),
            ActorRole::Executive,
        ),
        (
            employee(
                "2001",
                "Bruno Carvalho",
                admitted(2015, 3, 2),
                "GTI",
                None,
                Some("3001"),
            ),
            ActorRole::Manager,
        ),
        (
            employee(
                "2002",
                "Diego Rocha",
                admitted(2018, 11, 5),
                "GRH",
                None,
                Some("3001"),
            ),
            ActorRole::Manager,
        ),
        (
            employee(
                "1001",
                "Ana Beatriz Lima",
                admitted(2023, 1, 10),
                "GTI",
                Some("2001"),
                Some("3001"),
            ),
            ActorRole::Staff,
        ),
        (
            employee(
                "1002",
                "Elisa Prado",
                admitted(2022, 5, 20),
                "GTI",
                Some("2001"),
                Some("3001"),
            ),
            ActorRole::Staff,
        ),
    ];

    for (person, role) in workforce {
        directory.register(person.id.clone(), role, person.unit.clone());
        if let Err(err) = store.insert_employee(person) {
            tracing::warn!(%err, "workforce seed skipped an employee");
        }
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
