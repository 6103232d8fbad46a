use std::sync::Arc;

use chrono::{Duration, NaiveDate};

use super::domain::{AcquisitionPeriod, CycleLabel, Employee, EmployeeId, PeriodStatus};
use super::repository::{RepositoryError, VacationStore};

/// Length of one acquisition cycle, per the annual entitlement rule.
const CYCLE_DAYS: i64 = 365;

/// Derives and maintains acquisition periods from an employee's admission
/// date. Creation is the only side effect; nothing is notified.
pub struct PeriodLedger<S> {
    store: Arc<S>,
}

/// Error raised by the ledger's lookups.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("no open acquisition period {label} for employee {employee}")]
    NotFound {
        employee: EmployeeId,
        label: CycleLabel,
    },
    #[error(transparent)]
    Store(#[from] RepositoryError),
}

impl<S: VacationStore> PeriodLedger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Creates an `Open` period for every 365-day cycle fully served by
    /// `today` and not yet recorded, returning the ones created. A cycle
    /// still in progress earns nothing yet.
    ///
    /// Idempotent: the store enforces uniqueness on (employee, label), and
    /// an existing label is skipped rather than treated as a failure. An
    /// unset admission date makes this a no-op so one incomplete HR record
    /// cannot block ledger generation for the rest of the workforce.
    pub fn ensure_periods(
        &self,
        employee: &Employee,
        today: NaiveDate,
    ) -> Result<Vec<AcquisitionPeriod>, RepositoryError> {
        let Some(admission) = employee.admission_date else {
            return Ok(Vec::new());
        };

        let mut created = Vec::new();
        let mut starts_on = admission;
        loop {
            let ends_on = starts_on + Duration::days(CYCLE_DAYS);
            if ends_on > today {
                break;
            }
            let period = AcquisitionPeriod {
                employee: employee.id.clone(),
                label: CycleLabel::spanning(starts_on, ends_on),
                starts_on,
                ends_on,
                status: PeriodStatus::Open,
            };
            match self.store.insert_period(period.clone()) {
                Ok(()) => created.push(period),
                Err(RepositoryError::Conflict) => {}
                Err(err) => return Err(err),
            }
            starts_on = ends_on;
        }
        Ok(created)
    }

    /// The open period carrying `label`, required before a request is filed.
    pub fn find_open_period(
        &self,
        employee: &EmployeeId,
        label: &CycleLabel,
    ) -> Result<AcquisitionPeriod, LedgerError> {
        match self.store.period(employee, label)? {
            Some(period) if period.status == PeriodStatus::Open => Ok(period),
            _ => Err(LedgerError::NotFound {
                employee: employee.clone(),
                label: label.clone(),
            }),
        }
    }

    /// Every period still accepting requests, newest cycle first.
    pub fn open_periods(
        &self,
        employee: &EmployeeId,
    ) -> Result<Vec<AcquisitionPeriod>, RepositoryError> {
        let mut periods: Vec<_> = self
            .store
            .periods_for(employee)?
            .into_iter()
            .filter(|period| period.status == PeriodStatus::Open)
            .collect();
        periods.sort_by(|a, b| b.starts_on.cmp(&a.starts_on));
        Ok(periods)
    }
}
