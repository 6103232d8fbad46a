use chrono::NaiveDate;

use super::domain::{
    AcquisitionPeriod, CycleLabel, PeriodStatus, RequestId, RequestStage, VacationRequest,
};

/// Validation errors raised before a request enters the approval chain.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("period {label} is not accepting requests (currently {status})")]
    PeriodNotOpen {
        label: CycleLabel,
        status: PeriodStatus,
    },
    #[error("requested range is inverted ({starts_on} after {ends_on})")]
    InvalidRange {
        starts_on: NaiveDate,
        ends_on: NaiveDate,
    },
    #[error("requested range collides with request {existing} ({starts_on}..{ends_on})")]
    OverlappingRequest {
        existing: RequestId,
        starts_on: NaiveDate,
        ends_on: NaiveDate,
    },
    #[error("request {existing} is still awaiting a decision")]
    RequestAlreadyPending { existing: RequestId },
}

/// Gatekeeper run before a request is handed to the approval chain.
#[derive(Debug, Default, Clone)]
pub struct RequestValidator;

impl RequestValidator {
    /// Checks eligibility and returns the inclusive day count.
    ///
    /// A rejected request frees its range; every other stage, including
    /// `Approved`, still blocks overlapping submissions. The overlap check
    /// runs before the period-status check so a colliding range is always
    /// reported as a collision, whichever submission came first.
    pub fn validate(
        &self,
        period: &AcquisitionPeriod,
        starts_on: NaiveDate,
        ends_on: NaiveDate,
        existing: &[VacationRequest],
    ) -> Result<u32, ValidationError> {
        if starts_on > ends_on {
            return Err(ValidationError::InvalidRange { starts_on, ends_on });
        }

        if let Some(other) = existing.iter().find(|request| {
            request.stage != RequestStage::Rejected
                && request.starts_on <= ends_on
                && request.ends_on >= starts_on
        }) {
            return Err(ValidationError::OverlappingRequest {
                existing: other.id.clone(),
                starts_on: other.starts_on,
                ends_on: other.ends_on,
            });
        }

        // one live request at a time keeps at most one period in Requested
        if let Some(other) = existing.iter().find(|request| !request.stage.is_terminal()) {
            return Err(ValidationError::RequestAlreadyPending {
                existing: other.id.clone(),
            });
        }

        if period.status != PeriodStatus::Open {
            return Err(ValidationError::PeriodNotOpen {
                label: period.label.clone(),
                status: period.status,
            });
        }

        Ok(day_count(starts_on, ends_on))
    }
}

/// Inclusive span of a date range, in days.
pub fn day_count(starts_on: NaiveDate, ends_on: NaiveDate) -> u32 {
    ((ends_on - starts_on).num_days() + 1) as u32
}
