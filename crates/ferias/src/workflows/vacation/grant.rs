use chrono::{Datelike, NaiveDate};

use super::domain::{Grant, GrantTerms, VacationRequest};

/// Errors raised while materializing grant terms.
#[derive(Debug, thiserror::Error)]
pub enum GrantError {
    #[error("grant balance must not be negative (got {0})")]
    InvalidBalance(i64),
    #[error("grant range is inverted ({starts_on} after {ends_on})")]
    RangeMismatch {
        starts_on: NaiveDate,
        ends_on: NaiveDate,
    },
    #[error("executive approval requires grant terms")]
    MissingTerms,
}

/// Shapes the immutable leave grant out of executive-supplied terms.
///
/// Persisting the grant stays with the caller: the `Approved` transition and
/// the grant insert must share one store transaction, so this type only
/// validates and builds the record.
#[derive(Debug, Default, Clone)]
pub struct GrantRecorder;

impl GrantRecorder {
    pub fn materialize(
        &self,
        request: &VacationRequest,
        terms: GrantTerms,
    ) -> Result<Grant, GrantError> {
        if terms.balance_days < 0 {
            return Err(GrantError::InvalidBalance(terms.balance_days));
        }
        if terms.ends_on < terms.starts_on {
            return Err(GrantError::RangeMismatch {
                starts_on: terms.starts_on,
                ends_on: terms.ends_on,
            });
        }

        Ok(Grant {
            request: request.id.clone(),
            starts_on: terms.starts_on,
            ends_on: terms.ends_on,
            balance_days: terms.balance_days as u32,
            leave_type: terms.leave_type,
            year: terms.starts_on.year(),
        })
    }
}
