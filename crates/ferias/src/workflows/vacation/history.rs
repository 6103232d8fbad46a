use std::sync::Arc;

use tracing::warn;

use super::domain::{ApprovalHistoryEntry, RequestId};
use super::repository::{RepositoryError, VacationStore};

/// Append-only observer of approval decisions.
///
/// A failed append never rolls back the transition that triggered it; the
/// failure goes to operational monitoring through the log instead of the
/// caller.
pub struct HistoryLog<S> {
    store: Arc<S>,
}

impl<S: VacationStore> HistoryLog<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn record(&self, entry: ApprovalHistoryEntry) {
        if let Err(err) = self.store.append_history(entry.clone()) {
            warn!(
                request = %entry.request,
                actor = %entry.actor,
                %err,
                "approval history write failed",
            );
        }
    }

    /// Decisions recorded for a request, most recent first.
    pub fn history(
        &self,
        request: &RequestId,
    ) -> Result<Vec<ApprovalHistoryEntry>, RepositoryError> {
        let mut entries = self.store.history_for(request)?;
        entries.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(entries)
    }
}
