//! Job run summaries.

use serde::Serialize;

use super::DocumentClass;

/// Counters for one expiry job run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpirySummary {
    /// `None` when the run covered every document class
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_class: Option<DocumentClass>,
    pub total_checked: usize,
    pub notifications_sent: usize,
    pub companies_processed: usize,
    pub errors: Vec<String>,
}

impl ExpirySummary {
    pub fn for_class(class: DocumentClass) -> Self {
        Self {
            document_class: Some(class),
            ..Self::default()
        }
    }

    /// Fold another class's counters into an all-classes summary.
    ///
    /// `companies_processed` is left alone; distinct companies are only
    /// known to the caller that owns the subscriber cache.
    pub fn absorb(&mut self, other: ExpirySummary) {
        self.total_checked += other.total_checked;
        self.notifications_sent += other.notifications_sent;
        self.errors.extend(other.errors);
    }
}
