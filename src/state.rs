//! State carried across refresh cycles

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::models::Dataset;

/// What a refresh cycle has to show
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// The cycle produced vessels
    Fresh(Arc<Dataset>),
    /// The cycle produced nothing
    Empty {
        last_success_at: Option<DateTime<Utc>>,
    },
    /// The cycle produced nothing; showing the last good dataset instead
    Stale {
        dataset: Arc<Dataset>,
        since: DateTime<Utc>,
    },
}

impl RefreshOutcome {
    pub fn dataset(&self) -> Option<&Arc<Dataset>> {
        match self {
            RefreshOutcome::Fresh(dataset) | RefreshOutcome::Stale { dataset, .. } => Some(dataset),
            RefreshOutcome::Empty { .. } => None,
        }
    }
}

/// Last successful refresh, owned by the caller and updated on every cycle.
///
/// By default an empty cycle is reported as empty. With `keep_last_good`
/// the previous dataset is shown instead.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    last_success: Option<(Arc<Dataset>, DateTime<Utc>)>,
    keep_last_good: bool,
}

impl PipelineState {
    pub fn new(keep_last_good: bool) -> Self {
        Self {
            last_success: None,
            keep_last_good,
        }
    }

    pub fn last_success_at(&self) -> Option<DateTime<Utc>> {
        self.last_success.as_ref().map(|(_, at)| *at)
    }

    /// Record the dataset produced by a cycle finished at `now`
    pub fn apply(&mut self, dataset: Arc<Dataset>, now: DateTime<Utc>) -> RefreshOutcome {
        if !dataset.is_empty() {
            self.last_success = Some((Arc::clone(&dataset), now));
            return RefreshOutcome::Fresh(dataset);
        }

        match &self.last_success {
            Some((previous, since)) if self.keep_last_good => RefreshOutcome::Stale {
                dataset: Arc::clone(previous),
                since: *since,
            },
            _ => RefreshOutcome::Empty {
                last_success_at: self.last_success_at(),
            },
        }
    }

    pub fn last_run_label(&self) -> String {
        match self.last_success_at() {
            Some(at) => format!(
                "Última ejecución exitosa: {}",
                at.format("%Y-%m-%d %H:%M:%S")
            ),
            None => "No hay registro de ejecución previa.".to_string(),
        }
    }
}
