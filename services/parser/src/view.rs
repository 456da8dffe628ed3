use serde::{Deserialize, Serialize};

use crate::charts::{build_charts, ChartSpec};
use crate::filters::{apply_filters, FilterState};
use crate::metrics::{build_summary, compute_metrics, Metrics, Summary};
use crate::record::Record;

/// Everything the dashboard shows for one filter state, computed in a single
/// synchronous pass over the records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    pub filters: FilterState,
    /// Number of records in the filtered subset.
    pub records: usize,
    pub metrics: Metrics,
    pub summary: Summary,
    pub charts: Vec<ChartSpec>,
}

impl DashboardView {
    pub fn build(records: &[Record], filters: &FilterState) -> Self {
        let subset = apply_filters(records, filters);
        let metrics = compute_metrics(subset.iter().copied());
        Self {
            filters: filters.clone(),
            records: subset.len(),
            metrics,
            summary: build_summary(&subset, filters),
            charts: build_charts(&subset, &metrics),
        }
    }
}
