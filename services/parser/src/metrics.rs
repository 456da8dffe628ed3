//! Summary metrics and highlight lines for a filtered subset.

use serde::{Deserialize, Serialize};

use crate::filters::FilterState;
use crate::header::fold_diacritics;
use crate::record::Record;

/// Keywords that flag a report as noteworthy even without a fault count.
/// Compared after lowercasing and diacritic folding.
const ALERT_KEYWORDS: &[&str] = &["emergencia", "danos", "sospechosa"];

pub const MAX_HIGHLIGHTS: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    pub report_count: u64,
    pub total_cameras: u64,
    pub operational_count: u64,
    pub faulty_camera_count: u64,
}

/// Plain sums of the per-record values. Each record's operational estimate
/// was already rounded when it was mapped, so order does not matter.
pub fn compute_metrics<'a, I>(subset: I) -> Metrics
where
    I: IntoIterator<Item = &'a Record>,
{
    subset.into_iter().fold(Metrics::default(), |mut m, r| {
        m.report_count += 1;
        m.total_cameras += u64::from(r.total_cameras);
        m.operational_count += u64::from(r.operational_estimate);
        m.faulty_camera_count += u64::from(r.cameras_with_fault);
        m
    })
}

fn has_alert_keyword(record: &Record) -> bool {
    let text = format!(
        "{} {}",
        record.general_faults.as_deref().unwrap_or(""),
        record.fault_type.as_deref().unwrap_or("")
    );
    let folded = fold_diacritics(&text.to_lowercase());
    ALERT_KEYWORDS.iter().any(|k| folded.contains(k))
}

fn highlight_line(record: &Record) -> String {
    format!(
        "#{} - {}: {} cam(s) con falla. {}",
        record.id,
        record.location,
        record.cameras_with_fault,
        record.recommendation.as_deref().unwrap_or("")
    )
    .trim()
    .to_string()
}

/// Up to five one-line notes for reports with faulty cameras or alarming
/// fault descriptions, in subset order.
pub fn build_highlights(subset: &[&Record]) -> Vec<String> {
    subset
        .iter()
        .filter(|r| r.cameras_with_fault > 0 || has_alert_keyword(r))
        .take(MAX_HIGHLIGHTS)
        .map(|r| highlight_line(r))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub period: String,
    pub highlights: Vec<String>,
}

pub fn build_summary(subset: &[&Record], filters: &FilterState) -> Summary {
    Summary {
        period: filters.period_label(),
        highlights: build_highlights(subset),
    }
}
