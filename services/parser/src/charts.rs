//! Chart series for the dashboard. Rendering is left to the charting client;
//! this module only decides labels, values and a few display options.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::metrics::Metrics;
use crate::record::Record;

pub const EMPTY_MESSAGE: &str = "Sin datos para los filtros actuales";
pub const LABEL_MAX_CHARS: usize = 28;
const TOP_FAULT_TYPES: usize = 8;
const TOP_LOCATIONS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Doughnut,
    Bar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegendPosition {
    Top,
    Bottom,
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartOptions {
    pub legend: LegendPosition,
    /// Inner radius of a doughnut as a fraction of the outer radius.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cutout: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_radius: Option<u32>,
}

impl ChartOptions {
    fn doughnut() -> Self {
        Self {
            legend: LegendPosition::Bottom,
            cutout: Some(0.62),
            border_radius: None,
        }
    }

    fn bar() -> Self {
        Self {
            legend: LegendPosition::Hidden,
            cutout: None,
            border_radius: Some(6),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub id: String,
    pub kind: ChartKind,
    pub title: String,
    pub labels: Vec<String>,
    pub series_label: String,
    pub values: Vec<u64>,
    pub options: ChartOptions,
    /// Set when there is nothing to draw.
    pub empty_message: Option<String>,
}

impl ChartSpec {
    fn new(
        id: &str,
        kind: ChartKind,
        title: &str,
        series_label: &str,
        pairs: Vec<(String, u64)>,
    ) -> Self {
        let (labels, values): (Vec<String>, Vec<u64>) = pairs
            .into_iter()
            .map(|(label, value)| (short_label(&label, LABEL_MAX_CHARS), value))
            .unzip();
        let empty = labels.is_empty() || values.iter().all(|v| *v == 0);
        let options = match kind {
            ChartKind::Doughnut => ChartOptions::doughnut(),
            ChartKind::Bar => ChartOptions::bar(),
        };
        Self {
            id: id.to_string(),
            kind,
            title: title.to_string(),
            labels,
            series_label: series_label.to_string(),
            values,
            options,
            empty_message: empty.then(|| EMPTY_MESSAGE.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.empty_message.is_some()
    }
}

/// Shorten a label to at most `max` characters, ellipsis included. Prefers
/// cutting at the last space when that keeps more than eight characters.
pub fn short_label(label: &str, max: usize) -> String {
    let s = label.trim();
    if s.chars().count() <= max {
        return s.to_string();
    }
    let head: String = s.chars().take(max).collect();
    let cut = head.rfind(' ').map(|byte| head[..byte].chars().count());
    let kept: String = match cut {
        Some(chars) if chars > 8 => s.chars().take(chars).collect(),
        _ => s.chars().take(max.saturating_sub(1)).collect(),
    };
    format!("{}…", kept)
}

/// Accumulates counts per key, remembering first-seen order for ties.
#[derive(Default)]
struct Tally {
    order: Vec<(String, u64)>,
    slots: HashMap<String, usize>,
}

impl Tally {
    fn add(&mut self, key: &str, amount: u64) {
        match self.slots.get(key) {
            Some(&slot) => self.order[slot].1 += amount,
            None => {
                self.slots.insert(key.to_string(), self.order.len());
                self.order.push((key.to_string(), amount));
            }
        }
    }

    fn top(mut self, n: usize) -> Vec<(String, u64)> {
        // Stable sort keeps first-seen order among equal counts.
        self.order.sort_by(|a, b| b.1.cmp(&a.1));
        self.order.truncate(n);
        self.order
    }
}

fn fault_tokens(record: &Record) -> impl Iterator<Item = &str> {
    record
        .fault_type
        .as_deref()
        .into_iter()
        .chain(record.general_faults.as_deref())
        .flat_map(|text| text.split([';', ',', '\t']))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub fn build_charts(subset: &[&Record], metrics: &Metrics) -> Vec<ChartSpec> {
    let total = metrics.total_cameras;
    let operational = metrics.operational_count.min(total);
    let operativas = ChartSpec::new(
        "operativas",
        ChartKind::Doughnut,
        "Operativas vs Totales",
        "Cámaras",
        vec![
            ("Operativas (aprox.)".to_string(), operational),
            ("No operativas (aprox.)".to_string(), total - operational),
        ],
    );

    let mut fault_types = Tally::default();
    let mut per_location = Tally::default();
    let mut faulty_per_location = Tally::default();
    for record in subset {
        for token in fault_tokens(record) {
            fault_types.add(token, 1);
        }
        per_location.add(&record.location, 1);
        faulty_per_location.add(&record.location, u64::from(record.cameras_with_fault));
    }

    vec![
        operativas,
        ChartSpec::new(
            "fallas_tipo",
            ChartKind::Bar,
            "Fallas por Tipo",
            "Conteo",
            fault_types.top(TOP_FAULT_TYPES),
        ),
        ChartSpec::new(
            "reportes_ubicacion",
            ChartKind::Bar,
            "Reportes por Ubicación",
            "Reportes",
            per_location.top(TOP_LOCATIONS),
        ),
        ChartSpec::new(
            "falla_ubicacion",
            ChartKind::Bar,
            "Cámaras con Falla por Ubicación",
            "Cáms con falla",
            faulty_per_location.top(TOP_LOCATIONS),
        ),
    ]
}
