//! Site-visit report records and the row mapper.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::fields::{parse_count, parse_date, OperationalPolicy};
use crate::header::{AliasTable, HeaderIndex};

/// One CSV data row as read from the file, before any interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    /// 1-based line in the source file (the header is line 1).
    pub line: usize,
    pub values: Vec<String>,
}

/// A normalized site-visit report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub line: usize,
    pub report_date: Option<NaiveDateTime>,
    pub location: String,
    pub supervisor: String,
    pub time_of_check: String,
    pub started_at: String,
    pub finished_at: String,
    pub email: String,
    pub respondent_name: String,
    pub total_cameras: u32,
    pub cameras_with_fault: u32,
    pub operational_estimate: u32,
    pub operational_answer: String,
    pub poor_quality: Option<String>,
    pub fault_details: Option<String>,
    pub fault_type: Option<String>,
    pub general_faults: Option<String>,
    pub observations: Option<String>,
    pub attachments: Option<String>,
    pub recommendation: Option<String>,
    /// Original header/value pairs, column order. Never used in computation.
    pub raw: Vec<(String, String)>,
}

impl Record {
    /// Key `YYYY-MM-DD` of the report date, if one was parsed.
    pub fn date_key(&self) -> Option<String> {
        self.report_date.as_ref().map(crate::fields::date_key)
    }
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Map one raw row into a [`Record`].
///
/// Pure and deterministic. Returns `None` when id, location and supervisor
/// all resolve to empty. Numbers and dates that fail to parse degrade to `0`
/// and `None`; the fault count is clamped to the installed total.
pub fn map_row(
    index: &HeaderIndex,
    row: &RawRow,
    aliases: &AliasTable,
    policy: OperationalPolicy,
) -> Option<Record> {
    let get = |candidates: &[String]| index.resolve(&row.values, candidates);

    let id = get(&aliases.id);
    let location = get(&aliases.location);
    let supervisor = get(&aliases.supervisor);
    if id.is_empty() && location.is_empty() && supervisor.is_empty() {
        return None;
    }

    let total_cameras = parse_count(get(&aliases.total_cameras));
    let cameras_with_fault = parse_count(get(&aliases.cameras_with_fault)).min(total_cameras);
    let operational_answer = get(&aliases.operational_answer);
    let operational_estimate =
        policy.operational(total_cameras, cameras_with_fault, operational_answer);

    let raw = index
        .names()
        .iter()
        .enumerate()
        .map(|(idx, h)| (h.clone(), row.values.get(idx).cloned().unwrap_or_default()))
        .collect();

    Some(Record {
        id: id.to_string(),
        line: row.line,
        report_date: parse_date(get(&aliases.report_date)),
        location: location.to_string(),
        supervisor: supervisor.to_string(),
        time_of_check: get(&aliases.time_of_check).to_string(),
        started_at: get(&aliases.started_at).to_string(),
        finished_at: get(&aliases.finished_at).to_string(),
        email: get(&aliases.email).to_string(),
        respondent_name: get(&aliases.respondent_name).to_string(),
        total_cameras,
        cameras_with_fault,
        operational_estimate,
        operational_answer: operational_answer.to_string(),
        poor_quality: optional(get(&aliases.poor_quality)),
        fault_details: optional(get(&aliases.fault_details)),
        fault_type: optional(get(&aliases.fault_type)),
        general_faults: optional(get(&aliases.general_faults)),
        observations: optional(get(&aliases.observations)),
        attachments: optional(get(&aliases.attachments)),
        recommendation: optional(get(&aliases.recommendation)),
        raw,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn row(line: usize, values: &[&str]) -> RawRow {
        RawRow {
            line,
            values: values.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn map(names: &[&str], values: &[&str], policy: OperationalPolicy) -> Option<Record> {
        let index = HeaderIndex::new(names);
        map_row(&index, &row(2, values), &AliasTable::default(), policy)
    }

    const FORM_HEADERS: &[&str] = &[
        "ID",
        "Ubicación",
        "Nombre del encargado",
        "Fecha del reporte",
        "Momento de verificación de cámaras",
        "¿Cuántas cámaras en total están instaladas en la ubicación?",
        "¿Cuántas cámaras están operativas hoy?",
        "Indicar el número de cámaras que se encuentran con el fallo, de lo contrario ingresa \"0\"",
        "¿Alguna recomendación o sugerencia?",
    ];

    // -------------------------------------------------------------------------
    // MAPPING
    // -------------------------------------------------------------------------

    #[test]
    fn test_map_full_form_row() {
        let rec = map(
            FORM_HEADERS,
            &["12", "Bodega Norte", "Ana", "05/03/2024", "Mañana", "10", "Todas", "2", "Revisar DVR"],
            OperationalPolicy::RealData,
        )
        .unwrap();

        assert_eq!(rec.id, "12");
        assert_eq!(rec.location, "Bodega Norte");
        assert_eq!(rec.supervisor, "Ana");
        assert_eq!(rec.time_of_check, "Mañana");
        assert_eq!(rec.report_date.unwrap().month(), 3);
        assert_eq!(rec.total_cameras, 10);
        assert_eq!(rec.cameras_with_fault, 2);
        assert_eq!(rec.operational_estimate, 8);
        assert_eq!(rec.operational_answer, "Todas");
        assert_eq!(rec.recommendation.as_deref(), Some("Revisar DVR"));
        assert_eq!(rec.fault_type, None);
        assert_eq!(rec.line, 2);
        assert_eq!(rec.raw.len(), FORM_HEADERS.len());
        assert_eq!(rec.raw[1], ("Ubicación".to_string(), "Bodega Norte".to_string()));
    }

    #[test]
    fn test_map_accentless_export() {
        let rec = map(
            &["id", "ubicacion", "encargado", "cuantas camaras en total estan instaladas en la ubicacion?"],
            &["1", "Patio", "Luis", "6"],
            OperationalPolicy::RealData,
        )
        .unwrap();
        assert_eq!(rec.location, "Patio");
        assert_eq!(rec.total_cameras, 6);
        assert_eq!(rec.operational_estimate, 6);
    }

    #[test]
    fn test_map_clamps_faults_to_total() {
        let rec = map(
            &["id", "total cámaras", "cámaras con falla"],
            &["3", "8", "9"],
            OperationalPolicy::RealData,
        )
        .unwrap();
        assert_eq!(rec.cameras_with_fault, 8);
        assert_eq!(rec.operational_estimate, 0);
    }

    #[test]
    fn test_map_bad_fields_degrade() {
        let rec = map(
            &["id", "fecha", "total cámaras", "cámaras con falla"],
            &["4", "sin fecha", "muchas", "-2"],
            OperationalPolicy::RealData,
        )
        .unwrap();
        assert_eq!(rec.report_date, None);
        assert_eq!(rec.total_cameras, 0);
        assert_eq!(rec.cameras_with_fault, 0);
    }

    #[test]
    fn test_map_estimated_policy() {
        let rec = map(
            &["id", "total cámaras", "operativas hoy", "cámaras con falla"],
            &["5", "10", "Menos de la mitad", "0"],
            OperationalPolicy::Estimated,
        )
        .unwrap();
        assert_eq!(rec.operational_estimate, 3);
    }

    // -------------------------------------------------------------------------
    // REJECTION
    // -------------------------------------------------------------------------

    #[test]
    fn test_map_rejects_anonymous_row() {
        let rec = map(
            &["id", "ubicación", "encargado", "total cámaras"],
            &["", " ", "", "4"],
            OperationalPolicy::RealData,
        );
        assert!(rec.is_none());
    }

    #[test]
    fn test_map_keeps_row_with_only_supervisor() {
        let rec = map(&["id", "encargado"], &["", "Marta"], OperationalPolicy::RealData);
        assert_eq!(rec.unwrap().supervisor, "Marta");
    }

    // -------------------------------------------------------------------------
    // DETERMINISM
    // -------------------------------------------------------------------------

    #[test]
    fn test_map_determinism() {
        let values = ["12", "Bodega", "Ana", "2024-03-05", "Tarde", "10", "No", "20", ""];
        let baseline = map(FORM_HEADERS, &values, OperationalPolicy::Estimated);
        for _ in 0..10 {
            assert_eq!(map(FORM_HEADERS, &values, OperationalPolicy::Estimated), baseline);
        }
        let rec = baseline.unwrap();
        assert!(rec.cameras_with_fault <= rec.total_cameras);
        assert!(rec.operational_estimate <= rec.total_cameras);
    }
}
