//! Header normalization and alias resolution.
//!
//! The form export that feeds the dashboard changes its column headers between
//! versions (accents dropped, underscores instead of spaces, a trailing `?1`
//! enumerant after duplicated questions). Every logical field is therefore
//! resolved through an ordered list of candidate spellings instead of a single
//! fixed key.

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Strip diacritics: decompose to NFD and drop the combining marks, so
/// precomposed and decomposed spellings fold to the same text.
pub fn fold_diacritics(input: &str) -> String {
    input.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Canonical lookup key for a raw header.
///
/// Deterministic: BOM stripped, NBSP and underscores become spaces, opening
/// `¿`/`¡` dropped, whitespace collapsed and trimmed, lowercased, diacritics
/// folded, and a trailing `?<digits>` enumerant or closing `?` removed.
pub fn normalize_header(raw: &str) -> String {
    let without_bom = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let spaced = without_bom
        .replace(['\u{00a0}', '_'], " ")
        .replace(['¿', '¡'], "");
    let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let key = fold_diacritics(&collapsed.to_lowercase());
    strip_enumerant(key)
}

fn strip_enumerant(key: String) -> String {
    let digits_start = key.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    let body = if key[..digits_start].ends_with('?') {
        &key[..digits_start]
    } else {
        key.as_str()
    };
    body.trim_end_matches(['?', ' ']).to_string()
}

/// Ordered candidate spellings for every logical field of a report row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasTable {
    pub id: Vec<String>,
    pub started_at: Vec<String>,
    pub finished_at: Vec<String>,
    pub email: Vec<String>,
    pub respondent_name: Vec<String>,
    pub location: Vec<String>,
    pub supervisor: Vec<String>,
    pub report_date: Vec<String>,
    pub time_of_check: Vec<String>,
    pub total_cameras: Vec<String>,
    pub operational_answer: Vec<String>,
    pub poor_quality: Vec<String>,
    pub cameras_with_fault: Vec<String>,
    pub fault_details: Vec<String>,
    pub fault_type: Vec<String>,
    pub general_faults: Vec<String>,
    pub observations: Vec<String>,
    pub attachments: Vec<String>,
    pub recommendation: Vec<String>,
}

fn aliases(candidates: &[&str]) -> Vec<String> {
    candidates.iter().map(|c| c.to_string()).collect()
}

impl Default for AliasTable {
    /// Column spellings observed across the site-visit form exports.
    fn default() -> Self {
        Self {
            id: aliases(&["id"]),
            started_at: aliases(&["hora de inicio", "hora inicio"]),
            finished_at: aliases(&["hora de finalización", "hora fin"]),
            email: aliases(&["correo electrónico", "email"]),
            respondent_name: aliases(&["nombre"]),
            location: aliases(&["ubicación"]),
            supervisor: aliases(&["nombre del encargado", "encargado"]),
            report_date: aliases(&["fecha del reporte", "fecha reporte", "fecha"]),
            time_of_check: aliases(&["momento de verificación de cámaras", "momento"]),
            total_cameras: aliases(&[
                "¿cuántas cámaras en total están instaladas en la ubicación?",
                "cámaras totales",
                "total cámaras",
            ]),
            operational_answer: aliases(&["¿cuántas cámaras están operativas hoy?", "operativas hoy"]),
            poor_quality: aliases(&[
                "¿se detectaron cámaras con mala calidad de imagen, obstruidas o con interferencias?",
            ]),
            cameras_with_fault: aliases(&[
                "indicar el número de cámaras que se encuentran con el fallo, de lo contrario ingresa \"0\"",
                "cámaras con falla",
            ]),
            fault_details: aliases(&[
                "detalla qué cámaras son las que presentan fallas, ubicación, nombre, modelo.",
            ]),
            fault_type: aliases(&[
                "indicar fallo y el tipo de fallo en las cámaras, de lo contrario ingresa \"sin observaciones\"",
            ]),
            general_faults: aliases(&["¿se detectaron fallas técnicas generales en el sistema?"]),
            observations: aliases(&[
                "observaciones que pudiste encontrar acerca del monitoreo",
                "observaciones",
            ]),
            attachments: aliases(&[
                "adjuntar imágenes o documentos del fallo y/o observaciones",
                "adjuntos",
            ]),
            recommendation: aliases(&["¿alguna recomendación o sugerencia?"]),
        }
    }
}

/// Normalized view over the columns of one CSV header row.
#[derive(Debug, Clone)]
pub struct HeaderIndex {
    names: Vec<String>,
    keys: Vec<String>,
}

impl HeaderIndex {
    pub fn new<S: AsRef<str>>(headers: &[S]) -> Self {
        Self {
            names: headers.iter().map(|h| h.as_ref().to_string()).collect(),
            keys: headers.iter().map(|h| normalize_header(h.as_ref())).collect(),
        }
    }

    /// Headers exactly as they appeared in the file.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// First non-empty value, trying `candidates` in order. Missing columns and
    /// blank cells fall through to the next candidate; no match yields `""`.
    pub fn resolve<'a, S: AsRef<str>>(&self, values: &'a [S], candidates: &[String]) -> &'a str {
        for candidate in candidates {
            let wanted = normalize_header(candidate);
            for (idx, key) in self.keys.iter().enumerate() {
                if *key != wanted {
                    continue;
                }
                if let Some(value) = values.get(idx) {
                    let trimmed = value.as_ref().trim();
                    if !trimmed.is_empty() {
                        return trimmed;
                    }
                }
            }
        }
        ""
    }
}
