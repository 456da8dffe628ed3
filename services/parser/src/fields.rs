//! Field parsers. None of these fail: bad input degrades to a default.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::header::fold_diacritics;

lazy_static! {
    static ref DAY_FIRST_DATE: Regex =
        Regex::new(r"^(\d{1,2})[/-](\d{1,2})[/-](\d{4}|\d{2})(?:\D|$)").expect("valid date regex");
}

/// Locale-tolerant number parsing.
///
/// When both `,` and `.` are present the rightmost one is the decimal
/// separator; a lone `,` is a decimal comma. Unparseable input is `0.0`.
pub fn parse_number(text: &str) -> f64 {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();
    if cleaned.is_empty() {
        return 0.0;
    }

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) => cleaned.replace(',', "."),
        _ => cleaned,
    };

    match normalized.parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => 0.0,
    }
}

/// Non-negative whole count; negatives and garbage become 0.
pub fn parse_count(text: &str) -> u32 {
    let n = parse_number(text).round();
    if n <= 0.0 {
        0
    } else if n >= u32::MAX as f64 {
        u32::MAX
    } else {
        n as u32
    }
}

const ISO_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const ISO_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Report date parsing: ISO forms first, then `D/M/YYYY` (or `D-M-YY`, two
/// digit years meaning `20YY`). Anything else is `None`.
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if starts_with_year(text) {
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(dt.naive_local());
        }
        for fmt in ISO_DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
                return Some(dt);
            }
        }
        for fmt in ISO_DATE_FORMATS {
            if let Ok(d) = NaiveDate::parse_from_str(text, fmt) {
                return d.and_hms_opt(0, 0, 0);
            }
        }
    }

    let caps = DAY_FIRST_DATE.captures(text)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year_raw = &caps[3];
    let mut year: i32 = year_raw.parse().ok()?;
    if year_raw.len() == 2 {
        year += 2000;
    }
    NaiveDate::from_ymd_opt(year, month, day).and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// ISO forms only apply to a leading four-digit year, so `5-3-24` is never
/// read as the year 5.
fn starts_with_year(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() > 4 && bytes[..4].iter().all(u8::is_ascii_digit) && matches!(bytes[4], b'-' | b'/')
}

/// Calendar key used by the date lookups and filters.
pub fn date_key(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%d").to_string()
}

/// Interpretation of the free-text "how many cameras are operational today"
/// answer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum OperationalAnswer {
    Ratio(f64),
    Count(u32),
}

/// Fallback ratio for answers that match no known category.
pub const NEUTRAL_RATIO: f64 = 0.5;

pub fn parse_operational_answer(text: &str) -> OperationalAnswer {
    let v = fold_diacritics(&text.trim().to_lowercase());
    let v = v.trim_end_matches('.').trim();

    if let Some(pct) = v.strip_suffix('%') {
        let pct = pct.trim();
        if looks_numeric(pct) {
            return OperationalAnswer::Ratio(parse_number(pct) / 100.0);
        }
    }
    if looks_numeric(v) {
        let n = parse_number(v);
        return if n >= 1.0 {
            OperationalAnswer::Count(parse_count(v))
        } else {
            OperationalAnswer::Ratio(n.max(0.0))
        };
    }

    let ratio = match v {
        "todas" | "toda" => 1.0,
        "no" | "ninguna" => 0.0,
        _ if v.contains("casi todas") => 0.9,
        _ if v.contains("casi ninguna") => 0.1,
        _ if v.contains("mas de la mitad") => 0.7,
        _ if v.contains("menos de la mitad") => 0.3,
        _ => NEUTRAL_RATIO,
    };
    OperationalAnswer::Ratio(ratio)
}

fn looks_numeric(s: &str) -> bool {
    !s.is_empty()
        && s.chars().any(|c| c.is_ascii_digit())
        && s.chars().all(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-' | ' '))
}

impl OperationalAnswer {
    /// Operational cameras out of `total`, rounded and clamped to `[0, total]`.
    pub fn estimate(&self, total: u32) -> u32 {
        let n = match *self {
            OperationalAnswer::Ratio(r) => (total as f64 * r).round(),
            OperationalAnswer::Count(c) => c as f64,
        };
        n.clamp(0.0, total as f64) as u32
    }

    /// Ratio of `total`, when the answer was categorical or a percentage.
    pub fn ratio(&self) -> Option<f64> {
        match *self {
            OperationalAnswer::Ratio(r) => Some(r),
            OperationalAnswer::Count(_) => None,
        }
    }
}

/// How a record's operational camera count is derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationalPolicy {
    /// `total - faulty`; the free-text answer is ignored.
    #[default]
    RealData,
    /// Estimated from the free-text answer.
    Estimated,
}

impl OperationalPolicy {
    pub fn operational(&self, total: u32, faulty: u32, answer: &str) -> u32 {
        match self {
            OperationalPolicy::RealData => total.saturating_sub(faulty),
            OperationalPolicy::Estimated => parse_operational_answer(answer).estimate(total),
        }
    }
}

impl std::str::FromStr for OperationalPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "real" | "real-data" | "real_data" => Ok(Self::RealData),
            "estimated" | "estimate" => Ok(Self::Estimated),
            other => Err(format!("unknown operational policy '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    // -------------------------------------------------------------------------
    // NUMBER PARSER
    // -------------------------------------------------------------------------

    #[test]
    fn test_number_decimal_comma_with_thousands_dot() {
        assert_eq!(parse_number("1.234,56"), 1234.56);
    }

    #[test]
    fn test_number_decimal_dot_with_thousands_comma() {
        assert_eq!(parse_number("1,234.56"), 1234.56);
    }

    #[test]
    fn test_number_lone_comma_is_decimal() {
        assert_eq!(parse_number("12,5"), 12.5);
    }

    #[test]
    fn test_number_garbage_is_zero() {
        assert_eq!(parse_number("abc"), 0.0);
        assert_eq!(parse_number(""), 0.0);
        assert_eq!(parse_number("--"), 0.0);
        assert_eq!(parse_number("1.2.3"), 0.0);
    }

    #[test]
    fn test_number_strips_units() {
        assert_eq!(parse_number(" 12 cámaras"), 12.0);
        assert_eq!(parse_number("-3"), -3.0);
    }

    #[test]
    fn test_count_clamps_negative() {
        assert_eq!(parse_count("-4"), 0);
        assert_eq!(parse_count("7,6"), 8);
    }

    // -------------------------------------------------------------------------
    // DATE PARSER
    // -------------------------------------------------------------------------

    #[test]
    fn test_date_iso_and_day_first_agree() {
        let iso = parse_date("2024-03-05").unwrap();
        let dmy = parse_date("05/03/2024").unwrap();
        assert_eq!(iso, dmy);
        assert_eq!(iso.month(), 3);
        assert_eq!(iso.day(), 5);
    }

    #[test]
    fn test_date_two_digit_year() {
        let d = parse_date("5-3-24").unwrap();
        assert_eq!((d.year(), d.month(), d.day()), (2024, 3, 5));
    }

    #[test]
    fn test_date_day_first_with_time_suffix() {
        let d = parse_date("17/10/2025 09:14:00").unwrap();
        assert_eq!((d.year(), d.month(), d.day()), (2025, 10, 17));
    }

    #[test]
    fn test_date_iso_datetime_keeps_time() {
        let d = parse_date("2024-03-05T14:30:00").unwrap();
        assert_eq!(d.hour(), 14);
        assert_eq!(date_key(&d), "2024-03-05");
    }

    #[test]
    fn test_date_malformed_is_absent() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("ayer"), None);
        assert_eq!(parse_date("31/02/2024"), None);
        assert_eq!(parse_date("123/4/2024"), None);
    }

    // -------------------------------------------------------------------------
    // OPERATIONAL ANSWER
    // -------------------------------------------------------------------------

    #[test]
    fn test_ratio_categories() {
        assert_eq!(parse_operational_answer("Todas").ratio(), Some(1.0));
        assert_eq!(parse_operational_answer("No").ratio(), Some(0.0));
        assert_eq!(parse_operational_answer("Casi todas").ratio(), Some(0.9));
        assert_eq!(parse_operational_answer("Más de la mitad").ratio(), Some(0.7));
        assert_eq!(parse_operational_answer("Menos de la Mitad").ratio(), Some(0.3));
        assert_eq!(parse_operational_answer("Casi ninguna").ratio(), Some(0.1));
        assert_eq!(parse_operational_answer("Ninguna").ratio(), Some(0.0));
    }

    #[test]
    fn test_ratio_category_decomposed_accent() {
        assert_eq!(parse_operational_answer("Ma\u{301}s de la mitad").ratio(), Some(0.7));
    }

    #[test]
    fn test_ratio_percentage() {
        assert_eq!(parse_operational_answer("75%").ratio(), Some(0.75));
        assert_eq!(parse_operational_answer("50 %").ratio(), Some(0.5));
    }

    #[test]
    fn test_ratio_unrecognized_is_neutral() {
        assert_eq!(parse_operational_answer("no sé").ratio(), Some(NEUTRAL_RATIO));
        assert_eq!(parse_operational_answer("").ratio(), Some(NEUTRAL_RATIO));
    }

    #[test]
    fn test_bare_number_is_count() {
        assert_eq!(parse_operational_answer("7"), OperationalAnswer::Count(7));
        assert_eq!(parse_operational_answer("0.25"), OperationalAnswer::Ratio(0.25));
    }

    #[test]
    fn test_estimate_rounds_and_clamps() {
        assert_eq!(OperationalAnswer::Ratio(0.7).estimate(5), 4);
        assert_eq!(OperationalAnswer::Ratio(0.3).estimate(5), 2);
        assert_eq!(OperationalAnswer::Count(12).estimate(10), 10);
        assert_eq!(OperationalAnswer::Ratio(1.0).estimate(0), 0);
    }

    // -------------------------------------------------------------------------
    // POLICY
    // -------------------------------------------------------------------------

    #[test]
    fn test_real_data_policy_ignores_answer() {
        let policy = OperationalPolicy::RealData;
        assert_eq!(policy.operational(10, 2, "No"), 8);
        assert_eq!(policy.operational(3, 5, "Todas"), 0);
    }

    #[test]
    fn test_estimated_policy_uses_answer() {
        let policy = OperationalPolicy::Estimated;
        assert_eq!(policy.operational(10, 2, "Todas"), 10);
        assert_eq!(policy.operational(10, 0, "Menos de la mitad"), 3);
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("real".parse::<OperationalPolicy>(), Ok(OperationalPolicy::RealData));
        assert_eq!("Estimated".parse::<OperationalPolicy>(), Ok(OperationalPolicy::Estimated));
        assert!("guess".parse::<OperationalPolicy>().is_err());
    }
}
