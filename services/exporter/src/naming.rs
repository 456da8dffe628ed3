use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::image_export::ImageFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    Png,
    Jpeg,
    Pdf,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Png => "png",
            ReportFormat::Jpeg => "jpg",
            ReportFormat::Pdf => "pdf",
        }
    }
}

impl From<ImageFormat> for ReportFormat {
    fn from(format: ImageFormat) -> Self {
        match format {
            ImageFormat::Png => ReportFormat::Png,
            ImageFormat::Jpeg => ReportFormat::Jpeg,
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            other => other.parse::<ImageFormat>().map(Self::from),
        }
    }
}

/// `Reporte_Camaras_<location or Todas>_<YYYY-MM-DD>.<ext>`
pub fn report_file_name(location: Option<&str>, date: NaiveDate, format: ReportFormat) -> String {
    let location = location
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| l.replace(['/', '\\'], "-"))
        .unwrap_or_else(|| "Todas".to_string());
    format!(
        "Reporte_Camaras_{}_{}.{}",
        location,
        date.format("%Y-%m-%d"),
        format.extension()
    )
}
