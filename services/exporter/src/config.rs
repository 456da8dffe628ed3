use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::image_export::DEFAULT_QUALITY;
use crate::paginate::{clamp_margin, MAX_MARGIN_MM};

#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    pub export_dir: PathBuf,
    pub margin_mm: f64,
    pub quality: f64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            export_dir: PathBuf::from("."),
            margin_mm: MAX_MARGIN_MM,
            quality: DEFAULT_QUALITY,
        }
    }
}

impl ExportConfig {
    /// `EXPORT_DIR`, `PDF_MARGIN_MM` (clamped to 5–20) and `IMAGE_QUALITY`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let number = |key: &str, default: f64| -> Result<f64> {
            match lookup(key) {
                Some(v) if !v.trim().is_empty() => v
                    .trim()
                    .parse::<f64>()
                    .with_context(|| format!("invalid {}", key)),
                _ => Ok(default),
            }
        };

        Ok(Self {
            export_dir: lookup("EXPORT_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.export_dir),
            margin_mm: clamp_margin(number("PDF_MARGIN_MM", defaults.margin_mm)?),
            quality: number("IMAGE_QUALITY", defaults.quality)?.clamp(0.0, 1.0),
        })
    }
}
