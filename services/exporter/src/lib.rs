//! Report export: paginated A4 PDF and standalone PNG/JPEG files from a
//! rendered report bitmap.

pub mod config;
pub mod error;
pub mod image_export;
pub mod naming;
pub mod output;
pub mod paginate;
pub mod pdf;

pub use config::ExportConfig;
pub use error::ExportError;
pub use image_export::{export_image, ImageFormat};
pub use naming::{report_file_name, ReportFormat};
pub use output::{write_atomic, WrittenFile};
pub use paginate::{paginate, safe_breaks, PageLayout, Slice, SlicePolicy};
pub use pdf::{render_pdf, PdfOptions, RenderedPdf};
