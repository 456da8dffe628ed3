//! Exporter - turns a rendered report bitmap into the downloadable files.
//!
//! Subcommands:
//! - pdf   - paginated A4 PDF, cut at safe block boundaries
//! - image - single PNG or JPEG of the whole report

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use exporter::paginate::{safe_breaks, scale_factor, MIN_BREAK_GAP_CSS};
use exporter::{
    export_image, render_pdf, report_file_name, write_atomic, ExportConfig, ExportError,
    ImageFormat, PdfOptions, ReportFormat, WrittenFile,
};

#[derive(Parser, Debug)]
#[command(name = "exporter", about = "Exports a rendered camera report as PDF or image")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Paginated A4 PDF
    Pdf {
        /// Rendered report bitmap (PNG or JPEG)
        #[arg(long)]
        bitmap: PathBuf,

        /// JSON array of CSS-pixel bottoms of blocks that must not be split
        #[arg(long)]
        breaks: Option<PathBuf>,

        /// CSS width of the rendered container, for mapping breaks to pixels
        #[arg(long)]
        container_width: Option<f64>,

        /// Page margin in millimetres (overrides PDF_MARGIN_MM)
        #[arg(long)]
        margin_mm: Option<f64>,

        /// Location shown in the report; omitted means all locations
        #[arg(long)]
        location: Option<String>,

        /// Output directory (overrides EXPORT_DIR)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Single PNG or JPEG image
    Image {
        #[arg(long)]
        bitmap: PathBuf,

        #[arg(long, default_value = "png")]
        format: ImageFormat,

        /// JPEG quality 0-1 (overrides IMAGE_QUALITY)
        #[arg(long)]
        quality: Option<f64>,

        #[arg(long)]
        location: Option<String>,

        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn load_bitmap(path: &Path) -> Result<DynamicImage> {
    let bytes = fs::read(path)
        .await
        .with_context(|| format!("Failed to read bitmap {}", path.display()))?;
    let bitmap = image::load_from_memory(&bytes).map_err(|source| ExportError::ReadBitmap {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(bitmap)
}

async fn load_css_breaks(path: &Path) -> Result<Vec<f64>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read breaks file {}", path.display()))?;
    serde_json::from_str(&content).context("Breaks file must be a JSON array of numbers")
}

fn print_written(written: &WrittenFile) {
    println!("Saved to: {}", written.path.display());
    println!("Size: {} bytes", written.size_bytes);
    println!("Hash: {}", written.content_hash);
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_logging(&args.log_level);
    let config = ExportConfig::from_env()?;
    let today = Local::now().date_naive();

    println!("=== Camera Report Exporter ===");

    match args.command {
        Command::Pdf {
            bitmap,
            breaks,
            container_width,
            margin_mm,
            location,
            out_dir,
        } => {
            let image = load_bitmap(&bitmap).await?;
            let css_breaks = match &breaks {
                Some(path) => load_css_breaks(path).await?,
                None => Vec::new(),
            };
            let scale = scale_factor(image.width(), container_width);
            let pixel_breaks = safe_breaks(&css_breaks, MIN_BREAK_GAP_CSS, scale);
            info!(
                css_breaks = css_breaks.len(),
                kept = pixel_breaks.len(),
                scale,
                "mapped safe breaks"
            );

            let options = PdfOptions {
                margin_mm: margin_mm.unwrap_or(config.margin_mm),
                quality: config.quality,
                ..Default::default()
            };
            let rendered = render_pdf(&image, &pixel_breaks, &options).context("PDF export failed")?;
            println!(
                "Bitmap: {}x{} px, {:?}, margin {} mm",
                image.width(),
                image.height(),
                rendered.layout.orientation,
                rendered.layout.margin_mm
            );
            println!("Pages: {}", rendered.slices.len());

            let file_name = report_file_name(location.as_deref(), today, ReportFormat::Pdf);
            let dir = out_dir.unwrap_or(config.export_dir);
            let written = write_atomic(&dir, &file_name, &rendered.bytes).await?;
            print_written(&written);
        }
        Command::Image {
            bitmap,
            format,
            quality,
            location,
            out_dir,
        } => {
            let image = load_bitmap(&bitmap).await?;
            let bytes = export_image(&image, format, quality.unwrap_or(config.quality))
                .context("Image export failed")?;

            let file_name = report_file_name(location.as_deref(), today, format.into());
            let dir = out_dir.unwrap_or(config.export_dir);
            let written = write_atomic(&dir, &file_name, &bytes).await?;
            print_written(&written);
        }
    }

    Ok(())
}
