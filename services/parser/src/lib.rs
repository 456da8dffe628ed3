//! Site-visit report pipeline: CSV export → normalized records → filtered
//! subset → metrics, highlights and chart series.
//!
//! Every stage after loading is a pure function of `(records, FilterState)`.
//! The same input file and filter always yield the same output.

pub mod charts;
pub mod config;
pub mod error;
pub mod fields;
pub mod filters;
pub mod header;
pub mod load;
pub mod metrics;
pub mod record;
pub mod view;

pub use charts::{build_charts, short_label, ChartKind, ChartSpec};
pub use config::PipelineConfig;
pub use error::LoadError;
pub use fields::{OperationalAnswer, OperationalPolicy};
pub use filters::{apply_filters, build_lookups, FilterState, Lookups};
pub use header::{normalize_header, AliasTable, HeaderIndex};
pub use load::{load_dataset, load_file, Dataset, DatasetInfo, InputEncoding, LoadOptions};
pub use metrics::{build_highlights, build_summary, compute_metrics, Metrics, Summary};
pub use record::{map_row, RawRow, Record};
pub use view::DashboardView;
