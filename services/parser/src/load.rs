//! CSV loading: byte decoding, row reading and batch mapping into a dataset.

use std::borrow::Cow;
use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::LoadError;
use crate::fields::OperationalPolicy;
use crate::header::{AliasTable, HeaderIndex};
use crate::record::{map_row, RawRow, Record};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Character encoding of an uploaded export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputEncoding {
    /// Strict UTF-8, falling back to Latin-1 when the bytes are not UTF-8.
    #[default]
    Auto,
    Utf8,
    /// ISO-8859-1, decoded as its windows-1252 superset.
    Latin1,
}

impl fmt::Display for InputEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InputEncoding::Auto => "auto",
            InputEncoding::Utf8 => "utf-8",
            InputEncoding::Latin1 => "latin1",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for InputEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "latin1" | "latin-1" | "iso-8859-1" | "windows-1252" | "cp1252" => Ok(Self::Latin1),
            other => Err(format!("unknown encoding '{}'", other)),
        }
    }
}

/// Decode raw file bytes. Returns the text and the encoding actually used.
pub fn decode(bytes: &[u8], encoding: InputEncoding) -> Result<(Cow<'_, str>, InputEncoding), LoadError> {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let utf8 = || encoding_rs::UTF_8.decode_without_bom_handling_and_without_replacement(body);
    let latin1 = || encoding_rs::WINDOWS_1252.decode_without_bom_handling(body).0;

    match encoding {
        InputEncoding::Utf8 => utf8()
            .map(|text| (text, InputEncoding::Utf8))
            .ok_or(LoadError::Encoding("UTF-8")),
        InputEncoding::Latin1 => Ok((latin1(), InputEncoding::Latin1)),
        InputEncoding::Auto => match utf8() {
            Some(text) => Ok((text, InputEncoding::Utf8)),
            None => {
                debug!("input is not UTF-8, decoding as Latin-1");
                Ok((latin1(), InputEncoding::Latin1))
            }
        },
    }
}

/// Tokenize CSV text: comma separated, double-quote quoting, first row is the
/// header. Rows whose fields are all blank are skipped. Any syntax error
/// aborts the whole read.
pub fn read_rows(text: &str) -> Result<(HeaderIndex, Vec<RawRow>), LoadError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .quote(b'"')
        .flexible(true)
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(LoadError::MissingHeaders);
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        rows.push(RawRow {
            line,
            values: record.iter().map(|field| field.to_string()).collect(),
        });
    }

    Ok((HeaderIndex::new(&headers), rows))
}

/// Options for turning a file into a [`Dataset`].
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub encoding: InputEncoding,
    pub policy: OperationalPolicy,
    pub aliases: AliasTable,
}

/// The immutable record collection produced by one successful load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub load_id: Uuid,
    pub file_name: String,
    pub loaded_at: DateTime<Utc>,
    pub encoding: InputEncoding,
    pub policy: OperationalPolicy,
    pub headers: Vec<String>,
    pub records: Vec<Record>,
    pub rejected_rows: usize,
}

/// Summary of a dataset without its records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub load_id: Uuid,
    pub file_name: String,
    pub loaded_at: DateTime<Utc>,
    pub encoding: InputEncoding,
    pub policy: OperationalPolicy,
    pub columns: usize,
    pub records: usize,
    pub rejected_rows: usize,
}

impl Dataset {
    pub fn info(&self) -> DatasetInfo {
        DatasetInfo {
            load_id: self.load_id,
            file_name: self.file_name.clone(),
            loaded_at: self.loaded_at,
            encoding: self.encoding,
            policy: self.policy,
            columns: self.headers.len(),
            records: self.records.len(),
            rejected_rows: self.rejected_rows,
        }
    }
}

/// Decode, read and map a whole export. Either every accepted row makes it
/// into the dataset or the load fails; there is no partial collection.
pub fn load_dataset(bytes: &[u8], file_name: &str, options: &LoadOptions) -> Result<Dataset, LoadError> {
    let (text, encoding) = decode(bytes, options.encoding)?;
    let (index, rows) = read_rows(&text)?;

    let total_rows = rows.len();
    let records: Vec<Record> = rows
        .iter()
        .filter_map(|row| map_row(&index, row, &options.aliases, options.policy))
        .collect();
    let rejected_rows = total_rows - records.len();

    if rejected_rows > 0 {
        warn!(file_name, rejected_rows, "rows without id, location or supervisor were skipped");
    }
    info!(
        file_name,
        %encoding,
        columns = index.len(),
        accepted = records.len(),
        rejected = rejected_rows,
        "loaded site-visit export"
    );

    Ok(Dataset {
        load_id: Uuid::new_v4(),
        file_name: file_name.to_string(),
        loaded_at: Utc::now(),
        encoding,
        policy: options.policy,
        headers: index.names().to_vec(),
        records,
        rejected_rows,
    })
}

/// Read an export from disk and load it.
pub async fn load_file(path: &Path, options: &LoadOptions) -> Result<Dataset, LoadError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    load_dataset(&bytes, &file_name, options)
}
