//! In-memory tabular dataset shared by every pipeline stage.
//!
//! A [`Dataset`] is a header row plus fully materialized string rows. Stages
//! read typed values out of it on demand and persist their results back as
//! datasets, so every artifact round-trips through the same CSV code path.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use encoding_rs::Encoding;
use log::debug;

use crate::{error::SchemaError, io_utils};

/// Cell contents treated as "no value" on input.
pub const MISSING_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None", "#N/A"];

pub fn is_missing(value: &str) -> bool {
    MISSING_TOKENS.contains(&value.trim())
}

/// Parses a numeric cell. Missing tokens, NaN and infinities (including
/// overflowing literals like `1e999`) map to `None`.
pub fn parse_number(value: &str) -> Option<f64> {
    if is_missing(value) {
        return None;
    }
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
}

pub fn format_number(value: f64) -> String {
    value.to_string()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Dataset {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn load(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Self> {
        let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
        let headers = io_utils::reader_headers(&mut reader, encoding)
            .with_context(|| format!("Reading headers from {path:?}"))?;
        let mut rows = Vec::new();
        for (row_idx, record) in reader.byte_records().enumerate() {
            let record =
                record.with_context(|| format!("Reading row {} in {:?}", row_idx + 2, path))?;
            rows.push(io_utils::decode_record(&record, encoding)?);
        }
        debug!(
            "Loaded {} row(s) x {} column(s) from {:?}",
            rows.len(),
            headers.len(),
            path
        );
        Ok(Self { headers, rows })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = io_utils::open_csv_writer(path)?;
        writer
            .write_record(self.headers.iter())
            .with_context(|| format!("Writing headers to {path:?}"))?;
        for (idx, row) in self.rows.iter().enumerate() {
            writer
                .write_record(row.iter())
                .with_context(|| format!("Writing row {} to {:?}", idx + 2, path))?;
        }
        writer
            .flush()
            .with_context(|| format!("Flushing output writer for {path:?}"))?;
        Ok(())
    }

    pub fn push_row(&mut self, row: Vec<String>) -> Result<()> {
        if row.len() != self.headers.len() {
            return Err(anyhow!(
                "Row has {} field(s) but the table has {} column(s)",
                row.len(),
                self.headers.len()
            ));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn require_column(&self, table: &str, name: &str) -> Result<usize, SchemaError> {
        self.column_index(name)
            .ok_or_else(|| SchemaError::MissingColumn {
                table: table.to_string(),
                column: name.to_string(),
            })
    }

    /// First header that appears more than once, if any.
    pub fn duplicate_header(&self) -> Option<&str> {
        let mut seen = std::collections::HashSet::new();
        self.headers
            .iter()
            .find(|header| !seen.insert(header.as_str()))
            .map(String::as_str)
    }

    pub fn ensure_unique_headers(&self, table: &str) -> Result<(), SchemaError> {
        match self.duplicate_header() {
            Some(column) => Err(SchemaError::DuplicateColumn {
                table: table.to_string(),
                column: column.to_string(),
            }),
            None => Ok(()),
        }
    }
}
