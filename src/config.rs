//! Run configuration.
//!
//! A [`PipelineConfig`] is assembled from an optional YAML file
//! ([`ConfigFile`]) overlaid with command-line overrides. Every location and
//! column name the pipeline depends on lives here; nothing is global.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::{cli::parse_delimiter, io_utils};

pub const DEFAULT_COUNTY_ID_COLUMN: &str = "county_id";
pub const DEFAULT_DESCRIPTION_COLUMN: &str = "description";

/// The single categorical feature and the two levels it encodes to 1 and 0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CategoricalEncoding {
    pub column: String,
    pub positive: String,
    pub negative: String,
}

impl CategoricalEncoding {
    pub fn encode(&self, value: &str) -> Option<f64> {
        let trimmed = value.trim();
        if trimmed == self.positive {
            Some(1.0)
        } else if trimmed == self.negative {
            Some(0.0)
        } else {
            None
        }
    }
}

/// Partially specified configuration as read from YAML or the command line.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub county_table: Option<PathBuf>,
    #[serde(default)]
    pub pattern_table: Option<PathBuf>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub county_id_column: Option<String>,
    #[serde(default)]
    pub description_column: Option<String>,
    #[serde(default)]
    pub categorical: Option<CategoricalEncoding>,
    #[serde(default)]
    pub delimiter: Option<String>,
    #[serde(default)]
    pub input_encoding: Option<String>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Reading configuration file {path:?}"))?;
        Self::from_yaml(&raw).with_context(|| format!("Loading configuration from {path:?}"))
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Fields set in `overrides` replace the ones in `self`.
    pub fn merge(self, overrides: ConfigFile) -> ConfigFile {
        ConfigFile {
            county_table: overrides.county_table.or(self.county_table),
            pattern_table: overrides.pattern_table.or(self.pattern_table),
            output_dir: overrides.output_dir.or(self.output_dir),
            county_id_column: overrides.county_id_column.or(self.county_id_column),
            description_column: overrides.description_column.or(self.description_column),
            categorical: overrides.categorical.or(self.categorical),
            delimiter: overrides.delimiter.or(self.delimiter),
            input_encoding: overrides.input_encoding.or(self.input_encoding),
        }
    }

    pub fn resolve(self) -> Result<PipelineConfig> {
        let county_table = self
            .county_table
            .ok_or_else(|| anyhow!("No county table configured (--counties or county_table)"))?;
        let pattern_table = self
            .pattern_table
            .ok_or_else(|| anyhow!("No pattern table configured (--patterns or pattern_table)"))?;
        let output_dir = self
            .output_dir
            .ok_or_else(|| anyhow!("No output directory configured (--output-dir or output_dir)"))?;
        let delimiter = self
            .delimiter
            .as_deref()
            .map(parse_delimiter)
            .transpose()
            .map_err(|err| anyhow!("Invalid delimiter: {err}"))?;
        io_utils::resolve_encoding(self.input_encoding.as_deref())?;
        Ok(PipelineConfig {
            county_table,
            pattern_table,
            output_dir,
            county_id_column: self
                .county_id_column
                .unwrap_or_else(|| DEFAULT_COUNTY_ID_COLUMN.to_string()),
            description_column: self
                .description_column
                .unwrap_or_else(|| DEFAULT_DESCRIPTION_COLUMN.to_string()),
            categorical: self.categorical,
            delimiter,
            input_encoding: self.input_encoding,
        })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PipelineConfig {
    pub county_table: PathBuf,
    pub pattern_table: PathBuf,
    pub output_dir: PathBuf,
    pub county_id_column: String,
    pub description_column: String,
    pub categorical: Option<CategoricalEncoding>,
    pub delimiter: Option<u8>,
    pub input_encoding: Option<String>,
}

impl PipelineConfig {
    pub fn new(
        county_table: impl Into<PathBuf>,
        pattern_table: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            county_table: county_table.into(),
            pattern_table: pattern_table.into(),
            output_dir: output_dir.into(),
            county_id_column: DEFAULT_COUNTY_ID_COLUMN.to_string(),
            description_column: DEFAULT_DESCRIPTION_COLUMN.to_string(),
            categorical: None,
            delimiter: None,
            input_encoding: None,
        }
    }

    pub fn with_county_id_column(mut self, column: impl Into<String>) -> Self {
        self.county_id_column = column.into();
        self
    }

    pub fn with_categorical(mut self, encoding: CategoricalEncoding) -> Self {
        self.categorical = Some(encoding);
        self
    }

    pub fn delimiter_for(&self, path: &Path) -> u8 {
        io_utils::resolve_input_delimiter(path, self.delimiter)
    }
}
