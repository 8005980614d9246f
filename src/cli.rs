use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{CategoricalEncoding, ConfigFile};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Match counties against analyst patterns and build a masked clustering matrix",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run every stage and write all tables plus a run report
    Run(RunArgs),
    /// Write the feature dictionary for a county table
    Catalog(PipelineArgs),
    /// Parse pattern descriptions and write the constraint table
    Constraints(PipelineArgs),
    /// Check a final masked table for missing or out-of-range values
    Validate(ValidateArgs),
    /// Print matched-row counts per pattern for a table with a Pattern_id column
    Summary(SummaryArgs),
}

#[derive(Debug, Args)]
pub struct PipelineArgs {
    /// YAML configuration file; command-line flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// County table keyed by the county identifier column
    #[arg(long = "counties")]
    pub counties: Option<PathBuf>,
    /// Pattern table holding a description column
    #[arg(long = "patterns")]
    pub patterns: Option<PathBuf>,
    /// Directory receiving the output tables
    #[arg(short, long = "output-dir")]
    pub output_dir: Option<PathBuf>,
    /// Name of the county identifier column (default: county_id)
    #[arg(long = "county-id")]
    pub county_id: Option<String>,
    /// Name of the pattern description column (default: description)
    #[arg(long = "description-column")]
    pub description_column: Option<String>,
    /// Categorical feature column encoded as 1/0
    #[arg(long = "categorical", requires_all = ["positive_level", "negative_level"])]
    pub categorical: Option<String>,
    /// Categorical level encoded as 1
    #[arg(long = "positive-level", requires = "categorical")]
    pub positive_level: Option<String>,
    /// Categorical level encoded as 0
    #[arg(long = "negative-level", requires = "categorical")]
    pub negative_level: Option<String>,
    /// Input delimiter (supports ',', 'tab', ';', '|')
    #[arg(long)]
    pub delimiter: Option<String>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

impl PipelineArgs {
    pub fn overrides(&self) -> ConfigFile {
        let categorical = match (
            &self.categorical,
            &self.positive_level,
            &self.negative_level,
        ) {
            (Some(column), Some(positive), Some(negative)) => Some(CategoricalEncoding {
                column: column.clone(),
                positive: positive.clone(),
                negative: negative.clone(),
            }),
            _ => None,
        };
        ConfigFile {
            county_table: self.counties.clone(),
            pattern_table: self.patterns.clone(),
            output_dir: self.output_dir.clone(),
            county_id_column: self.county_id.clone(),
            description_column: self.description_column.clone(),
            categorical,
            delimiter: self.delimiter.clone(),
            input_encoding: self.input_encoding.clone(),
        }
    }
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,
    /// Skip printing the per-pattern summary
    #[arg(short, long)]
    pub quiet: bool,
    /// Exit successfully even when validation reports violations
    #[arg(long = "allow-violations")]
    pub allow_violations: bool,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Final masked table to check
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Name of the county identifier column
    #[arg(long = "county-id", default_value = crate::config::DEFAULT_COUNTY_ID_COLUMN)]
    pub county_id: String,
    /// Feature dictionary naming the columns to range-check (default: every
    /// non-identifier column)
    #[arg(long = "feature-dict")]
    pub feature_dict: Option<PathBuf>,
    /// Maximum violations to print (0 = all)
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    /// Table with a Pattern_id column
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
