//! Stage orchestration and artifact persistence.
//!
//! Inputs are loaded, schema-checked and parsed before anything is written,
//! so a schema or parse error leaves the output directory untouched. After
//! that each stage materializes its table, persists it, and hands it on.

use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::info;
use serde::Serialize;

use crate::{
    catalog::FeatureCatalog,
    config::PipelineConfig,
    constraints::{self, PatternSet},
    counties::CountyTable,
    dataset::Dataset,
    error::PipelineWarning,
    io_utils, mask, matching, normalize,
    summary::PatternSummary,
    validate::{self, ValidationReport},
};

pub const FEATURE_DICT: &str = "feature_dict";
pub const PATTERN_CONSTRAINTS: &str = "pattern_constraints";
pub const NORC_WITH_PATTERN: &str = "norc_with_pattern";
pub const NORMALIZED_NORC_WITH_PATTERN: &str = "normalized_norc_with_pattern";
pub const FINAL: &str = "final";
pub const RUN_REPORT: &str = "run_report.json";

pub fn artifact_path(output_dir: &Path, name: &str) -> PathBuf {
    output_dir.join(format!("{name}.csv"))
}

#[derive(Debug, Clone, Serialize)]
pub struct PatternCount {
    pub pattern: String,
    pub rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub features: usize,
    pub patterns: usize,
    pub constraints: usize,
    pub matched_rows: usize,
    pub per_pattern: Vec<PatternCount>,
    pub normalized_rows: usize,
    pub dropped_rows: usize,
    pub masked_cells: usize,
    pub warnings: Vec<PipelineWarning>,
    pub validation: ValidationReport,
}

impl RunReport {
    pub fn summary(&self) -> PatternSummary {
        PatternSummary::from_counts(
            self.per_pattern
                .iter()
                .map(|count| (count.pattern.clone(), count.rows))
                .collect(),
        )
    }
}

/// Loads the county table and checks its schema.
pub fn load_counties(config: &PipelineConfig) -> Result<CountyTable> {
    let path = &config.county_table;
    let delimiter = config.delimiter_for(path);
    let encoding = io_utils::resolve_encoding(config.input_encoding.as_deref())?;
    info!(
        "Loading county table {:?} (delimiter '{}')",
        path,
        io_utils::printable_delimiter(delimiter)
    );
    let data = Dataset::load(path, delimiter, encoding)
        .with_context(|| format!("Loading county table {path:?}"))?;
    let counties =
        CountyTable::from_dataset(data, &config.county_id_column, config.categorical.as_ref())
            .with_context(|| format!("Checking county schema of {path:?}"))?;
    Ok(counties)
}

/// Loads the pattern table and parses every description against `catalog`.
pub fn load_patterns(config: &PipelineConfig, catalog: &FeatureCatalog) -> Result<PatternSet> {
    let path = &config.pattern_table;
    let delimiter = config.delimiter_for(path);
    let encoding = io_utils::resolve_encoding(config.input_encoding.as_deref())?;
    let data = Dataset::load(path, delimiter, encoding)
        .with_context(|| format!("Loading pattern table {path:?}"))?;
    let patterns = constraints::parse_patterns(&data, &config.description_column, catalog)
        .with_context(|| format!("Parsing pattern descriptions in {path:?}"))?;
    Ok(patterns)
}

fn persist(output_dir: &Path, name: &str, table: &Dataset) -> Result<()> {
    let path = artifact_path(output_dir, name);
    table
        .save(&path)
        .with_context(|| format!("Writing {name} table to {path:?}"))?;
    info!("Wrote {} row(s) to {:?}", table.len(), path);
    Ok(())
}

fn prepare_output_dir(output_dir: &Path) -> Result<()> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Creating output directory {output_dir:?}"))
}

/// Writes `feature_dict` only.
pub fn write_catalog(config: &PipelineConfig) -> Result<FeatureCatalog> {
    let counties = load_counties(config)?;
    prepare_output_dir(&config.output_dir)?;
    persist(&config.output_dir, FEATURE_DICT, &counties.catalog.to_dataset())?;
    Ok(counties.catalog)
}

/// Writes `feature_dict` and `pattern_constraints`.
pub fn write_constraints(config: &PipelineConfig) -> Result<PatternSet> {
    let counties = load_counties(config)?;
    let patterns = load_patterns(config, &counties.catalog)?;
    prepare_output_dir(&config.output_dir)?;
    persist(&config.output_dir, FEATURE_DICT, &counties.catalog.to_dataset())?;
    persist(&config.output_dir, PATTERN_CONSTRAINTS, &patterns.to_dataset())?;
    Ok(patterns)
}

/// Runs all six stages and writes every artifact plus the run report.
pub fn run(config: &PipelineConfig) -> Result<RunReport> {
    let counties = load_counties(config)?;
    let patterns = load_patterns(config, &counties.catalog)?;
    let output_dir = config.output_dir.as_path();
    prepare_output_dir(output_dir)?;

    let feature_dict = counties.catalog.to_dataset();
    persist(output_dir, FEATURE_DICT, &feature_dict)?;
    persist(output_dir, PATTERN_CONSTRAINTS, &patterns.to_dataset())?;

    let matched = matching::match_patterns(&counties, &patterns);
    persist(output_dir, NORC_WITH_PATTERN, &matched.table)?;

    let normalized = normalize::normalize(
        &matched.table,
        &counties.catalog,
        &counties.features,
        &config.county_id_column,
    )
    .context("Normalizing matched rows")?;
    persist(
        output_dir,
        NORMALIZED_NORC_WITH_PATTERN,
        &normalized.matrix.to_dataset(),
    )?;

    let (masked, masked_cells) = mask::mask(&normalized.matrix, &patterns);
    let final_table = masked.to_dataset();
    persist(output_dir, FINAL, &final_table)?;

    let final_features = FeatureCatalog::from_dataset(&feature_dict, &final_table.headers)
        .context("Resolving feature dictionary against the final table")?;
    let validation = validate::validate(
        &final_table,
        &config.county_id_column,
        Some(&final_features),
    );

    let mut warnings = patterns.warnings.clone();
    warnings.extend(normalized.warnings.iter().cloned());
    let report = RunReport {
        features: counties.catalog.len(),
        patterns: patterns.patterns.len(),
        constraints: patterns.constraint_count(),
        matched_rows: matched.table.len(),
        per_pattern: matched
            .counts
            .iter()
            .map(|(pattern, rows)| PatternCount {
                pattern: pattern.clone(),
                rows: *rows,
            })
            .collect(),
        normalized_rows: normalized.matrix.len(),
        dropped_rows: normalized.dropped_rows,
        masked_cells,
        warnings,
        validation,
    };
    write_report(output_dir, &report)?;
    Ok(report)
}

fn write_report(output_dir: &Path, report: &RunReport) -> Result<()> {
    let path = output_dir.join(RUN_REPORT);
    let file = File::create(&path).with_context(|| format!("Creating run report {path:?}"))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report).context("Writing run report JSON")
}
