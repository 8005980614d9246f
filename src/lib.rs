pub mod catalog;
pub mod cli;
pub mod config;
pub mod constraints;
pub mod counties;
pub mod dataset;
pub mod description;
pub mod error;
pub mod io_utils;
pub mod mask;
pub mod matching;
pub mod matrix;
pub mod normalize;
pub mod pipeline;
pub mod summary;
pub mod table;
pub mod validate;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands},
    config::{ConfigFile, PipelineConfig},
    dataset::Dataset,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("county_patterns", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => handle_run(&args),
        Commands::Catalog(args) => {
            let config = resolve_config(&args)?;
            let catalog = pipeline::write_catalog(&config)?;
            info!("Catalogued {} feature(s)", catalog.len());
            Ok(())
        }
        Commands::Constraints(args) => {
            let config = resolve_config(&args)?;
            let patterns = pipeline::write_constraints(&config)?;
            info!(
                "Wrote {} constraint(s) for {} pattern(s)",
                patterns.constraint_count(),
                patterns.patterns.len()
            );
            Ok(())
        }
        Commands::Validate(args) => handle_validate(&args),
        Commands::Summary(args) => handle_summary(&args),
    }
}

fn resolve_config(args: &cli::PipelineArgs) -> Result<PipelineConfig> {
    let base = match &args.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };
    let config = base.merge(args.overrides()).resolve()?;
    if let Ok(rendered) = serde_yaml::to_string(&config) {
        debug!("Effective configuration:\n{rendered}");
    }
    Ok(config)
}

fn handle_run(args: &cli::RunArgs) -> Result<()> {
    let config = resolve_config(&args.pipeline)?;
    let report = pipeline::run(&config)?;
    if !args.quiet {
        print!("{}", report.summary().render());
    }
    if report.validation.is_pass() {
        info!(
            "Pipeline complete: {} row(s) in {:?}",
            report.normalized_rows,
            pipeline::artifact_path(&config.output_dir, pipeline::FINAL)
        );
        return Ok(());
    }
    table::print_table(
        &validate::REPORT_HEADERS.map(String::from),
        &report.validation.to_rows(),
    );
    if args.allow_violations {
        return Ok(());
    }
    bail!(
        "Validation reported {} violation(s); see {:?}",
        report.validation.violations.len(),
        config.output_dir.join(pipeline::RUN_REPORT)
    )
}

fn handle_validate(args: &cli::ValidateArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, None);
    let table = Dataset::load(&args.input, delimiter, encoding_rs::UTF_8)
        .with_context(|| format!("Loading table {:?}", args.input))?;
    let features = match &args.feature_dict {
        Some(path) => {
            let delimiter = io_utils::resolve_input_delimiter(path, None);
            let dict = Dataset::load(path, delimiter, encoding_rs::UTF_8)
                .with_context(|| format!("Loading feature dictionary {path:?}"))?;
            let catalog = catalog::FeatureCatalog::from_dataset(&dict, &table.headers)
                .with_context(|| format!("Resolving {path:?} against {:?}", args.input))?;
            Some(catalog)
        }
        None => None,
    };
    let report = validate::validate(&table, &args.county_id, features.as_ref());
    if report.is_pass() {
        info!("✓ {:?} passed validation", args.input);
        return Ok(());
    }
    let rows = report.to_rows();
    let shown = if args.limit == 0 {
        rows.len()
    } else {
        args.limit.min(rows.len())
    };
    table::print_table(&validate::REPORT_HEADERS.map(String::from), &rows[..shown]);
    bail!(
        "{:?} failed validation with {} violation(s)",
        args.input,
        report.violations.len()
    )
}

fn handle_summary(args: &cli::SummaryArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, None);
    let table = Dataset::load(&args.input, delimiter, encoding_rs::UTF_8)
        .with_context(|| format!("Loading table {:?}", args.input))?;
    let summary = summary::summarize(&table)?;
    print!("{}", summary.render());
    Ok(())
}
