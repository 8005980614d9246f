//! Pattern constraint parser.
//!
//! Turns the pattern table's `description` cells into [`Pattern`]s whose
//! constraints reference catalog features. Unknown feature names and
//! constraints without any bound are dropped with a [`PipelineWarning`]; an
//! undecodable description aborts the whole parse.
//!
//! Each pattern id must be described by exactly one row. A repeated id is a
//! [`ParseError::DuplicatePattern`]; rows are never merged by id.

use std::collections::HashSet;

use log::{info, warn};

use crate::{
    catalog::{FEATURE_ID_COLUMN, FeatureCatalog},
    dataset::{Dataset, format_number},
    description::parse_description,
    error::{ParseError, PipelineError, PipelineWarning},
};

pub const PATTERN_ID_COLUMN: &str = "Pattern_id";
pub const UPPER_BOUND_COLUMN: &str = "UB";
pub const LOWER_BOUND_COLUMN: &str = "LB";

#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub feature_id: String,
    /// Catalog position of the constrained feature.
    pub feature: usize,
    pub lb: Option<f64>,
    pub ub: Option<f64>,
}

impl Constraint {
    /// Closed-interval test. Missing values never satisfy a bound; a
    /// constraint with no bounds at all admits everything.
    pub fn admits(&self, value: Option<f64>) -> bool {
        if self.lb.is_none() && self.ub.is_none() {
            return true;
        }
        let Some(value) = value else {
            return false;
        };
        self.lb.is_none_or(|lb| value >= lb) && self.ub.is_none_or(|ub| value <= ub)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub id: String,
    pub constraints: Vec<Constraint>,
}

impl Pattern {
    /// Catalog positions this pattern constrains.
    pub fn constrained_features(&self) -> HashSet<usize> {
        self.constraints.iter().map(|c| c.feature).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    pub patterns: Vec<Pattern>,
    pub warnings: Vec<PipelineWarning>,
}

impl PatternSet {
    pub fn constraint_count(&self) -> usize {
        self.patterns.iter().map(|p| p.constraints.len()).sum()
    }

    pub fn get(&self, id: &str) -> Option<&Pattern> {
        self.patterns.iter().find(|pattern| pattern.id == id)
    }

    /// The persisted `pattern_constraints` table.
    pub fn to_dataset(&self) -> Dataset {
        let mut table = Dataset::new(vec![
            PATTERN_ID_COLUMN.to_string(),
            FEATURE_ID_COLUMN.to_string(),
            UPPER_BOUND_COLUMN.to_string(),
            LOWER_BOUND_COLUMN.to_string(),
        ]);
        for pattern in &self.patterns {
            for constraint in &pattern.constraints {
                table.rows.push(vec![
                    pattern.id.clone(),
                    constraint.feature_id.clone(),
                    constraint.ub.map(format_number).unwrap_or_default(),
                    constraint.lb.map(format_number).unwrap_or_default(),
                ]);
            }
        }
        table
    }
}

pub fn parse_patterns(
    table: &Dataset,
    description_column: &str,
    catalog: &FeatureCatalog,
) -> Result<PatternSet, PipelineError> {
    table.ensure_unique_headers("pattern")?;
    let description_idx = table.require_column("pattern", description_column)?;

    let mut set = PatternSet::default();
    let mut seen = HashSet::new();
    for (row_idx, row) in table.rows.iter().enumerate() {
        let row_number = row_idx + 2;
        let description = parse_description(&row[description_idx])
            .map_err(|err| err.at_row(row_number))?;
        if !seen.insert(description.id.clone()) {
            return Err(ParseError::DuplicatePattern {
                pattern: description.id,
            }
            .at_row(row_number)
            .into());
        }

        let mut constraints = Vec::with_capacity(description.constraints.len());
        for (name, bounds) in description.constraints {
            let Some(position) = catalog.position_of_name(&name) else {
                let warning = PipelineWarning::UnknownFeature {
                    pattern: description.id.clone(),
                    feature: name,
                };
                warn!("{warning}");
                set.warnings.push(warning);
                continue;
            };
            if bounds.lb.is_none() && bounds.ub.is_none() {
                let warning = PipelineWarning::EmptyConstraint {
                    pattern: description.id.clone(),
                    feature: name,
                };
                warn!("{warning}");
                set.warnings.push(warning);
                continue;
            }
            let feature_id = catalog
                .get(position)
                .map(|feature| feature.id.clone())
                .unwrap_or_default();
            constraints.push(Constraint {
                feature_id,
                feature: position,
                lb: bounds.lb,
                ub: bounds.ub,
            });
        }
        set.patterns.push(Pattern {
            id: description.id,
            constraints,
        });
    }

    info!(
        "Parsed {} pattern(s) into {} constraint(s) ({} skipped)",
        set.patterns.len(),
        set.constraint_count(),
        set.warnings.len()
    );
    Ok(set)
}
