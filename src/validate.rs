//! Validation of the final masked table.
//!
//! Checks are advisory: the table is never modified. Every problem becomes a
//! [`Violation`], and an empty list is the pipeline's pass signal. Given a
//! feature catalog, only its columns are range-checked; without one every
//! non-identifier column is treated as a feature.

use std::{collections::HashSet, fmt};

use log::{info, warn};
use serde::Serialize;

use crate::{
    catalog::FeatureCatalog,
    constraints::PATTERN_ID_COLUMN,
    dataset::{self, Dataset},
    mask::SENTINEL,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    MissingValue,
    OutOfRange,
    NonNumeric,
    DuplicateColumn,
    MissingColumn,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ViolationKind::MissingValue => "missing value",
            ViolationKind::OutOfRange => "out of range",
            ViolationKind::NonNumeric => "non-numeric",
            ViolationKind::DuplicateColumn => "duplicate column",
            ViolationKind::MissingColumn => "missing column",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub pattern_id: String,
    pub county_id: String,
    pub feature: String,
    pub observed: String,
}

impl Violation {
    fn structural(kind: ViolationKind, column: &str) -> Self {
        Self {
            kind,
            pattern_id: String::new(),
            county_id: String::new(),
            feature: column.to_string(),
            observed: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub rows_checked: usize,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_pass(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn count(&self, kind: ViolationKind) -> usize {
        self.violations.iter().filter(|v| v.kind == kind).count()
    }

    pub fn to_rows(&self) -> Vec<Vec<String>> {
        self.violations
            .iter()
            .map(|v| {
                vec![
                    v.kind.to_string(),
                    v.pattern_id.clone(),
                    v.county_id.clone(),
                    v.feature.clone(),
                    v.observed.clone(),
                ]
            })
            .collect()
    }
}

pub const REPORT_HEADERS: [&str; 5] = ["violation", "pattern", "county", "feature", "observed"];

pub fn validate(
    table: &Dataset,
    county_id_column: &str,
    features: Option<&FeatureCatalog>,
) -> ValidationReport {
    let mut report = ValidationReport {
        rows_checked: table.len(),
        violations: Vec::new(),
    };

    let mut seen = HashSet::new();
    for header in &table.headers {
        if !seen.insert(header.as_str()) {
            report
                .violations
                .push(Violation::structural(ViolationKind::DuplicateColumn, header));
        }
    }
    let pattern_idx = table.column_index(PATTERN_ID_COLUMN);
    let county_idx = table.column_index(county_id_column);
    for (column, idx) in [(PATTERN_ID_COLUMN, pattern_idx), (county_id_column, county_idx)] {
        if idx.is_none() {
            report
                .violations
                .push(Violation::structural(ViolationKind::MissingColumn, column));
        }
    }

    let feature_columns = features.map(|catalog| {
        catalog
            .iter()
            .map(|feature| feature.column)
            .collect::<HashSet<_>>()
    });

    for row in &table.rows {
        let cell = |idx: Option<usize>| {
            idx.and_then(|idx| row.get(idx))
                .cloned()
                .unwrap_or_default()
        };
        let pattern_id = cell(pattern_idx);
        let county_id = cell(county_idx);
        for (idx, header) in table.headers.iter().enumerate() {
            let value = row.get(idx).map(String::as_str).unwrap_or("");
            let is_identifier = Some(idx) == pattern_idx || Some(idx) == county_idx;
            let is_feature = feature_columns
                .as_ref()
                .is_none_or(|columns| columns.contains(&idx));
            if !is_identifier && !is_feature {
                continue;
            }
            let kind = if dataset::is_missing(value) {
                Some(ViolationKind::MissingValue)
            } else if is_identifier {
                None
            } else {
                check_feature_value(value)
            };
            if let Some(kind) = kind {
                report.violations.push(Violation {
                    kind,
                    pattern_id: pattern_id.clone(),
                    county_id: county_id.clone(),
                    feature: header.clone(),
                    observed: value.to_string(),
                });
            }
        }
    }

    if report.is_pass() {
        info!("Validation passed for {} row(s)", report.rows_checked);
    } else {
        warn!(
            "Validation found {} violation(s) across {} row(s)",
            report.violations.len(),
            report.rows_checked
        );
    }
    report
}

fn check_feature_value(value: &str) -> Option<ViolationKind> {
    match value.trim().parse::<f64>() {
        Ok(number) if number == SENTINEL => None,
        Ok(number) if (0.0..=1.0).contains(&number) => None,
        Ok(_) => Some(ViolationKind::OutOfRange),
        Err(_) => Some(ViolationKind::NonNumeric),
    }
}
