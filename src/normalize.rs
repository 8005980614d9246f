//! Normalization stage.
//!
//! Encodes the categorical feature, drops every match row holding a missing
//! value, then min-max rescales each feature over the surviving rows. A
//! constant column has no range; its values become NaN and a
//! [`PipelineWarning::DivisionDegenerate`] is recorded so validation can
//! report it.

use log::{info, warn};

use crate::{
    catalog::FeatureCatalog,
    constraints::PATTERN_ID_COLUMN,
    counties::FeatureReader,
    dataset::{self, Dataset},
    error::{PipelineWarning, SchemaError},
    matrix::{FeatureMatrix, MatrixRow},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnRange {
    pub min: f64,
    pub max: f64,
}

impl ColumnRange {
    pub fn rescale(&self, value: f64) -> f64 {
        (value - self.min) / (self.max - self.min)
    }

    pub fn is_degenerate(&self) -> bool {
        self.max == self.min
    }
}

#[derive(Debug, Clone)]
pub struct NormalizationOutcome {
    pub matrix: FeatureMatrix,
    pub dropped_rows: usize,
    /// Range per catalog feature; `None` when no row survived.
    pub ranges: Vec<Option<ColumnRange>>,
    pub warnings: Vec<PipelineWarning>,
}

pub fn normalize(
    matches: &Dataset,
    catalog: &FeatureCatalog,
    reader: &FeatureReader,
    county_id_column: &str,
) -> Result<NormalizationOutcome, SchemaError> {
    let table = "norc_with_pattern";
    let pattern_idx = matches.require_column(table, PATTERN_ID_COLUMN)?;
    let county_idx = matches.require_column(table, county_id_column)?;
    // Matched rows are `Pattern_id` followed by the county columns.
    let feature_columns = catalog
        .iter()
        .map(|feature| {
            let column = feature.column + 1;
            match matches.headers.get(column) {
                Some(header) if *header == feature.name => Ok(column),
                _ => Err(SchemaError::MissingColumn {
                    table: table.to_string(),
                    column: feature.name.clone(),
                }),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut rows = Vec::with_capacity(matches.len());
    let mut dropped_rows = 0usize;
    for source in &matches.rows {
        let pattern_id = &source[pattern_idx];
        let county_id = &source[county_idx];
        let values = feature_columns
            .iter()
            .enumerate()
            .map(|(position, column)| reader.value(position, &source[*column]))
            .collect::<Option<Vec<f64>>>();
        match values {
            Some(values) if !dataset::is_missing(pattern_id) && !dataset::is_missing(county_id) => {
                rows.push(MatrixRow {
                    pattern_id: pattern_id.clone(),
                    county_id: county_id.clone(),
                    values,
                });
            }
            _ => dropped_rows += 1,
        }
    }

    let ranges = (0..feature_columns.len())
        .map(|position| column_range(&rows, position))
        .collect::<Vec<_>>();

    let mut warnings = Vec::new();
    for (position, range) in ranges.iter().enumerate() {
        if let Some(range) = range
            && range.is_degenerate()
        {
            let warning = PipelineWarning::DivisionDegenerate {
                column: matches.headers[feature_columns[position]].clone(),
                rows: rows.len(),
            };
            warn!("{warning}");
            warnings.push(warning);
        }
    }

    for row in &mut rows {
        for (value, range) in row.values.iter_mut().zip(&ranges) {
            if let Some(range) = range {
                *value = if range.is_degenerate() {
                    f64::NAN
                } else {
                    range.rescale(*value)
                };
            }
        }
    }

    info!(
        "Normalized {} row(s) across {} feature(s); dropped {} row(s) with missing values",
        rows.len(),
        feature_columns.len(),
        dropped_rows
    );
    Ok(NormalizationOutcome {
        matrix: FeatureMatrix {
            headers: matches.headers.clone(),
            county_id_column: county_idx,
            feature_columns,
            rows,
        },
        dropped_rows,
        ranges,
        warnings,
    })
}

fn column_range(rows: &[MatrixRow], position: usize) -> Option<ColumnRange> {
    rows.iter()
        .map(|row| row.values[position])
        .fold(None, |range, value| {
            Some(match range {
                None => ColumnRange {
                    min: value,
                    max: value,
                },
                Some(ColumnRange { min, max }) => ColumnRange {
                    min: min.min(value),
                    max: max.max(value),
                },
            })
        })
}
