//! County table loading and schema checks.
//!
//! Every non-identifier column is expected to be numeric, except the one
//! configured categorical column whose two levels encode to 1 and 0. Column
//! types are checked once up front so later stages can read values without
//! re-validating.

use log::info;

use crate::{
    catalog::FeatureCatalog,
    config::CategoricalEncoding,
    dataset::{self, Dataset},
    error::SchemaError,
};

#[derive(Debug, Clone)]
pub struct CountyTable {
    pub data: Dataset,
    pub id_column: usize,
    pub catalog: FeatureCatalog,
    pub features: FeatureReader,
}

impl CountyTable {
    pub fn from_dataset(
        data: Dataset,
        id_column: &str,
        categorical: Option<&CategoricalEncoding>,
    ) -> Result<Self, SchemaError> {
        let catalog = FeatureCatalog::build(&data.headers, id_column)?;
        let id_idx = data.require_column("county", id_column)?;
        let features = FeatureReader::new(&catalog, categorical)?;
        check_numeric_columns(&data, &catalog, features.categorical_position())?;
        info!(
            "County table: {} row(s), {} feature(s), identifier '{}'",
            data.len(),
            catalog.len(),
            id_column
        );
        Ok(Self {
            data,
            id_column: id_idx,
            catalog,
            features,
        })
    }

    pub fn county_id<'a>(&self, row: &'a [String]) -> &'a str {
        row[self.id_column].as_str()
    }
}

/// Reads typed feature values out of raw county cells.
#[derive(Debug, Clone)]
pub struct FeatureReader {
    categorical: Option<(usize, CategoricalEncoding)>,
}

impl FeatureReader {
    pub fn new(
        catalog: &FeatureCatalog,
        categorical: Option<&CategoricalEncoding>,
    ) -> Result<Self, SchemaError> {
        let categorical = categorical
            .map(|encoding| {
                catalog
                    .position_of_name(&encoding.column)
                    .map(|position| (position, encoding.clone()))
                    .ok_or_else(|| SchemaError::MissingCategoricalColumn {
                        column: encoding.column.clone(),
                    })
            })
            .transpose()?;
        Ok(Self { categorical })
    }

    pub fn categorical_position(&self) -> Option<usize> {
        self.categorical.as_ref().map(|(position, _)| *position)
    }

    /// Value of catalog feature `position` in a raw cell, or `None` when the
    /// cell is missing, non-numeric, non-finite, or an unmapped categorical
    /// level.
    pub fn value(&self, position: usize, cell: &str) -> Option<f64> {
        match &self.categorical {
            Some((categorical, encoding)) if *categorical == position => encoding.encode(cell),
            _ => dataset::parse_number(cell),
        }
    }
}

fn check_numeric_columns(
    data: &Dataset,
    catalog: &FeatureCatalog,
    categorical: Option<usize>,
) -> Result<(), SchemaError> {
    for (position, feature) in catalog.iter().enumerate() {
        if Some(position) == categorical {
            continue;
        }
        for (row_idx, row) in data.rows.iter().enumerate() {
            let cell = row[feature.column].as_str();
            if !dataset::is_missing(cell) && cell.trim().parse::<f64>().is_err() {
                return Err(SchemaError::UnexpectedColumnType {
                    column: feature.name.clone(),
                    value: cell.to_string(),
                    row: row_idx + 2,
                });
            }
        }
    }
    Ok(())
}
