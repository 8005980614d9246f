//! Feature catalog: stable `f1..fN` identifiers for county columns.
//!
//! The catalog is the only join key between pattern descriptions and the
//! county table. Identifiers follow the county schema's column order with the
//! identifier column removed, so the same header row always yields the same
//! assignment. A persisted `feature_dict` can be resolved against another
//! header row, which is how validation learns which columns are features.

use std::collections::HashMap;

use anyhow::{Result, anyhow, bail};
use itertools::Itertools;

use crate::{constraints::PATTERN_ID_COLUMN, dataset::Dataset, error::SchemaError};

pub const FEATURE_ID_COLUMN: &str = "Feature_ID";
pub const FEATURE_NAME_COLUMN: &str = "Feature_Name";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    pub id: String,
    pub name: String,
    /// Position of the feature's column in the header row the catalog was
    /// built or resolved against.
    pub column: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FeatureCatalog {
    features: Vec<Feature>,
    by_name: HashMap<String, usize>,
}

impl FeatureCatalog {
    pub fn build(headers: &[String], id_column: &str) -> Result<Self, SchemaError> {
        let table = "county";
        let schema = Dataset::new(headers.to_vec());
        schema.ensure_unique_headers(table)?;
        schema.require_column(table, id_column)?;
        // Matched rows gain a leading pattern column; a county column of the
        // same name would shadow it downstream.
        if headers.iter().any(|name| name == PATTERN_ID_COLUMN) {
            return Err(SchemaError::DuplicateColumn {
                table: "norc_with_pattern".into(),
                column: PATTERN_ID_COLUMN.into(),
            });
        }

        let features = headers
            .iter()
            .enumerate()
            .filter(|(_, name)| name.as_str() != id_column)
            .enumerate()
            .map(|(ordinal, (column, name))| Feature {
                id: format!("f{}", ordinal + 1),
                name: name.clone(),
                column,
            })
            .collect::<Vec<_>>();
        Ok(Self::from_features(features))
    }

    fn from_features(features: Vec<Feature>) -> Self {
        let by_name = features
            .iter()
            .enumerate()
            .map(|(idx, feature)| (feature.name.clone(), idx))
            .collect();
        Self { features, by_name }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    pub fn get(&self, position: usize) -> Option<&Feature> {
        self.features.get(position)
    }

    /// Catalog position of the feature with the given column name.
    pub fn position_of_name(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn by_name(&self, name: &str) -> Option<&Feature> {
        self.position_of_name(name).map(|idx| &self.features[idx])
    }

    pub fn to_dataset(&self) -> Dataset {
        let mut table = Dataset::new(vec![
            FEATURE_ID_COLUMN.to_string(),
            FEATURE_NAME_COLUMN.to_string(),
        ]);
        table.rows = self
            .features
            .iter()
            .map(|feature| vec![feature.id.clone(), feature.name.clone()])
            .collect();
        table
    }

    /// Rebuilds a catalog from a persisted `feature_dict` table, resolving
    /// each feature's position against `headers`.
    pub fn from_dataset(table: &Dataset, headers: &[String]) -> Result<Self> {
        let id_idx = table.require_column("feature_dict", FEATURE_ID_COLUMN)?;
        let name_idx = table.require_column("feature_dict", FEATURE_NAME_COLUMN)?;
        for column in [id_idx, name_idx] {
            let repeated = table.rows.iter().map(|row| &row[column]).duplicates().next();
            if let Some(repeated) = repeated {
                bail!(
                    "Feature dictionary repeats '{repeated}' in column '{}'",
                    table.headers[column]
                );
            }
        }
        let features = table
            .rows
            .iter()
            .map(|row| {
                let name = row[name_idx].clone();
                let column = headers
                    .iter()
                    .position(|header| *header == name)
                    .ok_or_else(|| anyhow!("Feature '{name}' not present in table header"))?;
                Ok(Feature {
                    id: row[id_idx].clone(),
                    name,
                    column,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_features(features))
    }
}
