//! Numeric feature matrix shared by the normalization and masking stages.

use crate::dataset::{Dataset, format_number};

#[derive(Debug, Clone, PartialEq)]
pub struct MatrixRow {
    pub pattern_id: String,
    pub county_id: String,
    /// One value per catalog feature, in catalog order.
    pub values: Vec<f64>,
}

/// Rows keep the column layout of the match table they came from: the
/// pattern identifier first, then every county column in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub headers: Vec<String>,
    pub county_id_column: usize,
    /// Header position of each catalog feature.
    pub feature_columns: Vec<usize>,
    pub rows: Vec<MatrixRow>,
}

impl FeatureMatrix {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn feature_name(&self, position: usize) -> &str {
        &self.headers[self.feature_columns[position]]
    }

    pub fn to_dataset(&self) -> Dataset {
        let mut table = Dataset::new(self.headers.clone());
        table.rows = self
            .rows
            .iter()
            .map(|row| {
                let mut cells = vec![String::new(); self.headers.len()];
                cells[0] = row.pattern_id.clone();
                cells[self.county_id_column] = row.county_id.clone();
                for (position, value) in row.values.iter().enumerate() {
                    cells[self.feature_columns[position]] = format_number(*value);
                }
                cells
            })
            .collect();
        table
    }
}
