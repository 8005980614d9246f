//! Diagnostic view: matched rows per pattern.

use itertools::Itertools;

use crate::{
    constraints::PATTERN_ID_COLUMN, dataset::Dataset, error::SchemaError, table,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternSummary {
    /// Pattern id and row count, in order of first appearance.
    pub counts: Vec<(String, usize)>,
    pub total: usize,
}

impl PatternSummary {
    pub fn from_counts(counts: Vec<(String, usize)>) -> Self {
        let total = counts.iter().map(|(_, count)| count).sum();
        Self { counts, total }
    }

    pub fn render(&self) -> String {
        let headers = vec!["pattern".to_string(), "rows".to_string()];
        let mut rows = self
            .counts
            .iter()
            .map(|(pattern, count)| vec![pattern.clone(), count.to_string()])
            .collect::<Vec<_>>();
        rows.push(vec!["total".to_string(), self.total.to_string()]);
        table::render_table(&headers, &rows)
    }
}

pub fn summarize(table: &Dataset) -> Result<PatternSummary, SchemaError> {
    let pattern_idx = table.require_column("summary", PATTERN_ID_COLUMN)?;
    let counts = table
        .rows
        .iter()
        .map(|row| row[pattern_idx].clone())
        .counts();
    let ordered = table
        .rows
        .iter()
        .map(|row| row[pattern_idx].as_str())
        .unique()
        .map(|pattern| (pattern.to_string(), counts[pattern]))
        .collect::<Vec<_>>();
    Ok(PatternSummary::from_counts(ordered))
}
