//! Constraint matching engine.
//!
//! Each pattern starts from the full county table and is narrowed one
//! constraint at a time. Patterns are independent, so a county appears once
//! for every pattern it satisfies.

use std::collections::HashMap;

use log::{debug, info};

use crate::{
    constraints::{PATTERN_ID_COLUMN, Pattern, PatternSet},
    counties::CountyTable,
    dataset::Dataset,
};

#[derive(Debug, Clone)]
pub struct MatchOutcome {
    /// `Pattern_id` followed by every county column, one row per match.
    pub table: Dataset,
    /// Matched county count per pattern, in pattern order.
    pub counts: Vec<(String, usize)>,
}

/// Parsed feature columns, filled on first use.
struct ColumnCache<'a> {
    counties: &'a CountyTable,
    columns: HashMap<usize, Vec<Option<f64>>>,
}

impl<'a> ColumnCache<'a> {
    fn new(counties: &'a CountyTable) -> Self {
        Self {
            counties,
            columns: HashMap::new(),
        }
    }

    fn column(&mut self, position: usize) -> &[Option<f64>] {
        let counties = self.counties;
        self.columns.entry(position).or_insert_with(|| {
            let column = counties
                .catalog
                .get(position)
                .map(|feature| feature.column)
                .unwrap_or_default();
            counties
                .data
                .rows
                .iter()
                .map(|row| counties.features.value(position, &row[column]))
                .collect()
        })
    }
}

/// Row indices of the counties satisfying every constraint of `pattern`.
pub fn matching_rows(counties: &CountyTable, pattern: &Pattern) -> Vec<usize> {
    let mut cache = ColumnCache::new(counties);
    filter_rows(&mut cache, pattern)
}

fn filter_rows(cache: &mut ColumnCache<'_>, pattern: &Pattern) -> Vec<usize> {
    let mut rows = (0..cache.counties.data.len()).collect::<Vec<_>>();
    for constraint in &pattern.constraints {
        if rows.is_empty() {
            break;
        }
        let values = cache.column(constraint.feature);
        rows.retain(|&row| constraint.admits(values[row]));
    }
    rows
}

pub fn match_patterns(counties: &CountyTable, patterns: &PatternSet) -> MatchOutcome {
    let mut headers = Vec::with_capacity(counties.data.headers.len() + 1);
    headers.push(PATTERN_ID_COLUMN.to_string());
    headers.extend(counties.data.headers.iter().cloned());
    let mut table = Dataset::new(headers);
    let mut counts = Vec::with_capacity(patterns.patterns.len());

    let mut cache = ColumnCache::new(counties);
    for pattern in &patterns.patterns {
        let rows = filter_rows(&mut cache, pattern);
        debug!(
            "Pattern '{}' ({} constraint(s)) matched {} county row(s)",
            pattern.id,
            pattern.constraints.len(),
            rows.len()
        );
        for row in &rows {
            let source = &counties.data.rows[*row];
            let mut out = Vec::with_capacity(source.len() + 1);
            out.push(pattern.id.clone());
            out.extend(source.iter().cloned());
            table.rows.push(out);
        }
        counts.push((pattern.id.clone(), rows.len()));
    }

    info!(
        "Matched {} pattern(s) against {} county row(s): {} output row(s)",
        patterns.patterns.len(),
        counties.data.len(),
        table.len()
    );
    MatchOutcome { table, counts }
}
