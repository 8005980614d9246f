//! Pattern-aware masking.
//!
//! Every feature a row's pattern does not constrain is overwritten with
//! [`SENTINEL`]. Identifier columns pass through untouched.

use std::collections::{HashMap, HashSet};

use log::info;

use crate::{constraints::PatternSet, matrix::FeatureMatrix};

/// Marks a feature that carries no signal for the row's pattern.
pub const SENTINEL: f64 = -1.0;

/// Pattern id → catalog positions the pattern constrains.
pub fn constrained_features(patterns: &PatternSet) -> HashMap<&str, HashSet<usize>> {
    patterns
        .patterns
        .iter()
        .map(|pattern| (pattern.id.as_str(), pattern.constrained_features()))
        .collect()
}

/// Returns the masked copy of `normalized` and the number of cells masked.
pub fn mask(normalized: &FeatureMatrix, patterns: &PatternSet) -> (FeatureMatrix, usize) {
    let keep = constrained_features(patterns);
    let empty = HashSet::new();
    let mut masked = normalized.clone();
    let mut masked_cells = 0usize;
    for row in &mut masked.rows {
        let features = keep.get(row.pattern_id.as_str()).unwrap_or(&empty);
        for (position, value) in row.values.iter_mut().enumerate() {
            if !features.contains(&position) {
                *value = SENTINEL;
                masked_cells += 1;
            }
        }
    }
    info!(
        "Masked {} of {} feature cell(s) across {} row(s)",
        masked_cells,
        masked.rows.len() * masked.feature_columns.len(),
        masked.rows.len()
    );
    (masked, masked_cells)
}
