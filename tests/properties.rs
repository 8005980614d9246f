use std::collections::HashSet;

use county_patterns::{
    catalog::FeatureCatalog,
    constraints::{Constraint, Pattern, PatternSet},
    counties::CountyTable,
    dataset::{Dataset, parse_number},
    description::parse_description,
    mask::{SENTINEL, mask},
    matching::{match_patterns, matching_rows},
    normalize::normalize,
};
use proptest::prelude::*;

const ID_COLUMN: &str = "county_id";

fn bound_strategy() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        2 => Just(None),
        5 => (-60i32..=60).prop_map(|v| Some(f64::from(v))),
        1 => Just(Some(f64::INFINITY)),
        1 => Just(Some(f64::NEG_INFINITY)),
    ]
}

fn cell_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        8 => (-50i32..=50).prop_map(|v| (f64::from(v) / 4.0).to_string()),
        1 => Just(String::new()),
        1 => Just("NA".to_string()),
    ]
}

/// County grid: (feature count, rows of cells).
fn grid_strategy() -> impl Strategy<Value = (usize, Vec<Vec<String>>)> {
    (1usize..=4).prop_flat_map(|features| {
        (
            Just(features),
            proptest::collection::vec(
                proptest::collection::vec(cell_strategy(), features),
                1..=12,
            ),
        )
    })
}

fn patterns_strategy(features: usize) -> impl Strategy<Value = Vec<Vec<(usize, Option<f64>, Option<f64>)>>> {
    proptest::collection::vec(
        proptest::collection::vec((0..features, bound_strategy(), bound_strategy()), 0..=3),
        1..=4,
    )
}

fn county_table(features: usize, cells: &[Vec<String>]) -> CountyTable {
    let mut headers = vec![ID_COLUMN.to_string()];
    headers.extend((0..features).map(|idx| format!("x{idx}")));
    let mut data = Dataset::new(headers);
    for (row_idx, row) in cells.iter().enumerate() {
        let mut record = vec![format!("c{row_idx}")];
        record.extend(row.iter().cloned());
        data.push_row(record).expect("push county row");
    }
    CountyTable::from_dataset(data, ID_COLUMN, None).expect("county table")
}

fn pattern_set(
    catalog: &FeatureCatalog,
    specs: &[Vec<(usize, Option<f64>, Option<f64>)>],
) -> PatternSet {
    let patterns = specs
        .iter()
        .enumerate()
        .map(|(idx, constraints)| {
            let mut seen = HashSet::new();
            let constraints = constraints
                .iter()
                .filter(|(feature, lb, ub)| (lb.is_some() || ub.is_some()) && seen.insert(*feature))
                .map(|(feature, lb, ub)| Constraint {
                    feature_id: catalog.get(*feature).expect("feature").id.clone(),
                    feature: *feature,
                    lb: *lb,
                    ub: *ub,
                })
                .collect();
            Pattern {
                id: (idx + 1).to_string(),
                constraints,
            }
        })
        .collect();
    PatternSet {
        patterns,
        warnings: Vec::new(),
    }
}

fn render_bound(value: f64) -> String {
    if value == f64::INFINITY {
        "inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        value.to_string()
    }
}

proptest! {
    #[test]
    fn catalog_assigns_dense_ids_in_column_order(
        names in proptest::collection::hash_set("[a-z]{1,6}[0-9]{1,3}", 0..8),
        id_at in 0usize..8,
    ) {
        let mut headers = names.into_iter().collect::<Vec<_>>();
        let id_position = id_at.min(headers.len());
        headers.insert(id_position, ID_COLUMN.to_string());

        let catalog = FeatureCatalog::build(&headers, ID_COLUMN).expect("catalog");
        prop_assert_eq!(catalog.len(), headers.len() - 1);
        for (position, feature) in catalog.iter().enumerate() {
            prop_assert_eq!(&feature.id, &format!("f{}", position + 1));
            prop_assert_eq!(&headers[feature.column], &feature.name);
            prop_assert_eq!(catalog.position_of_name(&feature.name), Some(position));
            prop_assert_eq!(catalog.by_name(&feature.name).map(|f| f.id.as_str()), Some(feature.id.as_str()));
        }
        prop_assert!(catalog.by_name(ID_COLUMN).is_none());
    }

    #[test]
    fn rendered_descriptions_parse_back_to_their_bounds(
        id in 0u32..10_000,
        bounds in proptest::collection::vec((bound_strategy(), bound_strategy()), 0..5),
    ) {
        let entries = bounds
            .iter()
            .enumerate()
            .map(|(idx, (lb, ub))| {
                let mut parts = Vec::new();
                if let Some(lb) = lb {
                    parts.push(format!("'lb': {}", render_bound(*lb)));
                }
                if let Some(ub) = ub {
                    parts.push(format!("'ub': {}", render_bound(*ub)));
                }
                format!("'feat_{idx}': {{{}}}", parts.join(", "))
            })
            .collect::<Vec<_>>();
        let text = format!("{{'ID': {id}, 'constraints': {{{}}}}}", entries.join(", "));

        let parsed = parse_description(&text).expect("parse rendered description");
        prop_assert_eq!(parsed.id, id.to_string());
        prop_assert_eq!(parsed.constraints.len(), bounds.len());
        for ((name, raw), (idx, (lb, ub))) in parsed.constraints.iter().zip(bounds.iter().enumerate()) {
            prop_assert_eq!(name, &format!("feat_{idx}"));
            prop_assert_eq!(raw.lb, *lb);
            prop_assert_eq!(raw.ub, *ub);
        }
    }

    #[test]
    fn matching_agrees_with_row_by_row_predicate(
        (features, cells, specs) in grid_strategy().prop_flat_map(|(features, cells)| {
            (Just(features), Just(cells), patterns_strategy(features))
        })
    ) {
        let counties = county_table(features, &cells);
        let patterns = pattern_set(&counties.catalog, &specs);

        for pattern in &patterns.patterns {
            let expected = cells
                .iter()
                .enumerate()
                .filter(|(_, row)| {
                    pattern.constraints.iter().all(|constraint| {
                        parse_number(&row[constraint.feature]).is_some_and(|value| {
                            constraint.lb.is_none_or(|lb| value >= lb)
                                && constraint.ub.is_none_or(|ub| value <= ub)
                        })
                    })
                })
                .map(|(idx, _)| idx)
                .collect::<Vec<_>>();
            prop_assert_eq!(matching_rows(&counties, pattern), expected);
        }

        let outcome = match_patterns(&counties, &patterns);
        let total = outcome.counts.iter().map(|(_, count)| count).sum::<usize>();
        prop_assert_eq!(outcome.table.len(), total);
    }

    #[test]
    fn normalized_columns_span_unit_interval_and_masking_keeps_only_constraints(
        (features, cells, specs) in grid_strategy().prop_flat_map(|(features, cells)| {
            (Just(features), Just(cells), patterns_strategy(features))
        })
    ) {
        let counties = county_table(features, &cells);
        let patterns = pattern_set(&counties.catalog, &specs);
        let matched = match_patterns(&counties, &patterns);
        let normalized = normalize(&matched.table, &counties.catalog, &counties.features, ID_COLUMN)
            .expect("normalize");
        prop_assert_eq!(
            normalized.matrix.len() + normalized.dropped_rows,
            matched.table.len()
        );

        for (position, range) in normalized.ranges.iter().enumerate() {
            let Some(range) = range else { continue };
            let column = normalized
                .matrix
                .rows
                .iter()
                .map(|row| row.values[position])
                .collect::<Vec<_>>();
            if range.is_degenerate() {
                prop_assert!(column.iter().all(|value| value.is_nan()));
            } else {
                let min = column.iter().copied().fold(f64::INFINITY, f64::min);
                let max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                prop_assert_eq!(min, 0.0);
                prop_assert_eq!(max, 1.0);
            }
        }

        let (masked, masked_cells) = mask(&normalized.matrix, &patterns);
        let mut expected_masked = 0usize;
        for (before, after) in normalized.matrix.rows.iter().zip(&masked.rows) {
            prop_assert_eq!(&before.pattern_id, &after.pattern_id);
            prop_assert_eq!(&before.county_id, &after.county_id);
            let kept = patterns
                .get(&before.pattern_id)
                .map(Pattern::constrained_features)
                .unwrap_or_default();
            for (position, (original, value)) in before.values.iter().zip(&after.values).enumerate() {
                if kept.contains(&position) {
                    prop_assert!(
                        original.to_bits() == value.to_bits(),
                        "constrained cell changed: {} -> {}",
                        original,
                        value
                    );
                } else {
                    prop_assert_eq!(*value, SENTINEL);
                    expected_masked += 1;
                }
            }
        }
        prop_assert_eq!(masked_cells, expected_masked);
    }
}
