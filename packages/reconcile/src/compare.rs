//! Pairwise comparison of two periods in an aligned table.

use std::collections::{BTreeMap, BTreeSet};

use census_atlas_reconcile_models::{ComparisonRow, ReconciledTable, VariableChange};

use crate::ReconcileError;

/// Computes per-unit change metrics between two periods.
///
/// Inner-join semantics: units present in only one of the two periods
/// are dropped from the output entirely. Percent change is undefined
/// (`None`, never infinity or zero) when the base value is zero or
/// missing. Passing no `variables` compares every variable in the
/// table.
///
/// # Errors
///
/// Returns [`ReconcileError::InvalidRequest`] when either period is
/// absent from the table.
pub fn compare(
    table: &ReconciledTable,
    base_period: u16,
    comparison_period: u16,
    variables: Option<&BTreeSet<String>>,
    with_change: bool,
    with_pct_change: bool,
) -> Result<Vec<ComparisonRow>, ReconcileError> {
    let years = table.years();
    for period in [base_period, comparison_period] {
        if !years.contains(&period) {
            return Err(ReconcileError::InvalidRequest {
                message: format!("period {period} is not present in the table"),
            });
        }
    }

    let compared: Vec<String> = variables.map_or_else(
        || table.variables().iter().map(ToString::to_string).collect(),
        |names| names.iter().cloned().collect(),
    );

    let base_geoids = table.geoids_in_year(base_period);
    let comparison_geoids = table.geoids_in_year(comparison_period);

    let rows = base_geoids
        .intersection(&comparison_geoids)
        .map(|geoid| {
            let mut changes = BTreeMap::new();
            for variable in &compared {
                let base = table
                    .get(geoid, base_period, variable)
                    .and_then(|cell| cell.value);
                let comparison = table
                    .get(geoid, comparison_period, variable)
                    .and_then(|cell| cell.value);

                let change = match (with_change || with_pct_change, base, comparison) {
                    (true, Some(base), Some(comparison)) => Some(comparison - base),
                    _ => None,
                };
                let percent_change = match (with_pct_change, base, change) {
                    (true, Some(base), Some(change)) if base != 0.0 => {
                        Some(change / base * 100.0)
                    }
                    _ => None,
                };

                changes.insert(variable.clone(), VariableChange {
                    base,
                    comparison,
                    change: if with_change { change } else { None },
                    percent_change,
                });
            }
            ComparisonRow {
                geoid: (*geoid).to_string(),
                changes,
            }
        })
        .collect();

    Ok(rows)
}
