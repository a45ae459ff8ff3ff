//! Area-weighted redistribution of variable readings onto the target
//! partition.
//!
//! Missing-value policy: a missing source reading contributes nothing
//! to the weighted sum, and every target cell it would have fed is
//! flagged `partial`. Treating missing as zero would silently
//! understate totals and corrupt the conservation check.

use std::collections::BTreeMap;

use census_atlas_reconcile_models::{
    AreaWeights, Cell, CellKey, ReconciledTable, VariableClass, VariableClassification,
    VariableReading,
};

/// Applies the weight matrix to one year of readings.
///
/// Extensive variables become area-weighted sums on the target
/// partition. Intensive variables pass through unchanged only under
/// identity weights; under real overlay weights they are omitted
/// entirely (the caller derives them from redistributed numerators and
/// denominators if needed). Readings whose variable is not in the
/// classification are ignored.
///
/// All readings must belong to a single year's fetch. Accumulation
/// runs in sorted (target, source) order, so identical inputs always
/// produce identical output.
#[must_use]
pub fn redistribute(
    readings: &[VariableReading],
    weights: &AreaWeights,
    classification: &VariableClassification,
) -> ReconciledTable {
    let mut table = ReconciledTable::new();

    if weights.is_identity() {
        for reading in readings {
            if classification.contains_key(&reading.variable) {
                table.insert(
                    CellKey {
                        geoid: reading.geoid.clone(),
                        year: reading.year,
                        variable: reading.variable.clone(),
                    },
                    Cell {
                        value: reading.value,
                        partial: false,
                    },
                );
            }
        }
        return table;
    }

    let Some(year) = readings.first().map(|reading| reading.year) else {
        return table;
    };

    let mut values: BTreeMap<(&str, &str), Option<f64>> = BTreeMap::new();
    for reading in readings {
        values.insert((reading.geoid.as_str(), reading.variable.as_str()), reading.value);
    }

    // Incoming entries per target, sources sorted for stable summation.
    let mut incoming: BTreeMap<&str, Vec<(&str, f64)>> = BTreeMap::new();
    for entry in &weights.entries {
        incoming
            .entry(entry.target_geoid.as_str())
            .or_default()
            .push((entry.source_geoid.as_str(), entry.weight));
    }
    for contributions in incoming.values_mut() {
        contributions.sort_by_key(|&(source, _)| source);
    }

    for (variable, class) in classification {
        if *class != VariableClass::Extensive {
            continue;
        }

        for (target, contributions) in &incoming {
            let mut sum = 0.0;
            let mut contributed = false;
            let mut partial = false;

            for (source, weight) in contributions {
                match values.get(&(*source, variable.as_str())) {
                    Some(Some(value)) => {
                        sum += value * weight;
                        contributed = true;
                    }
                    Some(None) | None => partial = true,
                }
            }

            table.insert(
                CellKey {
                    geoid: (*target).to_string(),
                    year,
                    variable: variable.clone(),
                },
                Cell {
                    value: contributed.then_some(sum),
                    partial,
                },
            );
        }
    }

    table
}
