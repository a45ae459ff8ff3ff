//! Conservation checking for redistributed totals.
//!
//! Legitimate boundary redefinition (annexation, water-area changes)
//! causes small genuine discrepancies, so violations are warnings
//! carried alongside results, never hard errors.

use census_atlas_reconcile_models::{
    ConservationWarning, ReconciledTable, VariableClass, VariableClassification, VariableReading,
};

/// Compares per-variable source totals against reconciled target totals
/// for one year of readings.
///
/// Missing readings are excluded from the source total, matching the
/// redistribution policy. A warning is emitted when the relative
/// difference exceeds `tolerance`.
#[must_use]
pub fn validate(
    readings: &[VariableReading],
    reconciled: &ReconciledTable,
    classification: &VariableClassification,
    tolerance: f64,
) -> Vec<ConservationWarning> {
    let Some(year) = readings.first().map(|reading| reading.year) else {
        return Vec::new();
    };

    let mut warnings = Vec::new();

    for (variable, class) in classification {
        if *class != VariableClass::Extensive {
            continue;
        }

        let source_total: f64 = readings
            .iter()
            .filter(|reading| reading.variable == *variable)
            .filter_map(|reading| reading.value)
            .sum();

        let target_total: f64 = reconciled
            .iter()
            .filter(|(key, _)| key.year == year && key.variable == *variable)
            .filter_map(|(_, cell)| cell.value)
            .sum();

        let relative_error = if source_total == 0.0 {
            if target_total == 0.0 { 0.0 } else { f64::INFINITY }
        } else {
            (target_total - source_total).abs() / source_total.abs()
        };

        if relative_error > tolerance {
            log::warn!(
                "Conservation violation for '{variable}' in {year}: \
                 {source_total} -> {target_total} ({:.2}% off)",
                relative_error * 100.0
            );
            warnings.push(ConservationWarning {
                variable: variable.clone(),
                year,
                source_total,
                target_total,
                relative_error,
            });
        }
    }

    warnings
}
