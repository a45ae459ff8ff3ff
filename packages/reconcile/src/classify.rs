//! Variable classification for redistribution.
//!
//! The engine has no semantic knowledge of what a variable means, so
//! the caller says which names are extensive (additive). Everything
//! else defaults to intensive and is excluded from redistribution.

use std::collections::BTreeSet;

use census_atlas_reconcile_models::{VariableClass, VariableClassification};

use crate::ReconcileError;

/// Partitions `names` into extensive and intensive variables.
///
/// A name listed in `extensive` that is not in `names` is an
/// [`ReconcileError::UnknownVariable`] under `strict`; otherwise it is
/// ignored with a warning.
///
/// # Errors
///
/// Returns [`ReconcileError::UnknownVariable`] in strict mode for an
/// extensive name absent from `names`.
pub fn classify(
    names: &BTreeSet<String>,
    extensive: &BTreeSet<String>,
    strict: bool,
) -> Result<VariableClassification, ReconcileError> {
    for name in extensive {
        if !names.contains(name) {
            if strict {
                return Err(ReconcileError::UnknownVariable { name: name.clone() });
            }
            log::warn!("Extensive variable '{name}' is not in the requested set, ignoring");
        }
    }

    Ok(names
        .iter()
        .map(|name| {
            let class = if extensive.contains(name) {
                VariableClass::Extensive
            } else {
                VariableClass::Intensive
            };
            (name.clone(), class)
        })
        .collect())
}
