//! Parsing of `--variables` specs into a
//! [`VariableMap`](census_atlas_reconcile_models::VariableMap).

use std::collections::BTreeMap;

use census_atlas_reconcile_models::VariableMap;

/// Parses variable specs of the form `name=CODE` (uniform across
/// years) or `name=YEAR:CODE;YEAR:CODE` (per-year codes, needed when
/// decennial codes were renumbered between cycles).
///
/// The two forms cannot be mixed in one request.
///
/// # Errors
///
/// Returns a description of the offending spec.
pub fn parse_variables(specs: &[String]) -> Result<VariableMap, String> {
    let mut uniform: BTreeMap<String, String> = BTreeMap::new();
    let mut per_year: BTreeMap<u16, BTreeMap<String, String>> = BTreeMap::new();

    for spec in specs {
        let (name, codes) = spec
            .split_once('=')
            .ok_or_else(|| format!("Variable spec '{spec}' is missing '='"))?;
        if name.is_empty() {
            return Err(format!("Variable spec '{spec}' has an empty name"));
        }

        if codes.contains(':') {
            for part in codes.split(';') {
                let (year, code) = part
                    .split_once(':')
                    .ok_or_else(|| format!("Per-year spec '{part}' is missing ':'"))?;
                let year: u16 = year
                    .parse()
                    .map_err(|_| format!("Invalid year '{year}' in spec '{spec}'"))?;
                per_year
                    .entry(year)
                    .or_default()
                    .insert(name.to_string(), code.to_string());
            }
        } else {
            uniform.insert(name.to_string(), codes.to_string());
        }
    }

    match (uniform.is_empty(), per_year.is_empty()) {
        (false, true) => Ok(VariableMap::Uniform(uniform)),
        (true, false) => Ok(VariableMap::PerYear(per_year)),
        (true, true) => Err("No variables specified".to_string()),
        (false, false) => {
            Err("Cannot mix uniform and per-year variable specs in one request".to_string())
        }
    }
}
