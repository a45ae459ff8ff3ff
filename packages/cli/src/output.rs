//! CSV rendering of engine output.

use std::io::Write;

use census_atlas_format::{TidyRow, WideTable};
use census_atlas_reconcile_models::ComparisonRow;

/// Writes tidy rows as CSV with a header.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_tidy(rows: &[TidyRow], writer: impl Write) -> Result<(), csv::Error> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["geoid", "year", "variable", "value", "partial"])?;
    for row in rows {
        csv.write_record([
            row.geoid.clone(),
            row.year.to_string(),
            row.variable.clone(),
            format_value(row.value),
            row.partial.to_string(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Writes a wide table as CSV, one `{year}_{variable}` column per pair.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_wide(table: &WideTable, writer: impl Write) -> Result<(), csv::Error> {
    let mut csv = csv::Writer::from_writer(writer);

    let mut header = vec!["geoid".to_string()];
    header.extend(
        table
            .columns
            .iter()
            .map(|(year, variable)| format!("{year}_{variable}")),
    );
    csv.write_record(&header)?;

    for row in &table.rows {
        let mut record = vec![row.geoid.clone()];
        record.extend(row.values.iter().map(|value| format_value(*value)));
        csv.write_record(&record)?;
    }
    csv.flush()?;
    Ok(())
}

/// Writes comparison rows as CSV: per variable, the two period values
/// plus change and percent change.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_comparison(
    rows: &[ComparisonRow],
    base_period: u16,
    comparison_period: u16,
    writer: impl Write,
) -> Result<(), csv::Error> {
    let mut csv = csv::Writer::from_writer(writer);

    let variables: Vec<&str> = rows
        .first()
        .map(|row| row.changes.keys().map(String::as_str).collect())
        .unwrap_or_default();

    let mut header = vec!["geoid".to_string()];
    for variable in &variables {
        header.push(format!("{variable}_{base_period}"));
        header.push(format!("{variable}_{comparison_period}"));
        header.push(format!("{variable}_change"));
        header.push(format!("{variable}_pct_change"));
    }
    csv.write_record(&header)?;

    for row in rows {
        let mut record = vec![row.geoid.clone()];
        for variable in &variables {
            let change = row.changes.get(*variable).copied().unwrap_or_default();
            record.push(format_value(change.base));
            record.push(format_value(change.comparison));
            record.push(format_value(change.change));
            record.push(format_value(change.percent_change));
        }
        csv.write_record(&record)?;
    }
    csv.flush()?;
    Ok(())
}

/// Renders a value cell; missing values come out as an empty field.
fn format_value(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use census_atlas_reconcile_models::VariableChange;

    use super::*;

    #[test]
    fn tidy_csv_renders_missing_as_empty() {
        let rows = vec![
            TidyRow {
                geoid: "a".to_string(),
                year: 2020,
                variable: "pop".to_string(),
                value: Some(100.0),
                partial: false,
            },
            TidyRow {
                geoid: "b".to_string(),
                year: 2020,
                variable: "pop".to_string(),
                value: None,
                partial: true,
            },
        ];

        let mut buffer = Vec::new();
        write_tidy(&rows, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.starts_with("geoid,year,variable,value,partial\n"));
        assert!(text.contains("a,2020,pop,100,false"));
        assert!(text.contains("b,2020,pop,,true"));
    }

    #[test]
    fn comparison_csv_headers_carry_periods() {
        let rows = vec![ComparisonRow {
            geoid: "a".to_string(),
            changes: BTreeMap::from([("pop".to_string(), VariableChange {
                base: Some(100.0),
                comparison: Some(150.0),
                change: Some(50.0),
                percent_change: Some(50.0),
            })]),
        }];

        let mut buffer = Vec::new();
        write_comparison(&rows, 2010, 2020, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.starts_with("geoid,pop_2010,pop_2020,pop_change,pop_pct_change\n"));
        assert!(text.contains("a,100,150,50,50"));
    }
}
