#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for census time-series collection.
//!
//! Wires the Census Data API and `TIGERweb` clients into the
//! reconciliation engine and prints results as CSV on stdout.
//! Conservation warnings and geometry issues go to stderr via `log`.

mod output;
mod variables;

use std::collections::BTreeSet;

use census_atlas_attributes::CensusApiClient;
use census_atlas_attributes_models::{CensusConfig, Dataset, GeographyFilters};
use census_atlas_geography::TigerClient;
use census_atlas_geography_models::{GeographyLevel, fips};
use census_atlas_reconcile::{AlignRequest, align, compare};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "census-atlas",
    about = "Census time series with boundary reconciliation"
)]
struct Cli {
    /// Census Data API key (optional for low request volumes)
    #[arg(long, env = "CENSUS_API_KEY", global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Request arguments shared by both subcommands.
#[derive(Args)]
struct SeriesArgs {
    /// Geography level (state, county, tract, `block_group`, ...)
    #[arg(long)]
    geography: GeographyLevel,

    /// Comma-separated years to collect (e.g. "2010,2020")
    #[arg(long, value_delimiter = ',', required = true)]
    years: Vec<u16>,

    /// Variables as name=CODE, or per-year name=YEAR:CODE;YEAR:CODE
    /// (e.g. "pop=B01003_001E" or "pop=2010:P001001;2020:P1_001N")
    #[arg(long, value_delimiter = ',', required = true)]
    variables: Vec<String>,

    /// Dataset: acs5, acs1, or decennial
    #[arg(long, default_value = "acs5")]
    dataset: Dataset,

    /// Year whose boundaries everything is reconciled onto
    /// (default: most recent requested year)
    #[arg(long)]
    base_year: Option<u16>,

    /// Comma-separated names of additive (count/total) variables
    #[arg(long, value_delimiter = ',')]
    extensive: Vec<String>,

    /// State filter, as FIPS code or postal abbreviation
    #[arg(long)]
    state: Option<String>,

    /// County FIPS filter (requires --state)
    #[arg(long)]
    county: Option<String>,

    /// Treat classification and geometry problems as errors
    #[arg(long)]
    strict: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect a multi-year series reconciled onto one boundary vintage
    Series {
        #[command(flatten)]
        args: SeriesArgs,

        /// Output shape: tidy or wide
        #[arg(long, default_value = "tidy")]
        output: String,
    },
    /// Collect a series, then compare two periods per unit
    Compare {
        #[command(flatten)]
        args: SeriesArgs,

        /// Earlier period to compare from
        #[arg(long)]
        base_period: u16,

        /// Later period to compare against
        #[arg(long)]
        comparison_period: u16,
    },
}

impl SeriesArgs {
    fn into_request(self) -> Result<AlignRequest, Box<dyn std::error::Error>> {
        let mut filters = GeographyFilters::default();
        if let Some(state) = &self.state {
            let resolved = fips::state_fips(state)
                .ok_or_else(|| format!("Unknown state '{state}'"))?;
            filters.state = Some(resolved.to_string());
        }
        if let Some(county) = self.county {
            if filters.state.is_none() {
                return Err("--county requires --state".into());
            }
            filters.county = Some(county);
        }

        let mut request = AlignRequest::new(
            self.geography,
            self.years,
            variables::parse_variables(&self.variables)?,
            self.dataset,
        );
        request.base_year = self.base_year;
        request.extensive = self.extensive.into_iter().collect();
        request.filters = filters;
        request.strict = self.strict;
        Ok(request)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let config = CensusConfig {
        api_key: cli.api_key,
    };
    let attributes = CensusApiClient::new(config)?;
    let geometry = TigerClient::new()?;

    match cli.command {
        Commands::Series { args, output } => {
            let request = args.into_request()?;
            let series = align(&request, &attributes, &geometry).await?;
            report_diagnostics(&series);

            match output.as_str() {
                "wide" => output::write_wide(
                    &census_atlas_format::to_wide(&series.table),
                    std::io::stdout(),
                )?,
                "tidy" => output::write_tidy(
                    &census_atlas_format::to_tidy(&series.table),
                    std::io::stdout(),
                )?,
                other => return Err(format!("Unknown output shape '{other}'").into()),
            }
        }
        Commands::Compare {
            args,
            base_period,
            comparison_period,
        } => {
            let variable_names: BTreeSet<String> =
                variables::parse_variables(&args.variables)?.logical_names();
            let request = args.into_request()?;
            let series = align(&request, &attributes, &geometry).await?;
            report_diagnostics(&series);

            let rows = compare(
                &series.table,
                base_period,
                comparison_period,
                Some(&variable_names),
                true,
                true,
            )?;
            output::write_comparison(&rows, base_period, comparison_period, std::io::stdout())?;
        }
    }

    Ok(())
}

/// Logs conservation warnings and geometry issues collected during
/// alignment.
fn report_diagnostics(series: &census_atlas_reconcile::AlignedSeries) {
    for warning in &series.warnings {
        log::warn!(
            "Total for '{}' in {} changed during redistribution: {} -> {} ({:.2}% off)",
            warning.variable,
            warning.year,
            warning.source_total,
            warning.target_total,
            warning.relative_error * 100.0
        );
    }
    for issue in &series.issues {
        log::warn!("Geometry issue: {issue:?}");
    }
}
