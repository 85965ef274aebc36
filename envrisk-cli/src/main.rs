//! Command line consumer that runs one aggregation and prints a report.
//!
//! The engine itself never writes to stdout; all reporting happens here.

#![allow(
    clippy::print_stdout,
    reason = "command line reporting tool writes its output to stdout"
)]

use std::env;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use envrisk_core::{AggregationResult, Location, RiskAggregator, SourceRegistry};
use reqwest::Client;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let (location, as_json) = parse_args(&args)?;

    // HTTP + service setup
    let client = Client::builder().user_agent("envrisk/0.1").build()?;

    let plugins = vec![
        envrisk_source_sems::plugin(client.clone()),
        envrisk_source_lust::plugin(client.clone()),
        envrisk_source_tri::plugin(client.clone()),
        envrisk_source_sdwis::plugin(client),
    ];
    let registry = Arc::new(SourceRegistry::new(plugins));
    let aggregator = RiskAggregator::new(registry);

    let result = aggregator.run(&location).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_report(&result);
    }

    Ok(())
}

fn parse_args(args: &[String]) -> Result<(Location, bool)> {
    let mut as_json = false;
    let mut positional = Vec::new();

    for arg in args {
        if arg == "--json" {
            as_json = true;
        } else {
            positional.push(arg.clone());
        }
    }

    let (Some(latitude), Some(longitude)) = (positional.first(), positional.get(1)) else {
        bail!("usage: envrisk <latitude> <longitude> [STATE] [ZIP] [--json]");
    };

    let latitude: f64 = latitude
        .parse()
        .with_context(|| format!("latitude {latitude:?} is not a number"))?;
    let longitude: f64 = longitude
        .parse()
        .with_context(|| format!("longitude {longitude:?} is not a number"))?;

    let mut location = Location::new(latitude, longitude);
    location.state = positional.get(2).cloned();
    location.zip = positional.get(3).cloned();

    Ok((location, as_json))
}

fn print_report(result: &AggregationResult) {
    println!("Contaminated sites ({}):", result.contamination_sites.len());
    for site in &result.contamination_sites {
        println!(
            "  [{}] {} — {:.2} mi — {}",
            site.risk_level, site.name, site.distance_miles, site.status
        );
    }

    println!("Toxic release facilities ({}):", result.toxic_facilities.len());
    for site in &result.toxic_facilities {
        let chemicals = if site.contaminants.is_empty() {
            String::new()
        } else {
            format!(" — {}", site.contaminants.join(", "))
        };
        println!(
            "  [{}] {} — {:.2} mi{}",
            site.risk_level, site.name, site.distance_miles, chemicals
        );
    }

    println!("Water violations ({}):", result.water_violations.len());
    for violation in &result.water_violations {
        println!(
            "  [{}] {} — {} — {} ({})",
            violation.risk_level,
            violation.system_name,
            violation.contaminant,
            violation.violation_type,
            violation.violation_date
        );
    }

    if !result.errors.is_empty() {
        println!("Sources with errors:");
        for error in &result.errors {
            println!("  {error}");
        }
    }

    println!("Completed at {}", result.completed_at.to_rfc3339());
}
