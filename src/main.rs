//! Hybrid balancer entry point: CLI wiring and config-driven balancer construction.

mod cli;

use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use hybrid_balancer::AllocationResult;
use hybrid_balancer::balance::Balancer;
use hybrid_balancer::config::SiteConfig;
use hybrid_balancer::io::export::export_csv;
use hybrid_balancer::io::snapshot::write_snapshot;

use cli::Cli;

fn print_result(result: &AllocationResult) {
    match serde_json::to_string_pretty(result) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("error: failed to serialize result: {e}"),
    }
    let cost = result
        .cost_estimate_uah_per_hour()
        .map_or_else(|| "n/a".to_string(), |c| format!("{c:.2} UAH/h"));
    let renewable = result
        .renewable_percent()
        .map_or_else(|| "n/a".to_string(), |p| format!("{p:.1}%"));
    println!(
        "Deficit: {:.1}W | Cost: {cost} | Renewable: {renewable}",
        result.deficit_w
    );
}

fn load_config(cli: &Cli) -> SiteConfig {
    // --config takes priority, then --preset, then baseline default
    let loaded = if let Some(ref path) = cli.config {
        SiteConfig::from_toml_file(path)
    } else if let Some(ref name) = cli.preset {
        SiteConfig::from_preset(name)
    } else {
        Ok(SiteConfig::baseline())
    };
    match loaded {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("hybrid_balancer=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut site = load_config(&cli);

    if let Some(seed) = cli.seed {
        site.balancer.seed = seed;
    }
    if let Some(ref strategy) = cli.strategy {
        site.balancer.strategy.clone_from(strategy);
    }

    let errors = site.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let mut balancer = match Balancer::from_config(&site) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    if cli.compare {
        match balancer.compare(None, cli.hour_for_cycle(0)) {
            Ok(results) => results.iter().for_each(print_result),
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else {
        for cycle in 0..cli.cycles {
            match balancer.balance_at(None, cli.hour_for_cycle(cycle)) {
                Ok(result) => print_result(&result),
                Err(e) => {
                    eprintln!("{e}");
                    process::exit(1);
                }
            }
        }
        if let Some(summary) = balancer.last_summary() {
            println!("\n{summary}");
        }
    }

    if let Some(ref path) = cli.csv_out {
        if let Err(e) = export_csv(balancer.log().iter(), path) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("History written to {}", path.display());
    }

    if let Some(ref path) = cli.snapshot_out {
        if let Err(e) = write_snapshot(&balancer.snapshot(), path) {
            eprintln!("error: failed to write snapshot: {e}");
            process::exit(1);
        }
        eprintln!("Snapshot written to {}", path.display());
    }
}
