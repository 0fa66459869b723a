//! Command-line arguments for the `hybrid-balancer` binary.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "hybrid-balancer")]
#[command(author, version, about = "Hybrid energy balancer")]
#[command(
    long_about = "Distributes a site's power demand across grid, solar, wind and battery sources.\n\
    \nEach cycle samples the generation estimators, runs the selected strategy and prints\n\
    the allocation as JSON.\n\
    \nExamples:\n  \
    hybrid-balancer                                   # one cycle, baseline site, current hour\n  \
    hybrid-balancer --preset off_grid_cabin --hour 0 --cycles 24\n  \
    hybrid-balancer --compare --hour 12               # all strategies on one sample"
)]
pub struct Cli {
    /// Load the site from a TOML file
    #[arg(long, value_name = "PATH", conflicts_with = "preset")]
    pub config: Option<PathBuf>,

    /// Use a built-in preset (baseline, off_grid_cabin, grid_backup)
    #[arg(long, value_name = "NAME")]
    pub preset: Option<String>,

    /// Override the configured strategy (GRID_PRIORITY, RENEWABLE_FIRST, OFF_GRID)
    #[arg(long)]
    pub strategy: Option<String>,

    /// Hour of day for the first cycle; advances by one per cycle
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..24))]
    pub hour: Option<u32>,

    /// Number of allocation cycles to run
    #[arg(long, default_value_t = 1)]
    pub cycles: usize,

    /// Override the wind estimator seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Run every strategy on one generation sample instead of cycling
    #[arg(long)]
    pub compare: bool,

    /// Export the rolling log to CSV
    #[arg(long, value_name = "PATH")]
    pub csv_out: Option<PathBuf>,

    /// Write a dashboard snapshot (JSON) after the run
    #[arg(long, value_name = "PATH")]
    pub snapshot_out: Option<PathBuf>,
}

impl Cli {
    /// Hour for the given cycle, or `None` to use the wall clock.
    pub fn hour_for_cycle(&self, cycle: usize) -> Option<u32> {
        self.hour.map(|h| (h + (cycle % 24) as u32) % 24)
    }
}
