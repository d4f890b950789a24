//! Spanning Tree Protocol simulator CLI
//!
//! Builds a bridge topology from a link file (or at random), runs STP
//! until every port settles into forwarding or blocking, prints the
//! per-bridge state, and then takes interactive topology edits:
//!
//! ```bash
//! # Converge the topology described in a file
//! spansim topology.txt
//!
//! # Build and converge a random topology of 8 switches and 12 links
//! spansim 8 12 --seed 7
//! ```

mod args;
mod repl;
mod report;
mod topofile;

use args::{Cli, Mode};
use spansim_core::{Result, StpConfig};
use spansim_topology::{random_topology, Topology};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse_args();

    let default_filter = match cli.verbose {
        0 => "warn,spansim_topology=info",
        1 => "info,spansim_stp=debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    if let Err(error) = run(cli) {
        eprintln!("{error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = StpConfig::default();
    let mut topo: Topology = match cli.mode()? {
        Mode::File(path) => topofile::load(&path, config)?,
        Mode::Random { switches, links } => random_topology(switches, links, cli.seed, config)?,
    };

    report::print_links(&topo);
    let ticks = topo.run()?;
    println!("Converged after {ticks} ticks.\n");
    report::print_bridges(&topo);

    repl::interactive(&mut topo)
}
