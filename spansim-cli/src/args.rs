//! CLI argument parsing

use clap::Parser;
use spansim_core::{Error, Result};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "spansim")]
#[command(version, about = "IEEE 802.1D Spanning Tree Protocol simulator", long_about = None)]
pub struct Cli {
    /// Topology file; with a second argument, the number of switches
    /// for a random topology instead
    pub topology: String,

    /// Number of random links to place between the switches
    pub links: Option<usize>,

    /// Seed for random topology construction
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Verbose output (-v, -vv for increasing verbosity)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// What the positional arguments ask for.
#[derive(Debug, PartialEq, Eq)]
pub enum Mode {
    /// Build the topology from a link file
    File(PathBuf),
    /// Build a random topology of the given size
    Random { switches: usize, links: usize },
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn mode(&self) -> Result<Mode> {
        match self.links {
            None => Ok(Mode::File(PathBuf::from(&self.topology))),
            Some(links) => {
                let switches = self.topology.parse::<usize>().map_err(|_| {
                    Error::parse(format!(
                        "'{}' is not a switch count; usage: spansim <switches> <links>",
                        self.topology
                    ))
                })?;
                Ok(Mode::Random { switches, links })
            }
        }
    }
}
