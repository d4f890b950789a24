//! Topology input files
//!
//! One link per line, whitespace-separated:
//!
//! ```text
//! BRIDGE_A  PORT_A  BRIDGE_B  PORT_B
//! ```
//!
//! Bridge tokens are dotted MACs (`0001.0001.0001`); unknown bridges
//! are created on first appearance. Malformed lines and rejected links
//! are reported and skipped; an unreadable file is fatal.

use spansim_core::{Error, MacAddr, Result, StpConfig};
use spansim_topology::Topology;
use std::fs;
use std::path::Path;
use tracing::warn;

/// One parsed link line.
pub type LinkSpec = (MacAddr, usize, MacAddr, usize);

/// Read a topology file and build the network it describes.
pub fn load(path: &Path, config: StpConfig) -> Result<Topology> {
    let content = fs::read_to_string(path)?;
    let mut topo = Topology::new(config);

    for (number, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok((origin, origin_port, target, target_port)) => {
                if let Err(error) = topo.add_link(origin, origin_port, target, target_port) {
                    warn!(line = number + 1, %error, "link rejected");
                }
            }
            Err(error) => warn!(line = number + 1, %error, "line skipped"),
        }
    }
    Ok(topo)
}

/// Parse a `BRIDGE_A PORT_A BRIDGE_B PORT_B` line.
pub fn parse_line(line: &str) -> Result<LinkSpec> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let &[origin, origin_port, target, target_port] = tokens.as_slice() else {
        return Err(Error::parse(format!(
            "expected 'bridge1 port1 bridge2 port2', got '{line}'"
        )));
    };

    Ok((
        origin.parse::<MacAddr>()?,
        parse_port(origin_port)?,
        target.parse::<MacAddr>()?,
        parse_port(target_port)?,
    ))
}

fn parse_port(token: &str) -> Result<usize> {
    token
        .parse::<usize>()
        .map_err(|_| Error::parse(format!("'{token}' is not a port number")))
}
