//! Interactive topology editing
//!
//! After the initial convergence the simulator offers a five-item menu
//! on stdin. Every edit except exit reprints the link list and re-runs
//! the simulation until the network converges again. Rejected edits are
//! reported and dropped; the menu comes back either way.

use crate::{report, topofile};
use spansim_core::{Error, MacAddr, Result};
use spansim_topology::Topology;
use std::io::{self, BufRead, Write};

const MENU: &str = "[1]Add Link\n[2]Add Node\n[3]Delete Link\n[4]Delete Node\n[5]Exit";

/// Run the edit loop until the user exits. Returns an error only for
/// unreadable input; bad commands just come back to the menu.
pub fn interactive(topo: &mut Topology) -> Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        println!("{MENU}");
        prompt("Enter command: ")?;
        let choice = read_line(&mut lines)?;

        let edited = match choice.trim() {
            "1" => add_link(topo, &mut lines)?,
            "2" => add_node(topo, &mut lines)?,
            "3" => delete_link(topo, &mut lines)?,
            "4" => delete_node(topo, &mut lines)?,
            "5" => return Ok(()),
            other => {
                println!("Unrecognized command '{other}'");
                false
            }
        };

        if edited {
            report::print_links(topo);
            match topo.run() {
                Ok(ticks) => {
                    println!("Converged after {ticks} ticks.\n");
                    report::print_bridges(topo);
                }
                Err(error) => return Err(error),
            }
        }
    }
}

fn add_link(
    topo: &mut Topology,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> Result<bool> {
    println!("   Format: bridge1 port1 bridge2 port2");
    prompt("   Bridge to edit: ")?;
    let input = read_line(lines)?;
    match topofile::parse_line(&input) {
        Ok((origin, origin_port, target, target_port)) => {
            apply(topo.add_link(origin, origin_port, target, target_port))
        }
        Err(error) => {
            println!("{error}");
            Ok(false)
        }
    }
}

/// Add node accepts either a bare bridge token, or a full link line
/// wiring the new bridge in directly.
fn add_node(
    topo: &mut Topology,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> Result<bool> {
    println!("   Format: bridge  (or: bridge1 port1 bridge2 port2)");
    prompt("   Bridge to add: ")?;
    let input = read_line(lines)?;
    let tokens: Vec<&str> = input.split_whitespace().collect();

    if tokens.len() == 1 {
        match tokens[0].parse::<MacAddr>() {
            Ok(mac) => {
                topo.add_bridge(mac);
                Ok(true)
            }
            Err(error) => {
                println!("{error}");
                Ok(false)
            }
        }
    } else {
        match topofile::parse_line(&input) {
            Ok((origin, origin_port, target, target_port)) => {
                apply(topo.add_link(origin, origin_port, target, target_port))
            }
            Err(error) => {
                println!("{error}");
                Ok(false)
            }
        }
    }
}

fn delete_link(
    topo: &mut Topology,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> Result<bool> {
    println!("   Format: bridge port");
    prompt("   Bridge to edit: ")?;
    let input = read_line(lines)?;
    let tokens: Vec<&str> = input.split_whitespace().collect();
    let &[bridge, port] = tokens.as_slice() else {
        println!("Expected 'bridge port', got '{input}'");
        return Ok(false);
    };

    match (bridge.parse::<MacAddr>(), port.parse::<usize>()) {
        (Ok(mac), Ok(index)) => apply(topo.delete_link(mac, index)),
        (Err(error), _) => {
            println!("{error}");
            Ok(false)
        }
        (_, Err(_)) => {
            println!("'{port}' is not a port number");
            Ok(false)
        }
    }
}

fn delete_node(
    topo: &mut Topology,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> Result<bool> {
    prompt("   Bridge to delete: ")?;
    let input = read_line(lines)?;
    match input.trim().parse::<MacAddr>() {
        Ok(mac) => apply(topo.delete_bridge(mac)),
        Err(error) => {
            println!("{error}");
            Ok(false)
        }
    }
}

/// A rejected edit is reported and dropped; the simulation only re-runs
/// after an applied one.
fn apply(result: Result<()>) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(error) => {
            println!("{error}");
            Ok(false)
        }
    }
}

fn prompt(text: &str) -> Result<()> {
    print!("{text}");
    io::stdout().flush()?;
    Ok(())
}

fn read_line(lines: &mut impl Iterator<Item = io::Result<String>>) -> Result<String> {
    match lines.next() {
        Some(Ok(line)) => Ok(line),
        Some(Err(error)) => Err(Error::Io(error)),
        None => Err(Error::parse("end of input")),
    }
}
