//! Converged-state report
//!
//! Prints the observable state vector: per bridge its identity, root
//! claim, clock, each interface's role and state, and the learned MAC
//! table.

use spansim_stp::PortRole;
use spansim_topology::Topology;

/// Print the link list, sorted by bridge MAC for easier reading.
pub fn print_links(topo: &Topology) {
    println!("Links in the topology (sorted by bridge MAC)");
    for (i, edge) in topo.sorted_edges().iter().enumerate() {
        println!("{}. {edge}", i + 1);
    }
    println!("Done with topology construction.");
    println!("Converging...");
}

/// Print the per-bridge state after convergence.
pub fn print_bridges(topo: &Topology) {
    for bridge in topo.bridges() {
        println!("Bridge ID: {}", bridge.mac());
        if bridge.is_root() {
            println!("I am the Root Bridge");
        }
        println!("Time: {}", bridge.clock());
        println!("Port\tRole\t\tState");
        for port in bridge.ports() {
            println!("{}\t{}\t{}", port.index(), port.role(), port.state());
            if port.role() == PortRole::Root {
                println!("\tCost: {}", bridge.root_path_cost());
            }
        }

        let learned: Vec<(usize, String)> = bridge
            .mac_table()
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|mac| (i, mac.to_string())))
            .collect();
        if !learned.is_empty() {
            println!("MAC address table:");
            for (index, mac) in learned {
                println!("\tport {index}: {mac}");
            }
        }
        println!();
    }
}
