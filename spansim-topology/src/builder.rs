//! Random topology construction
//!
//! Builds a connected-ish random graph of the requested size by drawing
//! bridge MACs and link endpoints from a seeded RNG, so a given seed
//! always produces the same topology.

use crate::topology::Topology;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spansim_core::{Error, MacAddr, Result, StpConfig};
use tracing::debug;

/// Build a topology of `switches` bridges and `links` random links.
///
/// Links are drawn between distinct bridge pairs; each bridge uses its
/// next free interface index for every new link. At most one link may
/// exist between any pair, so `links` is bounded by `n * (n - 1) / 2`.
pub fn random_topology(
    switches: usize,
    links: usize,
    seed: u64,
    config: StpConfig,
) -> Result<Topology> {
    if switches == 0 {
        return Err(Error::topology("a topology needs at least one switch"));
    }
    let max_links = switches * switches.saturating_sub(1) / 2;
    if links > max_links {
        return Err(Error::topology(format!(
            "{links} links do not fit between {switches} switches (max {max_links})"
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut topo = Topology::new(config);

    let mut macs: Vec<MacAddr> = Vec::with_capacity(switches);
    while macs.len() < switches {
        let mac = MacAddr::new(rng.gen());
        if macs.contains(&mac) {
            continue;
        }
        topo.add_bridge(mac);
        macs.push(mac);
    }

    let mut placed = 0;
    while placed < links {
        let a = macs[rng.gen_range(0..macs.len())];
        let b = macs[rng.gen_range(0..macs.len())];
        let port_a = topo.find_bridge(a).map(|br| br.ports().len()).unwrap_or(0);
        let port_b = topo.find_bridge(b).map(|br| br.ports().len()).unwrap_or(0);
        if a == b {
            continue;
        }
        if topo.add_link(a, port_a, b, port_b).is_ok() {
            placed += 1;
        }
    }

    debug!(switches, links, seed, "random topology built");
    Ok(topo)
}
