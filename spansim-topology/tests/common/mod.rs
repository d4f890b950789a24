//! Shared assertions for the scenario tests: the STP invariants every
//! converged topology must satisfy.

use spansim_core::MacAddr;
use spansim_stp::{Port, PortRole, PortState};
use spansim_topology::Topology;

pub fn mac(s: &str) -> MacAddr {
    s.parse().unwrap()
}

pub fn port<'a>(topo: &'a Topology, bridge: &str, index: usize) -> &'a Port {
    topo.find_bridge(mac(bridge))
        .unwrap_or_else(|| panic!("no bridge {bridge}"))
        .port(index)
        .unwrap_or_else(|| panic!("no port {index} on {bridge}"))
}

pub fn count_blocking(topo: &Topology) -> usize {
    topo.bridges()
        .iter()
        .flat_map(|b| b.ports())
        .filter(|p| p.state() == PortState::Blocking)
        .count()
}

fn index_of(topo: &Topology, m: MacAddr) -> usize {
    topo.bridges()
        .iter()
        .position(|b| b.mac() == m)
        .expect("edge references a known bridge")
}

fn is_active(topo: &Topology, index: usize) -> bool {
    topo.bridges()[index]
        .ports()
        .iter()
        .any(|p| p.state() != PortState::Disabled)
}

/// Links whose both endpoint ports are Forwarding, as bridge-index pairs.
pub fn forwarding_links(topo: &Topology) -> Vec<(usize, usize)> {
    topo.edges()
        .iter()
        .filter_map(|edge| {
            let a = topo.find_bridge(edge.origin)?.port(edge.origin_port)?;
            let b = topo.find_bridge(edge.target)?.port(edge.target_port)?;
            (a.state() == PortState::Forwarding && b.state() == PortState::Forwarding)
                .then(|| (index_of(topo, edge.origin), index_of(topo, edge.target)))
        })
        .collect()
}

fn find(parent: &mut Vec<usize>, x: usize) -> usize {
    if parent[x] != x {
        let root = find(parent, parent[x]);
        parent[x] = root;
    }
    parent[x]
}

/// Per-bridge structure: a self-believed root advertises cost 0 with no
/// root port; every other active bridge has exactly one Root-role port,
/// matching its root-port handle, with a cost of its upstream bridge's
/// cost plus the link cost.
pub fn assert_bridge_invariants(topo: &Topology) {
    for (i, bridge) in topo.bridges().iter().enumerate() {
        if !is_active(topo, i) {
            continue;
        }

        let root_role: Vec<&Port> = bridge
            .ports()
            .iter()
            .filter(|p| p.role() == PortRole::Root)
            .collect();

        if bridge.is_root() {
            assert_eq!(
                bridge.root_path_cost(),
                0,
                "bridge {} believes it is root but has a path cost",
                bridge.mac()
            );
            assert!(bridge.root_port().is_none());
            assert!(root_role.is_empty());
        } else {
            assert_eq!(
                root_role.len(),
                1,
                "bridge {} must have exactly one root port",
                bridge.mac()
            );
            let index = bridge.root_port().expect("root port handle is set");
            assert_eq!(root_role[0].index(), index);

            // A root port orphaned by a far-end break keeps its role
            // until it ages out; the cost relation only binds while the
            // link stands.
            if let Some(handle) = bridge.port(index).unwrap().peer() {
                let upstream = &topo.bridges()[handle.bridge];
                assert_eq!(
                    bridge.root_path_cost(),
                    upstream.root_path_cost() + bridge.port(index).unwrap().path_cost(),
                    "bridge {} cost must be its upstream's cost plus the link",
                    bridge.mac()
                );
            }
        }
    }
}

/// Per-link structure: a link forwarding at both ends has one Designated
/// and one Root end; no end forwards while the other end is Disabled;
/// the forwarding subgraph is loop-free.
pub fn assert_link_invariants(topo: &Topology) {
    for edge in topo.edges() {
        let a = topo
            .find_bridge(edge.origin)
            .unwrap()
            .port(edge.origin_port)
            .unwrap();
        let b = topo
            .find_bridge(edge.target)
            .unwrap()
            .port(edge.target_port)
            .unwrap();

        if a.state() == PortState::Forwarding && b.state() == PortState::Forwarding {
            let roles = [a.role(), b.role()];
            assert!(
                roles.contains(&PortRole::Designated) && roles.contains(&PortRole::Root),
                "link {edge}: a forwarding link needs one designated and one root end"
            );
        }
        if a.state() == PortState::Disabled || b.state() == PortState::Disabled {
            assert!(
                a.state() != PortState::Forwarding && b.state() != PortState::Forwarding,
                "link {edge}: no end may forward into a disabled link"
            );
        }
    }

    let mut parent: Vec<usize> = (0..topo.bridges().len()).collect();
    for (a, b) in forwarding_links(topo) {
        let (ra, rb) = (find(&mut parent, a), find(&mut parent, b));
        assert_ne!(ra, rb, "forwarding links close a loop");
        parent[ra] = rb;
    }
}

/// Every bridge in a linked component agrees on the same root, and it
/// is the smallest Bridge ID of the component.
pub fn assert_root_agreement(topo: &Topology) {
    let n = topo.bridges().len();
    let mut parent: Vec<usize> = (0..n).collect();
    for edge in topo.edges() {
        let (a, b) = (index_of(topo, edge.origin), index_of(topo, edge.target));
        let (ra, rb) = (find(&mut parent, a), find(&mut parent, b));
        if ra != rb {
            parent[ra] = rb;
        }
    }

    for i in 0..n {
        if !is_active(topo, i) {
            continue;
        }
        let component = find(&mut parent, i);
        let best = (0..n)
            .filter(|&j| find(&mut parent, j) == component && is_active(topo, j))
            .map(|j| topo.bridges()[j].bridge_id())
            .min()
            .unwrap();
        assert_eq!(
            topo.bridges()[i].root_id(),
            best,
            "bridge {} must agree on its component's best root",
            topo.bridges()[i].mac()
        );
    }
}

/// The full battery for a converged single-component topology whose
/// root is `expected_root`.
pub fn assert_stp_invariants(topo: &Topology, expected_root: &str) {
    assert!(topo.all_converged(), "topology must be converged");

    let root_id = topo
        .find_bridge(mac(expected_root))
        .expect("expected root exists")
        .bridge_id();
    for (i, bridge) in topo.bridges().iter().enumerate() {
        if is_active(topo, i) {
            assert_eq!(
                bridge.root_id(),
                root_id,
                "bridge {} disagrees about the root",
                bridge.mac()
            );
        }
    }

    assert_bridge_invariants(topo);
    assert_link_invariants(topo);
}
