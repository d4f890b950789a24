//! The bridge network and its global tick

use crate::edge::Edge;
use rand::seq::SliceRandom;
use rand::Rng;
use spansim_core::{Error, MacAddr, Result, StpConfig, Tick};
use spansim_stp::{Bridge, Outbound, PeerInfo, PortHandle, PortState};
use tracing::{debug, info};

/// Default bound on a convergence run, in ticks.
pub const DEFAULT_TICK_LIMIT: Tick = 10_000;

/// A set of bridges interconnected by point-to-point links.
///
/// Bridges are indexed by insertion order and never removed, so the
/// [`PortHandle`] space stays stable across edits; a deleted bridge is
/// one whose ports are all administratively disabled.
#[derive(Debug)]
pub struct Topology {
    bridges: Vec<Bridge>,
    edges: Vec<Edge>,
    config: StpConfig,
    tick_limit: Tick,
}

impl Topology {
    pub fn new(config: StpConfig) -> Self {
        Self {
            bridges: Vec::new(),
            edges: Vec::new(),
            config,
            tick_limit: DEFAULT_TICK_LIMIT,
        }
    }

    /// Replace the convergence-run tick bound.
    pub fn with_tick_limit(mut self, limit: Tick) -> Self {
        self.tick_limit = limit;
        self
    }

    pub fn config(&self) -> &StpConfig {
        &self.config
    }

    pub fn bridges(&self) -> &[Bridge] {
        &self.bridges
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Edges in stable display order, sorted by bridge MAC.
    pub fn sorted_edges(&self) -> Vec<&Edge> {
        let mut edges: Vec<&Edge> = self.edges.iter().collect();
        edges.sort_by_key(|e| e.sort_key());
        edges
    }

    /// Find a bridge by MAC.
    pub fn find_bridge(&self, mac: MacAddr) -> Option<&Bridge> {
        self.bridges.iter().find(|b| b.mac() == mac)
    }

    fn find_index(&self, mac: MacAddr) -> Option<usize> {
        self.bridges.iter().position(|b| b.mac() == mac)
    }

    /// Get or create the bridge with the given MAC; unknown bridges are
    /// created on first appearance.
    pub fn add_bridge(&mut self, mac: MacAddr) -> usize {
        if let Some(index) = self.find_index(mac) {
            return index;
        }
        debug!(bridge = %mac, "adding bridge");
        self.bridges.push(Bridge::new(mac, self.config));
        self.bridges.len() - 1
    }

    /// Wire two bridge ports together. Unknown bridges are created;
    /// self-loops, duplicate links between a bridge pair, and ports
    /// already in use are rejected.
    pub fn add_link(
        &mut self,
        origin: MacAddr,
        origin_port: usize,
        target: MacAddr,
        target_port: usize,
    ) -> Result<()> {
        let origin_index = self.add_bridge(origin);
        let target_index = self.add_bridge(target);

        if origin == target {
            return Err(Error::topology(format!("{origin} cannot link to itself")));
        }
        let edge = Edge::new(origin, origin_port, target, target_port);
        if self.edges.contains(&edge) {
            return Err(Error::topology(format!(
                "link between {origin} and {target} already exists"
            )));
        }
        for (index, port) in [(origin_index, origin_port), (target_index, target_port)] {
            if self.bridges[index]
                .port(port)
                .is_some_and(|p| p.is_connected())
            {
                return Err(Error::topology(format!(
                    "port {port} on {} is already in use",
                    self.bridges[index].mac()
                )));
            }
        }

        self.bridges[origin_index].attach_port(
            origin_port,
            PortHandle {
                bridge: target_index,
                port: target_port,
            },
        );
        self.bridges[target_index].attach_port(
            target_port,
            PortHandle {
                bridge: origin_index,
                port: origin_port,
            },
        );
        debug!(%edge, "link added");
        self.edges.push(edge);
        Ok(())
    }

    /// Administratively remove a link: both endpoint ports go down.
    pub fn delete_link(&mut self, mac: MacAddr, port: usize) -> Result<()> {
        let index = self
            .find_index(mac)
            .ok_or_else(|| Error::BridgeNotFound(mac.to_string()))?;
        let peer = self.bridges[index]
            .port(port)
            .and_then(|p| p.peer())
            .ok_or_else(|| Error::topology(format!("port {port} on {mac} has no link")))?;

        self.bridges[index].disable_port(port);
        if let Some(bridge) = self.bridges.get_mut(peer.bridge) {
            bridge.disable_port(peer.port);
        }
        self.edges.retain(|e| !e.touches(mac, port));
        debug!(bridge = %mac, port, "link deleted");
        Ok(())
    }

    /// Administratively remove a bridge: every one of its ports goes
    /// down. Surviving link partners notice the dead peer on their own.
    pub fn delete_bridge(&mut self, mac: MacAddr) -> Result<()> {
        let index = self
            .find_index(mac)
            .ok_or_else(|| Error::BridgeNotFound(mac.to_string()))?;
        for port in 0..self.bridges[index].ports().len() {
            self.bridges[index].disable_port(port);
        }
        self.edges.retain(|e| !e.touches_bridge(mac));
        debug!(bridge = %mac, "bridge deleted");
        Ok(())
    }

    /// Break a live link mid-run, without the re-run refresh: the far
    /// end loses its peer reference, the near end goes down and floods
    /// TCNs. Reconvergence happens in-protocol.
    pub fn break_link(&mut self, mac: MacAddr, port: usize) -> Result<()> {
        let index = self
            .find_index(mac)
            .ok_or_else(|| Error::BridgeNotFound(mac.to_string()))?;
        let peer = self.bridges[index]
            .port(port)
            .and_then(|p| p.peer())
            .ok_or_else(|| Error::topology(format!("port {port} on {mac} has no link")))?;

        self.bridges[index].break_link(port)?;
        if let Some(bridge) = self.bridges.get_mut(peer.bridge) {
            bridge.detach_port(peer.port);
        }
        self.edges.retain(|e| !e.touches(mac, port));
        info!(bridge = %mac, port, "link broken");
        Ok(())
    }

    /// Break one randomly chosen live link. Returns which port went
    /// down, or an error if the topology has no live links.
    pub fn break_random_link<R: Rng>(&mut self, rng: &mut R) -> Result<(MacAddr, usize)> {
        let live: Vec<(MacAddr, usize)> = self
            .bridges
            .iter()
            .flat_map(|b| {
                b.ports()
                    .iter()
                    .filter(|p| p.is_connected() && p.state() != PortState::Disabled)
                    .map(|p| (b.mac(), p.index()))
            })
            .collect();
        let (mac, port) = *live
            .choose(rng)
            .ok_or_else(|| Error::topology("no live links to break"))?;
        self.break_link(mac, port)?;
        Ok((mac, port))
    }

    /// Advance the whole network one tick: a global emit phase with
    /// delivery, then a global drain/process phase against peer
    /// snapshots taken at the phase boundary. Every frame emitted in a
    /// tick is observed in the same tick, regardless of bridge order.
    pub fn tick_all(&mut self) {
        let mut frames: Vec<Outbound> = Vec::new();
        for bridge in &mut self.bridges {
            frames.extend(bridge.emit());
        }
        for frame in frames {
            self.deliver(frame);
        }

        let snapshots: Vec<Vec<Option<PeerInfo>>> = self
            .bridges
            .iter()
            .map(|bridge| {
                bridge
                    .ports()
                    .iter()
                    .map(|port| port.peer().and_then(|h| self.peer_info(h)))
                    .collect()
            })
            .collect();

        for (index, bridge) in self.bridges.iter_mut().enumerate() {
            bridge.process(&snapshots[index]);
        }
    }

    fn peer_info(&self, handle: PortHandle) -> Option<PeerInfo> {
        let port = self.bridges.get(handle.bridge)?.port(handle.port)?;
        Some(PeerInfo {
            state: port.state(),
            role: port.role(),
        })
    }

    fn deliver(&mut self, frame: Outbound) {
        if let Some(bridge) = self.bridges.get_mut(frame.to.bridge) {
            bridge.deliver(frame.to.port, frame.bpdu);
        }
    }

    /// True iff every bridge reports converged.
    pub fn all_converged(&self) -> bool {
        self.bridges.iter().all(|b| b.is_converged())
    }

    /// Reset every bridge to power-up state and tick until the network
    /// converges. Returns the number of ticks taken.
    pub fn run(&mut self) -> Result<Tick> {
        for bridge in &mut self.bridges {
            bridge.refresh();
        }
        let ticks = self.settle()?;
        info!(ticks, bridges = self.bridges.len(), "topology converged");
        Ok(ticks)
    }

    /// Tick the live network, without any reset, until it converges.
    /// This is the reconvergence path after a mid-run link break.
    pub fn settle(&mut self) -> Result<Tick> {
        let mut ticks: Tick = 0;
        loop {
            self.tick_all();
            ticks += 1;
            if self.all_converged() {
                return Ok(ticks);
            }
            if ticks >= self.tick_limit {
                return Err(Error::Convergence(self.tick_limit));
            }
        }
    }
}
