//! One STP instance
//!
//! A bridge owns an ordered list of ports, its identity, its current
//! belief about the network root, and the per-tick protocol routine:
//! drain and classify whatever arrived on each interface, run the
//! elections, advance the forward-delay state machine, and emit hello
//! BPDUs when the hello interval has elapsed.
//!
//! The bridge never touches another bridge. Everything it wants sent is
//! returned from [`Bridge::emit`] as [`Outbound`] frames addressed by
//! [`PortHandle`]; the owning topology performs delivery and hands back
//! a per-port snapshot of the far end ([`PeerInfo`]) when asking the
//! bridge to process a tick. That keeps the cyclic port graph out of
//! the ownership model and makes the tick order deterministic.
//!
//! Topology change notifications are queued on the bridge and emitted
//! at the next emit phase rather than mid-processing. A frame delivered
//! during the emit phase is always drained in the same tick, so a
//! queued TCN cannot be overwritten in the one-slot receive buffer by a
//! later hello.

use crate::bpdu::{Bpdu, ConfigBpdu, TcnBpdu};
use crate::port::{Port, PortHandle, PortRole, PortState};
use spansim_core::{BridgeId, Error, MacAddr, Result, StpConfig, Tick};
use tracing::{debug, trace};

/// What a bridge may observe about the far end of one of its links: the
/// peer port's state and role as they stood at the start of the process
/// phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerInfo {
    pub state: PortState,
    pub role: PortRole,
}

/// A frame to be delivered into a peer port's receive slot.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub to: PortHandle,
    pub bpdu: Bpdu,
}

/// A layer-2 bridge running one instance of 802.1D.
#[derive(Debug)]
pub struct Bridge {
    mac: MacAddr,
    bridge_id: BridgeId,
    /// Bridge ID this bridge currently believes is the network root
    root_id: BridgeId,
    /// Cost of the path to the believed root; 0 while believing self-root
    root_path_cost: u32,
    ports: Vec<Port>,
    /// Index of the root port, if one has been elected
    root_port: Option<usize>,
    /// Learned neighbor MACs, indexed by interface
    mac_table: Vec<Option<MacAddr>>,
    /// Topology Change flag, carried in outgoing hellos
    topology_change: bool,
    /// Hellos carry the TCack flag while the clock is below this
    tc_ack_until: Tick,
    /// A TCN flood is queued for the next emit phase
    tcn_pending: bool,
    /// Port to leave out of the queued flood (where the TCN came in)
    tcn_skip: Option<usize>,
    /// Simulated local clock in ticks
    clock: Tick,
    /// Clock value of the last hello emission
    last_hello: Option<Tick>,
    converged: bool,
    config: StpConfig,
}

impl Bridge {
    /// Create a bridge that believes itself to be the root, with no
    /// ports yet.
    pub fn new(mac: MacAddr, config: StpConfig) -> Self {
        let bridge_id = BridgeId::new(config.priority, mac);
        Self {
            mac,
            bridge_id,
            root_id: bridge_id,
            root_path_cost: 0,
            ports: Vec::new(),
            root_port: None,
            mac_table: Vec::new(),
            topology_change: false,
            tc_ack_until: 0,
            tcn_pending: false,
            tcn_skip: None,
            clock: 0,
            last_hello: None,
            converged: true,
            config,
        }
    }

    pub fn mac(&self) -> MacAddr {
        self.mac
    }

    pub fn bridge_id(&self) -> BridgeId {
        self.bridge_id
    }

    pub fn root_id(&self) -> BridgeId {
        self.root_id
    }

    pub fn root_path_cost(&self) -> u32 {
        self.root_path_cost
    }

    /// Does this bridge believe it is the network root?
    pub fn is_root(&self) -> bool {
        self.root_id == self.bridge_id
    }

    pub fn root_port(&self) -> Option<usize> {
        self.root_port
    }

    pub fn clock(&self) -> Tick {
        self.clock
    }

    /// A bridge is converged when no port is in Listening or Learning.
    pub fn is_converged(&self) -> bool {
        self.converged
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn port(&self, index: usize) -> Option<&Port> {
        self.ports.get(index)
    }

    /// Learned (interface, MAC) table; `None` slots have learned nothing.
    pub fn mac_table(&self) -> &[Option<MacAddr>] {
        &self.mac_table
    }

    pub fn config(&self) -> &StpConfig {
        &self.config
    }

    /// Get the port at `index`, growing the interface list with unwired
    /// placeholders as needed.
    pub fn ensure_port(&mut self, index: usize) -> &mut Port {
        let path_cost = self.config.path_cost;
        while self.ports.len() <= index {
            let i = self.ports.len();
            self.ports.push(Port::new(i, path_cost));
        }
        &mut self.ports[index]
    }

    /// Wire the port at `index` to `peer` and bring it up.
    pub fn attach_port(&mut self, index: usize, peer: PortHandle) {
        let now = self.clock;
        self.ensure_port(index).attach(peer, now);
        self.converged = false;
    }

    /// Clear a port's peer reference without changing its state. Used by
    /// the topology when the far end of a link breaks.
    pub fn detach_port(&mut self, index: usize) {
        if let Some(port) = self.ports.get_mut(index) {
            port.detach();
        }
    }

    /// Administratively take a port down: detach and disable it.
    pub fn disable_port(&mut self, index: usize) {
        let now = self.clock;
        if self.root_port == Some(index) {
            self.root_port = None;
        }
        if let Some(port) = self.ports.get_mut(index) {
            port.detach();
            port.set_role(PortRole::Nondesignated);
            port.set_state(PortState::Disabled, now);
            port.clear_frames();
        }
    }

    /// Deposit a frame into a port's receive slot.
    pub fn deliver(&mut self, port: usize, bpdu: Bpdu) {
        if let Some(p) = self.ports.get_mut(port) {
            p.receive(bpdu);
        }
    }

    /// Reset to power-up state for a fresh simulation run: believe
    /// self-root, clock zero, connected ports Blocking, unwired ports
    /// Disabled, learned state flushed.
    pub fn refresh(&mut self) {
        self.root_id = self.bridge_id;
        self.root_path_cost = 0;
        self.root_port = None;
        self.topology_change = false;
        self.tc_ack_until = 0;
        self.tcn_pending = false;
        self.tcn_skip = None;
        self.clock = 0;
        self.last_hello = None;
        for slot in &mut self.mac_table {
            *slot = None;
        }
        for port in &mut self.ports {
            port.clear_frames();
            port.set_role(PortRole::Nondesignated);
            if port.is_connected() {
                port.set_state(PortState::Blocking, 0);
                port.mark_heard(0);
            } else {
                port.set_state(PortState::Disabled, 0);
            }
        }
        self.converged = self.compute_converged();
    }

    /// Emit phase of the tick. Performs the boot transition on the very
    /// first tick. A queued topology change flood takes the phase for
    /// itself; otherwise a Configuration BPDU goes out of every eligible
    /// port when the hello interval has elapsed.
    ///
    /// Blocking and Disabled ports never send hellos; neither does the
    /// root port, whose designated peer does the talking on that link.
    pub fn emit(&mut self) -> Vec<Outbound> {
        if self.clock == 0 {
            self.boot();
        }

        if self.tcn_pending {
            self.tcn_pending = false;
            let skip = self.tcn_skip.take();
            return self
                .ports
                .iter()
                .filter(|p| Some(p.index()) != skip && p.state() != PortState::Disabled)
                .filter_map(|p| p.peer())
                .map(|to| Outbound {
                    to,
                    bpdu: Bpdu::Tcn(TcnBpdu::new()),
                })
                .collect();
        }

        let due = self
            .last_hello
            .map_or(true, |t| self.clock - t >= self.config.hello_time);
        if !due {
            return Vec::new();
        }
        self.last_hello = Some(self.clock);

        let tc_ack = self.clock < self.tc_ack_until;
        let mut out = Vec::new();
        for port in &self.ports {
            if matches!(port.state(), PortState::Blocking | PortState::Disabled)
                || port.role() == PortRole::Root
            {
                continue;
            }
            let Some(peer) = port.peer() else {
                continue;
            };
            out.push(Outbound {
                to: peer,
                bpdu: Bpdu::Config(ConfigBpdu {
                    root_id: self.root_id,
                    root_path_cost: self.root_path_cost,
                    sender_id: self.bridge_id,
                    port_index: port.index(),
                    message_age: self.clock,
                    max_age: self.config.max_age,
                    hello_time: self.config.hello_time,
                    forward_delay: self.config.forward_delay,
                    topology_change: self.topology_change,
                    topology_change_ack: tc_ack,
                }),
            });
        }
        out
    }

    /// Process phase of the tick: drain every enabled port, apply
    /// receive processing, run the silence checks, advance the
    /// forward-delay state machine, and step the clock.
    ///
    /// `peers[i]` describes the far end of port `i` as it stood at the
    /// start of the phase.
    pub fn process(&mut self, peers: &[Option<PeerInfo>]) {
        for i in 0..self.ports.len() {
            if self.ports[i].state() == PortState::Disabled {
                continue;
            }
            let peer = peers.get(i).copied().flatten();
            match self.ports[i].drain() {
                Some(Bpdu::Config(frame)) => self.receive_config(i, frame, peer),
                Some(Bpdu::Tcn(_)) => {
                    self.ports[i].mark_heard(self.clock);
                    self.receive_tcn(i);
                }
                None => self.check_silence(i, peer),
            }
        }

        self.advance_ports();
        self.converged = self.compute_converged();
        self.clock += 1;
    }

    /// Administrative link break on port `index`: the port goes down
    /// immediately and the bridge raises a topology change.
    ///
    /// The far end's peer reference must be cleared by the caller; this
    /// bridge cannot reach it.
    pub fn break_link(&mut self, index: usize) -> Result<()> {
        match self.ports.get(index) {
            Some(port) if port.state() != PortState::Disabled && port.is_connected() => {
                debug!(bridge = %self.mac, port = index, "breaking link");
                self.fail_port(index);
                Ok(())
            }
            _ => Err(Error::topology(format!(
                "port {index} on {} is not an active link",
                self.mac
            ))),
        }
    }

    // ─── Boot ───

    /// The "root war": every enabled port enters Listening and starts
    /// advertising this bridge as root.
    fn boot(&mut self) {
        self.topology_change = false;
        self.tc_ack_until = 0;
        self.tcn_pending = false;
        self.tcn_skip = None;
        for port in &mut self.ports {
            if port.state() == PortState::Disabled {
                continue;
            }
            port.set_role(PortRole::Nondesignated);
            port.set_state(PortState::Listening, 0);
        }
        self.converged = self.compute_converged();
        trace!(bridge = %self.mac, "boot: entering root war");
    }

    // ─── Receive processing ───

    fn receive_config(&mut self, i: usize, frame: ConfigBpdu, peer: Option<PeerInfo>) {
        let acked = frame.topology_change_ack;
        self.ports[i].record_config(frame.clone(), self.clock);

        // The root has acknowledged a change episode this bridge is part
        // of: flush learned addresses and restart from boot state. The
        // bridge then relays the acknowledgement in its own hellos.
        if acked && self.topology_change && !self.is_root() {
            debug!(bridge = %self.mac, port = i, "topology change acknowledged");
            self.topology_change = false;
            for slot in &mut self.mac_table {
                *slot = None;
            }
            self.tc_ack_until = self.clock + self.config.topology_change_time();
            self.reenter_election(true);
            return;
        }

        match self.ports[i].state() {
            PortState::Listening => {
                if frame.root_id < self.root_id {
                    self.adopt_root(i, &frame);
                } else if frame.root_id == self.root_id {
                    if self.root_port.is_none() && !self.is_root() {
                        self.elect_root_port();
                    } else {
                        self.elect_designated_port(i, &frame, peer);
                    }
                }
                // A worse root claim is recorded but not acted on: its
                // sender has not caught up with the election, and its
                // cost figures describe a path to a different root.
                // Elections wait until the claim agrees with the
                // belief, which keeps ports listening while an adoption
                // wave crosses the network.
            }
            PortState::Learning => {
                if frame.root_id < self.root_id {
                    self.recalculate(i);
                } else {
                    self.learn(i, frame.sender_id.mac);
                }
            }
            // Blocking and Forwarding ports keep their information fresh
            // (recorded above) and hold their position, unless a better
            // root turns up: a new bridge has joined the network.
            _ => {
                if frame.root_id < self.root_id {
                    self.recalculate(i);
                }
            }
        }
    }

    /// A strictly better root claim: adopt it and demote every elected
    /// port, since the whole root path must be re-elected under the new
    /// belief.
    fn adopt_root(&mut self, i: usize, frame: &ConfigBpdu) {
        debug!(
            bridge = %self.mac,
            port = i,
            root = %frame.root_id,
            cost = frame.root_path_cost,
            "adopting better root"
        );
        self.root_id = frame.root_id;
        self.root_path_cost = frame.root_path_cost + self.ports[i].path_cost();
        self.root_port = None;
        let now = self.clock;
        for port in &mut self.ports {
            if port.state() == PortState::Disabled || port.role() == PortRole::Nondesignated {
                continue;
            }
            port.set_role(PortRole::Nondesignated);
            if matches!(port.state(), PortState::Learning | PortState::Forwarding) {
                port.set_state(PortState::Listening, now);
            }
        }
    }

    /// Pick the root port: the enabled port whose retained BPDU
    /// advertises the believed root at the lowest cost, ties broken by
    /// the best sender Bridge ID, then the lowest interface index.
    fn elect_root_port(&mut self) {
        let mut best: Option<(u32, BridgeId, usize)> = None;
        for (i, port) in self.ports.iter().enumerate() {
            if port.state() == PortState::Disabled {
                continue;
            }
            let Some(frame) = port.last_config() else {
                continue;
            };
            if frame.root_id != self.root_id {
                // A claim for some other root cannot be a path to ours
                continue;
            }
            let key = (frame.root_path_cost, frame.sender_id, i);
            if best.map_or(true, |b| key < b) {
                best = Some(key);
            }
        }

        let Some((advertised, _, i)) = best else {
            return;
        };
        let now = self.clock;
        self.root_port = Some(i);
        self.root_path_cost = advertised + self.ports[i].path_cost();
        self.ports[i].set_role(PortRole::Root);
        self.ports[i].set_state(PortState::Learning, now);
        debug!(
            bridge = %self.mac,
            port = i,
            cost = self.root_path_cost,
            "root port elected"
        );
        debug_assert_eq!(
            self.ports
                .iter()
                .filter(|p| p.role() == PortRole::Root)
                .count(),
            1,
            "election must leave exactly one root port"
        );
    }

    /// Decide whether this port is the designated end of its link, given
    /// the claim just heard from the far end.
    fn elect_designated_port(&mut self, i: usize, frame: &ConfigBpdu, peer: Option<PeerInfo>) {
        let designated = self.is_root()
            || peer.is_some_and(|p| p.role == PortRole::Root)
            || self.root_path_cost < frame.root_path_cost
            || (self.root_path_cost == frame.root_path_cost && self.bridge_id < frame.sender_id);

        let now = self.clock;
        if designated {
            trace!(bridge = %self.mac, port = i, "designated on this link");
            self.ports[i].set_role(PortRole::Designated);
            if self.ports[i].state() == PortState::Listening {
                self.ports[i].set_state(PortState::Learning, now);
            }
        } else {
            self.ports[i].set_role(PortRole::Nondesignated);
            if peer.is_some_and(|p| p.state == PortState::Forwarding) {
                trace!(bridge = %self.mac, port = i, "lost designated election, blocking");
                self.ports[i].set_state(PortState::Blocking, now);
            }
        }
    }

    /// Learning-state address learning: remember which neighbor talks on
    /// this interface.
    fn learn(&mut self, i: usize, mac: MacAddr) {
        if self.mac_table.len() <= i {
            self.mac_table.resize(i + 1, None);
        }
        self.mac_table[i] = Some(mac);
    }

    // ─── Topology change ───

    /// TCN reception. The root answers by carrying TCack in its hellos
    /// for the topology-change time. Everyone else marks the change,
    /// queues a re-flood out of every other port (once per episode),
    /// and re-enters the election. The root belief is kept; the later
    /// acknowledgement restarts from boot state.
    fn receive_tcn(&mut self, from: usize) {
        if self.is_root() {
            debug!(bridge = %self.mac, "root acknowledging topology change");
            self.tc_ack_until = self.clock + self.config.topology_change_time();
            return;
        }
        if self.topology_change {
            // Already part of this episode; the flood has been here
            return;
        }
        debug!(bridge = %self.mac, port = from, "topology change notification");
        self.topology_change = true;
        self.tcn_pending = true;
        self.tcn_skip = Some(from);
        self.reenter_election(false);
    }

    /// A port past its Listening phase heard a strictly better root
    /// claim: a new bridge has joined the network. Notify the neighbors
    /// and restart the election, so the claim is weighed from Listening
    /// like any other.
    fn recalculate(&mut self, from: usize) {
        debug!(
            bridge = %self.mac,
            port = from,
            "better root on a settled port, recalculating"
        );
        if !self.topology_change {
            self.topology_change = true;
            self.tcn_pending = true;
            self.tcn_skip = Some(from);
        }
        self.reenter_election(false);
    }

    // ─── Aging ───

    /// A connected, enabled, non-designated port heard nothing this
    /// tick. Age out stale election information, take over links whose
    /// far bridge is gone, and declare the link lost after max-age
    /// ticks of silence.
    fn check_silence(&mut self, i: usize, peer: Option<PeerInfo>) {
        let now = self.clock;
        self.ports[i].expire_config(now, self.config.max_age);

        if peer.is_some_and(|p| p.role == PortRole::Root) {
            // The far end elected this link as its path to the root, and
            // root ports never speak: this end is the designated port.
            self.ports[i].set_role(PortRole::Designated);
            match self.ports[i].state() {
                PortState::Listening => self.ports[i].set_state(PortState::Learning, now),
                // A blocked port cannot serve the peer's root path; let
                // it work its way forward again
                PortState::Blocking => self.ports[i].set_state(PortState::Listening, now),
                _ => {}
            }
            return;
        }

        if self.ports[i].role() == PortRole::Designated {
            // A designated port speaks; it does not expect to hear
            return;
        }

        if self.ports[i].is_connected() && peer.is_some_and(|p| p.state == PortState::Disabled) {
            // The far bridge is gone; this is now the only end of the
            // link, so treat it like a host-facing edge port.
            debug!(bridge = %self.mac, port = i, "peer disabled, taking over the link");
            if self.root_port == Some(i) {
                self.root_port = None;
            }
            self.ports[i].detach();
            self.ports[i].set_role(PortRole::Designated);
            self.ports[i].set_state(PortState::Forwarding, now);
            return;
        }

        if now.saturating_sub(self.ports[i].last_heard()) >= self.config.max_age {
            debug!(bridge = %self.mac, port = i, "max age expired, link lost");
            self.fail_port(i);
        }
    }

    /// Common path for a lost link, whether aged out or administratively
    /// broken: disable the port, queue a TCN for every neighbor, and
    /// restart the election. Losing the root port also invalidates the
    /// root belief.
    fn fail_port(&mut self, index: usize) {
        let was_root_port = self.root_port == Some(index);
        let now = self.clock;
        if was_root_port {
            self.root_port = None;
        }
        self.ports[index].detach();
        self.ports[index].set_role(PortRole::Nondesignated);
        self.ports[index].set_state(PortState::Disabled, now);
        self.ports[index].clear_frames();

        if self.is_root() {
            self.tc_ack_until = now + self.config.topology_change_time();
        } else {
            self.topology_change = true;
        }
        self.tcn_pending = true;
        self.tcn_skip = None;
        self.reenter_election(was_root_port);
        // Even a bridge left with no active ports reports unconverged for
        // the tick in which it lost the link.
        self.converged = false;
    }

    /// Put every enabled port back into Listening with no role and drop
    /// the root port, so the next BPDUs re-elect the tree. When the path
    /// to the root itself was lost, the belief resets to self-root.
    fn reenter_election(&mut self, reset_belief: bool) {
        if reset_belief {
            self.root_id = self.bridge_id;
            self.root_path_cost = 0;
        }
        self.root_port = None;
        let now = self.clock;
        for port in &mut self.ports {
            if port.state() == PortState::Disabled {
                continue;
            }
            port.set_role(PortRole::Nondesignated);
            port.set_state(PortState::Listening, now);
            // The silence clock restarts with the election; peers that
            // were quiet by role (Blocking, Root) get time to speak up.
            port.mark_heard(now);
        }
        self.converged = self.compute_converged();
    }

    // ─── Timers ───

    /// Forward-delay progression, evaluated every tick: Listening ports
    /// that served their time start Learning; Learning ports either
    /// forward (elected Root or Designated) or fall back to Blocking.
    fn advance_ports(&mut self) {
        let now = self.clock;
        let forward_delay = self.config.forward_delay;
        for port in &mut self.ports {
            match port.state() {
                PortState::Listening if now - port.since() >= forward_delay => {
                    port.set_state(PortState::Learning, now);
                }
                PortState::Learning if now - port.since() >= forward_delay => {
                    if matches!(port.role(), PortRole::Root | PortRole::Designated) {
                        port.set_state(PortState::Forwarding, now);
                    } else {
                        port.set_state(PortState::Blocking, now);
                    }
                }
                _ => {}
            }
        }
    }

    fn compute_converged(&self) -> bool {
        !self
            .ports
            .iter()
            .any(|p| matches!(p.state(), PortState::Listening | PortState::Learning))
    }
}
