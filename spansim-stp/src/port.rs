//! Bridge interfaces
//!
//! A port is one interface on a bridge. It owns the one-slot receive
//! buffer that is the only cross-bridge mutable state in the simulator:
//! a frame written by the peer overwrites whatever is pending (a real
//! single-frame buffer drop) and is consumed exactly once by [`Port::drain`].
//!
//! Ports refer to their link partner by handle, never by pointer; the
//! topology owns the handle space and performs the actual delivery.

use crate::bpdu::{Bpdu, ConfigBpdu};
use spansim_core::Tick;

/// Location of a port: index of the owning bridge in the topology, and
/// the interface index on that bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortHandle {
    pub bridge: usize,
    pub port: usize,
}

/// Port role. Blocking, alternate, and backup roles of the standard are
/// collapsed into `Nondesignated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortRole {
    Root,
    Designated,
    Nondesignated,
}

/// Port state.
///
/// `Disabled -> Blocking -> Listening -> Learning -> Forwarding`, with
/// the fall-back `Listening | Learning -> Blocking` when an election
/// denies the port a Root or Designated role, and `any -> Disabled` on
/// link break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortState {
    Disabled,
    Blocking,
    Listening,
    Learning,
    Forwarding,
}

impl std::fmt::Display for PortRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortRole::Root => write!(f, "Root"),
            PortRole::Designated => write!(f, "Designated"),
            PortRole::Nondesignated => write!(f, "Nondesignated"),
        }
    }
}

impl std::fmt::Display for PortState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortState::Disabled => write!(f, "Disabled"),
            PortState::Blocking => write!(f, "Blocking"),
            PortState::Listening => write!(f, "Listening"),
            PortState::Learning => write!(f, "Learning"),
            PortState::Forwarding => write!(f, "Forwarding"),
        }
    }
}

/// One bridge interface.
#[derive(Debug, Clone)]
pub struct Port {
    index: usize,
    peer: Option<PortHandle>,
    state: PortState,
    role: PortRole,
    /// One-slot receive buffer; overwritten on send, taken on drain
    rx: Option<Bpdu>,
    /// Most recent Configuration BPDU, retained for elections after the
    /// slot is drained. Aged out after max-age ticks of silence.
    last_config: Option<ConfigBpdu>,
    /// Bridge clock when any BPDU last arrived
    last_heard: Tick,
    /// Bridge clock when the current state was entered
    since: Tick,
    /// Cost this link contributes to a root path
    path_cost: u32,
}

impl Port {
    /// Create an unwired interface. It stays `Disabled` until attached
    /// to a peer.
    pub fn new(index: usize, path_cost: u32) -> Self {
        Self {
            index,
            peer: None,
            state: PortState::Disabled,
            role: PortRole::Nondesignated,
            rx: None,
            last_config: None,
            last_heard: 0,
            since: 0,
            path_cost,
        }
    }

    /// Interface index, 0-based and stable for the life of the bridge.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> PortState {
        self.state
    }

    pub fn role(&self) -> PortRole {
        self.role
    }

    pub fn peer(&self) -> Option<PortHandle> {
        self.peer
    }

    pub fn is_connected(&self) -> bool {
        self.peer.is_some()
    }

    pub fn path_cost(&self) -> u32 {
        self.path_cost
    }

    /// Bridge clock when the current state was entered.
    pub fn since(&self) -> Tick {
        self.since
    }

    /// Bridge clock when a BPDU last arrived.
    pub fn last_heard(&self) -> Tick {
        self.last_heard
    }

    /// Wire this port to its link partner and bring it up in the initial
    /// `Blocking` state. Idempotent for an equal peer.
    pub fn attach(&mut self, peer: PortHandle, now: Tick) {
        if self.peer == Some(peer) {
            return;
        }
        self.peer = Some(peer);
        self.role = PortRole::Nondesignated;
        self.rx = None;
        self.last_config = None;
        self.last_heard = now;
        self.set_state(PortState::Blocking, now);
    }

    /// Clear the peer reference. The caller decides what state the port
    /// is left in (Disabled for a break, Forwarding for an edge port).
    pub fn detach(&mut self) {
        self.peer = None;
    }

    pub fn set_state(&mut self, state: PortState, now: Tick) {
        self.state = state;
        self.since = now;
    }

    pub fn set_role(&mut self, role: PortRole) {
        self.role = role;
    }

    /// Deposit a frame into the receive slot, overwriting any pending one.
    pub fn receive(&mut self, bpdu: Bpdu) {
        self.rx = Some(bpdu);
    }

    /// Atomically take the pending frame. This is the only read path;
    /// it enforces single consumption.
    pub fn drain(&mut self) -> Option<Bpdu> {
        self.rx.take()
    }

    /// Remember a drained Configuration BPDU for later elections and
    /// refresh the silence clock.
    pub fn record_config(&mut self, config: ConfigBpdu, now: Tick) {
        self.last_config = Some(config);
        self.last_heard = now;
    }

    /// The retained election information, if any.
    pub fn last_config(&self) -> Option<&ConfigBpdu> {
        self.last_config.as_ref()
    }

    /// Note that a BPDU arrived without retaining it (TCNs carry no
    /// election information).
    pub fn mark_heard(&mut self, now: Tick) {
        self.last_heard = now;
    }

    /// Age out retained information that has gone stale.
    pub fn expire_config(&mut self, now: Tick, max_age: Tick) {
        if self.last_config.is_some() && now.saturating_sub(self.last_heard) >= max_age {
            self.last_config = None;
        }
    }

    /// Drop all received state (re-run preparation).
    pub fn clear_frames(&mut self) {
        self.rx = None;
        self.last_config = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bpdu::TcnBpdu;

    #[test]
    fn test_new_port_is_disabled() {
        let port = Port::new(0, 19);
        assert_eq!(port.state(), PortState::Disabled);
        assert_eq!(port.role(), PortRole::Nondesignated);
        assert!(!port.is_connected());
    }

    #[test]
    fn test_attach_brings_port_to_blocking() {
        let mut port = Port::new(0, 19);
        port.attach(PortHandle { bridge: 1, port: 0 }, 5);
        assert_eq!(port.state(), PortState::Blocking);
        assert_eq!(port.since(), 5);
        assert!(port.is_connected());
    }

    #[test]
    fn test_attach_is_idempotent() {
        let mut port = Port::new(0, 19);
        let peer = PortHandle { bridge: 1, port: 0 };
        port.attach(peer, 0);
        port.set_state(PortState::Forwarding, 7);
        // Re-attaching the same peer must not reset the port
        port.attach(peer, 9);
        assert_eq!(port.state(), PortState::Forwarding);
        assert_eq!(port.since(), 7);
    }

    #[test]
    fn test_drain_consumes_once() {
        let mut port = Port::new(0, 19);
        port.receive(Bpdu::Tcn(TcnBpdu::new()));
        assert!(port.drain().is_some());
        assert!(port.drain().is_none());
    }

    #[test]
    fn test_receive_overwrites_pending_frame() {
        let mut port = Port::new(0, 19);
        port.receive(Bpdu::Tcn(TcnBpdu::new()));
        port.receive(Bpdu::Tcn(TcnBpdu::new()));
        assert!(port.drain().is_some());
        // The first frame was dropped, not queued
        assert!(port.drain().is_none());
    }

    #[test]
    fn test_expire_config_after_max_age() {
        use spansim_core::{BridgeId, MacAddr};

        let mut port = Port::new(0, 19);
        let id = BridgeId::new(0x8000, MacAddr::zero());
        port.record_config(
            crate::bpdu::ConfigBpdu {
                root_id: id,
                root_path_cost: 0,
                sender_id: id,
                port_index: 0,
                message_age: 0,
                max_age: 20,
                hello_time: 2,
                forward_delay: 15,
                topology_change: false,
                topology_change_ack: false,
            },
            3,
        );

        port.expire_config(22, 20);
        assert!(port.last_config().is_some(), "19 ticks is not stale yet");
        port.expire_config(23, 20);
        assert!(port.last_config().is_none(), "20 ticks of silence ages out");
    }
}
