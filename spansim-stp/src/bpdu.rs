//! BPDU message values
//!
//! Two kinds are exchanged: periodic Configuration BPDUs carrying the
//! sender's (root, cost, sender) advertisement, and the tiny Topology
//! Change Notification. Values are immutable once built; the receiver
//! tracks observed age on its own clock rather than mutating the frame.

use spansim_core::{BridgeId, Tick};

/// A Configuration BPDU as one bridge port advertises it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigBpdu {
    /// Bridge ID the sender believes is the network root
    pub root_id: BridgeId,
    /// Sender's cost to that root (0 if the sender is the root)
    pub root_path_cost: u32,
    /// Sender's own Bridge ID
    pub sender_id: BridgeId,
    /// Interface index this BPDU was sent out of
    pub port_index: usize,
    /// Sender clock at emission
    pub message_age: Tick,
    /// Sender's max-age timer value
    pub max_age: Tick,
    /// Sender's hello interval
    pub hello_time: Tick,
    /// Sender's forward-delay timer value
    pub forward_delay: Tick,
    /// Topology Change flag
    pub topology_change: bool,
    /// Topology Change Acknowledgment flag
    pub topology_change_ack: bool,
}

/// A Topology Change Notification BPDU. Carries no fields; the type is
/// the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TcnBpdu;

impl TcnBpdu {
    /// Create a new TCN BPDU
    pub fn new() -> Self {
        Self
    }
}

/// Any BPDU that can sit in a port's receive slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bpdu {
    Config(ConfigBpdu),
    Tcn(TcnBpdu),
}

impl Bpdu {
    /// Is this a Topology Change Notification?
    pub fn is_tcn(&self) -> bool {
        matches!(self, Bpdu::Tcn(_))
    }

    /// The Configuration payload, if this is a Configuration BPDU.
    pub fn as_config(&self) -> Option<&ConfigBpdu> {
        match self {
            Bpdu::Config(config) => Some(config),
            Bpdu::Tcn(_) => None,
        }
    }
}
