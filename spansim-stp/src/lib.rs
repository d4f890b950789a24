//! Spanning Tree Protocol (IEEE 802.1D) state machine
//!
//! This crate implements one STP instance per [`Bridge`]: root bridge
//! election by Bridge ID, root port selection by path cost, per-link
//! designated port election, the Blocking/Listening/Learning/Forwarding
//! transitions driven by the forward-delay and max-age timers, and the
//! topology change notification cycle.
//!
//! Bridges do not talk to each other directly. Each tick the owning
//! topology asks every bridge to [`Bridge::emit`] its Configuration BPDUs,
//! delivers them into the peer ports' one-slot receive buffers, and then
//! asks every bridge to [`Bridge::process`] whatever arrived. Time is a
//! plain tick counter; one tick is conventionally one second.

pub mod bpdu;
pub mod bridge;
pub mod port;

pub use bpdu::{Bpdu, ConfigBpdu, TcnBpdu};
pub use bridge::{Bridge, Outbound, PeerInfo};
pub use port::{Port, PortHandle, PortRole, PortState};
