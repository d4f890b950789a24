//! Protocol timing and identity configuration
//!
//! All 802.1D constants are carried explicitly instead of living in
//! per-module globals, so a topology can be built with non-default timers
//! in tests.

use crate::types::Tick;

/// Default bridge priority; all bridges share it unless configured otherwise,
/// so root election falls through to the MAC comparison.
pub const DEFAULT_BRIDGE_PRIORITY: u16 = 0x8000;

/// Hello interval in ticks
pub const DEFAULT_HELLO_TIME: Tick = 2;

/// Listening and Learning each last this many ticks
pub const DEFAULT_FORWARD_DELAY: Tick = 15;

/// Stored port information expires after this many silent ticks
pub const DEFAULT_MAX_AGE: Tick = 20;

/// Per-link path cost (FastEthernet)
pub const DEFAULT_PATH_COST: u32 = 19;

/// STP timing and identity parameters, passed to every bridge at
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StpConfig {
    /// Bridge priority placed in front of the MAC in the Bridge ID
    pub priority: u16,
    /// Ticks between Configuration BPDU emissions
    pub hello_time: Tick,
    /// Ticks spent in each of Listening and Learning
    pub forward_delay: Tick,
    /// Ticks of silence before port information is aged out
    pub max_age: Tick,
    /// Cost contributed by each link
    pub path_cost: u32,
}

impl StpConfig {
    /// How long a bridge keeps acknowledging a topology change in its
    /// outgoing BPDUs. This is the 802.1D topology-change time.
    pub fn topology_change_time(&self) -> Tick {
        self.max_age + self.forward_delay
    }
}

impl Default for StpConfig {
    fn default() -> Self {
        Self {
            priority: DEFAULT_BRIDGE_PRIORITY,
            hello_time: DEFAULT_HELLO_TIME,
            forward_delay: DEFAULT_FORWARD_DELAY,
            max_age: DEFAULT_MAX_AGE,
            path_cost: DEFAULT_PATH_COST,
        }
    }
}
