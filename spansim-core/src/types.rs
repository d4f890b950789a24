//! Common types used throughout spansim

use std::fmt;
use std::str::FromStr;

/// One unit of simulated time, conventionally one second.
pub type Tick = u64;

/// MAC Address (6 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// Create a new MAC address
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Zero MAC address (0000.0000.0000)
    pub const fn zero() -> Self {
        Self([0x00, 0x00, 0x00, 0x00, 0x00, 0x00])
    }

    /// Get bytes as slice
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Convert to array
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Cisco-style dotted triplets, the format topology files use
        write!(
            f,
            "{:02x}{:02x}.{:02x}{:02x}.{:02x}{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl FromStr for MacAddr {
    type Err = crate::Error;

    /// Accepts both `xxxx.xxxx.xxxx` and `xx:xx:xx:xx:xx:xx` notation.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex: String = if s.contains('.') {
            let parts: Vec<&str> = s.split('.').collect();
            if parts.len() != 3 || parts.iter().any(|p| p.len() != 4) {
                return Err(crate::Error::parse(format!("Invalid MAC address '{s}'")));
            }
            parts.concat()
        } else {
            let parts: Vec<&str> = s.split(':').collect();
            if parts.len() != 6 || parts.iter().any(|p| p.len() != 2) {
                return Err(crate::Error::parse(format!("Invalid MAC address '{s}'")));
            }
            parts.concat()
        };

        let mut bytes = [0u8; 6];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk)
                .map_err(|_| crate::Error::parse(format!("Invalid MAC address '{s}'")))?;
            bytes[i] = u8::from_str_radix(pair, 16)
                .map_err(|_| crate::Error::parse(format!("Invalid MAC address hex '{s}'")))?;
        }

        Ok(MacAddr(bytes))
    }
}

/// Bridge ID: a 16-bit priority concatenated with the bridge MAC.
///
/// The derived ordering compares priority first and MAC second, which is
/// the lexicographic order of the concatenation. The bridge with the
/// smallest Bridge ID in the network wins root election.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BridgeId {
    /// Bridge priority (0-65535, default 32768)
    pub priority: u16,
    /// Bridge MAC address
    pub mac: MacAddr,
}

impl BridgeId {
    /// Create a new Bridge ID
    pub fn new(priority: u16, mac: MacAddr) -> Self {
        Self { priority, mac }
    }
}

impl fmt::Display for BridgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}.{}", self.priority, self.mac)
    }
}
