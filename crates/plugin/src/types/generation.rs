//! Protocol generations and connection status.

use std::fmt;

/// One of the two incompatible versions of the plugin schema RPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Generation {
    /// Older protocol 5 (`tfplugin5`).
    A,
    /// Newer protocol 6 (`tfplugin6`).
    B,
}

impl Generation {
    /// Generations in preference order.
    pub const PREFERRED: [Generation; 2] = [Generation::B, Generation::A];

    /// Application protocol number announced in the handshake.
    pub fn protocol_version(self) -> u32 {
        match self {
            Generation::A => 5,
            Generation::B => 6,
        }
    }

    pub fn from_protocol_version(version: u32) -> Option<Self> {
        match version {
            5 => Some(Generation::A),
            6 => Some(Generation::B),
            _ => None,
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            Generation::A => "protocol 5",
            Generation::B => "protocol 6",
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display())
    }
}

/// Observable lifecycle of a protocol client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Created, never launched.
    Unconnected,
    /// Subprocess launched; handshake in progress.
    Negotiating,
    /// Bound to the generation selected by the handshake.
    Connected(Generation),
    /// Closed explicitly or after a failed connect.
    Closed,
}

impl ConnectionStatus {
    pub fn display(&self) -> &'static str {
        match self {
            ConnectionStatus::Unconnected => "Unconnected",
            ConnectionStatus::Negotiating => "Negotiating",
            ConnectionStatus::Connected(_) => "Connected",
            ConnectionStatus::Closed => "Closed",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected(_))
    }

    pub fn generation(&self) -> Option<Generation> {
        match self {
            ConnectionStatus::Connected(generation) => Some(*generation),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_numbers_round_trip() {
        for generation in Generation::PREFERRED {
            assert_eq!(Generation::from_protocol_version(generation.protocol_version()), Some(generation));
        }
        assert_eq!(Generation::from_protocol_version(4), None);
    }

    #[test]
    fn status_exposes_bound_generation() {
        assert_eq!(ConnectionStatus::Connected(Generation::A).generation(), Some(Generation::A));
        assert!(!ConnectionStatus::Closed.is_connected());
        assert_eq!(ConnectionStatus::Negotiating.generation(), None);
    }
}
