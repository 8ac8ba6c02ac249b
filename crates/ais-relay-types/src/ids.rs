//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Connection sessions are keyed by a [`ConnectionId`] so the broadcast hub
//! never confuses a session handle with an MMSI or any other string key.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one open client transport session.
///
/// Generated with UUID v7 so ids sort by connection time in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ConnectionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }

    #[test]
    fn display_matches_inner_uuid() {
        let id = ConnectionId::new();
        assert_eq!(id.to_string(), id.0.to_string());
    }
}
