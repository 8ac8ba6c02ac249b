//! Enumeration types for the AIS relay.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// The role a connection plays in the relay.
///
/// Every connection starts [`Unidentified`](ClientRole::Unidentified) and
/// moves to [`Sender`](ClientRole::Sender) or [`Viewer`](ClientRole::Viewer)
/// on its first valid `identify` message. The role never changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientRole {
    /// Connected but has not sent a valid `identify` yet.
    #[default]
    Unidentified,
    /// Pushes decoded AIS messages into the relay.
    Sender,
    /// Receives the live vessel picture.
    Viewer,
}

impl ClientRole {
    /// Map the `clientType` string of an `identify` message to a role.
    ///
    /// Only `sender` and `viewer` are accepted; anything else yields `None`.
    pub fn from_client_type(client_type: &str) -> Option<Self> {
        match client_type {
            "sender" => Some(Self::Sender),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }

    /// Lowercase name as used on the wire and in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unidentified => "unidentified",
            Self::Sender => "sender",
            Self::Viewer => "viewer",
        }
    }
}

impl core::fmt::Display for ClientRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a vessel was dropped from the live registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum RemovalReason {
    /// No message was received within the staleness threshold.
    Inactive,
}
