//! Wire messages exchanged with realtime clients.

use domain::SequencedEvent;
use engine::Snapshot;
use serde::{Deserialize, Serialize};

/// Server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    /// Full state; replaces whatever the client held.
    Snapshot(Snapshot),
    /// One event routed to this subscription.
    Event(Delivery),
    Pong,
}

/// An event together with the sequence of the previous event sent on the
/// same subscription.
///
/// Subscriptions only see the kinds their role is routed, so sequence
/// numbers are not contiguous per client. `previous_sequence` lets the
/// client tell a routing skip from a lost message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub previous_sequence: u64,
    pub event: SequencedEvent,
}

impl Delivery {
    pub fn sequence(&self) -> u64 {
        self.event.sequence
    }
}

/// Client to server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    /// Requests a fresh snapshot.
    Resync,
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_parses_type_tag() {
        let resync: Inbound = serde_json::from_str(r#"{"type":"resync"}"#).unwrap();
        assert_eq!(resync, Inbound::Resync);
        let ping: Inbound = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(ping, Inbound::Ping);
        assert!(serde_json::from_str::<Inbound>(r#"{"type":"subscribe"}"#).is_err());
    }

    #[test]
    fn test_pong_is_tag_only() {
        let json = serde_json::to_value(Outbound::Pong).unwrap();
        assert_eq!(json, serde_json::json!({"type": "pong"}));
    }
}
