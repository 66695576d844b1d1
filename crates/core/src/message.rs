use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique message identifier.
pub type MessageId = Uuid;

/// A unit of work flowing through a pipeline stage.
///
/// The payload is opaque to the scheduling layer; behaviors see it as
/// structured data when rendering their hooks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    /// Producer-assigned sequence number.
    pub seq: u64,
    pub created_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl Message {
    pub fn new(seq: u64, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            seq,
            created_at: Utc::now(),
            payload,
        }
    }

    /// A message with no payload, as synthesized by periodic producers.
    pub fn empty(seq: u64) -> Self {
        Self::new(seq, serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_get_distinct_ids() {
        let a = Message::empty(1);
        let b = Message::empty(1);
        assert_ne!(a.id, b.id);
        assert_eq!(a.seq, b.seq);
    }

    #[test]
    fn serializes_payload_inline() {
        let msg = Message::new(7, serde_json::json!({ "user": "ada" }));
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["seq"], 7);
        assert_eq!(value["payload"]["user"], "ada");
    }
}
