use crate::node::Position;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A graph mutation with timestamp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEvent {
    pub timestamp: DateTime<Utc>,
    pub event: EventType,
}

impl GraphEvent {
    /// Create a new event with the current timestamp
    pub fn new(event: EventType) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }

    pub fn with_timestamp(timestamp: DateTime<Utc>, event: EventType) -> Self {
        Self { timestamp, event }
    }
}

/// Accepted mutations, as seen by subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventType {
    NodeAdded {
        id: String,
        type_id: String,
        position: Position,
    },

    NodeRemoved {
        id: String,
        /// Edges removed along with the node
        cascaded_edges: Vec<String>,
    },

    NodeMoved {
        id: String,
        position: Position,
    },

    NodeDataUpdated {
        id: String,
    },

    EdgeAdded {
        id: String,
        source: String,
        target: String,
    },

    EdgeRemoved {
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = GraphEvent::new(EventType::NodeAdded {
            id: "n1".to_string(),
            type_id: "os_package".to_string(),
            position: Position::new(100.0, 100.0),
        });

        assert!(event.timestamp <= Utc::now());
    }

    #[test]
    fn test_event_serialization() {
        let event = GraphEvent::new(EventType::NodeRemoved {
            id: "n1".to_string(),
            cascaded_edges: vec!["e1".to_string(), "e2".to_string()],
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"]["kind"], "node_removed");

        let deserialized: GraphEvent = serde_json::from_value(json).unwrap();
        assert_eq!(deserialized.event, event.event);
    }
}
