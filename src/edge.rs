use crate::registry::EdgeStyle;
use serde::{Deserialize, Serialize};

/// Connection from an output handle of one node to an input handle of another
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeInstance {
    pub id: String,

    /// Flow leaves this node...
    pub source_node_id: String,
    pub source_handle_id: String,

    /// ...and enters this one
    pub target_node_id: String,
    pub target_handle_id: String,

    /// Set by the graph from the source handle when the edge is inserted
    pub style: EdgeStyle,
}

impl EdgeInstance {
    pub fn new(
        id: impl Into<String>,
        source_node_id: impl Into<String>,
        source_handle_id: impl Into<String>,
        target_node_id: impl Into<String>,
        target_handle_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source_node_id: source_node_id.into(),
            source_handle_id: source_handle_id.into(),
            target_node_id: target_node_id.into(),
            target_handle_id: target_handle_id.into(),
            style: EdgeStyle::Default,
        }
    }

    /// Check if this edge touches a given node
    pub fn involves(&self, node_id: &str) -> bool {
        self.source_node_id == node_id || self.target_node_id == node_id
    }

    /// Check if this edge leaves a given node, optionally from a given handle
    pub fn starts_from(&self, node_id: &str, handle_id: Option<&str>) -> bool {
        self.source_node_id == node_id
            && handle_id.map_or(true, |handle| self.source_handle_id == handle)
    }

    pub fn ends_at(&self, node_id: &str) -> bool {
        self.target_node_id == node_id
    }

    pub fn is_self_loop(&self) -> bool {
        self.source_node_id == self.target_node_id
    }
}
