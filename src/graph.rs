use crate::connection::{ConnectionValidator, GraphView};
use crate::edge::EdgeInstance;
use crate::error::{GraphError, Result};
use crate::event::{EventType, GraphEvent};
use crate::node::{payload_conforms, NodeInstance, Position};
use crate::registry::NodeTypeRegistry;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Authoritative set of blocks and connections on the canvas.
///
/// Every mutation checks everything it needs before writing, so a failed
/// call leaves the graph exactly as it was.
#[derive(Debug, Clone)]
pub struct GraphModel {
    registry: Arc<NodeTypeRegistry>,

    /// Nodes indexed by id
    nodes: HashMap<String, NodeInstance>,
    /// Node ids in insertion order
    node_order: Vec<String>,

    edges: HashMap<String, EdgeInstance>,
    edge_order: Vec<String>,

    /// Journal of accepted mutations
    events: Vec<GraphEvent>,
}

impl GraphModel {
    /// Empty graph; the start node must be the first node added
    pub(crate) fn new(registry: Arc<NodeTypeRegistry>) -> Self {
        Self {
            registry,
            nodes: HashMap::new(),
            node_order: Vec::new(),
            edges: HashMap::new(),
            edge_order: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Create a graph seeded with its start node
    pub fn with_start_node(registry: Arc<NodeTypeRegistry>, start: NodeInstance) -> Result<Self> {
        let definition = registry.lookup(&start.type_id)?;
        if !definition.is_start() {
            return Err(GraphError::ProtectionMismatch {
                id: start.id,
                type_id: start.type_id,
            });
        }

        let mut graph = Self::new(registry);
        graph.add_node(start)?;
        Ok(graph)
    }

    pub fn registry(&self) -> &NodeTypeRegistry {
        &self.registry
    }

    pub(crate) fn registry_arc(&self) -> Arc<NodeTypeRegistry> {
        Arc::clone(&self.registry)
    }

    // ========== Node Operations ==========

    /// Insert a node built by the factory (or deserialized)
    pub fn add_node(&mut self, node: NodeInstance) -> Result<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(GraphError::DuplicateNodeId(node.id));
        }

        let definition = self.registry.lookup(&node.type_id)?;

        match (definition.is_start(), self.start_node()) {
            (true, Some(existing)) => {
                return Err(GraphError::DuplicateStartNode(existing.id.clone()));
            }
            (false, None) => return Err(GraphError::MissingStartNode(node.id)),
            _ => {}
        }

        // Only the start node is protected, and it always is
        if node.deletable == definition.is_start() {
            return Err(GraphError::ProtectionMismatch {
                id: node.id,
                type_id: node.type_id,
            });
        }

        if !payload_conforms(&definition.default_payload, &node.payload) {
            return Err(GraphError::PayloadShapeMismatch {
                id: node.id,
                type_id: node.type_id,
            });
        }

        if !node.position.is_finite() {
            return Err(GraphError::NonFinitePosition(node.id));
        }

        tracing::debug!(node = %node.id, type_id = %node.type_id, "node added");
        self.log_event(EventType::NodeAdded {
            id: node.id.clone(),
            type_id: node.type_id.clone(),
            position: node.position,
        });

        self.node_order.push(node.id.clone());
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Remove a node and every edge attached to it
    pub fn remove_node(&mut self, id: &str) -> Result<NodeInstance> {
        let node = self
            .nodes
            .get(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;

        if !node.deletable {
            return Err(GraphError::ProtectedNodeDeletion(id.to_string()));
        }

        let cascaded: Vec<String> = self
            .edge_order
            .iter()
            .filter(|edge_id| self.edges[edge_id.as_str()].involves(id))
            .cloned()
            .collect();

        for edge_id in &cascaded {
            self.edges.remove(edge_id);
        }
        self.edge_order.retain(|edge_id| !cascaded.contains(edge_id));

        self.node_order.retain(|node_id| node_id != id);
        let removed = self
            .nodes
            .remove(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;

        tracing::debug!(node = %id, cascaded = cascaded.len(), "node removed");
        self.log_event(EventType::NodeRemoved {
            id: id.to_string(),
            cascaded_edges: cascaded,
        });

        Ok(removed)
    }

    /// Move a node anywhere on the canvas; coordinates must be finite
    pub fn move_node(&mut self, id: &str, position: Position) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;

        if !position.is_finite() {
            return Err(GraphError::NonFinitePosition(id.to_string()));
        }

        node.set_position(position);

        self.log_event(EventType::NodeMoved {
            id: id.to_string(),
            position,
        });
        Ok(())
    }

    /// Replace a node's configuration
    pub fn update_node_data(&mut self, id: &str, payload: Value) -> Result<()> {
        let node = self
            .nodes
            .get(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;

        let definition = self.registry.lookup(&node.type_id)?;
        if !payload_conforms(&definition.default_payload, &payload) {
            return Err(GraphError::PayloadShapeMismatch {
                id: id.to_string(),
                type_id: node.type_id.clone(),
            });
        }

        if let Some(node) = self.nodes.get_mut(id) {
            node.set_payload(payload);
        }

        tracing::debug!(node = %id, "node data updated");
        self.log_event(EventType::NodeDataUpdated { id: id.to_string() });
        Ok(())
    }

    /// Reorder nodes to `order` when it names exactly the nodes present
    pub(crate) fn restore_node_order(&mut self, order: Vec<String>) {
        if order.len() == self.node_order.len() && order.iter().all(|id| self.nodes.contains_key(id)) {
            self.node_order = order;
        }
    }

    pub fn get_node(&self, id: &str) -> Option<&NodeInstance> {
        self.nodes.get(id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &NodeInstance> + '_ {
        self.node_order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// The protected start node, if one has been added
    pub fn start_node(&self) -> Option<&NodeInstance> {
        self.nodes().find(|node| !node.deletable)
    }

    // ========== Edge Operations ==========

    /// Connect two nodes; the validator decides whether the edge is allowed
    pub fn add_edge(&mut self, mut edge: EdgeInstance) -> Result<()> {
        if !self.nodes.contains_key(&edge.source_node_id) {
            return Err(GraphError::NodeNotFound(edge.source_node_id));
        }
        if !self.nodes.contains_key(&edge.target_node_id) {
            return Err(GraphError::NodeNotFound(edge.target_node_id));
        }

        let style = ConnectionValidator::validate(&edge, &*self, &self.registry).into_result()?;

        if self.edges.contains_key(&edge.id) {
            return Err(GraphError::DuplicateEdgeId(edge.id));
        }

        edge.style = style;

        tracing::debug!(
            edge = %edge.id,
            source = %edge.source_node_id,
            target = %edge.target_node_id,
            "edge added"
        );
        self.log_event(EventType::EdgeAdded {
            id: edge.id.clone(),
            source: edge.source_node_id.clone(),
            target: edge.target_node_id.clone(),
        });

        self.edge_order.push(edge.id.clone());
        self.edges.insert(edge.id.clone(), edge);
        Ok(())
    }

    pub fn remove_edge(&mut self, id: &str) -> Result<EdgeInstance> {
        let removed = self
            .edges
            .remove(id)
            .ok_or_else(|| GraphError::EdgeNotFound(id.to_string()))?;
        self.edge_order.retain(|edge_id| edge_id != id);

        tracing::debug!(edge = %id, "edge removed");
        self.log_event(EventType::EdgeRemoved { id: id.to_string() });

        Ok(removed)
    }

    pub fn get_edge(&self, id: &str) -> Option<&EdgeInstance> {
        self.edges.get(id)
    }

    /// Edges in insertion order
    pub fn edges(&self) -> impl Iterator<Item = &EdgeInstance> + '_ {
        self.edge_order.iter().filter_map(|id| self.edges.get(id))
    }

    /// Edges leaving a node, optionally from one handle only
    pub fn edges_from(&self, node_id: &str, handle_id: Option<&str>) -> Vec<&EdgeInstance> {
        self.edges()
            .filter(|edge| edge.starts_from(node_id, handle_id))
            .collect()
    }

    /// Edges entering a node
    pub fn edges_to(&self, node_id: &str) -> Vec<&EdgeInstance> {
        self.edges().filter(|edge| edge.ends_at(node_id)).collect()
    }

    // ========== Event Journal ==========

    fn log_event(&mut self, event: EventType) {
        self.events.push(GraphEvent::new(event));
    }

    pub fn events(&self) -> &[GraphEvent] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Take the journal, leaving it empty
    pub fn drain_events(&mut self) -> Vec<GraphEvent> {
        std::mem::take(&mut self.events)
    }

    // ========== Utility Methods ==========

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

impl GraphView for GraphModel {
    fn node(&self, id: &str) -> Option<&NodeInstance> {
        self.get_node(id)
    }

    fn outgoing_edges(&self, node_id: &str, handle_id: Option<&str>) -> Vec<&EdgeInstance> {
        self.edges_from(node_id, handle_id)
    }
}
