//! Export boundary: the graph as a persistence-ready pipeline definition.
//!
//! The persisted shape is the one the canvas and the execution side share:
//!
//! ```json
//! {
//!   "nodes": [{"id": "s1", "type": "start", "position": {"x": 0, "y": 0}, "data": {}}],
//!   "edges": [{"id": "e1", "source": "s1", "sourceHandle": "default-output",
//!              "target": "n1", "targetHandle": "default-input"}]
//! }
//! ```
//!
//! Loading never repairs a definition; the first broken invariant is reported.

use crate::edge::EdgeInstance;
use crate::error::{GraphError, Invariant, Result};
use crate::graph::GraphModel;
use crate::node::{payload_conforms, NodeInstance, Position};
use crate::registry::{EdgeStyle, Fanout, NodeTypeRegistry};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Serializable pipeline: nodes and edges in graph insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    pub nodes: Vec<NodeDefinition>,
    pub edges: Vec<EdgeDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub position: Position,
    pub data: Value,
    /// Only present when different from the block type's default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selectable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletable: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDefinition {
    pub id: String,
    pub source: String,
    pub source_handle: String,
    pub target: String,
    pub target_handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<EdgeData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeData {
    pub style: EdgeStyle,
}

impl PipelineDefinition {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Snapshot a graph
pub fn serialize(graph: &GraphModel) -> PipelineDefinition {
    let registry = graph.registry();

    let nodes = graph
        .nodes()
        .map(|node| {
            let defaults = registry.lookup(&node.type_id).ok();
            let differs = |value: bool, default: Option<bool>| {
                (default != Some(value)).then_some(value)
            };
            NodeDefinition {
                id: node.id.clone(),
                node_type: node.type_id.clone(),
                position: node.position,
                data: node.payload.clone(),
                selectable: differs(node.selectable, defaults.map(|d| d.selectable)),
                deletable: differs(node.deletable, defaults.map(|d| d.deletable)),
            }
        })
        .collect();

    let edges = graph
        .edges()
        .map(|edge| EdgeDefinition {
            id: edge.id.clone(),
            source: edge.source_node_id.clone(),
            source_handle: edge.source_handle_id.clone(),
            target: edge.target_node_id.clone(),
            target_handle: edge.target_handle_id.clone(),
            data: (edge.style != EdgeStyle::Default).then_some(EdgeData { style: edge.style }),
        })
        .collect();

    PipelineDefinition { nodes, edges }
}

/// Rebuild a graph, rejecting definitions that break any graph invariant
pub fn deserialize(
    definition: &PipelineDefinition,
    registry: Arc<NodeTypeRegistry>,
) -> Result<GraphModel> {
    if let Err(err) = check_invariants(definition, &registry) {
        tracing::warn!(error = %err, "pipeline definition rejected");
        return Err(err);
    }

    let mut graph = GraphModel::new(registry);

    // The start node goes in first; definition order is restored afterwards
    let (starts, steps): (Vec<&NodeDefinition>, Vec<&NodeDefinition>) =
        definition.nodes.iter().partition(|node| {
            graph
                .registry()
                .lookup(&node.node_type)
                .is_ok_and(|def| def.is_start())
        });

    for node in starts.into_iter().chain(steps) {
        let instance = to_instance(node, graph.registry())?;
        graph
            .add_node(instance)
            .map_err(|err| GraphError::malformed(invariant_for(&err), err.to_string()))?;
    }
    graph.restore_node_order(definition.nodes.iter().map(|node| node.id.clone()).collect());

    for edge in &definition.edges {
        graph
            .add_edge(EdgeInstance::new(
                edge.id.clone(),
                edge.source.clone(),
                edge.source_handle.clone(),
                edge.target.clone(),
                edge.target_handle.clone(),
            ))
            .map_err(|err| GraphError::malformed(invariant_for(&err), err.to_string()))?;
    }

    graph.clear_events();
    Ok(graph)
}

fn to_instance(node: &NodeDefinition, registry: &NodeTypeRegistry) -> Result<NodeInstance> {
    let defaults = registry.lookup(&node.node_type).map_err(|_| {
        GraphError::malformed(
            Invariant::RegisteredType,
            format!("node '{}' has unknown type '{}'", node.id, node.node_type),
        )
    })?;

    Ok(NodeInstance {
        id: node.id.clone(),
        type_id: node.node_type.clone(),
        position: node.position,
        payload: node.data.clone(),
        selectable: node.selectable.unwrap_or(defaults.selectable),
        deletable: node.deletable.unwrap_or(defaults.deletable),
    })
}

/// Which invariant a graph mutation error corresponds to
fn invariant_for(err: &GraphError) -> Invariant {
    match err {
        GraphError::UnknownNodeType(_) => Invariant::RegisteredType,
        GraphError::DuplicateNodeId(_) | GraphError::DuplicateEdgeId(_) => Invariant::UniqueIds,
        GraphError::NodeNotFound(_) => Invariant::EdgeEndpointsExist,
        GraphError::SelfLoopRejected(_) => Invariant::NoSelfLoops,
        GraphError::PayloadShapeMismatch { .. } => Invariant::PayloadShape,
        GraphError::ConstraintViolation(crate::error::Rejection::FanoutExceeded { .. }) => {
            Invariant::FanoutLimit
        }
        GraphError::ConstraintViolation(crate::error::Rejection::StartNodeHasNoInputs {
            ..
        }) => Invariant::SingleStartNode,
        GraphError::ConstraintViolation(_) => Invariant::DeclaredHandles,
        GraphError::MalformedDefinition { invariant, .. } => *invariant,
        GraphError::EdgeNotFound(_)
        | GraphError::ProtectedNodeDeletion(_)
        | GraphError::DuplicateStartNode(_)
        | GraphError::MissingStartNode(_)
        | GraphError::ProtectionMismatch { .. } => Invariant::SingleStartNode,
        GraphError::NonFinitePosition(_) => Invariant::FinitePositions,
    }
}

/// Check every graph invariant against a definition without building anything
pub fn check_invariants(definition: &PipelineDefinition, registry: &NodeTypeRegistry) -> Result<()> {
    // Registered types
    let mut types = HashMap::with_capacity(definition.nodes.len());
    for node in &definition.nodes {
        let def = registry.lookup(&node.node_type).map_err(|_| {
            GraphError::malformed(
                Invariant::RegisteredType,
                format!("node '{}' has unknown type '{}'", node.id, node.node_type),
            )
        })?;
        types.insert(node.id.as_str(), def);
    }

    // Unique ids
    let mut seen = HashSet::new();
    for node in &definition.nodes {
        if !seen.insert(node.id.as_str()) {
            return Err(GraphError::malformed(
                Invariant::UniqueIds,
                format!("node id '{}' appears more than once", node.id),
            ));
        }
    }
    let mut seen = HashSet::new();
    for edge in &definition.edges {
        if !seen.insert(edge.id.as_str()) {
            return Err(GraphError::malformed(
                Invariant::UniqueIds,
                format!("edge id '{}' appears more than once", edge.id),
            ));
        }
    }

    // Exactly one protected start node
    let starts: Vec<&NodeDefinition> = definition
        .nodes
        .iter()
        .filter(|node| types[node.id.as_str()].is_start())
        .collect();
    match starts.as_slice() {
        [] => {
            return Err(GraphError::malformed(
                Invariant::SingleStartNode,
                "definition has no start node",
            ))
        }
        [start] => {
            if start.deletable == Some(true) {
                return Err(GraphError::malformed(
                    Invariant::SingleStartNode,
                    format!("start node '{}' is marked deletable", start.id),
                ));
            }
        }
        [first, second, ..] => {
            return Err(GraphError::malformed(
                Invariant::SingleStartNode,
                format!("multiple start nodes: '{}' and '{}'", first.id, second.id),
            ))
        }
    }
    if let Some(node) = definition
        .nodes
        .iter()
        .find(|node| node.deletable == Some(false) && !types[node.id.as_str()].is_start())
    {
        return Err(GraphError::malformed(
            Invariant::SingleStartNode,
            format!("only the start node may be protected, but '{}' is", node.id),
        ));
    }

    // Payload shape
    for node in &definition.nodes {
        let def = types[node.id.as_str()];
        if !payload_conforms(&def.default_payload, &node.data) {
            return Err(GraphError::malformed(
                Invariant::PayloadShape,
                format!(
                    "data of node '{}' does not match block type '{}'",
                    node.id, node.node_type
                ),
            ));
        }
    }

    if let Some(node) = definition.nodes.iter().find(|node| !node.position.is_finite()) {
        return Err(GraphError::malformed(
            Invariant::FinitePositions,
            format!("node '{}' has a non-finite position", node.id),
        ));
    }

    let mut fanout: HashMap<(&str, &str), usize> = HashMap::new();
    for edge in &definition.edges {
        // Endpoints exist
        let (Some(source), Some(target)) = (
            types.get(edge.source.as_str()),
            types.get(edge.target.as_str()),
        ) else {
            let missing = if types.contains_key(edge.source.as_str()) {
                &edge.target
            } else {
                &edge.source
            };
            return Err(GraphError::malformed(
                Invariant::EdgeEndpointsExist,
                format!("edge '{}' references missing node '{}'", edge.id, missing),
            ));
        };

        if edge.source == edge.target {
            return Err(GraphError::malformed(
                Invariant::NoSelfLoops,
                format!("edge '{}' connects node '{}' to itself", edge.id, edge.source),
            ));
        }

        if target.is_start() {
            return Err(GraphError::malformed(
                Invariant::SingleStartNode,
                format!("edge '{}' enters start node '{}'", edge.id, edge.target),
            ));
        }

        let Some(handle) = source.outputs.handle(&edge.source_handle) else {
            return Err(GraphError::malformed(
                Invariant::DeclaredHandles,
                format!(
                    "edge '{}' leaves undeclared handle '{}' of '{}'",
                    edge.id, edge.source_handle, edge.source
                ),
            ));
        };
        if !target.inputs.has_handle(&edge.target_handle) {
            return Err(GraphError::malformed(
                Invariant::DeclaredHandles,
                format!(
                    "edge '{}' enters undeclared handle '{}' of '{}'",
                    edge.id, edge.target_handle, edge.target
                ),
            ));
        }

        // Fanout limit
        if let Fanout::Limited(limit) = handle.fanout {
            let count = fanout
                .entry((edge.source.as_str(), edge.source_handle.as_str()))
                .or_insert(0);
            *count += 1;
            if *count > limit {
                return Err(GraphError::malformed(
                    Invariant::FanoutLimit,
                    format!(
                        "handle '{}' of '{}' has more than {} edge(s)",
                        edge.source_handle, edge.source, limit
                    ),
                ));
            }
        }
    }

    Ok(())
}

impl GraphModel {
    pub fn to_definition(&self) -> PipelineDefinition {
        serialize(self)
    }

    /// Load a definition against the same registry as this graph
    pub fn from_definition(
        definition: &PipelineDefinition,
        registry: Arc<NodeTypeRegistry>,
    ) -> Result<Self> {
        deserialize(definition, registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{DEFAULT_INPUT, DEFAULT_OUTPUT, FAILED_OUTPUT, SUCCESS_OUTPUT};
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn registry() -> Arc<NodeTypeRegistry> {
        Arc::new(NodeTypeRegistry::builtin())
    }

    fn node_def(id: &str, node_type: &str) -> NodeDefinition {
        NodeDefinition {
            id: id.to_string(),
            node_type: node_type.to_string(),
            position: Position::new(0.0, 0.0),
            data: NodeTypeRegistry::builtin()
                .lookup(node_type)
                .map(|d| d.default_payload.clone())
                .unwrap_or_else(|_| json!({})),
            selectable: None,
            deletable: None,
        }
    }

    fn edge_def(id: &str, source: &str, source_handle: &str, target: &str) -> EdgeDefinition {
        EdgeDefinition {
            id: id.to_string(),
            source: source.to_string(),
            source_handle: source_handle.to_string(),
            target: target.to_string(),
            target_handle: DEFAULT_INPUT.to_string(),
            data: None,
        }
    }

    fn valid_definition() -> PipelineDefinition {
        PipelineDefinition {
            nodes: vec![
                node_def("s1", "start"),
                node_def("t1", "run_tests"),
                node_def("ok", "deploy"),
                node_def("ko", "notify"),
            ],
            edges: vec![
                edge_def("e1", "s1", DEFAULT_OUTPUT, "t1"),
                edge_def("e2", "t1", SUCCESS_OUTPUT, "ok"),
                edge_def("e3", "t1", FAILED_OUTPUT, "ko"),
            ],
        }
    }

    fn assert_malformed(definition: &PipelineDefinition, expected: Invariant) {
        assert_matches!(
            deserialize(definition, registry()),
            Err(GraphError::MalformedDefinition { invariant, .. }) if invariant == expected
        );
    }

    #[test]
    fn test_deserialize_valid() {
        let graph = deserialize(&valid_definition(), registry()).unwrap();
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.start_node().unwrap().id, "s1");
        assert_eq!(graph.get_edge("e2").unwrap().style, EdgeStyle::Success);
        assert!(graph.events().is_empty());
    }

    #[test]
    fn test_serialize_preserves_order_and_shape() {
        let graph = deserialize(&valid_definition(), registry()).unwrap();
        let definition = serialize(&graph);

        let ids: Vec<&str> = definition.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "t1", "ok", "ko"]);

        let json = serde_json::to_value(&definition).unwrap();
        assert_eq!(json["nodes"][0]["type"], "start");
        assert!(json["nodes"][0].get("deletable").is_none());
        assert_eq!(json["edges"][0]["sourceHandle"], "default-output");
        assert_eq!(json["edges"][0]["targetHandle"], "default-input");
        assert!(json["edges"][0].get("data").is_none());
        assert_eq!(json["edges"][2]["data"]["style"], "failure");
    }

    #[test]
    fn test_start_node_listed_late_keeps_order() {
        let mut definition = valid_definition();
        let start = definition.nodes.remove(0);
        definition.nodes.push(start);

        let graph = deserialize(&definition, registry()).unwrap();
        assert_eq!(graph.start_node().unwrap().id, "s1");
        assert_eq!(serialize(&graph).nodes, definition.nodes);
    }

    #[test]
    fn test_rejects_non_finite_position() {
        let mut definition = valid_definition();
        definition.nodes[1].position = Position::new(f64::NAN, 0.0);
        assert_malformed(&definition, Invariant::FinitePositions);
    }

    #[test]
    fn test_round_trip() {
        let original = valid_definition();
        let graph = deserialize(&original, registry()).unwrap();
        let again = deserialize(&serialize(&graph), registry()).unwrap();

        let nodes: Vec<&NodeInstance> = graph.nodes().collect();
        let nodes_again: Vec<&NodeInstance> = again.nodes().collect();
        assert_eq!(nodes, nodes_again);

        let edges: Vec<&EdgeInstance> = graph.edges().collect();
        let edges_again: Vec<&EdgeInstance> = again.edges().collect();
        assert_eq!(edges, edges_again);
    }

    #[test]
    fn test_json_round_trip() {
        let definition = valid_definition();
        let json = definition.to_json().unwrap();
        assert_eq!(PipelineDefinition::from_json(&json).unwrap(), definition);
    }

    #[test]
    fn test_parse_canvas_json() {
        let json = r#"{
            "nodes": [
                {"id": "s1", "type": "start", "position": {"x": 0, "y": 0},
                 "data": {"trigger": "push", "branches": ["main", "release"]}},
                {"id": "n1", "type": "os_package", "position": {"x": 100, "y": 100},
                 "data": {"manager": "apt", "packages": ["git"], "update_index": true}}
            ],
            "edges": [
                {"id": "e1", "source": "s1", "sourceHandle": "default-output",
                 "target": "n1", "targetHandle": "default-input", "data": {"style": "default"}}
            ]
        }"#;

        let definition = PipelineDefinition::from_json(json).unwrap();
        let graph = deserialize(&definition, registry()).unwrap();
        assert_eq!(graph.get_node("n1").unwrap().payload["packages"], json!(["git"]));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_rejects_unknown_type() {
        let mut definition = valid_definition();
        definition.nodes.push(node_def("x", "quantum_build"));
        assert_malformed(&definition, Invariant::RegisteredType);
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let mut definition = valid_definition();
        definition.nodes.push(node_def("ko", "notify"));
        assert_malformed(&definition, Invariant::UniqueIds);

        let mut definition = valid_definition();
        definition.edges[2].id = "e1".to_string();
        assert_malformed(&definition, Invariant::UniqueIds);
    }

    #[test]
    fn test_rejects_start_problems() {
        let mut definition = valid_definition();
        definition.nodes.remove(0);
        definition.edges.remove(0);
        assert_malformed(&definition, Invariant::SingleStartNode);

        let mut definition = valid_definition();
        definition.nodes.push(node_def("s2", "start"));
        assert_malformed(&definition, Invariant::SingleStartNode);

        let mut definition = valid_definition();
        definition.nodes[0].deletable = Some(true);
        assert_malformed(&definition, Invariant::SingleStartNode);

        let mut definition = valid_definition();
        definition.nodes[3].deletable = Some(false);
        assert_malformed(&definition, Invariant::SingleStartNode);

        let mut definition = valid_definition();
        definition.edges.push(edge_def("e9", "ko", DEFAULT_OUTPUT, "s1"));
        assert_malformed(&definition, Invariant::SingleStartNode);
    }

    #[test]
    fn test_rejects_bad_payload() {
        let mut definition = valid_definition();
        definition.nodes[1].data = json!({"command": "cargo test"});
        assert_malformed(&definition, Invariant::PayloadShape);
    }

    #[test]
    fn test_rejects_dangling_edge() {
        let mut definition = valid_definition();
        definition.edges.push(edge_def("e9", "ko", DEFAULT_OUTPUT, "ghost"));
        assert_malformed(&definition, Invariant::EdgeEndpointsExist);
    }

    #[test]
    fn test_rejects_self_loop() {
        let mut definition = valid_definition();
        definition.edges.push(edge_def("e9", "ko", DEFAULT_OUTPUT, "ko"));
        assert_malformed(&definition, Invariant::NoSelfLoops);
    }

    #[test]
    fn test_rejects_undeclared_handles() {
        let mut definition = valid_definition();
        definition.edges.push(edge_def("e9", "t1", DEFAULT_OUTPUT, "ko"));
        assert_malformed(&definition, Invariant::DeclaredHandles);
    }

    #[test]
    fn test_rejects_fanout_overflow() {
        let mut definition = valid_definition();
        definition.nodes.push(node_def("ko2", "notify"));
        definition.edges.push(edge_def("e4", "t1", FAILED_OUTPUT, "ko2"));
        assert_malformed(&definition, Invariant::FanoutLimit);
    }

    #[test]
    fn test_selectable_override_survives() {
        let mut definition = valid_definition();
        definition.nodes[2].selectable = Some(false);

        let graph = deserialize(&definition, registry()).unwrap();
        assert!(!graph.get_node("ok").unwrap().selectable);
        assert_eq!(serialize(&graph).nodes[2].selectable, Some(false));
    }
}
