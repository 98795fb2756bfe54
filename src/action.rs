use crate::edge::EdgeInstance;
use crate::error::Result;
use crate::graph::GraphModel;
use crate::node::{NodeInstance, Position};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single request from the canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GraphAction {
    AddNode(NodeInstance),
    RemoveNode { id: String },
    MoveNode { id: String, position: Position },
    UpdateNodeData { id: String, payload: Value },
    AddEdge(EdgeInstance),
    RemoveEdge { id: String },
}

impl GraphModel {
    /// Apply one action in place
    pub fn apply(&mut self, action: GraphAction) -> Result<()> {
        match action {
            GraphAction::AddNode(node) => self.add_node(node),
            GraphAction::RemoveNode { id } => self.remove_node(&id).map(|_| ()),
            GraphAction::MoveNode { id, position } => self.move_node(&id, position),
            GraphAction::UpdateNodeData { id, payload } => self.update_node_data(&id, payload),
            GraphAction::AddEdge(edge) => self.add_edge(edge),
            GraphAction::RemoveEdge { id } => self.remove_edge(&id).map(|_| ()),
        }
    }
}

/// `(Graph, Action) -> Result<Graph>`: the input snapshot is never touched
pub fn reduce(graph: &GraphModel, action: GraphAction) -> Result<GraphModel> {
    let mut next = graph.clone();
    next.clear_events();
    next.apply(action)?;
    Ok(next)
}

/// Fold a sequence of actions, stopping at the first failure
pub fn reduce_all<I>(graph: &GraphModel, actions: I) -> Result<GraphModel>
where
    I: IntoIterator<Item = GraphAction>,
{
    let mut next = graph.clone();
    next.clear_events();
    for action in actions {
        next.apply(action)?;
    }
    Ok(next)
}
