use crate::edge::EdgeInstance;
use crate::error::{GraphError, Rejection};
use crate::node::NodeInstance;
use crate::registry::{EdgeStyle, Fanout, NodeTypeRegistry};

/// Read-only view of a graph, enough to judge a new connection
pub trait GraphView {
    fn node(&self, id: &str) -> Option<&NodeInstance>;

    /// Edges leaving `node_id`, restricted to one handle when given
    fn outgoing_edges(&self, node_id: &str, handle_id: Option<&str>) -> Vec<&EdgeInstance>;
}

/// Outcome of a connection check
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// The edge may be inserted with this style
    Accept(EdgeStyle),
    Reject(GraphError),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accept(_))
    }

    pub fn into_result(self) -> Result<EdgeStyle, GraphError> {
        match self {
            Verdict::Accept(style) => Ok(style),
            Verdict::Reject(err) => Err(err),
        }
    }
}

/// Decides whether a candidate edge may join the graph.
///
/// Pure: the verdict depends only on the candidate, the current edges and
/// the registry. Edge id collisions are the graph's concern, not this one's.
pub struct ConnectionValidator;

impl ConnectionValidator {
    pub fn validate(
        candidate: &EdgeInstance,
        view: &impl GraphView,
        registry: &NodeTypeRegistry,
    ) -> Verdict {
        let verdict = Self::check(candidate, view, registry);
        tracing::trace!(edge = %candidate.id, ?verdict, "connection checked");
        verdict
    }

    fn check(
        candidate: &EdgeInstance,
        view: &impl GraphView,
        registry: &NodeTypeRegistry,
    ) -> Verdict {
        let Some(source) = view.node(&candidate.source_node_id) else {
            return Verdict::Reject(GraphError::NodeNotFound(candidate.source_node_id.clone()));
        };
        let Some(target) = view.node(&candidate.target_node_id) else {
            return Verdict::Reject(GraphError::NodeNotFound(candidate.target_node_id.clone()));
        };

        if candidate.is_self_loop() {
            return Verdict::Reject(GraphError::SelfLoopRejected(candidate.source_node_id.clone()));
        }

        let source_type = match registry.lookup(&source.type_id) {
            Ok(def) => def,
            Err(err) => return Verdict::Reject(err),
        };
        let target_type = match registry.lookup(&target.type_id) {
            Ok(def) => def,
            Err(err) => return Verdict::Reject(err),
        };

        if target_type.is_start() {
            return reject(Rejection::StartNodeHasNoInputs {
                node_id: target.id.clone(),
            });
        }

        let Some(handle) = source_type.outputs.handle(&candidate.source_handle_id) else {
            return reject(Rejection::UnknownSourceHandle {
                type_id: source.type_id.clone(),
                handle_id: candidate.source_handle_id.clone(),
            });
        };

        if !target_type.inputs.has_handle(&candidate.target_handle_id) {
            return reject(Rejection::UnknownTargetHandle {
                type_id: target.type_id.clone(),
                handle_id: candidate.target_handle_id.clone(),
            });
        }

        if let Fanout::Limited(limit) = handle.fanout {
            let existing = view
                .outgoing_edges(&candidate.source_node_id, Some(candidate.source_handle_id.as_str()))
                .len();
            if existing >= limit {
                return reject(Rejection::FanoutExceeded {
                    node_id: candidate.source_node_id.clone(),
                    handle_id: candidate.source_handle_id.clone(),
                    limit,
                });
            }
        }

        Verdict::Accept(handle.style)
    }
}

fn reject(rejection: Rejection) -> Verdict {
    Verdict::Reject(GraphError::ConstraintViolation(rejection))
}
