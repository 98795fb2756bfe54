use std::fmt;
use thiserror::Error;

/// Graph invariants checked when a definition is loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invariant {
    /// Exactly one protected start node, with no incoming edges
    SingleStartNode,
    /// Node ids and edge ids are unique
    UniqueIds,
    /// Every edge references nodes present in the graph
    EdgeEndpointsExist,
    /// A fanout-limited handle never exceeds its limit
    FanoutLimit,
    /// Every node type is known to the registry
    RegisteredType,
    /// Node payloads match their block type's default payload shape
    PayloadShape,
    /// Edges attach to handles declared by their block types
    DeclaredHandles,
    /// No edge connects a node to itself
    NoSelfLoops,
    /// Node coordinates are finite numbers
    FinitePositions,
}

impl fmt::Display for Invariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Invariant::SingleStartNode => "single protected start node",
            Invariant::UniqueIds => "unique node and edge ids",
            Invariant::EdgeEndpointsExist => "edge endpoints exist",
            Invariant::FanoutLimit => "fanout limit",
            Invariant::RegisteredType => "registered node type",
            Invariant::PayloadShape => "payload shape",
            Invariant::DeclaredHandles => "declared handles",
            Invariant::NoSelfLoops => "no self-loops",
            Invariant::FinitePositions => "finite positions",
        };
        f.write_str(name)
    }
}

/// Why a connection was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The source handle already carries as many edges as it allows
    FanoutExceeded {
        node_id: String,
        handle_id: String,
        limit: usize,
    },
    /// The target block has no inputs (the start node)
    StartNodeHasNoInputs { node_id: String },
    UnknownSourceHandle { type_id: String, handle_id: String },
    UnknownTargetHandle { type_id: String, handle_id: String },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::FanoutExceeded {
                node_id,
                handle_id,
                limit,
            } => write!(
                f,
                "handle '{}' on node '{}' allows at most {} connection(s)",
                handle_id, node_id, limit
            ),
            Rejection::StartNodeHasNoInputs { node_id } => {
                write!(f, "node '{}' does not accept incoming connections", node_id)
            }
            Rejection::UnknownSourceHandle { type_id, handle_id } => {
                write!(f, "block type '{}' has no output handle '{}'", type_id, handle_id)
            }
            Rejection::UnknownTargetHandle { type_id, handle_id } => {
                write!(f, "block type '{}' has no input handle '{}'", type_id, handle_id)
            }
        }
    }
}

/// Errors returned by graph construction and mutation.
///
/// All of these are deterministic logic errors; none are worth retrying.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Unknown node type: '{0}'")]
    UnknownNodeType(String),

    #[error("Node id already in use: '{0}'")]
    DuplicateNodeId(String),

    #[error("Edge id already in use: '{0}'")]
    DuplicateEdgeId(String),

    #[error("Node not found: '{0}'")]
    NodeNotFound(String),

    #[error("Edge not found: '{0}'")]
    EdgeNotFound(String),

    #[error("Node '{0}' is protected and cannot be deleted")]
    ProtectedNodeDeletion(String),

    #[error("Connection rejected: {0}")]
    ConstraintViolation(Rejection),

    #[error("Node '{0}' cannot be connected to itself")]
    SelfLoopRejected(String),

    #[error("Malformed pipeline definition ({invariant}): {detail}")]
    MalformedDefinition { invariant: Invariant, detail: String },

    #[error("Graph already has a start node: '{0}'")]
    DuplicateStartNode(String),

    #[error("Node '{0}' cannot be added before the start node")]
    MissingStartNode(String),

    #[error("Node '{0}' cannot be placed at a non-finite position")]
    NonFinitePosition(String),

    #[error("Node '{id}' of type '{type_id}' has the wrong deletion protection")]
    ProtectionMismatch { id: String, type_id: String },

    #[error("Payload for node '{id}' does not match the shape of block type '{type_id}'")]
    PayloadShapeMismatch { id: String, type_id: String },
}

impl GraphError {
    pub(crate) fn malformed(invariant: Invariant, detail: impl Into<String>) -> Self {
        GraphError::MalformedDefinition {
            invariant,
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;
