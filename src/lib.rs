// Pipeline Canvas - Core Library
//
// Graph engine behind a visual CI/CD pipeline editor: a catalog of block
// types, a graph of placed blocks and connections that rejects anything
// breaking its invariants, and a JSON definition for handing pipelines to
// an execution service.

pub mod action;
pub mod config;
pub mod connection;
pub mod edge;
pub mod editor;
pub mod error;
pub mod event;
pub mod factory;
pub mod graph;
pub mod id_generator;
pub mod node;
pub mod registry;
pub mod serialization;
pub mod validation;

// Re-export main types for convenience
pub use action::{reduce, reduce_all, GraphAction};
pub use config::{EngineConfig, IdStrategy};
pub use connection::{ConnectionValidator, GraphView, Verdict};
pub use edge::EdgeInstance;
pub use editor::PipelineEditor;
pub use error::{GraphError, Invariant, Rejection, Result};
pub use event::{EventType, GraphEvent};
pub use factory::NodeInstanceFactory;
pub use graph::GraphModel;
pub use id_generator::{IdGenerator, SequentialIdGenerator, UlidIdGenerator};
pub use node::{payload_conforms, NodeInstance, Position};
pub use registry::{
    BlockKind, BlockTypeDefinition, Category, EdgeStyle, Fanout, InputTopology, NodeTypeRegistry,
    OutputTopology, DEFAULT_INPUT, DEFAULT_OUTPUT, FAILED_OUTPUT, SUCCESS_OUTPUT,
};
pub use serialization::{
    check_invariants, deserialize, serialize, EdgeData, EdgeDefinition, NodeDefinition,
    PipelineDefinition,
};
pub use validation::{
    ValidatedGraph, ValidationIssue, ValidationIssueType, ValidationResult, ValidationSeverity,
    Validator,
};
