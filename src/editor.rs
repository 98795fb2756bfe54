use crate::config::EngineConfig;
use crate::edge::EdgeInstance;
use crate::error::Result;
use crate::factory::NodeInstanceFactory;
use crate::graph::GraphModel;
use crate::id_generator::IdGenerator;
use crate::node::{NodeInstance, Position};
use crate::registry::{BlockKind, BlockTypeDefinition, Category, NodeTypeRegistry};
use crate::serialization::{self, PipelineDefinition};
use crate::validation::{ValidationResult, Validator};
use serde_json::Value;
use std::sync::Arc;

/// What a canvas talks to.
///
/// Owns the block catalog, the factory, the edge id source and the graph.
/// Every call either succeeds completely or leaves the pipeline untouched.
pub struct PipelineEditor {
    config: EngineConfig,
    factory: NodeInstanceFactory,
    edge_ids: Box<dyn IdGenerator>,
    graph: GraphModel,
}

impl PipelineEditor {
    /// New pipeline with the built-in block catalog
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_registry(config, Arc::new(NodeTypeRegistry::builtin()))
    }

    /// New pipeline containing only its start node
    pub fn with_registry(config: EngineConfig, registry: Arc<NodeTypeRegistry>) -> Result<Self> {
        // The start id may fall inside the generated namespace
        let (node_ids, edge_ids) = config
            .id_strategy
            .resume(std::iter::once(config.start_node_id.as_str()), std::iter::empty());
        let mut factory = NodeInstanceFactory::new(Arc::clone(&registry), node_ids);
        let start = factory.create_instance(
            BlockKind::Start.type_id(),
            config.start_position,
            Some(config.start_node_id.clone()),
        )?;
        let graph = GraphModel::with_start_node(registry, start)?;

        tracing::info!(start = %config.start_node_id, "pipeline editor ready");

        Ok(Self {
            config,
            factory,
            edge_ids,
            graph,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn graph(&self) -> &GraphModel {
        &self.graph
    }

    pub fn registry(&self) -> &NodeTypeRegistry {
        self.factory.registry()
    }

    /// Blocks offered in the palette, optionally for one category
    pub fn palette(&self, category: Option<Category>) -> Vec<&BlockTypeDefinition> {
        self.registry().list(category).collect()
    }

    /// Drop a new block of `type_id` onto the canvas; returns its id
    pub fn drop_block(&mut self, type_id: &str, position: Position) -> Result<String> {
        let node = self.factory.create_instance(type_id, position, None)?;
        let id = node.id.clone();
        self.graph.add_node(node)?;
        Ok(id)
    }

    /// Wire `source:source_handle` to `target:target_handle`; returns the edge id
    pub fn connect(
        &mut self,
        source: &str,
        source_handle: &str,
        target: &str,
        target_handle: &str,
    ) -> Result<String> {
        let id = self.edge_ids.next();
        self.graph.add_edge(EdgeInstance::new(
            id.clone(),
            source,
            source_handle,
            target,
            target_handle,
        ))?;
        Ok(id)
    }

    /// Remove a block together with every edge touching it
    pub fn delete_block(&mut self, id: &str) -> Result<NodeInstance> {
        self.graph.remove_node(id)
    }

    pub fn disconnect(&mut self, edge_id: &str) -> Result<EdgeInstance> {
        self.graph.remove_edge(edge_id)
    }

    pub fn move_block(&mut self, id: &str, position: Position) -> Result<()> {
        self.graph.move_node(id, position)
    }

    /// Replace a block's settings; the payload must keep the type's shape
    pub fn configure_block(&mut self, id: &str, payload: Value) -> Result<()> {
        self.graph.update_node_data(id, payload)
    }

    pub fn definition(&self) -> PipelineDefinition {
        serialization::serialize(&self.graph)
    }

    /// Replace the current pipeline with `definition`.
    ///
    /// On failure the current pipeline is kept. On success the id generators
    /// are re-seeded so new blocks never collide with loaded ones.
    pub fn load(&mut self, definition: &PipelineDefinition) -> Result<()> {
        let graph = serialization::deserialize(definition, self.graph.registry_arc())?;

        let (node_ids, edge_ids) = self.config.id_strategy.resume(
            graph.nodes().map(|node| node.id.as_str()),
            graph.edges().map(|edge| edge.id.as_str()),
        );
        self.factory.set_id_generator(node_ids);
        self.edge_ids = edge_ids;

        tracing::info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "pipeline loaded"
        );
        self.graph = graph;
        Ok(())
    }

    pub fn validate(&self) -> ValidationResult {
        Validator::validate(&self.graph)
    }
}
