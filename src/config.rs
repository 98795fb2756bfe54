use crate::id_generator::{IdGenerator, SequentialIdGenerator, UlidIdGenerator};
use crate::node::Position;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How new node and edge ids are minted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum IdStrategy {
    /// Deterministic counter; unique within one editing session only
    Sequential {
        #[serde(default = "default_node_prefix")]
        node_prefix: String,
        #[serde(default = "default_edge_prefix")]
        edge_prefix: String,
    },
    /// ULIDs; unique across independent clients
    Ulid,
}

fn default_node_prefix() -> String {
    "node_".to_string()
}

fn default_edge_prefix() -> String {
    "edge_".to_string()
}

impl Default for IdStrategy {
    fn default() -> Self {
        IdStrategy::Sequential {
            node_prefix: default_node_prefix(),
            edge_prefix: default_edge_prefix(),
        }
    }
}

impl IdStrategy {
    pub fn node_ids(&self) -> Box<dyn IdGenerator> {
        match self {
            IdStrategy::Sequential { node_prefix, .. } => {
                Box::new(SequentialIdGenerator::new(node_prefix.clone()))
            }
            IdStrategy::Ulid => Box::new(UlidIdGenerator::new("node_")),
        }
    }

    pub fn edge_ids(&self) -> Box<dyn IdGenerator> {
        match self {
            IdStrategy::Sequential { edge_prefix, .. } => {
                Box::new(SequentialIdGenerator::new(edge_prefix.clone()))
            }
            IdStrategy::Ulid => Box::new(UlidIdGenerator::new("edge_")),
        }
    }

    /// Generators that will not reuse any of `existing` ids
    pub fn resume<'a, N, E>(
        &self,
        existing_nodes: N,
        existing_edges: E,
    ) -> (Box<dyn IdGenerator>, Box<dyn IdGenerator>)
    where
        N: IntoIterator<Item = &'a str>,
        E: IntoIterator<Item = &'a str>,
    {
        match self {
            IdStrategy::Sequential {
                node_prefix,
                edge_prefix,
            } => {
                let nodes: Box<dyn IdGenerator> = Box::new(
                    SequentialIdGenerator::from_existing_ids(node_prefix.clone(), existing_nodes),
                );
                let edges: Box<dyn IdGenerator> = Box::new(
                    SequentialIdGenerator::from_existing_ids(edge_prefix.clone(), existing_edges),
                );
                (nodes, edges)
            }
            IdStrategy::Ulid => (self.node_ids(), self.edge_ids()),
        }
    }
}

/// Editor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub id_strategy: IdStrategy,
    /// Id given to the start node of a fresh pipeline
    pub start_node_id: String,
    pub start_position: Position,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            id_strategy: IdStrategy::default(),
            start_node_id: "start".to_string(),
            start_position: Position::new(250.0, 25.0),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse engine config")
    }

    /// Load config from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from: {}", path.display()))
    }
}
