use crate::error::Result;
use crate::id_generator::IdGenerator;
use crate::node::{NodeInstance, Position};
use crate::registry::NodeTypeRegistry;
use std::sync::Arc;

/// Builds node instances from registry entries.
///
/// The factory only produces values; inserting them is the graph's job.
pub struct NodeInstanceFactory {
    registry: Arc<NodeTypeRegistry>,
    ids: Box<dyn IdGenerator>,
}

impl NodeInstanceFactory {
    pub fn new(registry: Arc<NodeTypeRegistry>, ids: Box<dyn IdGenerator>) -> Self {
        Self { registry, ids }
    }

    pub fn registry(&self) -> &NodeTypeRegistry {
        &self.registry
    }

    /// Swap the id strategy (e.g. after loading a definition)
    pub fn set_id_generator(&mut self, ids: Box<dyn IdGenerator>) {
        self.ids = ids;
    }

    /// Create an instance of `type_id` at `position`.
    ///
    /// When `id` is `None` one is drawn from the generator; a caller-supplied
    /// id is not checked for uniqueness here.
    pub fn create_instance(
        &mut self,
        type_id: &str,
        position: Position,
        id: Option<String>,
    ) -> Result<NodeInstance> {
        let definition = self.registry.lookup(type_id)?;
        let id = match id {
            Some(id) => id,
            None => self.ids.next(),
        };

        Ok(NodeInstance {
            id,
            type_id: definition.type_id().to_string(),
            position,
            // Value::clone is a deep copy
            payload: definition.default_payload.clone(),
            selectable: definition.selectable,
            deletable: definition.deletable,
        })
    }
}
