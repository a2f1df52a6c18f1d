//! Node type registry
//!
//! Maps type tags to metadata and factories. The engine uses it to create
//! fresh nodes and to rebuild the concrete variant behind every serialized
//! node it loads.
//!
//! # Usage
//!
//! ```ignore
//! use relaygraph_engine::NodeRegistry;
//!
//! // Every variant linked into the binary
//! let mut registry = NodeRegistry::with_builtins();
//! registry.register::<MyNode>(); // Add plugin nodes
//! ```

use std::collections::HashMap;

use crate::descriptor::{NodeMetadata, NodeType};
use crate::error::{EngineError, Result};
use crate::node::{Node, NodeLogic};
use crate::types::{NodeCategory, SerializedNode};

/// Link-time registration of a node variant
///
/// Both fields are plain function pointers so the entry can be built in a
/// `static` context.
///
/// # Example
///
/// ```ignore
/// inventory::submit! {
///     relaygraph_engine::NodeFactory {
///         metadata: LogicOrNode::metadata,
///         create: LogicOrNode::create,
///     }
/// }
/// ```
#[derive(Clone, Copy)]
pub struct NodeFactory {
    /// Metadata of the variant
    pub metadata: fn() -> NodeMetadata,
    /// Creates a fresh behaviour instance
    pub create: fn() -> Box<dyn NodeLogic>,
}

inventory::collect!(NodeFactory);

struct RegistryEntry {
    metadata: NodeMetadata,
    create: fn() -> Box<dyn NodeLogic>,
}

/// Registry of node variants keyed by type tag
pub struct NodeRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Create a registry holding every variant submitted through `inventory`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for factory in inventory::iter::<NodeFactory> {
            registry.register_factory(*factory);
        }
        log::debug!("Registered {} built-in node types", registry.entries.len());
        registry
    }

    /// Register a variant by type
    pub fn register<T: NodeType>(&mut self) {
        self.register_factory(NodeFactory {
            metadata: T::metadata,
            create: T::create,
        });
    }

    /// Register a variant from its factory. A later registration of the same
    /// type tag replaces the earlier one.
    pub fn register_factory(&mut self, factory: NodeFactory) {
        let metadata = (factory.metadata)();
        if self.entries.contains_key(&metadata.node_type) {
            log::warn!("Node type '{}' registered twice, replacing", metadata.node_type);
        }
        self.entries.insert(
            metadata.node_type.clone(),
            RegistryEntry {
                metadata,
                create: factory.create,
            },
        );
    }

    /// Get metadata for a node type
    pub fn get_metadata(&self, node_type: &str) -> Option<&NodeMetadata> {
        self.entries.get(node_type).map(|e| &e.metadata)
    }

    /// Get all registered metadata
    pub fn all_metadata(&self) -> Vec<&NodeMetadata> {
        self.entries.values().map(|e| &e.metadata).collect()
    }

    /// Get metadata grouped by category
    pub fn metadata_by_category(&self) -> HashMap<NodeCategory, Vec<&NodeMetadata>> {
        let mut grouped: HashMap<NodeCategory, Vec<&NodeMetadata>> = HashMap::new();
        for entry in self.entries.values() {
            grouped
                .entry(entry.metadata.category)
                .or_default()
                .push(&entry.metadata);
        }
        grouped
    }

    /// Check if a node type is registered
    pub fn has_node_type(&self, node_type: &str) -> bool {
        self.entries.contains_key(node_type)
    }

    /// List all registered type tags
    pub fn node_types(&self) -> Vec<&str> {
        self.entries.keys().map(|s| s.as_str()).collect()
    }

    /// Merge another registry into this one
    ///
    /// Entries from `other` override entries in `self` if they share the same type tag.
    pub fn merge(&mut self, other: NodeRegistry) {
        self.entries.extend(other.entries);
    }

    /// Create a new node of the given type with fresh ids
    pub fn instantiate(&self, node_type: &str) -> Result<Node> {
        let entry = self
            .entries
            .get(node_type)
            .ok_or_else(|| EngineError::UnknownNodeType(node_type.to_string()))?;
        Ok(entry.metadata.instantiate((entry.create)()))
    }

    /// Rebuild a node from its serialized form, keeping every id
    pub fn restore(&self, node: SerializedNode) -> Result<Node> {
        let entry = self
            .entries
            .get(&node.data.node_type)
            .ok_or_else(|| EngineError::UnknownNodeType(node.data.node_type.clone()))?;
        let mut logic = (entry.create)();
        if !node.state.is_null() {
            logic.load_state(&node.state)?;
        }
        Ok(Node::new(node.data, logic))
    }

    /// Fresh behaviour for an existing type tag
    pub(crate) fn create_logic(&self, node_type: &str) -> Result<Box<dyn NodeLogic>> {
        self.entries
            .get(node_type)
            .map(|e| (e.create)())
            .ok_or_else(|| EngineError::UnknownNodeType(node_type.to_string()))
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeContext;
    use crate::types::{NodeOptions, PortDataType};
    use crate::PortSpec;

    #[derive(Default)]
    struct Counter {
        count: u64,
    }

    impl NodeLogic for Counter {
        fn tick(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
            self.count += 1;
            ctx.set_output_value(0, self.count.to_string());
            Ok(())
        }

        fn save_state(&self) -> serde_json::Value {
            serde_json::json!({ "count": self.count })
        }

        fn load_state(&mut self, state: &serde_json::Value) -> Result<()> {
            self.count = state
                .get("count")
                .and_then(|v| v.as_u64())
                .ok_or_else(|| EngineError::failed("count missing"))?;
            Ok(())
        }
    }

    impl NodeType for Counter {
        fn metadata() -> NodeMetadata {
            NodeMetadata {
                node_type: "Test/Counter".to_string(),
                category: NodeCategory::Other,
                title: "Counter".to_string(),
                description: "Counts ticks".to_string(),
                inputs: Vec::new(),
                outputs: vec![PortSpec::new("Count", PortDataType::Number)],
                options: NodeOptions::default(),
            }
        }
    }

    fn test_metadata(node_type: &str, category: NodeCategory) -> NodeMetadata {
        NodeMetadata {
            node_type: node_type.to_string(),
            category,
            title: format!("Test {}", node_type),
            description: "Test node".to_string(),
            inputs: vec![PortSpec::new("In", PortDataType::Text)],
            outputs: vec![PortSpec::new("Out", PortDataType::Text)],
            options: NodeOptions::default(),
        }
    }

    struct Noop;
    impl NodeLogic for Noop {}

    fn noop() -> Box<dyn NodeLogic> {
        Box::new(Noop)
    }

    fn registry_with(types: &[(&'static str, NodeCategory)]) -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        for (node_type, category) in types {
            registry.entries.insert(
                node_type.to_string(),
                RegistryEntry {
                    metadata: test_metadata(node_type, *category),
                    create: noop,
                },
            );
        }
        registry
    }

    #[test]
    fn test_register_and_lookup_metadata() {
        let mut registry = NodeRegistry::new();
        registry.register::<Counter>();

        assert!(registry.has_node_type("Test/Counter"));
        assert!(!registry.has_node_type("unknown"));
        assert_eq!(registry.get_metadata("Test/Counter").unwrap().title, "Counter");
    }

    #[test]
    fn test_merge_override() {
        let mut registry1 = registry_with(&[("a", NodeCategory::Logic)]);
        let mut registry2 = registry_with(&[("a", NodeCategory::Math), ("b", NodeCategory::Math)]);
        registry2.entries.get_mut("a").unwrap().metadata.title = "Override".to_string();

        registry1.merge(registry2);
        assert_eq!(registry1.all_metadata().len(), 2);
        assert_eq!(registry1.get_metadata("a").unwrap().title, "Override");
    }

    #[test]
    fn test_metadata_by_category() {
        let registry = registry_with(&[
            ("Logic/OR", NodeCategory::Logic),
            ("Logic/AND", NodeCategory::Logic),
            ("Math/Pow", NodeCategory::Math),
        ]);

        let grouped = registry.metadata_by_category();
        assert_eq!(grouped.get(&NodeCategory::Logic).unwrap().len(), 2);
        assert_eq!(grouped.get(&NodeCategory::Math).unwrap().len(), 1);
        assert!(grouped.get(&NodeCategory::Ui).is_none());
    }

    #[test]
    fn test_instantiate_unknown_type() {
        let registry = NodeRegistry::new();
        let result = registry.instantiate("Nope/Nothing");
        assert!(matches!(result, Err(EngineError::UnknownNodeType(t)) if t == "Nope/Nothing"));
    }

    #[test]
    fn test_restore_keeps_ids_and_state() {
        let mut registry = NodeRegistry::new();
        registry.register::<Counter>();

        let node = registry.instantiate("Test/Counter").unwrap();
        let mut serialized = node.to_serialized();
        serialized.state = serde_json::json!({ "count": 41 });

        let restored = registry.restore(serialized.clone()).unwrap();
        assert_eq!(restored.id(), node.id());
        assert_eq!(restored.outputs()[0].id, node.outputs()[0].id);
        assert_eq!(restored.logic::<Counter>().unwrap().count, 41);
    }

    #[test]
    fn test_restore_rejects_bad_state() {
        let mut registry = NodeRegistry::new();
        registry.register::<Counter>();

        let mut serialized = registry.instantiate("Test/Counter").unwrap().to_serialized();
        serialized.state = serde_json::json!({ "other": true });

        assert!(registry.restore(serialized).is_err());
    }
}
