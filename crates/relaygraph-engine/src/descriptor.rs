//! Node variant descriptors
//!
//! A node variant describes itself through [`NodeType::metadata`]: its type
//! tag, palette category, title and port layout. The registry builds fresh
//! instances from this metadata, so the variant is the single source of
//! truth for both its behaviour and its shape.

use serde::{Deserialize, Serialize};

use crate::node::{Node, NodeLogic};
use crate::types::{NodeCategory, NodeData, NodeOptions, Port, PortDataType};

/// Trait tying a variant's metadata to its behaviour
///
/// # Example
///
/// ```ignore
/// use relaygraph_engine::{NodeCategory, NodeMetadata, NodeType, PortDataType, PortSpec};
///
/// impl NodeType for MyNode {
///     fn metadata() -> NodeMetadata {
///         NodeMetadata {
///             node_type: "Logic/My".to_string(),
///             category: NodeCategory::Logic,
///             title: "My".to_string(),
///             description: "Does something useful".to_string(),
///             inputs: vec![PortSpec::new("In", PortDataType::Logical)],
///             outputs: vec![PortSpec::new("Out", PortDataType::Logical)],
///             options: Default::default(),
///         }
///     }
/// }
/// ```
pub trait NodeType: NodeLogic + Default + Sized + 'static {
    /// Static metadata for this variant
    fn metadata() -> NodeMetadata;

    /// Fresh behaviour instance
    fn create() -> Box<dyn NodeLogic> {
        Box::new(Self::default())
    }
}

/// Complete metadata for a node variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    /// Type tag (e.g. "Logic/OR")
    pub node_type: String,
    /// Palette group
    pub category: NodeCategory,
    /// Default title for new instances
    pub title: String,
    /// What the node does
    pub description: String,
    /// Input layout
    pub inputs: Vec<PortSpec>,
    /// Output layout
    pub outputs: Vec<PortSpec>,
    /// Default options for new instances
    #[serde(default)]
    pub options: NodeOptions,
}

impl NodeMetadata {
    /// Build the data for a new instance: fresh ids everywhere, ports
    /// seeded with their default values
    pub fn instantiate_data(&self) -> NodeData {
        NodeData {
            id: crate::types::new_id(),
            node_type: self.node_type.clone(),
            title: self.title.clone(),
            position: (0.0, 0.0),
            size: (0.0, 0.0),
            inputs: self.inputs.iter().map(PortSpec::to_port).collect(),
            outputs: self.outputs.iter().map(PortSpec::to_port).collect(),
            options: self.options,
        }
    }

    /// Build a new instance with the given behaviour
    pub fn instantiate(&self, logic: Box<dyn NodeLogic>) -> Node {
        Node::new(self.instantiate_data(), logic)
    }
}

/// Layout of one port in a variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortSpec {
    /// Port name
    pub name: String,
    /// Advisory data type
    pub data_type: PortDataType,
    /// Initial value of new instances
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl PortSpec {
    pub fn new(name: impl Into<String>, data_type: PortDataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            default_value: None,
        }
    }

    /// Seed new instances with a value
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    fn to_port(&self) -> Port {
        Port {
            value: self.default_value.clone(),
            ..Port::new(self.name.clone(), self.data_type)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> NodeMetadata {
        NodeMetadata {
            node_type: "Math/Pow".to_string(),
            category: NodeCategory::Math,
            title: "Pow".to_string(),
            description: "Raises a to the power of b".to_string(),
            inputs: vec![
                PortSpec::new("A", PortDataType::Number),
                PortSpec::new("B", PortDataType::Number).with_default("2"),
            ],
            outputs: vec![PortSpec::new("Out", PortDataType::Number)],
            options: NodeOptions {
                reset_outputs_if_any_input_is_null: true,
            },
        }
    }

    #[test]
    fn test_instantiate_assigns_fresh_ids() {
        let meta = metadata();
        let a = meta.instantiate_data();
        let b = meta.instantiate_data();

        assert_ne!(a.id, b.id);
        assert_ne!(a.inputs[0].id, b.inputs[0].id);
        assert_ne!(a.inputs[0].id, a.inputs[1].id);
        assert_eq!(a.node_type, "Math/Pow");
        assert!(a.options.reset_outputs_if_any_input_is_null);
    }

    #[test]
    fn test_instantiate_seeds_defaults() {
        let data = metadata().instantiate_data();

        assert!(data.inputs[0].is_empty());
        assert_eq!(data.inputs[1].value.as_deref(), Some("2"));
        assert_eq!(data.inputs[1].name, "B");
        assert_eq!(data.outputs[0].data_type, PortDataType::Number);
    }

    #[test]
    fn test_metadata_serialization() {
        let json = serde_json::to_string(&metadata()).unwrap();
        assert!(json.contains("Math/Pow"));
        assert!(json.contains("nodeType")); // camelCase
        assert!(json.contains("defaultValue"));
    }
}
