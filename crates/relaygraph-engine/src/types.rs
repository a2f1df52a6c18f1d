//! Core types for logic graphs
//!
//! These types define the structure of a logic graph: nodes, the ports
//! they own, the links between ports, and the serialized document form.

use serde::{Deserialize, Serialize};

/// Unique identifier for a node
pub type NodeId = String;

/// Unique identifier for a link
pub type LinkId = String;

/// Unique identifier for a port
pub type PortId = String;

/// Generate a fresh globally unique id
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// The advisory data type of a port
///
/// The engine never enforces it; node implementations that parse their
/// inputs decide what to do with malformed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortDataType {
    /// Accepts any value
    Any,
    /// Free text
    #[default]
    Text,
    /// "0" or "1"
    Logical,
    /// Decimal number
    Number,
    /// Hex RGB colour, with or without a leading '#'
    Color,
}

/// A named, typed value cell owned by exactly one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    /// Globally unique identifier for this port
    pub id: PortId,
    /// Human-readable name
    pub name: String,
    /// Advisory data type
    #[serde(default)]
    pub data_type: PortDataType,
    /// Current value; `None` means the port holds no value
    #[serde(default)]
    pub value: Option<String>,
}

/// An input port
pub type Input = Port;

/// An output port
pub type Output = Port;

impl Port {
    /// Create an empty port with a fresh id
    pub fn new(name: impl Into<String>, data_type: PortDataType) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            data_type,
            value: None,
        }
    }

    /// Set the initial value of this port
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Whether the port holds no value
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }
}

/// Per-node behaviour options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeOptions {
    /// Force every output to no-value, and skip the node's input handler,
    /// whenever any input holds no value
    #[serde(default)]
    pub reset_outputs_if_any_input_is_null: bool,
}

/// Category of a node, used to group variants in an editor palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    /// Boolean logic
    Logic,
    /// Arithmetic
    Math,
    /// Event and timing operations
    Operation,
    /// Colour manipulation
    Color,
    /// Dashboard widgets driven from the web UI
    Ui,
    /// Anything else
    Other,
}

/// The serializable part of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    /// Unique identifier for this node instance
    pub id: NodeId,
    /// Type tag used to reconstruct the concrete variant
    #[serde(rename = "type")]
    pub node_type: String,
    /// Display title
    pub title: String,
    /// Position in the editor (x, y)
    #[serde(default)]
    pub position: (f64, f64),
    /// Size in the editor (width, height)
    #[serde(default)]
    pub size: (f64, f64),
    /// Ordered input ports
    #[serde(default)]
    pub inputs: Vec<Input>,
    /// Ordered output ports
    #[serde(default)]
    pub outputs: Vec<Output>,
    /// Behaviour options
    #[serde(default)]
    pub options: NodeOptions,
}

impl NodeData {
    /// Ids of every port this node owns
    pub fn port_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.inputs
            .iter()
            .chain(self.outputs.iter())
            .map(|p| p.id.as_str())
    }

    /// Whether this node owns the given port id
    pub fn owns_port(&self, port_id: &str) -> bool {
        self.port_ids().any(|id| id == port_id)
    }
}

/// A node as it appears in a graph document or the repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedNode {
    #[serde(flatten)]
    pub data: NodeData,
    /// Variant-owned state (e.g. a switch's held value)
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub state: serde_json::Value,
}

/// A directed link from one output to one input
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    /// Unique identifier for this link
    pub id: LinkId,
    /// Source output port
    pub output_id: PortId,
    /// Target input port
    pub input_id: PortId,
}

impl Link {
    /// Create a link with a fresh id
    pub fn new(output_id: impl Into<String>, input_id: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            output_id: output_id.into(),
            input_id: input_id.into(),
        }
    }

    /// Whether this link touches the given port
    pub fn touches(&self, port_id: &str) -> bool {
        self.output_id == port_id || self.input_id == port_id
    }
}

/// A complete graph: both collections in one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDocument {
    /// Nodes in the graph
    #[serde(default)]
    pub nodes: Vec<SerializedNode>,
    /// Links between node ports
    #[serde(default)]
    pub links: Vec<Link>,
}

impl GraphDocument {
    /// Find a node by ID
    pub fn find_node(&self, id: &str) -> Option<&SerializedNode> {
        self.nodes.iter().find(|n| n.data.id == id)
    }

    /// Find the node owning a port
    pub fn port_owner(&self, port_id: &str) -> Option<&SerializedNode> {
        self.nodes.iter().find(|n| n.data.owns_port(port_id))
    }
}
