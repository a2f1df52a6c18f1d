//! Graph document validation
//!
//! Checks id uniqueness, node types, link references and fan-in, and
//! detects feedback loops.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::registry::NodeRegistry;
use crate::types::{GraphDocument, Link, SerializedNode};

/// Validation error with location context
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The same id is used by two nodes or ports
    DuplicateId { id: String },
    /// A node has an unknown type (not in registry)
    UnknownNodeType { node_id: String, node_type: String },
    /// A link's output id is not an output of any node
    UnknownOutput { link_id: String, output_id: String },
    /// A link's input id is not an input of any node
    UnknownInput { link_id: String, input_id: String },
    /// More than one link targets the same input
    MultipleLinksToInput { input_id: String },
    /// Two links share an id
    DuplicateLinkId { link_id: String },
    /// The links form a feedback loop
    CycleDetected,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateId { id } => write!(f, "Id '{}' is used more than once", id),
            Self::UnknownNodeType { node_id, node_type } => {
                write!(f, "Unknown node type '{}' for node '{}'", node_type, node_id)
            }
            Self::UnknownOutput { link_id, output_id } => {
                write!(f, "Link '{}' references unknown output '{}'", link_id, output_id)
            }
            Self::UnknownInput { link_id, input_id } => {
                write!(f, "Link '{}' references unknown input '{}'", link_id, input_id)
            }
            Self::MultipleLinksToInput { input_id } => {
                write!(f, "Input '{}' has more than one incoming link", input_id)
            }
            Self::DuplicateLinkId { link_id } => {
                write!(f, "Link id '{}' is used more than once", link_id)
            }
            Self::CycleDetected => write!(f, "Cycle detected in graph"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a node collection
///
/// Returns all validation errors found (not just the first).
/// Pass a registry to enable node type validation.
pub fn validate_nodes(
    nodes: &[SerializedNode],
    registry: Option<&NodeRegistry>,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    validate_unique_ids(nodes, &mut errors);
    if let Some(reg) = registry {
        validate_node_types(nodes, reg, &mut errors);
    }

    errors
}

/// Validate a complete document: nodes, link references, fan-in and
/// feedback loops
pub fn validate_document(
    doc: &GraphDocument,
    registry: Option<&NodeRegistry>,
) -> Vec<ValidationError> {
    let mut errors = validate_nodes(&doc.nodes, registry);

    validate_links(doc, &mut errors);
    if detect_cycles(&doc.nodes, &doc.links) {
        errors.push(ValidationError::CycleDetected);
    }

    errors
}

/// Check that no id appears twice across nodes, inputs and outputs
fn validate_unique_ids(nodes: &[SerializedNode], errors: &mut Vec<ValidationError>) {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut reported: HashSet<&str> = HashSet::new();

    for node in nodes {
        let ids = std::iter::once(node.data.id.as_str()).chain(node.data.port_ids());
        for id in ids {
            if !seen.insert(id) && reported.insert(id) {
                errors.push(ValidationError::DuplicateId { id: id.to_string() });
            }
        }
    }
}

/// Check that all nodes have known types in the registry
fn validate_node_types(
    nodes: &[SerializedNode],
    registry: &NodeRegistry,
    errors: &mut Vec<ValidationError>,
) {
    for node in nodes {
        if !registry.has_node_type(&node.data.node_type) {
            errors.push(ValidationError::UnknownNodeType {
                node_id: node.data.id.clone(),
                node_type: node.data.node_type.clone(),
            });
        }
    }
}

/// Check link endpoints, link id uniqueness and fan-in
fn validate_links(doc: &GraphDocument, errors: &mut Vec<ValidationError>) {
    let outputs: HashSet<&str> = doc
        .nodes
        .iter()
        .flat_map(|n| n.data.outputs.iter().map(|p| p.id.as_str()))
        .collect();
    let inputs: HashSet<&str> = doc
        .nodes
        .iter()
        .flat_map(|n| n.data.inputs.iter().map(|p| p.id.as_str()))
        .collect();

    let mut link_ids: HashSet<&str> = HashSet::new();
    let mut fan_in: HashMap<&str, usize> = HashMap::new();

    for link in &doc.links {
        if !link_ids.insert(&link.id) {
            errors.push(ValidationError::DuplicateLinkId {
                link_id: link.id.clone(),
            });
        }
        if !outputs.contains(link.output_id.as_str()) {
            errors.push(ValidationError::UnknownOutput {
                link_id: link.id.clone(),
                output_id: link.output_id.clone(),
            });
        }
        if !inputs.contains(link.input_id.as_str()) {
            errors.push(ValidationError::UnknownInput {
                link_id: link.id.clone(),
                input_id: link.input_id.clone(),
            });
        }
        let count = fan_in.entry(&link.input_id).or_insert(0);
        *count += 1;
        if *count == 2 {
            errors.push(ValidationError::MultipleLinksToInput {
                input_id: link.input_id.clone(),
            });
        }
    }
}

/// Map every port id to the id of the node owning it
fn port_owners(nodes: &[SerializedNode]) -> HashMap<&str, &str> {
    let mut owners = HashMap::new();
    for node in nodes {
        for port_id in node.data.port_ids() {
            owners.insert(port_id, node.data.id.as_str());
        }
    }
    owners
}

/// Node-level edges `(source node, target node)` implied by the links.
/// Links with unknown endpoints are ignored.
pub fn node_edges<'a>(nodes: &'a [SerializedNode], links: &'a [Link]) -> Vec<(&'a str, &'a str)> {
    let owners = port_owners(nodes);
    links
        .iter()
        .filter_map(|link| {
            let from = owners.get(link.output_id.as_str())?;
            let to = owners.get(link.input_id.as_str())?;
            Some((*from, *to))
        })
        .collect()
}

/// Detect cycles using Kahn's algorithm (topological sort)
pub fn detect_cycles(nodes: &[SerializedNode], links: &[Link]) -> bool {
    let edges = node_edges(nodes, links);

    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    for node in nodes {
        in_degree.insert(&node.data.id, 0);
    }
    for (_, to) in &edges {
        *in_degree.entry(*to).or_insert(0) += 1;
    }

    let mut queue: VecDeque<&str> = in_degree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(&id, _)| id)
        .collect();

    let mut visited = 0;
    while let Some(node_id) = queue.pop_front() {
        visited += 1;
        for (from, to) in &edges {
            if *from == node_id {
                if let Some(deg) = in_degree.get_mut(to) {
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push_back(*to);
                    }
                }
            }
        }
    }

    visited < in_degree.len()
}

/// Whether adding an edge `from -> to` to the given node-level edges would
/// close a loop. A self edge always does.
pub fn would_create_cycle<'a>(
    edges: impl IntoIterator<Item = (&'a str, &'a str)>,
    from: &str,
    to: &str,
) -> bool {
    if from == to {
        return true;
    }

    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for (a, b) in edges {
        adjacency.entry(a).or_default().push(b);
    }

    // Is `from` reachable from `to`?
    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack = vec![to];
    while let Some(node) = stack.pop() {
        if node == from {
            return true;
        }
        if !visited.insert(node) {
            continue;
        }
        if let Some(next) = adjacency.get(node) {
            stack.extend(next.iter().copied());
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeData, NodeOptions, Port, PortDataType};

    fn make_node(id: &str, node_type: &str) -> SerializedNode {
        SerializedNode {
            data: NodeData {
                id: id.to_string(),
                node_type: node_type.to_string(),
                title: id.to_string(),
                position: (0.0, 0.0),
                size: (0.0, 0.0),
                inputs: vec![Port {
                    id: format!("{}-in", id),
                    ..Port::new("In", PortDataType::Text)
                }],
                outputs: vec![Port {
                    id: format!("{}-out", id),
                    ..Port::new("Out", PortDataType::Text)
                }],
                options: NodeOptions::default(),
            },
            state: serde_json::Value::Null,
        }
    }

    fn link(from: &str, to: &str) -> Link {
        Link::new(format!("{}-out", from), format!("{}-in", to))
    }

    fn doc(ids: &[&str], links: Vec<Link>) -> GraphDocument {
        GraphDocument {
            nodes: ids.iter().map(|id| make_node(id, "Logic/NOT")).collect(),
            links,
        }
    }

    #[test]
    fn test_valid_document() {
        let doc = doc(&["a", "b", "c"], vec![link("a", "b"), link("b", "c")]);
        let errors = validate_document(&doc, None);
        assert!(errors.is_empty(), "Expected no errors, got: {:?}", errors);
    }

    #[test]
    fn test_detect_cycle() {
        let doc = doc(&["a", "b"], vec![link("a", "b"), link("b", "a")]);
        let errors = validate_document(&doc, None);
        assert!(errors.contains(&ValidationError::CycleDetected));
    }

    #[test]
    fn test_self_loop_is_cycle() {
        let doc = doc(&["a"], vec![link("a", "a")]);
        assert!(detect_cycles(&doc.nodes, &doc.links));
    }

    #[test]
    fn test_duplicate_ids() {
        let mut doc = doc(&["a", "b"], Vec::new());
        doc.nodes[1].data.outputs[0].id = "a-in".to_string();

        let errors = validate_nodes(&doc.nodes, None);
        assert_eq!(
            errors,
            vec![ValidationError::DuplicateId {
                id: "a-in".to_string()
            }]
        );
    }

    #[test]
    fn test_unknown_node_type() {
        let registry = NodeRegistry::new();
        let nodes = vec![make_node("a", "Nope/Nothing")];
        let errors = validate_nodes(&nodes, Some(&registry));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::UnknownNodeType { .. })));
    }

    #[test]
    fn test_link_problems() {
        let dangling = Link::new("ghost-out", "a-in");
        let backwards = Link::new("a-in", "b-out");
        let doc = doc(
            &["a", "b", "c"],
            vec![link("a", "c"), link("b", "c"), dangling, backwards],
        );

        let errors = validate_document(&doc, None);
        assert!(errors.iter().any(|e| matches!(e, ValidationError::MultipleLinksToInput { input_id } if input_id == "c-in")));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::UnknownOutput { output_id, .. } if output_id == "ghost-out")));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::UnknownInput { input_id, .. } if input_id == "b-out")));
    }

    #[test]
    fn test_would_create_cycle() {
        let edges = vec![("a", "b"), ("b", "c")];
        assert!(would_create_cycle(edges.iter().copied(), "c", "a"));
        assert!(!would_create_cycle(edges.iter().copied(), "a", "c"));
        assert!(would_create_cycle(edges.iter().copied(), "b", "b"));
        assert!(!would_create_cycle(Vec::new(), "x", "y"));
    }

    #[test]
    fn test_collects_multiple_errors() {
        let registry = NodeRegistry::new();
        let doc = doc(&["a", "b"], vec![link("a", "b"), link("b", "a")]);
        let errors = validate_document(&doc, Some(&registry));
        // Both unknown types and the cycle
        assert_eq!(errors.len(), 3);
    }
}
