//! Persistence backend interface
//!
//! The engine mirrors every node and link change into an optional
//! [`GraphRepository`]. Mirroring is best effort: the in-memory graph stays
//! authoritative and a failing backend is only reported.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::types::{Link, SerializedNode};

/// Storage for nodes and links
pub trait GraphRepository: Send {
    /// Prepare the backend for use (create tables, directories, ...)
    fn create_schema(&mut self) -> Result<()>;

    /// Every stored node
    fn get_all_nodes(&mut self) -> Result<Vec<SerializedNode>>;

    /// Every stored link
    fn get_all_links(&mut self) -> Result<Vec<Link>>;

    fn add_node(&mut self, node: &SerializedNode) -> Result<()>;

    fn update_node(&mut self, node: &SerializedNode) -> Result<()>;

    fn delete_node(&mut self, node_id: &str) -> Result<()>;

    fn add_link(&mut self, link: &Link) -> Result<()>;

    fn delete_link(&mut self, link_id: &str) -> Result<()>;

    /// Remove every stored node and link
    fn drop_all(&mut self) -> Result<()>;
}

#[derive(Debug, Default)]
struct MemoryContents {
    nodes: Vec<SerializedNode>,
    links: Vec<Link>,
    schema_created: bool,
}

/// Repository kept in memory
///
/// Clones share the same contents, so a test can hand one clone to the
/// engine and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    inner: Arc<Mutex<MemoryContents>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-filled with a graph
    pub fn with_contents(nodes: Vec<SerializedNode>, links: Vec<Link>) -> Self {
        let repo = Self::new();
        {
            let mut inner = repo.inner.lock();
            inner.nodes = nodes;
            inner.links = links;
        }
        repo
    }

    /// Snapshot of the stored nodes
    pub fn nodes(&self) -> Vec<SerializedNode> {
        self.inner.lock().nodes.clone()
    }

    /// Snapshot of the stored links
    pub fn links(&self) -> Vec<Link> {
        self.inner.lock().links.clone()
    }

    /// Whether `create_schema` was called
    pub fn schema_created(&self) -> bool {
        self.inner.lock().schema_created
    }
}

impl GraphRepository for MemoryRepository {
    fn create_schema(&mut self) -> Result<()> {
        self.inner.lock().schema_created = true;
        Ok(())
    }

    fn get_all_nodes(&mut self) -> Result<Vec<SerializedNode>> {
        Ok(self.nodes())
    }

    fn get_all_links(&mut self) -> Result<Vec<Link>> {
        Ok(self.links())
    }

    fn add_node(&mut self, node: &SerializedNode) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.nodes.retain(|n| n.data.id != node.data.id);
        inner.nodes.push(node.clone());
        Ok(())
    }

    fn update_node(&mut self, node: &SerializedNode) -> Result<()> {
        let mut inner = self.inner.lock();
        match inner.nodes.iter_mut().find(|n| n.data.id == node.data.id) {
            Some(stored) => *stored = node.clone(),
            None => inner.nodes.push(node.clone()),
        }
        Ok(())
    }

    fn delete_node(&mut self, node_id: &str) -> Result<()> {
        self.inner.lock().nodes.retain(|n| n.data.id != node_id);
        Ok(())
    }

    fn add_link(&mut self, link: &Link) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.links.retain(|l| l.id != link.id);
        inner.links.push(link.clone());
        Ok(())
    }

    fn delete_link(&mut self, link_id: &str) -> Result<()> {
        self.inner.lock().links.retain(|l| l.id != link_id);
        Ok(())
    }

    fn drop_all(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.nodes.clear();
        inner.links.clear();
        Ok(())
    }
}
