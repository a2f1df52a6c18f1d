//! Repository backed by JSON files.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/nodes/<node id>.json
//! <root>/links/<link id>.json
//! <root>/order.json
//! ```
//!
//! `order.json` lists node and link ids in insertion order, which is the
//! tick order and fan-out order after a reload. Files missing from it (for
//! example added by hand) load last, sorted by file name.
//!
//! Every write goes straight to disk, so the directory survives restarts
//! and can be inspected or edited by hand while the engine is stopped.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::repository::GraphRepository;
use crate::types::{Link, SerializedNode};

const NODES_DIR: &str = "nodes";
const LINKS_DIR: &str = "links";
const ORDER_FILE: &str = "order.json";

/// Insertion order of stored entries
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredOrder {
    #[serde(default)]
    nodes: Vec<String>,
    #[serde(default)]
    links: Vec<String>,
}

impl StoredOrder {
    fn push(ids: &mut Vec<String>, id: &str) {
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
    }

    fn remove(ids: &mut Vec<String>, id: &str) {
        ids.retain(|existing| existing != id);
    }
}

/// Repository persisting one JSON file per node and per link.
///
/// # Example
///
/// ```ignore
/// use relaygraph_engine::{Engine, JsonFileRepository};
///
/// let engine = Engine::builder()
///     .repository(JsonFileRepository::new(".relaygraph/graph"))
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    root: PathBuf,
}

impl JsonFileRepository {
    /// Create a repository rooted at the given directory.
    ///
    /// Nothing touches the disk until `create_schema` is called.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory of this repository.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn nodes_dir(&self) -> PathBuf {
        self.root.join(NODES_DIR)
    }

    fn links_dir(&self) -> PathBuf {
        self.root.join(LINKS_DIR)
    }

    fn order_path(&self) -> PathBuf {
        self.root.join(ORDER_FILE)
    }

    fn read_order(&self) -> StoredOrder {
        let path = self.order_path();
        let Ok(content) = std::fs::read_to_string(&path) else {
            return StoredOrder::default();
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("Failed to parse {:?}, falling back to file name order: {}", path, e);
            StoredOrder::default()
        })
    }

    fn update_order(&self, f: impl FnOnce(&mut StoredOrder)) -> Result<()> {
        let mut order = self.read_order();
        f(&mut order);
        std::fs::create_dir_all(&self.root)?;
        std::fs::write(self.order_path(), serde_json::to_string_pretty(&order)?)?;
        Ok(())
    }

    fn write<T: Serialize>(&self, dir: &Path, id: &str, value: &T) -> Result<()> {
        check_file_id(id)?;
        std::fs::create_dir_all(dir)?;
        let file_path = dir.join(format!("{}.json", id));
        let content = serde_json::to_string_pretty(value)?;
        std::fs::write(&file_path, content)?;
        log::debug!("Saved '{}' to {:?}", id, file_path);
        Ok(())
    }

    fn delete(&self, dir: &Path, id: &str) -> Result<()> {
        check_file_id(id)?;
        let file_path = dir.join(format!("{}.json", id));
        if file_path.exists() {
            std::fs::remove_file(&file_path)?;
            log::debug!("Deleted '{}' from {:?}", id, file_path);
        }
        Ok(())
    }

    /// Read every entry of a directory in stored order. Unparseable files
    /// are skipped with a warning.
    fn read_all<T: DeserializeOwned>(&self, dir: &Path, order: &[String]) -> Result<Vec<T>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let file_path = entry?.path();
            if file_path.extension().map_or(false, |e| e == "json") {
                paths.push(file_path);
            }
        }
        let position = |path: &Path| {
            path.file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|id| order.iter().position(|o| o == id))
                .unwrap_or(usize::MAX)
        };
        paths.sort_by(|a, b| {
            position(a.as_path())
                .cmp(&position(b.as_path()))
                .then_with(|| a.cmp(b))
        });

        let mut items = Vec::with_capacity(paths.len());
        for file_path in paths {
            let content = std::fs::read_to_string(&file_path)?;
            match serde_json::from_str::<T>(&content) {
                Ok(item) => items.push(item),
                Err(e) => log::warn!("Failed to parse {:?}: {}", file_path, e),
            }
        }
        Ok(items)
    }
}

/// Ids become file names, so they must not escape the directory
fn check_file_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '\\', '\0']);
    if valid {
        Ok(())
    } else {
        Err(EngineError::repository(format!("id '{}' cannot be used as a file name", id)))
    }
}

impl GraphRepository for JsonFileRepository {
    fn create_schema(&mut self) -> Result<()> {
        std::fs::create_dir_all(self.nodes_dir())?;
        std::fs::create_dir_all(self.links_dir())?;
        log::info!("Graph repository ready at {:?}", self.root);
        Ok(())
    }

    fn get_all_nodes(&mut self) -> Result<Vec<SerializedNode>> {
        let order = self.read_order();
        let nodes: Vec<SerializedNode> = self.read_all(&self.nodes_dir(), &order.nodes)?;
        log::info!("Loaded {} nodes from {:?}", nodes.len(), self.root);
        Ok(nodes)
    }

    fn get_all_links(&mut self) -> Result<Vec<Link>> {
        let order = self.read_order();
        let links: Vec<Link> = self.read_all(&self.links_dir(), &order.links)?;
        log::info!("Loaded {} links from {:?}", links.len(), self.root);
        Ok(links)
    }

    fn add_node(&mut self, node: &SerializedNode) -> Result<()> {
        self.write(&self.nodes_dir(), &node.data.id, node)?;
        self.update_order(|order| StoredOrder::push(&mut order.nodes, &node.data.id))
    }

    fn update_node(&mut self, node: &SerializedNode) -> Result<()> {
        self.write(&self.nodes_dir(), &node.data.id, node)
    }

    fn delete_node(&mut self, node_id: &str) -> Result<()> {
        self.delete(&self.nodes_dir(), node_id)?;
        self.update_order(|order| StoredOrder::remove(&mut order.nodes, node_id))
    }

    fn add_link(&mut self, link: &Link) -> Result<()> {
        self.write(&self.links_dir(), &link.id, link)?;
        self.update_order(|order| StoredOrder::push(&mut order.links, &link.id))
    }

    fn delete_link(&mut self, link_id: &str) -> Result<()> {
        self.delete(&self.links_dir(), link_id)?;
        self.update_order(|order| StoredOrder::remove(&mut order.links, link_id))
    }

    fn drop_all(&mut self) -> Result<()> {
        for dir in [self.nodes_dir(), self.links_dir()] {
            if dir.exists() {
                std::fs::remove_dir_all(&dir)?;
            }
            std::fs::create_dir_all(&dir)?;
        }
        self.update_order(|order| *order = StoredOrder::default())?;
        log::debug!("Dropped all graph files under {:?}", self.root);
        Ok(())
    }
}
