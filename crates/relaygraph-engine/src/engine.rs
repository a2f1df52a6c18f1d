//! The graph engine
//!
//! [`Engine`] is a cheap-to-clone handle onto one live graph. Every public
//! operation locks the graph for its full duration, including any cascade
//! it triggers, mirrors the resulting changes into the repository, and then
//! delivers the resulting events to the observers on the calling thread
//! after the lock is released. Observers may therefore call back into the
//! engine, except for [`Engine::tick`], whose pass is still in progress
//! while events from it are delivered.
//!
//! # Example
//!
//! ```ignore
//! use relaygraph_engine::{Engine, MemoryRepository};
//!
//! let engine = Engine::builder()
//!     .repository(MemoryRepository::new())
//!     .build()?;
//!
//! let switch = engine.create_node("UI/Switch")?;
//! let lamp = engine.create_node("Logic/NOT")?;
//! engine.add_link(&switch_output, &lamp_input)?;
//! engine.start();
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::events::{EngineEvent, EventSink};
use crate::graph::{Effects, GraphState, RepoWrite};
use crate::node::{Node, NodeContext, NodeLogic};
use crate::registry::NodeRegistry;
use crate::repository::GraphRepository;
use crate::scheduler::Scheduler;
use crate::types::{GraphDocument, Input, Link, NodeId, Output, SerializedNode};
use crate::validation::validate_nodes;

/// A node whose tick failed during a pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickFailure {
    pub node_id: NodeId,
    pub node_type: String,
    pub error: String,
}

/// Summary of one tick pass
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Nodes ticked
    pub ticked: usize,
    /// Nodes whose tick, or the cascade it started, failed
    pub failures: Vec<TickFailure>,
    /// Wall time of the pass
    pub elapsed: Duration,
}

/// Counters describing the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    pub nodes: usize,
    pub links: usize,
    pub started: bool,
    /// Completed tick passes
    pub tick_passes: u64,
    /// Failed node ticks across all passes
    pub tick_failures: u64,
}

pub(crate) struct EngineShared {
    state: Mutex<GraphState>,
    registry: Arc<NodeRegistry>,
    repository: Option<Mutex<Box<dyn GraphRepository>>>,
    observers: RwLock<Vec<Arc<dyn EventSink>>>,
    config: EngineConfig,
    update_interval_ms: AtomicU64,
    scheduler: Mutex<Scheduler>,
    runtime: Option<Handle>,
    /// Held for a whole tick pass so passes never overlap
    tick_gate: Mutex<()>,
    tick_passes: AtomicU64,
    tick_failures: AtomicU64,
}

impl EngineShared {
    pub(crate) fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms.load(Ordering::SeqCst))
    }
}

/// Builder for [`Engine`]
pub struct EngineBuilder {
    config: EngineConfig,
    registry: Option<Arc<NodeRegistry>>,
    repository: Option<Box<dyn GraphRepository>>,
    runtime: Option<Handle>,
    sinks: Vec<Arc<dyn EventSink>>,
}

impl EngineBuilder {
    fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            registry: None,
            repository: None,
            runtime: None,
            sinks: Vec::new(),
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Node variants available to the engine. Defaults to
    /// [`NodeRegistry::with_builtins`].
    pub fn registry(mut self, registry: NodeRegistry) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    /// Share a registry with other engines
    pub fn shared_registry(mut self, registry: Arc<NodeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Mirror the graph into a repository, loading its contents at build
    pub fn repository(mut self, repository: impl GraphRepository + 'static) -> Self {
        self.repository = Some(Box::new(repository));
        self
    }

    /// Runtime hosting the scheduler. Defaults to the runtime of the
    /// calling context, if any; without one the host drives
    /// [`Engine::tick`] itself.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Register an observer from the start
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn build(self) -> Result<Engine> {
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(NodeRegistry::with_builtins()));
        let mut state = GraphState::new(self.config.cycle_policy);

        let repository = match self.repository {
            Some(mut repository) => {
                repository.create_schema()?;
                let stored_nodes = repository.get_all_nodes()?;
                let stored_links = repository.get_all_links()?;

                let mut nodes = Vec::with_capacity(stored_nodes.len());
                for stored in stored_nodes {
                    let node_id = stored.data.id.clone();
                    match registry.restore(stored) {
                        Ok(node) => nodes.push(node),
                        Err(e) => log::warn!("Skipping stored node {}: {}", node_id, e),
                    }
                }
                state.load_stored(nodes, stored_links);
                log::info!(
                    "Loaded {} nodes and {} links from repository",
                    state.nodes.len(),
                    state.links.len()
                );
                Some(Mutex::new(repository))
            }
            None => None,
        };

        Ok(Engine::assemble(
            self.config,
            registry,
            state,
            repository,
            self.runtime,
            self.sinks,
        ))
    }
}

/// Handle onto a live graph
#[derive(Clone)]
pub struct Engine {
    shared: Arc<EngineShared>,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// In-memory engine with default configuration
    pub fn new(registry: NodeRegistry) -> Self {
        let config = EngineConfig::default();
        let state = GraphState::new(config.cycle_policy);
        Self::assemble(config, Arc::new(registry), state, None, None, Vec::new())
    }

    fn assemble(
        config: EngineConfig,
        registry: Arc<NodeRegistry>,
        state: GraphState,
        repository: Option<Mutex<Box<dyn GraphRepository>>>,
        runtime: Option<Handle>,
        sinks: Vec<Arc<dyn EventSink>>,
    ) -> Self {
        let runtime = runtime.or_else(|| Handle::try_current().ok());
        if runtime.is_none() {
            log::debug!("No tokio runtime available, ticks must be driven manually");
        }

        Self {
            shared: Arc::new(EngineShared {
                state: Mutex::new(state),
                registry,
                repository,
                observers: RwLock::new(sinks),
                update_interval_ms: AtomicU64::new(config.update_interval_ms),
                config,
                scheduler: Mutex::new(Scheduler::default()),
                runtime,
                tick_gate: Mutex::new(()),
                tick_passes: AtomicU64::new(0),
                tick_failures: AtomicU64::new(0),
            }),
        }
    }

    pub(crate) fn from_shared(shared: Arc<EngineShared>) -> Self {
        Self { shared }
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.shared.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Register an observer
    pub fn subscribe(&self, sink: Arc<dyn EventSink>) {
        self.shared.observers.write().push(sink);
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    /// Run an operation under the graph lock, persist what it changed, then
    /// notify the observers
    fn mutate<R>(&self, op: impl FnOnce(&mut GraphState, &mut Effects) -> R) -> R {
        let mut fx = Effects::default();
        let result = {
            let mut state = self.shared.state.lock();
            let result = op(&mut state, &mut fx);
            // Lock order: state, then repository
            self.persist(&mut fx);
            result
        };
        self.deliver(fx.events);
        result
    }

    fn read<R>(&self, f: impl FnOnce(&GraphState) -> R) -> R {
        f(&self.shared.state.lock())
    }

    fn persist(&self, fx: &mut Effects) {
        let writes = std::mem::take(&mut fx.writes);
        let Some(repository) = &self.shared.repository else {
            return;
        };
        if writes.is_empty() {
            return;
        }

        let mut repository = repository.lock();
        for write in writes {
            let result = match &write {
                RepoWrite::AddNode(node) => repository.add_node(node),
                RepoWrite::UpdateNode(node) => repository.update_node(node),
                RepoWrite::DeleteNode(id) => repository.delete_node(id),
                RepoWrite::AddLink(link) => repository.add_link(link),
                RepoWrite::DeleteLink(id) => repository.delete_link(id),
                RepoWrite::DropAll => repository.drop_all(),
            };
            if let Err(e) = result {
                let message = format!("Repository write failed: {}", e);
                log::warn!("{} ({:?})", message, write);
                fx.emit(EngineEvent::engine_debug(message));
            }
        }
    }

    fn deliver(&self, events: Vec<EngineEvent>) {
        if events.is_empty() {
            return;
        }
        let sinks: Vec<Arc<dyn EventSink>> = self.shared.observers.read().clone();
        for event in events {
            for sink in &sinks {
                if let Err(e) = sink.send(event.clone()) {
                    log::debug!("Event not delivered: {}", e);
                }
            }
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start ticking and propagating. Linked inputs are first refreshed from
    /// their source outputs.
    pub fn start(&self) {
        self.mutate(|state, fx| state.set_started(true, fx));
        if let Some(runtime) = &self.shared.runtime {
            self.shared
                .scheduler
                .lock()
                .start(runtime, Arc::downgrade(&self.shared));
        }
        log::info!("Engine started");
    }

    /// Stop ticking. Values written while stopped stay where they were
    /// written.
    pub fn stop(&self) {
        self.shared.scheduler.lock().stop();
        self.mutate(|state, fx| state.set_started(false, fx));
        log::info!("Engine stopped");
    }

    pub fn is_started(&self) -> bool {
        self.read(|state| state.started)
    }

    /// Change the pause between scheduler passes
    pub fn set_update_interval(&self, interval: Duration) {
        let ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self.shared.update_interval_ms.store(ms, Ordering::SeqCst);
        log::debug!("Update interval set to {}ms", ms);
    }

    pub fn update_interval(&self) -> Duration {
        self.shared.update_interval()
    }

    /// Run one tick pass over a snapshot of the node list
    ///
    /// Nodes removed while the pass runs are skipped; nodes added are picked
    /// up by the next pass. A failing node never stops the pass.
    pub fn tick(&self) -> TickReport {
        let _gate = self.shared.tick_gate.lock();
        let began = Instant::now();
        let threshold = self.shared.config.slow_tick_threshold();

        let node_ids: Vec<NodeId> = {
            let state = self.shared.state.lock();
            if !state.started {
                return TickReport::default();
            }
            state.nodes.iter().map(|n| n.id().to_string()).collect()
        };

        let mut report = TickReport::default();
        for node_id in node_ids {
            let outcome = self.mutate(|state, fx| {
                if !state.started {
                    return None;
                }
                state.tick_node(&node_id, threshold, fx)
            });
            let Some(outcome) = outcome else {
                continue;
            };

            report.ticked += 1;
            log::trace!("Ticked {} in {:?}", node_id, outcome.elapsed);
            let errors = outcome
                .error
                .into_iter()
                .chain(outcome.cascade.err())
                .collect::<Vec<_>>();
            for error in errors {
                self.shared.tick_failures.fetch_add(1, Ordering::SeqCst);
                report.failures.push(TickFailure {
                    node_id: node_id.clone(),
                    node_type: outcome.node_type.clone(),
                    error: error.to_string(),
                });
            }
        }

        self.shared.tick_passes.fetch_add(1, Ordering::SeqCst);
        report.elapsed = began.elapsed();
        if !report.failures.is_empty() {
            log::debug!(
                "Tick pass finished with {} failures in {:?}",
                report.failures.len(),
                report.elapsed
            );
        }
        report
    }

    pub fn stats(&self) -> EngineStats {
        let (nodes, links, started) =
            self.read(|state| (state.nodes.len(), state.links.len(), state.started));
        EngineStats {
            nodes,
            links,
            started,
            tick_passes: self.shared.tick_passes.load(Ordering::SeqCst),
            tick_failures: self.shared.tick_failures.load(Ordering::SeqCst),
        }
    }

    // =========================================================================
    // Nodes
    // =========================================================================

    /// Add a node built by the caller
    pub fn add_node(&self, node: Node) -> Result<()> {
        self.mutate(|state, fx| state.insert_node(node, fx))
    }

    /// Create a node of a registered type and add it. Returns its id.
    pub fn create_node(&self, node_type: &str) -> Result<NodeId> {
        let node = self.shared.registry.instantiate(node_type)?;
        let node_id = node.id().to_string();
        self.add_node(node)?;
        Ok(node_id)
    }

    /// Remove a node and every link touching it
    pub fn remove_node(&self, node_id: &str) -> Result<()> {
        self.mutate(|state, fx| state.remove_node(node_id, fx).map(|_| ()))
    }

    /// Overwrite a node's data in place. The variant is rebuilt only when
    /// the type tag changes; links to ports that no longer exist are
    /// deleted.
    pub fn update_node(&self, node: SerializedNode) -> Result<()> {
        let registry = self.shared.registry.clone();
        self.mutate(|state, fx| state.update_node(node, &registry, fx))
    }

    /// Set an input's value, and optionally its name, without running hooks
    pub fn update_input(
        &self,
        input_id: &str,
        value: Option<String>,
        name: Option<String>,
    ) -> Result<()> {
        self.mutate(|state, fx| state.update_input(input_id, value, name, fx))
    }

    /// Set an output's value, and optionally its name, without propagating
    pub fn update_output(
        &self,
        output_id: &str,
        value: Option<String>,
        name: Option<String>,
    ) -> Result<()> {
        self.mutate(|state, fx| state.update_output(output_id, value, name, fx))
    }

    // =========================================================================
    // Links
    // =========================================================================

    /// Link an output to an input. An existing link into the input is
    /// replaced. While started the output value flows through immediately.
    pub fn add_link(&self, output_id: &str, input_id: &str) -> Result<Link> {
        self.mutate(|state, fx| state.add_link(output_id, input_id, None, fx))
    }

    pub fn delete_link(&self, output_id: &str, input_id: &str) -> Result<()> {
        self.mutate(|state, fx| state.delete_link(output_id, input_id, fx).map(|_| ()))
    }

    pub fn delete_link_by_id(&self, link_id: &str) -> Result<()> {
        self.mutate(|state, fx| state.delete_link_by_id(link_id, fx).map(|_| ()))
    }

    // =========================================================================
    // Values
    // =========================================================================

    /// Write an output and propagate it
    pub fn set_output(&self, output_id: &str, value: Option<String>) -> Result<()> {
        self.mutate(|state, fx| state.set_output(output_id, value, fx))
    }

    /// Propagate an output's current value. Does nothing while stopped.
    pub fn on_output_change(&self, output_id: &str) -> Result<()> {
        self.mutate(|state, fx| state.on_output_change(output_id, fx))
    }

    /// Write an input and run its owner's input handler
    pub fn set_input(&self, input_id: &str, value: Option<String>) -> Result<()> {
        self.mutate(|state, fx| state.set_input(input_id, value, fx))
    }

    /// Run the owner's input handler for an input's current value. Does
    /// nothing while stopped.
    pub fn on_input_change(&self, input_id: &str) -> Result<()> {
        self.mutate(|state, fx| state.on_input_change(input_id, fx))
    }

    /// Drive a node through its concrete variant
    ///
    /// Outputs the closure changes through the context are propagated
    /// afterwards, exactly as if a hook had changed them.
    ///
    /// ```ignore
    /// engine.with_node(&switch_id, |switch: &mut UiSwitchNode, ctx| switch.toggle(ctx))?;
    /// ```
    pub fn with_node<T, R>(
        &self,
        node_id: &str,
        f: impl FnOnce(&mut T, &mut NodeContext<'_>) -> R,
    ) -> Result<R>
    where
        T: NodeLogic + 'static,
    {
        self.mutate(|state, fx| state.with_node::<T, R>(node_id, f, fx))
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn node(&self, node_id: &str) -> Option<SerializedNode> {
        self.read(|state| state.node(node_id).map(Node::to_serialized))
    }

    pub fn nodes(&self) -> Vec<SerializedNode> {
        self.read(|state| state.serialized_nodes())
    }

    pub fn input(&self, input_id: &str) -> Option<Input> {
        self.read(|state| state.input(input_id).cloned())
    }

    pub fn output(&self, output_id: &str) -> Option<Output> {
        self.read(|state| state.output(output_id).cloned())
    }

    pub fn link(&self, link_id: &str) -> Option<Link> {
        self.read(|state| state.link(link_id).cloned())
    }

    pub fn links(&self) -> Vec<Link> {
        self.read(|state| state.links.clone())
    }

    pub fn input_owner(&self, input_id: &str) -> Option<SerializedNode> {
        self.read(|state| state.input_owner(input_id).map(Node::to_serialized))
    }

    pub fn output_owner(&self, output_id: &str) -> Option<SerializedNode> {
        self.read(|state| state.output_owner(output_id).map(Node::to_serialized))
    }

    /// Links into the node's inputs followed by links out of its outputs
    pub fn links_for_node(&self, node_id: &str) -> Vec<Link> {
        self.read(|state| {
            state
                .node(node_id)
                .map(|node| state.links_for_node(node))
                .unwrap_or_default()
        })
    }

    pub fn link_for_input(&self, input_id: &str) -> Option<Link> {
        self.read(|state| state.link_for_input(input_id).cloned())
    }

    pub fn links_for_output(&self, output_id: &str) -> Vec<Link> {
        self.read(|state| state.links_for_output(output_id).cloned().collect())
    }

    pub fn link_between(&self, output_id: &str, input_id: &str) -> Option<Link> {
        self.read(|state| state.link_between(output_id, input_id).cloned())
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    pub fn serialize_nodes(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.nodes())?)
    }

    /// Replace every node (and drop every link) with the nodes of a JSON
    /// array. The whole document is checked before anything changes.
    pub fn deserialize_nodes(&self, json: &str) -> Result<()> {
        let nodes: Vec<SerializedNode> = serde_json::from_str(json)?;
        self.load_nodes(nodes)
    }

    pub fn serialize_links(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.links())?)
    }

    /// Replace every link with the links of a JSON array, keeping their
    /// ids. Entries that cannot be linked are skipped with a debug message.
    pub fn deserialize_links(&self, json: &str) -> Result<()> {
        let links: Vec<Link> = serde_json::from_str(json)?;
        self.load_links(links);
        Ok(())
    }

    pub fn serialize_graph(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.snapshot())?)
    }

    pub fn deserialize_graph(&self, json: &str) -> Result<()> {
        let doc: GraphDocument = serde_json::from_str(json)?;
        self.restore(doc)
    }

    /// Both collections as one document
    pub fn snapshot(&self) -> GraphDocument {
        self.read(|state| GraphDocument {
            nodes: state.serialized_nodes(),
            links: state.links.clone(),
        })
    }

    /// Replace the whole graph with a document
    pub fn restore(&self, doc: GraphDocument) -> Result<()> {
        self.load_nodes(doc.nodes)?;
        self.load_links(doc.links);
        Ok(())
    }

    fn load_nodes(&self, nodes: Vec<SerializedNode>) -> Result<()> {
        let errors = validate_nodes(&nodes, Some(&self.shared.registry));
        if !errors.is_empty() {
            let message = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(EngineError::InvalidDocument(message));
        }
        let restored = nodes
            .into_iter()
            .map(|node| self.shared.registry.restore(node))
            .collect::<Result<Vec<_>>>()?;

        // Propagation stays off while the restored hooks run
        self.mutate(|state, fx| {
            let was_running = std::mem::replace(&mut state.started, false);
            state.remove_all_nodes_and_links(fx);
            let installed = state.install_nodes(restored, fx);
            state.started = was_running;
            installed?;
            fx.emit(EngineEvent::NodesUpdated {
                nodes: state.serialized_nodes(),
            });
            Ok(())
        })
    }

    fn load_links(&self, links: Vec<Link>) {
        self.mutate(|state, fx| {
            state.clear_links(fx);
            for link in links {
                if let Err(e) = state.add_link(&link.output_id, &link.input_id, Some(link.id.clone()), fx) {
                    let message = format!("Skipped link {}: {}", link.id, e);
                    log::debug!("{}", message);
                    fx.emit(EngineEvent::engine_debug(message));
                }
            }
            fx.emit(EngineEvent::LinksUpdated {
                links: state.links.clone(),
            });
        });
    }

    // =========================================================================
    // Bulk
    // =========================================================================

    pub fn remove_all_nodes_and_links(&self) {
        self.mutate(|state, fx| state.remove_all_nodes_and_links(fx));
    }

    pub fn remove_all_links(&self) {
        self.mutate(|state, fx| state.remove_all_links(fx));
    }
}
