//! In-memory graph state and change propagation
//!
//! [`GraphState`] owns the node and link collections and implements every
//! mutation the engine exposes. It never locks, persists or notifies by
//! itself: each operation records the repository writes and events it
//! caused into an [`Effects`] buffer, which the engine commits once the
//! operation is over.
//!
//! Propagation is synchronous and depth-first. When an output changes:
//!
//! 1. an `OutputUpdated` event is recorded,
//! 2. the owner's `on_output_change` hook runs,
//! 3. for every link leaving the output, in link order, the value is copied
//!    into the target input, the target's input-change path runs (which may
//!    recurse), and an `InputUpdated` event is recorded.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::config::CyclePolicy;
use crate::error::{EngineError, Result};
use crate::events::EngineEvent;
use crate::node::{HookOutcome, Node, NodeContext, NodeLogic};
use crate::registry::NodeRegistry;
use crate::types::{new_id, Input, Link, LinkId, NodeData, NodeId, Output, PortId, SerializedNode};
use crate::validation::would_create_cycle;

/// A pending write to the repository
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RepoWrite {
    AddNode(SerializedNode),
    UpdateNode(SerializedNode),
    DeleteNode(NodeId),
    AddLink(Link),
    DeleteLink(LinkId),
    DropAll,
}

/// Side effects recorded by a graph operation
#[derive(Debug, Default)]
pub(crate) struct Effects {
    pub events: Vec<EngineEvent>,
    pub writes: Vec<RepoWrite>,
}

impl Effects {
    pub fn emit(&mut self, event: EngineEvent) {
        self.events.push(event);
    }

    pub fn write(&mut self, write: RepoWrite) {
        self.writes.push(write);
    }

    fn engine_debug(&mut self, message: String) {
        log::debug!("{}", message);
        self.emit(EngineEvent::engine_debug(message));
    }
}

/// Result of ticking one node
#[derive(Debug)]
pub(crate) struct TickOutcome {
    pub node_type: String,
    /// The tick hook failed or panicked
    pub error: Option<EngineError>,
    /// The cascade started by the tick failed
    pub cascade: Result<()>,
    pub elapsed: Duration,
}

/// The authoritative graph
pub(crate) struct GraphState {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
    pub started: bool,
    cycle_policy: CyclePolicy,
}

impl GraphState {
    pub fn new(cycle_policy: CyclePolicy) -> Self {
        Self {
            nodes: Vec::new(),
            links: Vec::new(),
            started: false,
            cycle_policy,
        }
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn node_index(&self, node_id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id() == node_id)
    }

    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id() == node_id)
    }

    /// (node index, input index) of an input
    pub fn input_location(&self, input_id: &str) -> Option<(usize, usize)> {
        self.nodes
            .iter()
            .enumerate()
            .find_map(|(n, node)| node.input_index(input_id).map(|i| (n, i)))
    }

    /// (node index, output index) of an output
    pub fn output_location(&self, output_id: &str) -> Option<(usize, usize)> {
        self.nodes
            .iter()
            .enumerate()
            .find_map(|(n, node)| node.output_index(output_id).map(|o| (n, o)))
    }

    pub fn input(&self, input_id: &str) -> Option<&Input> {
        self.input_location(input_id)
            .map(|(n, i)| &self.nodes[n].inputs()[i])
    }

    pub fn output(&self, output_id: &str) -> Option<&Output> {
        self.output_location(output_id)
            .map(|(n, o)| &self.nodes[n].outputs()[o])
    }

    pub fn input_owner(&self, input_id: &str) -> Option<&Node> {
        self.input_location(input_id).map(|(n, _)| &self.nodes[n])
    }

    pub fn output_owner(&self, output_id: &str) -> Option<&Node> {
        self.output_location(output_id).map(|(n, _)| &self.nodes[n])
    }

    pub fn link(&self, link_id: &str) -> Option<&Link> {
        self.links.iter().find(|l| l.id == link_id)
    }

    pub fn link_for_input(&self, input_id: &str) -> Option<&Link> {
        self.links.iter().find(|l| l.input_id == input_id)
    }

    pub fn links_for_output<'a>(&'a self, output_id: &'a str) -> impl Iterator<Item = &'a Link> + 'a {
        self.links.iter().filter(move |l| l.output_id == output_id)
    }

    pub fn link_between(&self, output_id: &str, input_id: &str) -> Option<&Link> {
        self.links
            .iter()
            .find(|l| l.output_id == output_id && l.input_id == input_id)
    }

    /// Links touching a node: the links into its inputs, then the links out
    /// of its outputs. A link from the node to itself is listed once.
    pub fn links_for_node(&self, node: &Node) -> Vec<Link> {
        let mut found: Vec<Link> = Vec::new();
        for input in node.inputs() {
            if let Some(link) = self.link_for_input(&input.id) {
                found.push(link.clone());
            }
        }
        for output in node.outputs() {
            for link in self.links_for_output(&output.id) {
                if !found.iter().any(|l| l.id == link.id) {
                    found.push(link.clone());
                }
            }
        }
        found
    }

    pub fn serialized_nodes(&self) -> Vec<SerializedNode> {
        self.nodes.iter().map(Node::to_serialized).collect()
    }

    fn port_owner_type(&self, port_id: &str) -> &str {
        self.nodes
            .iter()
            .find(|n| n.data().owns_port(port_id))
            .map_or("?", |n| n.node_type())
    }

    // =========================================================================
    // Ids
    // =========================================================================

    fn id_in_use(&self, id: &str, skip: Option<usize>) -> bool {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(index, _)| Some(*index) != skip)
            .any(|(_, node)| node.id() == id || node.data().owns_port(id))
    }

    /// Reject a node whose ids collide with each other or with the graph.
    /// `skip` excludes the node being overwritten.
    fn check_ids_free(&self, data: &NodeData, skip: Option<usize>) -> Result<()> {
        let mut own: HashSet<&str> = HashSet::new();
        for id in std::iter::once(data.id.as_str()).chain(data.port_ids()) {
            if !own.insert(id) || self.id_in_use(id, skip) {
                return Err(EngineError::DuplicateId(id.to_string()));
            }
        }
        Ok(())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Toggle the started flag. Starting pushes every linked output value
    /// into its target input without running any hook.
    pub fn set_started(&mut self, started: bool, fx: &mut Effects) {
        self.started = started;
        if started {
            self.resync(fx);
            fx.engine_debug("Started".to_string());
        } else {
            fx.engine_debug("Stopped".to_string());
        }
    }

    fn resync(&mut self, fx: &mut Effects) {
        for index in 0..self.links.len() {
            let (output_id, input_id) = {
                let link = &self.links[index];
                (link.output_id.clone(), link.input_id.clone())
            };
            let (Some((on, oi)), Some((n, i))) =
                (self.output_location(&output_id), self.input_location(&input_id))
            else {
                continue;
            };
            let value = self.nodes[on].outputs()[oi].value.clone();
            self.nodes[n].data_mut().inputs[i].value = value;
            self.emit_input(n, i, fx);
        }
    }

    // =========================================================================
    // Nodes
    // =========================================================================

    pub fn insert_node(&mut self, node: Node, fx: &mut Effects) -> Result<()> {
        self.check_ids_free(node.data(), None)?;

        let serialized = node.to_serialized();
        fx.engine_debug(format!("New node {}", node.node_type()));
        fx.write(RepoWrite::AddNode(serialized.clone()));
        fx.emit(EngineEvent::NodeAdded { node: serialized });
        self.nodes.push(node);
        Ok(())
    }

    /// Remove a node, deleting every link touching it first
    pub fn remove_node(&mut self, node_id: &str, fx: &mut Effects) -> Result<Node> {
        let index = self
            .node_index(node_id)
            .ok_or_else(|| EngineError::NodeNotFound(node_id.to_string()))?;

        for link in self.links_for_node(&self.nodes[index]) {
            if let Some(position) = self.links.iter().position(|l| l.id == link.id) {
                self.delete_link_at(position, fx);
            }
        }

        let node = self.nodes.remove(index);
        fx.emit(EngineEvent::NodeRemoved {
            node_id: node_id.to_string(),
        });
        fx.engine_debug(format!("Remove node {}", node.node_type()));
        fx.write(RepoWrite::DeleteNode(node_id.to_string()));
        Ok(node)
    }

    /// Overwrite a node in place, keeping its identity
    pub fn update_node(
        &mut self,
        update: SerializedNode,
        registry: &NodeRegistry,
        fx: &mut Effects,
    ) -> Result<()> {
        let index = self
            .node_index(&update.data.id)
            .ok_or_else(|| EngineError::NodeNotFound(update.data.id.clone()))?;
        self.check_ids_free(&update.data, Some(index))?;

        let SerializedNode { data, state } = update;

        // Prepare everything that can fail before touching the node
        let new_logic = if self.nodes[index].node_type() != data.node_type {
            let mut logic = registry.create_logic(&data.node_type)?;
            if !state.is_null() {
                logic.load_state(&state)?;
            }
            Some(logic)
        } else {
            None
        };

        let node = &mut self.nodes[index];
        match new_logic {
            Some(logic) => node.replace_logic(logic),
            None if !state.is_null() => node.load_state(&state)?,
            None => {}
        }

        *node.data_mut() = data;
        let node_type = node.node_type().to_string();
        let serialized = node.to_serialized();

        // Links whose ports no longer exist
        let stale: Vec<LinkId> = self
            .links
            .iter()
            .filter(|l| {
                self.output_location(&l.output_id).is_none()
                    || self.input_location(&l.input_id).is_none()
            })
            .map(|l| l.id.clone())
            .collect();
        for link_id in stale {
            if let Some(position) = self.links.iter().position(|l| l.id == link_id) {
                self.delete_link_at(position, fx);
            }
        }

        fx.engine_debug(format!("Update node {}", node_type));
        fx.write(RepoWrite::UpdateNode(serialized.clone()));
        fx.emit(EngineEvent::NodeUpdated { node: serialized });
        Ok(())
    }

    /// Editor write to an input: set its value and optionally rename it.
    /// No hook runs and nothing propagates.
    pub fn update_input(
        &mut self,
        input_id: &str,
        value: Option<String>,
        name: Option<String>,
        fx: &mut Effects,
    ) -> Result<()> {
        let (n, i) = self
            .input_location(input_id)
            .ok_or_else(|| EngineError::InputNotFound(input_id.to_string()))?;
        let node = &mut self.nodes[n];
        let port = &mut node.data_mut().inputs[i];
        port.value = value;
        let renamed = rename(port, name);
        if renamed {
            fx.write(RepoWrite::UpdateNode(node.to_serialized()));
        }
        self.emit_input(n, i, fx);
        Ok(())
    }

    /// Editor write to an output: set its value and optionally rename it.
    /// No hook runs and nothing propagates.
    pub fn update_output(
        &mut self,
        output_id: &str,
        value: Option<String>,
        name: Option<String>,
        fx: &mut Effects,
    ) -> Result<()> {
        let (n, o) = self
            .output_location(output_id)
            .ok_or_else(|| EngineError::OutputNotFound(output_id.to_string()))?;
        let node = &mut self.nodes[n];
        let port = &mut node.data_mut().outputs[o];
        port.value = value;
        let renamed = rename(port, name);
        if renamed {
            fx.write(RepoWrite::UpdateNode(node.to_serialized()));
        }
        fx.emit(EngineEvent::OutputUpdated {
            node_id: node.id().to_string(),
            output: node.outputs()[o].clone(),
        });
        Ok(())
    }

    // =========================================================================
    // Links
    // =========================================================================

    /// Locate both ends of a prospective link and apply the cycle policy.
    /// Returns the (node, port) locations of the output and the input.
    fn check_link(
        &self,
        output_id: &str,
        input_id: &str,
    ) -> Result<((usize, usize), (usize, usize))> {
        let output = self
            .output_location(output_id)
            .ok_or_else(|| EngineError::OutputNotFound(output_id.to_string()))?;
        let input = self
            .input_location(input_id)
            .ok_or_else(|| EngineError::InputNotFound(input_id.to_string()))?;

        if self.cycle_policy == CyclePolicy::Reject {
            // The link into this input is about to be replaced
            let edges = self
                .links
                .iter()
                .filter(|l| l.input_id != input_id)
                .filter_map(|l| {
                    let (from, _) = self.output_location(&l.output_id)?;
                    let (to, _) = self.input_location(&l.input_id)?;
                    Some((self.nodes[from].id(), self.nodes[to].id()))
                });
            if would_create_cycle(edges, self.nodes[output.0].id(), self.nodes[input.0].id()) {
                return Err(EngineError::CycleRejected {
                    output_id: output_id.to_string(),
                    input_id: input_id.to_string(),
                });
            }
        }

        Ok((output, input))
    }

    /// Link an output to an input, replacing any link into that input.
    /// While started the output value is pushed through the new link as a
    /// regular input change.
    pub fn add_link(
        &mut self,
        output_id: &str,
        input_id: &str,
        link_id: Option<LinkId>,
        fx: &mut Effects,
    ) -> Result<Link> {
        let ((on, oi), (n, i)) = self.check_link(output_id, input_id)?;
        if let Some(id) = &link_id {
            if self.links.iter().any(|l| &l.id == id && l.input_id != input_id) {
                return Err(EngineError::DuplicateId(id.clone()));
            }
        }

        if let Some(position) = self.links.iter().position(|l| l.input_id == input_id) {
            self.delete_link_at(position, fx);
        }

        let link = Link {
            id: link_id.unwrap_or_else(new_id),
            output_id: output_id.to_string(),
            input_id: input_id.to_string(),
        };
        fx.engine_debug(format!(
            "New link from {} to {}",
            self.nodes[on].node_type(),
            self.nodes[n].node_type()
        ));
        fx.write(RepoWrite::AddLink(link.clone()));
        fx.emit(EngineEvent::LinkAdded { link: link.clone() });
        self.links.push(link.clone());

        if self.started {
            let value = self.nodes[on].outputs()[oi].value.clone();
            self.nodes[n].data_mut().inputs[i].value = value;
            let result = self.run_input_change(n, i, 0, fx);
            self.emit_input(n, i, fx);
            result?;
        }

        Ok(link)
    }

    fn delete_link_at(&mut self, position: usize, fx: &mut Effects) -> Link {
        let message = {
            let link = &self.links[position];
            format!(
                "Delete link from {} to {}",
                self.port_owner_type(&link.output_id),
                self.port_owner_type(&link.input_id)
            )
        };
        let link = self.links.remove(position);
        fx.engine_debug(message);
        fx.write(RepoWrite::DeleteLink(link.id.clone()));
        fx.emit(EngineEvent::LinkRemoved { link: link.clone() });
        link
    }

    pub fn delete_link(&mut self, output_id: &str, input_id: &str, fx: &mut Effects) -> Result<Link> {
        let position = self
            .links
            .iter()
            .position(|l| l.output_id == output_id && l.input_id == input_id)
            .ok_or_else(|| EngineError::LinkNotFound(format!("{} -> {}", output_id, input_id)))?;
        Ok(self.delete_link_at(position, fx))
    }

    pub fn delete_link_by_id(&mut self, link_id: &str, fx: &mut Effects) -> Result<Link> {
        let position = self
            .links
            .iter()
            .position(|l| l.id == link_id)
            .ok_or_else(|| EngineError::LinkNotFound(link_id.to_string()))?;
        Ok(self.delete_link_at(position, fx))
    }

    // =========================================================================
    // Bulk
    // =========================================================================

    pub fn remove_all_nodes_and_links(&mut self, fx: &mut Effects) {
        fx.engine_debug("Remove all nodes and links".to_string());
        fx.write(RepoWrite::DropAll);
        self.links.clear();
        self.nodes.clear();
        fx.emit(EngineEvent::NodesUpdated { nodes: Vec::new() });
        fx.emit(EngineEvent::LinksUpdated { links: Vec::new() });
    }

    pub fn remove_all_links(&mut self, fx: &mut Effects) {
        fx.engine_debug("Remove all links".to_string());
        self.clear_links(fx);
        fx.emit(EngineEvent::LinksUpdated { links: Vec::new() });
    }

    /// Drop every link, persisting the deletions, without notifying
    pub fn clear_links(&mut self, fx: &mut Effects) {
        for link in self.links.drain(..) {
            fx.write(RepoWrite::DeleteLink(link.id));
        }
    }

    /// Install freshly restored nodes into an empty graph and let each
    /// rebuild its transient state
    pub fn install_nodes(&mut self, nodes: Vec<Node>, fx: &mut Effects) -> Result<()> {
        for node in nodes {
            self.check_ids_free(node.data(), None)?;
            self.nodes.push(node);
            let index = self.nodes.len() - 1;

            let mut outcome = self.nodes[index].run_deserialize();
            if let Some(e) = outcome.error.take() {
                self.report_failure(index, "Deserialize hook", &e, fx);
            }
            self.apply_outcome(index, outcome, 0, fx)?;

            let node = &self.nodes[index];
            fx.engine_debug(format!("New node {}", node.node_type()));
            fx.write(RepoWrite::AddNode(node.to_serialized()));
        }
        Ok(())
    }

    /// Load a graph read back from the repository. Nothing is written back
    /// and nothing is announced; entries that do not fit are skipped.
    pub fn load_stored(&mut self, nodes: Vec<Node>, links: Vec<Link>) {
        let mut fx = Effects::default();
        for node in nodes {
            if let Err(e) = self.check_ids_free(node.data(), None) {
                log::warn!("Skipping stored node {}: {}", node.id(), e);
                continue;
            }
            self.nodes.push(node);
            let index = self.nodes.len() - 1;
            let mut outcome = self.nodes[index].run_deserialize();
            if let Some(e) = outcome.error.take() {
                log::warn!("Stored node {} failed to restore its state: {}", self.nodes[index].id(), e);
            }
            // Not started yet, so nothing propagates
            let _ = self.apply_outcome(index, outcome, 0, &mut fx);
        }

        for link in links {
            if self.link_for_input(&link.input_id).is_some() || self.link(&link.id).is_some() {
                log::warn!("Skipping stored link {}: input already linked", link.id);
                continue;
            }
            match self.check_link(&link.output_id, &link.input_id) {
                Ok(_) => self.links.push(link),
                Err(e) => log::warn!("Skipping stored link {}: {}", link.id, e),
            }
        }
    }

    // =========================================================================
    // Values and propagation
    // =========================================================================

    /// Write an output, then propagate it
    pub fn set_output(&mut self, output_id: &str, value: Option<String>, fx: &mut Effects) -> Result<()> {
        let (n, o) = self
            .output_location(output_id)
            .ok_or_else(|| EngineError::OutputNotFound(output_id.to_string()))?;
        self.nodes[n].data_mut().outputs[o].value = value;
        self.propagate_output(n, o, 0, fx)
    }

    /// Propagate the current value of an output
    pub fn on_output_change(&mut self, output_id: &str, fx: &mut Effects) -> Result<()> {
        let (n, o) = self
            .output_location(output_id)
            .ok_or_else(|| EngineError::OutputNotFound(output_id.to_string()))?;
        self.propagate_output(n, o, 0, fx)
    }

    /// Write an input, then run its owner's input-change path
    pub fn set_input(&mut self, input_id: &str, value: Option<String>, fx: &mut Effects) -> Result<()> {
        let (n, i) = self
            .input_location(input_id)
            .ok_or_else(|| EngineError::InputNotFound(input_id.to_string()))?;
        self.nodes[n].data_mut().inputs[i].value = value;
        self.input_changed(n, i, fx)
    }

    /// Run the input-change path for the current value of an input
    pub fn on_input_change(&mut self, input_id: &str, fx: &mut Effects) -> Result<()> {
        let (n, i) = self
            .input_location(input_id)
            .ok_or_else(|| EngineError::InputNotFound(input_id.to_string()))?;
        self.input_changed(n, i, fx)
    }

    fn input_changed(&mut self, n: usize, i: usize, fx: &mut Effects) -> Result<()> {
        if !self.started {
            return Ok(());
        }
        let result = self.run_input_change(n, i, 0, fx);
        self.emit_input(n, i, fx);
        result
    }

    /// Drive a concrete variant through a closure, then propagate whatever
    /// outputs it changed
    pub fn with_node<T, R>(
        &mut self,
        node_id: &str,
        f: impl FnOnce(&mut T, &mut NodeContext<'_>) -> R,
        fx: &mut Effects,
    ) -> Result<R>
    where
        T: NodeLogic + 'static,
    {
        let n = self
            .node_index(node_id)
            .ok_or_else(|| EngineError::NodeNotFound(node_id.to_string()))?;
        let (value, outcome) =
            self.nodes[n]
                .run_with::<T, R>(f)
                .ok_or_else(|| EngineError::NodeTypeMismatch {
                    node_id: node_id.to_string(),
                    expected: std::any::type_name::<T>().to_string(),
                })?;
        if let Err(e) = &value {
            self.report_failure(n, "Closure", e, fx);
        }
        self.apply_outcome(n, outcome, 0, fx)?;
        value
    }

    /// Tick one node, if it still exists
    pub fn tick_node(
        &mut self,
        node_id: &str,
        slow_threshold: Duration,
        fx: &mut Effects,
    ) -> Option<TickOutcome> {
        let n = self.node_index(node_id)?;
        let node_type = self.nodes[n].node_type().to_string();

        let started = Instant::now();
        let mut outcome = self.nodes[n].run_tick();
        let elapsed = started.elapsed();

        let error = outcome.error.take();
        if let Some(e) = &error {
            log::warn!("Node {} ({}) tick failed: {}", node_id, node_type, e);
            fx.emit(EngineEvent::node_debug(node_id, format!("Tick failed: {}", e)));
        }
        if elapsed > slow_threshold {
            let message = format!("Node {} ({}) tick took {:?}", node_id, node_type, elapsed);
            log::warn!("{}", message);
            fx.emit(EngineEvent::engine_debug(message));
        }

        let cascade = self.apply_outcome(n, outcome, 0, fx);
        Some(TickOutcome {
            node_type,
            error,
            cascade,
            elapsed,
        })
    }

    fn run_input_change(&mut self, n: usize, i: usize, depth: usize, fx: &mut Effects) -> Result<()> {
        let mut outcome = self.nodes[n].run_input_change(i);
        if let Some(e) = outcome.error.take() {
            self.report_failure(n, "Input handler", &e, fx);
        }
        self.apply_outcome(n, outcome, depth, fx)
    }

    fn report_failure(&self, n: usize, hook: &str, e: &EngineError, fx: &mut Effects) {
        let node = &self.nodes[n];
        log::warn!("Node {} ({}) {} failed: {}", node.id(), node.node_type(), hook.to_lowercase(), e);
        fx.emit(EngineEvent::node_debug(node.id(), e.to_string()));
    }

    /// Record a hook's messages and update request, then propagate the
    /// outputs it changed
    fn apply_outcome(
        &mut self,
        n: usize,
        outcome: HookOutcome,
        depth: usize,
        fx: &mut Effects,
    ) -> Result<()> {
        let HookOutcome {
            changed,
            messages,
            update_requested,
            ..
        } = outcome;

        let node = &self.nodes[n];
        for message in messages {
            fx.emit(EngineEvent::node_debug(node.id(), message));
        }
        if update_requested {
            let serialized = node.to_serialized();
            fx.write(RepoWrite::UpdateNode(serialized.clone()));
            fx.emit(EngineEvent::NodeUpdated { node: serialized });
        }

        for output in changed {
            self.propagate_output(n, output, depth, fx)?;
        }
        Ok(())
    }

    fn propagate_output(&mut self, n: usize, o: usize, depth: usize, fx: &mut Effects) -> Result<()> {
        if !self.started {
            return Ok(());
        }

        let output = self.nodes[n].outputs()[o].clone();
        if let CyclePolicy::Bounded { max_depth } = self.cycle_policy {
            if depth > max_depth {
                let message = format!(
                    "Cascade depth {} exceeded at output '{}', propagation stopped",
                    depth, output.id
                );
                log::warn!("{}", message);
                fx.emit(EngineEvent::engine_debug(message));
                return Err(EngineError::CascadeDepthExceeded {
                    output_id: output.id,
                    depth,
                });
            }
        }

        fx.emit(EngineEvent::OutputUpdated {
            node_id: self.nodes[n].id().to_string(),
            output: output.clone(),
        });
        self.nodes[n].notify_output_change(o);

        let targets: Vec<PortId> = self
            .links_for_output(&output.id)
            .map(|l| l.input_id.clone())
            .collect();
        for input_id in targets {
            let Some((tn, ti)) = self.input_location(&input_id) else {
                continue;
            };
            self.nodes[tn].data_mut().inputs[ti].value = output.value.clone();
            let result = self.run_input_change(tn, ti, depth + 1, fx);
            self.emit_input(tn, ti, fx);
            result?;
        }
        Ok(())
    }

    fn emit_input(&self, n: usize, i: usize, fx: &mut Effects) {
        let node = &self.nodes[n];
        fx.emit(EngineEvent::InputUpdated {
            node_id: node.id().to_string(),
            input: node.inputs()[i].clone(),
        });
    }
}

fn rename(port: &mut crate::types::Port, name: Option<String>) -> bool {
    match name {
        Some(name) if name != port.name => {
            port.name = name;
            true
        }
        _ => false,
    }
}
