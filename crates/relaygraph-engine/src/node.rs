//! Node extension contract
//!
//! A node is its serializable [`NodeData`] plus a boxed [`NodeLogic`]
//! implementing the variant's behaviour. Hooks never touch the graph
//! directly: they read inputs and write outputs through a [`NodeContext`],
//! and the engine propagates whatever outputs actually changed once the
//! hook returns.

use std::any::Any;
use std::fmt;

use crate::error::{EngineError, Result};
use crate::types::{Input, NodeData, Output, SerializedNode};

/// Downcasting support for node variants
///
/// Blanket-implemented for every sized `'static` type, so variants get it
/// for free.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Behaviour of a concrete node variant
pub trait NodeLogic: AsAny + Send {
    /// Called once per scheduler pass
    fn tick(&mut self, _ctx: &mut NodeContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Called when one of this node's inputs received a new value
    fn on_input_change(&mut self, _ctx: &mut NodeContext<'_>, _input: usize) -> Result<()> {
        Ok(())
    }

    /// Called when one of this node's outputs changed value, before the
    /// value is pushed downstream
    fn on_output_change(&mut self, _output: &Output) {}

    /// Called once after a bulk load, to rebuild transient state
    fn on_deserialize(&mut self, _ctx: &mut NodeContext<'_>) {}

    /// Variant state to persist alongside the node's ports
    fn save_state(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    /// Restore state previously produced by [`save_state`](Self::save_state)
    fn load_state(&mut self, _state: &serde_json::Value) -> Result<()> {
        Ok(())
    }
}

/// View of one node handed to its hooks
pub struct NodeContext<'a> {
    node_id: &'a str,
    inputs: &'a [Input],
    outputs: &'a mut [Output],
    changed: Vec<usize>,
    messages: Vec<String>,
    update_requested: bool,
}

impl<'a> NodeContext<'a> {
    pub(crate) fn new(node_id: &'a str, inputs: &'a [Input], outputs: &'a mut [Output]) -> Self {
        Self {
            node_id,
            inputs,
            outputs,
            changed: Vec::new(),
            messages: Vec::new(),
            update_requested: false,
        }
    }

    /// Id of the node being driven
    pub fn node_id(&self) -> &str {
        self.node_id
    }

    /// All input ports
    pub fn inputs(&self) -> &[Input] {
        self.inputs
    }

    /// Value of an input, `None` if unset or out of range
    pub fn input(&self, index: usize) -> Option<&str> {
        self.inputs.get(index).and_then(|p| p.value.as_deref())
    }

    /// Whether any input holds no value
    pub fn any_input_empty(&self) -> bool {
        self.inputs.iter().any(|p| p.value.is_none())
    }

    /// All output ports
    pub fn outputs(&self) -> &[Output] {
        self.outputs
    }

    /// Current value of an output
    pub fn output(&self, index: usize) -> Option<&str> {
        self.outputs.get(index).and_then(|p| p.value.as_deref())
    }

    /// Write an output. Writing the value it already holds is not a change.
    pub fn set_output(&mut self, index: usize, value: Option<String>) {
        let Some(port) = self.outputs.get_mut(index) else {
            log::warn!(
                "Node {} wrote to missing output #{} ({} outputs)",
                self.node_id,
                index,
                self.outputs.len()
            );
            return;
        };
        if port.value == value {
            return;
        }
        port.value = value;
        if !self.changed.contains(&index) {
            self.changed.push(index);
        }
    }

    /// Write a value into an output
    pub fn set_output_value(&mut self, index: usize, value: impl Into<String>) {
        self.set_output(index, Some(value.into()));
    }

    /// Clear an output
    pub fn clear_output(&mut self, index: usize) {
        self.set_output(index, None);
    }

    /// Clear every output
    pub fn reset_outputs(&mut self) {
        for index in 0..self.outputs.len() {
            self.set_output(index, None);
        }
    }

    /// Send a message on the node debug channel
    pub fn debug(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Ask the engine to announce and persist this node after the hook
    pub fn request_update(&mut self) {
        self.update_requested = true;
    }

    fn finish(self) -> HookOutcome {
        HookOutcome {
            changed: self.changed,
            messages: self.messages,
            update_requested: self.update_requested,
            error: None,
        }
    }
}

/// What a hook invocation did
#[derive(Debug, Default)]
pub(crate) struct HookOutcome {
    /// Indices of outputs whose value changed, in write order
    pub changed: Vec<usize>,
    /// Node debug messages
    pub messages: Vec<String>,
    /// The node asked to be announced and persisted
    pub update_requested: bool,
    /// The hook returned an error or panicked
    pub error: Option<EngineError>,
}

/// A node instance: serializable data plus variant behaviour
pub struct Node {
    data: NodeData,
    logic: Box<dyn NodeLogic>,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node").field("data", &self.data).finish_non_exhaustive()
    }
}

impl Node {
    /// Assemble a node from its data and behaviour
    pub fn new(data: NodeData, logic: Box<dyn NodeLogic>) -> Self {
        Self { data, logic }
    }

    pub fn id(&self) -> &str {
        &self.data.id
    }

    pub fn node_type(&self) -> &str {
        &self.data.node_type
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut NodeData {
        &mut self.data
    }

    pub fn inputs(&self) -> &[Input] {
        &self.data.inputs
    }

    pub fn outputs(&self) -> &[Output] {
        &self.data.outputs
    }

    /// Index of an input owned by this node
    pub fn input_index(&self, input_id: &str) -> Option<usize> {
        self.data.inputs.iter().position(|p| p.id == input_id)
    }

    /// Index of an output owned by this node
    pub fn output_index(&self, output_id: &str) -> Option<usize> {
        self.data.outputs.iter().position(|p| p.id == output_id)
    }

    /// Borrow the behaviour as a concrete variant
    pub fn logic<T: NodeLogic + 'static>(&self) -> Option<&T> {
        let logic: &dyn NodeLogic = self.logic.as_ref();
        logic.as_any().downcast_ref::<T>()
    }

    /// Serializable snapshot including variant state
    pub fn to_serialized(&self) -> SerializedNode {
        SerializedNode {
            data: self.data.clone(),
            state: self.logic.save_state(),
        }
    }

    pub(crate) fn replace_logic(&mut self, logic: Box<dyn NodeLogic>) {
        self.logic = logic;
    }

    pub(crate) fn load_state(&mut self, state: &serde_json::Value) -> Result<()> {
        self.logic.load_state(state)
    }

    /// Run the input handler, applying the reset-on-null option first.
    /// A panic in the handler is reported as an error.
    pub(crate) fn run_input_change(&mut self, input: usize) -> HookOutcome {
        let reset_on_null = self.data.options.reset_outputs_if_any_input_is_null;
        let mut ctx = NodeContext::new(&self.data.id, &self.data.inputs, &mut self.data.outputs);
        if reset_on_null && ctx.any_input_empty() {
            ctx.reset_outputs();
            return ctx.finish();
        }
        let logic = &mut self.logic;
        let result = guarded("input handler", || logic.on_input_change(&mut ctx, input)).and_then(|r| r);
        let mut outcome = ctx.finish();
        outcome.error = result.err();
        outcome
    }

    /// Run the periodic hook, converting a panic into an error
    pub(crate) fn run_tick(&mut self) -> HookOutcome {
        let mut ctx = NodeContext::new(&self.data.id, &self.data.inputs, &mut self.data.outputs);
        let logic = &mut self.logic;
        let result = guarded("tick", || logic.tick(&mut ctx)).and_then(|r| r);
        let mut outcome = ctx.finish();
        outcome.error = result.err();
        outcome
    }

    pub(crate) fn run_deserialize(&mut self) -> HookOutcome {
        let mut ctx = NodeContext::new(&self.data.id, &self.data.inputs, &mut self.data.outputs);
        let logic = &mut self.logic;
        let result = guarded("deserialize hook", || logic.on_deserialize(&mut ctx));
        let mut outcome = ctx.finish();
        outcome.error = result.err();
        outcome
    }

    pub(crate) fn notify_output_change(&mut self, output: usize) {
        if let Some(port) = self.data.outputs.get(output) {
            self.logic.on_output_change(port);
        }
    }

    /// Run a closure against the concrete variant. Returns `None` when the
    /// node is not a `T`; a panic inside the closure becomes an `Err`.
    pub(crate) fn run_with<T, R>(
        &mut self,
        f: impl FnOnce(&mut T, &mut NodeContext<'_>) -> R,
    ) -> Option<(Result<R>, HookOutcome)>
    where
        T: NodeLogic + 'static,
    {
        let logic: &mut dyn NodeLogic = self.logic.as_mut();
        let variant = logic.as_any_mut().downcast_mut::<T>()?;
        let mut ctx = NodeContext::new(&self.data.id, &self.data.inputs, &mut self.data.outputs);
        let value = guarded("closure", || f(variant, &mut ctx));
        Some((value, ctx.finish()))
    }
}

/// Call into variant code, turning a panic into [`EngineError::NodeFailed`]
fn guarded<R>(hook: &str, f: impl FnOnce() -> R) -> Result<R> {
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(f))
        .map_err(|panic| EngineError::failed(panic_message(hook, panic.as_ref())))
}

fn panic_message(hook: &str, panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("{} panicked: {}", hook, s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("{} panicked: {}", hook, s)
    } else {
        format!("{} panicked", hook)
    }
}
