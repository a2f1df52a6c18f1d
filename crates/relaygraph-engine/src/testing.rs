//! Node variants used by the engine's own tests

use std::time::Duration;

use parking_lot::Mutex;

use crate::descriptor::{NodeMetadata, NodeType, PortSpec};
use crate::error::{EngineError, Result};
use crate::node::{NodeContext, NodeLogic};
use crate::registry::NodeRegistry;
use crate::types::{NodeCategory, NodeOptions, Output, PortDataType};

fn metadata(node_type: &str, inputs: usize, outputs: usize, reset: bool) -> NodeMetadata {
    NodeMetadata {
        node_type: node_type.to_string(),
        category: NodeCategory::Other,
        title: node_type.trim_start_matches("Test/").to_string(),
        description: String::new(),
        inputs: (0..inputs)
            .map(|i| PortSpec::new(format!("In {}", i + 1), PortDataType::Text))
            .collect(),
        outputs: (0..outputs)
            .map(|i| PortSpec::new(format!("Out {}", i + 1), PortDataType::Text))
            .collect(),
        options: NodeOptions {
            reset_outputs_if_any_input_is_null: reset,
        },
    }
}

/// No inputs, one output written from outside
#[derive(Default)]
pub struct Source {
    pub ticks: u64,
}

impl Source {
    pub fn emit(&mut self, ctx: &mut NodeContext<'_>, value: &str) {
        ctx.set_output_value(0, value);
    }
}

impl NodeLogic for Source {
    fn tick(&mut self, _ctx: &mut NodeContext<'_>) -> Result<()> {
        self.ticks += 1;
        Ok(())
    }
}

impl NodeType for Source {
    fn metadata() -> NodeMetadata {
        metadata("Test/Source", 0, 1, false)
    }
}

/// Copies its input to its output. The value "fail" makes it error.
#[derive(Default)]
pub struct Relay {
    pub calls: u64,
    pub output_changes: u64,
    pub restored: bool,
}

impl NodeLogic for Relay {
    fn on_input_change(&mut self, ctx: &mut NodeContext<'_>, _input: usize) -> Result<()> {
        self.calls += 1;
        if ctx.input(0) == Some("fail") {
            return Err(EngineError::failed("refused"));
        }
        let value = ctx.input(0).map(str::to_string);
        ctx.set_output(0, value);
        Ok(())
    }

    fn on_output_change(&mut self, _output: &Output) {
        self.output_changes += 1;
    }

    fn on_deserialize(&mut self, ctx: &mut NodeContext<'_>) {
        self.restored = true;
        ctx.debug("restored");
    }

    fn save_state(&self) -> serde_json::Value {
        serde_json::json!({ "calls": self.calls })
    }

    fn load_state(&mut self, state: &serde_json::Value) -> Result<()> {
        self.calls = state.get("calls").and_then(|v| v.as_u64()).unwrap_or_default();
        Ok(())
    }
}

impl NodeType for Relay {
    fn metadata() -> NodeMetadata {
        metadata("Test/Relay", 1, 1, false)
    }
}

/// Joins two inputs; outputs reset whenever either is empty
#[derive(Default)]
pub struct Concat {
    pub calls: u64,
}

impl NodeLogic for Concat {
    fn on_input_change(&mut self, ctx: &mut NodeContext<'_>, _input: usize) -> Result<()> {
        self.calls += 1;
        let joined = format!(
            "{}{}",
            ctx.input(0).unwrap_or_default(),
            ctx.input(1).unwrap_or_default()
        );
        ctx.set_output_value(0, joined);
        Ok(())
    }
}

impl NodeType for Concat {
    fn metadata() -> NodeMetadata {
        metadata("Test/Concat", 2, 1, true)
    }
}

/// Flips "0" and "1"; anything else becomes "1"
#[derive(Default)]
pub struct Invert;

impl NodeLogic for Invert {
    fn on_input_change(&mut self, ctx: &mut NodeContext<'_>, _input: usize) -> Result<()> {
        let flipped = if ctx.input(0) == Some("1") { "0" } else { "1" };
        ctx.set_output_value(0, flipped);
        Ok(())
    }
}

impl NodeType for Invert {
    fn metadata() -> NodeMetadata {
        metadata("Test/Invert", 1, 1, false)
    }
}

/// Tick always fails
#[derive(Default)]
pub struct Faulty;

impl NodeLogic for Faulty {
    fn tick(&mut self, _ctx: &mut NodeContext<'_>) -> Result<()> {
        Err(EngineError::failed("sensor offline"))
    }
}

impl NodeType for Faulty {
    fn metadata() -> NodeMetadata {
        metadata("Test/Faulty", 0, 0, false)
    }
}

/// Tick always panics
#[derive(Default)]
pub struct Panicky;

impl NodeLogic for Panicky {
    fn tick(&mut self, _ctx: &mut NodeContext<'_>) -> Result<()> {
        panic!("driver crashed");
    }
}

impl NodeType for Panicky {
    fn metadata() -> NodeMetadata {
        metadata("Test/Panicky", 0, 0, false)
    }
}

/// Tick writes "go" to its output
#[derive(Default)]
pub struct Emitter;

impl NodeLogic for Emitter {
    fn tick(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        ctx.set_output_value(0, "go");
        Ok(())
    }
}

impl NodeType for Emitter {
    fn metadata() -> NodeMetadata {
        metadata("Test/Emitter", 0, 1, false)
    }
}

/// Input handler always panics
#[derive(Default)]
pub struct Boom;

impl NodeLogic for Boom {
    fn on_input_change(&mut self, _ctx: &mut NodeContext<'_>, _input: usize) -> Result<()> {
        panic!("handler crashed");
    }
}

impl NodeType for Boom {
    fn metadata() -> NodeMetadata {
        metadata("Test/Boom", 1, 0, false)
    }
}

/// Node ids in the order `Test/Recorder` nodes ticked, across all engines
pub static TICK_LOG: Mutex<Vec<String>> = parking_lot::const_mutex(Vec::new());

/// Tick appends the node id to [`TICK_LOG`] and holds the pass briefly
#[derive(Default)]
pub struct Recorder;

impl NodeLogic for Recorder {
    fn tick(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        TICK_LOG.lock().push(ctx.node_id().to_string());
        std::thread::sleep(Duration::from_millis(1));
        Ok(())
    }
}

impl NodeType for Recorder {
    fn metadata() -> NodeMetadata {
        metadata("Test/Recorder", 0, 0, false)
    }
}

/// Registry with every test variant
pub fn registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    registry.register::<Source>();
    registry.register::<Relay>();
    registry.register::<Concat>();
    registry.register::<Invert>();
    registry.register::<Faulty>();
    registry.register::<Panicky>();
    registry.register::<Emitter>();
    registry.register::<Boom>();
    registry.register::<Recorder>();
    registry
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
