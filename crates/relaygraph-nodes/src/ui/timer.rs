//! Dashboard timer output

use relaygraph_engine::{
    NodeCategory, NodeContext, NodeLogic, NodeMetadata, NodeOptions, NodeType, PortDataType,
    PortSpec,
};

/// Output written by an external timer task scheduler
///
/// The node only holds the output; the scheduler that fires the tasks lives
/// outside the engine and calls [`set_state`](Self::set_state).
#[derive(Debug, Default)]
pub struct UiTimerNode;

impl UiTimerNode {
    pub const PORT_OUT: usize = 0;

    pub fn set_state(&mut self, ctx: &mut NodeContext<'_>, state: impl Into<String>) {
        ctx.set_output_value(Self::PORT_OUT, state);
    }
}

impl NodeType for UiTimerNode {
    fn metadata() -> NodeMetadata {
        NodeMetadata {
            node_type: "UI/Timer".to_string(),
            category: NodeCategory::Ui,
            title: "Timer".to_string(),
            description: "Value set by scheduled timer tasks".to_string(),
            inputs: Vec::new(),
            outputs: vec![PortSpec::new("Out", PortDataType::Any)],
            options: NodeOptions::default(),
        }
    }
}

inventory::submit! {
    relaygraph_engine::NodeFactory {
        metadata: UiTimerNode::metadata,
        create: UiTimerNode::create,
    }
}

impl NodeLogic for UiTimerNode {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{engine, input_id, output, output_id};

    #[test]
    fn test_set_state_propagates() {
        let engine = engine();
        let timer = engine.create_node("UI/Timer").unwrap();
        let state = engine.create_node("UI/State").unwrap();
        engine
            .add_link(&output_id(&engine, &timer, 0), &input_id(&engine, &state, 0))
            .unwrap();

        engine
            .with_node(&timer, |timer: &mut UiTimerNode, ctx| timer.set_state(ctx, "1"))
            .unwrap();

        assert_eq!(output(&engine, &timer).as_deref(), Some("1"));
        let shown = engine
            .with_node(&state, |s: &mut crate::UiStateNode, _| s.value().map(str::to_string))
            .unwrap();
        assert_eq!(shown.as_deref(), Some("1"));
    }
}
