//! Dashboard switch

use relaygraph_engine::{
    EngineError, NodeCategory, NodeContext, NodeLogic, NodeMetadata, NodeOptions, NodeType,
    PortDataType, PortSpec, Result,
};
use serde::Deserialize;

const OFF: &str = "0";
const ON: &str = "1";

/// Two-state switch flipped from the dashboard
///
/// The output holds `"0"` or `"1"` and changes only through
/// [`toggle`](Self::toggle); ticks and links never move it.
#[derive(Debug)]
pub struct UiSwitchNode {
    value: String,
}

#[derive(Deserialize)]
struct SwitchState {
    value: String,
}

impl Default for UiSwitchNode {
    fn default() -> Self {
        Self {
            value: OFF.to_string(),
        }
    }
}

impl UiSwitchNode {
    pub const PORT_OUT: usize = 0;

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_on(&self) -> bool {
        self.value == ON
    }

    /// Flip the switch, publish the new value and ask for the node to be
    /// saved
    ///
    /// ```ignore
    /// engine.with_node(&switch_id, |switch: &mut UiSwitchNode, ctx| switch.toggle(ctx))?;
    /// ```
    pub fn toggle(&mut self, ctx: &mut NodeContext<'_>) {
        self.value = if self.is_on() { OFF } else { ON }.to_string();
        ctx.set_output_value(Self::PORT_OUT, self.value.clone());
        ctx.request_update();
    }
}

impl NodeType for UiSwitchNode {
    fn metadata() -> NodeMetadata {
        NodeMetadata {
            node_type: "UI/Switch".to_string(),
            category: NodeCategory::Ui,
            title: "Switch".to_string(),
            description: "On/off switch operated from the dashboard".to_string(),
            inputs: Vec::new(),
            outputs: vec![PortSpec::new("Out", PortDataType::Logical).with_default(OFF)],
            options: NodeOptions::default(),
        }
    }
}

inventory::submit! {
    relaygraph_engine::NodeFactory {
        metadata: UiSwitchNode::metadata,
        create: UiSwitchNode::create,
    }
}

impl NodeLogic for UiSwitchNode {
    fn save_state(&self) -> serde_json::Value {
        serde_json::json!({ "value": self.value })
    }

    fn load_state(&mut self, state: &serde_json::Value) -> Result<()> {
        let state = SwitchState::deserialize(state)?;
        if state.value != OFF && state.value != ON {
            return Err(EngineError::failed(format!(
                "switch value must be \"0\" or \"1\", got {:?}",
                state.value
            )));
        }
        self.value = state.value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{engine, input_id, output, output_id};

    fn toggle(engine: &relaygraph_engine::Engine, node: &str) {
        engine
            .with_node(node, |switch: &mut UiSwitchNode, ctx| switch.toggle(ctx))
            .unwrap();
    }

    #[test]
    fn test_toggle() {
        let engine = engine();
        let node = engine.create_node("UI/Switch").unwrap();
        assert_eq!(output(&engine, &node).as_deref(), Some("0"));

        toggle(&engine, &node);
        assert_eq!(output(&engine, &node).as_deref(), Some("1"));
        toggle(&engine, &node);
        assert_eq!(output(&engine, &node).as_deref(), Some("0"));
    }

    #[test]
    fn test_tick_leaves_value_alone() {
        let engine = engine();
        let node = engine.create_node("UI/Switch").unwrap();
        toggle(&engine, &node);

        for _ in 0..3 {
            engine.tick();
        }
        assert_eq!(output(&engine, &node).as_deref(), Some("1"));
    }

    #[test]
    fn test_drives_downstream_gate() {
        let engine = engine();
        let switch = engine.create_node("UI/Switch").unwrap();
        let not = engine.create_node("Logic/NOT").unwrap();
        engine
            .add_link(&output_id(&engine, &switch, 0), &input_id(&engine, &not, 0))
            .unwrap();
        // Linking while started pushes the current "0" through
        assert_eq!(output(&engine, &not).as_deref(), Some("1"));

        toggle(&engine, &switch);
        assert_eq!(output(&engine, &not).as_deref(), Some("0"));
    }

    #[test]
    fn test_state_survives_round_trip() {
        let engine = engine();
        let node = engine.create_node("UI/Switch").unwrap();
        toggle(&engine, &node);
        let saved = engine.node(&node).unwrap();
        assert_eq!(saved.state, serde_json::json!({ "value": "1" }));

        let copy = crate::test_support::engine();
        copy.deserialize_graph(&engine.serialize_graph().unwrap()).unwrap();
        let is_on = copy
            .with_node(&node, |switch: &mut UiSwitchNode, _| switch.is_on())
            .unwrap();
        assert!(is_on);
    }

    #[test]
    fn test_rejects_bad_state() {
        let mut switch = UiSwitchNode::default();
        assert!(switch.load_state(&serde_json::json!({ "value": "2" })).is_err());
        assert!(switch.load_state(&serde_json::json!("nope")).is_err());
        assert_eq!(switch.value(), "0");
    }
}
