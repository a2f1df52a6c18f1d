//! Dashboard state display

use relaygraph_engine::{
    NodeCategory, NodeContext, NodeLogic, NodeMetadata, NodeOptions, NodeType, PortDataType,
    PortSpec, Result,
};

/// Shows the last value it received on the dashboard
///
/// Every input change is recorded and the node asks to be re-announced and
/// saved, so dashboards see the value and it survives restarts.
#[derive(Debug, Default)]
pub struct UiStateNode {
    value: Option<String>,
}

impl UiStateNode {
    pub const PORT_IN: usize = 0;

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

impl NodeType for UiStateNode {
    fn metadata() -> NodeMetadata {
        NodeMetadata {
            node_type: "UI/State".to_string(),
            category: NodeCategory::Ui,
            title: "State".to_string(),
            description: "Displays the last received value".to_string(),
            inputs: vec![PortSpec::new("In", PortDataType::Any)],
            outputs: Vec::new(),
            options: NodeOptions::default(),
        }
    }
}

inventory::submit! {
    relaygraph_engine::NodeFactory {
        metadata: UiStateNode::metadata,
        create: UiStateNode::create,
    }
}

impl NodeLogic for UiStateNode {
    fn on_input_change(&mut self, ctx: &mut NodeContext<'_>, _input: usize) -> Result<()> {
        self.value = ctx.input(Self::PORT_IN).map(str::to_string);
        ctx.request_update();
        Ok(())
    }

    fn save_state(&self) -> serde_json::Value {
        match &self.value {
            Some(value) => serde_json::json!({ "value": value }),
            None => serde_json::Value::Null,
        }
    }

    fn load_state(&mut self, state: &serde_json::Value) -> Result<()> {
        self.value = state
            .get("value")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string);
        Ok(())
    }
}
