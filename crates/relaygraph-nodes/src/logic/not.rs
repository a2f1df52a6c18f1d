//! Logical NOT

use relaygraph_engine::{
    NodeCategory, NodeContext, NodeLogic, NodeMetadata, NodeOptions, NodeType, PortDataType,
    PortSpec, Result,
};

/// Outputs `"1"` when its input is `"0"`, otherwise `"0"`
#[derive(Debug, Default)]
pub struct LogicNotNode;

impl LogicNotNode {
    pub const PORT_IN: usize = 0;
    pub const PORT_OUT: usize = 0;
}

impl NodeType for LogicNotNode {
    fn metadata() -> NodeMetadata {
        NodeMetadata {
            node_type: "Logic/NOT".to_string(),
            category: NodeCategory::Logic,
            title: "NOT".to_string(),
            description: "Inverts a logical value".to_string(),
            inputs: vec![PortSpec::new("In", PortDataType::Logical)],
            outputs: vec![PortSpec::new("Out", PortDataType::Logical)],
            options: NodeOptions {
                reset_outputs_if_any_input_is_null: true,
            },
        }
    }
}

inventory::submit! {
    relaygraph_engine::NodeFactory {
        metadata: LogicNotNode::metadata,
        create: LogicNotNode::create,
    }
}

impl NodeLogic for LogicNotNode {
    fn on_input_change(&mut self, ctx: &mut NodeContext<'_>, _input: usize) -> Result<()> {
        let inverted = if ctx.input(Self::PORT_IN) == Some("0") { "1" } else { "0" };
        ctx.set_output_value(Self::PORT_OUT, inverted);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{engine, input_id, output, output_id, set};

    #[test]
    fn test_inverts() {
        let engine = engine();
        let node = engine.create_node("Logic/NOT").unwrap();

        set(&engine, &node, 0, Some("0"));
        assert_eq!(output(&engine, &node).as_deref(), Some("1"));
        set(&engine, &node, 0, Some("1"));
        assert_eq!(output(&engine, &node).as_deref(), Some("0"));
        set(&engine, &node, 0, None);
        assert_eq!(output(&engine, &node), None);
    }

    #[test]
    fn test_chained_gates() {
        let engine = engine();
        let first = engine.create_node("Logic/NOT").unwrap();
        let second = engine.create_node("Logic/NOT").unwrap();
        engine
            .add_link(&output_id(&engine, &first, 0), &input_id(&engine, &second, 0))
            .unwrap();

        set(&engine, &first, 0, Some("0"));
        assert_eq!(output(&engine, &second).as_deref(), Some("0"));
        set(&engine, &first, 0, Some("1"));
        assert_eq!(output(&engine, &second).as_deref(), Some("1"));
    }
}
