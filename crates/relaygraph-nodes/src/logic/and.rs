//! Logical AND

use relaygraph_engine::{
    NodeCategory, NodeContext, NodeLogic, NodeMetadata, NodeOptions, NodeType, PortDataType,
    PortSpec, Result,
};

/// Outputs `"0"` when either input is `"0"`, otherwise `"1"`
#[derive(Debug, Default)]
pub struct LogicAndNode;

impl LogicAndNode {
    pub const PORT_A: usize = 0;
    pub const PORT_B: usize = 1;
    pub const PORT_OUT: usize = 0;
}

impl NodeType for LogicAndNode {
    fn metadata() -> NodeMetadata {
        NodeMetadata {
            node_type: "Logic/AND".to_string(),
            category: NodeCategory::Logic,
            title: "AND".to_string(),
            description: "True when both inputs are true".to_string(),
            inputs: vec![
                PortSpec::new("In 1", PortDataType::Logical),
                PortSpec::new("In 2", PortDataType::Logical),
            ],
            outputs: vec![PortSpec::new("Out", PortDataType::Logical)],
            options: NodeOptions {
                reset_outputs_if_any_input_is_null: true,
            },
        }
    }
}

inventory::submit! {
    relaygraph_engine::NodeFactory {
        metadata: LogicAndNode::metadata,
        create: LogicAndNode::create,
    }
}

impl NodeLogic for LogicAndNode {
    fn on_input_change(&mut self, ctx: &mut NodeContext<'_>, _input: usize) -> Result<()> {
        let any_false =
            ctx.input(Self::PORT_A) == Some("0") || ctx.input(Self::PORT_B) == Some("0");
        ctx.set_output_value(Self::PORT_OUT, if any_false { "0" } else { "1" });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{engine, output, set};

    #[test]
    fn test_truth_table() {
        let engine = engine();
        let node = engine.create_node("Logic/AND").unwrap();

        for (a, b, expected) in [
            ("0", "0", "0"),
            ("1", "0", "0"),
            ("0", "1", "0"),
            ("1", "1", "1"),
        ] {
            set(&engine, &node, 0, Some(a));
            set(&engine, &node, 1, Some(b));
            assert_eq!(output(&engine, &node).as_deref(), Some(expected), "{} AND {}", a, b);
        }
    }
}
