//! Logical OR

use relaygraph_engine::{
    NodeCategory, NodeContext, NodeLogic, NodeMetadata, NodeOptions, NodeType, PortDataType,
    PortSpec, Result,
};

/// Outputs `"1"` unless both inputs are exactly `"0"`
///
/// The output is cleared while either input is unset.
#[derive(Debug, Default)]
pub struct LogicOrNode;

impl LogicOrNode {
    pub const PORT_A: usize = 0;
    pub const PORT_B: usize = 1;
    pub const PORT_OUT: usize = 0;
}

impl NodeType for LogicOrNode {
    fn metadata() -> NodeMetadata {
        NodeMetadata {
            node_type: "Logic/OR".to_string(),
            category: NodeCategory::Logic,
            title: "OR".to_string(),
            description: "True when either input is true".to_string(),
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
        metadata: LogicOrNode::metadata,
        create: LogicOrNode::create,
    }
}

impl NodeLogic for LogicOrNode {
    fn on_input_change(&mut self, ctx: &mut NodeContext<'_>, _input: usize) -> Result<()> {
        let both_false =
            ctx.input(Self::PORT_A) == Some("0") && ctx.input(Self::PORT_B) == Some("0");
        ctx.set_output_value(Self::PORT_OUT, if both_false { "0" } else { "1" });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{engine, output, set};

    #[test]
    fn test_truth_table() {
        let engine = engine();
        let node = engine.create_node("Logic/OR").unwrap();

        set(&engine, &node, 0, Some("0"));
        set(&engine, &node, 1, Some("0"));
        assert_eq!(output(&engine, &node).as_deref(), Some("0"));

        set(&engine, &node, 0, Some("1"));
        assert_eq!(output(&engine, &node).as_deref(), Some("1"));

        // Anything but "0" counts as true
        set(&engine, &node, 0, Some("on"));
        assert_eq!(output(&engine, &node).as_deref(), Some("1"));
    }

    #[test]
    fn test_unset_input_clears_output() {
        let engine = engine();
        let node = engine.create_node("Logic/OR").unwrap();
        set(&engine, &node, 0, Some("1"));
        set(&engine, &node, 1, Some("0"));
        assert_eq!(output(&engine, &node).as_deref(), Some("1"));

        set(&engine, &node, 1, None);
        assert_eq!(output(&engine, &node), None);
    }

    #[test]
    fn test_metadata() {
        let meta = LogicOrNode::metadata();
        assert_eq!(meta.inputs.len(), 2);
        assert_eq!(meta.outputs.len(), 1);
        assert!(meta.options.reset_outputs_if_any_input_is_null);
        assert!(meta.inputs.iter().all(|p| p.data_type == PortDataType::Logical));
    }
}
