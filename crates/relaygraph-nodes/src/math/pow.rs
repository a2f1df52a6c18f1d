//! Power function

use relaygraph_engine::{
    NodeCategory, NodeContext, NodeLogic, NodeMetadata, NodeOptions, NodeType, PortDataType,
    PortSpec, Result,
};

/// Raises the first input to the power of the second
///
/// Inputs that do not parse as numbers clear the output and report on the
/// node debug channel.
#[derive(Debug, Default)]
pub struct MathPowNode;

impl MathPowNode {
    pub const PORT_BASE: usize = 0;
    pub const PORT_EXPONENT: usize = 1;
    pub const PORT_OUT: usize = 0;
}

impl NodeType for MathPowNode {
    fn metadata() -> NodeMetadata {
        NodeMetadata {
            node_type: "Math/Pow".to_string(),
            category: NodeCategory::Math,
            title: "Pow".to_string(),
            description: "Raises a number to a power".to_string(),
            inputs: vec![
                PortSpec::new("Base", PortDataType::Number),
                PortSpec::new("Exponent", PortDataType::Number),
            ],
            outputs: vec![PortSpec::new("Result", PortDataType::Number)],
            options: NodeOptions {
                reset_outputs_if_any_input_is_null: true,
            },
        }
    }
}

inventory::submit! {
    relaygraph_engine::NodeFactory {
        metadata: MathPowNode::metadata,
        create: MathPowNode::create,
    }
}

fn parse(ctx: &NodeContext<'_>, index: usize) -> Option<f64> {
    ctx.input(index)?.trim().parse().ok()
}

impl NodeLogic for MathPowNode {
    fn on_input_change(&mut self, ctx: &mut NodeContext<'_>, _input: usize) -> Result<()> {
        match (parse(ctx, Self::PORT_BASE), parse(ctx, Self::PORT_EXPONENT)) {
            (Some(base), Some(exponent)) => {
                ctx.set_output_value(Self::PORT_OUT, base.powf(exponent).to_string());
            }
            _ => {
                log::debug!("Pow node {} received a non-numeric input", ctx.node_id());
                ctx.debug("Incorrect value in input.");
                ctx.reset_outputs();
            }
        }
        Ok(())
    }
}
