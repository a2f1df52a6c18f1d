//! Per-channel RGB range remapping

use relaygraph_engine::{
    NodeCategory, NodeContext, NodeLogic, NodeMetadata, NodeOptions, NodeType, PortDataType,
    PortSpec, Result,
};

/// Linearly maps each channel of a colour from one range to another
///
/// All five inputs are `RRGGBB` hex colours, optionally prefixed with `#`.
/// Each channel of the value is mapped from `[in_min, in_max]` to
/// `[out_min, out_max]` of the same channel and clamped to `0..=255`. The
/// output is uppercase `RRGGBB`.
#[derive(Debug, Default)]
pub struct RgbRemapNode;

impl RgbRemapNode {
    pub const PORT_VALUE: usize = 0;
    pub const PORT_IN_MIN: usize = 1;
    pub const PORT_IN_MAX: usize = 2;
    pub const PORT_OUT_MIN: usize = 3;
    pub const PORT_OUT_MAX: usize = 4;
    pub const PORT_OUT: usize = 0;
}

impl NodeType for RgbRemapNode {
    fn metadata() -> NodeMetadata {
        NodeMetadata {
            node_type: "RGB/RGB Remap".to_string(),
            category: NodeCategory::Color,
            title: "RGB Remap".to_string(),
            description: "Remaps every colour channel between two ranges".to_string(),
            inputs: ["RGB Value", "RGB InMin", "RGB InMax", "RGB OutMin", "RGB OutMax"]
                .into_iter()
                .map(|name| PortSpec::new(name, PortDataType::Color))
                .collect(),
            outputs: vec![PortSpec::new("RGB", PortDataType::Color)],
            options: NodeOptions {
                reset_outputs_if_any_input_is_null: true,
            },
        }
    }
}

inventory::submit! {
    relaygraph_engine::NodeFactory {
        metadata: RgbRemapNode::metadata,
        create: RgbRemapNode::create,
    }
}

/// Parse `RRGGBB` or `#RRGGBB` into its channels
fn channels(raw: &str) -> Option<[u8; 3]> {
    let hex = raw.strip_prefix('#').unwrap_or(raw);
    let mut out = [0u8; 3];
    for (i, channel) in out.iter_mut().enumerate() {
        let pair = hex.get(i * 2..i * 2 + 2)?;
        *channel = u8::from_str_radix(pair, 16).ok()?;
    }
    Some(out)
}

fn remap(value: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    (value - in_min) / (in_max - in_min) * (out_max - out_min) + out_min
}

fn remap_colour(inputs: [[u8; 3]; 5]) -> Option<String> {
    let [value, in_min, in_max, out_min, out_max] = inputs;
    let mut result = String::with_capacity(6);
    for c in 0..3 {
        let mapped = remap(
            f64::from(value[c]),
            f64::from(in_min[c]),
            f64::from(in_max[c]),
            f64::from(out_min[c]),
            f64::from(out_max[c]),
        );
        // An empty input range maps nowhere
        if !mapped.is_finite() {
            return None;
        }
        // Truncate toward zero, then clamp
        let channel = (mapped.trunc() as i64).clamp(0, 255);
        result.push_str(&format!("{:02X}", channel));
    }
    Some(result)
}

impl NodeLogic for RgbRemapNode {
    fn on_input_change(&mut self, ctx: &mut NodeContext<'_>, _input: usize) -> Result<()> {
        let parsed: Option<Vec<[u8; 3]>> = (0..5)
            .map(|i| ctx.input(i).and_then(channels))
            .collect();
        let remapped = parsed
            .and_then(|colours| <[[u8; 3]; 5]>::try_from(colours).ok())
            .and_then(remap_colour);

        match remapped {
            Some(colour) => ctx.set_output_value(Self::PORT_OUT, colour),
            None => {
                ctx.debug("Incorrect value in input.");
                ctx.reset_outputs();
            }
        }
        Ok(())
    }
}
