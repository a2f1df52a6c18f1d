//! Events delay meter

use std::time::Instant;

use relaygraph_engine::{
    NodeCategory, NodeContext, NodeLogic, NodeMetadata, NodeOptions, NodeType, PortDataType,
    PortSpec, Result,
};

/// Measures the time between successive input events
///
/// Every input change writes the milliseconds elapsed since the previous
/// one. The first event is measured from creation, or from the last load.
#[derive(Debug)]
pub struct EventsDelayMeterNode {
    last_event: Instant,
}

impl Default for EventsDelayMeterNode {
    fn default() -> Self {
        Self {
            last_event: Instant::now(),
        }
    }
}

impl EventsDelayMeterNode {
    pub const PORT_EVENT: usize = 0;
    pub const PORT_DELAY: usize = 0;
}

impl NodeType for EventsDelayMeterNode {
    fn metadata() -> NodeMetadata {
        NodeMetadata {
            node_type: "Operation/Events Delay Meter".to_string(),
            category: NodeCategory::Operation,
            title: "Events Delay Meter".to_string(),
            description: "Milliseconds between successive input events".to_string(),
            inputs: vec![PortSpec::new("In", PortDataType::Text)],
            outputs: vec![PortSpec::new("Delay (ms)", PortDataType::Number)],
            options: NodeOptions::default(),
        }
    }
}

inventory::submit! {
    relaygraph_engine::NodeFactory {
        metadata: EventsDelayMeterNode::metadata,
        create: EventsDelayMeterNode::create,
    }
}

impl NodeLogic for EventsDelayMeterNode {
    fn on_input_change(&mut self, ctx: &mut NodeContext<'_>, _input: usize) -> Result<()> {
        let now = Instant::now();
        let delay_ms = now.duration_since(self.last_event).as_secs_f64() * 1000.0;
        self.last_event = now;
        ctx.set_output_value(Self::PORT_DELAY, delay_ms.to_string());
        Ok(())
    }

    fn on_deserialize(&mut self, _ctx: &mut NodeContext<'_>) {
        self.last_event = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::test_support::{engine, output, set};

    fn delay(engine: &relaygraph_engine::Engine, node: &str) -> f64 {
        output(engine, node).unwrap().parse().unwrap()
    }

    #[test]
    fn test_measures_gap_between_events() {
        let engine = engine();
        let node = engine.create_node("Operation/Events Delay Meter").unwrap();

        set(&engine, &node, 0, Some("a"));
        std::thread::sleep(Duration::from_millis(30));
        set(&engine, &node, 0, Some("b"));

        let measured = delay(&engine, &node);
        assert!(measured >= 30.0, "measured {}ms", measured);
    }

    #[test]
    fn test_tick_does_nothing() {
        let engine = engine();
        let node = engine.create_node("Operation/Events Delay Meter").unwrap();
        engine.tick();
        assert_eq!(output(&engine, &node), None);
    }
}
