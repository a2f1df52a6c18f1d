//! Event delay line

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use relaygraph_engine::{
    NodeCategory, NodeContext, NodeLogic, NodeMetadata, NodeOptions, NodeType, PortDataType,
    PortSpec, Result,
};

/// Default delay of new instances
pub const DEFAULT_DELAY_MS: u64 = 1000;

/// Re-emits every value it receives after a fixed delay
///
/// Values wait in a queue and are released from `tick`, so the effective
/// delay is rounded up to the scheduler interval. Pending values are not
/// persisted.
#[derive(Debug, Default)]
pub struct EventDelayNode {
    pending: VecDeque<(Instant, Option<String>)>,
}

impl EventDelayNode {
    pub const PORT_VALUE: usize = 0;
    pub const PORT_INTERVAL: usize = 1;
    pub const PORT_OUT: usize = 0;

    /// Values waiting to be released
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Release time for a value arriving now, if the interval is usable
    fn due(ctx: &NodeContext<'_>) -> Option<Instant> {
        let raw = ctx.input(Self::PORT_INTERVAL)?;
        let ms: f64 = raw.trim().parse().ok()?;
        let delay = Duration::try_from_secs_f64(ms / 1000.0).ok()?;
        Instant::now().checked_add(delay)
    }
}

impl NodeType for EventDelayNode {
    fn metadata() -> NodeMetadata {
        NodeMetadata {
            node_type: "Operation/Event Delay".to_string(),
            category: NodeCategory::Operation,
            title: "Event Delay".to_string(),
            description: "Re-emits each input value after a delay".to_string(),
            inputs: vec![
                PortSpec::new("Value", PortDataType::Any),
                PortSpec::new("Interval (ms)", PortDataType::Number)
                    .with_default(DEFAULT_DELAY_MS.to_string()),
            ],
            outputs: vec![PortSpec::new("Value", PortDataType::Any)],
            options: NodeOptions::default(),
        }
    }
}

inventory::submit! {
    relaygraph_engine::NodeFactory {
        metadata: EventDelayNode::metadata,
        create: EventDelayNode::create,
    }
}

impl NodeLogic for EventDelayNode {
    fn on_input_change(&mut self, ctx: &mut NodeContext<'_>, input: usize) -> Result<()> {
        if input != Self::PORT_VALUE {
            return Ok(());
        }
        let Some(due) = Self::due(ctx) else {
            ctx.debug("Incorrect value in input.");
            ctx.reset_outputs();
            return Ok(());
        };
        let value = ctx.input(Self::PORT_VALUE).map(str::to_string);
        self.pending.push_back((due, value));
        Ok(())
    }

    fn tick(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        let now = Instant::now();
        while self.pending.front().is_some_and(|(due, _)| *due <= now) {
            if let Some((_, value)) = self.pending.pop_front() {
                ctx.set_output(Self::PORT_OUT, value);
            }
        }
        Ok(())
    }

    fn on_deserialize(&mut self, _ctx: &mut NodeContext<'_>) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{engine, input_id, output, set};

    #[test]
    fn test_value_released_on_tick_after_delay() {
        let engine = engine();
        let node = engine.create_node("Operation/Event Delay").unwrap();
        set(&engine, &node, 1, Some("0"));

        set(&engine, &node, 0, Some("ping"));
        assert_eq!(output(&engine, &node), None);

        engine.tick();
        assert_eq!(output(&engine, &node).as_deref(), Some("ping"));
    }

    #[test]
    fn test_value_held_until_due() {
        let engine = engine();
        let node = engine.create_node("Operation/Event Delay").unwrap();
        assert_eq!(
            engine.input(&input_id(&engine, &node, 1)).unwrap().value.as_deref(),
            Some("1000")
        );

        set(&engine, &node, 0, Some("later"));
        engine.tick();

        assert_eq!(output(&engine, &node), None);
        let pending = engine
            .with_node(&node, |delay: &mut EventDelayNode, _| delay.pending())
            .unwrap();
        assert_eq!(pending, 1);
    }

    #[test]
    fn test_interval_change_does_not_enqueue() {
        let engine = engine();
        let node = engine.create_node("Operation/Event Delay").unwrap();
        set(&engine, &node, 1, Some("5"));
        set(&engine, &node, 1, Some("bogus"));

        let pending = engine
            .with_node(&node, |delay: &mut EventDelayNode, _| delay.pending())
            .unwrap();
        assert_eq!(pending, 0);

        // A bad interval refuses the value
        set(&engine, &node, 0, Some("x"));
        let pending = engine
            .with_node(&node, |delay: &mut EventDelayNode, _| delay.pending())
            .unwrap();
        assert_eq!(pending, 0);
    }

    #[test]
    fn test_out_of_range_interval_refuses_value() {
        let engine = engine();
        let node = engine.create_node("Operation/Event Delay").unwrap();
        set(&engine, &node, 1, Some("0"));
        set(&engine, &node, 0, Some("first"));
        engine.tick();
        assert_eq!(output(&engine, &node).as_deref(), Some("first"));

        for interval in ["1e300", "-5", "inf"] {
            set(&engine, &node, 1, Some(interval));
            set(&engine, &node, 0, Some(interval));

            let pending = engine
                .with_node(&node, |delay: &mut EventDelayNode, _| delay.pending())
                .unwrap();
            assert_eq!(pending, 0, "interval {}", interval);
            assert_eq!(output(&engine, &node), None);
        }
    }
}
