//! Operation nodes
//!
//! Nodes that deal with the timing of events rather than their values.

mod delay_meter;
mod event_delay;

pub use delay_meter::EventsDelayMeterNode;
pub use event_delay::EventDelayNode;
