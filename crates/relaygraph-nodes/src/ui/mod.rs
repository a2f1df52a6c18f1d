//! UI nodes
//!
//! Widgets whose values come from the dashboard rather than from links.
//! Hosts drive them through [`relaygraph_engine::Engine::with_node`].

mod state;
mod switch;
mod timer;

pub use state::UiStateNode;
pub use switch::UiSwitchNode;
pub use timer::UiTimerNode;
