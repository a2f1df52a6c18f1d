//! Relaygraph Nodes
//!
//! Built-in node variants for the relaygraph engine. Every variant submits
//! a [`relaygraph_engine::NodeFactory`] through `inventory`, so linking this
//! crate is enough for [`relaygraph_engine::NodeRegistry::with_builtins`]
//! to find them.
//!
//! # Categories
//!
//! - **Logic**: boolean gates over `"0"` / `"1"` values
//! - **Math**: numeric functions
//! - **Operation**: time-related event handling
//! - **Color**: hex colour processing
//! - **UI**: values driven from the dashboard (switches, timers, state)
//!
//! Binaries that never name a type from this crate must still reference it
//! so the linker keeps the registrations:
//!
//! ```ignore
//! use relaygraph_nodes as _;
//! ```

pub mod color;
pub mod logic;
pub mod math;
pub mod operation;
pub mod ui;

pub use color::*;
pub use logic::*;
pub use math::*;
pub use operation::*;
pub use ui::*;
