//! Logic nodes
//!
//! Gates over logical values. `"0"` is false; every other value is true.

mod and;
mod not;
mod or;

pub use and::LogicAndNode;
pub use not::LogicNotNode;
pub use or::LogicOrNode;
