//! Relaygraph Engine - tick-driven dataflow graphs for home automation
//!
//! A graph is a set of nodes with ordered input and output ports, joined by
//! links from an output to an input. Port values are optional strings.
//! When an output changes, its value is pushed synchronously through every
//! link leaving it, and each receiving node reacts in its input handler,
//! which may change further outputs. A background scheduler additionally
//! ticks every node at a configurable interval so time-based nodes (timers,
//! delays, meters) can act on their own.
//!
//! # Architecture
//!
//! - [`Engine`]: owns the graph, propagates changes, runs the scheduler
//! - [`NodeLogic`] / [`NodeType`]: behaviour and metadata of a node variant
//! - [`NodeRegistry`]: type tag to factory map, filled at link time through
//!   [`NodeFactory`] entries
//! - [`EventSink`]: observers receiving every [`EngineEvent`]
//! - [`GraphRepository`]: optional persistence, with in-memory and JSON file
//!   backends
//! - [`UndoHistory`]: compressed snapshots for editor undo/redo
//!
//! # Example
//!
//! ```ignore
//! use relaygraph_engine::{Engine, JsonFileRepository};
//!
//! let engine = Engine::builder()
//!     .repository(JsonFileRepository::new("./graph"))
//!     .build()?;
//! engine.start();
//! ```

pub mod config;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod events;
mod graph;
pub mod node;
pub mod registry;
pub mod repository;
mod scheduler;
pub mod store;
pub mod types;
pub mod undo;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types
pub use config::{CyclePolicy, EngineConfig};
pub use descriptor::{NodeMetadata, NodeType, PortSpec};
pub use engine::{Engine, EngineBuilder, EngineStats, TickFailure, TickReport};
pub use error::{EngineError, Result};
pub use events::{ChannelEventSink, DebugOrigin, EngineEvent, EventError, EventSink, NullEventSink, VecEventSink};
pub use node::{Node, NodeContext, NodeLogic};
pub use registry::{NodeFactory, NodeRegistry};
pub use repository::{GraphRepository, MemoryRepository};
pub use store::JsonFileRepository;
pub use types::{
    GraphDocument, Input, Link, LinkId, NodeCategory, NodeData, NodeId, NodeOptions, Output, Port,
    PortDataType, PortId, SerializedNode,
};
pub use undo::UndoHistory;
pub use validation::{validate_document, ValidationError};
