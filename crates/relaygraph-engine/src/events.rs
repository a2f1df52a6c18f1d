//! Change notifications
//!
//! Every state change the engine makes is reported as an [`EngineEvent`]
//! to the registered [`EventSink`]s, in the order the changes happened.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::types::{Input, Link, NodeId, Output, SerializedNode};

/// Trait for receiving engine events
///
/// This abstracts over the transport mechanism (web socket hub, mpsc, etc.)
/// allowing the engine to be used in different contexts. Sinks are called
/// on the thread that made the change, after the graph lock is released.
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be sent (e.g., channel closed)
    fn send(&self, event: EngineEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

impl EventError {
    pub fn channel_closed() -> Self {
        Self {
            message: "Channel closed".to_string(),
        }
    }
}

/// Source of a debug message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DebugOrigin {
    /// The engine itself
    Engine,
    /// A node hook
    Node,
}

/// Events emitted as the graph changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EngineEvent {
    /// A node joined the graph
    #[serde(rename_all = "camelCase")]
    NodeAdded { node: SerializedNode },

    /// A node left the graph
    #[serde(rename_all = "camelCase")]
    NodeRemoved { node_id: NodeId },

    /// A node's data or state changed
    #[serde(rename_all = "camelCase")]
    NodeUpdated { node: SerializedNode },

    /// The whole node collection was replaced
    #[serde(rename_all = "camelCase")]
    NodesUpdated { nodes: Vec<SerializedNode> },

    /// An input received a value
    #[serde(rename_all = "camelCase")]
    InputUpdated { node_id: NodeId, input: Input },

    /// An output changed value
    #[serde(rename_all = "camelCase")]
    OutputUpdated { node_id: NodeId, output: Output },

    /// A link was created
    #[serde(rename_all = "camelCase")]
    LinkAdded { link: Link },

    /// A link was deleted
    #[serde(rename_all = "camelCase")]
    LinkRemoved { link: Link },

    /// The whole link collection was replaced
    #[serde(rename_all = "camelCase")]
    LinksUpdated { links: Vec<Link> },

    /// Diagnostic message from the engine or a node
    #[serde(rename_all = "camelCase")]
    Debug {
        origin: DebugOrigin,
        node_id: Option<NodeId>,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl EngineEvent {
    /// Create an engine debug event
    pub fn engine_debug(message: impl Into<String>) -> Self {
        Self::Debug {
            origin: DebugOrigin::Engine,
            node_id: None,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a node debug event
    pub fn node_debug(node_id: &str, message: impl Into<String>) -> Self {
        Self::Debug {
            origin: DebugOrigin::Node,
            node_id: Some(node_id.to_string()),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Message text if this is a debug event
    pub fn debug_message(&self) -> Option<&str> {
        match self {
            Self::Debug { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// A no-op event sink that discards all events
///
/// Useful for testing or when events aren't needed.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: EngineEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
pub struct VecEventSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().clone()
    }

    /// Take all collected events, leaving the sink empty
    pub fn drain(&self) -> Vec<EngineEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Clear all collected events
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: EngineEvent) -> Result<(), EventError> {
        self.events.lock().push(event);
        Ok(())
    }
}

/// Event sink that forwards into a tokio unbounded channel
///
/// Suited to a single async consumer such as a web socket broadcaster.
pub struct ChannelEventSink {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl ChannelEventSink {
    /// Create a sink and the receiver that drains it
    pub fn new() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelEventSink {
    fn send(&self, event: EngineEvent) -> Result<(), EventError> {
        self.tx.send(event).map_err(|_| EventError::channel_closed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_event_sink() {
        let sink = VecEventSink::new();

        sink.send(EngineEvent::node_debug("n1", "hello")).unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 1);

        match &events[0] {
            EngineEvent::Debug {
                origin, node_id, message, ..
            } => {
                assert_eq!(*origin, DebugOrigin::Node);
                assert_eq!(node_id.as_deref(), Some("n1"));
                assert_eq!(message, "hello");
            }
            _ => panic!("Expected Debug event"),
        }

        assert_eq!(sink.drain().len(), 1);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_null_event_sink() {
        let sink = NullEventSink;
        // Should not panic
        sink.send(EngineEvent::engine_debug("ignored")).unwrap();
    }

    #[test]
    fn test_event_json_shape() {
        let link = Link::new("out", "in");
        let json = serde_json::to_value(EngineEvent::LinkAdded { link }).unwrap();
        assert_eq!(json["type"], "linkAdded");
        assert_eq!(json["link"]["outputId"], "out");

        let json = serde_json::to_value(EngineEvent::NodeRemoved {
            node_id: "n1".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "nodeRemoved");
        assert_eq!(json["nodeId"], "n1");
    }

    #[tokio::test]
    async fn test_channel_event_sink() {
        let (sink, mut rx) = ChannelEventSink::new();
        sink.send(EngineEvent::engine_debug("first")).unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.debug_message(), Some("first"));

        drop(rx);
        assert!(sink.send(EngineEvent::engine_debug("lost")).is_err());
    }
}
