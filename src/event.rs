use crate::block::Point;
use crate::connection::PortId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// A workspace event with timestamp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceEvent {
    pub timestamp: DateTime<Utc>,
    pub event: EventType,
}

impl WorkspaceEvent {
    /// Create a new event with the current timestamp
    pub fn new(event: EventType) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }

    /// Create a new event with a specific timestamp
    pub fn with_timestamp(timestamp: DateTime<Utc>, event: EventType) -> Self {
        Self { timestamp, event }
    }
}

/// Types of events that can occur in the workspace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventType {
    BlockCreated {
        id: Ulid,
        shadow: bool,
        insertion_marker: bool,
    },

    BlockRemoved {
        id: Ulid,
    },

    BlockMoved {
        id: Ulid,
        from: Point,
        to: Point,
    },

    LinkCreated {
        superior: PortId,
        inferior: PortId,
    },

    LinkBroken {
        superior: PortId,
        inferior: PortId,
    },

    /// A connected block was bumped out of its socket by a new connection
    BlockDisplaced {
        block: Ulid,
        from: PortId,
    },
}
