// Block Graph Editor - Core Library

pub mod block;
pub mod checker;
pub mod connection;
pub mod drag;
pub mod event;
pub mod layout;
pub mod renderer;
pub mod workspace;

// Re-export main types for convenience
pub use block::{Align, Block, Field, Input, InputKind, Point, Size};
pub use checker::{ConnectionChecker, Verdict};
pub use connection::{Connection, ConnectionKind, PortId, PortRef, PortSlot};
pub use drag::{dragging_ports, find_reconnection_target, ConnectionCandidate};
pub use event::{EventType, WorkspaceEvent};
pub use layout::{plan_rows, Row, RowInput, RowKind, RowPlan};
pub use renderer::{FieldPosition, PathBuilder, PathObject, PathStep};
pub use workspace::Workspace;
