use crate::connection::{PortId, PortRef};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Outcome of checking a proposed link between two connections.
///
/// Refusal is a normal return value, not an error: drag gestures probe
/// dozens of illegal pairs per tick and only the classification matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    CanConnect,
    SelfConnection,
    DifferentWorkspaces,
    WrongType,
    TargetNull,
    ChecksFailed,
    ShadowParent,
    DragChecksFailed,
}

impl Verdict {
    /// True only for `CanConnect`
    pub fn connectable(&self) -> bool {
        matches!(self, Verdict::CanConnect)
    }

    /// Developer-facing description of the verdict
    pub fn message(&self) -> &'static str {
        match self {
            Verdict::CanConnect => "Connection is allowed.",
            Verdict::SelfConnection => "Attempted to connect a block to itself.",
            Verdict::DifferentWorkspaces => "Blocks not on same workspace.",
            Verdict::WrongType => "Attempt to connect incompatible types.",
            Verdict::TargetNull => "Target connection is null.",
            Verdict::ChecksFailed => "Connection checks failed.",
            Verdict::ShadowParent => "Connecting non-shadow to shadow block.",
            Verdict::DragChecksFailed => "Drag checks failed.",
        }
    }
}

/// Pure decision component for connection legality.
///
/// Never mutates the graph; callers perform the actual link/unlink based
/// on the verdict. The set of in-flight connections during a drag is an
/// explicit parameter so the checker has no ambient state.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionChecker;

impl ConnectionChecker {
    pub fn new() -> Self {
        Self
    }

    /// Classify a proposed link. During a drag, `one` is the moving
    /// connection and `two` the stationary candidate; the drag heuristics
    /// are direction-sensitive, the safety and type checks are not.
    pub fn can_connect_with_reason(
        &self,
        one: Option<PortRef>,
        two: Option<PortRef>,
        is_dragging: bool,
        dragging: &HashSet<PortId>,
    ) -> Verdict {
        let (one, two) = match (one, two) {
            (Some(one), Some(two)) => (one, two),
            _ => return Verdict::TargetNull,
        };

        let safety = self.do_safety_checks(&one, &two);
        if !safety.connectable() {
            return safety;
        }
        if !self.do_type_checks(&one, &two) {
            return Verdict::ChecksFailed;
        }
        if is_dragging && !self.do_drag_checks(&one, &two, dragging) {
            return Verdict::DragChecksFailed;
        }
        Verdict::CanConnect
    }

    /// Boolean form of `can_connect_with_reason`
    pub fn can_connect(
        &self,
        one: Option<PortRef>,
        two: Option<PortRef>,
        is_dragging: bool,
        dragging: &HashSet<PortId>,
    ) -> bool {
        self.can_connect_with_reason(one, two, is_dragging, dragging)
            .connectable()
    }

    /// Structural legality: distinct source blocks, opposite kinds, same
    /// workspace, and a shadow block never parenting a real one.
    fn do_safety_checks(&self, one: &PortRef, two: &PortRef) -> Verdict {
        let block_one = one.source_block();
        let block_two = two.source_block();

        if block_one.id == block_two.id {
            return Verdict::SelfConnection;
        }
        if two.kind() != one.kind().opposite() {
            return Verdict::WrongType;
        }
        if block_one.workspace_id != block_two.workspace_id {
            return Verdict::DifferentWorkspaces;
        }

        let (superior, inferior) = if one.kind().is_superior() {
            (block_one, block_two)
        } else {
            (block_two, block_one)
        };
        if superior.shadow && !inferior.shadow {
            return Verdict::ShadowParent;
        }

        Verdict::CanConnect
    }

    /// Plug compatibility: empty check lists accept anything, otherwise
    /// the two lists must share at least one entry.
    fn do_type_checks(&self, one: &PortRef, two: &PortRef) -> bool {
        one.connection().checks_compatible_with(two.connection())
    }

    /// Heuristics that prevent nonsensical mid-drag outcomes. `one` is the
    /// moving connection, `two` the stationary candidate.
    fn do_drag_checks(&self, one: &PortRef, two: &PortRef, dragging: &HashSet<PortId>) -> bool {
        use crate::connection::ConnectionKind::*;

        // Never connect to a ghost preview block.
        if two.source_block().is_insertion_marker() {
            return false;
        }

        match two.kind() {
            Previous => return self.can_connect_to_previous(one, two, dragging),
            Output => {
                // An occupied output would silently discard its block.
                if two.is_connected() {
                    return false;
                }
            }
            Input => {
                // Splicing into an occupied value socket is allowed; the
                // occupant is bumped out. But don't offer to splice into
                // an immovable, non-shadow occupant.
                if let Some(occupant) = two.target_block() {
                    if !occupant.is_movable() && !occupant.is_shadow() {
                        return false;
                    }
                }
            }
            Next => {
                // Don't let a block with no next connection bump real
                // blocks out of a stack. Covering a shadow chain is fine,
                // and a terminal statement may replace another terminal
                // statement.
                if let Some(occupant) = two.target_block() {
                    if one.source_block().next.is_none()
                        && !occupant.is_shadow()
                        && occupant.next.is_some()
                    {
                        return false;
                    }
                }
            }
        }

        // A connection mid-drag may not be connected to; this also blocks
        // attaching to anything nested inside the dragged stack itself.
        !dragging.contains(&two.id)
    }

    /// A previous connection already linked to a real block is never
    /// available. One linked only to an insertion marker at the top of its
    /// ghost stack still is.
    fn can_connect_to_previous(
        &self,
        one: &PortRef,
        two: &PortRef,
        dragging: &HashSet<PortId>,
    ) -> bool {
        if one.is_connected() {
            return false;
        }
        if dragging.contains(&two.id) {
            return false;
        }
        let occupant = match two.target_block() {
            Some(block) => block,
            None => return true,
        };
        if occupant.is_insertion_marker() {
            return occupant
                .previous
                .as_ref()
                .map_or(true, |previous| previous.target.is_none());
        }
        false
    }
}
