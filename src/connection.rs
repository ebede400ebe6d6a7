use crate::block::{Block, Point};
use crate::workspace::Workspace;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// The four connection kinds. Previous/next pair statement blocks into
/// stacks; output/input plug expression blocks into value sockets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ConnectionKind {
    Previous,
    Next,
    Output,
    Input,
}

impl ConnectionKind {
    /// The only kind this kind may link to
    pub fn opposite(self) -> ConnectionKind {
        match self {
            ConnectionKind::Previous => ConnectionKind::Next,
            ConnectionKind::Next => ConnectionKind::Previous,
            ConnectionKind::Output => ConnectionKind::Input,
            ConnectionKind::Input => ConnectionKind::Output,
        }
    }

    /// Superior connections face down or right and own the link
    pub fn is_superior(self) -> bool {
        matches!(self, ConnectionKind::Input | ConnectionKind::Next)
    }
}

/// Which connection slot on a block a `PortId` names
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PortSlot {
    Previous,
    Next,
    Output,
    Input(usize),
}

/// Stable address of one connection: the owning block plus the slot
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PortId {
    pub block: Ulid,
    pub slot: PortSlot,
}

impl PortId {
    pub fn new(block: Ulid, slot: PortSlot) -> Self {
        Self { block, slot }
    }

    pub fn previous(block: Ulid) -> Self {
        Self::new(block, PortSlot::Previous)
    }

    pub fn next(block: Ulid) -> Self {
        Self::new(block, PortSlot::Next)
    }

    pub fn output(block: Ulid) -> Self {
        Self::new(block, PortSlot::Output)
    }

    pub fn input(block: Ulid, index: usize) -> Self {
        Self::new(block, PortSlot::Input(index))
    }
}

/// A typed, positioned socket on a block.
///
/// `target` is the socket this one is currently linked to; link symmetry
/// (if `a.target == b` then `b.target == a`) is maintained by the
/// workspace mutation operations, never by hand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Connection {
    pub kind: ConnectionKind,

    /// Accepted type-check strings; `None` accepts anything
    pub checks: Option<Vec<String>>,

    pub target: Option<PortId>,

    /// Block-relative position, written by the path renderer each pass
    pub offset: Option<Point>,
}

impl Connection {
    pub fn new(kind: ConnectionKind, checks: Option<Vec<String>>) -> Self {
        Self {
            kind,
            checks,
            target: None,
            offset: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.target.is_some()
    }

    /// Replace the accepted type list; `None` accepts anything
    pub fn set_checks(&mut self, checks: Option<Vec<String>>) {
        self.checks = checks;
    }

    /// True if the two check lists are plug-compatible: either list empty
    /// or missing matches anything, otherwise they must intersect.
    pub fn checks_compatible_with(&self, other: &Connection) -> bool {
        match (&self.checks, &other.checks) {
            (Some(mine), Some(theirs)) => mine.iter().any(|check| theirs.contains(check)),
            _ => true,
        }
    }
}

/// A connection resolved against its owning workspace, so that callers
/// (the checker in particular) can reach the source block, the target,
/// and workspace identity without any ambient state.
#[derive(Clone, Copy)]
pub struct PortRef<'a> {
    pub workspace: &'a Workspace,
    pub id: PortId,
}

impl<'a> PortRef<'a> {
    pub fn connection(&self) -> &'a Connection {
        // A PortRef is only handed out for slots that exist.
        self.workspace
            .block(self.id.block)
            .and_then(|block| block.connection(self.id.slot))
            .expect("PortRef names a missing connection")
    }

    pub fn source_block(&self) -> &'a Block {
        self.workspace
            .block(self.id.block)
            .expect("PortRef names a missing block")
    }

    pub fn kind(&self) -> ConnectionKind {
        self.connection().kind
    }

    pub fn is_connected(&self) -> bool {
        self.connection().is_connected()
    }

    /// The socket this one is linked to, resolved in the same workspace
    pub fn target(&self) -> Option<PortRef<'a>> {
        let target = self.connection().target?;
        self.workspace.port_ref(target)
    }

    pub fn target_block(&self) -> Option<&'a Block> {
        self.target().map(|port| port.source_block())
    }

    /// Absolute workspace position, if the block has been rendered
    pub fn absolute_position(&self) -> Option<Point> {
        let block = self.source_block();
        let offset = self.connection().offset?;
        Some(block.position.offset_by(offset.x, offset.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_kinds() {
        assert_eq!(
            ConnectionKind::Previous.opposite(),
            ConnectionKind::Next
        );
        assert_eq!(ConnectionKind::Next.opposite(), ConnectionKind::Previous);
        assert_eq!(ConnectionKind::Output.opposite(), ConnectionKind::Input);
        assert_eq!(ConnectionKind::Input.opposite(), ConnectionKind::Output);
    }

    #[test]
    fn test_superior_kinds() {
        assert!(ConnectionKind::Input.is_superior());
        assert!(ConnectionKind::Next.is_superior());
        assert!(!ConnectionKind::Output.is_superior());
        assert!(!ConnectionKind::Previous.is_superior());
    }

    #[test]
    fn test_check_intersection() {
        let mut a = Connection::new(ConnectionKind::Output, None);
        let mut b = Connection::new(ConnectionKind::Input, None);

        // Either side promiscuous matches anything.
        assert!(a.checks_compatible_with(&b));
        a.set_checks(Some(vec!["Number".to_string()]));
        assert!(a.checks_compatible_with(&b));

        // Disjoint lists do not match.
        b.set_checks(Some(vec!["String".to_string()]));
        assert!(!a.checks_compatible_with(&b));

        // A single shared entry is enough.
        b.set_checks(Some(vec!["String".to_string(), "Number".to_string()]));
        assert!(a.checks_compatible_with(&b));
    }

    #[test]
    fn test_port_id_constructors() {
        let block = Ulid::new();
        assert_eq!(PortId::previous(block).slot, PortSlot::Previous);
        assert_eq!(PortId::input(block, 2).slot, PortSlot::Input(2));
        assert_eq!(PortId::output(block).block, block);
    }
}
