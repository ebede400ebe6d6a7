use crate::block::Point;
use crate::connection::PortId;
use crate::workspace::Workspace;
use std::collections::HashSet;
use ulid::Ulid;

/// The best reconnection found for a dragged stack
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionCandidate {
    /// Connection on the dragged stack
    pub local: PortId,

    /// Stationary connection it would link to
    pub neighbour: PortId,

    /// Distance between the two at the drag position
    pub radius: f32,

    /// Block currently occupying the neighbour, which a drop would bump
    pub displaced: Option<Ulid>,
}

/// Every connection on a dragged block and the blocks nested under it.
/// Passed to the checker so the stack cannot connect to itself mid-air.
pub fn dragging_ports(workspace: &Workspace, root: Ulid) -> HashSet<PortId> {
    let mut ports = HashSet::new();
    for id in workspace.descendants(root) {
        if let Some(block) = workspace.block(id) {
            for slot in block.slots() {
                ports.insert(PortId::new(id, slot));
            }
        }
    }
    ports
}

/// Scan the dragged stack's connections, displaced by `delta` from their
/// rendered positions, against every other rendered connection in the
/// workspace. Returns the closest pair within `max_radius` that the
/// checker accepts under drag rules; the search itself moves nothing.
pub fn find_reconnection_target(
    workspace: &Workspace,
    dragged: Ulid,
    delta: Point,
    max_radius: f32,
) -> Option<ConnectionCandidate> {
    let stack = workspace.descendants(dragged);
    let stack_set: HashSet<Ulid> = stack.iter().copied().collect();
    let dragging = dragging_ports(workspace, dragged);
    let checker = *workspace.checker();

    let mut best: Option<ConnectionCandidate> = None;
    for &id in &stack {
        let block = match workspace.block(id) {
            Some(block) => block,
            None => continue,
        };
        for slot in block.slots() {
            let local = PortId::new(id, slot);
            let local_ref = match workspace.port_ref(local) {
                Some(port) => port,
                None => continue,
            };
            let position = match local_ref.absolute_position() {
                Some(position) => position.offset_by(delta.x, delta.y),
                None => continue,
            };

            for neighbour_block in workspace.blocks().values() {
                if stack_set.contains(&neighbour_block.id) {
                    continue;
                }
                for neighbour_slot in neighbour_block.slots() {
                    let neighbour = PortId::new(neighbour_block.id, neighbour_slot);
                    let neighbour_ref = match workspace.port_ref(neighbour) {
                        Some(port) => port,
                        None => continue,
                    };
                    let neighbour_position = match neighbour_ref.absolute_position() {
                        Some(position) => position,
                        None => continue,
                    };

                    let radius = position.distance_to(&neighbour_position);
                    if radius > max_radius {
                        continue;
                    }
                    if let Some(best) = &best {
                        if radius >= best.radius {
                            continue;
                        }
                    }
                    if !checker.can_connect(
                        Some(local_ref),
                        Some(neighbour_ref),
                        true,
                        &dragging,
                    ) {
                        continue;
                    }

                    let displaced = workspace
                        .connection(neighbour)
                        .and_then(|connection| connection.target)
                        .map(|target| target.block);
                    best = Some(ConnectionCandidate {
                        local,
                        neighbour,
                        radius,
                        displaced,
                    });
                }
            }
        }
    }
    best
}
