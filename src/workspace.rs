use crate::block::{Block, Point, Size};
use crate::checker::ConnectionChecker;
use crate::connection::{Connection, PortId, PortRef, PortSlot};
use crate::event::{EventType, WorkspaceEvent};
use crate::layout::NOTCH_HEIGHT;
use crate::renderer;
use anyhow::{anyhow, Result};
use std::collections::{HashMap, HashSet};
use ulid::Ulid;

/// Workspace containing all blocks and their links
#[derive(Debug, Clone)]
pub struct Workspace {
    id: Ulid,

    /// All blocks indexed by ID
    blocks: HashMap<Ulid, Block>,

    /// Event log for history tracking
    events: Vec<WorkspaceEvent>,

    checker: ConnectionChecker,

    /// Newly created blocks are laid out right-to-left
    rtl: bool,

    /// Draw a hat over top-level statement blocks
    start_hats: bool,
}

impl Workspace {
    /// Create a new empty workspace
    pub fn new() -> Self {
        Self {
            id: Ulid::new(),
            blocks: HashMap::new(),
            events: Vec::new(),
            checker: ConnectionChecker::new(),
            rtl: false,
            start_hats: false,
        }
    }

    pub fn new_rtl() -> Self {
        let mut workspace = Self::new();
        workspace.rtl = true;
        workspace
    }

    pub fn id(&self) -> Ulid {
        self.id
    }

    pub fn is_rtl(&self) -> bool {
        self.rtl
    }

    pub fn checker(&self) -> &ConnectionChecker {
        &self.checker
    }

    pub fn start_hats(&self) -> bool {
        self.start_hats
    }

    pub fn set_start_hats(&mut self, on: bool) {
        self.start_hats = on;
    }

    // ========== Block CRUD Operations ==========

    /// Create a new empty block and add it to the workspace
    pub fn create_block(&mut self) -> Ulid {
        let mut block = Block::new(self.id);
        block.rtl = self.rtl;
        let block_id = block.id;

        self.log_event(EventType::BlockCreated {
            id: block_id,
            shadow: block.shadow,
            insertion_marker: block.insertion_marker,
        });

        self.blocks.insert(block_id, block);
        block_id
    }

    /// Get a block by ID
    pub fn block(&self, id: Ulid) -> Option<&Block> {
        self.blocks.get(&id)
    }

    /// Get a mutable reference to a block by ID
    pub fn block_mut(&mut self, id: Ulid) -> Option<&mut Block> {
        self.blocks.get_mut(&id)
    }

    /// Get all blocks
    pub fn blocks(&self) -> &HashMap<Ulid, Block> {
        &self.blocks
    }

    /// Move a block to a new workspace position
    pub fn set_position(&mut self, id: Ulid, to: Point) -> Result<()> {
        let block = self
            .blocks
            .get_mut(&id)
            .ok_or_else(|| anyhow!("Block not found: {}", id))?;
        let from = block.position;
        block.position = to;

        self.log_event(EventType::BlockMoved { id, from, to });
        Ok(())
    }

    /// Delete a block and everything nested under it. With `heal_stack`,
    /// the block's next-statement child is first spliced onto whatever the
    /// block's previous connection was attached to, so removing a block
    /// from the middle of a stack closes the gap instead of orphaning the
    /// tail.
    pub fn remove_block(&mut self, id: Ulid, heal_stack: bool) -> Result<()> {
        if !self.blocks.contains_key(&id) {
            return Err(anyhow!("Block not found: {}", id));
        }

        let parent_socket = self.connection(PortId::previous(id)).and_then(|c| c.target);
        let tail = self.connection(PortId::next(id)).and_then(|c| c.target);

        // Sever the links that attach this block to its parent.
        if parent_socket.is_some() {
            self.disconnect(PortId::previous(id))?;
        }
        if self
            .connection(PortId::output(id))
            .and_then(|c| c.target)
            .is_some()
        {
            self.disconnect(PortId::output(id))?;
        }

        if heal_stack {
            if let Some(tail) = tail {
                self.disconnect(PortId::next(id))?;
                if let Some(parent_socket) = parent_socket {
                    let checker = self.checker;
                    if checker.can_connect(
                        self.port_ref(parent_socket),
                        self.port_ref(tail),
                        false,
                        &HashSet::new(),
                    ) {
                        self.connect(parent_socket, tail)?;
                    }
                }
            }
        }

        // Everything still hanging below this block goes with it.
        let nested: Vec<Ulid> = {
            let block = self
                .blocks
                .get(&id)
                .ok_or_else(|| anyhow!("Block not found: {}", id))?;
            block
                .slots()
                .iter()
                .filter_map(|&slot| block.connection(slot))
                .filter(|connection| connection.kind.is_superior())
                .filter_map(|connection| connection.target)
                .map(|target| target.block)
                .collect()
        };
        for child in nested {
            self.remove_block(child, false)?;
        }

        self.blocks.remove(&id);
        self.log_event(EventType::BlockRemoved { id });
        Ok(())
    }

    // ========== Connection Operations ==========

    /// Resolve a port against this workspace; `None` if the block or the
    /// slot does not exist.
    pub fn port_ref(&self, id: PortId) -> Option<PortRef<'_>> {
        self.block(id.block)?.connection(id.slot)?;
        Some(PortRef {
            workspace: self,
            id,
        })
    }

    /// The connection stored at a port, if the block and slot exist
    pub fn connection(&self, id: PortId) -> Option<&Connection> {
        self.block(id.block)?.connection(id.slot)
    }

    fn connection_mut(&mut self, id: PortId) -> Option<&mut Connection> {
        self.block_mut(id.block)?.connection_mut(id.slot)
    }

    /// The block plugged into a port, if any
    pub fn target_block(&self, id: PortId) -> Option<&Block> {
        let target = self.connection(id)?.target?;
        self.block(target.block)
    }

    /// Link two ports, in either order. The pair is validated by the
    /// checker first, and a link that would put a block inside its own
    /// subtree is refused so the graph stays a forest of trees. A
    /// previously attached child on the inferior side is
    /// re-parented; an occupant of the superior socket is displaced: a
    /// shadow occupant is disposed, a real one is reattached further down
    /// the incoming block where possible and otherwise left dangling at
    /// its old coordinates.
    ///
    /// Returns the block left dangling by the connection, if any.
    pub fn connect(&mut self, one: PortId, two: PortId) -> Result<Option<Ulid>> {
        let verdict = self.checker.can_connect_with_reason(
            self.port_ref(one),
            self.port_ref(two),
            false,
            &HashSet::new(),
        );
        if !verdict.connectable() {
            return Err(anyhow!(
                "Cannot connect {:?} to {:?}: {}",
                one,
                two,
                verdict.message()
            ));
        }

        let one_kind = self
            .connection(one)
            .ok_or_else(|| anyhow!("No connection at {:?}", one))?
            .kind;
        let (superior, inferior) = if one_kind.is_superior() {
            (one, two)
        } else {
            (two, one)
        };

        // The checker sees the pair in isolation; ancestry is checked
        // here, before anything is mutated.
        if self.descendants(inferior.block).contains(&superior.block) {
            return Err(anyhow!(
                "Cannot connect {:?} to {:?}: block would contain itself",
                one,
                two
            ));
        }

        // A moving block is re-parented, not double-linked.
        if self.connection(inferior).and_then(|c| c.target).is_some() {
            self.disconnect(inferior)?;
        }

        let displaced = self.connection(superior).and_then(|c| c.target);
        if let Some(occupant) = displaced {
            self.disconnect(superior)?;
            if self
                .block(occupant.block)
                .map_or(false, |block| block.is_shadow())
            {
                self.remove_block(occupant.block, false)?;
            }
        }

        if let Some(connection) = self.connection_mut(superior) {
            connection.target = Some(inferior);
        }
        if let Some(connection) = self.connection_mut(inferior) {
            connection.target = Some(superior);
        }
        self.log_event(EventType::LinkCreated { superior, inferior });

        if let Some(orphan) = displaced {
            if self.blocks.contains_key(&orphan.block) {
                return self.rehome_orphan(superior, inferior, orphan);
            }
        }
        Ok(None)
    }

    /// Break the link at a port. Both ends are cleared; positions are
    /// untouched until the next render.
    pub fn disconnect(&mut self, port: PortId) -> Result<()> {
        let connection = self
            .connection(port)
            .ok_or_else(|| anyhow!("No connection at {:?}", port))?;
        let target = connection
            .target
            .ok_or_else(|| anyhow!("Port {:?} is not connected", port))?;
        let kind = connection.kind;

        if let Some(connection) = self.connection_mut(port) {
            connection.target = None;
        }
        if let Some(connection) = self.connection_mut(target) {
            connection.target = None;
        }

        let (superior, inferior) = if kind.is_superior() {
            (port, target)
        } else {
            (target, port)
        };
        self.log_event(EventType::LinkBroken { superior, inferior });
        Ok(())
    }

    /// Try to give a displaced block a new home on the block that bumped
    /// it out; failing that, log it as dangling and report it.
    fn rehome_orphan(
        &mut self,
        from: PortId,
        inferior: PortId,
        orphan: PortId,
    ) -> Result<Option<Ulid>> {
        let checker = self.checker;
        let home = match orphan.slot {
            PortSlot::Output => self.value_home_for_orphan(inferior.block, orphan),
            PortSlot::Previous => self
                .last_connection_in_stack(inferior.block)
                .filter(|&last| {
                    checker.can_connect(
                        self.port_ref(last),
                        self.port_ref(orphan),
                        false,
                        &HashSet::new(),
                    )
                }),
            _ => None,
        };

        match home {
            Some(home) => self.connect(home, orphan),
            None => {
                self.log_event(EventType::BlockDisplaced {
                    block: orphan.block,
                    from,
                });
                Ok(Some(orphan.block))
            }
        }
    }

    /// Descend through the chain of blocks starting at `start`, looking
    /// for a value socket to adopt the orphan: at each step the block must
    /// have exactly one compatible value input, and the walk follows
    /// occupied sockets until it finds a free one (or a shadow occupant,
    /// which may be covered).
    fn value_home_for_orphan(&self, start: Ulid, orphan: PortId) -> Option<PortId> {
        let mut seen = HashSet::new();
        let mut current = start;
        loop {
            if !seen.insert(current) {
                return None;
            }
            let candidate = self.single_compatible_input(current, orphan)?;
            match self.connection(candidate).and_then(|c| c.target) {
                None => return Some(candidate),
                Some(occupant) => {
                    if self
                        .block(occupant.block)
                        .map_or(true, |block| block.is_shadow())
                    {
                        return Some(candidate);
                    }
                    current = occupant.block;
                }
            }
        }
    }

    /// The block's one and only value input compatible with the orphan's
    /// output; `None` when there are zero or several candidates, since an
    /// ambiguous adoption would surprise the user.
    fn single_compatible_input(&self, id: Ulid, orphan: PortId) -> Option<PortId> {
        let orphan_connection = self.connection(orphan)?;
        let block = self.block(id)?;

        let mut found = None;
        for (index, input) in block.inputs.iter().enumerate() {
            let connection = match &input.connection {
                Some(connection) if connection.kind == orphan_connection.kind.opposite() => {
                    connection
                }
                _ => continue,
            };
            if !connection.checks_compatible_with(orphan_connection) {
                continue;
            }
            if found.is_some() {
                return None;
            }
            found = Some(PortId::input(id, index));
        }
        found
    }

    /// The open next connection at the bottom of the stack starting at
    /// `id`; `None` if the stack ends in a terminal block.
    pub fn last_connection_in_stack(&self, id: Ulid) -> Option<PortId> {
        let mut seen = HashSet::new();
        let mut current = id;
        loop {
            if !seen.insert(current) {
                return None;
            }
            let block = self.block(current)?;
            let next = block.next.as_ref()?;
            match next.target {
                None => return Some(PortId::next(current)),
                Some(target) => current = target.block,
            }
        }
    }

    /// The block and everything nested under it, in depth-first order
    pub fn descendants(&self, id: Ulid) -> Vec<Ulid> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        self.collect_descendants(id, &mut out, &mut seen);
        out
    }

    fn collect_descendants(&self, id: Ulid, out: &mut Vec<Ulid>, seen: &mut HashSet<Ulid>) {
        if !seen.insert(id) {
            return;
        }
        let block = match self.block(id) {
            Some(block) => block,
            None => return,
        };
        out.push(id);
        for slot in block.slots() {
            let connection = match block.connection(slot) {
                Some(connection) if connection.kind.is_superior() => connection,
                _ => continue,
            };
            if let Some(target) = connection.target {
                self.collect_descendants(target.block, out, seen);
            }
        }
    }

    /// Rendered size of the stack starting at `id`: tallest run down the
    /// next-chain, with stacked blocks overlapping by the notch depth.
    pub fn stack_size(&self, id: Ulid) -> Size {
        let mut width = 0.0f32;
        let mut height = 0.0f32;
        let mut current = Some(id);
        let mut first = true;
        let mut seen = HashSet::new();

        while let Some(block) = current.and_then(|id| self.block(id)) {
            if !seen.insert(block.id) {
                break;
            }
            if !first {
                height -= NOTCH_HEIGHT;
            }
            height += block.size.height;
            width = width.max(block.size.width);
            first = false;
            current = block
                .next
                .as_ref()
                .and_then(|next| next.target)
                .map(|target| target.block);
        }
        Size::new(width, height)
    }

    // ========== Rendering ==========

    /// Re-render the tree rooted at `root`, children before parents so
    /// that every socket sees its nested stack's final size. Updates each
    /// block's size, outline paths, and connection offsets in place.
    pub fn render(&mut self, root: Ulid) -> Result<()> {
        if !self.blocks.contains_key(&root) {
            return Err(anyhow!("Block not found: {}", root));
        }
        let order = self.descendants(root);
        for id in order.into_iter().rev() {
            let (path, offsets) = renderer::render_block(self, id)?;
            let size = path.size;
            let block = self
                .blocks
                .get_mut(&id)
                .ok_or_else(|| anyhow!("Block not found: {}", id))?;
            block.size = size;
            block.path = Some(path);
            for (slot, offset) in offsets {
                if let Some(connection) = block.connection_mut(slot) {
                    connection.offset = Some(offset);
                }
            }
        }
        Ok(())
    }

    /// Render every top-level block (and so every block)
    pub fn render_all(&mut self) -> Result<()> {
        let roots: Vec<Ulid> = self
            .blocks
            .values()
            .filter(|block| {
                let attached_above = block
                    .previous
                    .as_ref()
                    .map_or(false, |previous| previous.is_connected());
                let attached_left = block
                    .output
                    .as_ref()
                    .map_or(false, |output| output.is_connected());
                !attached_above && !attached_left
            })
            .map(|block| block.id)
            .collect();
        for root in roots {
            self.render(root)?;
        }
        Ok(())
    }

    // ========== Events ==========

    pub fn events(&self) -> &[WorkspaceEvent] {
        &self.events
    }

    pub(crate) fn log_event(&mut self, event: EventType) {
        self.events.push(WorkspaceEvent::new(event));
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}
