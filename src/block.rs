use crate::connection::{Connection, ConnectionKind};
use crate::renderer::PathObject;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// A point in block or workspace coordinates (pixels)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Component-wise sum
    pub fn offset_by(&self, dx: f32, dy: f32) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A rendered width/height pair
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// An opaque content unit supplied by an external field widget.
///
/// The layout engine only needs the measured box; what the field renders
/// (text, dropdown, colour swatch) is outside this crate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Field {
    pub width: f32,
    pub height: f32,
    /// Spacer fields occupy width but never get a separation gap after them
    pub is_spacer: bool,
}

impl Field {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            is_spacer: false,
        }
    }

    pub fn spacer(width: f32) -> Self {
        Self {
            width,
            height: 0.0,
            is_spacer: true,
        }
    }
}

/// Input kind determines row grouping and connector shape
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum InputKind {
    /// Accepts an expression block (puzzle tab)
    Value,
    /// Accepts a statement stack (C-shaped notch)
    Statement,
    /// Fields only, no connection
    Dummy,
}

/// Horizontal alignment of an input's fields within its row
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Align {
    Left,
    Centre,
    Right,
}

/// A named slot on a block holding fields and, for value/statement
/// inputs, the connection a nested block plugs into.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Input {
    pub name: String,
    pub kind: InputKind,
    pub fields: Vec<Field>,
    pub connection: Option<Connection>,
    pub align: Align,
}

impl Input {
    pub fn new(name: impl Into<String>, kind: InputKind, checks: Option<Vec<String>>) -> Self {
        let connection = match kind {
            InputKind::Value => Some(Connection::new(ConnectionKind::Input, checks)),
            InputKind::Statement => Some(Connection::new(ConnectionKind::Next, checks)),
            InputKind::Dummy => None,
        };
        Self {
            name: name.into(),
            kind,
            fields: Vec::new(),
            connection,
            align: Align::Left,
        }
    }

    /// Append a field to this input's field row
    pub fn append_field(&mut self, field: Field) -> &mut Self {
        self.fields.push(field);
        self
    }

    pub fn set_align(&mut self, align: Align) -> &mut Self {
        self.align = align;
        self
    }
}

/// A node in the program tree: ordered inputs, optional previous/next/output
/// connections, and the geometry produced by the last render pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Block {
    /// Unique identifier
    pub id: Ulid,

    /// Identity of the owning workspace; a block belongs to exactly one
    pub workspace_id: Ulid,

    /// Top-left corner in workspace coordinates
    pub position: Point,

    /// Ordered inputs (value, statement, dummy)
    pub inputs: Vec<Input>,

    pub previous: Option<Connection>,
    pub next: Option<Connection>,
    pub output: Option<Connection>,

    /// Mirror geometry right-to-left
    pub rtl: bool,

    /// Placeholder block that is displaced rather than connected to
    pub shadow: bool,

    /// Transient drag-preview ghost; never part of the persisted program
    pub insertion_marker: bool,

    pub movable: bool,

    /// Pack value inputs onto shared rows instead of external tabs
    pub inputs_inline: bool,

    /// Rendered size, written by the path renderer
    pub size: Size,

    /// Geometry of the last render pass, replaced wholesale each time
    pub path: Option<PathObject>,
}

impl Block {
    pub(crate) fn new(workspace_id: Ulid) -> Self {
        Self {
            id: Ulid::new(),
            workspace_id,
            position: Point::default(),
            inputs: Vec::new(),
            previous: None,
            next: None,
            output: None,
            rtl: false,
            shadow: false,
            insertion_marker: false,
            movable: true,
            inputs_inline: false,
            size: Size::default(),
            path: None,
        }
    }

    /// Enable the previous-statement connection.
    /// Expression blocks (with an output) are not stackable.
    pub fn set_previous_statement(&mut self, checks: Option<Vec<String>>) -> Result<()> {
        if self.output.is_some() {
            return Err(anyhow!(
                "Block {}: cannot have both an output and a previous connection",
                self.id
            ));
        }
        self.previous = Some(Connection::new(ConnectionKind::Previous, checks));
        Ok(())
    }

    /// Enable the next-statement connection
    pub fn set_next_statement(&mut self, checks: Option<Vec<String>>) -> Result<()> {
        if self.output.is_some() {
            return Err(anyhow!(
                "Block {}: cannot have both an output and a next connection",
                self.id
            ));
        }
        self.next = Some(Connection::new(ConnectionKind::Next, checks));
        Ok(())
    }

    /// Enable the output connection, making this an expression block
    pub fn set_output(&mut self, checks: Option<Vec<String>>) -> Result<()> {
        if self.previous.is_some() || self.next.is_some() {
            return Err(anyhow!(
                "Block {}: cannot have both an output and previous/next connections",
                self.id
            ));
        }
        self.output = Some(Connection::new(ConnectionKind::Output, checks));
        Ok(())
    }

    /// Append an input; returns its index
    pub fn add_input(&mut self, input: Input) -> usize {
        self.inputs.push(input);
        self.inputs.len() - 1
    }

    pub fn add_value_input(
        &mut self,
        name: impl Into<String>,
        checks: Option<Vec<String>>,
    ) -> usize {
        self.add_input(Input::new(name, InputKind::Value, checks))
    }

    pub fn add_statement_input(
        &mut self,
        name: impl Into<String>,
        checks: Option<Vec<String>>,
    ) -> usize {
        self.add_input(Input::new(name, InputKind::Statement, checks))
    }

    pub fn add_dummy_input(&mut self, name: impl Into<String>) -> usize {
        self.add_input(Input::new(name, InputKind::Dummy, None))
    }

    pub fn set_inputs_inline(&mut self, inline: bool) {
        self.inputs_inline = inline;
    }

    pub fn is_shadow(&self) -> bool {
        self.shadow
    }

    pub fn is_insertion_marker(&self) -> bool {
        self.insertion_marker
    }

    pub fn is_movable(&self) -> bool {
        self.movable
    }

    /// The connection stored at a slot, if configured
    pub fn connection(&self, slot: crate::connection::PortSlot) -> Option<&Connection> {
        use crate::connection::PortSlot;
        match slot {
            PortSlot::Previous => self.previous.as_ref(),
            PortSlot::Next => self.next.as_ref(),
            PortSlot::Output => self.output.as_ref(),
            PortSlot::Input(i) => self.inputs.get(i).and_then(|input| input.connection.as_ref()),
        }
    }

    pub(crate) fn connection_mut(
        &mut self,
        slot: crate::connection::PortSlot,
    ) -> Option<&mut Connection> {
        use crate::connection::PortSlot;
        match slot {
            PortSlot::Previous => self.previous.as_mut(),
            PortSlot::Next => self.next.as_mut(),
            PortSlot::Output => self.output.as_mut(),
            PortSlot::Input(i) => self
                .inputs
                .get_mut(i)
                .and_then(|input| input.connection.as_mut()),
        }
    }

    /// All configured connection slots on this block, in render order
    pub fn slots(&self) -> Vec<crate::connection::PortSlot> {
        use crate::connection::PortSlot;
        let mut slots = Vec::new();
        if self.previous.is_some() {
            slots.push(PortSlot::Previous);
        }
        if self.output.is_some() {
            slots.push(PortSlot::Output);
        }
        for (i, input) in self.inputs.iter().enumerate() {
            if input.connection.is_some() {
                slots.push(PortSlot::Input(i));
            }
        }
        if self.next.is_some() {
            slots.push(PortSlot::Next);
        }
        slots
    }
}
