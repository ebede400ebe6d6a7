use crate::block::{Block, InputKind, Size};
use crate::workspace::Workspace;

// Fixed geometry constants shared by the row planner and path renderer.

/// Horizontal space between elements
pub const SEP_SPACE_X: f32 = 10.0;
/// Vertical space around statement stacks
pub const SEP_SPACE_Y: f32 = 10.0;
/// Vertical padding around inline sockets
pub const INLINE_PADDING_Y: f32 = 5.0;
/// Minimum height of a row
pub const MIN_BLOCK_Y: f32 = 25.0;
/// Height of the horizontal puzzle tab
pub const TAB_HEIGHT: f32 = 20.0;
/// Width of the horizontal puzzle tab
pub const TAB_WIDTH: f32 = 8.0;
/// Width of the previous/next notch, including its left margin
pub const NOTCH_WIDTH: f32 = 30.0;
/// Depth of the previous/next notch
pub const NOTCH_HEIGHT: f32 = 4.0;
/// Rounded corner radius
pub const CORNER_RADIUS: f32 = 8.0;
/// Height of the start hat on event-style blocks
pub const START_HAT_HEIGHT: f32 = 15.0;
/// Blocks with a start hat are widened to fit the hat's curve
pub const START_HAT_MIN_WIDTH: f32 = 100.0;

/// Rendering mode of one layout band within a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// Fields and value sockets packed side by side
    Inline,
    /// A single value input whose tab sits on the right edge
    ExternalValue,
    /// A single statement input drawn as an inward C-shape
    Statement,
    /// Vertical space, optionally holding dummy-input fields
    Spacer,
}

/// Per-input measurements inside a row
#[derive(Debug, Clone)]
pub struct RowInput {
    /// Index into the block's input list
    pub index: usize,
    pub kind: InputKind,
    /// Total width of the input's fields, including separation gaps
    pub field_width: f32,
    /// Width reserved for the input's socket (inline value inputs only)
    pub render_width: f32,
    /// Height demanded by the socket or its connected stack
    pub render_height: f32,
    /// Rendered size of the connected nested stack, if any
    pub connected_size: Option<Size>,
}

/// A transient layout band; recomputed on every render pass
#[derive(Debug, Clone)]
pub struct Row {
    pub kind: RowKind,
    pub height: f32,
    /// End of the row's content cursor (inline rows only)
    pub width: f32,
    pub inputs: Vec<RowInput>,
}

impl Row {
    fn new(kind: RowKind) -> Self {
        Self {
            kind,
            height: 0.0,
            width: 0.0,
            inputs: Vec::new(),
        }
    }

    fn spacer(height: f32) -> Self {
        Self {
            kind: RowKind::Spacer,
            height,
            width: 0.0,
            inputs: Vec::new(),
        }
    }
}

/// The row planner's output: ordered rows plus the block-level edges
#[derive(Debug, Clone)]
pub struct RowPlan {
    pub rows: Vec<Row>,
    /// Preferred right edge; inline rows may extend beyond it
    pub right_edge: f32,
    /// Width of the field column beside nested statement stacks
    pub statement_edge: f32,
    pub has_value: bool,
    pub has_statement: bool,
    pub has_dummy: bool,
}

impl RowPlan {
    /// Sum of row heights; the outline's right edge descends this far
    pub fn body_height(&self) -> f32 {
        self.rows.iter().map(|row| row.height).sum()
    }
}

/// Total width of an input's fields, with a separation gap after every
/// non-spacer field.
fn measure_fields(block: &Block, index: usize) -> (f32, f32) {
    let mut width = 0.0;
    let mut tallest = 0.0f32;
    for field in &block.inputs[index].fields {
        width += field.width;
        if !field.is_spacer {
            width += SEP_SPACE_X;
        }
        tallest = tallest.max(field.height);
    }
    (width, tallest)
}

/// Group a block's inputs and fields into ordered rows and compute the
/// block-level edges. Malformed or empty input never fails: a block with
/// no inputs plans one minimum-height spacer row.
pub fn plan_rows(workspace: &Workspace, block: &Block) -> RowPlan {
    let mut rows: Vec<Row> = Vec::new();
    let mut right_edge = SEP_SPACE_X * 2.0;
    if block.previous.is_some() || block.next.is_some() {
        right_edge = right_edge.max(NOTCH_WIDTH + SEP_SPACE_X);
    }

    let mut field_value_width = 0.0f32; // widest field run on a value/dummy row
    let mut field_statement_width = 0.0f32; // widest field run on a statement row
    let mut has_value = false;
    let mut has_statement = false;
    let mut has_dummy = false;

    let inline = block.inputs_inline;
    let mut last_kind: Option<InputKind> = None;

    for (index, input) in block.inputs.iter().enumerate() {
        let open_row = !inline
            || last_kind.is_none()
            || last_kind == Some(InputKind::Statement)
            || input.kind == InputKind::Statement;
        if open_row {
            let kind = if inline && input.kind != InputKind::Statement {
                RowKind::Inline
            } else {
                match input.kind {
                    InputKind::Value => RowKind::ExternalValue,
                    InputKind::Statement => RowKind::Statement,
                    InputKind::Dummy => RowKind::Spacer,
                }
            };
            rows.push(Row::new(kind));
        }
        last_kind = Some(input.kind);
        let row = rows.last_mut().expect("row list cannot be empty here");

        let mut render_height = MIN_BLOCK_Y;
        let mut render_width = if row.kind == RowKind::Inline && input.kind == InputKind::Value {
            TAB_WIDTH + SEP_SPACE_X * 1.25
        } else {
            0.0
        };

        let connected_size = input
            .connection
            .as_ref()
            .and_then(|connection| connection.target)
            .map(|target| workspace.stack_size(target.block));
        if let Some(nested) = connected_size {
            render_height = render_height.max(nested.height);
            render_width = render_width.max(nested.width);
        }

        let (field_width, field_height) = measure_fields(block, index);
        row.height = row.height.max(render_height).max(field_height);
        // Inline sockets get vertical padding so the hole clears the edges.
        if row.kind == RowKind::Inline && input.kind == InputKind::Value {
            row.height = row.height.max(render_height + 2.0 * INLINE_PADDING_Y);
        }
        row.inputs.push(RowInput {
            index,
            kind: input.kind,
            field_width,
            render_width,
            render_height,
            connected_size,
        });

        match row.kind {
            RowKind::Statement => {
                has_statement = true;
                field_statement_width = field_statement_width.max(field_width);
            }
            RowKind::ExternalValue => {
                has_value = true;
                field_value_width = field_value_width.max(field_width);
            }
            RowKind::Spacer => {
                has_dummy = true;
                field_value_width = field_value_width.max(field_width);
            }
            RowKind::Inline => {}
        }
    }

    // An empty block still renders as one minimum-height row.
    if rows.is_empty() {
        rows.push(Row::spacer(MIN_BLOCK_Y));
    }

    // Compute inline row cursor widths.
    for row in &mut rows {
        if row.kind != RowKind::Inline {
            continue;
        }
        let mut cursor = SEP_SPACE_X;
        for input in &row.inputs {
            cursor += input.field_width;
            if input.kind != InputKind::Dummy {
                cursor += input.render_width + SEP_SPACE_X;
            }
        }
        row.width = cursor;
    }

    // Statement stacks get breathing room above (when first) and below
    // (when last, or when another statement row follows).
    let mut spaced: Vec<Row> = Vec::with_capacity(rows.len() + 2);
    let count = rows.len();
    for (i, row) in rows.into_iter().enumerate() {
        let is_statement = row.kind == RowKind::Statement;
        if is_statement && i == 0 {
            spaced.push(Row::spacer(SEP_SPACE_Y));
        }
        spaced.push(row);
        if is_statement {
            let last = i + 1 == count;
            if last {
                spaced.push(Row::spacer(SEP_SPACE_Y));
            }
        }
    }
    // A statement row directly followed by another statement row also
    // gets a divider between them.
    let mut with_dividers: Vec<Row> = Vec::with_capacity(spaced.len());
    for row in spaced {
        if row.kind == RowKind::Statement
            && with_dividers
                .last()
                .map_or(false, |prev: &Row| prev.kind == RowKind::Statement)
        {
            with_dividers.push(Row::spacer(SEP_SPACE_Y));
        }
        with_dividers.push(row);
    }

    let statement_edge = 2.0 * SEP_SPACE_X + field_statement_width;
    if has_statement {
        right_edge = right_edge.max(statement_edge + NOTCH_WIDTH);
    }
    if has_value {
        right_edge = right_edge.max(field_value_width + SEP_SPACE_X * 2.0 + TAB_WIDTH);
    } else if has_dummy {
        right_edge = right_edge.max(field_value_width + SEP_SPACE_X * 2.0);
    }

    RowPlan {
        rows: with_dividers,
        right_edge,
        statement_edge,
        has_value,
        has_statement,
        has_dummy,
    }
}
