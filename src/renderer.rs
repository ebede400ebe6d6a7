use crate::block::{Align, Block, InputKind, Point, Size};
use crate::connection::PortSlot;
use crate::layout::{
    self, Row, RowInput, RowKind, RowPlan, CORNER_RADIUS, MIN_BLOCK_Y, NOTCH_HEIGHT, NOTCH_WIDTH,
    SEP_SPACE_X, START_HAT_HEIGHT, START_HAT_MIN_WIDTH, TAB_HEIGHT, TAB_WIDTH,
};
use crate::workspace::Workspace;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use ulid::Ulid;

/// One segment of an SVG-style path, kept typed until serialization
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathStep {
    MoveTo(f32, f32),
    MoveBy(f32, f32),
    HorizTo(f32),
    VertTo(f32),
    HorizBy(f32),
    VertBy(f32),
    LineBy(f32, f32),
    /// Absolute arc with equal radii, as used for rounded corners
    ArcTo {
        radius: f32,
        sweep: bool,
        x: f32,
        y: f32,
    },
    /// Relative arc with equal radii
    ArcBy {
        radius: f32,
        sweep: bool,
        dx: f32,
        dy: f32,
    },
    CubicBy {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        dx: f32,
        dy: f32,
    },
    SmoothBy {
        x2: f32,
        y2: f32,
        dx: f32,
        dy: f32,
    },
    Close,
}

impl PathStep {
    fn write_svg(&self, out: &mut String) {
        // Infallible for String targets.
        let _ = match *self {
            PathStep::MoveTo(x, y) => write!(out, "M {},{}", x, y),
            PathStep::MoveBy(x, y) => write!(out, "m {},{}", x, y),
            PathStep::HorizTo(x) => write!(out, "H {}", x),
            PathStep::VertTo(y) => write!(out, "V {}", y),
            PathStep::HorizBy(dx) => write!(out, "h {}", dx),
            PathStep::VertBy(dy) => write!(out, "v {}", dy),
            PathStep::LineBy(dx, dy) => write!(out, "l {},{}", dx, dy),
            PathStep::ArcTo {
                radius,
                sweep,
                x,
                y,
            } => write!(
                out,
                "A {},{} 0 0,{} {},{}",
                radius,
                radius,
                u8::from(sweep),
                x,
                y
            ),
            PathStep::ArcBy {
                radius,
                sweep,
                dx,
                dy,
            } => write!(
                out,
                "a {},{} 0 0,{} {},{}",
                radius,
                radius,
                u8::from(sweep),
                dx,
                dy
            ),
            PathStep::CubicBy {
                x1,
                y1,
                x2,
                y2,
                dx,
                dy,
            } => write!(out, "c {},{} {},{} {},{}", x1, y1, x2, y2, dx, dy),
            PathStep::SmoothBy { x2, y2, dx, dy } => {
                write!(out, "s {},{} {},{}", x2, y2, dx, dy)
            }
            PathStep::Close => write!(out, "z"),
        };
    }

    /// The same step shifted by (dx, dy). Only absolute coordinates move;
    /// relative steps are translation-invariant. The leading move of a
    /// path is handled by the caller since a relative first move is
    /// anchored at the origin.
    fn translated(&self, dx: f32, dy: f32) -> PathStep {
        match *self {
            PathStep::MoveTo(x, y) => PathStep::MoveTo(x + dx, y + dy),
            PathStep::HorizTo(x) => PathStep::HorizTo(x + dx),
            PathStep::VertTo(y) => PathStep::VertTo(y + dy),
            PathStep::ArcTo {
                radius,
                sweep,
                x,
                y,
            } => PathStep::ArcTo {
                radius,
                sweep,
                x: x + dx,
                y: y + dy,
            },
            step => step,
        }
    }
}

/// Accumulates typed path steps; serialized to a string exactly once
#[derive(Debug, Clone, Default)]
pub struct PathBuilder {
    steps: Vec<PathStep>,
}

impl PathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: PathStep) -> &mut Self {
        self.steps.push(step);
        self
    }

    pub fn move_to(&mut self, x: f32, y: f32) -> &mut Self {
        self.push(PathStep::MoveTo(x, y))
    }

    pub fn move_by(&mut self, dx: f32, dy: f32) -> &mut Self {
        self.push(PathStep::MoveBy(dx, dy))
    }

    pub fn horiz_to(&mut self, x: f32) -> &mut Self {
        self.push(PathStep::HorizTo(x))
    }

    pub fn vert_to(&mut self, y: f32) -> &mut Self {
        self.push(PathStep::VertTo(y))
    }

    pub fn horiz_by(&mut self, dx: f32) -> &mut Self {
        self.push(PathStep::HorizBy(dx))
    }

    pub fn vert_by(&mut self, dy: f32) -> &mut Self {
        self.push(PathStep::VertBy(dy))
    }

    pub fn line_by(&mut self, dx: f32, dy: f32) -> &mut Self {
        self.push(PathStep::LineBy(dx, dy))
    }

    pub fn close(&mut self) -> &mut Self {
        self.push(PathStep::Close)
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn to_svg(&self) -> String {
        let mut out = String::new();
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            step.write_svg(&mut out);
        }
        out
    }

    /// Serialize the same segment list shifted by (dx, dy). Used for the
    /// highlight, which is the outline inset by half a pixel rather than
    /// a separately drawn path.
    pub fn to_svg_translated(&self, dx: f32, dy: f32) -> String {
        let mut out = String::new();
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            let step = if i == 0 {
                // A relative leading move is anchored at the origin.
                match *step {
                    PathStep::MoveBy(x, y) => PathStep::MoveBy(x + dx, y + dy),
                    step => step.translated(dx, dy),
                }
            } else {
                step.translated(dx, dy)
            };
            step.write_svg(&mut out);
        }
        out
    }
}

/// Block-relative placement of one field, by input and field index
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FieldPosition {
    pub input: usize,
    pub field: usize,
    pub x: f32,
    pub y: f32,
}

/// The complete geometry of one rendered block, replaced every pass.
///
/// Path strings are in the canonical left-to-right frame; a right-to-left
/// rendering substrate mirrors them with a `scale(-1 1)` transform, while
/// connection offsets and field positions carry mirrored x directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathObject {
    /// Perimeter of the block
    pub outline: String,

    /// The outline inset by half a pixel for the bevel effect
    pub highlight: String,

    /// One closed hole per inline value socket
    pub inline_paths: Vec<String>,

    pub size: Size,

    pub field_positions: Vec<FieldPosition>,
}

struct RenderState<'a> {
    block: &'a Block,
    outline: PathBuilder,
    inline: Vec<PathBuilder>,
    offsets: Vec<(PortSlot, Point)>,
    fields: Vec<FieldPosition>,
    width: f32,
    square_top: bool,
    square_bottom: bool,
    start_hat: bool,
}

/// Compute the outline, inline holes, size, field positions, and
/// connection offsets for one block. The block's nested blocks must have
/// been rendered first, since the plan reads their stack sizes.
pub(crate) fn render_block(
    workspace: &Workspace,
    id: Ulid,
) -> Result<(PathObject, Vec<(PortSlot, Point)>)> {
    let block = workspace
        .block(id)
        .ok_or_else(|| anyhow!("Block not found: {}", id))?;
    let mut plan = layout::plan_rows(workspace, block);

    let mut state = RenderState {
        block,
        outline: PathBuilder::new(),
        inline: Vec::new(),
        offsets: Vec::new(),
        fields: Vec::new(),
        width: 0.0,
        square_top: false,
        square_bottom: false,
        start_hat: false,
    };

    let mut hat_height = 0.0;
    if block.output.is_some() {
        state.square_top = true;
        state.square_bottom = true;
    } else {
        if let Some(previous) = &block.previous {
            // Mid-stack blocks butt flush against the block above.
            state.square_top = previous
                .target
                .map_or(false, |target| target.slot == PortSlot::Next);
        } else if workspace.start_hats() {
            state.square_top = true;
            state.start_hat = true;
            hat_height = START_HAT_HEIGHT;
            plan.right_edge = plan.right_edge.max(START_HAT_MIN_WIDTH);
        }
        if block.next.as_ref().map_or(false, |next| next.is_connected()) {
            state.square_bottom = true;
        }
    }

    state.draw_top(&plan);
    let cursor_y = state.draw_right(&plan);
    let mut height = state.draw_bottom(cursor_y);
    state.draw_left(&plan);
    height += hat_height;

    // Mirror pass: path strings stay canonical, positions flip sign.
    if block.rtl {
        for (_, offset) in &mut state.offsets {
            offset.x = -offset.x;
        }
        for field in &mut state.fields {
            field.x = -field.x;
        }
    }

    debug_assert!(
        block.slots().iter().all(|slot| state
            .offsets
            .iter()
            .any(|(placed, _)| placed == slot)),
        "every connection must receive an offset"
    );

    let size = Size::new(state.width, height);
    let path = PathObject {
        outline: state.outline.to_svg(),
        highlight: state
            .outline
            .to_svg_translated(if block.rtl { -0.5 } else { 0.5 }, 0.5),
        inline_paths: state.inline.iter().map(PathBuilder::to_svg).collect(),
        size,
        field_positions: state.fields,
    };
    Ok((path, state.offsets))
}

fn notch_left(path: &mut PathBuilder) {
    path.line_by(6.0, 4.0).line_by(3.0, 0.0).line_by(6.0, -4.0);
}

fn notch_right(path: &mut PathBuilder) {
    path.line_by(-6.0, 4.0)
        .line_by(-3.0, 0.0)
        .line_by(-6.0, -4.0);
}

/// The puzzle tab, drawn downward; net displacement (0, TAB_HEIGHT)
fn tab_down(path: &mut PathBuilder) {
    path.vert_by(5.0)
        .push(PathStep::CubicBy {
            x1: 0.0,
            y1: 10.0,
            x2: -TAB_WIDTH,
            y2: -8.0,
            dx: -TAB_WIDTH,
            dy: 7.5,
        })
        .push(PathStep::SmoothBy {
            x2: TAB_WIDTH,
            y2: -2.5,
            dx: TAB_WIDTH,
            dy: 7.5,
        });
}

/// The puzzle tab drawn upward along the left edge of an expression block
fn tab_up(path: &mut PathBuilder) {
    path.push(PathStep::CubicBy {
        x1: 0.0,
        y1: -10.0,
        x2: -TAB_WIDTH,
        y2: 8.0,
        dx: -TAB_WIDTH,
        dy: -7.5,
    })
    .push(PathStep::SmoothBy {
        x2: TAB_WIDTH,
        y2: 2.5,
        dx: TAB_WIDTH,
        dy: -7.5,
    })
    .vert_by(-5.0);
}

impl<'a> RenderState<'a> {
    fn draw_top(&mut self, plan: &RowPlan) {
        if self.square_top {
            self.outline.move_by(0.0, 0.0);
            if self.start_hat {
                self.outline.push(PathStep::CubicBy {
                    x1: 30.0,
                    y1: -START_HAT_HEIGHT,
                    x2: 70.0,
                    y2: -START_HAT_HEIGHT,
                    dx: 100.0,
                    dy: 0.0,
                });
            }
        } else {
            self.outline.move_by(0.0, CORNER_RADIUS);
            self.outline.push(PathStep::ArcTo {
                radius: CORNER_RADIUS,
                sweep: true,
                x: CORNER_RADIUS,
                y: 0.0,
            });
        }

        if self.block.previous.is_some() {
            self.outline.horiz_to(NOTCH_WIDTH - 15.0);
            notch_left(&mut self.outline);
            self.offsets
                .push((PortSlot::Previous, Point::new(NOTCH_WIDTH, 0.0)));
        }
        self.outline.horiz_to(plan.right_edge);
        self.width = plan.right_edge;
    }

    fn draw_right(&mut self, plan: &RowPlan) -> f32 {
        let mut cursor_y = 0.0;
        for row in &plan.rows {
            match row.kind {
                RowKind::Spacer => self.draw_spacer_row(plan, row, cursor_y),
                RowKind::Inline => self.draw_inline_row(plan, row, cursor_y),
                RowKind::ExternalValue => self.draw_external_value_row(plan, row, cursor_y),
                RowKind::Statement => self.draw_statement_row(plan, row, cursor_y),
            }
            cursor_y += row.height;
        }
        cursor_y
    }

    /// Pure vertical space, or a dummy input's field run
    fn draw_spacer_row(&mut self, plan: &RowPlan, row: &Row, cursor_y: f32) {
        if let Some(input) = row.inputs.first() {
            let mut field_x = SEP_SPACE_X;
            let align = self.block.inputs[input.index].align;
            if align != Align::Left {
                let mut slack = plan.right_edge - input.field_width - 2.0 * SEP_SPACE_X;
                if plan.has_value {
                    slack -= TAB_WIDTH;
                }
                field_x += match align {
                    Align::Right => slack,
                    Align::Centre => slack / 2.0,
                    Align::Left => 0.0,
                };
            }
            self.place_fields(input.index, field_x, cursor_y, row.height);
        }
        self.outline.vert_by(row.height);
    }

    fn draw_inline_row(&mut self, plan: &RowPlan, row: &Row, cursor_y: f32) {
        let mut cursor_x = SEP_SPACE_X;
        for input in &row.inputs {
            cursor_x = self.place_fields(input.index, cursor_x, cursor_y, row.height);
            if input.kind != InputKind::Dummy {
                cursor_x += input.render_width + SEP_SPACE_X;
            }
            if input.kind == InputKind::Value {
                self.draw_inline_socket(input, row, cursor_x, cursor_y);
            }
        }
        cursor_x = cursor_x.max(plan.right_edge);
        self.width = self.width.max(cursor_x);
        self.outline.horiz_to(cursor_x);
        self.outline.vert_by(row.height);
    }

    /// Carve the closed hole for one inline value socket and place its
    /// connection one pixel inside the tab.
    fn draw_inline_socket(&mut self, input: &RowInput, row: &Row, cursor_x: f32, cursor_y: f32) {
        let y_start = (row.height - input.render_height) / 2.0;
        let v_top = ((input.render_height - TAB_HEIGHT) / 2.0).max(0.0);

        let mut hole = PathBuilder::new();
        hole.move_to(cursor_x - SEP_SPACE_X, cursor_y + y_start);
        hole.horiz_by(TAB_WIDTH - 2.0 - input.render_width);
        if v_top > 0.0 {
            hole.vert_by(v_top);
        }
        tab_down(&mut hole);
        hole.vert_by(input.render_height - TAB_HEIGHT - v_top);
        hole.horiz_by(input.render_width + 2.0 - TAB_WIDTH);
        hole.close();
        self.inline.push(hole);

        self.offsets.push((
            PortSlot::Input(input.index),
            Point::new(
                cursor_x + TAB_WIDTH - SEP_SPACE_X - input.render_width - 1.0,
                cursor_y + y_start + 1.0,
            ),
        ));
    }

    fn draw_external_value_row(&mut self, plan: &RowPlan, row: &Row, cursor_y: f32) {
        assert!(
            row.inputs.len() == 1,
            "external value row must hold exactly one input"
        );
        let input = &row.inputs[0];

        let mut field_x = SEP_SPACE_X;
        let align = self.block.inputs[input.index].align;
        if align != Align::Left {
            let slack =
                plan.right_edge - input.field_width - TAB_WIDTH - 2.0 * SEP_SPACE_X;
            field_x += match align {
                Align::Right => slack,
                Align::Centre => slack / 2.0,
                Align::Left => 0.0,
            };
        }
        self.place_fields(input.index, field_x, cursor_y, row.height);

        let v_top = ((row.height - TAB_HEIGHT) / 2.0).max(0.0);
        self.outline.vert_by(v_top);
        tab_down(&mut self.outline);
        self.outline.vert_by(row.height - TAB_HEIGHT - v_top);

        self.offsets.push((
            PortSlot::Input(input.index),
            Point::new(plan.right_edge + 1.0, cursor_y),
        ));
        if let Some(nested) = input.connected_size {
            self.width = self
                .width
                .max(plan.right_edge + nested.width - TAB_WIDTH + 1.0);
        }
    }

    fn draw_statement_row(&mut self, plan: &RowPlan, row: &Row, cursor_y: f32) {
        assert!(
            row.inputs.len() == 1,
            "statement row must hold exactly one input"
        );
        let input = &row.inputs[0];

        let mut field_x = SEP_SPACE_X;
        let align = self.block.inputs[input.index].align;
        if align != Align::Left {
            let slack = plan.statement_edge - input.field_width - 2.0 * SEP_SPACE_X;
            field_x += match align {
                Align::Right => slack,
                Align::Centre => slack / 2.0,
                Align::Left => 0.0,
            };
        }
        self.place_fields(input.index, field_x, cursor_y, row.height);

        let notch_x = plan.statement_edge + NOTCH_WIDTH;
        self.outline.horiz_to(notch_x);
        notch_right(&mut self.outline);
        self.outline
            .horiz_by(-(NOTCH_WIDTH - 15.0 - CORNER_RADIUS));
        self.outline.push(PathStep::ArcBy {
            radius: CORNER_RADIUS,
            sweep: false,
            dx: -CORNER_RADIUS,
            dy: CORNER_RADIUS,
        });
        self.outline
            .vert_by(row.height - 2.0 * CORNER_RADIUS);
        self.outline.push(PathStep::ArcBy {
            radius: CORNER_RADIUS,
            sweep: false,
            dx: CORNER_RADIUS,
            dy: CORNER_RADIUS,
        });
        self.outline.horiz_to(plan.right_edge);

        self.offsets.push((
            PortSlot::Input(input.index),
            Point::new(notch_x + 1.0, cursor_y + 1.0),
        ));
        if let Some(nested) = input.connected_size {
            self.width = self.width.max(plan.statement_edge + nested.width);
        }
    }

    /// Bottom edge; returns the block height (before any start hat)
    fn draw_bottom(&mut self, cursor_y: f32) -> f32 {
        let mut height = cursor_y + 1.0;
        if self.block.next.is_some() {
            self.outline.horiz_to(NOTCH_WIDTH - 0.5);
            notch_right(&mut self.outline);
            self.offsets
                .push((PortSlot::Next, Point::new(NOTCH_WIDTH, cursor_y + 1.0)));
            height += NOTCH_HEIGHT;
        }

        if self.square_bottom {
            self.outline.horiz_to(0.0);
        } else {
            self.outline.horiz_to(CORNER_RADIUS);
            self.outline.push(PathStep::ArcBy {
                radius: CORNER_RADIUS,
                sweep: true,
                dx: -CORNER_RADIUS,
                dy: -CORNER_RADIUS,
            });
        }
        height
    }

    fn draw_left(&mut self, plan: &RowPlan) {
        if self.block.output.is_some() {
            // The tab is vertically centered on the first row.
            let first_row_height = plan
                .rows
                .first()
                .map_or(MIN_BLOCK_Y, |row| row.height);
            let tab_bottom = (first_row_height - TAB_HEIGHT) / 2.0 + TAB_HEIGHT;
            self.outline.vert_to(tab_bottom);
            tab_up(&mut self.outline);
            self.offsets.push((PortSlot::Output, Point::default()));
            self.width += TAB_WIDTH;
        }
        self.outline.close();
    }

    /// Lay out one input's fields starting at `cursor_x`, centering each
    /// field vertically in the row. Returns the cursor after the last
    /// field and its trailing gap.
    fn place_fields(&mut self, index: usize, cursor_x: f32, cursor_y: f32, row_height: f32) -> f32 {
        let mut x = cursor_x;
        for (field_index, field) in self.block.inputs[index].fields.iter().enumerate() {
            let mut y = cursor_y;
            if field.height < row_height {
                y += (row_height - field.height) / 2.0;
            }
            self.fields.push(FieldPosition {
                input: index,
                field: field_index,
                x,
                y,
            });
            x += field.width;
            if !field.is_spacer {
                x += SEP_SPACE_X;
            }
        }
        x
    }
}
