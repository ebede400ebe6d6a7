// End-to-end scenarios across planning, rendering, linking, and drag search

#[path = "fixtures/sample_blocks.rs"]
mod sample_blocks;

use assert_matches::assert_matches;
use block_graph_editor::{
    find_reconnection_target, EventType, Point, PortId, Size, Verdict, Workspace,
};
use pretty_assertions::assert_eq;
use sample_blocks::*;
use std::collections::HashSet;

#[test]
fn test_stack_with_plugged_expression_renders_bottom_up() {
    let mut ws = Workspace::new();
    let top = statement_block(&mut ws);
    let consumer = value_consumer_block(&mut ws, &[]);
    let expression = expression_block(&mut ws, &[]);
    ws.connect(PortId::next(top), PortId::previous(consumer))
        .unwrap();
    ws.connect(PortId::input(consumer, 0), PortId::output(expression))
        .unwrap();

    ws.render(top).unwrap();

    // The bare expression block: two separators wide plus its tab.
    assert_eq!(ws.block(expression).unwrap().size, Size::new(28.0, 26.0));

    // The consumer's right edge covers its 40px field, and its width then
    // grows to cover the plugged-in expression.
    assert_eq!(ws.block(consumer).unwrap().size, Size::new(99.0, 31.0));
    assert_eq!(
        ws.connection(PortId::input(consumer, 0)).unwrap().offset,
        Some(Point::new(79.0, 0.0))
    );

    // Next offsets land one pixel below each block's body.
    assert_eq!(
        ws.connection(PortId::next(top)).unwrap().offset,
        Some(Point::new(30.0, 26.0))
    );
    assert_eq!(
        ws.connection(PortId::next(consumer)).unwrap().offset,
        Some(Point::new(30.0, 27.0))
    );

    // Stack size overlaps the joint by the notch depth.
    assert_eq!(ws.stack_size(top), Size::new(99.0, 57.0));
}

#[test]
fn test_if_else_block_renders_consistently() {
    let mut ws = Workspace::new();
    let branch = if_else_block(&mut ws);
    let body = stack(&mut ws, 2);
    ws.connect(PortId::input(branch, 1), PortId::previous(body[0]))
        .unwrap();

    ws.render(branch).unwrap();
    let first = ws.block(branch).unwrap().path.clone().unwrap();
    ws.render(branch).unwrap();
    let second = ws.block(branch).unwrap().path.clone().unwrap();

    // Byte-identical output on re-render, and an offset on every port.
    assert_eq!(first.outline, second.outline);
    assert_eq!(first.highlight, second.highlight);
    assert_eq!(first.inline_paths, second.inline_paths);
    for id in ws.descendants(branch) {
        let block = ws.block(id).unwrap();
        for slot in block.slots() {
            assert!(
                ws.connection(PortId::new(id, slot)).unwrap().offset.is_some(),
                "port without offset after render"
            );
        }
    }
}

#[test]
fn test_drag_splice_into_occupied_socket() {
    let mut ws = Workspace::new();
    let consumer = value_consumer_block(&mut ws, &[]);
    let occupant = expression_block(&mut ws, &[]);
    ws.connect(PortId::input(consumer, 0), PortId::output(occupant))
        .unwrap();
    let dragged = expression_block(&mut ws, &[]);
    ws.set_position(dragged, Point::new(300.0, 0.0)).unwrap();
    ws.render_all().unwrap();

    // Hover the dragged output over the occupied socket at (79, 0).
    let candidate =
        find_reconnection_target(&ws, dragged, Point::new(-221.0, 0.0), 10.0).unwrap();
    assert_eq!(candidate.local, PortId::output(dragged));
    assert_eq!(candidate.neighbour, PortId::input(consumer, 0));
    assert_eq!(candidate.displaced, Some(occupant));

    // The search moved nothing; the drop performs the splice.
    assert_eq!(
        ws.connection(PortId::input(consumer, 0)).unwrap().target,
        Some(PortId::output(occupant))
    );
    let dangling = ws.connect(candidate.local, candidate.neighbour).unwrap();

    assert_eq!(dangling, Some(occupant));
    assert_eq!(
        ws.connection(PortId::input(consumer, 0)).unwrap().target,
        Some(PortId::output(dragged))
    );
    assert!(!ws.connection(PortId::output(occupant)).unwrap().is_connected());
    assert!(ws.events().iter().any(|event| matches!(
        event.event,
        EventType::BlockDisplaced { block, .. } if block == occupant
    )));
}

#[test]
fn test_terminal_statement_cannot_bump_running_stack() {
    let mut ws = Workspace::new();
    let blocks = stack(&mut ws, 2);
    let terminal = terminal_block(&mut ws);

    let verdict = ws.checker().can_connect_with_reason(
        ws.port_ref(PortId::previous(terminal)),
        ws.port_ref(PortId::next(blocks[0])),
        true,
        &HashSet::new(),
    );
    assert_matches!(verdict, Verdict::DragChecksFailed);
    assert_eq!(verdict.message(), "Drag checks failed.");

    // The same pair is fine as a plain (non-drag) edit.
    let verdict = ws.checker().can_connect_with_reason(
        ws.port_ref(PortId::previous(terminal)),
        ws.port_ref(PortId::next(blocks[0])),
        false,
        &HashSet::new(),
    );
    assert_matches!(verdict, Verdict::CanConnect);
}

#[test]
fn test_stack_cannot_be_closed_into_a_loop() {
    let mut ws = Workspace::new();
    let blocks = stack(&mut ws, 3);

    let err = ws
        .connect(PortId::next(blocks[2]), PortId::previous(blocks[0]))
        .unwrap_err();
    assert!(err.to_string().contains("contain itself"));

    // The stack still reads as a straight line of three.
    assert_eq!(ws.descendants(blocks[0]), blocks);
    assert_eq!(
        ws.last_connection_in_stack(blocks[0]),
        Some(PortId::next(blocks[2]))
    );
}

#[test]
fn test_rtl_stack_mirrors_connection_offsets() {
    let mut ws = Workspace::new_rtl();
    let blocks = stack(&mut ws, 2);
    ws.render(blocks[0]).unwrap();

    assert_eq!(
        ws.connection(PortId::previous(blocks[1])).unwrap().offset,
        Some(Point::new(-30.0, 0.0))
    );
    assert_eq!(
        ws.connection(PortId::next(blocks[0])).unwrap().offset,
        Some(Point::new(-30.0, 26.0))
    );
    // Path strings stay canonical; the substrate mirrors them.
    let outline = &ws.block(blocks[0]).unwrap().path.as_ref().unwrap().outline;
    assert!(outline.contains("H 40"));
}

#[test]
fn test_rendered_block_serializes() {
    let mut ws = Workspace::new();
    let id = value_consumer_block(&mut ws, &["Number"]);
    ws.render(id).unwrap();

    let block = ws.block(id).unwrap();
    let json = serde_json::to_string(block).unwrap();
    let restored: block_graph_editor::Block = serde_json::from_str(&json).unwrap();
    assert_eq!(&restored, block);
}

mod properties {
    use super::sample_blocks::*;
    use block_graph_editor::{Field, InputKind, PortId, Workspace};
    use proptest::prelude::*;
    use ulid::Ulid;

    #[derive(Debug, Clone)]
    struct Shape {
        stackable: bool,
        inline: bool,
        inputs: Vec<(u8, Vec<f32>)>,
    }

    fn shapes() -> impl Strategy<Value = Shape> {
        (
            any::<bool>(),
            any::<bool>(),
            proptest::collection::vec(
                (0u8..3, proptest::collection::vec(5.0f32..60.0, 0..3)),
                0..4,
            ),
        )
            .prop_map(|(stackable, inline, inputs)| Shape {
                stackable,
                inline,
                inputs,
            })
    }

    fn build(ws: &mut Workspace, shape: &Shape) -> Ulid {
        let id = ws.create_block();
        let block = ws.block_mut(id).unwrap();
        if shape.stackable {
            block.set_previous_statement(None).unwrap();
            block.set_next_statement(None).unwrap();
        } else {
            block.set_output(None).unwrap();
        }
        block.set_inputs_inline(shape.inline);
        for (kind, widths) in &shape.inputs {
            let index = match kind {
                0 => block.add_value_input("V", None),
                1 => block.add_statement_input("S", None),
                _ => block.add_dummy_input("D"),
            };
            for &width in widths {
                block.inputs[index].append_field(Field::new(width, 18.0));
            }
        }
        id
    }

    proptest! {
        /// Rendering is a pure function of the graph: a second pass over
        /// an unchanged block reproduces every byte and offset.
        #[test]
        fn prop_render_is_idempotent(shape in shapes()) {
            let mut ws = Workspace::new();
            let id = build(&mut ws, &shape);

            ws.render(id).unwrap();
            let first_path = ws.block(id).unwrap().path.clone().unwrap();
            let first_size = ws.block(id).unwrap().size;
            ws.render(id).unwrap();

            prop_assert_eq!(&first_path, ws.block(id).unwrap().path.as_ref().unwrap());
            prop_assert_eq!(first_size, ws.block(id).unwrap().size);
        }

        /// Every configured port gets exactly one offset per pass.
        #[test]
        fn prop_offsets_are_complete(shape in shapes()) {
            let mut ws = Workspace::new();
            let id = build(&mut ws, &shape);
            ws.render(id).unwrap();

            let block = ws.block(id).unwrap();
            for slot in block.slots() {
                prop_assert!(ws
                    .connection(PortId::new(id, slot))
                    .unwrap()
                    .offset
                    .is_some());
            }
        }

        /// Link symmetry and acyclicity survive arbitrary connect
        /// sequences, including ones the workspace refuses or that
        /// displace occupants.
        #[test]
        fn prop_links_stay_symmetric(edges in proptest::collection::vec((0usize..6, 0usize..6), 0..20)) {
            let mut ws = Workspace::new();
            let blocks: Vec<Ulid> = (0..6).map(|_| statement_block(&mut ws)).collect();
            for (a, b) in edges {
                let _ = ws.connect(PortId::next(blocks[a]), PortId::previous(blocks[b]));
            }

            for &id in &blocks {
                let block = ws.block(id).unwrap();
                for slot in block.slots() {
                    let port = PortId::new(id, slot);
                    if let Some(target) = ws.connection(port).unwrap().target {
                        prop_assert_eq!(ws.connection(target).unwrap().target, Some(port));
                    }
                }
                // No block's subtree loops back onto itself.
                let subtree = ws.descendants(id);
                prop_assert!(subtree.len() <= blocks.len());
                prop_assert_eq!(subtree.first(), Some(&id));
            }
        }
    }
}
