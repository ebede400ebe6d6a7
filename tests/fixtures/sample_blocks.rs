// Helper functions to build test workspaces with common block shapes

use block_graph_editor::{Field, PortId, Workspace};
use ulid::Ulid;

/// Turn a slice of check names into a connection check list
pub fn checks(names: &[&str]) -> Option<Vec<String>> {
    if names.is_empty() {
        None
    } else {
        Some(names.iter().map(|name| name.to_string()).collect())
    }
}

/// A plain statement block with previous and next connections
pub fn statement_block(ws: &mut Workspace) -> Ulid {
    let id = ws.create_block();
    let block = ws.block_mut(id).unwrap();
    block.set_previous_statement(None).unwrap();
    block.set_next_statement(None).unwrap();
    id
}

/// A terminal statement block: previous connection only
pub fn terminal_block(ws: &mut Workspace) -> Ulid {
    let id = ws.create_block();
    ws.block_mut(id)
        .unwrap()
        .set_previous_statement(None)
        .unwrap();
    id
}

/// An expression block with the given output checks
pub fn expression_block(ws: &mut Workspace, names: &[&str]) -> Ulid {
    let id = ws.create_block();
    ws.block_mut(id).unwrap().set_output(checks(names)).unwrap();
    id
}

/// A statement block with one labelled external value input
pub fn value_consumer_block(ws: &mut Workspace, names: &[&str]) -> Ulid {
    let id = ws.create_block();
    let block = ws.block_mut(id).unwrap();
    block.set_previous_statement(None).unwrap();
    block.set_next_statement(None).unwrap();
    let input = block.add_value_input("VALUE", checks(names));
    block.inputs[input].append_field(Field::new(40.0, 18.0));
    id
}

/// An if/else shape: a condition value input and two statement inputs
pub fn if_else_block(ws: &mut Workspace) -> Ulid {
    let id = ws.create_block();
    let block = ws.block_mut(id).unwrap();
    block.set_previous_statement(None).unwrap();
    block.set_next_statement(None).unwrap();
    let condition = block.add_value_input("IF", checks(&["Boolean"]));
    block.inputs[condition].append_field(Field::new(20.0, 18.0));
    let then_branch = block.add_statement_input("DO", None);
    block.inputs[then_branch].append_field(Field::new(25.0, 18.0));
    let else_branch = block.add_statement_input("ELSE", None);
    block.inputs[else_branch].append_field(Field::new(30.0, 18.0));
    id
}

/// A vertical stack of `count` statement blocks, top to bottom
pub fn stack(ws: &mut Workspace, count: usize) -> Vec<Ulid> {
    let blocks: Vec<Ulid> = (0..count).map(|_| statement_block(ws)).collect();
    for pair in blocks.windows(2) {
        ws.connect(PortId::next(pair[0]), PortId::previous(pair[1]))
            .unwrap();
    }
    blocks
}
