/// Example: Assembling and rendering a simple block program
///
/// This example demonstrates:
/// - Creating a workspace with blocks
/// - Configuring connections and typed checks
/// - Linking blocks into a stack with a nested expression
/// - Rendering the program to path geometry
/// - Probing a drag gesture for a reconnection target
/// - Reviewing the workspace event log

use block_graph_editor::*;
use anyhow::Result;

fn main() -> Result<()> {
    println!("=== Block Graph Editor: Simple Program Example ===\n");

    // Step 1: Create a workspace with hats on top-level stacks
    println!("Step 1: Creating workspace...");
    let mut ws = Workspace::new();
    ws.set_start_hats(true);
    println!("  ✓ Created workspace {}", ws.id());

    // Step 2: Build the blocks of a tiny program
    println!("\nStep 2: Creating blocks...");
    let start = ws.create_block();
    {
        let block = ws.block_mut(start).unwrap();
        block.set_next_statement(None)?;
        let label = block.add_dummy_input("TITLE");
        block.inputs[label].append_field(Field::new(60.0, 18.0));
    }
    println!("  ✓ Created 'start' block");

    let say = ws.create_block();
    {
        let block = ws.block_mut(say).unwrap();
        block.set_previous_statement(None)?;
        block.set_next_statement(None)?;
        let message = block.add_value_input("MESSAGE", Some(vec!["String".to_string()]));
        block.inputs[message].append_field(Field::new(30.0, 18.0));
    }
    println!("  ✓ Created 'say' block with a String socket");

    let text = ws.create_block();
    {
        let block = ws.block_mut(text).unwrap();
        block.set_output(Some(vec!["String".to_string()]))?;
        let literal = block.add_dummy_input("TEXT");
        block.inputs[literal].append_field(Field::new(45.0, 18.0));
    }
    println!("  ✓ Created a text expression block");

    // Step 3: Link everything together
    println!("\nStep 3: Connecting blocks...");
    ws.connect(PortId::next(start), PortId::previous(say))?;
    ws.connect(PortId::input(say, 0), PortId::output(text))?;
    println!("  ✓ start → say, with the text plugged into MESSAGE");

    // An incompatible plug is refused with a reason, not an error state.
    let number = ws.create_block();
    ws.block_mut(number)
        .unwrap()
        .set_output(Some(vec!["Number".to_string()]))?;
    match ws.connect(PortId::input(say, 0), PortId::output(number)) {
        Ok(_) => println!("  ✗ unexpected connection"),
        Err(refusal) => println!("  ✓ refused Number into String socket: {}", refusal),
    }

    // Step 4: Render the program
    println!("\nStep 4: Rendering...");
    ws.render(start)?;
    for id in ws.descendants(start) {
        let block = ws.block(id).unwrap();
        println!(
            "  block {}: {}x{} px",
            block.id, block.size.width, block.size.height
        );
        if let Some(path) = &block.path {
            println!("    outline: {}", path.outline);
        }
    }
    let stack = ws.stack_size(start);
    println!("  ✓ Stack bounds: {}x{} px", stack.width, stack.height);

    // Step 5: Probe a drag of the number block near the say socket
    println!("\nStep 5: Drag search...");
    ws.set_position(number, Point::new(400.0, 0.0))?;
    ws.render(number)?;
    let socket = ws
        .connection(PortId::input(say, 0))
        .unwrap()
        .offset
        .unwrap();
    let delta = Point::new(socket.x - 400.0, socket.y);
    match find_reconnection_target(&ws, number, delta, 25.0) {
        Some(candidate) => println!(
            "  candidate at radius {:.1}, would displace {:?}",
            candidate.radius, candidate.displaced
        ),
        None => println!("  ✓ no legal target: the socket only takes Strings"),
    }

    // Step 6: Review the event log
    println!("\nStep 6: Event log...");
    for event in ws.events() {
        println!("  {} {:?}", event.timestamp.format("%H:%M:%S%.3f"), event.event);
    }

    println!("\n=== Done ===");
    Ok(())
}
