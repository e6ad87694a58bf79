use gruescope::error::IntrospectError;
use gruescope::header::Header;
use gruescope::memory::{MemoryAccessor, MemoryView};
use gruescope::registry::AdapterRegistry;
use gruescope::snapshot::ObjectSnapshot;
use log::{debug, info};
use std::env;
use std::fs::File;
use std::io::prelude::*;
use std::path::Path;

fn usage(program: &str) {
    println!("gruescope - inspect the world state of a Z-machine story file");
    println!();
    println!("Usage: {program} <story_file> [--adapters <file.toml>] [--objects]");
    println!("Examples:");
    println!("  {program} games/planetfall.z3");
    println!("  {program} games/lostpig.z8 --adapters adapters.toml --objects");
    println!();
    println!("The game is identified by its header fingerprint, falling back to");
    println!("the file name. --objects dumps every tracked object and its links.");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage(&args[0]);
        return Ok(());
    }

    let story_path = Path::new(&args[1]);
    let mut adapters_path = None;
    let mut dump_objects = false;
    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--adapters" if i + 1 < args.len() => {
                adapters_path = Some(args[i + 1].clone());
                i += 1;
            }
            "--objects" => dump_objects = true,
            other => {
                eprintln!("Error: unrecognised argument '{other}'");
                usage(&args[0]);
                std::process::exit(2);
            }
        }
        i += 1;
    }

    debug!("Loading story: {}", story_path.display());
    let mut file = match File::open(story_path) {
        Ok(file) => file,
        Err(e) => {
            match e.kind() {
                std::io::ErrorKind::NotFound => {
                    eprintln!("Error: Story file not found: {}", story_path.display());
                }
                std::io::ErrorKind::PermissionDenied => {
                    eprintln!(
                        "Error: Permission denied accessing story file: {}",
                        story_path.display()
                    );
                }
                _ => {
                    eprintln!("Error: Cannot open story file '{}': {}", story_path.display(), e);
                }
            }
            std::process::exit(1);
        }
    };
    let mut story = Vec::new();
    file.read_to_end(&mut story)?;

    let mut registry = AdapterRegistry::with_builtins();
    if let Some(path) = adapters_path {
        let n = registry.load_config(Path::new(&path))?;
        info!("{} game(s) declared in {}", n, path);
    }

    let header = Header::parse(&story)?;
    println!("{header}");

    let game = match registry.identify(Some(story_path), &story) {
        Ok(game) => game,
        Err(IntrospectError::UnsupportedGame { game }) => {
            eprintln!("No adapter for '{game}' (fingerprint {}).", header.fingerprint());
            eprintln!("Declare one with --adapters; known games:");
            for id in registry.ids() {
                eprintln!("  {id}");
            }
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };
    let adapter = registry.lookup(&game)?;
    println!("Adapter: {adapter}");

    // the story file holds the initial state of dynamic memory
    let view = MemoryView::for_game(&story, "", game.as_str())?;
    let snapshot = ObjectSnapshot::capture(&view, &adapter)?;
    let player = adapter.self_object_num();

    println!();
    println!("Score:     {} / {}", adapter.get_score(&view)?, adapter.max_score());
    println!("Moves:     {}", adapter.get_moves(&view)?);
    println!("Location:  {}", snapshot.parent_of(player)?);
    println!("Inventory: {:?}", snapshot.children(player)?);

    if dump_objects {
        println!();
        println!(" obj parent sibling child  attributes");
        for obj in snapshot.iter() {
            println!(
                "{:4} {:6} {:7} {:5}  {:?}",
                obj.num,
                obj.parent,
                obj.sibling,
                obj.child,
                obj.attribute_list()
            );
        }
        println!();
        println!(
            "{} objects, {} attributes each",
            snapshot.len(),
            view.attribute_count()
        );
    }

    Ok(())
}
