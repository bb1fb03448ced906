//! Console chart client
//!
//! Joins a room and stands in for a diagram engine on the terminal: typed
//! commands play the part of user gestures, and remote edits are printed
//! as they are applied.
//!
//! Usage: `cargo run --example chart_client [room-name]`. Without a name a
//! private room is created first.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, BufReader};

use chartroom::client::{
    create_private_room, ConnectionManager, DiagramEngine, DiagramTranslator, EngineEvent,
    EnginePort,
};
use chartroom::config::ClientConfig;
use chartroom::core::{Position, ShapeAddParam, ShapeProps, ShapeUpdate, Snapshot};

/// Prints every engine call and hands out sequential handles
#[derive(Default)]
struct ConsoleEngine {
    next: u64,
    shapes: HashMap<u64, String>,
}

impl DiagramEngine for ConsoleEngine {
    type Handle = u64;

    fn shape_add(&mut self, param: &ShapeAddParam) -> u64 {
        self.next += 1;
        let text = param.props.text_content().unwrap_or_default().to_string();
        println!(
            "  [{}] {} at ({}, {}) {:?}",
            self.next, param.template_key, param.position.x, param.position.y, text
        );
        self.shapes.insert(self.next, param.template_key.clone());
        self.next
    }

    fn shape_update(&mut self, shape: &u64, update: &ShapeUpdate) {
        if let Some(position) = update.position {
            println!("  [{}] moved to ({}, {})", shape, position.x, position.y);
        }
        if let Some(text) = update.props.as_ref().and_then(ShapeProps::text_content) {
            println!("  [{}] text {:?}", shape, text);
        }
    }

    fn shape_connect(&mut self, start: &EnginePort<u64>, end: &EnginePort<u64>) {
        println!("  [{}].{} -> [{}].{}", start.shape, start.key, end.shape, end.key);
    }

    fn shape_del(&mut self, shape: &u64) {
        if let Some(template) = self.shapes.remove(shape) {
            println!("  [{}] {} removed", shape, template);
        }
    }
}

type Translator = DiagramTranslator<ConsoleEngine>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    dotenvy::dotenv().ok();

    let config = ClientConfig::from_env()?;
    let room = match std::env::args().nth(1) {
        Some(name) => name,
        None => create_private_room(&config).await?.to_string(),
    };

    let translator = Arc::new(Mutex::new(Translator::new(ConsoleEngine::default())));
    let outgoing = translator.lock().map_err(|e| e.to_string())?.subscribe();

    let manager = ConnectionManager::new(config, translator.clone());
    println!("Room: {}", manager.display_address(&room));
    println!("Commands: add <template> <x> <y> [text] | move <n> <x> <y> | text <n> <text>");
    println!("          connect <n> <port> <m> <port> | del <n> | export | import <fragment> | quit");

    let room_name = room.clone();
    let session = tokio::spawn(async move {
        if let Err(e) = manager.start(&room_name, outgoing).await {
            eprintln!("Connection failed: {}", e);
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.first() == Some(&"quit") {
            break;
        }
        let mut translator = translator.lock().map_err(|e| e.to_string())?;
        if let Err(e) = run_command(&mut translator, &words) {
            println!("  {}", e);
        }
    }

    session.abort();
    Ok(())
}

fn run_command(translator: &mut Translator, words: &[&str]) -> Result<(), String> {
    let number = |i: usize| -> Result<f64, String> {
        words
            .get(i)
            .and_then(|w| w.parse().ok())
            .ok_or_else(|| format!("expected a number at position {}", i))
    };
    let handle = |i: usize| -> Result<u64, String> {
        words
            .get(i)
            .and_then(|w| w.parse().ok())
            .ok_or_else(|| format!("expected a shape number at position {}", i))
    };
    let word = |i: usize| {
        words
            .get(i)
            .copied()
            .ok_or_else(|| format!("missing argument {}", i))
    };

    match words.first().copied() {
        Some("add") => {
            let param = ShapeAddParam {
                id: None,
                template_key: word(1)?.to_string(),
                position: Position::new(number(2)?, number(3)?),
                props: ShapeProps::with_text(words.get(4..).unwrap_or_default().join(" ")),
            };
            if let Some(target) = translator.shape_add(param, true) {
                translator.handle_event(EngineEvent::Add { target });
            }
        }
        Some("move") => translator.handle_event(EngineEvent::Move {
            target: handle(1)?,
            position: Position::new(number(2)?, number(3)?),
        }),
        Some("text") => translator.handle_event(EngineEvent::TextUpdate {
            target: handle(1)?,
            props: ShapeProps::with_text(words.get(2..).unwrap_or_default().join(" ")),
        }),
        Some("connect") => {
            let start = EnginePort::new(handle(1)?, word(2)?);
            let end = EnginePort::new(handle(3)?, word(4)?);
            translator.engine_mut().shape_connect(&start, &end);
            translator.handle_event(EngineEvent::Connect { start, end });
        }
        Some("del") => translator.handle_event(EngineEvent::Delete { target: handle(1)? }),
        Some("export") => {
            let fragment = translator
                .export_snapshot()
                .to_fragment()
                .map_err(|e| e.to_string())?;
            println!("  #{}", fragment);
        }
        Some("import") => {
            let snapshot = Snapshot::from_fragment(word(1)?).map_err(|e| e.to_string())?;
            let handles = translator
                .import_snapshot(&snapshot)
                .map_err(|e| e.to_string())?;
            println!("  imported {} shapes", handles.len());
        }
        Some(other) => return Err(format!("unknown command {}", other)),
        None => {}
    }
    Ok(())
}
