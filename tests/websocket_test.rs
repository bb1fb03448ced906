// End-to-end: two clients editing the same diagram through a live server

mod common;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message};

use chartroom::client::{
    create_private_room, ConnectionManager, DiagramTranslator, EngineEvent, EnginePort,
};
use chartroom::config::ClientConfig;
use chartroom::core::snapshot::{SnapshotConnector, SnapshotPort, SnapshotShape};
use chartroom::core::{Position, RoomId, RoomRegistry, ShapeUpdate, Snapshot, WireMessage};

use common::{add_param, spawn_server, FakeEngine};

type SharedTranslator = Arc<Mutex<DiagramTranslator<FakeEngine>>>;

async fn eventually(what: &str, check: impl Fn() -> bool) {
    for _ in 0..300 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {}", what);
}

async fn wait_for_members(registry: &RoomRegistry, id: RoomId, count: usize) {
    let room = registry.get_or_create(id).unwrap();
    for _ in 0..300 {
        if room.members().await.unwrap().len() == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("room never reached {} members", count);
}

// Start a client in `room` and wait until its transport is live
async fn join(config: &ClientConfig, room: &str) -> SharedTranslator {
    let translator = Arc::new(Mutex::new(DiagramTranslator::new(FakeEngine::default())));
    let outgoing = translator.lock().unwrap().subscribe();
    let manager = ConnectionManager::new(config.clone(), translator.clone());
    let transport = manager.transport();
    let room = room.to_string();
    tokio::spawn(async move { manager.start(&room, outgoing).await });
    eventually("transport to go live", || transport.is_live()).await;
    translator
}

#[tokio::test]
async fn test_private_room_is_created_over_http() {
    let (addr, _registry) = spawn_server();
    let config = ClientConfig::new(&format!("http://{}", addr)).unwrap();

    let first = create_private_room(&config).await.unwrap();
    let second = create_private_room(&config).await.unwrap();

    assert_ne!(first, second);
    assert_eq!(first.to_string().len(), 64);
}

#[tokio::test]
async fn test_two_clients_share_a_diagram() {
    let (addr, registry) = spawn_server();
    let config = ClientConfig::new(&format!("http://{}", addr)).unwrap();
    let room = create_private_room(&config).await.unwrap();

    let alice = join(&config, &room.to_string()).await;
    let bob = join(&config, &room.to_string()).await;
    wait_for_members(&registry, room, 2).await;

    // Alice draws a shape; Bob gets it, Alice's own echo is ignored
    let alice_handle = alice
        .lock()
        .unwrap()
        .shape_add(add_param("rect", 10.0, 10.0, "hello"), true)
        .unwrap();
    eventually("bob to see the shape", || bob.lock().unwrap().shape_count() == 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(alice.lock().unwrap().engine().adds.len(), 1);

    let id = alice.lock().unwrap().identities().id_of(&alice_handle).cloned().unwrap();
    let bob_handle = *bob.lock().unwrap().identities().handle_of(&id).unwrap();
    assert_eq!(bob.lock().unwrap().engine().shapes[&bob_handle].text, "hello");

    // Bob moves it; Alice follows
    bob.lock().unwrap().handle_event(EngineEvent::Move {
        target: bob_handle,
        position: Position::new(50.0, 60.0),
    });
    eventually("alice to see the move", || {
        alice.lock().unwrap().engine().shapes[&alice_handle].position == Position::new(50.0, 60.0)
    })
    .await;

    // Bob edits the text; Alice follows
    bob.lock().unwrap().handle_event(EngineEvent::TextUpdate {
        target: bob_handle,
        props: chartroom::core::ShapeProps::with_text("edited"),
    });
    eventually("alice to see the text", || {
        alice.lock().unwrap().engine().shapes[&alice_handle].text == "edited"
    })
    .await;
}

#[tokio::test]
async fn test_connector_crosses_once() {
    let (addr, registry) = spawn_server();
    let config = ClientConfig::new(&format!("http://{}", addr)).unwrap();

    let alice = join(&config, "wiring").await;
    let bob = join(&config, "wiring").await;
    wait_for_members(&registry, RoomId::from_name("wiring"), 2).await;

    let (a, b) = {
        let mut alice = alice.lock().unwrap();
        let a = alice.shape_add(add_param("rect", 0.0, 0.0, "a"), true).unwrap();
        let b = alice.shape_add(add_param("rect", 100.0, 0.0, "b"), true).unwrap();
        (a, b)
    };
    eventually("bob to see both shapes", || bob.lock().unwrap().shape_count() == 2).await;

    alice.lock().unwrap().handle_event(EngineEvent::Connect {
        start: EnginePort::new(a, "right"),
        end: EnginePort::new(b, "left"),
    });
    eventually("bob to draw the connector", || {
        bob.lock().unwrap().engine().connects.len() == 1
    })
    .await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(bob.lock().unwrap().connectors().len(), 1);
    assert_eq!(alice.lock().unwrap().connectors().len(), 1);
    assert!(alice.lock().unwrap().engine().connects.is_empty());
}

#[tokio::test]
async fn test_large_import_reaches_peer() {
    let (addr, registry) = spawn_server();
    let config = ClientConfig::new(&format!("http://{}", addr)).unwrap();

    let alice = join(&config, "big-import").await;
    let bob = join(&config, "big-import").await;
    wait_for_members(&registry, RoomId::from_name("big-import"), 2).await;

    let snapshot = Snapshot {
        s: (0..300)
            .map(|i| SnapshotShape {
                template_key: "rect".to_string(),
                position: Position::new(i as f64 * 10.0, 0.0),
                detail: format!("shape {}", i),
            })
            .collect(),
        c: (1..300)
            .map(|i| SnapshotConnector {
                s: SnapshotPort { i: i - 1, c: "right".to_string() },
                e: SnapshotPort { i, c: "left".to_string() },
            })
            .collect(),
    };
    alice.lock().unwrap().import_snapshot(&snapshot).unwrap();

    eventually("bob to receive every imported shape", || {
        bob.lock().unwrap().shape_count() == 300
    })
    .await;
    eventually("bob to draw every imported connector", || {
        bob.lock().unwrap().engine().connects.len() == 299
    })
    .await;
    assert_eq!(bob.lock().unwrap().export_snapshot(), snapshot);
}

// Accepts WebSocket clients on any path. The first one is hung up on right
// away; text frames from later ones are reported.
async fn flaky_server() -> (
    SocketAddr,
    mpsc::UnboundedReceiver<Instant>,
    mpsc::UnboundedReceiver<String>,
) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (accepted_tx, accepted) = mpsc::unbounded_channel();
    let (text_tx, texts) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut hang_up = true;
        while let Ok((stream, _)) = listener.accept().await {
            let mut ws = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(_) => continue,
            };
            let _ = accepted_tx.send(Instant::now());

            if hang_up {
                hang_up = false;
                let _ = ws.close(None).await;
                continue;
            }

            let text_tx = text_tx.clone();
            tokio::spawn(async move {
                while let Some(Ok(msg)) = ws.next().await {
                    if let Message::Text(text) = msg {
                        let _ = text_tx.send(text);
                    }
                }
            });
        }
    });

    (addr, accepted, texts)
}

#[tokio::test]
async fn test_rejoins_after_server_drop() {
    let floor = Duration::from_millis(300);
    let (addr, mut accepted, mut texts) = flaky_server().await;
    let config = ClientConfig::new(&format!("http://{}", addr))
        .unwrap()
        .with_rejoin_floor(floor);

    let translator: SharedTranslator =
        Arc::new(Mutex::new(DiagramTranslator::new(FakeEngine::default())));
    let outgoing = translator.lock().unwrap().subscribe();
    let manager = ConnectionManager::new(config, translator.clone());
    let transport = manager.transport();
    tokio::spawn(async move { manager.start("flaky", outgoing).await });

    let first = timeout(Duration::from_secs(3), accepted.recv()).await.unwrap().unwrap();

    // The server hung up. Until the floor has passed the client stays down
    // and edits are dropped rather than queued.
    tokio::time::sleep(Duration::from_millis(50)).await;
    eventually("transport to drop", || !transport.is_live()).await;
    assert!(accepted.try_recv().is_err(), "rejoined before the floor");

    translator
        .lock()
        .unwrap()
        .shape_add(add_param("rect", 0.0, 0.0, "while down"), true);
    let stray = WireMessage::Update(ShapeUpdate::moved("s1".into(), Position::new(1.0, 1.0)));
    assert!(!transport.send(&stray));

    let second = timeout(Duration::from_secs(3), accepted.recv()).await.unwrap().unwrap();
    let spacing = second.duration_since(first);
    assert!(
        spacing >= floor - Duration::from_millis(50),
        "rejoined after {:?}, floor is {:?}",
        spacing,
        floor
    );
    eventually("transport to go live again", || transport.is_live()).await;

    translator
        .lock()
        .unwrap()
        .shape_add(add_param("rect", 10.0, 0.0, "after rejoin"), true);
    let text = timeout(Duration::from_secs(3), texts.recv()).await.unwrap().unwrap();
    match serde_json::from_str::<WireMessage>(&text).unwrap() {
        WireMessage::Add(param) => assert_eq!(param.props.text_content(), Some("after rejoin")),
        other => panic!("unexpected first frame after rejoin {:?}", other),
    }
}
