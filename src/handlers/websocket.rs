use std::fmt::Display;
use std::sync::Arc;

use futures_util::sink::{Sink, SinkExt};
use futures_util::stream::{Stream, StreamExt};
use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use warp::ws::{Message, WebSocket};

use crate::constants::CLOSE_CODE_INTERNAL_ERROR;
use crate::core::room::{RoomHandle, RoomPayload};
use crate::core::session::Session;
use crate::error::ChartRoomError;

// Pump one upgraded socket into its room actor until it closes
pub async fn handle_room_session(ws: WebSocket, room: RoomHandle) {
    let (ws_tx, ws_rx) = ws.split();
    pump_session(ws_tx, ws_rx, room).await;
}

pub(crate) async fn pump_session<Tx, Rx, E>(ws_tx: Tx, mut ws_rx: Rx, room: RoomHandle)
where
    Tx: Sink<Message> + Unpin + Send + 'static,
    Tx::Error: Display,
    Rx: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let (tx, mut rx) = mpsc::unbounded_channel();

    // Forward queued frames to the socket. The sink is handed back when a
    // write fails so the session can still be closed on it.
    let mut writer = tokio::task::spawn(async move {
        let mut ws_tx = ws_tx;
        while let Some(message) = rx.recv().await {
            if let Err(e) = ws_tx.send(message).await {
                error!("Failed to send WebSocket message: {}", e);
                break;
            }
        }
        ws_tx
    });

    let session = Arc::new(Session::new(room.id(), tx));

    if let Err(e) = room.join(session.clone()).await {
        error!("Failed to join room {}: {}", room.id(), e);
        send_fault(&session, &e);
        return;
    }

    info!("Session {} connected to room {}", session.id(), session.room());

    // Handle incoming frames
    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(msg) => {
                if msg.is_close() {
                    break;
                }

                if session.is_quit() {
                    // Evicted after a failed send but the peer is still talking.
                    // The writer has stopped, so close on the sink directly.
                    match (&mut writer).await {
                        Ok(mut ws_tx) => {
                            let close =
                                Message::close_with(CLOSE_CODE_INTERNAL_ERROR, "WebSocket broken.");
                            if let Err(e) = ws_tx.send(close).await {
                                debug!("Could not close evicted session {}: {}", session.id(), e);
                            }
                        }
                        Err(e) => error!("Writer for session {} failed: {}", session.id(), e),
                    }
                    break;
                }

                let payload = match frame_payload(msg) {
                    Some(payload) => payload,
                    None => continue,
                };

                if let Err(e) = room.deliver(session.id(), payload).await {
                    warn!("Room {} rejected frame from {}: {}", room.id(), session.id(), e);
                    session.send_frame(error_frame(&e));
                }
            }
            Err(e) => {
                warn!("WebSocket error on session {}: {}", session.id(), e);
                break;
            }
        }
    }

    // Client disconnected
    match room.leave(session.id()).await {
        Ok(()) => info!("Session {} disconnected from room {}", session.id(), room.id()),
        Err(e) => error!("Failed to remove session {}: {}", session.id(), e),
    }
}

// Text frames go out verbatim, binary frames as their JSON encoding
fn frame_payload(msg: Message) -> Option<RoomPayload> {
    if msg.is_text() {
        msg.to_str().ok().map(RoomPayload::from)
    } else if msg.is_binary() {
        Some(RoomPayload::from(msg.into_bytes()))
    } else {
        debug!("Ignoring control frame");
        None
    }
}

pub(crate) fn error_frame(err: &ChartRoomError) -> Message {
    Message::text(serde_json::json!({ "error": err.to_string() }).to_string())
}

// Report a setup fault in-band, then close abnormally
pub(crate) fn send_fault(session: &Session, err: &ChartRoomError) {
    session.send_frame(error_frame(err));
    session.send_frame(Message::close_with(
        CLOSE_CODE_INTERNAL_ERROR,
        "Uncaught exception during session setup",
    ));
}

// Same as `send_fault` for a socket that never got a session
pub(crate) async fn close_with_fault(ws: WebSocket, err: ChartRoomError) {
    let (mut ws_tx, _ws_rx) = ws.split();
    if let Err(e) = ws_tx.send(error_frame(&err)).await {
        debug!("Could not deliver fault frame: {}", e);
        return;
    }
    let close = Message::close_with(
        CLOSE_CODE_INTERNAL_ERROR,
        "Uncaught exception during session setup",
    );
    if let Err(e) = ws_tx.send(close).await {
        debug!("Could not deliver close frame: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::task::{Context, Poll};
    use std::time::Duration;

    use futures_util::stream;

    use crate::core::room_id::RoomId;

    // A peer whose socket refuses the first text frame, then accepts
    // everything and keeps what it got
    #[derive(Clone, Default)]
    struct StalledPeer {
        refused: Arc<AtomicBool>,
        frames: Arc<Mutex<Vec<Message>>>,
    }

    impl Sink<Message> for StalledPeer {
        type Error = String;

        fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), String>> {
            Poll::Ready(Ok(()))
        }

        fn start_send(self: Pin<&mut Self>, item: Message) -> Result<(), String> {
            if item.is_text() && !self.refused.swap(true, Ordering::SeqCst) {
                return Err("write buffer full".to_string());
            }
            self.frames.lock().unwrap().push(item);
            Ok(())
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), String>> {
            Poll::Ready(Ok(()))
        }

        fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), String>> {
            Poll::Ready(Ok(()))
        }
    }

    async fn member_count(room: &RoomHandle) -> usize {
        room.members().await.unwrap().len()
    }

    #[tokio::test]
    async fn test_evicted_session_is_closed_with_1011() {
        let room = RoomHandle::spawn(RoomId::from_name("stalled"), 16);
        let peer = StalledPeer::default();
        let (inbound, rx) = mpsc::unbounded_channel::<Message>();
        let incoming = Box::pin(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (Ok::<_, Infallible>(msg), rx))
        }));

        let pump = tokio::spawn(pump_session(peer.clone(), incoming, room.clone()));
        let mut waited = 0;
        while member_count(&room).await != 1 {
            assert!(waited < 300, "session never joined");
            waited += 1;
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        // The echo of "a" hits the stalled socket and stops the writer
        inbound.send(Message::text("a")).unwrap();
        let mut waited = 0;
        while !peer.refused.load(Ordering::SeqCst) {
            assert!(waited < 300, "socket never refused a frame");
            waited += 1;
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        // A later broadcast fails and evicts the session
        let mut waited = 0;
        while member_count(&room).await != 0 {
            assert!(waited < 300, "session never evicted");
            waited += 1;
            let _ = inbound.send(Message::text("b"));
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        // The peer keeps talking and is told the socket is broken
        let _ = inbound.send(Message::text("c"));
        tokio::time::timeout(Duration::from_secs(3), pump).await.unwrap().unwrap();

        let frames = peer.frames.lock().unwrap();
        let closes: Vec<(u16, String)> = frames
            .iter()
            .filter_map(|m| m.close_frame().map(|(code, reason)| (code, reason.to_string())))
            .collect();
        assert_eq!(closes, vec![(1011, "WebSocket broken.".to_string())]);
        assert!(frames.iter().all(|m| !m.is_text()), "nothing is delivered after eviction");
    }

    #[test]
    fn test_binary_frames_become_json_payloads() {
        let payload = frame_payload(Message::binary(vec![1u8, 2, 3])).unwrap();
        assert_eq!(payload.into_text(), "[1,2,3]");
        assert!(frame_payload(Message::ping(Vec::new())).is_none());
    }
}
