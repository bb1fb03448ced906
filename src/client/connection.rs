//! Client connection manager
//!
//! Owns the single WebSocket to a room. Translator events go out as
//! `{type, msg}` frames while a transport is live and are dropped
//! otherwise; inbound frames are decoded and handed to an
//! [`OperationSink`]. A lost transport is rejoined forever, never sooner
//! than the configured floor after the previous join attempt began.

use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use crate::client::reconnect::ReconnectPolicy;
use crate::client::translator::TranslatorEvent;
use crate::config::ClientConfig;
use crate::constants::{API_PATH, CHART_PATH, WEBSOCKET_PATH};
use crate::core::message::WireMessage;
use crate::core::room_id::RoomId;
use crate::error::{ChartRoomError, Result};

/// Receiver of decoded inbound operations
pub trait OperationSink {
    fn apply(&mut self, message: WireMessage);
}

/// Sending half of the live transport, shared with the event forwarder
#[derive(Debug, Clone, Default)]
pub struct Transport {
    live: Arc<Mutex<Option<mpsc::UnboundedSender<Message>>>>,
}

impl Transport {
    pub fn is_live(&self) -> bool {
        self.live.lock().map(|live| live.is_some()).unwrap_or(false)
    }

    /// Queue a frame on the live socket. Without one the frame is dropped.
    pub fn send(&self, message: &WireMessage) -> bool {
        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to serialize {} frame: {}", message.kind(), e);
                return false;
            }
        };

        let live = match self.live.lock() {
            Ok(live) => live,
            Err(e) => {
                error!("Transport lock poisoned: {}", e);
                return false;
            }
        };

        match live.as_ref() {
            Some(tx) => tx.send(Message::Text(text)).is_ok(),
            None => {
                debug!("No live transport, dropping {} frame", message.kind());
                false
            }
        }
    }

    fn attach(&self, tx: mpsc::UnboundedSender<Message>) {
        if let Ok(mut live) = self.live.lock() {
            *live = Some(tx);
        }
    }

    fn detach(&self) {
        if let Ok(mut live) = self.live.lock() {
            *live = None;
        }
    }
}

pub struct ConnectionManager<S> {
    config: ClientConfig,
    sink: Arc<Mutex<S>>,
    transport: Transport,
    policy: ReconnectPolicy,
}

impl<S: OperationSink + Send + 'static> ConnectionManager<S> {
    pub fn new(config: ClientConfig, sink: Arc<Mutex<S>>) -> Self {
        let policy = ReconnectPolicy::new(config.rejoin_floor);
        Self {
            config,
            sink,
            transport: Transport::default(),
            policy,
        }
    }

    pub fn transport(&self) -> Transport {
        self.transport.clone()
    }

    /// `ws(s)://<host>/api/chart/<room>/websocket`
    pub fn websocket_url(&self, room: &str) -> Result<Url> {
        let path = format!("/{}/{}/{}/{}", API_PATH, CHART_PATH, room, WEBSOCKET_PATH);
        let mut url = self.config.server_url.join(&path)?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme).map_err(|_| {
            ChartRoomError::ConfigError(format!("Cannot derive WebSocket URL from {}", url))
        })?;
        Ok(url)
    }

    /// Page address to share for this room
    pub fn display_address(&self, room: &str) -> Url {
        let mut url = self.config.server_url.clone();
        url.set_fragment(Some(room));
        url
    }

    /// Forward one operation; dropped when no transport is live
    pub fn send(&self, message: &WireMessage) -> bool {
        self.transport.send(message)
    }

    /// Join `room` and keep it joined. Returns once the translator bus
    /// closes, i.e. when the translator has been dropped.
    pub async fn start(
        mut self,
        room: &str,
        outgoing: mpsc::UnboundedReceiver<TranslatorEvent>,
    ) -> Result<()> {
        let url = self.websocket_url(room)?;
        info!("Joining room {} ({})", room, self.display_address(room));

        let transport = self.transport.clone();
        tokio::select! {
            _ = forward_events(outgoing, transport) => {
                info!("Translator bus closed, leaving room {}", room);
                Ok(())
            }
            never = self.rejoin_loop(&url) => match never {},
        }
    }

    async fn rejoin_loop(&mut self, url: &Url) -> Infallible {
        loop {
            self.policy.join_started(Instant::now());
            match self.join(url).await {
                Ok(()) => info!("Transport to {} closed", url),
                Err(e) => warn!("Transport to {} failed: {}", url, e),
            }

            if let Some(delay) = self.policy.transport_lost(Instant::now()) {
                if !delay.is_zero() {
                    info!(
                        "Rejoining in {:?} (floor {:?})",
                        delay,
                        self.policy.floor()
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    async fn join(&mut self, url: &Url) -> Result<()> {
        let (stream, _) = connect_async(url.as_str()).await?;
        let (mut ws_tx, mut ws_rx) = stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

        let writer = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                if let Err(e) = ws_tx.send(message).await {
                    warn!("Failed to write frame: {}", e);
                    break;
                }
            }
        });

        self.transport.attach(tx);
        info!("Transport to {} is live", url);

        let result = loop {
            match ws_rx.next().await {
                Some(Ok(Message::Text(text))) => self.dispatch(&text),
                Some(Ok(Message::Close(frame))) => {
                    debug!("Server closed transport: {:?}", frame);
                    break Ok(());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => break Err(e.into()),
                None => break Ok(()),
            }
        };

        self.transport.detach();
        writer.abort();
        result
    }

    fn dispatch(&self, text: &str) {
        let message: WireMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Ignoring unreadable frame ({}): {}", e, text);
                return;
            }
        };

        debug!("Applying inbound {} frame", message.kind());
        match self.sink.lock() {
            Ok(mut sink) => sink.apply(message),
            Err(e) => error!("Operation sink lock poisoned: {}", e),
        }
    }
}

async fn forward_events(mut events: mpsc::UnboundedReceiver<TranslatorEvent>, transport: Transport) {
    while let Some(event) = events.recv().await {
        transport.send(&WireMessage::from(event));
    }
}

/// Ask the server for a fresh private room
pub async fn create_private_room(config: &ClientConfig) -> Result<RoomId> {
    let url = config
        .server_url
        .join(&format!("/{}/{}", API_PATH, CHART_PATH))?;
    let body = reqwest::Client::new()
        .post(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    RoomId::from_hex(body.trim())
}
