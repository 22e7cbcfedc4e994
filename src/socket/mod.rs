// socket/mod.rs - Realtime room subscriptions
//
// The manager is constructed explicitly and never connects on its own.
// `connect` spawns one task that owns the websocket, receives commands over
// a channel and reports everything that happens as `SocketEvent`s on a
// second channel, so callers consume a single event stream.

pub mod events;
pub mod reconnect;

use std::collections::HashMap;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, client::IntoClientRequest, Message};

use crate::config::SocketConfig;

pub use events::{Room, RoomEvent, ServerEvent};
pub use reconnect::{ConnectionState, NextStep, ReconnectPolicy, Reconnector};

const EVENT_BUFFER: usize = 64;

/// How long `close` waits for the task before aborting it.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

#[derive(Error, Debug)]
pub enum SocketError {
    #[error("Invalid socket event: {0}")]
    InvalidEvent(String),

    #[error("Socket is not connected")]
    NotConnected,

    #[error("Socket frame JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Websocket error: {0}")]
    Transport(#[from] tungstenite::Error),
}

/// Everything the connection task reports back.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    Connected,
    Disconnected { reason: String },
    Reconnecting { attempt: u32, delay_ms: u64 },
    Message(ServerEvent),
    GaveUp,
    Closed,
}

#[derive(Debug)]
enum Command {
    Emit(RoomEvent),
    Close,
}

pub struct SocketManager {
    config: SocketConfig,
    token: Option<String>,
    commands: Option<mpsc::UnboundedSender<Command>>,
    state: Option<watch::Receiver<ConnectionState>>,
    task: Option<JoinHandle<()>>,
}

impl SocketManager {
    pub fn new(config: SocketConfig, token: Option<String>) -> Self {
        if config.auto_connect {
            tracing::debug!("auto_connect is ignored; call SocketManager::connect explicitly");
        }
        Self { config, token, commands: None, state: None, task: None }
    }

    pub fn is_started(&self) -> bool {
        self.commands.is_some()
    }

    /// Current lifecycle state of the connection task.
    pub fn state(&self) -> ConnectionState {
        self.state
            .as_ref()
            .map(|state| *state.borrow())
            .unwrap_or(ConnectionState::Idle)
    }

    /// Start the connection task and return its event stream.
    pub fn connect(&mut self) -> mpsc::Receiver<SocketEvent> {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);

        let task = ConnectionTask {
            url: self.config.url.clone(),
            token: self.token.clone(),
            reconnector: Reconnector::new(ReconnectPolicy::from_config(&self.config)),
            rooms: HashMap::new(),
            commands: command_rx,
            events: event_tx,
            state: state_tx,
        };

        self.commands = Some(command_tx);
        self.state = Some(state_rx);
        self.task = Some(tokio::spawn(task.run()));
        event_rx
    }

    pub fn emit(&self, event: RoomEvent) -> Result<(), SocketError> {
        let commands = self.commands.as_ref().ok_or(SocketError::NotConnected)?;
        commands.send(Command::Emit(event)).map_err(|_| SocketError::NotConnected)
    }

    pub async fn close(&mut self) {
        if let Some(commands) = self.commands.take() {
            let _ = commands.send(Command::Close);
        }
        // The task may be parked on a full event channel nobody drains.
        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(CLOSE_GRACE, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!("Socket task ended abnormally: {}", e),
                Err(_) => {
                    tracing::warn!("Socket task did not stop within {:?}, aborting", CLOSE_GRACE);
                    task.abort();
                }
            }
        }
    }
}

enum Session {
    Dropped(String),
    Closed,
}

struct ConnectionTask {
    url: String,
    token: Option<String>,
    reconnector: Reconnector,
    /// Active subscriptions, replayed after every reconnect.
    rooms: HashMap<Room, RoomEvent>,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::Sender<SocketEvent>,
    state: watch::Sender<ConnectionState>,
}

impl ConnectionTask {
    async fn run(mut self) {
        loop {
            self.reconnector.connecting();
            self.publish();

            match self.open().await {
                Ok(stream) => {
                    self.reconnector.connected();
                    self.publish();
                    self.report(SocketEvent::Connected).await;

                    match self.serve(stream).await {
                        Session::Closed => break,
                        Session::Dropped(reason) => {
                            tracing::warn!("Socket disconnected: {}", reason);
                            self.report(SocketEvent::Disconnected { reason }).await;
                        }
                    }
                }
                Err(e) => tracing::warn!("Socket connection to {} failed: {}", self.url, e),
            }

            let step = self.reconnector.next_step();
            self.publish();
            match step {
                NextStep::GiveUp => {
                    self.report(SocketEvent::GaveUp).await;
                    return;
                }
                NextStep::Retry { attempt, delay } => {
                    self.report(SocketEvent::Reconnecting {
                        attempt,
                        delay_ms: delay.as_millis() as u64,
                    })
                    .await;

                    if self.wait(delay).await {
                        break;
                    }
                }
            }
        }

        self.reconnector.close();
        self.publish();
        if self.events.try_send(SocketEvent::Closed).is_err() {
            tracing::debug!("Closed event not delivered; receiver full or dropped");
        }
    }

    fn publish(&self) {
        self.state.send_replace(self.reconnector.state());
    }

    async fn open(&self) -> Result<WsStream, SocketError> {
        let mut request = self.url.as_str().into_client_request()?;
        if let Some(token) = &self.token {
            let value = format!("Bearer {}", token)
                .parse()
                .map_err(|_| SocketError::InvalidEvent("token is not a valid header value".to_string()))?;
            request.headers_mut().insert("authorization", value);
        }

        let (stream, _response) = tokio_tungstenite::connect_async(request).await?;
        Ok(stream)
    }

    async fn serve(&mut self, stream: WsStream) -> Session {
        let (mut sink, mut source) = stream.split();

        for event in self.rooms.values() {
            match event.to_frame() {
                Ok(frame) => {
                    if let Err(e) = sink.send(Message::Text(frame)).await {
                        return Session::Dropped(e.to_string());
                    }
                }
                Err(e) => tracing::warn!("Skipping room replay: {}", e),
            }
        }

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Emit(event)) => {
                        let frame = match event.to_frame() {
                            Ok(frame) => frame,
                            Err(e) => {
                                tracing::warn!("Dropping unencodable event: {}", e);
                                continue;
                            }
                        };
                        self.track(event);
                        if let Err(e) = sink.send(Message::Text(frame)).await {
                            return Session::Dropped(e.to_string());
                        }
                    }
                    Some(Command::Close) | None => {
                        let _ = sink.close().await;
                        return Session::Closed;
                    }
                },
                message = source.next() => match message {
                    Some(Ok(Message::Text(text))) => match ServerEvent::from_frame(&text) {
                        Ok(event) => self.report(SocketEvent::Message(event)).await,
                        Err(e) => tracing::debug!("Ignoring unparseable frame: {}", e),
                    },
                    Some(Ok(Message::Close(_))) | None => return Session::Dropped("closed by server".to_string()),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Session::Dropped(e.to_string()),
                },
            }
        }
    }

    fn track(&mut self, event: RoomEvent) {
        if event.is_join() {
            self.rooms.insert(event.room(), event);
        } else {
            self.rooms.remove(&event.room());
        }
    }

    /// Sleep out the backoff, still honoring emits and close. Returns true on close.
    async fn wait(&mut self, delay: Duration) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return false,
                command = self.commands.recv() => match command {
                    Some(Command::Emit(event)) => self.track(event),
                    Some(Command::Close) | None => return true,
                },
            }
        }
    }

    async fn report(&self, event: SocketEvent) {
        if self.events.send(event).await.is_err() {
            tracing::debug!("Socket event receiver dropped");
        }
    }
}
