// src/socket.rs

use crate::config::Config;
use crate::constants::{
    BOT_RESPONSE_EVENT, CONNECT_TIMEOUT_MS, DEFAULT_MAX_RECONNECT_DELAY_MS, DEFAULT_NAMESPACE,
    DEFAULT_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_DELAY_MS, MAX_HEARTBEAT_MS, MAX_PENDING_EMITS,
    MESSAGE_EVENT, SHUTDOWN_TIMEOUT_MS,
};
use crate::errors::{ChatlineError, ChatlineResult};
use crate::protocol::{socket_endpoint, EnginePacket, Handshake, SocketPacket};
use futures::{Sink, SinkExt, Stream, StreamExt};
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout, Duration, Instant};
use tokio_tungstenite::{connect_async, tungstenite, tungstenite::Message};
use url::Url;

/// Anything the UI can hand a user message to.
pub trait Outbound {
    fn send_message(&self, text: &str) -> ChatlineResult<()>;
}

/// A `botResponse` event: the reply text plus the auxiliary value the
/// backend sends alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct BotReply {
    pub text: String,
    pub aux: Option<Value>,
}

/// Connection lifecycle and incoming traffic, delivered to the UI loop.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connecting,
    Connected { sid: Option<String> },
    BotResponse(BotReply),
    Disconnected { reason: String },
    Reconnecting { attempt: u32, delay: Duration },
    /// Reconnecting stopped. `undelivered` counts queued messages that were
    /// never sent.
    GaveUp { attempts: u32, undelivered: usize },
}

#[derive(Debug, Clone)]
pub struct SocketOptions {
    pub endpoint: Url,
    pub namespace: String,
    /// Consecutive failed attempts before giving up. 0 retries forever.
    pub reconnect_attempts: u32,
    pub reconnect_delay: Duration,
    pub max_reconnect_delay: Duration,
    pub connect_timeout: Duration,
}

impl SocketOptions {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            namespace: DEFAULT_NAMESPACE.to_string(),
            reconnect_attempts: DEFAULT_RECONNECT_ATTEMPTS,
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            max_reconnect_delay: Duration::from_millis(DEFAULT_MAX_RECONNECT_DELAY_MS),
            connect_timeout: Duration::from_millis(CONNECT_TIMEOUT_MS),
        }
    }

    pub fn from_config(config: &Config) -> ChatlineResult<Self> {
        Ok(Self {
            reconnect_attempts: config.reconnect_attempts,
            reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
            max_reconnect_delay: Duration::from_millis(config.max_reconnect_delay_ms),
            ..Self::new(socket_endpoint(&config.server_url)?)
        })
    }
}

#[derive(Debug)]
enum Command {
    Emit { event: String, args: Vec<Value> },
    Close,
}

/// Cheap, cloneable sender side of a `SocketClient`.
#[derive(Debug, Clone)]
pub struct SocketHandle {
    commands: mpsc::UnboundedSender<Command>,
    connected: Arc<AtomicBool>,
}

impl SocketHandle {
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Queues an event. It is sent as soon as the socket is connected, so
    /// emits made while connecting or reconnecting are delivered later.
    /// Fails once the client has given up or been shut down.
    pub fn emit(&self, event: &str, args: Vec<Value>) -> ChatlineResult<()> {
        self.commands
            .send(Command::Emit {
                event: event.to_string(),
                args,
            })
            .map_err(|_| ChatlineError::NotConnected)
    }
}

impl Outbound for SocketHandle {
    fn send_message(&self, text: &str) -> ChatlineResult<()> {
        self.emit(MESSAGE_EVENT, vec![Value::String(text.to_string())])
    }
}

/// Owns the background connection task. Created once by the application
/// root and shut down at teardown.
#[derive(Debug)]
pub struct SocketClient {
    handle: SocketHandle,
    task: Option<JoinHandle<()>>,
}

impl SocketClient {
    /// Starts connecting in the background. Lifecycle and incoming events are
    /// reported on `events`.
    pub fn connect(options: SocketOptions, events: mpsc::UnboundedSender<TransportEvent>) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(run_connection(
            options,
            commands_rx,
            events,
            Arc::clone(&connected),
        ));

        Self {
            handle: SocketHandle {
                commands: commands_tx,
                connected,
            },
            task: Some(task),
        }
    }

    pub fn handle(&self) -> SocketHandle {
        self.handle.clone()
    }

    /// Disconnects cleanly, waiting a bounded time for the task to finish.
    pub async fn shutdown(mut self) {
        let _ = self.handle.commands.send(Command::Close);
        if let Some(mut task) = self.task.take() {
            if timeout(Duration::from_millis(SHUTDOWN_TIMEOUT_MS), &mut task)
                .await
                .is_err()
            {
                warn!("socket task did not stop in time, aborting");
                task.abort();
            }
        }
        self.handle.connected.store(false, Ordering::SeqCst);
    }
}

impl Drop for SocketClient {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[derive(Debug, PartialEq)]
enum SessionEnd {
    ClosedByClient,
    ClosedByServer(String),
}

#[derive(Debug, PartialEq)]
enum FrameAction {
    Nothing,
    Reply(String),
    Connected,
    End(SessionEnd),
}

type PendingEmits = VecDeque<(String, Vec<Value>)>;

/// Exponential backoff, doubling per attempt and capped at `max`.
pub fn backoff_delay(base: Duration, max: Duration, attempt: u32) -> Duration {
    let factor = 1u32 << attempt.saturating_sub(1).min(16);
    base.saturating_mul(factor).min(max)
}

/// Whether `attempt` is past `limit`. A limit of 0 never runs out.
fn retries_exhausted(attempt: u32, limit: u32) -> bool {
    limit != 0 && attempt > limit
}

/// How long the connection may stay silent before it counts as lost.
fn heartbeat_window(handshake: &Handshake) -> Duration {
    let millis = handshake
        .ping_interval
        .saturating_add(handshake.ping_timeout)
        .min(MAX_HEARTBEAT_MS);
    Duration::from_millis(millis)
}

fn queue_emit(pending: &mut PendingEmits, event: String, args: Vec<Value>) {
    if pending.len() >= MAX_PENDING_EMITS {
        if let Some((dropped, _)) = pending.pop_front() {
            warn!("outgoing queue full, dropping oldest '{}'", dropped);
        }
    }
    debug!("queueing '{}' until connected", event);
    pending.push_back((event, args));
}

async fn send_event<S>(sink: &mut S, namespace: &str, event: &str, args: Vec<Value>) -> ChatlineResult<()>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let frame = SocketPacket::event(namespace, event, args).to_frame()?;
    debug!("emit {}", frame);
    sink.send(Message::Text(frame)).await?;
    Ok(())
}

async fn run_connection(
    options: SocketOptions,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<TransportEvent>,
    connected: Arc<AtomicBool>,
) {
    // Consecutive failures since the last successful connect.
    let mut attempt: u32 = 0;
    let mut pending = PendingEmits::new();

    loop {
        let _ = events.send(TransportEvent::Connecting);
        info!("connecting to {}", options.endpoint);

        let outcome = run_session(&options, &mut commands, &mut pending, &events, &connected).await;
        let was_connected = connected.swap(false, Ordering::SeqCst);

        let reason = match outcome {
            Ok(SessionEnd::ClosedByClient) => {
                info!("disconnected from {}", options.endpoint);
                if !pending.is_empty() {
                    warn!("{} queued messages were never sent", pending.len());
                }
                let _ = events.send(TransportEvent::Disconnected {
                    reason: "closed by client".to_string(),
                });
                return;
            }
            Ok(SessionEnd::ClosedByServer(reason)) => reason,
            Err(e) => e.to_string(),
        };
        warn!("connection lost: {}", reason);
        let _ = events.send(TransportEvent::Disconnected { reason });

        attempt = if was_connected { 1 } else { attempt.saturating_add(1) };
        if retries_exhausted(attempt, options.reconnect_attempts) {
            // Refuse further sends before reporting, then count what never went out.
            commands.close();
            let mut undelivered = pending.len();
            while let Ok(command) = commands.try_recv() {
                if let Command::Emit { .. } = command {
                    undelivered += 1;
                }
            }
            warn!(
                "giving up after {} reconnect attempts, {} messages undelivered",
                options.reconnect_attempts, undelivered
            );
            let _ = events.send(TransportEvent::GaveUp {
                attempts: options.reconnect_attempts,
                undelivered,
            });
            return;
        }

        let delay = backoff_delay(options.reconnect_delay, options.max_reconnect_delay, attempt);
        let _ = events.send(TransportEvent::Reconnecting { attempt, delay });

        let pause = tokio::time::sleep(delay);
        tokio::pin!(pause);
        loop {
            tokio::select! {
                _ = &mut pause => break,
                command = commands.recv() => match command {
                    Some(Command::Emit { event, args }) => queue_emit(&mut pending, event, args),
                    Some(Command::Close) | None => {
                        if !pending.is_empty() {
                            warn!("{} queued messages were never sent", pending.len());
                        }
                        let _ = events.send(TransportEvent::Disconnected {
                            reason: "closed by client".to_string(),
                        });
                        return;
                    }
                },
            }
        }
    }
}

async fn run_session(
    options: &SocketOptions,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    pending: &mut PendingEmits,
    events: &mpsc::UnboundedSender<TransportEvent>,
    connected: &AtomicBool,
) -> ChatlineResult<SessionEnd> {
    let (ws, _) = timeout(options.connect_timeout, connect_async(options.endpoint.as_str()))
        .await
        .map_err(|_| ChatlineError::transport_error("timed out opening websocket"))??;
    let (mut sink, mut stream) = ws.split();

    let handshake = read_handshake(&mut stream, options.connect_timeout).await?;
    debug!(
        "engine.io session {} (ping every {}ms, timeout {}ms)",
        handshake.sid, handshake.ping_interval, handshake.ping_timeout
    );
    sink.send(Message::Text(SocketPacket::connect(&options.namespace).to_frame()?))
        .await?;

    // Any inbound frame, pings included, must show up within this window.
    // Outbound traffic does not extend it.
    let heartbeat = heartbeat_window(&handshake);
    let mut last_inbound = Instant::now();
    let mut ready = false;

    loop {
        tokio::select! {
            _ = sleep_until(last_inbound + heartbeat) => {
                return Err(ChatlineError::transport_error("heartbeat timed out"));
            }
            frame = stream.next() => {
                last_inbound = Instant::now();
                let message = match frame {
                    None => {
                        return Ok(SessionEnd::ClosedByServer("connection dropped".to_string()))
                    }
                    Some(message) => message?,
                };
                match message {
                    Message::Text(text) => {
                        match interpret_frame(&text, &options.namespace, events, connected)? {
                            FrameAction::Nothing => {}
                            FrameAction::Reply(reply) => sink.send(Message::Text(reply)).await?,
                            FrameAction::Connected => {
                                ready = true;
                                while let Some((event, args)) = pending.pop_front() {
                                    send_event(&mut sink, &options.namespace, &event, args).await?;
                                }
                            }
                            FrameAction::End(end) => return Ok(end),
                        }
                    }
                    Message::Close(frame) => {
                        let reason = frame
                            .map(|f| f.reason.to_string())
                            .filter(|r| !r.is_empty())
                            .unwrap_or_else(|| "server closed the connection".to_string());
                        return Ok(SessionEnd::ClosedByServer(reason));
                    }
                    _ => {}
                }
            }
            command = commands.recv() => match command {
                Some(Command::Emit { event, args }) if ready => {
                    send_event(&mut sink, &options.namespace, &event, args).await?;
                }
                Some(Command::Emit { event, args }) => queue_emit(pending, event, args),
                Some(Command::Close) | None => {
                    let _ = sink
                        .send(Message::Text(SocketPacket::disconnect(&options.namespace).to_frame()?))
                        .await;
                    let _ = sink.send(Message::Text(EnginePacket::Close.encode()?)).await;
                    let _ = sink.close().await;
                    return Ok(SessionEnd::ClosedByClient);
                }
            },
        }
    }
}

async fn read_handshake<S>(stream: &mut S, wait: Duration) -> ChatlineResult<Handshake>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        let message = match timeout(wait, stream.next()).await {
            Err(_) => return Err(ChatlineError::transport_error("timed out waiting for handshake")),
            Ok(None) => {
                return Err(ChatlineError::transport_error(
                    "connection closed during handshake",
                ))
            }
            Ok(Some(message)) => message?,
        };
        match message {
            Message::Text(text) => {
                return match EnginePacket::decode(&text)? {
                    EnginePacket::Open(handshake) => Ok(handshake),
                    other => Err(ChatlineError::protocol_error(format!(
                        "expected open packet, got {:?}",
                        other
                    ))),
                };
            }
            Message::Close(_) => {
                return Err(ChatlineError::transport_error(
                    "connection closed during handshake",
                ))
            }
            _ => continue,
        }
    }
}

fn interpret_frame(
    text: &str,
    namespace: &str,
    events: &mpsc::UnboundedSender<TransportEvent>,
    connected: &AtomicBool,
) -> ChatlineResult<FrameAction> {
    let packet = match EnginePacket::decode(text) {
        Ok(packet) => packet,
        Err(e) => {
            warn!("dropping malformed frame {:?}: {}", text, e);
            return Ok(FrameAction::Nothing);
        }
    };

    let body = match packet {
        EnginePacket::Ping(data) => return Ok(FrameAction::Reply(EnginePacket::Pong(data).encode()?)),
        EnginePacket::Close => {
            return Ok(FrameAction::End(SessionEnd::ClosedByServer(
                "server closed the session".to_string(),
            )))
        }
        EnginePacket::Message(body) => body,
        _ => return Ok(FrameAction::Nothing),
    };

    let packet = match SocketPacket::decode(&body) {
        Ok(packet) => packet,
        Err(e) => {
            warn!("dropping malformed packet {:?}: {}", body, e);
            return Ok(FrameAction::Nothing);
        }
    };
    if packet.namespace() != namespace {
        debug!("ignoring packet for namespace {}", packet.namespace());
        return Ok(FrameAction::Nothing);
    }

    match packet {
        SocketPacket::Connect { data, .. } => {
            let sid = data
                .as_ref()
                .and_then(|d| d.get("sid"))
                .and_then(Value::as_str)
                .map(str::to_string);
            connected.store(true, Ordering::SeqCst);
            info!("socket connected (sid {:?})", sid);
            let _ = events.send(TransportEvent::Connected { sid });
            Ok(FrameAction::Connected)
        }
        SocketPacket::Disconnect { .. } => Ok(FrameAction::End(SessionEnd::ClosedByServer(
            "server disconnected the socket".to_string(),
        ))),
        SocketPacket::ConnectError { data, .. } => Err(ChatlineError::transport_error(format!(
            "connection refused: {}",
            data
        ))),
        SocketPacket::Event { .. } => {
            if let Some(reply) = bot_reply_from(&packet) {
                let _ = events.send(TransportEvent::BotResponse(reply));
            }
            Ok(FrameAction::Nothing)
        }
        SocketPacket::Ack { .. } => Ok(FrameAction::Nothing),
    }
}

fn bot_reply_from(packet: &SocketPacket) -> Option<BotReply> {
    let (name, args) = packet.event_parts()?;
    if name != BOT_RESPONSE_EVENT {
        debug!("ignoring event '{}'", name);
        return None;
    }
    match args.first() {
        Some(Value::String(text)) => Some(BotReply {
            text: text.clone(),
            aux: args.get(1).filter(|v| !v.is_null()).cloned(),
        }),
        other => {
            warn!("{} without text payload: {:?}", BOT_RESPONSE_EVENT, other);
            None
        }
    }
}
