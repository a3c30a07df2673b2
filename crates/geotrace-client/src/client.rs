//! The observer client actor and its connection driver.
//!
//! [`ObserverClient::spawn`] starts one driver task that owns the whole
//! connection lifecycle: connect, identify, keepalive, message
//! dispatch, and reconnection with bounded exponential backoff. The
//! public methods talk to the driver over a command channel; status is
//! observed over a `tokio::sync::watch` channel.
//!
//! Timer discipline: the keepalive interval lives inside the
//! connection's `select!` loop, so it is dropped -- and can never fire
//! again -- the moment the connection ends. The backoff sleep races the
//! command channel, so a manual disconnect cancels a pending reconnect
//! before the disconnect call returns. A stale timer outliving the
//! connection it was scheduled for is impossible by construction.

use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use futures::{SinkExt as _, StreamExt as _};

use geotrace_types::{ClientMessage, EntityId, ServerMessage};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::handler::ObserverHandler;
use crate::policy::{ReconnectPolicy, RetryDecision};
use crate::status::{ClientState, ConnectionStatus};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Commands accepted by the driver task.
enum Command {
    /// User-initiated disconnect; acknowledged once all timers are
    /// cancelled and the socket is closed.
    Disconnect(oneshot::Sender<()>),
    /// User-initiated reconnect; clears the manual flag and the retry
    /// counter.
    Reconnect,
    /// Host environment reports the network became reachable.
    NetworkAvailable,
    /// Request one entity's trail over the live connection.
    TrailQuery(EntityId),
}

/// Handle to a running observer client.
///
/// Dropping the handle closes the command channel, which shuts the
/// driver task down.
#[derive(Debug)]
pub struct ObserverClient {
    commands: mpsc::Sender<Command>,
    state_rx: watch::Receiver<ClientState>,
}

impl ObserverClient {
    /// Spawn the driver task and begin connecting to the configured
    /// relay immediately.
    pub fn spawn(config: ClientConfig, handler: impl ObserverHandler) -> Self {
        let (commands, command_rx) = mpsc::channel(16);
        let (state_tx, state_rx) = watch::channel(ClientState::default());

        let driver = Driver {
            config,
            handler: Box::new(handler),
            commands: command_rx,
            state_tx,
        };
        tokio::spawn(driver.run());

        Self { commands, state_rx }
    }

    /// The current client state.
    pub fn state(&self) -> ClientState {
        *self.state_rx.borrow()
    }

    /// A watch receiver for observing state transitions.
    pub fn watch_state(&self) -> watch::Receiver<ClientState> {
        self.state_rx.clone()
    }

    /// Disconnect and suppress automatic reconnects until
    /// [`reconnect`](Self::reconnect) is called.
    ///
    /// Returns after any in-flight reconnect timer and pending
    /// keepalive timer are cancelled and the socket (if open) has been
    /// closed with the clean close code.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        let (ack, done) = oneshot::channel();
        self.commands
            .send(Command::Disconnect(ack))
            .await
            .map_err(|_| ClientError::Stopped)?;
        done.await.map_err(|_| ClientError::Stopped)
    }

    /// Clear the manual-disconnect flag and the retry counter, then
    /// attempt to connect.
    pub async fn reconnect(&self) -> Result<(), ClientError> {
        self.commands
            .send(Command::Reconnect)
            .await
            .map_err(|_| ClientError::Stopped)
    }

    /// Signal that the network became reachable. Triggers one immediate
    /// reconnect attempt when disconnected, not manually disconnected,
    /// and not exhausted; otherwise it is a no-op.
    pub async fn notify_network_available(&self) -> Result<(), ClientError> {
        self.commands
            .send(Command::NetworkAvailable)
            .await
            .map_err(|_| ClientError::Stopped)
    }

    /// Request one entity's full trail over the live connection. The
    /// response arrives via
    /// [`ObserverHandler::on_trail_response`]. Dropped with a log line
    /// when the client is not connected.
    pub async fn query_trail(&self, entity_id: EntityId) -> Result<(), ClientError> {
        self.commands
            .send(Command::TrailQuery(entity_id))
            .await
            .map_err(|_| ClientError::Stopped)
    }
}

/// How a connection (or connection attempt) ended.
enum ConnExit {
    /// The peer closed with the clean close code.
    Clean,
    /// Any other close, error, or silent EOF.
    Abnormal,
    /// The user disconnected; acknowledge after the state settles.
    Manual(oneshot::Sender<()>),
    /// The command channel closed: the handle was dropped.
    HandleDropped,
}

/// The driver task: owns the policy, the handler, and the socket.
struct Driver {
    config: ClientConfig,
    handler: Box<dyn ObserverHandler>,
    commands: mpsc::Receiver<Command>,
    state_tx: watch::Sender<ClientState>,
}

impl Driver {
    async fn run(mut self) {
        let mut policy = ReconnectPolicy::new(
            self.config.backoff_base,
            self.config.backoff_max,
            self.config.max_reconnect_attempts,
        );

        // A target address is configured, so connect on startup.
        let mut next_attempt = Some(std::time::Duration::ZERO);

        loop {
            // Disconnected: wait out the backoff delay (if a retry is
            // scheduled) or wait for a command. The sleep races the
            // command channel so a manual disconnect cancels it.
            self.publish(ConnectionStatus::Disconnected, &policy);
            if let Some(delay) = next_attempt {
                let attempt = tokio::select! {
                    () = tokio::time::sleep(delay) => true,
                    cmd = self.commands.recv() => {
                        match cmd {
                            Some(cmd) => {
                                self.handle_idle_command(cmd, &mut policy, &mut next_attempt);
                                false
                            }
                            None => return,
                        }
                    }
                };
                if !attempt {
                    continue;
                }
            } else {
                match self.commands.recv().await {
                    Some(cmd) => {
                        self.handle_idle_command(cmd, &mut policy, &mut next_attempt);
                        continue;
                    }
                    None => return,
                }
            }

            // Connecting.
            self.publish(ConnectionStatus::Connecting, &policy);
            debug!(url = %self.config.url, "connecting to relay");
            let exit = match connect_async(self.config.url.as_str()).await {
                Ok((socket, _response)) => {
                    info!(url = %self.config.url, "connected to relay");
                    policy.on_open();
                    self.publish(ConnectionStatus::Connected, &policy);
                    self.run_connection(socket).await
                }
                Err(e) => {
                    warn!(url = %self.config.url, error = %e, "connection attempt failed");
                    ConnExit::Abnormal
                }
            };

            next_attempt = match exit {
                ConnExit::Manual(ack) => {
                    policy.manual_disconnect();
                    self.publish(ConnectionStatus::Disconnected, &policy);
                    let _ = ack.send(());
                    None
                }
                ConnExit::Clean => match policy.on_close(true) {
                    RetryDecision::RetryAfter(delay) => Some(delay),
                    RetryDecision::Suppressed | RetryDecision::Exhausted => None,
                },
                ConnExit::Abnormal => match policy.on_close(false) {
                    RetryDecision::RetryAfter(delay) => {
                        debug!(?delay, retries = policy.retries(), "reconnect scheduled");
                        Some(delay)
                    }
                    RetryDecision::Suppressed => None,
                    RetryDecision::Exhausted => {
                        warn!("reconnect attempts exhausted, manual reconnect required");
                        None
                    }
                },
                ConnExit::HandleDropped => return,
            };
        }
    }

    /// Handle a command that arrives while no connection is open.
    fn handle_idle_command(
        &mut self,
        cmd: Command,
        policy: &mut ReconnectPolicy,
        next_attempt: &mut Option<std::time::Duration>,
    ) {
        match cmd {
            Command::Disconnect(ack) => {
                // Cancels any pending reconnect deterministically: the
                // sleep future was dropped when this command won the
                // select, and no new one is armed.
                policy.manual_disconnect();
                *next_attempt = None;
                self.publish(ConnectionStatus::Disconnected, policy);
                let _ = ack.send(());
            }
            Command::Reconnect => {
                policy.manual_reconnect();
                *next_attempt = Some(std::time::Duration::ZERO);
            }
            Command::NetworkAvailable => {
                if policy.allows_network_retry() {
                    debug!("network reachable, attempting immediate reconnect");
                    *next_attempt = Some(std::time::Duration::ZERO);
                }
            }
            Command::TrailQuery(entity_id) => {
                debug!(entity = %entity_id, "trail query dropped: not connected");
            }
        }
    }

    /// Run one open connection to completion: identify, keepalive,
    /// dispatch inbound messages, forward commands.
    async fn run_connection(&mut self, mut socket: WsStream) -> ConnExit {
        // Identify first.
        if send_client_message(
            &mut socket,
            &ClientMessage::Hello {
                client_id: self.config.client_id.clone(),
            },
        )
        .await
        .is_err()
        {
            return ConnExit::Abnormal;
        }

        // Keepalive probes start one interval from now, and die with
        // this loop.
        let start = tokio::time::Instant::now() + self.config.keepalive_interval;
        let mut keepalive = tokio::time::interval_at(start, self.config.keepalive_interval);

        loop {
            tokio::select! {
                _ = keepalive.tick() => {
                    if send_client_message(&mut socket, &ClientMessage::KeepaliveProbe)
                        .await
                        .is_err()
                    {
                        warn!("keepalive probe failed, connection lost");
                        return ConnExit::Abnormal;
                    }
                }
                incoming = socket.next() => {
                    match incoming {
                        Some(Ok(Message::Text(text))) => {
                            self.dispatch(text.as_str());
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if socket.send(Message::Pong(data)).await.is_err() {
                                return ConnExit::Abnormal;
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let clean = frame
                                .as_ref()
                                .is_some_and(|f| f.code == CloseCode::Normal);
                            debug!(clean, "relay closed the connection");
                            return if clean { ConnExit::Clean } else { ConnExit::Abnormal };
                        }
                        Some(Ok(_)) => {
                            // Ignore binary and pong frames.
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "connection error");
                            return ConnExit::Abnormal;
                        }
                        None => {
                            debug!("connection ended without close frame");
                            return ConnExit::Abnormal;
                        }
                    }
                }
                cmd = self.commands.recv() => {
                    match cmd {
                        Some(Command::Disconnect(ack)) => {
                            let frame = CloseFrame {
                                code: CloseCode::Normal,
                                reason: "client disconnect".into(),
                            };
                            let _ = socket.close(Some(frame)).await;
                            return ConnExit::Manual(ack);
                        }
                        Some(Command::TrailQuery(entity_id)) => {
                            let query = ClientMessage::TrailQuery { entity_id };
                            if send_client_message(&mut socket, &query).await.is_err() {
                                return ConnExit::Abnormal;
                            }
                        }
                        Some(Command::Reconnect | Command::NetworkAvailable) => {
                            // Already connected; nothing to do.
                        }
                        None => {
                            let frame = CloseFrame {
                                code: CloseCode::Normal,
                                reason: "client dropped".into(),
                            };
                            let _ = socket.close(Some(frame)).await;
                            return ConnExit::HandleDropped;
                        }
                    }
                }
            }
        }
    }

    /// Route one inbound text frame by message kind. Unrecognized kinds
    /// are logged and ignored, never fatal.
    fn dispatch(&mut self, text: &str) {
        match serde_json::from_str::<ServerMessage>(text) {
            Ok(ServerMessage::Snapshot { entities }) => {
                debug!(entities = entities.len(), "snapshot received");
                self.handler.on_snapshot(entities);
            }
            Ok(ServerMessage::Update { event }) => {
                self.handler.on_update(event);
            }
            Ok(ServerMessage::KeepaliveAck) => {
                self.handler.on_keepalive_ack();
            }
            Ok(ServerMessage::TrailResponse { entity_id, trail }) => {
                self.handler.on_trail_response(entity_id, trail);
            }
            Err(e) => {
                warn!(error = %e, "unrecognized relay message ignored");
            }
        }
    }

    /// Publish the current state over the watch channel.
    fn publish(&self, status: ConnectionStatus, policy: &ReconnectPolicy) {
        let _ = self.state_tx.send(ClientState {
            status,
            retries: policy.retries(),
            exhausted: policy.is_exhausted(),
        });
    }
}

/// Serialize and send one client message as a text frame.
async fn send_client_message(
    socket: &mut WsStream,
    message: &ClientMessage,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            warn!("failed to serialize client message: {e}");
            return Ok(());
        }
    };
    socket.send(Message::text(json)).await
}
