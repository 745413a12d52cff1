use super::keepalive::Keepalive;
use super::router::{EventHandler, EventRouter, HandlerId};
use super::state::ConnectionState;
use super::subscriptions::SubscriptionManager;
use crate::core::config::StreamConfig;
use crate::core::errors::{ExchangeError, SubscriptionError};
use crate::core::kernel::{ReconnectBackoff, Signer, WsSession};
use crate::exchanges::coindcx::channels::Channel;
use crate::exchanges::coindcx::codec::{HandshakeInfo, SocketIoCodec, SocketIoFrame};
use crate::exchanges::coindcx::events::StreamEvent;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, instrument, trace, warn, Instrument};

/// Requests from handles (and the keepalive timer) to the stream actor.
pub(crate) enum Command {
    Subscribe {
        channel: Channel,
        reply: oneshot::Sender<Result<(), ExchangeError>>,
    },
    Unsubscribe {
        channel: Channel,
        reply: oneshot::Sender<Result<(), ExchangeError>>,
    },
    Register {
        event: StreamEvent,
        handler: EventHandler,
        reply: oneshot::Sender<HandlerId>,
    },
    Unregister {
        id: HandlerId,
        reply: oneshot::Sender<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<Channel>>,
    },
    Ping,
}

/// Everything the actor owns while it runs; handed back on shutdown so a
/// later `connect` resumes with the same subscriptions and handlers.
struct Parts<S> {
    session: S,
    subscriptions: SubscriptionManager,
    router: EventRouter,
}

enum Runtime<S> {
    Idle(Parts<S>),
    Running {
        commands: mpsc::Sender<Command>,
        cancel: CancellationToken,
        task: JoinHandle<Parts<S>>,
    },
    /// The actor task died and took the session with it.
    Poisoned,
}

fn not_connected(channel: &Channel) -> ExchangeError {
    SubscriptionError::NotConnected {
        channel: channel.to_string(),
    }
    .into()
}

// Commands answered without touching the socket; joins and leaves are refused.
fn handle_local(command: Command, subscriptions: &SubscriptionManager, router: &mut EventRouter) {
    match command {
        Command::Subscribe { channel, reply } | Command::Unsubscribe { channel, reply } => {
            let _ = reply.send(Err(not_connected(&channel)));
        }
        Command::Register {
            event,
            handler,
            reply,
        } => {
            let _ = reply.send(router.register_boxed(event, handler));
        }
        Command::Unregister { id, reply } => {
            let _ = reply.send(router.unregister(id));
        }
        Command::Snapshot { reply } => {
            let _ = reply.send(subscriptions.channels());
        }
        Command::Ping => trace!("no connection, dropping keepalive ping"),
    }
}

async fn request<T>(
    commands: mpsc::Sender<Command>,
    build: impl FnOnce(oneshot::Sender<T>) -> Command,
) -> Result<T, ExchangeError> {
    let (reply, response) = oneshot::channel();
    commands
        .send(build(reply))
        .await
        .map_err(|_| SubscriptionError::Stopped)?;
    response
        .await
        .map_err(|_| SubscriptionError::Stopped.into())
}

/// Owns one realtime connection and keeps it alive.
///
/// `connect` starts a background actor that performs the Socket.IO
/// handshake, re-joins every subscribed channel, pings on a fixed interval,
/// routes inbound events to registered handlers, and reconnects with
/// exponential backoff whenever the link drops. The handle is cheap to share
/// behind an `Arc`; every method takes `&self`.
pub struct ConnectionSupervisor<S>
where
    S: WsSession<SocketIoCodec> + 'static,
{
    config: StreamConfig,
    state: Arc<watch::Sender<ConnectionState>>,
    runtime: Mutex<Runtime<S>>,
}

impl<S> fmt::Debug for ConnectionSupervisor<S>
where
    S: WsSession<SocketIoCodec> + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSupervisor")
            .field("url", &self.config.url)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl<S> ConnectionSupervisor<S>
where
    S: WsSession<SocketIoCodec> + 'static,
{
    pub fn new(session: S, signer: Arc<dyn Signer>, config: StreamConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let parts = Parts {
            session,
            subscriptions: SubscriptionManager::new(signer),
            router: EventRouter::new(),
        };

        Self {
            config,
            state: Arc::new(state),
            runtime: Mutex::new(Runtime::Idle(parts)),
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Start the connection loop. Returns once the actor is running; use
    /// [`wait_for`](Self::wait_for) to block until the link is up. Calling
    /// it while already running does nothing.
    #[instrument(skip(self), fields(url = %self.config.url))]
    pub async fn connect(&self) -> Result<(), ExchangeError> {
        let mut runtime = self.runtime.lock().await;
        match std::mem::replace(&mut *runtime, Runtime::Poisoned) {
            Runtime::Idle(parts) => {
                let (tx, rx) = mpsc::channel(self.config.command_buffer.max(1));
                let cancel = CancellationToken::new();
                let actor = StreamActor {
                    config: self.config.clone(),
                    parts,
                    commands: rx,
                    outbox: tx.clone(),
                    cancel: cancel.clone(),
                    state: Arc::clone(&self.state),
                };

                let span = info_span!("coindcx_stream", url = %self.config.url);
                let task = tokio::spawn(actor.run().instrument(span));
                *runtime = Runtime::Running {
                    commands: tx,
                    cancel,
                    task,
                };
                info!("stream supervisor started");
                Ok(())
            }
            running @ Runtime::Running { .. } => {
                *runtime = running;
                debug!("stream supervisor already running");
                Ok(())
            }
            Runtime::Poisoned => Err(ExchangeError::TransportError(
                "stream session was lost when the supervisor task failed".to_string(),
            )),
        }
    }

    /// Stop the connection loop and wait for it to exit. Cancels any pending
    /// reconnect delay and the keepalive timer. Idempotent.
    #[instrument(skip(self), fields(url = %self.config.url))]
    pub async fn disconnect(&self) -> Result<(), ExchangeError> {
        let mut runtime = self.runtime.lock().await;
        match std::mem::replace(&mut *runtime, Runtime::Poisoned) {
            Runtime::Running {
                commands,
                cancel,
                task,
            } => {
                drop(commands);
                cancel.cancel();
                match task.await {
                    Ok(parts) => {
                        *runtime = Runtime::Idle(parts);
                        info!("stream supervisor stopped");
                        Ok(())
                    }
                    Err(e) => {
                        error!(error = %e, "stream task failed");
                        self.state.send_replace(ConnectionState::Disconnected);
                        Err(ExchangeError::TransportError(format!(
                            "stream task failed: {}",
                            e
                        )))
                    }
                }
            }
            other => {
                *runtime = other;
                Ok(())
            }
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Resolve once the connection reaches `target`.
    pub async fn wait_for(&self, target: ConnectionState) -> Result<(), ExchangeError> {
        let mut changes = self.state.subscribe();
        changes
            .wait_for(|state| *state == target)
            .await
            .map(|_| ())
            .map_err(|_| SubscriptionError::Stopped.into())
    }

    async fn running_sender(&self) -> Option<mpsc::Sender<Command>> {
        match &*self.runtime.lock().await {
            Runtime::Running { commands, .. } => Some(commands.clone()),
            _ => None,
        }
    }

    /// Join `channel`. Fails with `NotConnected` unless the stream is
    /// currently connected; the subscription set is then left unchanged.
    pub async fn subscribe(&self, channel: impl Into<Channel>) -> Result<(), ExchangeError> {
        let channel = channel.into();
        let commands = match self.running_sender().await {
            Some(commands) if self.state().is_connected() => commands,
            _ => return Err(not_connected(&channel)),
        };
        request(commands, |reply| Command::Subscribe { channel, reply }).await?
    }

    /// Leave `channel`. Leaving a channel that was never joined is a no-op.
    ///
    /// The authenticated `coindcx` channel is re-joined on every (re)connect,
    /// so leaving it only lasts until the next connection.
    pub async fn unsubscribe(&self, channel: impl Into<Channel>) -> Result<(), ExchangeError> {
        let channel = channel.into();
        let commands = match self.running_sender().await {
            Some(commands) if self.state().is_connected() => commands,
            _ => return Err(not_connected(&channel)),
        };
        request(commands, |reply| Command::Unsubscribe { channel, reply }).await?
    }

    /// Channels currently in the subscription set. Once a connection has
    /// been established this includes the authenticated `coindcx` channel.
    pub async fn active_channels(&self) -> Result<Vec<Channel>, ExchangeError> {
        let commands = {
            let runtime = self.runtime.lock().await;
            match &*runtime {
                Runtime::Idle(parts) => return Ok(parts.subscriptions.channels()),
                Runtime::Running { commands, .. } => commands.clone(),
                Runtime::Poisoned => return Err(SubscriptionError::Stopped.into()),
            }
        };
        request(commands, |reply| Command::Snapshot { reply }).await
    }

    /// Add a handler for `event`. Works in any connection state.
    pub async fn register<F>(&self, event: StreamEvent, handler: F) -> Result<HandlerId, ExchangeError>
    where
        F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let handler: EventHandler = Box::new(handler);
        let commands = {
            let mut runtime = self.runtime.lock().await;
            match &mut *runtime {
                Runtime::Idle(parts) => return Ok(parts.router.register_boxed(event, handler)),
                Runtime::Running { commands, .. } => commands.clone(),
                Runtime::Poisoned => return Err(SubscriptionError::Stopped.into()),
            }
        };
        request(commands, |reply| Command::Register {
            event,
            handler,
            reply,
        })
        .await
    }

    pub async fn unregister(&self, id: HandlerId) -> Result<bool, ExchangeError> {
        let commands = {
            let mut runtime = self.runtime.lock().await;
            match &mut *runtime {
                Runtime::Idle(parts) => return Ok(parts.router.unregister(id)),
                Runtime::Running { commands, .. } => commands.clone(),
                Runtime::Poisoned => return Err(SubscriptionError::Stopped.into()),
            }
        };
        request(commands, |reply| Command::Unregister { id, reply }).await
    }
}

impl<S> Drop for ConnectionSupervisor<S>
where
    S: WsSession<SocketIoCodec> + 'static,
{
    fn drop(&mut self) {
        if let Runtime::Running { cancel, .. } = self.runtime.get_mut() {
            cancel.cancel();
        }
    }
}

enum Handshake {
    Ready(HandshakeInfo),
    Failed(ExchangeError),
    Cancelled,
}

enum Exit {
    Lost(ExchangeError),
    Cancelled,
}

/// Engine.IO open, namespace connect, namespace ack.
async fn open_namespace<S>(session: &mut S) -> Result<HandshakeInfo, ExchangeError>
where
    S: WsSession<SocketIoCodec>,
{
    session.connect().await?;

    let mut handshake = None;
    loop {
        match session.next_message().await {
            Some(Ok(SocketIoFrame::Open(info))) => {
                debug!(sid = %info.sid, ping_interval = info.ping_interval, "engine open");
                let connect = session.codec().encode_connect();
                session.send_raw(connect).await?;
                handshake = Some(info);
            }
            Some(Ok(SocketIoFrame::Connected)) => return Ok(handshake.unwrap_or_default()),
            Some(Ok(SocketIoFrame::ConnectError(message))) => {
                return Err(ExchangeError::AuthError(format!(
                    "namespace connect rejected: {}",
                    message
                )))
            }
            Some(Ok(SocketIoFrame::Ping)) => {
                let pong = session.codec().encode_pong();
                session.send_raw(pong).await?;
            }
            Some(Ok(SocketIoFrame::Close | SocketIoFrame::Disconnected)) => {
                return Err(ExchangeError::TransportError(
                    "connection closed during handshake".to_string(),
                ))
            }
            Some(Ok(other)) => trace!(frame = ?other, "ignoring frame before namespace ack"),
            Some(Err(e)) => return Err(e),
            None => {
                return Err(ExchangeError::TransportError(
                    "connection ended during handshake".to_string(),
                ))
            }
        }
    }
}

/// Single owner of the session. Every frame sent on the socket goes
/// through this task.
struct StreamActor<S> {
    config: StreamConfig,
    parts: Parts<S>,
    commands: mpsc::Receiver<Command>,
    outbox: mpsc::Sender<Command>,
    cancel: CancellationToken,
    state: Arc<watch::Sender<ConnectionState>>,
}

impl<S> StreamActor<S>
where
    S: WsSession<SocketIoCodec> + 'static,
{
    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "connection state changed");
        }
    }

    async fn run(mut self) -> Parts<S> {
        let mut backoff = ReconnectBackoff::new(self.config.initial_backoff, self.config.max_backoff);

        loop {
            self.set_state(ConnectionState::Connecting);

            match self.establish().await {
                Handshake::Cancelled => break,
                Handshake::Failed(e) => {
                    warn!(error = %e, failures = backoff.attempt() + 1, "stream connect failed");
                }
                Handshake::Ready(info) => {
                    backoff.reset();
                    self.set_state(ConnectionState::Connected);
                    info!(sid = %info.sid, "stream connected");

                    match self.serve(info.liveness_window()).await {
                        Exit::Cancelled => break,
                        Exit::Lost(e) => warn!(error = %e, "stream connection lost"),
                    }
                }
            }

            if let Err(e) = self.parts.session.close().await {
                debug!(error = %e, "closing dead session failed");
            }
            self.set_state(ConnectionState::Reconnecting);

            let delay = backoff.next_delay();
            info!(
                attempt = backoff.attempt(),
                delay_ms = delay.as_millis() as u64,
                "reconnect scheduled"
            );
            if !self.pause(delay).await {
                break;
            }
        }

        if let Err(e) = self.parts.session.close().await {
            debug!(error = %e, "closing session on shutdown failed");
        }
        self.set_state(ConnectionState::Disconnected);
        self.parts
    }

    async fn establish(&mut self) -> Handshake {
        let limit = self.config.handshake_timeout;
        let Parts {
            session,
            subscriptions,
            router,
        } = &mut self.parts;

        let handshake = timeout(limit, open_namespace(session));
        tokio::pin!(handshake);

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Handshake::Cancelled,
                result = &mut handshake => {
                    return match result {
                        Ok(Ok(info)) => Handshake::Ready(info),
                        Ok(Err(e)) => Handshake::Failed(e),
                        Err(_) => Handshake::Failed(ExchangeError::TransportError(format!(
                            "handshake did not complete within {:?}",
                            limit
                        ))),
                    };
                }
                Some(command) = self.commands.recv() => {
                    handle_local(command, subscriptions, router);
                }
            }
        }
    }

    async fn serve(&mut self, window: Duration) -> Exit {
        let restored = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Exit::Cancelled,
            result = self.parts.subscriptions.restore(&mut self.parts.session) => result,
        };
        match restored {
            Ok(joined) => debug!(joined, "channels re-joined"),
            Err(e) => return Exit::Lost(e),
        }

        let keepalive = Keepalive::spawn(
            self.config.keepalive_interval,
            self.outbox.clone(),
            self.cancel.child_token(),
        );
        let exit = self.pump(window).await;
        keepalive.stop().await;
        exit
    }

    async fn pump(&mut self, window: Duration) -> Exit {
        let silence = sleep(window);
        tokio::pin!(silence);

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Exit::Cancelled,
                frame = self.parts.session.next_message() => {
                    silence.as_mut().reset(Instant::now() + window);
                    match frame {
                        Some(Ok(frame)) => {
                            if let Err(e) = self.on_frame(frame).await {
                                return Exit::Lost(e);
                            }
                        }
                        Some(Err(e @ ExchangeError::TransportError(_))) => return Exit::Lost(e),
                        Some(Err(e)) => warn!(error = %e, "dropping undecodable frame"),
                        None => {
                            return Exit::Lost(ExchangeError::TransportError(
                                "stream ended".to_string(),
                            ))
                        }
                    }
                }
                Some(command) = self.commands.recv() => self.on_command(command).await,
                () = &mut silence => {
                    return Exit::Lost(ExchangeError::TransportError(format!(
                        "no frames received for {:?}",
                        window
                    )));
                }
            }
        }
    }

    async fn on_frame(&mut self, frame: SocketIoFrame) -> Result<(), ExchangeError> {
        match frame {
            SocketIoFrame::Event { name, payload } => {
                let handled = self.parts.router.dispatch(&name, &payload);
                trace!(event = %name, handled, "event dispatched");
            }
            SocketIoFrame::Ping => {
                let pong = self.parts.session.codec().encode_pong();
                self.parts.session.send_raw(pong).await?;
            }
            SocketIoFrame::Close | SocketIoFrame::Disconnected => {
                return Err(ExchangeError::TransportError(
                    "server closed the stream".to_string(),
                ));
            }
            SocketIoFrame::ConnectError(message) => {
                return Err(ExchangeError::TransportError(format!(
                    "namespace error: {}",
                    message
                )));
            }
            SocketIoFrame::Open(_) | SocketIoFrame::Connected | SocketIoFrame::Pong => {
                trace!("ignoring control frame");
            }
        }
        Ok(())
    }

    async fn on_command(&mut self, command: Command) {
        let Parts {
            session,
            subscriptions,
            router,
        } = &mut self.parts;

        match command {
            Command::Subscribe { channel, reply } => {
                let _ = reply.send(subscriptions.subscribe(session, channel).await);
            }
            Command::Unsubscribe { channel, reply } => {
                let _ = reply.send(subscriptions.unsubscribe(session, &channel).await);
            }
            Command::Ping => {
                let ping = json!({ "data": "Ping message" });
                if let Err(e) = session.emit("ping", &ping).await {
                    warn!(error = %e, "keepalive ping failed");
                }
            }
            other => handle_local(other, subscriptions, router),
        }
    }

    async fn pause(&mut self, delay: Duration) -> bool {
        let wake = sleep(delay);
        tokio::pin!(wake);

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return false,
                () = &mut wake => return true,
                Some(command) = self.commands.recv() => {
                    handle_local(command, &self.parts.subscriptions, &mut self.parts.router);
                }
            }
        }
    }
}
