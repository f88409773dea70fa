//! Async connection manager.
//!
//! [`Client::run`] owns one connection at a time: it connects, registers,
//! pumps lines through the [`Dispatcher`], drives keepalive and flood
//! control from a single `select!` loop, and reconnects according to the
//! [`ReconnectPolicy`](crate::reconnect::ReconnectPolicy). Other tasks talk
//! to it through a cloneable [`ClientHandle`].

use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, info_span, trace, warn, Instrument};

use crate::chunker::{split_message, ChunkerConfig};
use crate::config::ClientConfig;
use crate::connection::{ConnectionState, Session};
use crate::ctcp;
use crate::dispatch::Dispatcher;
use crate::error::{ClientError, ProtocolError};
use crate::event::{Event, EventBus, EventKind};
use crate::keepalive::{ping_token, Keepalive, KeepaliveAction};
use crate::message::Message;
use crate::reconnect::ConnectionHistory;
use crate::scheduler::WriteScheduler;
use crate::transport::{connector_for, Connect, Transport};
use crate::validation::check_line;

/// Extra lines handled per wakeup before yielding to the runtime.
const DRAIN_BATCH: usize = 3;

/// Upper bound on a loop sleep when no timer is armed.
const IDLE_WAKE: Duration = Duration::from_secs(3600);

fn now() -> std::time::Instant {
    Instant::now().into_std()
}

#[derive(Debug)]
enum Command {
    Raw(String),
    Quit(Option<String>),
}

/// Sends commands to a running [`Client`].
#[derive(Clone, Debug)]
pub struct ClientHandle {
    tx: mpsc::UnboundedSender<Command>,
    chunker: ChunkerConfig,
}

impl ClientHandle {
    /// Queue a raw protocol line (without CRLF). Lines holding NUL, CR or
    /// LF are refused.
    pub fn raw(&self, line: impl Into<String>) -> Result<(), ClientError> {
        let line = line.into();
        check_line(&line)?;
        self.tx
            .send(Command::Raw(line))
            .map_err(|_| ClientError::Closed)
    }

    pub fn send(&self, message: &Message) -> Result<(), ClientError> {
        self.raw(message.to_string())
    }

    /// Send text to a nick or channel, one PRIVMSG per line and chunk.
    /// Both CR and LF start a new line.
    pub fn privmsg(&self, target: &str, text: &str) -> Result<(), ClientError> {
        self.say("PRIVMSG", target, text, self.chunker, str::to_string)
    }

    pub fn notice(&self, target: &str, text: &str) -> Result<(), ClientError> {
        self.say("NOTICE", target, text, self.chunker, str::to_string)
    }

    /// CTCP ACTION (`/me`). Chunks leave room for the CTCP framing.
    pub fn action(&self, target: &str, text: &str) -> Result<(), ClientError> {
        let chunker = ChunkerConfig {
            max_bytes: self
                .chunker
                .max_bytes
                .saturating_sub(ctcp::framing_len("ACTION")),
            ..self.chunker
        };
        self.say("PRIVMSG", target, text, chunker, |chunk| {
            ctcp::encode("ACTION", chunk)
        })
    }

    pub fn ctcp_request(&self, target: &str, kind: &str, args: &str) -> Result<(), ClientError> {
        self.send(&Message::new("PRIVMSG", [target, ctcp::encode(kind, args).as_str()]))
    }

    pub fn join(&self, channel: &str, key: Option<&str>) -> Result<(), ClientError> {
        let mut params = vec![channel];
        params.extend(key);
        self.send(&Message::new("JOIN", params))
    }

    pub fn part(&self, channel: &str, reason: Option<&str>) -> Result<(), ClientError> {
        let mut params = vec![channel];
        params.extend(reason);
        self.send(&Message::new("PART", params))
    }

    pub fn change_nick(&self, nick: &str) -> Result<(), ClientError> {
        self.send(&Message::new("NICK", [nick]))
    }

    /// Leave the network for good; no reconnect follows.
    pub fn quit(&self, message: Option<&str>) -> Result<(), ClientError> {
        self.tx
            .send(Command::Quit(message.map(str::to_string)))
            .map_err(|_| ClientError::Closed)
    }

    fn say<F>(
        &self,
        command: &str,
        target: &str,
        text: &str,
        chunker: ChunkerConfig,
        wrap: F,
    ) -> Result<(), ClientError>
    where
        F: Fn(&str) -> String,
    {
        for line in text.split(['\r', '\n']) {
            if line.is_empty() {
                continue;
            }
            for chunk in split_message(line, &chunker)? {
                self.send(&Message::new(command, [target, wrap(&chunk.text).as_str()]))?;
            }
        }
        Ok(())
    }
}

/// Per-connection state, dropped when the socket closes.
struct Link {
    session: Session,
    transport: Transport,
    scheduler: WriteScheduler,
    keepalive: Keepalive,
    registered_at: Option<std::time::Instant>,
    had_error: bool,
    requested_disconnect: bool,
}

/// What a finished connection leaves behind for the reconnect decision.
#[derive(Debug, Default)]
struct Outcome {
    had_error: bool,
    requested_disconnect: bool,
    registered_for: Option<Duration>,
}

/// An IRC client bound to one server configuration.
pub struct Client {
    config: ClientConfig,
    connector: Arc<dyn Connect>,
    dispatcher: Dispatcher,
    bus: EventBus,
    commands: mpsc::UnboundedReceiver<Command>,
    handle: ClientHandle,
}

impl Client {
    /// A client using the connector `config` describes.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let connector = connector_for(&config)?;
        Ok(Self::with_connector(config, connector))
    }

    /// A client that opens streams through `connector`.
    pub fn with_connector(config: ClientConfig, connector: Arc<dyn Connect>) -> Self {
        let (tx, commands) = mpsc::unbounded_channel();
        let handle = ClientHandle {
            tx,
            chunker: config.chunker_config(),
        };
        Client {
            config,
            connector,
            dispatcher: Dispatcher::new(),
            bus: EventBus::new(),
            commands,
            handle,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn handle(&self) -> ClientHandle {
        self.handle.clone()
    }

    /// Register extra command handlers before running.
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    pub fn on<F>(&mut self, kind: EventKind, listener: F)
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.bus.on(kind, listener);
    }

    pub fn on_all<F>(&mut self, listener: F)
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.bus.on_all(listener);
    }

    /// Receive every event on a channel.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.bus.on_all(move |event| {
            let _ = tx.send(event.clone());
        });
        rx
    }

    fn publish(&mut self, event: Event) {
        self.bus.emit(&event);
    }

    /// Connect and keep reconnecting until told to quit or out of retries.
    /// Ends with [`Event::Close`].
    pub async fn run(mut self) {
        let policy = self.config.reconnect_policy();
        let mut history = ConnectionHistory::default();
        loop {
            let session = Session::new(&self.config);
            let span = info_span!("irc", conn = %session.id);
            let outcome = self.connection(session).instrument(span.clone()).await;

            let next = span.in_scope(|| {
                self.publish(Event::SocketClose {
                    had_error: outcome.had_error,
                });
                history.requested_disconnect = outcome.requested_disconnect;
                history.registered_for = outcome.registered_for;

                let Some(wait) = policy.decide(&history) else {
                    info!(attempts = history.attempts, "giving up");
                    return None;
                };
                history.attempts = policy.next_attempts(&history);
                info!(attempt = history.attempts, ?wait, "reconnecting");
                self.publish(Event::Reconnecting {
                    attempt: history.attempts,
                    wait,
                });
                Some(wait)
            });
            let Some(wait) = next else {
                self.publish(Event::Close);
                return;
            };

            if self.wait_for_reconnect(wait).await {
                self.publish(Event::Close);
                return;
            }
        }
    }

    /// Sleep out the reconnect delay. Returns `true` if a quit arrived.
    async fn wait_for_reconnect(&mut self, wait: Duration) -> bool {
        let deadline = Instant::now() + wait;
        loop {
            tokio::select! {
                _ = sleep_until(deadline) => return false,
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Quit(_)) | None => return true,
                    Some(Command::Raw(line)) => debug!(line = %line, "dropping write while disconnected"),
                },
            }
        }
    }

    async fn connection(&mut self, mut session: Session) -> Outcome {
        session.transition(ConnectionState::Connecting);
        info!(host = %self.config.host, port = self.config.port, tls = self.config.tls, "connecting");
        let transport = match Transport::connect(self.connector.as_ref(), &self.config).await {
            Ok(transport) => transport,
            Err(e) => {
                warn!(error = %e, "connection failed");
                session.transition(ConnectionState::Disconnected);
                return Outcome {
                    had_error: true,
                    ..Outcome::default()
                };
            }
        };
        session.transition(ConnectionState::Connected);
        self.publish(Event::SocketConnected);

        let mut link = Link {
            session,
            transport,
            scheduler: WriteScheduler::new(self.config.lines_per_second()),
            keepalive: Keepalive::new(self.config.ping_interval, self.config.ping_timeout),
            registered_at: None,
            had_error: false,
            requested_disconnect: false,
        };
        link.keepalive.start(now());

        let mut running = true;
        // Output queued while disconnected belongs to no connection.
        while let Ok(cmd) = self.commands.try_recv() {
            match cmd {
                Command::Raw(line) => debug!(line = %line, "dropping write queued while disconnected"),
                Command::Quit(message) => {
                    running = self.on_command(&mut link, Command::Quit(message)).await;
                    break;
                }
            }
        }
        for line in link.session.registration_lines(&self.config) {
            if !running {
                break;
            }
            if !self.write(&mut link, &line).await {
                running = false;
                break;
            }
        }

        while running {
            let now = now();
            let wake = [
                link.scheduler.next_deadline(now),
                link.keepalive.next_deadline(),
            ]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(now + IDLE_WAKE);

            running = tokio::select! {
                read = link.transport.read_line() => self.on_read(&mut link, read).await,
                Some(cmd) = self.commands.recv() => self.on_command(&mut link, cmd).await,
                _ = sleep_until(Instant::from_std(wake)) => self.on_timer(&mut link).await,
            };
        }

        link.keepalive.stop();
        link.scheduler.close();
        link.transport.close(true).await;
        link.session.transition(ConnectionState::Disconnected);
        Outcome {
            had_error: link.had_error,
            requested_disconnect: link.requested_disconnect,
            registered_for: link
                .registered_at
                .map(|at| now().saturating_duration_since(at)),
        }
    }

    async fn on_read(&mut self, link: &mut Link, read: Option<Result<String, ProtocolError>>) -> bool {
        match read {
            Some(Ok(line)) => {
                self.handle_line(link, line);
                for _ in 0..DRAIN_BATCH {
                    match link.transport.read_line().now_or_never() {
                        Some(Some(Ok(line))) => self.handle_line(link, line),
                        Some(Some(Err(e))) => return self.on_read_failure(link, Some(e)).await,
                        Some(None) => return self.on_read_failure(link, None).await,
                        None => break,
                    }
                }
                if !self.flush(link).await {
                    return false;
                }
                tokio::task::yield_now().await;
                true
            }
            Some(Err(e)) => self.on_read_failure(link, Some(e)).await,
            None => self.on_read_failure(link, None).await,
        }
    }

    async fn on_read_failure(&mut self, link: &mut Link, err: Option<ProtocolError>) -> bool {
        match err {
            None => debug!("server closed the connection"),
            Some(ProtocolError::BufferOverflow { limit }) => {
                warn!(limit, "line buffer overflow, dropping connection");
                link.had_error = true;
                self.publish(Event::IrcError {
                    error: "buffer_overflow".to_string(),
                    channel: None,
                    nick: None,
                    reason: format!("more than {} bytes without a line terminator", limit),
                });
            }
            Some(e) => {
                warn!(error = %e, "read failed");
                link.had_error = true;
            }
        }
        link.transport.close(true).await;
        false
    }

    fn handle_line(&mut self, link: &mut Link, line: String) {
        trace!(line = %line, ">>");
        let now = now();
        link.keepalive.on_traffic(now);

        let parsed = line
            .parse::<Message>()
            .map_err(|cause| ProtocolError::InvalidMessage {
                string: line.clone(),
                cause,
            });
        if let Err(e) = &parsed {
            warn!(error = %e, "dropping malformed line");
        }
        self.publish(Event::Raw {
            line,
            from_server: true,
        });
        let Ok(msg) = parsed else {
            return;
        };

        let out = self.dispatcher.dispatch(&mut link.session, &msg);
        if link.registered_at.is_none() && link.session.is_registered() {
            link.registered_at = Some(now);
        }
        for line in out.lines {
            link.scheduler.push(line);
        }
        for event in out.events {
            self.publish(event);
        }
    }

    async fn on_command(&mut self, link: &mut Link, cmd: Command) -> bool {
        match cmd {
            Command::Raw(line) => {
                link.scheduler.push(line);
                self.flush(link).await
            }
            Command::Quit(message) => {
                info!("quitting");
                link.requested_disconnect = true;
                link.scheduler.close();
                let quit = Message::new("QUIT", message).to_string();
                if self.write(link, &quit).await {
                    link.transport.close(false).await;
                }
                false
            }
        }
    }

    async fn on_timer(&mut self, link: &mut Link) -> bool {
        match link.keepalive.poll(now()) {
            KeepaliveAction::SendPing => {
                let ping = Message::new("PING", [ping_token()]).to_string();
                if !self.write(link, &ping).await {
                    return false;
                }
            }
            KeepaliveAction::TimedOut => {
                warn!("ping timeout");
                self.publish(Event::PingTimeout);
                link.scheduler.close();
                self.write(link, "QUIT :Ping timeout").await;
                link.transport.close(true).await;
                return false;
            }
            KeepaliveAction::Idle => {}
        }
        self.flush(link).await
    }

    /// Write every line the scheduler has due.
    async fn flush(&mut self, link: &mut Link) -> bool {
        for line in link.scheduler.poll(now()) {
            if !self.write(link, &line).await {
                return false;
            }
        }
        true
    }

    async fn write(&mut self, link: &mut Link, line: &str) -> bool {
        match link.transport.write_line(line).await {
            Ok(()) => {
                self.publish(Event::Raw {
                    line: line.to_string(),
                    from_server: false,
                });
                true
            }
            Err(e @ ProtocolError::IllegalControlChar { .. }) => {
                warn!(error = %e, line, "refusing to send line");
                true
            }
            Err(e) => {
                warn!(error = %e, "write failed");
                link.had_error = true;
                link.transport.close(true).await;
                false
            }
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("bus", &self.bus)
            .finish()
    }
}
