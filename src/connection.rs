//! Connection lifecycle for one receiver.
//!
//! A single task owns the socket, both timers and the session state. Socket
//! reads, timer expiry and client commands all arrive as [`Input`]s and are
//! handled one at a time by [`ConnectionManager::dispatch`], so the device
//! state is never touched concurrently.
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> (watchdog expiry) -> Connecting ...
//! ```
//!
//! Transport errors only change the reported status. Recovery is driven by the
//! watchdog: every `AUDIO_METER_RATE` report (the heartbeat answer) pushes it
//! back, and when it expires the link is torn down and a new one started.

use crate::commands;
use crate::config::BridgeConfig;
use crate::framing::FrameDecoder;
use crate::protocol::{batch, Directive, Inbound};
use crate::session::Session;
use crate::state::{FixedChannel, Receiver, Seat};
use crate::store::DeviceState;
use crate::subscription::StateUpdate;
use crate::types::{ChannelId, ConnectionState, LinkStatus, SeatChoice, SeatId};
use futures_util::StreamExt;
use std::pin::Pin;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, Instant, Interval, MissedTickBehavior, Sleep};
use tokio_util::codec::FramedRead;
use uuid::Uuid;

/// Request from a client handle
pub(crate) enum Command {
    /// Wrapped directive text to write as-is
    Send(String),
    UpdateConfig(BridgeConfig),
    Query(Query),
    Shutdown(oneshot::Sender<()>),
}

/// Read-only request answered from the session state
pub(crate) enum Query {
    Receiver(oneshot::Sender<Receiver>),
    Seat(SeatId, oneshot::Sender<Seat>),
    Channel(ChannelId, oneshot::Sender<FixedChannel>),
    SeatChoices {
        include_all: bool,
        reply: oneshot::Sender<Vec<SeatChoice>>,
    },
    State(oneshot::Sender<ConnectionState>),
}

/// Event reported by a link's background tasks
enum LinkEvent {
    Connected(TcpStream),
    ConnectFailed(std::io::Error),
    Frame(String),
    /// Reader finished; `None` means the receiver closed the socket
    Closed(Option<std::io::Error>),
}

enum Input {
    Command(Command),
    Link { link: Uuid, event: LinkEvent },
    HeartbeatDue,
    WatchdogExpired,
    /// Every client handle was dropped
    ClientGone,
}

/// One connection attempt: its socket tasks and heartbeat timer
///
/// Dropping a link cancels everything it owns.
struct Link {
    id: Uuid,
    writer: Option<mpsc::UnboundedSender<Vec<u8>>>,
    heartbeat: Option<Interval>,
    tasks: Vec<JoinHandle<()>>,
}

impl Link {
    fn new(id: Uuid, connect_task: JoinHandle<()>) -> Self {
        Self {
            id,
            writer: None,
            heartbeat: None,
            tasks: vec![connect_task],
        }
    }

    /// Stop the heartbeat before closing the socket
    fn cancel(&mut self) {
        self.heartbeat = None;
        self.writer = None;
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.cancel();
    }
}

pub(crate) struct ConnectionManager {
    config: BridgeConfig,
    state: ConnectionState,
    link: Option<Link>,
    watchdog: Option<Pin<Box<Sleep>>>,
    session: Option<Session>,
    events_tx: mpsc::UnboundedSender<(Uuid, LinkEvent)>,
    updates: broadcast::Sender<StateUpdate>,
}

impl ConnectionManager {
    /// Spawn the connection task and return its command channel
    pub(crate) fn spawn(
        config: BridgeConfig,
        updates: broadcast::Sender<StateUpdate>,
    ) -> mpsc::UnboundedSender<Command> {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let manager = Self {
            config,
            state: ConnectionState::Disconnected,
            link: None,
            watchdog: None,
            session: None,
            events_tx,
            updates,
        };
        tokio::spawn(manager.run(commands_rx, events_rx));

        commands_tx
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: mpsc::UnboundedReceiver<(Uuid, LinkEvent)>,
    ) {
        self.connect();

        loop {
            let input = tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => Input::Command(command),
                    None => Input::ClientGone,
                },
                Some((link, event)) = events.recv() => Input::Link { link, event },
                _ = heartbeat_due(&mut self.link) => Input::HeartbeatDue,
                _ = watchdog_expired(&mut self.watchdog) => Input::WatchdogExpired,
            };

            if !self.dispatch(input) {
                break;
            }
        }

        self.teardown();
        tracing::info!("Connection task stopped");
    }

    /// Handle one input to completion. Returns false when the task should stop.
    fn dispatch(&mut self, input: Input) -> bool {
        match input {
            Input::Command(Command::Send(text)) => self.send_raw(text),
            Input::Command(Command::UpdateConfig(config)) => self.update_config(config),
            Input::Command(Command::Query(query)) => self.answer(query),
            Input::Command(Command::Shutdown(reply)) => {
                self.teardown();
                let _ = reply.send(());
                return false;
            }
            Input::ClientGone => return false,
            Input::Link { link, event } => {
                if self.link.as_ref().map(|l| l.id) == Some(link) {
                    self.handle_link_event(event);
                } else {
                    tracing::debug!(%link, "Ignoring event from a previous link");
                }
            }
            Input::HeartbeatDue => self.send_directive(&commands::get_audio_meter_rate()),
            Input::WatchdogExpired => {
                tracing::warn!(
                    "No heartbeat answer within {:?}, reconnecting",
                    self.config.watchdog_timeout()
                );
                self.connect();
            }
        }
        true
    }

    /// Enter `Connecting`: drop any previous link and timers, then open a new socket
    fn connect(&mut self) {
        self.teardown();

        if self.config.host.is_empty() {
            tracing::debug!("No host configured, staying disconnected");
            return;
        }

        let id = Uuid::new_v4();
        let address = self.config.address();
        tracing::info!(link = %id, "Connecting to {}", address);

        let events = self.events_tx.clone();
        let connect_task = tokio::spawn(async move {
            let event = match TcpStream::connect(address.as_str()).await {
                Ok(stream) => LinkEvent::Connected(stream),
                Err(e) => LinkEvent::ConnectFailed(e),
            };
            let _ = events.send((id, event));
        });

        self.link = Some(Link::new(id, connect_task));
        self.watchdog = Some(Box::pin(sleep_until(Instant::now() + self.config.watchdog_timeout())));
        self.set_state(ConnectionState::Connecting);
        self.publish(StateUpdate::Status(LinkStatus::Connecting));
    }

    /// Destroy the socket and both timers. Safe to call repeatedly.
    fn teardown(&mut self) {
        self.watchdog = None;
        if let Some(mut link) = self.link.take() {
            link.cancel();
            tracing::debug!(link = %link.id, "Link torn down");
        }
        self.end_session();
        self.set_state(ConnectionState::Disconnected);
    }

    /// Drop the device state of the current connection, if any
    fn end_session(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::info!(
                session = %session.id(),
                "Session with {} ended after {:?}",
                session.address(),
                session.uptime()
            );
        }
    }

    fn handle_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Connected(stream) => self.on_connected(stream),
            LinkEvent::ConnectFailed(e) => {
                tracing::warn!("Connection to {} failed: {}", self.config.address(), e);
                self.set_state(ConnectionState::Disconnected);
                self.publish(StateUpdate::Status(LinkStatus::ConnectionFailure(e.to_string())));
            }
            LinkEvent::Frame(frame) => self.on_frame(&frame),
            LinkEvent::Closed(error) => {
                let reason = match error {
                    Some(e) => format!("Network error: {}", e),
                    None => "Connection closed by receiver".to_string(),
                };
                tracing::warn!("{}", reason);
                if let Some(link) = self.link.as_mut() {
                    link.heartbeat = None;
                    link.writer = None;
                }
                self.end_session();
                self.set_state(ConnectionState::Disconnected);
                self.publish(StateUpdate::Status(LinkStatus::Disconnected(reason)));
            }
        }
    }

    fn on_connected(&mut self, stream: TcpStream) {
        let Some(link) = self.link.as_mut() else {
            return;
        };
        let id = link.id;
        let (read_half, mut write_half) = stream.into_split();
        let (writer_tx, mut writer_rx) = mpsc::unbounded_channel::<Vec<u8>>();

        let events = self.events_tx.clone();
        let reader = tokio::spawn(async move {
            let mut frames = FramedRead::new(read_half, FrameDecoder::new());
            let error = loop {
                match frames.next().await {
                    Some(Ok(frame)) => {
                        if events.send((id, LinkEvent::Frame(frame))).is_err() {
                            return;
                        }
                    }
                    Some(Err(e)) => break Some(e),
                    None => break None,
                }
            };
            let _ = events.send((id, LinkEvent::Closed(error)));
        });

        let writer = tokio::spawn(async move {
            while let Some(bytes) = writer_rx.recv().await {
                if let Err(e) = write_half.write_all(&bytes).await {
                    tracing::error!("Failed to send to receiver: {}", e);
                    break;
                }
            }
        });

        let period = self.config.heartbeat_interval();
        let mut heartbeat = interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        link.tasks.push(reader);
        link.tasks.push(writer);
        link.writer = Some(writer_tx);
        link.heartbeat = Some(heartbeat);

        self.session = Some(Session::new(id, self.config.address(), self.config.variable_format));
        self.set_state(ConnectionState::Connected);
        self.publish(StateUpdate::Status(LinkStatus::Ok));

        self.send_directive(&commands::get_all());
        if self.config.metering_on {
            for directive in commands::meter_rates(Some(self.config.metering_interval)) {
                self.send_directive(&directive);
            }
        }
        self.reset_watchdog();
    }

    fn on_frame(&mut self, frame: &str) {
        tracing::debug!("Received: {}", frame.trim());

        match Inbound::parse(frame) {
            Some(Inbound::Report(report)) => {
                if report.is_heartbeat() {
                    self.reset_watchdog();
                }
                let updates = match self.session.as_mut() {
                    Some(session) => session.apply(&report),
                    None => Vec::new(),
                };
                for update in updates {
                    self.publish(update);
                }
            }
            Some(Inbound::AudioSample) => {}
            Some(Inbound::Other(class)) => tracing::debug!("Ignoring {} frame", class),
            None => tracing::debug!("Dropping malformed frame: {}", frame.trim()),
        }
    }

    fn reset_watchdog(&mut self) {
        let deadline = Instant::now() + self.config.watchdog_timeout();
        match self.watchdog.as_mut() {
            Some(watchdog) => watchdog.as_mut().reset(deadline),
            None => self.watchdog = Some(Box::pin(sleep_until(deadline))),
        }
    }

    fn update_config(&mut self, config: BridgeConfig) {
        let reconnect = config.host != self.config.host
            || config.port != self.config.port
            || self.link.is_none();
        let metering_changed = config.metering_on != self.config.metering_on
            || config.metering_interval != self.config.metering_interval;
        let range_changed = config.range != self.config.range;

        self.config = config;
        if let Some(session) = self.session.as_mut() {
            session.state_mut().set_format(self.config.variable_format);
        }
        if range_changed {
            self.publish(StateUpdate::SeatLabelsChanged);
        }

        if reconnect {
            tracing::info!("Receiver address changed, reconnecting");
            self.connect();
        } else if metering_changed {
            let interval = self.config.metering_on.then_some(self.config.metering_interval);
            self.send_raw(batch(&commands::meter_rates(interval)));
        }
    }

    fn answer(&mut self, query: Query) {
        match query {
            Query::Receiver(reply) => {
                let receiver = self
                    .session
                    .as_mut()
                    .map(|s| s.state_mut().receiver().clone())
                    .unwrap_or_default();
                let _ = reply.send(receiver);
            }
            Query::Seat(id, reply) => {
                let seat = self
                    .session
                    .as_mut()
                    .map(|s| s.state_mut().seat(id).clone())
                    .unwrap_or_default();
                let _ = reply.send(seat);
            }
            Query::Channel(channel, reply) => {
                let channel = self
                    .session
                    .as_mut()
                    .map(|s| s.state_mut().channel(channel).clone())
                    .unwrap_or_default();
                let _ = reply.send(channel);
            }
            Query::SeatChoices { include_all, reply } => {
                let choices = match self.session.as_mut() {
                    Some(session) => session.state_mut().seat_choices(&self.config.range, include_all),
                    None => DeviceState::default().seat_choices(&self.config.range, include_all),
                };
                let _ = reply.send(choices);
            }
            Query::State(reply) => {
                let _ = reply.send(self.state);
            }
        }
    }

    fn send_directive(&mut self, directive: &Directive) {
        self.send_raw(directive.encode());
    }

    /// Fire-and-forget write; dropped with a log line when not connected
    fn send_raw(&mut self, text: String) {
        let writer = match self.state {
            ConnectionState::Connected => self.link.as_ref().and_then(|l| l.writer.as_ref()),
            _ => None,
        };
        match writer {
            Some(writer) => {
                tracing::debug!("Sending: {}", text);
                if writer.send(text.into_bytes()).is_err() {
                    tracing::debug!("Writer stopped, send dropped");
                }
            }
            None => tracing::debug!("Socket not connected: {}", text),
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            tracing::debug!("Connection state {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    fn publish(&self, update: StateUpdate) {
        // No subscribers is fine
        let _ = self.updates.send(update);
    }
}

async fn heartbeat_due(link: &mut Option<Link>) {
    match link.as_mut().and_then(|l| l.heartbeat.as_mut()) {
        Some(heartbeat) => {
            heartbeat.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn watchdog_expired(watchdog: &mut Option<Pin<Box<Sleep>>>) {
    match watchdog.as_mut() {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}
