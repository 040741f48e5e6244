use crate::config::BridgeConfig;
use crate::connection::{Command, ConnectionManager, Query};
use crate::error::{BridgeError, Result};
use crate::protocol::{wrap, Directive};
use crate::state::{FixedChannel, Receiver, Seat};
use crate::subscription::{StateReceiver, StateUpdate};
use crate::types::{ChannelId, ConnectionState, SeatChoice, SeatId};
use tokio::sync::{broadcast, mpsc, oneshot};

/// Large enough to absorb the burst of reports that follows `GET ALL`
const UPDATE_CAPACITY: usize = 4096;

/// Client for one Shure MXCW receiver
///
/// The client owns a background task that keeps the TCP session alive,
/// reconnecting whenever the receiver stops answering heartbeats. Handles are
/// cheap to clone; all of them talk to the same task.
#[derive(Clone)]
pub struct MxcwClient {
    commands: mpsc::UnboundedSender<Command>,
    updates: broadcast::Sender<StateUpdate>,
}

impl MxcwClient {
    /// Validate `config` and start the connection task
    ///
    /// Must be called from within a Tokio runtime. The call returns at once;
    /// watch [`StateUpdate::Status`] to see when the receiver is reached.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use mxcw_bridge::{commands, BridgeConfig, MxcwClient};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = MxcwClient::spawn(BridgeConfig::new("192.168.1.50"))?;
    ///     client.send(&commands::mic_gain(12, 4)?)?;
    ///
    ///     let seat = client.seat(12).await?;
    ///     println!("Seat 12 gain: {:?} dB", seat.mic_gain.value());
    ///     Ok(())
    /// }
    /// ```
    pub fn spawn(config: BridgeConfig) -> Result<Self> {
        config.validate()?;
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        let commands = ConnectionManager::spawn(config, updates.clone());
        Ok(Self { commands, updates })
    }

    /// Send a directive (fire and forget)
    ///
    /// Dropped with a debug log while the receiver is not connected.
    pub fn send(&self, directive: &Directive) -> Result<()> {
        self.command(Command::Send(directive.encode()))
    }

    /// Send a raw directive line such as `SET GLOBAL_MUTE ON`
    pub fn send_line(&self, line: &str) -> Result<()> {
        self.command(Command::Send(wrap(line)))
    }

    /// Apply new settings
    ///
    /// A new host or port reconnects; a metering change is sent on the
    /// existing connection.
    pub fn update_config(&self, config: BridgeConfig) -> Result<()> {
        config.validate()?;
        self.command(Command::UpdateConfig(config))
    }

    /// Subscribe to field changes and status updates
    pub fn subscribe(&self) -> StateReceiver {
        StateReceiver::new(self.updates.subscribe())
    }

    pub async fn receiver(&self) -> Result<Receiver> {
        self.query(Query::Receiver).await
    }

    /// Current state of a seat; unknown seats read as all-`Unknown`
    pub async fn seat(&self, id: SeatId) -> Result<Seat> {
        self.query(|reply| Query::Seat(id, reply)).await
    }

    pub async fn channel(&self, channel: ChannelId) -> Result<FixedChannel> {
        self.query(|reply| Query::Channel(channel, reply)).await
    }

    /// Seat selection list for the configured range
    pub async fn seat_choices(&self, include_all: bool) -> Result<Vec<SeatChoice>> {
        self.query(|reply| Query::SeatChoices { include_all, reply }).await
    }

    pub async fn connection_state(&self) -> Result<ConnectionState> {
        self.query(Query::State).await
    }

    /// Close the socket, stop both timers and end the connection task
    ///
    /// Calling this again, or from another handle, is a no-op.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Shutdown(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    fn command(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| BridgeError::ConnectionClosed)
    }

    async fn query<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Query) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.command(Command::Query(make(tx)))?;
        rx.await.map_err(|_| BridgeError::ConnectionClosed)
    }
}
