use crate::error::{BridgeError, Result};
use crate::types::{FieldValue, LinkStatus};
use tokio::sync::broadcast;

/// Notification sent to UI collaborators
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateUpdate {
    /// A field changed, identified by its stable key (e.g. `seat_12_mic_gain`)
    FieldChanged {
        key: String,
        value: FieldValue,
        /// Rendered in the configured value format
        display: String,
    },

    /// Seat selection labels must be rebuilt (a seat name or the seat range changed)
    SeatLabelsChanged,

    /// Connection status changed
    Status(LinkStatus),
}

impl StateUpdate {
    pub(crate) fn field(key: String, value: FieldValue, display: String) -> Self {
        StateUpdate::FieldChanged { key, value, display }
    }
}

/// Stream of [`StateUpdate`]s from one client
///
/// Each subscriber sees every update published after it subscribed, in
/// order. A subscriber that falls behind by more than the client's buffer
/// loses the oldest updates: the next call reports how many were skipped as
/// [`BridgeError::ChannelError`], and later calls resume with the oldest update
/// still buffered. Field values are not replayed, so after a lag re-read the
/// entities you display through the client queries.
pub struct StateReceiver {
    rx: broadcast::Receiver<StateUpdate>,
}

impl StateReceiver {
    pub(crate) fn new(rx: broadcast::Receiver<StateUpdate>) -> Self {
        Self { rx }
    }

    /// Wait for the next update
    ///
    /// Returns [`BridgeError::ConnectionClosed`] once every client handle has
    /// been dropped and the connection task has stopped.
    pub async fn recv(&mut self) -> Result<StateUpdate> {
        self.rx.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => BridgeError::ConnectionClosed,
            broadcast::error::RecvError::Lagged(skipped) => lagged(skipped),
        })
    }

    /// Take the next buffered update, or `None` if nothing is pending
    pub fn try_recv(&mut self) -> Result<Option<StateUpdate>> {
        match self.rx.try_recv() {
            Ok(update) => Ok(Some(update)),
            Err(broadcast::error::TryRecvError::Empty) => Ok(None),
            Err(broadcast::error::TryRecvError::Closed) => Err(BridgeError::ConnectionClosed),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => Err(lagged(skipped)),
        }
    }
}

fn lagged(skipped: u64) -> BridgeError {
    BridgeError::ChannelError(format!("Subscriber fell behind, {} updates skipped", skipped))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(n: u16) -> StateUpdate {
        StateUpdate::field(format!("seat_{}_mic_status", n), FieldValue::Text("ON".into()), "On".into())
    }

    #[test]
    fn lagging_subscriber_skips_to_oldest_buffered() {
        let (tx, rx) = broadcast::channel(2);
        let mut updates = StateReceiver::new(rx);
        for n in 1..=4 {
            tx.send(status(n)).unwrap();
        }

        match updates.try_recv() {
            Err(BridgeError::ChannelError(msg)) => assert!(msg.contains("2 updates skipped")),
            other => panic!("expected lag error, got {:?}", other),
        }
        assert_eq!(updates.try_recv().unwrap(), Some(status(3)));
        assert_eq!(updates.try_recv().unwrap(), Some(status(4)));
        assert_eq!(updates.try_recv().unwrap(), None);
    }

    #[tokio::test]
    async fn closed_once_every_sender_is_gone() {
        let (tx, rx) = broadcast::channel(4);
        let mut updates = StateReceiver::new(rx);
        tx.send(StateUpdate::SeatLabelsChanged).unwrap();
        drop(tx);

        assert_eq!(updates.recv().await.unwrap(), StateUpdate::SeatLabelsChanged);
        assert!(matches!(updates.recv().await, Err(BridgeError::ConnectionClosed)));
    }
}
