use crate::protocol::Report;
use crate::store::DeviceState;
use crate::subscription::StateUpdate;
use crate::types::ValueFormat;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Device state for one live connection
///
/// Created when the socket connects and dropped when the link is torn down,
/// so nothing carries over between connections.
pub(crate) struct Session {
    id: Uuid,
    address: String,
    started: Instant,
    state: DeviceState,
}

impl Session {
    pub(crate) fn new(id: Uuid, address: String, format: ValueFormat) -> Self {
        Self {
            id,
            address,
            started: Instant::now(),
            state: DeviceState::new(format),
        }
    }

    /// Id shared with the link that created this session
    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn address(&self) -> &str {
        &self.address
    }

    pub(crate) fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    pub(crate) fn state_mut(&mut self) -> &mut DeviceState {
        &mut self.state
    }

    pub(crate) fn apply(&mut self, report: &Report) -> Vec<StateUpdate> {
        self.state.apply(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Inbound;

    #[test]
    fn sessions_start_empty() {
        let mut session = Session::new(Uuid::new_v4(), "10.0.0.5:2202".into(), ValueFormat::Units);
        let Some(Inbound::Report(report)) = Inbound::parse("< REP 3 MIC_AGC ON ") else {
            panic!("expected report");
        };
        assert_eq!(session.apply(&report).len(), 1);
        assert!(session.state_mut().seat(3).mic_agc.is("ON"));
        assert_eq!(session.address(), "10.0.0.5:2202");

        let fresh = Session::new(Uuid::new_v4(), "10.0.0.5:2202".into(), ValueFormat::Units);
        assert_ne!(fresh.id(), session.id());
        assert!(fresh.state.peek_seat(3).is_none());
    }
}
