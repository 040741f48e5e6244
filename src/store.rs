use crate::config::SeatRange;
use crate::protocol::{Report, ReportTarget};
use crate::state::{ChannelField, Entity, FixedChannel, Receiver, Seat, SeatField};
use crate::subscription::StateUpdate;
use crate::types::{ChannelId, ChannelKind, Direction, SeatChoice, SeatId, ValueFormat};
use std::collections::BTreeMap;

/// Last-known state of one receiver and everything attached to it
///
/// Seats and channels are created on first access, so reads never fail and
/// reports for ids nobody asked about are still kept.
#[derive(Debug, Clone, Default)]
pub struct DeviceState {
    receiver: Receiver,
    seats: BTreeMap<SeatId, Seat>,
    channels: BTreeMap<ChannelId, FixedChannel>,
    format: ValueFormat,
}

impl DeviceState {
    pub fn new(format: ValueFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    /// Display format used for notifications from now on
    pub fn set_format(&mut self, format: ValueFormat) {
        self.format = format;
    }

    pub fn format(&self) -> ValueFormat {
        self.format
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    /// The seat entry, created with all-unknown fields if missing
    pub fn seat_entry(&mut self, id: SeatId) -> &mut Seat {
        self.seats.entry(id).or_default()
    }

    /// The channel entry, created with all-unknown fields if missing
    pub fn channel_entry(&mut self, channel: ChannelId) -> &mut FixedChannel {
        self.channels.entry(channel).or_default()
    }

    /// Read a seat, creating it if it has never been seen
    pub fn seat(&mut self, id: SeatId) -> &Seat {
        self.seat_entry(id)
    }

    /// Read a channel, creating it if it has never been seen
    pub fn channel(&mut self, channel: ChannelId) -> &FixedChannel {
        self.channel_entry(channel)
    }

    /// Read a seat without creating it
    pub fn peek_seat(&self, id: SeatId) -> Option<&Seat> {
        self.seats.get(&id)
    }

    pub fn peek_channel(&self, channel: ChannelId) -> Option<&FixedChannel> {
        self.channels.get(&channel)
    }

    /// Seats that exist in the store, in id order
    pub fn seats(&self) -> impl Iterator<Item = (SeatId, &Seat)> {
        self.seats.iter().map(|(id, seat)| (*id, seat))
    }

    pub fn channels(&self) -> impl Iterator<Item = (ChannelId, &FixedChannel)> {
        self.channels.iter().map(|(id, ch)| (*id, ch))
    }

    /// Apply one report and return the notifications it produces
    ///
    /// Unknown keys are dropped with a debug log; nothing here fails.
    pub fn apply(&mut self, report: &Report) -> Vec<StateUpdate> {
        let format = self.format;
        let key = report.key.as_str();
        let value = report.value.as_str();

        match report.target {
            ReportTarget::Receiver => {
                let Some(def) = Receiver::lookup(key) else {
                    return unmodeled(report);
                };
                let (value, display) = self.receiver.slot(def.field).store(value, format);
                vec![StateUpdate::field(def.name.to_string(), value, display)]
            }
            ReportTarget::Seat(id) => {
                let Some(def) = Seat::lookup(key) else {
                    return unmodeled(report);
                };
                let (value, display) = self.seat_entry(id).slot(def.field).store(value, format);
                let mut updates = vec![StateUpdate::field(
                    format!("seat_{}_{}", id, def.name),
                    value,
                    display,
                )];
                if def.field == SeatField::Name {
                    updates.push(StateUpdate::SeatLabelsChanged);
                }
                updates
            }
            ReportTarget::Channel(channel) => {
                let Some(def) = key
                    .strip_prefix(channel.wire_prefix())
                    .and_then(|suffix| suffix.strip_prefix('_'))
                    .and_then(FixedChannel::lookup)
                else {
                    return unmodeled(report);
                };
                if !channel_has_field(channel, def.field) {
                    return unmodeled(report);
                }
                let (value, display) = self.channel_entry(channel).slot(def.field).store(value, format);
                vec![StateUpdate::field(format!("{}_{}", channel, def.name), value, display)]
            }
        }
    }

    /// Seat selection list for the configured range
    ///
    /// Labels embed seat names, so callers rebuild this after a
    /// [`StateUpdate::SeatLabelsChanged`].
    pub fn seat_choices(&self, range: &SeatRange, include_all: bool) -> Vec<SeatChoice> {
        let all = include_all.then(|| SeatChoice {
            id: 0,
            label: "All Seats".to_string(),
        });
        all.into_iter()
            .chain(range.iter().map(|id| SeatChoice {
                id,
                label: match self.peek_seat(id) {
                    Some(seat) => seat.label(id),
                    None => format!("Seat {}", id),
                },
            }))
            .collect()
    }
}

/// Pad exists only on the aux input; AGC only on inputs
fn channel_has_field(channel: ChannelId, field: ChannelField) -> bool {
    match field {
        ChannelField::Pad => channel.kind == ChannelKind::Aux && channel.direction == Direction::Input,
        ChannelField::Agc => channel.direction == Direction::Input,
        ChannelField::Gain | ChannelField::Mute => true,
    }
}

fn unmodeled(report: &Report) -> Vec<StateUpdate> {
    tracing::debug!("Ignoring unmodeled report {:?} {} {}", report.target, report.key, report.value);
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Inbound;
    use crate::types::FieldValue;

    fn feed(state: &mut DeviceState, frame: &str) -> Vec<StateUpdate> {
        match Inbound::parse(frame) {
            Some(Inbound::Report(report)) => state.apply(&report),
            _ => Vec::new(),
        }
    }

    fn field_keys(updates: &[StateUpdate]) -> Vec<String> {
        updates
            .iter()
            .filter_map(|u| match u {
                StateUpdate::FieldChanged { key, .. } => Some(key.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn mic_gain_report() {
        let mut state = DeviceState::default();
        let updates = feed(&mut state, "REP 12 MIC_GAIN 040");
        assert_eq!(state.seat(12).mic_gain.value(), Some(10));
        assert_eq!(
            updates,
            vec![StateUpdate::FieldChanged {
                key: "seat_12_mic_gain".into(),
                value: FieldValue::Number(10),
                display: "+10 dB".into(),
            }]
        );
    }

    #[test]
    fn aux_channel_indexed_by_frame_id() {
        let mut state = DeviceState::default();
        let updates = feed(&mut state, "REP 3 AUX_INPUT_AGC ON");
        let aux3 = ChannelId::new(ChannelKind::Aux, Direction::Input, 3);
        assert!(state.channel(aux3).agc.is("ON"));
        assert!(state.peek_channel(ChannelId::new(ChannelKind::Aux, Direction::Input, 1)).is_none());
        assert_eq!(field_keys(&updates), vec!["aux_input_3_agc"]);
    }

    #[test]
    fn dante_gain_keys() {
        let mut state = DeviceState::new(ValueFormat::Numeric);
        let updates = feed(&mut state, "< REP 2 DANTE_OUTPUT_GAIN 025 ");
        let ch = ChannelId::new(ChannelKind::Dante, Direction::Output, 2);
        assert_eq!(state.channel(ch).gain.value(), Some(-5));
        assert_eq!(
            updates,
            vec![StateUpdate::FieldChanged {
                key: "dante_output_2_gain".into(),
                value: FieldValue::Number(-5),
                display: "-5".into(),
            }]
        );
    }

    #[test]
    fn pad_only_on_aux_input() {
        let mut state = DeviceState::default();
        assert!(feed(&mut state, "REP 1 DANTE_INPUT_PAD ON").is_empty());
        assert!(feed(&mut state, "REP 1 AUX_OUTPUT_AGC ON").is_empty());
        assert_eq!(field_keys(&feed(&mut state, "REP 1 AUX_INPUT_PAD ON")), vec!["aux_input_1_pad"]);
    }

    #[test]
    fn seat_name_regenerates_choices() {
        let mut state = DeviceState::default();
        let updates = feed(&mut state, "REP 5 SEAT_NAME {Conf A}");
        assert!(state.seat(5).name.is("Conf A"));
        assert_eq!(field_keys(&updates), vec!["seat_5_name"]);
        assert_eq!(updates.last(), Some(&StateUpdate::SeatLabelsChanged));

        let range: SeatRange = "4-5".parse().unwrap();
        let choices = state.seat_choices(&range, true);
        let labels: Vec<&str> = choices.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["All Seats", "Seat 4", "Seat 5 (Conf A)"]);
        assert_eq!(choices[0].id, 0);
    }

    #[test]
    fn one_brace_layer_is_removed() {
        let mut state = DeviceState::default();
        feed(&mut state, "REP 5 SEAT_NAME {{x}}");
        assert!(state.seat(5).name.is("{x}"));

        feed(&mut state, "REP DEVICE_ID { MXCW-1 }");
        assert!(state.receiver().device_id.is("MXCW-1"));
    }

    #[test]
    fn receiver_level_seat_name_is_ignored() {
        let mut state = DeviceState::default();
        assert!(feed(&mut state, "REP SEAT_NAME {Conference Room A}").is_empty());
        assert_eq!(state.seats().count(), 0);
    }

    #[test]
    fn unknown_keys_are_dropped() {
        let mut state = DeviceState::default();
        assert!(feed(&mut state, "REP 9 VOTE_RESULT YES").is_empty());
        assert!(feed(&mut state, "REP FIRMWARE_VERSION {1.2.3}").is_empty());
        assert_eq!(state.receiver(), &Receiver::default());
    }

    #[test]
    fn lazy_seat_is_all_unknown() {
        let mut state = DeviceState::default();
        assert!(state.peek_seat(42).is_none());
        assert_eq!(state.seat(42), &Seat::default());
        assert!(state.seat(42).mic_gain.is_unknown());
        assert!(state.seat(42).name.is_unknown());
        assert!(state.peek_seat(42).is_some());
    }

    #[test]
    fn sentinels_twice() {
        let mut state = DeviceState::default();
        for frame in ["REP 8 BATT_CHARGE UNKN", "REP 8 BATT_CHARGE UNKNOWN"] {
            for _ in 0..2 {
                let updates = feed(&mut state, frame);
                assert_eq!(state.seat(8).batt_charge.raw(), 255);
                match &updates[0] {
                    StateUpdate::FieldChanged { value, display, .. } => {
                        assert_eq!(value, &FieldValue::Unknown);
                        assert_eq!(display, "Unknown");
                    }
                    other => panic!("unexpected update {:?}", other),
                }
            }
        }
        feed(&mut state, "REP 8 BATT_RUN_TIME UNKNOWN");
        assert_eq!(state.seat(8).batt_run_time.raw(), 65535);
        feed(&mut state, "REP 8 MIC_STATUS UNKN");
        assert!(state.seat(8).mic_status.is_unknown());
    }

    #[test]
    fn receiver_fields() {
        let mut state = DeviceState::default();
        feed(&mut state, "REP MODEL {SCM820}");
        feed(&mut state, "REP LOUDSPEAKER_VOLUME 036");
        let updates = feed(&mut state, "REP GLOBAL_MUTE ON");
        assert!(state.receiver().model.is("SCM820"));
        assert_eq!(state.receiver().loudspeaker_volume.value(), Some(6));
        assert_eq!(
            updates,
            vec![StateUpdate::FieldChanged {
                key: "global_mute".into(),
                value: FieldValue::Text("ON".into()),
                display: "On".into(),
            }]
        );
    }
}
