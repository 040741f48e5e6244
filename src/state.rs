//! Receiver, seat and fixed channel entities and their field tables.
//!
//! Each entity exposes a static table mapping wire keys to fields; the store
//! looks keys up there instead of branching on strings, so every field's
//! conversion can be tested on its own.

use crate::types::{FieldValue, Numeric, NumericSpec, Setting, ValueFormat};

/// Mutable view of one stored field
pub enum Slot<'a> {
    /// Enumerated value (`ON`, `CHAIRMAN`, ...)
    Setting(&'a mut Setting),
    /// Free text; the parser has already removed the `{}` delimiters
    Text(&'a mut Setting),
    Numeric(&'a mut Numeric),
}

impl Slot<'_> {
    /// Convert and store a raw wire value, returning the new value and its display form
    pub fn store(self, raw: &str, format: ValueFormat) -> (FieldValue, String) {
        match self {
            Slot::Setting(setting) => {
                *setting = Setting::from_wire(raw);
                (FieldValue::from(&*setting), setting.readable())
            }
            Slot::Text(text) => {
                *text = Setting::from_wire(raw);
                let display = text.as_str().unwrap_or("Unknown").to_string();
                (FieldValue::from(&*text), display)
            }
            Slot::Numeric(numeric) => {
                numeric.set_wire(raw);
                (FieldValue::from(&*numeric), numeric.render(format))
            }
        }
    }
}

/// One row of an entity's field table
#[derive(Debug, Clone, Copy)]
pub struct FieldDef<F> {
    /// Key as it appears on the wire
    pub wire: &'static str,
    /// Suffix used in change notification keys
    pub name: &'static str,
    pub field: F,
}

/// An entity whose fields are updated from wire reports
pub trait Entity {
    type Field: Copy + 'static;

    /// Every field the entity models
    fn fields() -> &'static [FieldDef<Self::Field>];

    fn slot(&mut self, field: Self::Field) -> Slot<'_>;

    /// Find the table row for a wire key
    fn lookup(wire: &str) -> Option<&'static FieldDef<Self::Field>> {
        Self::fields().iter().find(|def| def.wire == wire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverField {
    AudioInputSpeaklist,
    AudioMeterRate,
    DeviceId,
    Flash,
    GlobalMute,
    InterruptMode,
    LoudspeakerVolume,
    MaxDelegateSpeakers,
    MaxNumRequests,
    MaxTotalSpeakers,
    Model,
    OperationMode,
    RetainSeatPersistence,
    RfMeterRate,
    RfPower,
    WduLockWelcome,
}

/// The access point itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receiver {
    pub audio_input_speaklist: Setting,
    pub audio_meter_rate: Numeric,
    pub device_id: Setting,
    pub flash: Setting,
    pub global_mute: Setting,
    pub interrupt_mode: Setting,
    /// Raw 0-36, -30..+6 dB
    pub loudspeaker_volume: Numeric,
    pub max_delegate_speakers: Numeric,
    pub max_num_requests: Numeric,
    pub max_total_speakers: Numeric,
    pub model: Setting,
    pub operation_mode: Setting,
    pub retain_seat_persistence: Setting,
    pub rf_meter_rate: Numeric,
    pub rf_power: Setting,
    pub wdu_lock_welcome: Setting,
}

impl Default for Receiver {
    fn default() -> Self {
        Self {
            audio_input_speaklist: Setting::Unknown,
            audio_meter_rate: Numeric::unknown(NumericSpec::METER_RATE),
            device_id: Setting::Unknown,
            flash: Setting::Unknown,
            global_mute: Setting::Unknown,
            interrupt_mode: Setting::Unknown,
            loudspeaker_volume: Numeric::unknown(NumericSpec::GAIN),
            max_delegate_speakers: Numeric::unknown(NumericSpec::COUNT),
            max_num_requests: Numeric::unknown(NumericSpec::COUNT),
            max_total_speakers: Numeric::unknown(NumericSpec::COUNT),
            model: Setting::Unknown,
            operation_mode: Setting::Unknown,
            retain_seat_persistence: Setting::Unknown,
            rf_meter_rate: Numeric::unknown(NumericSpec::METER_RATE),
            rf_power: Setting::Unknown,
            wdu_lock_welcome: Setting::Unknown,
        }
    }
}

const RECEIVER_FIELDS: &[FieldDef<ReceiverField>] = &[
    FieldDef { wire: "AUDIO_INPUT_SPEAKLIST", name: "audio_input_speaklist", field: ReceiverField::AudioInputSpeaklist },
    FieldDef { wire: "AUDIO_METER_RATE", name: "audio_meter_rate", field: ReceiverField::AudioMeterRate },
    FieldDef { wire: "DEVICE_ID", name: "device_id", field: ReceiverField::DeviceId },
    FieldDef { wire: "FLASH", name: "flash", field: ReceiverField::Flash },
    FieldDef { wire: "GLOBAL_MUTE", name: "global_mute", field: ReceiverField::GlobalMute },
    FieldDef { wire: "INTERRUPT_MODE", name: "interrupt_mode", field: ReceiverField::InterruptMode },
    FieldDef { wire: "LOUDSPEAKER_VOLUME", name: "loudspeaker_volume", field: ReceiverField::LoudspeakerVolume },
    FieldDef { wire: "MAX_DELEGATE_SPEAKERS", name: "max_delegate_speakers", field: ReceiverField::MaxDelegateSpeakers },
    FieldDef { wire: "MAX_NUM_REQUESTS", name: "max_num_requests", field: ReceiverField::MaxNumRequests },
    FieldDef { wire: "MAX_TOTAL_SPEAKERS", name: "max_total_speakers", field: ReceiverField::MaxTotalSpeakers },
    FieldDef { wire: "MODEL", name: "model", field: ReceiverField::Model },
    FieldDef { wire: "OPERATION_MODE", name: "operation_mode", field: ReceiverField::OperationMode },
    FieldDef { wire: "RETAIN_SEAT_PERSISTENCE", name: "retain_seat_persistence", field: ReceiverField::RetainSeatPersistence },
    FieldDef { wire: "RF_METER_RATE", name: "rf_meter_rate", field: ReceiverField::RfMeterRate },
    FieldDef { wire: "RF_POWER", name: "rf_power", field: ReceiverField::RfPower },
    FieldDef { wire: "WDU_LOCK_WELCOME", name: "wdu_lock_welcome", field: ReceiverField::WduLockWelcome },
];

impl Entity for Receiver {
    type Field = ReceiverField;

    fn fields() -> &'static [FieldDef<ReceiverField>] {
        RECEIVER_FIELDS
    }

    fn slot(&mut self, field: ReceiverField) -> Slot<'_> {
        use ReceiverField as F;
        match field {
            F::AudioInputSpeaklist => Slot::Setting(&mut self.audio_input_speaklist),
            F::AudioMeterRate => Slot::Numeric(&mut self.audio_meter_rate),
            F::DeviceId => Slot::Text(&mut self.device_id),
            F::Flash => Slot::Setting(&mut self.flash),
            F::GlobalMute => Slot::Setting(&mut self.global_mute),
            F::InterruptMode => Slot::Setting(&mut self.interrupt_mode),
            F::LoudspeakerVolume => Slot::Numeric(&mut self.loudspeaker_volume),
            F::MaxDelegateSpeakers => Slot::Numeric(&mut self.max_delegate_speakers),
            F::MaxNumRequests => Slot::Numeric(&mut self.max_num_requests),
            F::MaxTotalSpeakers => Slot::Numeric(&mut self.max_total_speakers),
            F::Model => Slot::Text(&mut self.model),
            F::OperationMode => Slot::Setting(&mut self.operation_mode),
            F::RetainSeatPersistence => Slot::Setting(&mut self.retain_seat_persistence),
            F::RfMeterRate => Slot::Numeric(&mut self.rf_meter_rate),
            F::RfPower => Slot::Setting(&mut self.rf_power),
            F::WduLockWelcome => Slot::Setting(&mut self.wdu_lock_welcome),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatField {
    BattCharge,
    BattCycle,
    BattHealth,
    BattRunTime,
    ExclusiveMute,
    Flash,
    MicAgc,
    MicGain,
    MicPriority,
    MicStatus,
    RequestListStatus,
    Role,
    Rssi,
    Name,
    SpeakListStatus,
    UnitAvailable,
}

/// One wireless conference unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub name: Setting,
    /// Percent, 255 when unknown
    pub batt_charge: Numeric,
    pub batt_cycle: Numeric,
    /// Percent, 255 when unknown
    pub batt_health: Numeric,
    /// Minutes, 65535 when unknown
    pub batt_run_time: Numeric,
    pub exclusive_mute: Setting,
    pub flash: Setting,
    pub mic_agc: Setting,
    /// Raw 0-40, -30..+10 dB
    pub mic_gain: Numeric,
    pub mic_priority: Numeric,
    pub mic_status: Setting,
    pub request_list_status: Setting,
    pub role: Setting,
    pub rssi: Numeric,
    pub speak_list_status: Setting,
    pub unit_available: Setting,
}

impl Default for Seat {
    fn default() -> Self {
        Self {
            name: Setting::Unknown,
            batt_charge: Numeric::unknown(NumericSpec::PERCENT),
            batt_cycle: Numeric::unknown(NumericSpec::CYCLES),
            batt_health: Numeric::unknown(NumericSpec::PERCENT),
            batt_run_time: Numeric::unknown(NumericSpec::RUNTIME),
            exclusive_mute: Setting::Unknown,
            flash: Setting::Unknown,
            mic_agc: Setting::Unknown,
            mic_gain: Numeric::unknown(NumericSpec::GAIN),
            mic_priority: Numeric::unknown(NumericSpec::COUNT),
            mic_status: Setting::Unknown,
            request_list_status: Setting::Unknown,
            role: Setting::Unknown,
            rssi: Numeric::unknown(NumericSpec::RSSI),
            speak_list_status: Setting::Unknown,
            unit_available: Setting::Unknown,
        }
    }
}

impl Seat {
    /// Label for seat selection lists: `Seat 5` or `Seat 5 (Conf A)`
    pub fn label(&self, id: u16) -> String {
        match self.name.as_str() {
            Some(name) if !name.is_empty() => format!("Seat {} ({})", id, name),
            _ => format!("Seat {}", id),
        }
    }
}

const SEAT_FIELDS: &[FieldDef<SeatField>] = &[
    FieldDef { wire: "BATT_CHARGE", name: "batt_charge", field: SeatField::BattCharge },
    FieldDef { wire: "BATT_CYCLE", name: "batt_cycle", field: SeatField::BattCycle },
    FieldDef { wire: "BATT_HEALTH", name: "batt_health", field: SeatField::BattHealth },
    FieldDef { wire: "BATT_RUN_TIME", name: "batt_run_time", field: SeatField::BattRunTime },
    FieldDef { wire: "EXCLUSIVE_MUTE", name: "exclusive_mute", field: SeatField::ExclusiveMute },
    FieldDef { wire: "FLASH", name: "flash", field: SeatField::Flash },
    FieldDef { wire: "MIC_AGC", name: "mic_agc", field: SeatField::MicAgc },
    FieldDef { wire: "MIC_GAIN", name: "mic_gain", field: SeatField::MicGain },
    FieldDef { wire: "MIC_PRIORITY", name: "mic_priority", field: SeatField::MicPriority },
    FieldDef { wire: "MIC_STATUS", name: "mic_status", field: SeatField::MicStatus },
    FieldDef { wire: "REQUEST_LIST_STATUS", name: "request_list_status", field: SeatField::RequestListStatus },
    FieldDef { wire: "ROLE", name: "role", field: SeatField::Role },
    FieldDef { wire: "RSSI", name: "rssi", field: SeatField::Rssi },
    FieldDef { wire: "SEAT_NAME", name: "name", field: SeatField::Name },
    FieldDef { wire: "SPEAK_LIST_STATUS", name: "speak_list_status", field: SeatField::SpeakListStatus },
    FieldDef { wire: "UNIT_AVAILABLE", name: "unit_available", field: SeatField::UnitAvailable },
];

impl Entity for Seat {
    type Field = SeatField;

    fn fields() -> &'static [FieldDef<SeatField>] {
        SEAT_FIELDS
    }

    fn slot(&mut self, field: SeatField) -> Slot<'_> {
        use SeatField as F;
        match field {
            F::BattCharge => Slot::Numeric(&mut self.batt_charge),
            F::BattCycle => Slot::Numeric(&mut self.batt_cycle),
            F::BattHealth => Slot::Numeric(&mut self.batt_health),
            F::BattRunTime => Slot::Numeric(&mut self.batt_run_time),
            F::ExclusiveMute => Slot::Setting(&mut self.exclusive_mute),
            F::Flash => Slot::Setting(&mut self.flash),
            F::MicAgc => Slot::Setting(&mut self.mic_agc),
            F::MicGain => Slot::Numeric(&mut self.mic_gain),
            F::MicPriority => Slot::Numeric(&mut self.mic_priority),
            F::MicStatus => Slot::Setting(&mut self.mic_status),
            F::RequestListStatus => Slot::Setting(&mut self.request_list_status),
            F::Role => Slot::Setting(&mut self.role),
            F::Rssi => Slot::Numeric(&mut self.rssi),
            F::Name => Slot::Text(&mut self.name),
            F::SpeakListStatus => Slot::Setting(&mut self.speak_list_status),
            F::UnitAvailable => Slot::Setting(&mut self.unit_available),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelField {
    Agc,
    Gain,
    Mute,
    Pad,
}

/// Aux or Dante input/output channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedChannel {
    pub agc: Setting,
    /// Raw 0-40 on inputs, 0-30 on outputs
    pub gain: Numeric,
    pub mute: Setting,
    /// Aux input only
    pub pad: Setting,
}

impl Default for FixedChannel {
    fn default() -> Self {
        Self {
            agc: Setting::Unknown,
            gain: Numeric::unknown(NumericSpec::GAIN),
            mute: Setting::Unknown,
            pad: Setting::Unknown,
        }
    }
}

/// Keyed by the suffix after the channel prefix (`DANTE_INPUT_AGC` -> `AGC`)
const CHANNEL_FIELDS: &[FieldDef<ChannelField>] = &[
    FieldDef { wire: "AGC", name: "agc", field: ChannelField::Agc },
    FieldDef { wire: "GAIN", name: "gain", field: ChannelField::Gain },
    FieldDef { wire: "MUTE", name: "mute", field: ChannelField::Mute },
    FieldDef { wire: "PAD", name: "pad", field: ChannelField::Pad },
];

impl Entity for FixedChannel {
    type Field = ChannelField;

    fn fields() -> &'static [FieldDef<ChannelField>] {
        CHANNEL_FIELDS
    }

    fn slot(&mut self, field: ChannelField) -> Slot<'_> {
        match field {
            ChannelField::Agc => Slot::Setting(&mut self.agc),
            ChannelField::Gain => Slot::Numeric(&mut self.gain),
            ChannelField::Mute => Slot::Setting(&mut self.mute),
            ChannelField::Pad => Slot::Setting(&mut self.pad),
        }
    }
}
