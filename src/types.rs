use serde::{Deserialize, Serialize};
use std::fmt;

/// Seat identifier (1-65535; `0` addresses all seats in directives)
pub type SeatId = u16;

/// Wire sentinels the receiver uses for values it cannot report
const UNKNOWN_SENTINELS: [&str; 2] = ["UNKN", "UNKNOWN"];

/// Returns true if a raw wire value is one of the "unknown" sentinels
pub fn is_unknown_sentinel(raw: &str) -> bool {
    UNKNOWN_SENTINELS.contains(&raw.trim())
}

/// How rendered values are presented to UI collaborators
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueFormat {
    /// Append units (`+10 dB`, `85%`, `5000 ms`)
    #[default]
    Units,
    /// Bare numbers only
    Numeric,
}

/// An enumerated or free-text setting as reported by the receiver
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Setting {
    #[default]
    Unknown,
    Value(String),
}

impl Setting {
    /// Interpret a wire token, normalizing the unknown sentinels
    pub fn from_wire(raw: &str) -> Self {
        let raw = raw.trim();
        if is_unknown_sentinel(raw) {
            Setting::Unknown
        } else {
            Setting::Value(raw.to_string())
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Setting::Unknown)
    }

    /// Raw wire value, if known
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Setting::Unknown => None,
            Setting::Value(v) => Some(v),
        }
    }

    /// Check against a wire token such as `ON`
    pub fn is(&self, wire: &str) -> bool {
        self.as_str() == Some(wire)
    }

    /// Human readable form: `NOT_IN_LIST` becomes `Not In List`
    pub fn readable(&self) -> String {
        match self {
            Setting::Unknown => "Unknown".to_string(),
            Setting::Value(v) => v
                .split('_')
                .filter(|w| !w.is_empty())
                .map(|word| {
                    let lower = word.to_lowercase();
                    let mut chars = lower.chars();
                    match chars.next() {
                        Some(first) => first.to_uppercase().chain(chars).collect(),
                        None => String::new(),
                    }
                })
                .collect::<Vec<String>>()
                .join(" "),
        }
    }
}

/// Unit attached to a numeric field when rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    None,
    Percent,
    Decibel,
    Dbm,
    /// Meter rates; `0` means metering is disabled
    Millis,
    /// Rendered as `h:mm` in unit format
    Minutes,
}

/// Conversion rules for one numeric wire field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericSpec {
    /// Raw code that stands for "unknown" (depends on the field width)
    pub unknown: u32,
    /// Subtracted from the raw value to get the user-facing value
    pub offset: i64,
    pub unit: Unit,
}

impl NumericSpec {
    /// Gain and volume: raw 0-40 maps to -30..+10 dB
    pub const GAIN: NumericSpec = NumericSpec { unknown: 255, offset: 30, unit: Unit::Decibel };
    pub const PERCENT: NumericSpec = NumericSpec { unknown: 255, offset: 0, unit: Unit::Percent };
    pub const CYCLES: NumericSpec = NumericSpec { unknown: 65535, offset: 0, unit: Unit::None };
    pub const RUNTIME: NumericSpec = NumericSpec { unknown: 65535, offset: 0, unit: Unit::Minutes };
    /// Signal strength is reported with a fixed 120 offset
    pub const RSSI: NumericSpec = NumericSpec { unknown: 255, offset: 120, unit: Unit::Dbm };
    pub const COUNT: NumericSpec = NumericSpec { unknown: 255, offset: 0, unit: Unit::None };
    pub const METER_RATE: NumericSpec = NumericSpec { unknown: u32::MAX, offset: 0, unit: Unit::Millis };
}

/// A numeric field held in raw wire units
///
/// Conversion to the user-facing value happens only in [`Numeric::value`],
/// so the offset is applied exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Numeric {
    raw: u32,
    spec: NumericSpec,
}

impl Numeric {
    /// A field that has not been reported yet
    pub const fn unknown(spec: NumericSpec) -> Self {
        Self { raw: spec.unknown, spec }
    }

    /// Store a wire token. Sentinels and unparsable input become the unknown code.
    pub fn set_wire(&mut self, raw: &str) {
        let raw = raw.trim();
        self.raw = if is_unknown_sentinel(raw) {
            self.spec.unknown
        } else {
            raw.parse::<u32>().unwrap_or(self.spec.unknown)
        };
    }

    /// Raw wire value (the unknown code when unknown)
    pub fn raw(&self) -> u32 {
        self.raw
    }

    pub fn spec(&self) -> NumericSpec {
        self.spec
    }

    pub fn is_unknown(&self) -> bool {
        self.raw == self.spec.unknown
    }

    /// User-facing value (`raw - offset`), or `None` when unknown
    pub fn value(&self) -> Option<i64> {
        if self.is_unknown() {
            None
        } else {
            Some(i64::from(self.raw) - self.spec.offset)
        }
    }

    /// Render for display in the requested format
    pub fn render(&self, format: ValueFormat) -> String {
        let Some(value) = self.value() else {
            return "Unknown".to_string();
        };
        match (self.spec.unit, format) {
            (Unit::Millis, _) if value == 0 => "Disabled".to_string(),
            (_, ValueFormat::Numeric) | (Unit::None, _) => value.to_string(),
            (Unit::Percent, ValueFormat::Units) => format!("{}%", value),
            (Unit::Decibel, ValueFormat::Units) => {
                format!("{}{} dB", if value > 0 { "+" } else { "" }, value)
            }
            (Unit::Dbm, ValueFormat::Units) => format!("{} dBm", value),
            (Unit::Millis, ValueFormat::Units) => format!("{} ms", value),
            (Unit::Minutes, ValueFormat::Units) => format!("{}:{:02}", value / 60, value % 60),
        }
    }
}

/// Typed value carried by a change notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    Unknown,
    Text(String),
    Number(i64),
}

impl From<&Setting> for FieldValue {
    fn from(setting: &Setting) -> Self {
        match setting {
            Setting::Unknown => FieldValue::Unknown,
            Setting::Value(v) => FieldValue::Text(v.clone()),
        }
    }
}

impl From<&Numeric> for FieldValue {
    fn from(numeric: &Numeric) -> Self {
        numeric.value().map_or(FieldValue::Unknown, FieldValue::Number)
    }
}

/// Aux or Dante
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Aux,
    Dante,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
}

/// Identifies one fixed audio channel (aux or Dante, input or output)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChannelId {
    pub kind: ChannelKind,
    pub direction: Direction,
    pub id: u16,
}

impl ChannelId {
    pub fn new(kind: ChannelKind, direction: Direction, id: u16) -> Self {
        Self { kind, direction, id }
    }

    /// Wire key prefix, e.g. `DANTE_INPUT`
    pub fn wire_prefix(&self) -> &'static str {
        match (self.kind, self.direction) {
            (ChannelKind::Aux, Direction::Input) => "AUX_INPUT",
            (ChannelKind::Aux, Direction::Output) => "AUX_OUTPUT",
            (ChannelKind::Dante, Direction::Input) => "DANTE_INPUT",
            (ChannelKind::Dante, Direction::Output) => "DANTE_OUTPUT",
        }
    }
}

impl fmt::Display for ChannelId {
    /// Field key prefix, e.g. `dante_input_3`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.wire_prefix().to_lowercase(), self.id)
    }
}

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Status surfaced to UI collaborators
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    /// A connection attempt is in progress
    Connecting,
    /// Connected and synchronizing
    Ok,
    /// The connection attempt failed
    ConnectionFailure(String),
    /// An established connection dropped
    Disconnected(String),
}

/// Entry in a seat selection list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatChoice {
    /// Seat id, `0` for "All Seats"
    pub id: SeatId,
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_normalize_to_unknown() {
        assert_eq!(Setting::from_wire("UNKN"), Setting::Unknown);
        assert_eq!(Setting::from_wire("UNKNOWN"), Setting::Unknown);
        assert_eq!(Setting::from_wire("ON"), Setting::Value("ON".into()));
    }

    #[test]
    fn readable_settings() {
        assert_eq!(Setting::from_wire("NOT_IN_LIST").readable(), "Not In List");
        assert_eq!(Setting::from_wire("ON").readable(), "On");
        assert_eq!(Setting::Unknown.readable(), "Unknown");
    }

    #[test]
    fn numeric_sentinel_is_idempotent() {
        let mut charge = Numeric::unknown(NumericSpec::PERCENT);
        charge.set_wire("085");
        assert_eq!(charge.value(), Some(85));

        for sentinel in ["UNKN", "UNKNOWN", "UNKN", "UNKNOWN"] {
            charge.set_wire(sentinel);
            assert_eq!(charge.raw(), 255);
            assert!(charge.is_unknown());
        }

        let mut cycles = Numeric::unknown(NumericSpec::CYCLES);
        cycles.set_wire("UNKNOWN");
        assert_eq!(cycles.raw(), 65535);
    }

    #[test]
    fn unparsable_numbers_become_unknown() {
        let mut gain = Numeric::unknown(NumericSpec::GAIN);
        gain.set_wire("loud");
        assert!(gain.is_unknown());
        gain.set_wire("-4");
        assert!(gain.is_unknown());
    }

    #[test]
    fn gain_offset_is_applied_on_read() {
        let mut gain = Numeric::unknown(NumericSpec::GAIN);
        gain.set_wire("040");
        assert_eq!(gain.raw(), 40);
        assert_eq!(gain.value(), Some(10));
        assert_eq!(gain.render(ValueFormat::Units), "+10 dB");
        assert_eq!(gain.render(ValueFormat::Numeric), "10");

        gain.set_wire("000");
        assert_eq!(gain.render(ValueFormat::Units), "-30 dB");
        gain.set_wire("030");
        assert_eq!(gain.render(ValueFormat::Units), "0 dB");
    }

    #[test]
    fn render_units() {
        let mut runtime = Numeric::unknown(NumericSpec::RUNTIME);
        runtime.set_wire("65");
        assert_eq!(runtime.render(ValueFormat::Units), "1:05");
        assert_eq!(runtime.render(ValueFormat::Numeric), "65");
        runtime.set_wire("65535");
        assert_eq!(runtime.render(ValueFormat::Units), "Unknown");

        let mut rate = Numeric::unknown(NumericSpec::METER_RATE);
        rate.set_wire("0");
        assert_eq!(rate.render(ValueFormat::Units), "Disabled");
        rate.set_wire("5000");
        assert_eq!(rate.render(ValueFormat::Units), "5000 ms");

        let mut rssi = Numeric::unknown(NumericSpec::RSSI);
        rssi.set_wire("060");
        assert_eq!(rssi.render(ValueFormat::Units), "-60 dBm");

        let mut health = Numeric::unknown(NumericSpec::PERCENT);
        health.set_wire("255");
        assert_eq!(health.render(ValueFormat::Units), "Unknown");
        health.set_wire("90");
        assert_eq!(health.render(ValueFormat::Units), "90%");
    }

    #[test]
    fn channel_key_prefix() {
        let ch = ChannelId::new(ChannelKind::Dante, Direction::Input, 3);
        assert_eq!(ch.to_string(), "dante_input_3");
        assert_eq!(ch.wire_prefix(), "DANTE_INPUT");
    }
}
