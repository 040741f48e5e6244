use crate::error::{BridgeError, Result};
use crate::types::{SeatId, ValueFormat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default TCP port of the receiver's command interface
pub const DEFAULT_PORT: u16 = 2202;

const DEFAULT_METERING_INTERVAL: u32 = 5000;
const METERING_INTERVAL_MIN: u32 = 500;
const METERING_INTERVAL_MAX: u32 = 99_999;
const DEFAULT_HEARTBEAT_MS: u64 = 30_000;
const DEFAULT_WATCHDOG_MS: u64 = 60_000;

/// Connection and presentation settings for one receiver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Receiver address; empty means "do not connect"
    pub host: String,
    pub port: u16,
    /// Ask the receiver to stream audio and RF meter reports
    pub metering_on: bool,
    /// Meter report interval in milliseconds
    pub metering_interval: u32,
    /// Seats offered to UI collaborators
    pub range: SeatRange,
    pub variable_format: ValueFormat,
    /// How often the heartbeat probe is sent
    pub heartbeat_interval_ms: u64,
    /// Silence longer than this forces a reconnect
    pub watchdog_timeout_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            metering_on: true,
            metering_interval: DEFAULT_METERING_INTERVAL,
            range: SeatRange::default(),
            variable_format: ValueFormat::Units,
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_MS,
            watchdog_timeout_ms: DEFAULT_WATCHDOG_MS,
        }
    }
}

impl BridgeConfig {
    /// Config for `host` with every other setting at its default
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Parse and validate a JSON config document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: BridgeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(BridgeError::InvalidConfig("port must be non-zero".to_string()));
        }
        if !(METERING_INTERVAL_MIN..=METERING_INTERVAL_MAX).contains(&self.metering_interval) {
            return Err(BridgeError::InvalidConfig(format!(
                "metering interval {} ms outside {}..={}",
                self.metering_interval, METERING_INTERVAL_MIN, METERING_INTERVAL_MAX
            )));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(BridgeError::InvalidConfig("heartbeat interval must be non-zero".to_string()));
        }
        if self.watchdog_timeout_ms <= self.heartbeat_interval_ms {
            return Err(BridgeError::InvalidConfig(format!(
                "watchdog timeout ({} ms) must exceed heartbeat interval ({} ms)",
                self.watchdog_timeout_ms, self.heartbeat_interval_ms
            )));
        }
        Ok(())
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn watchdog_timeout(&self) -> Duration {
        Duration::from_millis(self.watchdog_timeout_ms)
    }

    /// `host:port` for the TCP connect
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Set of seat ids parsed from an expression like `1-30,40,50-59`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SeatRange {
    seats: BTreeSet<SeatId>,
}

impl SeatRange {
    /// Seats in ascending order
    pub fn iter(&self) -> impl Iterator<Item = SeatId> + '_ {
        self.seats.iter().copied()
    }

    pub fn contains(&self, seat: SeatId) -> bool {
        self.seats.contains(&seat)
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }
}

impl Default for SeatRange {
    fn default() -> Self {
        Self {
            seats: (1..=50).collect(),
        }
    }
}

fn parse_seat(token: &str, expr: &str) -> Result<SeatId> {
    match token.trim().parse::<SeatId>() {
        Ok(0) | Err(_) => Err(BridgeError::InvalidSeatRange(format!(
            "'{}' in '{}' is not a seat number (1-65535)",
            token.trim(),
            expr
        ))),
        Ok(seat) => Ok(seat),
    }
}

impl FromStr for SeatRange {
    type Err = BridgeError;

    fn from_str(expr: &str) -> Result<Self> {
        let mut seats = BTreeSet::new();
        for part in expr.split(',') {
            if part.trim().is_empty() {
                return Err(BridgeError::InvalidSeatRange(format!("empty entry in '{}'", expr)));
            }
            match part.split_once('-') {
                Some((lo, hi)) => {
                    let lo = parse_seat(lo, expr)?;
                    let hi = parse_seat(hi, expr)?;
                    if lo > hi {
                        return Err(BridgeError::InvalidSeatRange(format!(
                            "range {}-{} is reversed",
                            lo, hi
                        )));
                    }
                    seats.extend(lo..=hi);
                }
                None => {
                    seats.insert(parse_seat(part, expr)?);
                }
            }
        }
        Ok(Self { seats })
    }
}

impl fmt::Display for SeatRange {
    /// Compact form: consecutive seats collapse into `lo-hi`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut runs: Vec<(SeatId, SeatId)> = Vec::new();
        for seat in self.iter() {
            match runs.last_mut() {
                Some((_, hi)) if u32::from(*hi) + 1 == u32::from(seat) => *hi = seat,
                _ => runs.push((seat, seat)),
            }
        }
        let parts: Vec<String> = runs
            .into_iter()
            .map(|(lo, hi)| if lo == hi { lo.to_string() } else { format!("{}-{}", lo, hi) })
            .collect();
        write!(f, "{}", parts.join(","))
    }
}

impl TryFrom<String> for SeatRange {
    type Error = BridgeError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SeatRange> for String {
    fn from(range: SeatRange) -> Self {
        range.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_ranges() {
        let range: SeatRange = "1-3, 40,50-52".parse().unwrap();
        assert_eq!(range.iter().collect::<Vec<_>>(), vec![1, 2, 3, 40, 50, 51, 52]);
        assert!(range.contains(40));
        assert!(!range.contains(4));
    }

    #[test]
    fn overlapping_ranges_are_deduplicated() {
        let range: SeatRange = "5-8,6,7-9".parse().unwrap();
        assert_eq!(range.iter().collect::<Vec<_>>(), vec![5, 6, 7, 8, 9]);
        assert_eq!(range.to_string(), "5-9");
    }

    #[test]
    fn rejects_bad_ranges() {
        assert!("0-5".parse::<SeatRange>().is_err());
        assert!("9-3".parse::<SeatRange>().is_err());
        assert!("1,,2".parse::<SeatRange>().is_err());
        assert!("70000".parse::<SeatRange>().is_err());
        assert!("a-b".parse::<SeatRange>().is_err());
    }

    #[test]
    fn display_round_trips() {
        let range: SeatRange = "1-30,40,50-59".parse().unwrap();
        assert_eq!(range.to_string(), "1-30,40,50-59");
    }

    #[test]
    fn defaults_from_empty_json() {
        let config = BridgeConfig::from_json(r#"{"host": "10.0.0.5"}"#).unwrap();
        assert_eq!(config.port, 2202);
        assert!(config.metering_on);
        assert_eq!(config.metering_interval, 5000);
        assert_eq!(config.range.len(), 50);
        assert_eq!(config.variable_format, ValueFormat::Units);
        assert_eq!(config.address(), "10.0.0.5:2202");
    }

    #[test]
    fn json_fields_are_camel_case() {
        let config = BridgeConfig::from_json(
            r#"{"host": "mxcw", "meteringOn": false, "meteringInterval": 750,
                "range": "1-4,10", "variableFormat": "numeric"}"#,
        )
        .unwrap();
        assert!(!config.metering_on);
        assert_eq!(config.metering_interval, 750);
        assert_eq!(config.range.iter().collect::<Vec<_>>(), vec![1, 2, 3, 4, 10]);
        assert_eq!(config.variable_format, ValueFormat::Numeric);

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["range"], "1-4,10");
    }

    #[test]
    fn validation_errors() {
        let mut config = BridgeConfig::new("mxcw");
        config.metering_interval = 100;
        assert!(matches!(config.validate(), Err(BridgeError::InvalidConfig(_))));

        let mut config = BridgeConfig::new("mxcw");
        config.watchdog_timeout_ms = config.heartbeat_interval_ms;
        assert!(config.validate().is_err());

        assert!(BridgeConfig::from_json(r#"{"range": "4-1"}"#).is_err());
    }
}
