//! Outgoing directives and incoming reports of the MXCW command protocol.
//!
//! ```text
//! Directive:  < GET ALL >  < GET <KEY> >  < SET [<ID>] <KEY> <VALUE> >
//! Report:     < REP [<ID>] <KEY> <VALUE...> >
//! Samples:    < AUDIO_SAMPLE ... >
//! ```
//!
//! Everything here is pure parsing and formatting; no I/O is performed.

use crate::types::{ChannelId, ChannelKind, Direction, SeatId};
use std::fmt;

/// Report class the state store acts on
pub const REPORT: &str = "REP";

/// Meter sample class (recognized, not modeled)
pub const AUDIO_SAMPLE: &str = "AUDIO_SAMPLE";

/// Receiver key answered by every heartbeat probe
pub const AUDIO_METER_RATE: &str = "AUDIO_METER_RATE";
pub const RF_METER_RATE: &str = "RF_METER_RATE";

/// Offset between displayed dB and the wire encoding of gain-like fields
pub const GAIN_OFFSET: i32 = 30;

/// Directive verb
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Set,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Set => "SET",
        }
    }
}

/// An outgoing command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub verb: Verb,
    /// Seat or channel number for per-target keys
    pub target: Option<u16>,
    pub key: String,
    pub value: Option<String>,
}

impl Directive {
    /// `GET <KEY>`
    pub fn get(key: impl Into<String>) -> Self {
        Self {
            verb: Verb::Get,
            target: None,
            key: key.into(),
            value: None,
        }
    }

    /// `GET <ID> <KEY>`
    pub fn get_for(target: u16, key: impl Into<String>) -> Self {
        Self {
            target: Some(target),
            ..Self::get(key)
        }
    }

    /// `SET [<ID>] <KEY> <VALUE>`
    pub fn set(target: Option<u16>, key: impl Into<String>, value: impl fmt::Display) -> Self {
        Self {
            verb: Verb::Set,
            target,
            key: key.into(),
            value: Some(value.to_string()),
        }
    }

    /// Wrapped form ready for the socket: `< SET 7 MIC_PRIORITY 3 >`
    pub fn encode(&self) -> String {
        wrap(&self.to_string())
    }
}

impl fmt::Display for Directive {
    /// Bare line without the angle brackets
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.verb.as_str())?;
        if let Some(target) = self.target {
            write!(f, " {}", target)?;
        }
        write!(f, " {}", self.key)?;
        if let Some(value) = &self.value {
            write!(f, " {}", value)?;
        }
        Ok(())
    }
}

/// Wrap one directive line as `< line >`
pub fn wrap(line: &str) -> String {
    format!("< {} >", line.trim())
}

/// Concatenate several directives into a single socket write
pub fn batch<'a>(directives: impl IntoIterator<Item = &'a Directive>) -> String {
    directives.into_iter().map(Directive::encode).collect()
}

/// Encode a dB value for a gain-like field (`dB + 30`)
pub fn gain_to_wire(db: i32) -> i32 {
    db + GAIN_OFFSET
}

/// Decode a gain-like wire value to dB (`raw - 30`)
pub fn gain_from_wire(raw: i32) -> i32 {
    raw - GAIN_OFFSET
}

/// What a report is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTarget {
    Receiver,
    Seat(SeatId),
    Channel(ChannelId),
}

/// A parsed `REP` frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub target: ReportTarget,
    pub key: String,
    /// Value with `{}` delimiters removed and whitespace trimmed
    pub value: String,
}

impl Report {
    /// True for the report that answers the heartbeat probe
    pub fn is_heartbeat(&self) -> bool {
        self.target == ReportTarget::Receiver && self.key == AUDIO_METER_RATE
    }
}

/// Any decoded inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Report(Report),
    /// Meter sample telemetry
    AudioSample,
    /// Recognized class the bridge does not act on
    Other(String),
}

impl Inbound {
    /// Parse one raw frame from [`crate::framing::FrameDecoder`]
    ///
    /// Returns `None` for empty frames and for reports missing their key or
    /// value.
    pub fn parse(frame: &str) -> Option<Inbound> {
        let body = frame.trim();
        let body = body.strip_prefix('<').unwrap_or(body).trim();
        let (class, rest) = next_token(body)?;

        match class {
            REPORT => parse_report(rest).map(Inbound::Report),
            AUDIO_SAMPLE => Some(Inbound::AudioSample),
            other => Some(Inbound::Other(other.to_string())),
        }
    }
}

/// Split off the first whitespace-delimited token, returning it and the rest
fn next_token(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    match s.find(char::is_whitespace) {
        Some(end) => Some((&s[..end], s[end..].trim_start())),
        None => Some((s, "")),
    }
}

fn parse_report(rest: &str) -> Option<Report> {
    let Some((first, after_first)) = next_token(rest) else {
        tracing::debug!("Dropping report without a key");
        return None;
    };

    let (target, key, value) = match first.parse::<u16>() {
        Ok(id) => {
            let Some((key, value)) = next_token(after_first) else {
                tracing::debug!("Dropping report for {} without a key", id);
                return None;
            };
            (classify_target(id, key), key, value)
        }
        Err(_) => (ReportTarget::Receiver, first, after_first),
    };

    if value.is_empty() {
        tracing::debug!("Dropping report {} without a value", key);
        return None;
    }

    Some(Report {
        target,
        key: key.to_string(),
        value: strip_braces(value),
    })
}

fn classify_target(id: u16, key: &str) -> ReportTarget {
    const CHANNELS: [(&str, ChannelKind, Direction); 4] = [
        ("AUX_INPUT", ChannelKind::Aux, Direction::Input),
        ("AUX_OUTPUT", ChannelKind::Aux, Direction::Output),
        ("DANTE_INPUT", ChannelKind::Dante, Direction::Input),
        ("DANTE_OUTPUT", ChannelKind::Dante, Direction::Output),
    ];

    CHANNELS
        .iter()
        .find(|(prefix, _, _)| key.starts_with(prefix))
        .map(|(_, kind, direction)| ReportTarget::Channel(ChannelId::new(*kind, *direction, id)))
        .unwrap_or(ReportTarget::Seat(id))
}

/// Remove the `{...}` free-text delimiters, if present, and trim
pub fn strip_braces(value: &str) -> String {
    let value = value.trim();
    let value = value.strip_prefix('{').unwrap_or(value);
    let value = value.strip_suffix('}').unwrap_or(value);
    value.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(frame: &str) -> Report {
        match Inbound::parse(frame) {
            Some(Inbound::Report(report)) => report,
            other => panic!("expected report from {:?}, got {:?}", frame, other),
        }
    }

    #[test]
    fn seat_report() {
        let r = report("< REP 12 MIC_GAIN 040 ");
        assert_eq!(r.target, ReportTarget::Seat(12));
        assert_eq!(r.key, "MIC_GAIN");
        assert_eq!(r.value, "040");
    }

    #[test]
    fn receiver_report_with_braces() {
        let r = report("REP MODEL {SCM820}");
        assert_eq!(r.target, ReportTarget::Receiver);
        assert_eq!(r.key, "MODEL");
        assert_eq!(r.value, "SCM820");
    }

    #[test]
    fn channel_report_uses_frame_id() {
        let r = report("< REP 3 AUX_INPUT_AGC ON ");
        assert_eq!(
            r.target,
            ReportTarget::Channel(ChannelId::new(ChannelKind::Aux, Direction::Input, 3))
        );
        let r = report("< REP 7 DANTE_OUTPUT_GAIN 025 ");
        assert_eq!(
            r.target,
            ReportTarget::Channel(ChannelId::new(ChannelKind::Dante, Direction::Output, 7))
        );
    }

    #[test]
    fn free_text_keeps_inner_spacing() {
        let r = report("\r\n< REP 5 SEAT_NAME {  Conf  A } ");
        assert_eq!(r.target, ReportTarget::Seat(5));
        assert_eq!(r.value, "Conf  A");
    }

    #[test]
    fn short_reports_are_dropped() {
        assert_eq!(Inbound::parse("< REP >"), None);
        assert_eq!(Inbound::parse("< REP 12 >"), None);
        assert_eq!(Inbound::parse("< REP 12 MIC_GAIN "), None);
        assert_eq!(Inbound::parse("< REP ERR "), None);
        assert_eq!(Inbound::parse("   "), None);
    }

    #[test]
    fn other_classes() {
        assert_eq!(Inbound::parse("< AUDIO_SAMPLE 1 012 013 "), Some(Inbound::AudioSample));
        assert_eq!(Inbound::parse("< SAMPLE ALL "), Some(Inbound::Other("SAMPLE".into())));
    }

    #[test]
    fn heartbeat_detection() {
        assert!(report("< REP AUDIO_METER_RATE 05000 ").is_heartbeat());
        assert!(!report("< REP RF_METER_RATE 05000 ").is_heartbeat());
    }

    #[test]
    fn encode_set_with_target() {
        let d = Directive::set(Some(7), "MIC_PRIORITY", 3);
        assert_eq!(d.to_string(), "SET 7 MIC_PRIORITY 3");
        assert_eq!(d.encode(), "< SET 7 MIC_PRIORITY 3 >");
    }

    #[test]
    fn encode_get() {
        assert_eq!(Directive::get("ALL").encode(), "< GET ALL >");
        assert_eq!(Directive::get_for(4, "SEAT_NAME").encode(), "< GET 4 SEAT_NAME >");
    }

    #[test]
    fn batched_directives() {
        let rates = [
            Directive::set(None, AUDIO_METER_RATE, 5000),
            Directive::set(None, RF_METER_RATE, 5000),
        ];
        assert_eq!(
            batch(&rates),
            "< SET AUDIO_METER_RATE 5000 >< SET RF_METER_RATE 5000 >"
        );
    }

    #[test]
    fn gain_round_trip() {
        for db in -30..=10 {
            assert_eq!(gain_from_wire(gain_to_wire(db)), db);
        }
        assert_eq!(gain_to_wire(-30), 0);
        assert_eq!(gain_to_wire(10), 40);
    }
}
