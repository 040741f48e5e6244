//! Typed builders for the directives a control surface sends.
//!
//! Each builder returns the directive WITHOUT the `< >` wrapping; use
//! [`Directive::encode`] or [`crate::MxcwClient::send`].

use crate::error::{BridgeError, Result};
use crate::protocol::{gain_to_wire, Directive, AUDIO_METER_RATE, RF_METER_RATE};
use crate::types::{ChannelId, Direction, SeatId};

/// Seat target meaning "every seat"
pub const ALL_SEATS: SeatId = 0;

/// Longest device id the receiver stores, in bytes
pub const DEVICE_ID_MAX: usize = 31;

/// Longest seat name the receiver stores, in bytes
pub const SEAT_NAME_MAX: usize = 128;

/// Accepted dB range of a gain-like field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GainRange {
    pub min: i32,
    pub max: i32,
}

impl GainRange {
    /// Mic, aux input and Dante input gain
    pub const INPUT: GainRange = GainRange { min: -30, max: 10 };
    /// Aux and Dante output gain
    pub const OUTPUT: GainRange = GainRange { min: -30, max: 0 };
    pub const LOUDSPEAKER: GainRange = GainRange { min: -30, max: 6 };

    pub fn contains(&self, db: i32) -> bool {
        (self.min..=self.max).contains(&db)
    }

    /// Wire encoding of `db`, rejecting values outside the range
    pub fn encode(&self, field: &'static str, db: i32) -> Result<i32> {
        if !self.contains(db) {
            return Err(BridgeError::OutOfRange {
                field,
                value: i64::from(db),
                min: i64::from(self.min),
                max: i64::from(self.max),
            });
        }
        Ok(gain_to_wire(db))
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}

fn enabled(on: bool) -> &'static str {
    if on {
        "ENABLED"
    } else {
        "DISABLED"
    }
}

fn in_range(field: &'static str, value: u32, min: u32, max: u32) -> Result<u32> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(BridgeError::OutOfRange {
            field,
            value: i64::from(value),
            min: i64::from(min),
            max: i64::from(max),
        })
    }
}

/// Wrap free text in `{}` after checking for reserved characters
fn braced(field: &'static str, text: &str) -> Result<String> {
    if let Some(c) = text.chars().find(|c| matches!(c, '{' | '}' | '<' | '>')) {
        return Err(BridgeError::InvalidText {
            field,
            detail: format!("'{}' is not allowed", c),
        });
    }
    Ok(format!("{{{}}}", text))
}

/// Braced free text of 1..=`max` bytes
fn sized_text(field: &'static str, text: &str, max: usize) -> Result<String> {
    if text.is_empty() || text.len() > max {
        return Err(BridgeError::InvalidText {
            field,
            detail: format!("length {} is outside 1..={} bytes", text.len(), max),
        });
    }
    braced(field, text)
}

/// Request a full state dump
pub fn get_all() -> Directive {
    Directive::get("ALL")
}

/// Heartbeat probe
pub fn get_audio_meter_rate() -> Directive {
    Directive::get(AUDIO_METER_RATE)
}

/// Audio and RF meter rates; `None` turns metering off
pub fn meter_rates(interval_ms: Option<u32>) -> [Directive; 2] {
    let rate = interval_ms.unwrap_or(0);
    [
        Directive::set(None, AUDIO_METER_RATE, rate),
        Directive::set(None, RF_METER_RATE, rate),
    ]
}

pub fn all_delegate_mic_off() -> Directive {
    Directive::set(None, "ALL_DELEGATE_MIC_OFF", "TRUE")
}

pub fn audio_input_speaklist(on: bool) -> Directive {
    Directive::set(None, "AUDIO_INPUT_SPEAKLIST", on_off(on))
}

pub fn clear_request_list() -> Directive {
    Directive::set(None, "CLEAR_REQUEST_LIST", "TRUE")
}

pub fn close_voting_results() -> Directive {
    Directive::set(None, "CLOSE_VOTING_RESULTS", "TRUE")
}

pub fn complete_vote() -> Directive {
    Directive::set(None, "COMPLETE_VOTE", "TRUE")
}

/// Start a voting session using the receiver's voting configuration `mode`
pub fn start_vote(mode: u32) -> Directive {
    Directive::set(None, "START_VOTE", mode)
}

/// Set the receiver's device ID (1-31 bytes)
pub fn device_id(id: &str) -> Result<Directive> {
    Ok(Directive::set(None, "DEVICE_ID", sized_text("DEVICE_ID", id, DEVICE_ID_MAX)?))
}

/// Identify the access point by flashing its lights
pub fn flash_receiver(on: bool) -> Directive {
    Directive::set(None, "FLASH", on_off(on))
}

pub fn global_mute(on: bool) -> Directive {
    Directive::set(None, "GLOBAL_MUTE", on_off(on))
}

/// `NOT_ALLOWED`, `HIGHER_PRIORITY` or `EQUAL_AND_HIGHER_PRIORITY`
pub fn interrupt_mode(mode: &str) -> Directive {
    Directive::set(None, "INTERRUPT_MODE", mode)
}

pub fn loudspeaker_volume(db: i32) -> Result<Directive> {
    let raw = GainRange::LOUDSPEAKER.encode("LOUDSPEAKER_VOLUME", db)?;
    Ok(Directive::set(None, "LOUDSPEAKER_VOLUME", raw))
}

pub fn max_delegate_speakers(count: u32) -> Result<Directive> {
    let count = in_range("MAX_DELEGATE_SPEAKERS", count, 1, 8)?;
    Ok(Directive::set(None, "MAX_DELEGATE_SPEAKERS", count))
}

pub fn max_num_requests(count: u32) -> Result<Directive> {
    let count = in_range("MAX_NUM_REQUESTS", count, 1, 50)?;
    Ok(Directive::set(None, "MAX_NUM_REQUESTS", count))
}

pub fn max_total_speakers(count: u32) -> Result<Directive> {
    let count = in_range("MAX_TOTAL_SPEAKERS", count, 1, 8)?;
    Ok(Directive::set(None, "MAX_TOTAL_SPEAKERS", count))
}

pub fn next_mic_on() -> Directive {
    Directive::set(None, "NEXT_MIC_ON", "TRUE")
}

/// `AUTO`, `MANUAL`, `FIFO` or `HANDSFREE`
pub fn operation_mode(mode: &str) -> Directive {
    Directive::set(None, "OPERATION_MODE", mode)
}

pub fn retain_seat_persistence(on: bool) -> Directive {
    Directive::set(None, "RETAIN_SEAT_PERSISTENCE", enabled(on))
}

/// `OFF`, `LOW`, `MEDIUM`, `HIGH` or `MAXIMUM`
pub fn rf_power(level: &str) -> Directive {
    Directive::set(None, "RF_POWER", level)
}

pub fn wdu_lock_welcome(on: bool) -> Directive {
    Directive::set(None, "WDU_LOCK_WELCOME", enabled(on))
}

/// Turn every conference unit off
pub fn wdu_off() -> Directive {
    Directive::set(None, "WDU_OFF", "TRUE")
}

pub fn welcome_lock_reset() -> Directive {
    Directive::set(None, "WELCOME_LOCK_RESET", "TRUE")
}

// Per-seat directives. `seat` may be ALL_SEATS where the receiver allows it.

pub fn exclusive_mute(seat: SeatId, on: bool) -> Directive {
    Directive::set(Some(seat), "EXCLUSIVE_MUTE", on_off(on))
}

pub fn flash_seat(seat: SeatId, on: bool) -> Directive {
    Directive::set(Some(seat), "FLASH", on_off(on))
}

pub fn mic_agc(seat: SeatId, on: bool) -> Directive {
    Directive::set(Some(seat), "MIC_AGC", on_off(on))
}

pub fn mic_gain(seat: SeatId, db: i32) -> Result<Directive> {
    let raw = GainRange::INPUT.encode("MIC_GAIN", db)?;
    Ok(Directive::set(Some(seat), "MIC_GAIN", raw))
}

/// Priority 1 (highest) to 5
pub fn mic_priority(seat: SeatId, priority: u32) -> Result<Directive> {
    let priority = in_range("MIC_PRIORITY", priority, 1, 5)?;
    Ok(Directive::set(Some(seat), "MIC_PRIORITY", priority))
}

pub fn mic_status(seat: SeatId, on: bool) -> Directive {
    Directive::set(Some(seat), "MIC_STATUS", on_off(on))
}

/// `DELEGATE`, `CHAIRMAN`, `LISTENER`, `AMBIENT`, `REMOTE_CALLER` or `DUAL_DELEGATE`
pub fn role(seat: SeatId, role: &str) -> Directive {
    Directive::set(Some(seat), "ROLE", role)
}

/// Set a seat's name (1-128 bytes)
pub fn seat_name(seat: SeatId, name: &str) -> Result<Directive> {
    Ok(Directive::set(Some(seat), "SEAT_NAME", sized_text("SEAT_NAME", name, SEAT_NAME_MAX)?))
}

// Fixed channel directives

fn channel_key(channel: ChannelId, field: &str) -> String {
    format!("{}_{}", channel.wire_prefix(), field)
}

fn channel_gain_range(channel: ChannelId) -> GainRange {
    match channel.direction {
        Direction::Input => GainRange::INPUT,
        Direction::Output => GainRange::OUTPUT,
    }
}

/// AGC exists on aux and Dante inputs only
pub fn channel_agc(channel: ChannelId, on: bool) -> Directive {
    Directive::set(Some(channel.id), channel_key(channel, "AGC"), on_off(on))
}

pub fn channel_gain(channel: ChannelId, db: i32) -> Result<Directive> {
    let raw = channel_gain_range(channel).encode(channel.wire_prefix(), db)?;
    Ok(Directive::set(Some(channel.id), channel_key(channel, "GAIN"), raw))
}

pub fn channel_mute(channel: ChannelId, on: bool) -> Directive {
    Directive::set(Some(channel.id), channel_key(channel, "MUTE"), on_off(on))
}

/// Input pad exists on the aux input only
pub fn channel_pad(channel: ChannelId, on: bool) -> Directive {
    Directive::set(Some(channel.id), channel_key(channel, "PAD"), on_off(on))
}
