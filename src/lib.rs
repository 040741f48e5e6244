//! Rust library for controlling Shure MXCW conference receivers
//!
//! This library keeps a live session with an MXCW access point over its
//! ASCII command protocol (TCP port 2202) and mirrors the receiver, seat and
//! fixed channel state in a typed model. It supports:
//!
//! - Streaming frame decoding of `< ... >` delimited reports
//! - A typed device model with sentinel and gain-offset handling
//! - Change notifications keyed by stable field ids (`seat_12_mic_gain`)
//! - Typed directive builders for every receiver control
//! - Heartbeat probing with watchdog-driven reconnects
//!
//! # Quick Start
//!
//! ```no_run
//! use mxcw_bridge::{commands, BridgeConfig, MxcwClient, StateUpdate};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = MxcwClient::spawn(BridgeConfig::new("192.168.1.50"))?;
//!     let mut updates = client.subscribe();
//!
//!     client.send(&commands::global_mute(true))?;
//!
//!     while let Ok(update) = updates.recv().await {
//!         if let StateUpdate::FieldChanged { key, display, .. } = update {
//!             println!("{} = {}", key, display);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Framing**: splits the byte stream into frames at each `>`
//! - **Protocol**: parses reports and formats directives
//! - **Commands**: typed directive builders
//! - **State / Store**: entity tables and the device state store
//! - **Connection**: single-task lifecycle with heartbeat and watchdog
//! - **Client**: public handle for sending, querying and subscribing

mod client;
pub mod commands;
mod config;
mod connection;
mod error;
pub mod framing;
pub mod protocol;
mod session;
mod state;
mod store;
mod subscription;
mod types;

// Public exports
pub use client::MxcwClient;
pub use config::{BridgeConfig, SeatRange, DEFAULT_PORT};
pub use error::{BridgeError, Result};
pub use framing::FrameDecoder;
pub use protocol::{Directive, Inbound, Report, ReportTarget, Verb};
pub use state::{ChannelField, Entity, FieldDef, FixedChannel, Receiver, ReceiverField, Seat, SeatField, Slot};
pub use store::DeviceState;
pub use subscription::{StateReceiver, StateUpdate};
pub use types::{
    ChannelId, ChannelKind, ConnectionState, Direction, FieldValue, LinkStatus, Numeric,
    NumericSpec, SeatChoice, SeatId, Setting, Unit, ValueFormat,
};
