use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors that can occur when talking to an MXCW receiver
#[derive(Error, Debug)]
pub enum BridgeError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection task has stopped and no longer accepts commands
    #[error("Connection closed")]
    ConnectionClosed,

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Seat range expression could not be parsed
    #[error("Invalid seat range: {0}")]
    InvalidSeatRange(String),

    /// A directive value is outside the range the receiver accepts
    #[error("{field} value {value} out of range ({min}..={max})")]
    OutOfRange {
        /// Wire key of the directive
        field: &'static str,
        /// Rejected value
        value: i64,
        /// Smallest accepted value
        min: i64,
        /// Largest accepted value
        max: i64,
    },

    /// A free-text value contains characters the wire format reserves
    #[error("Invalid text for {field}: {detail}")]
    InvalidText {
        /// Wire key of the directive
        field: &'static str,
        /// What was wrong with the text
        detail: String,
    },

    /// Channel receive error
    #[error("Channel error: {0}")]
    ChannelError(String),
}
