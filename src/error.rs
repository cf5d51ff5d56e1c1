// src/error.rs
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NdefError {
    /// Buffer ended before a field could be read
    #[error("Truncated NDEF data: need {needed} bytes at offset {offset}, have {available}")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Empty payload")]
    EmptyPayload,

    /// Status byte announces a language code longer than the payload
    #[error("Language code length {lang_len} does not fit payload of {payload_len} bytes")]
    LanguageLengthOutOfRange { lang_len: usize, payload_len: usize },

    #[error("Unsupported TNF: {0:#04X}")]
    UnsupportedTnf(u8),

    #[error("Chunked records are not supported")]
    ChunkedRecord,

    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    #[error("No NDEF TLV found")]
    MissingTlv,

    /// The text status byte has six bits for the language code length
    #[error("Language code of {0} bytes exceeds the 63 byte limit")]
    LanguageTooLong(usize),

    #[error("Message of {0} bytes does not fit an NDEF TLV")]
    TlvTooLong(usize),
}

impl From<hex::FromHexError> for NdefError {
    fn from(e: hex::FromHexError) -> Self {
        NdefError::InvalidHex(e.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Tag I/O error: {0}")]
pub struct TagIoError(pub String);

/// Reasons a write transaction did not commit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WriteError {
    /// Tag exposes neither NDEF nor NDEF-formatable technology
    #[error("Tag supports neither NDEF nor NDEF formatting")]
    UnsupportedCapability,

    #[error("Tag is read-only")]
    ReadOnly,

    #[error("Message of {size} bytes exceeds tag capacity of {max} bytes")]
    CapacityExceeded { size: usize, max: usize },

    #[error(transparent)]
    Io(#[from] TagIoError),

    #[error("Write timed out")]
    Timeout,

    /// Encoder produced a message without records
    #[error("Nothing to write")]
    EmptyMessage,

    #[error("Cannot encode message: {0}")]
    Encode(#[from] NdefError),
}

#[derive(Error, Debug)]
pub enum SignatureError {
    #[error("Failed to read signature table: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed signature table: {0}")]
    Json(#[from] serde_json::Error),
}
