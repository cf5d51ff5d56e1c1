// src/types.rs
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tnf {
    Empty,
    WellKnown,
    MimeMedia,
    AbsoluteUri,
    External,
    Unknown,
    Unchanged,
    Reserved,
}

impl Tnf {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0x00 => Tnf::Empty,
            0x01 => Tnf::WellKnown,
            0x02 => Tnf::MimeMedia,
            0x03 => Tnf::AbsoluteUri,
            0x04 => Tnf::External,
            0x05 => Tnf::Unknown,
            0x06 => Tnf::Unchanged,
            _ => Tnf::Reserved,
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            Tnf::Empty => 0x00,
            Tnf::WellKnown => 0x01,
            Tnf::MimeMedia => 0x02,
            Tnf::AbsoluteUri => 0x03,
            Tnf::External => 0x04,
            Tnf::Unknown => 0x05,
            Tnf::Unchanged => 0x06,
            Tnf::Reserved => 0x07,
        }
    }
}

// Well-known record type names (NFC Forum RTD)
pub const RTD_TEXT: &[u8] = b"T";
pub const RTD_URI: &[u8] = b"U";

/// One record as framed on the tag, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub tnf: Tnf, // Type Name Format (How to interpret the type)
    pub record_type: Vec<u8>,
    pub id: Vec<u8>,
    pub payload: Vec<u8>,
}

impl RawRecord {
    pub fn new(tnf: Tnf, record_type: &[u8], payload: Vec<u8>) -> Self {
        Self {
            tnf,
            record_type: record_type.to_vec(),
            id: Vec::new(),
            payload,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordType {
    Text,
    Uri,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TextEncoding {
    Utf8,
    Utf16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextRecord {
    pub text: String,
    pub language: String,
    pub encoding: TextEncoding,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UriRecord {
    pub uri: String,
}

/// A record the decoder recognised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ParsedRecord {
    Text(TextRecord),
    Uri(UriRecord),
}

impl ParsedRecord {
    pub fn record_type(&self) -> RecordType {
        match self {
            ParsedRecord::Text(_) => RecordType::Text,
            ParsedRecord::Uri(_) => RecordType::Uri,
        }
    }
}

impl fmt::Display for ParsedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsedRecord::Text(record) => write!(f, "TEXT : {}", record.text),
            ParsedRecord::Uri(record) => write!(f, "URI : {}", record.uri),
        }
    }
}

/// What the application wants written. Unrecognised kinds arriving over the
/// bridge deserialize to `Unknown` and encode to an empty message.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordKind {
    Text,
    Uri,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeRequest {
    pub payload: String,
    pub kind: RecordKind,
    pub locale: String, // IANA language code, TEXT only
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct NdefCapability {
    pub writable: bool,
    pub max_size: usize,
}

/// A tag discovery as reported by the platform side of the bridge.
///
/// Byte fields are hex strings exactly as the chip delivered them (ATQA is
/// little-endian). `messages` holds zero or more raw NDEF messages.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct TagEvent {
    pub technologies: Vec<String>,
    pub id: String,
    pub atqa: Option<String>,
    pub sak: Option<u16>,
    pub historical_bytes: Option<String>,
    pub barcode_type: Option<u8>,
    pub select_aid_response: Option<String>,
    pub messages: Vec<String>,
    pub ndef: Option<NdefCapability>,
    /// Number of low-level faults the simulated tag raises before writes succeed
    pub transient_faults: u32,
}

// Messages sent TO the WebSocket client (Frontend)
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutgoingMessage {
    ServiceStatus { mode: String },
    DataReadSuccess { lines: Vec<String>, data: String },
    WritePending { timeout_ms: u64 },
    DataWriteSuccess { message: String, data: String },
    DataWriteError { error: String },
    Encoded { data: String },
    AdapterReset { enabled: bool },
    Error { error: String },
}

// Messages received FROM the WebSocket client
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncomingMessage {
    GetStatus,
    TagDiscovered {
        tag: TagEvent,
    },
    WriteData {
        data_type: RecordKind,
        content: String,
        locale: Option<String>,
    },
    EncodeData {
        data_type: RecordKind,
        content: String,
        locale: Option<String>,
    },
}

// Internal commands sent from WS Server -> NFC Thread
#[derive(Debug)]
pub enum NfcCommand {
    TagDiscovered(TagEvent),
    StartWrite(EncodeRequest),
    Encode(EncodeRequest),
    CheckStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tnf_bits_round_trip_through_header_mask() {
        for bits in 0u8..8 {
            assert_eq!(Tnf::from_bits(bits).bits(), bits);
        }
        // flags above the TNF field are ignored
        assert_eq!(Tnf::from_bits(0xD1), Tnf::WellKnown);
    }

    #[test]
    fn display_matches_read_rendering() {
        let text = ParsedRecord::Text(TextRecord {
            text: "hi".into(),
            language: "en".into(),
            encoding: TextEncoding::Utf8,
        });
        let uri = ParsedRecord::Uri(UriRecord {
            uri: "http://example.com".into(),
        });
        assert_eq!(text.to_string(), "TEXT : hi");
        assert_eq!(uri.to_string(), "URI : http://example.com");
        assert_eq!(text.record_type(), RecordType::Text);
        assert_eq!(uri.record_type(), RecordType::Uri);
    }

    #[test]
    fn incoming_write_request_parses() {
        let msg: IncomingMessage = serde_json::from_str(
            r#"{"type":"WRITE_DATA","data_type":"URI","content":"https://a.b"}"#,
        )
        .unwrap();
        match msg {
            IncomingMessage::WriteData {
                data_type,
                content,
                locale,
            } => {
                assert_eq!(data_type, RecordKind::Uri);
                assert_eq!(content, "https://a.b");
                assert_eq!(locale, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unknown_record_kind_is_not_a_parse_error() {
        let kind: RecordKind = serde_json::from_str(r#""APP""#).unwrap();
        assert_eq!(kind, RecordKind::Unknown);
    }

    #[test]
    fn tag_event_fields_default() {
        let msg: IncomingMessage = serde_json::from_str(
            r#"{"type":"TAG_DISCOVERED","tag":{"technologies":["android.nfc.tech.NfcA"]}}"#,
        )
        .unwrap();
        match msg {
            IncomingMessage::TagDiscovered { tag } => {
                assert_eq!(tag.technologies, vec!["android.nfc.tech.NfcA".to_string()]);
                assert!(tag.messages.is_empty());
                assert_eq!(tag.ndef, None);
                assert_eq!(tag.transient_faults, 0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn outgoing_is_internally_tagged() {
        let json = serde_json::to_string(&OutgoingMessage::AdapterReset { enabled: false }).unwrap();
        assert_eq!(json, r#"{"type":"ADAPTER_RESET","enabled":false}"#);
    }
}
