// src/records.rs

use log::debug;

use crate::error::NdefError;
use crate::ndef;
use crate::types::{ParsedRecord, RTD_URI, RawRecord, TextEncoding, TextRecord, Tnf, UriRecord};
use crate::uri_prefix;

// [status][language code][text]; status bit 7 = UTF-16, bits 0-5 = language length
pub fn parse_text(record: &RawRecord) -> Result<TextRecord, NdefError> {
    let payload = &record.payload;
    let status_byte = *payload.first().ok_or(NdefError::EmptyPayload)?;

    let encoding = if status_byte & 0x80 == 0 {
        TextEncoding::Utf8
    } else {
        TextEncoding::Utf16
    };
    let lang_len = (status_byte & 0x3F) as usize;

    let text_start = 1 + lang_len;
    if text_start > payload.len() {
        return Err(NdefError::LanguageLengthOutOfRange {
            lang_len,
            payload_len: payload.len(),
        });
    }

    let language = String::from_utf8_lossy(&payload[1..text_start]).into_owned();
    let text_bytes = &payload[text_start..];
    let text = match encoding {
        TextEncoding::Utf8 => String::from_utf8_lossy(text_bytes).into_owned(),
        TextEncoding::Utf16 => decode_utf16(text_bytes),
    };

    Ok(TextRecord {
        text,
        language,
        encoding,
    })
}

/// Any record not typed `U` whose payload parses as text counts as text.
pub fn is_text(record: &RawRecord) -> bool {
    record.record_type != RTD_URI && parse_text(record).is_ok()
}

pub fn parse_uri(record: &RawRecord) -> Result<UriRecord, NdefError> {
    match record.tnf {
        Tnf::WellKnown => parse_well_known_uri(&record.payload),
        Tnf::AbsoluteUri => parse_absolute_uri(&record.payload),
        other => Err(NdefError::UnsupportedTnf(other.bits())),
    }
}

pub fn is_uri(record: &RawRecord) -> bool {
    parse_uri(record).is_ok()
}

fn parse_absolute_uri(payload: &[u8]) -> Result<UriRecord, NdefError> {
    if payload.is_empty() {
        return Err(NdefError::EmptyPayload);
    }
    Ok(UriRecord {
        uri: String::from_utf8_lossy(payload).into_owned(),
    })
}

fn parse_well_known_uri(payload: &[u8]) -> Result<UriRecord, NdefError> {
    let (&code, tail) = payload.split_first().ok_or(NdefError::EmptyPayload)?;
    let prefix = uri_prefix::prefix_for(code);

    let mut uri = String::with_capacity(prefix.len() + tail.len());
    uri.push_str(prefix);
    uri.push_str(&String::from_utf8_lossy(tail));
    Ok(UriRecord { uri })
}

/// Text is tried before URI; whatever matches neither is `None`.
pub fn parse_record(record: &RawRecord) -> Option<ParsedRecord> {
    if record.record_type != RTD_URI {
        if let Ok(text) = parse_text(record) {
            return Some(ParsedRecord::Text(text));
        }
    }
    match parse_uri(record) {
        Ok(uri) => Some(ParsedRecord::Uri(uri)),
        Err(e) => {
            debug!("Dropping unrecognised record (tnf {:?}): {}", record.tnf, e);
            None
        }
    }
}

pub fn decode_records(records: &[RawRecord]) -> Vec<ParsedRecord> {
    records.iter().filter_map(parse_record).collect()
}

pub fn decode_messages(messages: &[Vec<RawRecord>]) -> Vec<ParsedRecord> {
    messages
        .iter()
        .flat_map(|records| decode_records(records))
        .collect()
}

/// Frames and decodes raw message bytes. A message that cannot be framed
/// contributes no records.
pub fn decode_message_bytes(messages: &[Vec<u8>]) -> Vec<ParsedRecord> {
    let framed: Vec<Vec<RawRecord>> = messages
        .iter()
        .filter_map(|bytes| match ndef::parse_message(bytes) {
            Ok(records) => Some(records),
            Err(e) => {
                debug!("Skipping unframeable NDEF message: {}", e);
                None
            }
        })
        .collect();
    decode_messages(&framed)
}

pub fn render_records(records: &[ParsedRecord]) -> Vec<String> {
    records.iter().map(ToString::to_string).collect()
}

// BOM decides byte order, big-endian without one. A dangling odd byte
// decodes as U+FFFD.
fn decode_utf16(bytes: &[u8]) -> String {
    let (little_endian, body) = match bytes {
        [0xFE, 0xFF, rest @ ..] => (false, rest),
        [0xFF, 0xFE, rest @ ..] => (true, rest),
        _ => (false, bytes),
    };

    let units = body.chunks(2).map(|pair| match pair {
        [a, b] if little_endian => u16::from_le_bytes([*a, *b]),
        [a, b] => u16::from_be_bytes([*a, *b]),
        _ => 0xFFFD,
    });

    char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}
