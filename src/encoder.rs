// src/encoder.rs
use log::warn;

use crate::error::NdefError;
use crate::ndef;
use crate::types::{EncodeRequest, RTD_TEXT, RTD_URI, RawRecord, RecordKind, Tnf};
use crate::uri_prefix;

/// Concatenates the non-empty parts in order, no separators.
pub fn append_data(first: Option<&[u8]>, second: Option<&[u8]>, third: Option<&[u8]>) -> Vec<u8> {
    [first, second, third]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .flat_map(|part| part.iter().copied())
        .collect()
}

const MAX_LANGUAGE_LEN: usize = 0x3F;

pub fn create_text_record(text: &str, language: &str) -> Result<RawRecord, NdefError> {
    let lang_bytes = language.as_bytes();
    if lang_bytes.len() > MAX_LANGUAGE_LEN {
        return Err(NdefError::LanguageTooLong(lang_bytes.len()));
    }
    // Bit 7=0 (UTF-8), Bits 5-0 = lang length
    let utf_bit = 0u8 << 7;
    let status = utf_bit | lang_bytes.len() as u8;
    let payload = append_data(Some(&[status][..]), Some(lang_bytes), Some(text.as_bytes()));
    Ok(RawRecord::new(Tnf::WellKnown, RTD_TEXT, payload))
}

// Always prefix code 0x00, the URI is stored whole
pub fn create_uri_record(uri: &str) -> RawRecord {
    let mut payload = Vec::with_capacity(uri.len() + 1);
    payload.push(uri_prefix::NO_PREFIX);
    payload.extend_from_slice(uri.as_bytes());
    RawRecord::new(Tnf::WellKnown, RTD_URI, payload)
}

/// Records for `request`: exactly one, or none for an unknown kind.
pub fn create_tag_message(request: &EncodeRequest) -> Result<Vec<RawRecord>, NdefError> {
    match request.kind {
        RecordKind::Text => Ok(vec![create_text_record(&request.payload, &request.locale)?]),
        RecordKind::Uri => Ok(vec![create_uri_record(&request.payload)]),
        RecordKind::Unknown => {
            warn!("Encode request with unknown record kind, message will be empty");
            Ok(Vec::new())
        }
    }
}

/// Message bytes ready for the tag. Empty for an unknown kind; callers
/// must treat that as nothing to write.
pub fn encode(request: &EncodeRequest) -> Result<Vec<u8>, NdefError> {
    Ok(ndef::encode_message(&create_tag_message(request)?))
}
