// src/hexutil.rs
use crate::error::NdefError;

pub fn get_hex(bytes: &[u8], reversed: bool) -> String {
    if reversed {
        let flipped: Vec<u8> = bytes.iter().rev().copied().collect();
        hex::encode_upper(flipped)
    } else {
        hex::encode_upper(bytes)
    }
}

// High byte first
pub fn short_to_bytes(value: u16) -> [u8; 2] {
    value.to_be_bytes()
}

// Accepts "04:A2:.." and "04 A2 .." too
pub fn parse_hex(input: &str) -> Result<Vec<u8>, NdefError> {
    let cleaned: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    Ok(hex::decode(cleaned)?)
}
