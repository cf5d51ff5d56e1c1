// src/ndef.rs

use log::debug;

use crate::error::NdefError;
use crate::types::{RawRecord, Tnf};

// Header flags: MB | ME | CF | SR | IL | TNF(3)
const FLAG_MB: u8 = 0x80;
const FLAG_ME: u8 = 0x40;
const FLAG_CF: u8 = 0x20;
const FLAG_SR: u8 = 0x10;
const FLAG_IL: u8 = 0x08;

const TLV_NULL: u8 = 0x00;
const TLV_NDEF: u8 = 0x03;
const TLV_TERMINATOR: u8 = 0xFE;

pub fn encode_single_record(record: &RawRecord, mb: bool, me: bool) -> Vec<u8> {
    let short_record = record.payload.len() < 256;
    let has_id = !record.id.is_empty();

    // Bit 7: MB, Bit 6: ME, Bit 5: CF(0), Bit 4: SR, Bit 3: IL, Bits 2-0: TNF
    let mut header = record.tnf.bits();
    if mb {
        header |= FLAG_MB;
    }
    if me {
        header |= FLAG_ME;
    }
    if short_record {
        header |= FLAG_SR;
    }
    if has_id {
        header |= FLAG_IL;
    }

    let mut out = Vec::with_capacity(6 + record.record_type.len() + record.payload.len());
    out.push(header);
    out.push(record.record_type.len() as u8);
    if short_record {
        out.push(record.payload.len() as u8);
    } else {
        out.extend_from_slice(&(record.payload.len() as u32).to_be_bytes());
    }
    if has_id {
        out.push(record.id.len() as u8);
    }
    out.extend_from_slice(&record.record_type);
    out.extend_from_slice(&record.id);
    out.extend_from_slice(&record.payload);
    out
}

pub fn encode_message(records: &[RawRecord]) -> Vec<u8> {
    let mut full_message = Vec::new();
    for (i, record) in records.iter().enumerate() {
        let mb = i == 0;
        let me = i == records.len() - 1;
        full_message.extend(encode_single_record(record, mb, me));
    }
    full_message
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], NdefError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(NdefError::Truncated {
                offset: self.pos,
                needed: len,
                available: self.data.len().saturating_sub(self.pos),
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn byte(&mut self) -> Result<u8, NdefError> {
        Ok(self.take(1)?[0])
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

/// Splits a message into its records. Stops at the ME record; trailing
/// bytes after it are ignored.
pub fn parse_message(data: &[u8]) -> Result<Vec<RawRecord>, NdefError> {
    let mut records = Vec::new();
    let mut cursor = Cursor { data, pos: 0 };

    while cursor.remaining() > 0 {
        let header = cursor.byte()?;
        if header & FLAG_CF != 0 {
            return Err(NdefError::ChunkedRecord);
        }
        let tnf = Tnf::from_bits(header);
        let is_me = header & FLAG_ME != 0;

        let type_len = cursor.byte()? as usize;

        // 1 byte for Short Record, 4 bytes otherwise
        let payload_len = if header & FLAG_SR != 0 {
            cursor.byte()? as usize
        } else {
            let raw = cursor.take(4)?;
            u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize
        };

        let id_len = if header & FLAG_IL != 0 {
            cursor.byte()? as usize
        } else {
            0
        };

        let record_type = cursor.take(type_len)?.to_vec();
        let id = cursor.take(id_len)?.to_vec();
        let payload = cursor.take(payload_len)?.to_vec();

        records.push(RawRecord {
            tnf,
            record_type,
            id,
            payload,
        });

        if is_me {
            break;
        }
    }

    debug!("Parsed {} NDEF record(s) from {} bytes", records.len(), data.len());
    Ok(records)
}

/// NDEF message TLV as stored in Type 2 tag memory, terminator included.
pub fn wrap_in_tlv(ndef_bytes: &[u8]) -> Result<Vec<u8>, NdefError> {
    let long_len =
        u16::try_from(ndef_bytes.len()).map_err(|_| NdefError::TlvTooLong(ndef_bytes.len()))?;
    let mut tlv = Vec::with_capacity(ndef_bytes.len() + 5);
    tlv.push(TLV_NDEF);

    // L: one byte up to 254, else 0xFF + 2-byte length
    if ndef_bytes.len() < 0xFF {
        tlv.push(ndef_bytes.len() as u8);
    } else {
        tlv.push(0xFF);
        tlv.extend_from_slice(&long_len.to_be_bytes());
    }

    tlv.extend_from_slice(ndef_bytes);
    tlv.push(TLV_TERMINATOR);
    Ok(tlv)
}

// First NDEF TLV value; NULL TLVs skipped, others stepped over
pub fn unwrap_tlv(buffer: &[u8]) -> Result<Vec<u8>, NdefError> {
    let mut cursor = Cursor {
        data: buffer,
        pos: 0,
    };

    while cursor.remaining() > 0 {
        let tag = cursor.byte()?;
        match tag {
            TLV_NULL => continue,
            TLV_TERMINATOR => break,
            _ => {}
        }

        let mut len = cursor.byte()? as usize;
        if len == 0xFF {
            let raw = cursor.take(2)?;
            len = u16::from_be_bytes([raw[0], raw[1]]) as usize;
        }
        let value = cursor.take(len)?;
        if tag == TLV_NDEF {
            return Ok(value.to_vec());
        }
    }

    Err(NdefError::MissingTlv)
}
