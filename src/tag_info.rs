// src/tag_info.rs

use std::collections::HashMap;
use std::path::Path;

use lazy_static::lazy_static;
use log::{error, warn};
use serde::Deserialize;

use crate::error::SignatureError;
use crate::hexutil::{get_hex, parse_hex, short_to_bytes};
use crate::types::TagEvent;

const TECH_PREFIX: &str = "android.nfc.tech.";

pub const TECH_NFC_A: &str = "NfcA";
pub const TECH_NFC_B: &str = "NfcB";
pub const TECH_NFC_F: &str = "NfcF";
pub const TECH_NFC_V: &str = "NfcV";
pub const TECH_NFC_BARCODE: &str = "NfcBarcode";
pub const TECH_MIFARE_CLASSIC: &str = "MifareClassic";
pub const TECH_MIFARE_ULTRALIGHT: &str = "MifareUltralight";
pub const TECH_NDEF: &str = "Ndef";
pub const TECH_NDEF_FORMATABLE: &str = "NdefFormatable";

pub const BARCODE_TYPE_KOVIO: u8 = 1;

pub const LABEL_UNKNOWN: &str = "Unknown tag";

static DEFAULT_SIGNATURES_JSON: &str = include_str!("../data/tag_signatures.json");

lazy_static! {
    pub static ref DEFAULT_SIGNATURES: SignatureTable =
        SignatureTable::from_json(DEFAULT_SIGNATURES_JSON).unwrap_or_else(|e| {
            error!("Embedded tag signature table is invalid: {}", e);
            SignatureTable::default()
        });
}

/// One known chip fingerprint. Fields are uppercase hex as rendered by
/// [`get_hex`]: ATQA byte-reversed, SAK as two bytes, ATS possibly empty.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TagSignature {
    pub atqa: String,
    pub sak: String,
    #[serde(default)]
    pub ats: String,
    pub label: String,
}

#[derive(Debug, Clone, Default)]
pub struct SignatureTable {
    labels: HashMap<String, String>,
}

impl SignatureTable {
    pub fn from_signatures(signatures: impl IntoIterator<Item = TagSignature>) -> Self {
        let labels = signatures
            .into_iter()
            .map(|sig| (signature_key(&sig.atqa, &sig.sak, &sig.ats), sig.label))
            .collect();
        Self { labels }
    }

    pub fn from_json(json: &str) -> Result<Self, SignatureError> {
        let signatures: Vec<TagSignature> = serde_json::from_str(json)?;
        Ok(Self::from_signatures(signatures))
    }

    pub fn load(path: &Path) -> Result<Self, SignatureError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn lookup(&self, atqa: &str, sak: &str, ats: &str) -> Option<&str> {
        self.labels
            .get(&signature_key(atqa, sak, ats))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

// Plain concatenation, as the chip answers are fixed-width in practice
fn signature_key(atqa: &str, sak: &str, ats: &str) -> String {
    format!("{}{}{}", atqa, sak, ats).to_ascii_uppercase()
}

// "android.nfc.tech.NfcA" -> "NfcA"
pub fn short_tech_name(name: &str) -> &str {
    name.strip_prefix(TECH_PREFIX).unwrap_or(name)
}

pub fn has_technology(technologies: &[String], tech: &str) -> bool {
    technologies.iter().any(|t| short_tech_name(t) == tech)
}

/// Chip label for a type-A tag. Unknown answer bytes fall back to the
/// MIFARE sub-technologies the platform probed, then to [`LABEL_UNKNOWN`].
pub fn identify(
    technologies: &[String],
    atqa: &str,
    sak: &str,
    ats: &str,
    table: &SignatureTable,
) -> String {
    if let Some(label) = table.lookup(atqa, sak, ats) {
        return label.to_string();
    }
    if has_technology(technologies, TECH_MIFARE_CLASSIC) {
        "MIFARE Classic".to_string()
    } else if has_technology(technologies, TECH_MIFARE_ULTRALIGHT) {
        "MIFARE Ultralight".to_string()
    } else {
        LABEL_UNKNOWN.to_string()
    }
}

fn field_bytes(name: &str, value: Option<&str>) -> Vec<u8> {
    match value.map(parse_hex) {
        Some(Ok(bytes)) => bytes,
        Some(Err(e)) => {
            warn!("Ignoring tag field {}: {}", name, e);
            Vec::new()
        }
        None => Vec::new(),
    }
}

fn describe_nfc_a(event: &TagEvent, table: &SignatureTable, lines: &mut Vec<String>) {
    let atqa = get_hex(&field_bytes("atqa", event.atqa.as_deref()), true);
    let sak = get_hex(&short_to_bytes(event.sak.unwrap_or(0)), false);
    let ats = get_hex(
        &field_bytes("historical_bytes", event.historical_bytes.as_deref()),
        false,
    );

    lines.push(format!(
        "Type={}",
        identify(&event.technologies, &atqa, &sak, &ats, table)
    ));
    if !atqa.is_empty() {
        lines.push(format!("ATQA={}", atqa));
    }
    if !sak.is_empty() {
        lines.push(format!("SAK={}", sak));
    }
}

fn describe_nfc_b(event: &TagEvent, lines: &mut Vec<String>) {
    lines.push("Type=Type B".to_string());
    let response = field_bytes("select_aid_response", event.select_aid_response.as_deref());
    if !response.is_empty() {
        lines.push(format!("SelectAID={}", get_hex(&response, false)));
    }
}

pub fn describe_tag(event: &TagEvent, table: &SignatureTable) -> String {
    let mut lines = Vec::new();
    let names: Vec<&str> = event
        .technologies
        .iter()
        .map(|t| short_tech_name(t))
        .collect();
    lines.push(format!("Technologies={}", names.join(", ")));

    for tech in &names {
        match *tech {
            TECH_NFC_A => describe_nfc_a(event, table, &mut lines),
            TECH_NFC_B => describe_nfc_b(event, &mut lines),
            TECH_NFC_F => lines.push("Type=Type F".to_string()),
            TECH_NFC_V => lines.push("Type=Type V".to_string()),
            TECH_NFC_BARCODE => match event.barcode_type {
                Some(BARCODE_TYPE_KOVIO) => lines.push("Type=KOVIO".to_string()),
                _ => lines.push("Type=Type Barcode".to_string()),
            },
            _ => {}
        }
    }

    let id = get_hex(&field_bytes("id", Some(event.id.as_str())), false);
    lines.push(format!("Tag id={}", id));
    lines.join("\n")
}
