// src/virtual_tag.rs
// Memory holds the message inside an NDEF TLV. Each injected fault fails
// the next connect, write or format.

use log::debug;

use crate::error::TagIoError;
use crate::ndef;
use crate::tag_info::{TECH_NDEF_FORMATABLE, has_technology};
use crate::types::{NdefCapability, TagEvent};
use crate::write::{FormatableTech, NdefTech, WritableTag};

#[derive(Debug, Clone, Default)]
pub struct VirtualTag {
    ndef: Option<NdefCapability>,
    formatable: bool,
    memory: Vec<u8>,
    pending_faults: u32,
    writes: usize,
}

impl VirtualTag {
    /// A tag with no write capability at all.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ndef(writable: bool, max_size: usize) -> Self {
        Self {
            ndef: Some(NdefCapability { writable, max_size }),
            ..Self::default()
        }
    }

    pub fn unformatted() -> Self {
        Self {
            formatable: true,
            ..Self::default()
        }
    }

    /// Capabilities as reported in a discovery event: NDEF when the event
    /// carries an `ndef` block, formatable when the technology list says so.
    pub fn from_event(event: &TagEvent) -> Self {
        Self {
            ndef: event.ndef,
            formatable: has_technology(&event.technologies, TECH_NDEF_FORMATABLE),
            pending_faults: event.transient_faults,
            ..Self::default()
        }
    }

    pub fn with_transient_faults(mut self, faults: u32) -> Self {
        self.pending_faults = faults;
        self
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    pub fn ndef_message(&self) -> Option<Vec<u8>> {
        ndef::unwrap_tlv(&self.memory).ok()
    }

    /// Number of messages committed to memory.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    fn check_fault(&mut self, operation: &str) -> Result<(), TagIoError> {
        if self.pending_faults > 0 {
            self.pending_faults -= 1;
            debug!("Injected fault on {}", operation);
            return Err(TagIoError(format!("{} failed: tag lost", operation)));
        }
        Ok(())
    }

    fn store(&mut self, message: &[u8]) -> Result<(), TagIoError> {
        self.memory = ndef::wrap_in_tlv(message).map_err(|e| TagIoError(e.to_string()))?;
        self.writes += 1;
        Ok(())
    }
}

impl NdefTech for VirtualTag {
    fn connect(&mut self) -> Result<(), TagIoError> {
        self.check_fault("connect")
    }

    fn is_writable(&self) -> bool {
        self.ndef.is_some_and(|cap| cap.writable)
    }

    fn max_size(&self) -> usize {
        self.ndef.map_or(0, |cap| cap.max_size)
    }

    fn write_ndef_message(&mut self, message: &[u8]) -> Result<(), TagIoError> {
        self.check_fault("write")?;
        // Hardware refuses these too, whether or not the caller checked
        if !NdefTech::is_writable(self) || message.len() > NdefTech::max_size(self) {
            return Err(TagIoError("write rejected by tag".to_string()));
        }
        self.store(message)
    }
}

impl FormatableTech for VirtualTag {
    fn connect(&mut self) -> Result<(), TagIoError> {
        self.check_fault("connect")
    }

    fn format(&mut self, message: &[u8]) -> Result<(), TagIoError> {
        self.check_fault("format")?;
        self.store(message)
    }
}

impl WritableTag for VirtualTag {
    fn ndef(&mut self) -> Option<&mut dyn NdefTech> {
        if self.ndef.is_some() {
            Some(self)
        } else {
            None
        }
    }

    fn formatable(&mut self) -> Option<&mut dyn FormatableTech> {
        if self.formatable {
            Some(self)
        } else {
            None
        }
    }
}
