// src/write.rs

use std::thread;
use std::time::Duration;

use log::{info, warn};

use crate::error::{TagIoError, WriteError};

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

pub trait NdefTech {
    fn connect(&mut self) -> Result<(), TagIoError>;
    fn is_writable(&self) -> bool;
    fn max_size(&self) -> usize;
    fn write_ndef_message(&mut self, message: &[u8]) -> Result<(), TagIoError>;
}

pub trait FormatableTech {
    fn connect(&mut self) -> Result<(), TagIoError>;
    fn format(&mut self, message: &[u8]) -> Result<(), TagIoError>;
}

pub trait WritableTag {
    fn ndef(&mut self) -> Option<&mut dyn NdefTech>;
    fn formatable(&mut self) -> Option<&mut dyn FormatableTech>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WritePolicy {
    /// Pause before the single retry after an I/O fault
    pub retry_delay: Duration,
}

impl Default for WritePolicy {
    fn default() -> Self {
        Self {
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Writes `message` through whichever capability the tag has, NDEF first.
/// An I/O fault on the NDEF path is retried once after `policy.retry_delay`.
pub fn write_message(
    tag: &mut dyn WritableTag,
    message: &[u8],
    policy: &WritePolicy,
) -> Result<(), WriteError> {
    if message.is_empty() {
        return Err(WriteError::EmptyMessage);
    }

    if let Some(ndef) = tag.ndef() {
        return match write_ndef(ndef, message) {
            Err(WriteError::Io(e)) => {
                warn!("{}; retrying in {:?}", e, policy.retry_delay);
                thread::sleep(policy.retry_delay);
                retry_ndef_write(tag, message)
            }
            other => other,
        };
    }

    if let Some(formatable) = tag.formatable() {
        return format_with_message(formatable, message);
    }

    Err(WriteError::UnsupportedCapability)
}

fn write_ndef(ndef: &mut dyn NdefTech, message: &[u8]) -> Result<(), WriteError> {
    ndef.connect()?;
    if !ndef.is_writable() {
        return Err(WriteError::ReadOnly);
    }
    if ndef.max_size() < message.len() {
        return Err(WriteError::CapacityExceeded {
            size: message.len(),
            max: ndef.max_size(),
        });
    }
    ndef.write_ndef_message(message)?;
    info!("Wrote {} byte NDEF message", message.len());
    Ok(())
}

fn format_with_message(formatable: &mut dyn FormatableTech, message: &[u8]) -> Result<(), WriteError> {
    formatable.connect()?;
    formatable.format(message)?;
    info!("Formatted tag with {} byte NDEF message", message.len());
    Ok(())
}

// Reconnects and re-checks, the fault may have hit before the guards ran
fn retry_ndef_write(tag: &mut dyn WritableTag, message: &[u8]) -> Result<(), WriteError> {
    let ndef = tag.ndef().ok_or(WriteError::UnsupportedCapability)?;
    let result = write_ndef(ndef, message);
    if let Err(e) = &result {
        warn!("Retry failed: {}", e);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::create_uri_record;
    use crate::ndef::encode_message;
    use crate::virtual_tag::VirtualTag;
    use pretty_assertions::assert_eq;

    fn no_delay() -> WritePolicy {
        WritePolicy {
            retry_delay: Duration::ZERO,
        }
    }

    #[test]
    fn writes_when_message_fits() {
        let mut tag = VirtualTag::with_ndef(true, 100);
        let message = vec![0xAB; 50];
        assert_eq!(write_message(&mut tag, &message, &no_delay()), Ok(()));
        assert_eq!(tag.ndef_message(), Some(message));
        assert_eq!(tag.write_count(), 1);
    }

    #[test]
    fn rejects_message_larger_than_capacity_without_writing() {
        let mut tag = VirtualTag::with_ndef(true, 10);
        let result = write_message(&mut tag, &[0xAB; 50], &no_delay());
        assert_eq!(result, Err(WriteError::CapacityExceeded { size: 50, max: 10 }));
        assert_eq!(tag.write_count(), 0);
        assert!(tag.memory().is_empty());
    }

    #[test]
    fn rejects_read_only_tag() {
        let mut tag = VirtualTag::with_ndef(false, 100);
        assert_eq!(
            write_message(&mut tag, &[0x01], &no_delay()),
            Err(WriteError::ReadOnly)
        );
        assert_eq!(tag.write_count(), 0);
    }

    #[test]
    fn exact_capacity_fits() {
        let mut tag = VirtualTag::with_ndef(true, 8);
        let message = encode_message(&[create_uri_record("a:b")]);
        assert_eq!(message.len(), 8);
        assert_eq!(write_message(&mut tag, &message, &no_delay()), Ok(()));
    }

    #[test]
    fn formats_blank_tag_without_size_check() {
        let mut tag = VirtualTag::unformatted();
        let message = vec![0x11; 600];
        assert_eq!(write_message(&mut tag, &message, &no_delay()), Ok(()));
        assert_eq!(tag.ndef_message(), Some(message));
    }

    #[test]
    fn format_fault_is_not_retried() {
        let mut tag = VirtualTag::unformatted().with_transient_faults(1);
        assert!(matches!(
            write_message(&mut tag, &[0x01], &no_delay()),
            Err(WriteError::Io(_))
        ));
        assert_eq!(tag.write_count(), 0);
    }

    #[test]
    fn tag_without_capabilities_fails_immediately() {
        let mut tag = VirtualTag::new();
        assert_eq!(
            write_message(&mut tag, &[0x01], &no_delay()),
            Err(WriteError::UnsupportedCapability)
        );
    }

    #[test]
    fn empty_message_is_refused() {
        let mut tag = VirtualTag::with_ndef(true, 100);
        assert_eq!(
            write_message(&mut tag, &[], &no_delay()),
            Err(WriteError::EmptyMessage)
        );
    }

    #[test]
    fn single_io_fault_is_retried() {
        let mut tag = VirtualTag::with_ndef(true, 100).with_transient_faults(1);
        assert_eq!(write_message(&mut tag, &[0x42; 4], &no_delay()), Ok(()));
        assert_eq!(tag.write_count(), 1);
        assert_eq!(tag.ndef_message(), Some(vec![0x42; 4]));
    }

    /// NDEF handle that trusts the caller to size-check and whose first
    /// connect fails.
    struct UncheckedTag {
        max_size: usize,
        connect_faults: u32,
        written: Option<Vec<u8>>,
    }

    impl NdefTech for UncheckedTag {
        fn connect(&mut self) -> Result<(), TagIoError> {
            if self.connect_faults > 0 {
                self.connect_faults -= 1;
                return Err(TagIoError("connect failed".into()));
            }
            Ok(())
        }

        fn is_writable(&self) -> bool {
            true
        }

        fn max_size(&self) -> usize {
            self.max_size
        }

        fn write_ndef_message(&mut self, message: &[u8]) -> Result<(), TagIoError> {
            self.written = Some(message.to_vec());
            Ok(())
        }
    }

    impl WritableTag for UncheckedTag {
        fn ndef(&mut self) -> Option<&mut dyn NdefTech> {
            Some(self)
        }

        fn formatable(&mut self) -> Option<&mut dyn FormatableTech> {
            None
        }
    }

    #[test]
    fn retry_after_connect_fault_still_checks_capacity() {
        let mut tag = UncheckedTag {
            max_size: 10,
            connect_faults: 1,
            written: None,
        };
        assert_eq!(
            write_message(&mut tag, &[0xAB; 50], &no_delay()),
            Err(WriteError::CapacityExceeded { size: 50, max: 10 })
        );
        assert_eq!(tag.written, None);
    }

    #[test]
    fn retry_after_connect_fault_writes_fitting_message() {
        let mut tag = UncheckedTag {
            max_size: 10,
            connect_faults: 1,
            written: None,
        };
        assert_eq!(write_message(&mut tag, &[0xAB; 4], &no_delay()), Ok(()));
        assert_eq!(tag.written, Some(vec![0xAB; 4]));
    }

    #[test]
    fn retry_happens_only_once() {
        let mut tag = VirtualTag::with_ndef(true, 100).with_transient_faults(2);
        assert!(matches!(
            write_message(&mut tag, &[0x42; 4], &no_delay()),
            Err(WriteError::Io(_))
        ));
        assert_eq!(tag.write_count(), 0);
    }
}
