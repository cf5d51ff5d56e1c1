// src/uri_prefix.rs

pub const NO_PREFIX: u8 = 0x00;

pub const URI_PREFIX_TABLE: [&str; 0x23] = [
    "",                           // 0x00
    "http://www.",                // 0x01
    "https://www.",               // 0x02
    "http://",                    // 0x03
    "https://",                   // 0x04
    "tel:",                       // 0x05
    "mailto:",                    // 0x06
    "ftp://anonymous:anonymous@", // 0x07
    "ftp://ftp.",                 // 0x08
    "ftps://",                    // 0x09
    "sftp://",                    // 0x0A
    "smb://",                     // 0x0B
    "nfs://",                     // 0x0C
    "ftp://",                     // 0x0D
    "dav://",                     // 0x0E
    "news:",                      // 0x0F
    "telnet://",                  // 0x10
    "imap:",                      // 0x11
    "rtsp://",                    // 0x12
    "urn:",                       // 0x13
    "pop:",                       // 0x14
    "sip:",                       // 0x15
    "sips:",                      // 0x16
    "tftp:",                      // 0x17
    "btspp://",                   // 0x18
    "btl2cap://",                 // 0x19
    "btgoep://",                  // 0x1A
    "tcpobex://",                 // 0x1B
    "irdaobex://",                // 0x1C
    "file://",                    // 0x1D
    "urn:epc:id:",                // 0x1E
    "urn:epc:tag:",               // 0x1F
    "urn:epc:pat:",               // 0x20
    "urn:epc:raw:",               // 0x21
    "urn:epc:",                   // 0x22
];

// RFU codes past the table fall back to no prefix
pub fn prefix_for(code: u8) -> &'static str {
    URI_PREFIX_TABLE
        .get(code as usize)
        .copied()
        .unwrap_or(URI_PREFIX_TABLE[NO_PREFIX as usize])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_all_defined_codes() {
        assert_eq!(URI_PREFIX_TABLE.len(), 0x23);
        assert_eq!(prefix_for(0x22), "urn:epc:");
    }

    #[test]
    fn known_codes() {
        assert_eq!(prefix_for(0x00), "");
        assert_eq!(prefix_for(0x03), "http://");
        assert_eq!(prefix_for(0x04), "https://");
        assert_eq!(prefix_for(0x06), "mailto:");
    }

    #[test]
    fn reserved_codes_fall_back_to_identity() {
        assert_eq!(prefix_for(0x23), "");
        assert_eq!(prefix_for(0xFF), "");
    }
}
