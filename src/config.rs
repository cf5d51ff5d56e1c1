// src/config.rs
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::error::SignatureError;
use crate::tag_info::{DEFAULT_SIGNATURES, SignatureTable};
use crate::write::WritePolicy;

/// NDEF read/write bridge service
#[derive(Parser, Debug, Clone)]
#[command(name = "ndef-rw-service", version)]
pub struct ServiceConfig {
    /// WebSocket listen address
    #[arg(long, env = "NDEF_BIND", default_value = "127.0.0.1:3500")]
    pub bind: SocketAddr,

    /// How long a write request waits for a tag before it is abandoned
    #[arg(long, env = "NDEF_WRITE_TIMEOUT_MS", default_value_t = 5000)]
    pub write_timeout_ms: u64,

    /// Delay before retrying a write that hit an I/O fault
    #[arg(long, env = "NDEF_RETRY_DELAY_MS", default_value_t = 500)]
    pub retry_delay_ms: u64,

    /// Language code for text records when the request carries none
    #[arg(long, env = "NDEF_LOCALE", default_value = "en")]
    pub locale: String,

    /// JSON tag signature table to use instead of the built-in one
    #[arg(long, env = "NDEF_SIGNATURES")]
    pub signatures: Option<PathBuf>,
}

impl ServiceConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn write_policy(&self) -> WritePolicy {
        WritePolicy {
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    pub fn signature_table(&self) -> Result<SignatureTable, SignatureError> {
        match &self.signatures {
            Some(path) => SignatureTable::load(path),
            None => Ok(DEFAULT_SIGNATURES.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let config = ServiceConfig::try_parse_from(["ndef-rw-service"]).unwrap();
        assert_eq!(config.bind, "127.0.0.1:3500".parse::<SocketAddr>().unwrap());
        assert_eq!(config.write_timeout(), Duration::from_secs(5));
        assert_eq!(config.write_policy().retry_delay, Duration::from_millis(500));
        assert_eq!(config.locale, "en");
        assert!(!config.signature_table().unwrap().is_empty());
    }

    #[test]
    fn flags_override_defaults() {
        let config = ServiceConfig::try_parse_from([
            "ndef-rw-service",
            "--bind",
            "0.0.0.0:9000",
            "--write-timeout-ms",
            "250",
            "--locale",
            "ja",
        ])
        .unwrap();
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.write_timeout(), Duration::from_millis(250));
        assert_eq!(config.locale, "ja");
    }

    #[test]
    fn missing_signature_file_is_reported() {
        let config = ServiceConfig::try_parse_from([
            "ndef-rw-service",
            "--signatures",
            "/nonexistent/tags.json",
        ])
        .unwrap();
        assert!(config.signature_table().is_err());
    }
}
