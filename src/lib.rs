pub mod config;
pub mod encoder;
pub mod error;
pub mod hexutil;
pub mod ndef;
pub mod nfc_service;
pub mod records;
pub mod session;
pub mod tag_info;
pub mod types;
pub mod uri_prefix;
pub mod virtual_tag;
pub mod write;
pub mod ws;
