// src/nfc_service.rs

use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info, warn};

use crate::encoder;
use crate::error::WriteError;
use crate::hexutil::{get_hex, parse_hex};
use crate::records::{decode_message_bytes, render_records};
use crate::session::{AdapterController, WriteSession, reset_adapter};
use crate::tag_info::{SignatureTable, TECH_NDEF, TECH_NDEF_FORMATABLE, describe_tag, has_technology};
use crate::types::{EncodeRequest, NfcCommand, OutgoingMessage, TagEvent};
use crate::virtual_tag::VirtualTag;
use crate::write::{WritePolicy, write_message};

const MSG_WRITE_OK: &str = "NFC write completed successfully";
const MSG_NOT_WRITABLE: &str = "This tag is not writable (NDEF not supported)";

/// Forwards adapter resets to bridge clients; the platform behind the
/// bridge owns the radio and performs the actual power cycle.
pub struct BridgeAdapter {
    tx: Sender<OutgoingMessage>,
}

impl BridgeAdapter {
    pub fn new(tx: Sender<OutgoingMessage>) -> Self {
        Self { tx }
    }

    fn set_enabled(&mut self, enabled: bool) -> bool {
        self.tx.send(OutgoingMessage::AdapterReset { enabled }).is_ok()
    }
}

impl AdapterController for BridgeAdapter {
    fn disable(&mut self) -> bool {
        self.set_enabled(false)
    }

    fn enable(&mut self) -> bool {
        self.set_enabled(true)
    }
}

/// Rendered result of one discovery: the tag description block followed
/// by one line per decoded record.
pub fn read_message(event: &TagEvent, table: &SignatureTable) -> Vec<String> {
    let messages: Vec<Vec<u8>> = event
        .messages
        .iter()
        .filter_map(|raw| match parse_hex(raw) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("Skipping NDEF message: {}", e);
                None
            }
        })
        .collect();

    let mut lines = vec![describe_tag(event, table)];
    lines.extend(render_records(&decode_message_bytes(&messages)));
    lines
}

pub struct NfcService {
    tx: Sender<OutgoingMessage>,
    session: WriteSession,
    table: SignatureTable,
    policy: WritePolicy,
    adapter: Box<dyn AdapterController + Send>,
}

impl NfcService {
    pub fn new(
        tx: Sender<OutgoingMessage>,
        session: WriteSession,
        table: SignatureTable,
        policy: WritePolicy,
        adapter: Box<dyn AdapterController + Send>,
    ) -> Self {
        Self {
            tx,
            session,
            table,
            policy,
            adapter,
        }
    }

    pub fn session(&self) -> &WriteSession {
        &self.session
    }

    fn send(&self, msg: OutgoingMessage) {
        if self.tx.send(msg).is_err() {
            debug!("No listener for outgoing message");
        }
    }

    pub fn handle(&mut self, cmd: NfcCommand, now: Instant) {
        match cmd {
            NfcCommand::CheckStatus => self.send(OutgoingMessage::ServiceStatus {
                mode: self.session.mode().to_string(),
            }),
            NfcCommand::Encode(request) => self.handle_encode(&request),
            NfcCommand::StartWrite(request) => {
                info!("Write requested ({:?}), waiting for tag", request.kind);
                self.session.start_write(request, now);
                self.send(OutgoingMessage::WritePending {
                    timeout_ms: self.session.timeout().as_millis() as u64,
                });
            }
            NfcCommand::TagDiscovered(event) => {
                if self.session.is_awaiting() {
                    self.handle_write(&event, now);
                } else {
                    self.handle_read(&event);
                }
            }
        }
    }

    /// Called when the receive deadline passes with no tag.
    pub fn handle_timeout(&mut self, now: Instant) {
        if let Some(request) = self.session.expire(now) {
            warn!("Write of {:?} record timed out waiting for a tag", request.kind);
            self.fail_write(WriteError::Timeout);
        }
    }

    fn handle_encode(&self, request: &EncodeRequest) {
        let reply = match encoder::encode(request) {
            Ok(bytes) if bytes.is_empty() => OutgoingMessage::Error {
                error: WriteError::EmptyMessage.to_string(),
            },
            Ok(bytes) => OutgoingMessage::Encoded {
                data: get_hex(&bytes, false),
            },
            Err(e) => {
                warn!("Encode failed: {}", e);
                OutgoingMessage::Error {
                    error: e.to_string(),
                }
            }
        };
        self.send(reply);
    }

    fn handle_read(&self, event: &TagEvent) {
        let lines = read_message(event, &self.table);
        info!("Read tag with {} record(s)", lines.len() - 1);
        self.send(OutgoingMessage::DataReadSuccess {
            data: lines.join("\n"),
            lines,
        });
    }

    fn handle_write(&mut self, event: &TagEvent, now: Instant) {
        let Some((request, deadline)) = self.session.complete() else {
            return;
        };

        let technologies = &event.technologies;
        if !has_technology(technologies, TECH_NDEF)
            && !has_technology(technologies, TECH_NDEF_FORMATABLE)
        {
            self.send(OutgoingMessage::DataWriteError {
                error: MSG_NOT_WRITABLE.to_string(),
            });
            return;
        }

        let message = match encoder::encode(&request) {
            Ok(message) => message,
            Err(e) => {
                self.fail_write(e.into());
                return;
            }
        };
        let mut tag = VirtualTag::from_event(event);
        let started = Instant::now();
        let result = write_message(&mut tag, &message, &self.policy);

        // A write that lands after the deadline is still a timeout
        let finished = now + started.elapsed();
        let result = match result {
            Ok(()) if finished > deadline => Err(WriteError::Timeout),
            other => other,
        };

        match result {
            Ok(()) => {
                info!("{}", MSG_WRITE_OK);
                self.send(OutgoingMessage::DataWriteSuccess {
                    message: MSG_WRITE_OK.to_string(),
                    data: get_hex(tag.memory(), false),
                });
            }
            Err(e) => self.fail_write(e),
        }
    }

    fn fail_write(&mut self, e: WriteError) {
        error!("NFC write failed: {}", e);
        if e == WriteError::Timeout {
            reset_adapter(self.adapter.as_mut());
        }
        self.send(OutgoingMessage::DataWriteError {
            error: format!("NFC write failed: {}", e),
        });
    }
}

pub fn run(mut service: NfcService, rx: Receiver<NfcCommand>) {
    info!("Starting NFC Service...");

    loop {
        let received = match service.session().deadline() {
            Some(deadline) => rx.recv_deadline(deadline),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(cmd) => service.handle(cmd, Instant::now()),
            Err(RecvTimeoutError::Timeout) => service.handle_timeout(Instant::now()),
            Err(RecvTimeoutError::Disconnected) => {
                info!("Command channel closed, NFC service stopping");
                break;
            }
        }
    }
}
