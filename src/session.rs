// src/session.rs
//! Write session: at most one pending write request at a time.
//!
//! ```text
//! Idle --start_write--> AwaitingWriteCompletion
//! AwaitingWriteCompletion --complete | expire--> Idle
//! AwaitingWriteCompletion --start_write--> AwaitingWriteCompletion (superseded)
//! ```
//!
//! Time is passed in by the caller so the worker loop and the tests share
//! one clock.

use std::time::{Duration, Instant};

use log::{info, warn};

use crate::types::EncodeRequest;

pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingWriteCompletion {
        request: EncodeRequest,
        deadline: Instant,
    },
}

#[derive(Debug)]
pub struct WriteSession {
    state: SessionState,
    timeout: Duration,
}

impl WriteSession {
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: SessionState::Idle,
            timeout,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_awaiting(&self) -> bool {
        matches!(self.state, SessionState::AwaitingWriteCompletion { .. })
    }

    pub fn mode(&self) -> &'static str {
        if self.is_awaiting() { "WRITE" } else { "READ" }
    }

    pub fn deadline(&self) -> Option<Instant> {
        match &self.state {
            SessionState::Idle => None,
            SessionState::AwaitingWriteCompletion { deadline, .. } => Some(*deadline),
        }
    }

    /// Starts waiting for a tag to write `request` to. A request that was
    /// still pending is superseded and returned.
    pub fn start_write(&mut self, request: EncodeRequest, now: Instant) -> Option<EncodeRequest> {
        let deadline = now + self.timeout;
        let previous = std::mem::replace(
            &mut self.state,
            SessionState::AwaitingWriteCompletion { request, deadline },
        );
        match previous {
            SessionState::AwaitingWriteCompletion { request, .. } => {
                info!("Pending write superseded by a new request");
                Some(request)
            }
            SessionState::Idle => None,
        }
    }

    /// Takes the pending request and its deadline, returning to idle.
    pub fn complete(&mut self) -> Option<(EncodeRequest, Instant)> {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::AwaitingWriteCompletion { request, deadline } => Some((request, deadline)),
            SessionState::Idle => None,
        }
    }

    /// Abandons the pending request if its deadline has passed.
    pub fn expire(&mut self, now: Instant) -> Option<EncodeRequest> {
        match self.deadline() {
            Some(deadline) if now >= deadline => self.complete().map(|(request, _)| request),
            _ => None,
        }
    }
}

/// Radio on/off control supplied by the platform. Cycling the adapter
/// clears a tag connection left stuck by a timed-out write.
pub trait AdapterController {
    fn disable(&mut self) -> bool;
    fn enable(&mut self) -> bool;
}

pub fn reset_adapter(adapter: &mut dyn AdapterController) -> bool {
    warn!("Cycling NFC adapter after timed out write");
    let disabled = adapter.disable();
    let enabled = adapter.enable();
    if !(disabled && enabled) {
        warn!("Adapter reset incomplete (disable={}, enable={})", disabled, enabled);
    }
    disabled && enabled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordKind;
    use pretty_assertions::assert_eq;

    fn request(payload: &str) -> EncodeRequest {
        EncodeRequest {
            payload: payload.into(),
            kind: RecordKind::Text,
            locale: "en".into(),
        }
    }

    #[derive(Default)]
    struct RecordingAdapter {
        calls: Vec<&'static str>,
        fail_enable: bool,
    }

    impl AdapterController for RecordingAdapter {
        fn disable(&mut self) -> bool {
            self.calls.push("disable");
            true
        }

        fn enable(&mut self) -> bool {
            self.calls.push("enable");
            !self.fail_enable
        }
    }

    #[test]
    fn starts_idle_in_read_mode() {
        let session = WriteSession::new(DEFAULT_WRITE_TIMEOUT);
        assert_eq!(session.state(), &SessionState::Idle);
        assert_eq!(session.mode(), "READ");
        assert_eq!(session.deadline(), None);
    }

    #[test]
    fn start_then_complete() {
        let now = Instant::now();
        let mut session = WriteSession::new(Duration::from_secs(5));
        assert_eq!(session.start_write(request("a"), now), None);
        assert_eq!(session.mode(), "WRITE");
        assert_eq!(session.deadline(), Some(now + Duration::from_secs(5)));

        let (taken, deadline) = session.complete().unwrap();
        assert_eq!(taken, request("a"));
        assert_eq!(deadline, now + Duration::from_secs(5));
        assert_eq!(session.state(), &SessionState::Idle);
        assert_eq!(session.complete(), None);
    }

    #[test]
    fn new_write_supersedes_pending_one() {
        let now = Instant::now();
        let mut session = WriteSession::new(Duration::from_secs(5));
        session.start_write(request("old"), now);
        let later = now + Duration::from_secs(3);
        assert_eq!(session.start_write(request("new"), later), Some(request("old")));
        // deadline restarts with the new request
        assert_eq!(session.deadline(), Some(later + Duration::from_secs(5)));
        assert_eq!(session.complete().map(|(r, _)| r), Some(request("new")));
    }

    #[test]
    fn expires_only_after_deadline() {
        let now = Instant::now();
        let mut session = WriteSession::new(Duration::from_secs(5));
        session.start_write(request("a"), now);

        assert_eq!(session.expire(now + Duration::from_secs(4)), None);
        assert!(session.is_awaiting());

        assert_eq!(session.expire(now + Duration::from_secs(5)), Some(request("a")));
        assert_eq!(session.state(), &SessionState::Idle);
    }

    #[test]
    fn expire_when_idle_is_noop() {
        let mut session = WriteSession::new(DEFAULT_WRITE_TIMEOUT);
        assert_eq!(session.expire(Instant::now()), None);
    }

    #[test]
    fn reset_disables_then_enables() {
        let mut adapter = RecordingAdapter::default();
        assert!(reset_adapter(&mut adapter));
        assert_eq!(adapter.calls, vec!["disable", "enable"]);
    }

    #[test]
    fn reset_reports_partial_failure() {
        let mut adapter = RecordingAdapter {
            fail_enable: true,
            ..RecordingAdapter::default()
        };
        assert!(!reset_adapter(&mut adapter));
        assert_eq!(adapter.calls, vec!["disable", "enable"]);
    }
}
