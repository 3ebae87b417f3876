//! In-memory backend that records dispatched input.

use super::{OutputChannel, SessionBackend, SessionSummary};
use crate::error::{BridgeError, BridgeResult};
use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Default)]
pub(crate) struct RecordingBackend {
    sessions: Mutex<HashSet<String>>,
    literals: Mutex<Vec<String>>,
    named: Mutex<Vec<String>>,
}

impl RecordingBackend {
    pub(crate) fn with_session(name: &str) -> Self {
        let backend = Self::default();
        backend.sessions.lock().unwrap().insert(name.to_string());
        backend
    }

    pub(crate) fn literals(&self) -> Vec<String> {
        self.literals.lock().unwrap().clone()
    }

    pub(crate) fn named(&self) -> Vec<String> {
        self.named.lock().unwrap().clone()
    }

    fn require(&self, name: &str) -> BridgeResult<()> {
        if self.exists(name) {
            Ok(())
        } else {
            Err(BridgeError::NotFound(name.to_string()))
        }
    }
}

impl SessionBackend for RecordingBackend {
    fn exists(&self, name: &str) -> bool {
        self.sessions.lock().unwrap().contains(name)
    }

    fn create(&self, name: &str, _workdir: &str, _start_command: &str) -> BridgeResult<()> {
        if !self.sessions.lock().unwrap().insert(name.to_string()) {
            return Err(BridgeError::AlreadyExists(name.to_string()));
        }
        Ok(())
    }

    fn capture(&self, _name: &str, _max_lines: usize) -> String {
        String::new()
    }

    fn send_literal(&self, name: &str, data: &str) -> BridgeResult<()> {
        self.require(name)?;
        self.literals.lock().unwrap().push(data.to_string());
        Ok(())
    }

    fn send_named(&self, name: &str, key: &str) -> BridgeResult<()> {
        self.require(name)?;
        self.named.lock().unwrap().push(key.to_string());
        Ok(())
    }

    fn kill(&self, name: &str) -> bool {
        self.sessions.lock().unwrap().remove(name)
    }

    fn resize(&self, name: &str, _cols: u16, _rows: u16) -> bool {
        self.exists(name)
    }

    fn output_channel(&self, _name: &str) -> Option<OutputChannel> {
        None
    }

    fn list_sessions(&self, prefix: &str) -> Vec<SessionSummary> {
        self.sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.starts_with(prefix))
            .map(|n| SessionSummary {
                name: n.clone(),
                attached: false,
            })
            .collect()
    }

    fn backend_name(&self) -> &str {
        "recording"
    }
}
