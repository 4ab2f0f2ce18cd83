use serde_json::Value as Json;

use super::{bootstrap_snippet, parse_payload, parse_port_marker, ExecutionChannel};
use crate::error::ChannelError;
use crate::host::Session;

/// Runs snippets against a session living in the same process.
pub struct LocalChannel {
    session: Session,
    debug_port: Option<u16>,
}

impl LocalChannel {
    /// Bootstraps the session the way a freshly connected kernel is.
    pub fn new(session: Session, debug: bool) -> Result<Self, ChannelError> {
        let mut channel = Self {
            session,
            debug_port: None,
        };
        let stdout = channel.execute(&bootstrap_snippet(debug))?;
        channel.debug_port = parse_port_marker(&stdout);
        log::debug!("local channel ready debug_port={:?}", channel.debug_port);
        Ok(channel)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    fn execute(&mut self, code: &str) -> Result<String, ChannelError> {
        self.session
            .execute(code)
            .map_err(|fault| ChannelError::Remote(fault.traceback.join("\n")))
    }
}

impl ExecutionChannel for LocalChannel {
    fn run_and_collect(&mut self, code: &str) -> Result<Json, ChannelError> {
        let stdout = self.execute(code)?;
        parse_payload(&stdout)
    }

    fn debug_port(&self) -> Option<u16> {
        self.debug_port
    }
}
