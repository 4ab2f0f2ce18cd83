mod kernel;
mod local;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as Json};

use crate::error::ChannelError;

pub use kernel::KernelChannel;
pub use local::LocalChannel;

/// Printed by the bootstrap helper; the debug server port follows the colon.
pub const DEBUG_PORT_MARKER: &str = "__VARSCOPE_DEBUG_PORT__:";

pub const BOOTSTRAP_HELPER: &str = "__mi_bootstrap";
pub const SET_FILTERS_HELPER: &str = "__mi_set_filters";
pub const LIST_VARS_HELPER: &str = "__mi_list_vars";
pub const PREVIEW_HELPER: &str = "__mi_preview";
pub const DEBUG_PREVIEW_HELPER: &str = "__mi_debug_preview";
pub const DEBUG_SERVER_INFO_HELPER: &str = "__mi_debug_server_info";
pub const DEBUG_VARS_HELPER: &str = "__mi_debug_vars";

/// Runs a snippet inside the target session and returns its stdout decoded
/// as one JSON document.
pub trait ExecutionChannel {
    fn run_and_collect(&mut self, code: &str) -> Result<Json, ChannelError>;

    /// Port of the in-target debug preview server, when one is running.
    fn debug_port(&self) -> Option<u16> {
        None
    }
}

impl<C: ExecutionChannel + ?Sized> ExecutionChannel for Box<C> {
    fn run_and_collect(&mut self, code: &str) -> Result<Json, ChannelError> {
        (**self).run_and_collect(code)
    }

    fn debug_port(&self) -> Option<u16> {
        (**self).debug_port()
    }
}

/// `<helper>(<json-object>)`
pub fn snippet(helper: &str, args: &Map<String, Json>) -> String {
    format!("{helper}({})", Json::Object(args.clone()))
}

pub fn bootstrap_snippet(debug: bool) -> String {
    let mut args = Map::new();
    args.insert("debug".to_string(), Json::Bool(debug));
    snippet(BOOTSTRAP_HELPER, &args)
}

/// Reads the port announced by the bootstrap helper. `None` when the marker
/// is missing or the target reported no server.
pub fn parse_port_marker(stdout: &str) -> Option<u16> {
    stdout
        .lines()
        .find_map(|line| line.trim().strip_prefix(DEBUG_PORT_MARKER))
        .and_then(|port| port.trim().parse().ok())
}

pub fn parse_payload(stdout: &str) -> Result<Json, ChannelError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(ChannelError::EmptyPayload);
    }
    Ok(serde_json::from_str(trimmed)?)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub msg_id: String,
    pub code: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    Iopub,
    Shell,
}

/// Exception raised by a snippet inside the target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteFault {
    pub ename: String,
    pub evalue: String,
    pub traceback: Vec<String>,
}

impl RemoteFault {
    pub fn new(ename: impl Into<String>, evalue: impl Into<String>, code: &str) -> Self {
        let ename = ename.into();
        let evalue = evalue.into();
        let traceback = vec![
            "Traceback (most recent call last):".to_string(),
            format!("  snippet: {code}"),
            format!("{ename}: {evalue}"),
        ];
        Self {
            ename,
            evalue,
            traceback,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub parent: String,
    pub channel: Stream,
    pub msg_type: String,
    #[serde(default)]
    pub content: Json,
}

impl ChannelMessage {
    pub fn stdout(parent: &str, text: &str) -> Self {
        Self::iopub(parent, "stream", json!({ "name": "stdout", "text": text }))
    }

    pub fn error(parent: &str, fault: &RemoteFault) -> Self {
        Self::iopub(
            parent,
            "error",
            json!({
                "ename": fault.ename,
                "evalue": fault.evalue,
                "traceback": fault.traceback,
            }),
        )
    }

    pub fn status(parent: &str, state: &str) -> Self {
        Self::iopub(parent, "status", json!({ "execution_state": state }))
    }

    pub fn execute_reply(parent: &str, fault: Option<&RemoteFault>) -> Self {
        let content = match fault {
            Some(fault) => json!({
                "status": "error",
                "ename": fault.ename,
                "evalue": fault.evalue,
            }),
            None => json!({ "status": "ok" }),
        };
        Self {
            parent: parent.to_string(),
            channel: Stream::Shell,
            msg_type: "execute_reply".to_string(),
            content,
        }
    }

    fn iopub(parent: &str, msg_type: &str, content: Json) -> Self {
        Self {
            parent: parent.to_string(),
            channel: Stream::Iopub,
            msg_type: msg_type.to_string(),
            content,
        }
    }

    fn content_str(&self, key: &str) -> Option<&str> {
        self.content.get(key).and_then(Json::as_str)
    }
}
