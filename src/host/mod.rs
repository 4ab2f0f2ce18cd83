//! The target side of the bridge: a session owning a namespace, executing
//! helper snippets and serving the channel wire protocol.

mod helpers;

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use serde_json::{Map, Value as Json};

use crate::channel::{ChannelMessage, ExecuteRequest, RemoteFault};
use crate::config::{BridgeConfig, PreviewLimits};
use crate::debug::{ContextSlot, DebugPreviewServer};
use crate::snapshot::Filters;
use crate::value::Namespace;

pub use helpers::{Func, HelperRegistry};

pub struct Session {
    globals: Arc<Namespace>,
    filters: Filters,
    limits: PreviewLimits,
    slot: ContextSlot,
    server: DebugPreviewServer,
    helpers: HelperRegistry,
}

impl Session {
    pub fn new(globals: Namespace) -> Self {
        Self::with_config(globals, &BridgeConfig::default())
    }

    pub fn with_config(globals: Namespace, config: &BridgeConfig) -> Self {
        let globals = Arc::new(globals);
        let slot = ContextSlot::new();
        let server = DebugPreviewServer::new(slot.clone(), Arc::clone(&globals))
            .with_read_timeout(config.timeouts.socket);
        Self {
            globals,
            filters: config.filters.clone(),
            limits: config.preview.clone(),
            slot,
            server,
            helpers: HelperRegistry::with_builtins(),
        }
    }

    pub fn globals(&self) -> &Namespace {
        &self.globals
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn limits(&self) -> &PreviewLimits {
        &self.limits
    }

    pub fn context_slot(&self) -> &ContextSlot {
        &self.slot
    }

    pub fn helpers(&self) -> &HelperRegistry {
        &self.helpers
    }

    pub fn ensure_debug_server(&mut self) -> Option<u16> {
        self.server.ensure_running()
    }

    pub fn debug_port(&self) -> Option<u16> {
        self.server.port()
    }

    /// Runs one `<helper>(<json-object>)` snippet and returns what it printed.
    pub fn execute(&mut self, code: &str) -> Result<String, RemoteFault> {
        let (name, args) =
            parse_snippet(code).map_err(|reason| RemoteFault::new("SyntaxError", reason, code))?;
        let func = self.helpers.get(name).ok_or_else(|| {
            RemoteFault::new("NameError", format!("name '{name}' is not defined"), code)
        })?;
        log::debug!("executing helper {name}");
        let printed = func
            .call(self, args)
            .map_err(|err| RemoteFault::new("HelperError", err.to_string(), code))?;
        Ok(match printed {
            Json::Null => String::new(),
            Json::String(text) => format!("{text}\n"),
            other => format!("{other}\n"),
        })
    }
}

fn parse_snippet(code: &str) -> Result<(&str, Map<String, Json>), String> {
    let code = code.trim();
    let (name, rest) = code
        .split_once('(')
        .ok_or_else(|| "invalid syntax".to_string())?;
    let name = name.trim();
    let valid_name = name
        .chars()
        .next()
        .is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_')
        && name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if !valid_name {
        return Err("invalid syntax".to_string());
    }
    let body = rest
        .strip_suffix(')')
        .ok_or_else(|| "'(' was never closed".to_string())?
        .trim();
    if body.is_empty() {
        return Ok((name, Map::new()));
    }
    match serde_json::from_str(body) {
        Ok(Json::Object(args)) => Ok((name, args)),
        Ok(_) => Err("helper arguments must be an object".to_string()),
        Err(err) => Err(format!("invalid arguments: {err}")),
    }
}

fn send<W: Write>(writer: &mut W, message: &ChannelMessage) -> io::Result<()> {
    let line = serde_json::to_string(message).map_err(io::Error::other)?;
    writeln!(writer, "{line}")?;
    writer.flush()
}

/// Serves execute requests read from `reader` until EOF, answering each
/// with busy/stream/error/idle on iopub followed by a shell reply.
pub fn serve_channel<R, W>(session: &mut Session, reader: R, mut writer: W) -> io::Result<()>
where
    R: BufRead,
    W: Write,
{
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let request: ExecuteRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(err) => {
                log::warn!("ignoring undecodable execute request: {err}");
                continue;
            }
        };
        let parent = request.msg_id.as_str();
        send(&mut writer, &ChannelMessage::status(parent, "busy"))?;
        let outcome = session.execute(&request.code);
        match &outcome {
            Ok(stdout) if !stdout.is_empty() => {
                send(&mut writer, &ChannelMessage::stdout(parent, stdout))?
            }
            Ok(_) => {}
            Err(fault) => send(&mut writer, &ChannelMessage::error(parent, fault))?,
        }
        send(&mut writer, &ChannelMessage::status(parent, "idle"))?;
        send(
            &mut writer,
            &ChannelMessage::execute_reply(parent, outcome.as_ref().err()),
        )?;
    }
    log::debug!("channel input closed");
    Ok(())
}
