use std::io::{BufRead, BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use serde_json::{json, Map, Value as Json};

use crate::channel::{snippet, ExecutionChannel, DEBUG_SERVER_INFO_HELPER};
use crate::debug::server::DEFAULT_SOCKET_TIMEOUT;
use crate::error::DebugClientError;

/// Preview arguments after router defaults and clamping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreviewArgs {
    pub name: String,
    pub max_rows: i64,
    pub max_cols: i64,
    pub row_offset: i64,
    pub col_offset: i64,
}

impl PreviewArgs {
    pub fn to_map(&self) -> Map<String, Json> {
        let mut args = Map::new();
        args.insert("name".to_string(), json!(self.name));
        args.insert("max_rows".to_string(), json!(self.max_rows));
        args.insert("max_cols".to_string(), json!(self.max_cols));
        args.insert("row_offset".to_string(), json!(self.row_offset));
        args.insert("col_offset".to_string(), json!(self.col_offset));
        args
    }
}

/// Talks to the in-target debug preview server over loopback TCP.
pub struct DebugPreviewClient {
    port: Option<u16>,
    timeout: Duration,
}

impl Default for DebugPreviewClient {
    fn default() -> Self {
        Self {
            port: None,
            timeout: DEFAULT_SOCKET_TIMEOUT,
        }
    }
}

impl DebugPreviewClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            port: None,
            timeout,
        }
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Cached port, else the one announced at bootstrap, else whatever the
    /// target reports through the server-info helper.
    pub fn ensure_port<C: ExecutionChannel + ?Sized>(&mut self, channel: &mut C) -> Option<u16> {
        if self.port.is_some() {
            return self.port;
        }
        if let Some(port) = channel.debug_port().filter(|port| *port > 0) {
            self.port = Some(port);
            return self.port;
        }
        match channel.run_and_collect(&snippet(DEBUG_SERVER_INFO_HELPER, &Map::new())) {
            Ok(info) => {
                let port = info
                    .get("port")
                    .and_then(Json::as_u64)
                    .and_then(|port| u16::try_from(port).ok())
                    .filter(|port| *port > 0);
                match port {
                    Some(port) => log::debug!("debug preview port set to {port}"),
                    None => log::debug!("debug preview port unavailable"),
                }
                self.port = port;
                port
            }
            Err(err) => {
                log::debug!("debug server info failed: {err}");
                None
            }
        }
    }

    pub fn request<C: ExecutionChannel + ?Sized>(
        &mut self,
        channel: &mut C,
        args: &PreviewArgs,
    ) -> Result<Json, DebugClientError> {
        let port = self
            .ensure_port(channel)
            .ok_or(DebugClientError::Unavailable)?;
        self.exchange(port, args)
    }

    fn exchange(&self, port: u16, args: &PreviewArgs) -> Result<Json, DebugClientError> {
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let mut stream = TcpStream::connect_timeout(&addr, self.timeout)?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;
        writeln!(stream, "{}", Json::Object(args.to_map()))?;
        stream.flush()?;
        stream.shutdown(Shutdown::Write)?;

        let mut line = String::new();
        BufReader::new(&stream).read_line(&mut line)?;
        if line.trim().is_empty() {
            return Err(DebugClientError::EmptyResponse);
        }
        let response: Json = serde_json::from_str(line.trim())?;
        let ok = response.get("ok").and_then(Json::as_bool).unwrap_or(false);
        match response.get("data") {
            Some(data) if ok && !data.is_null() => Ok(data.clone()),
            _ => Err(DebugClientError::Rejected(
                response
                    .get("error")
                    .and_then(Json::as_str)
                    .unwrap_or("debug preview failed")
                    .to_string(),
            )),
        }
    }
}
