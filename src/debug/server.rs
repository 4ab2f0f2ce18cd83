use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde_json::{json, Value as Json};

use super::context::ContextSlot;
use crate::preview::PreviewRequest;
use crate::value::Namespace;

pub const DEFAULT_SOCKET_TIMEOUT: Duration = Duration::from_secs(2);
const MAX_REQUEST_BYTES: u64 = 64 * 1024;
const THREAD_NAME: &str = "varscope-debug-preview";

/// Loopback listener answering preview requests while the foreground
/// channel is blocked. One request line per connection.
pub struct DebugPreviewServer {
    slot: ContextSlot,
    fallback: Arc<Namespace>,
    read_timeout: Duration,
    port: Option<u16>,
    thread: Option<JoinHandle<()>>,
}

impl DebugPreviewServer {
    pub fn new(slot: ContextSlot, fallback: Arc<Namespace>) -> Self {
        Self {
            slot,
            fallback,
            read_timeout: DEFAULT_SOCKET_TIMEOUT,
            port: None,
            thread: None,
        }
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Starts the accept loop on first call and returns the bound port.
    /// Later calls return the same port. `None` when binding fails.
    pub fn ensure_running(&mut self) -> Option<u16> {
        if self.port.is_some() {
            return self.port;
        }
        match self.start() {
            Ok(port) => {
                log::debug!("debug preview server listening port={port}");
                self.port = Some(port);
                Some(port)
            }
            Err(err) => {
                log::warn!("debug preview server start failed: {err}");
                None
            }
        }
    }

    fn start(&mut self) -> io::Result<u16> {
        let listener = TcpListener::bind(("127.0.0.1", 0))?;
        let port = listener.local_addr()?.port();
        if port == 0 {
            return Err(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "listener yielded invalid port",
            ));
        }
        let slot = self.slot.clone();
        let fallback = Arc::clone(&self.fallback);
        let timeout = self.read_timeout;
        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || serve(listener, slot, fallback, timeout))?;
        self.thread = Some(handle);
        Ok(port)
    }
}

fn serve(listener: TcpListener, slot: ContextSlot, fallback: Arc<Namespace>, timeout: Duration) {
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                if let Err(err) = handle_connection(&stream, &slot, &fallback, timeout) {
                    log::debug!("debug preview server error: {err}");
                }
            }
            Err(err) => {
                log::warn!("debug preview server accept failed: {err}");
                break;
            }
        }
    }
}

fn handle_connection(
    stream: &TcpStream,
    slot: &ContextSlot,
    fallback: &Namespace,
    timeout: Duration,
) -> io::Result<()> {
    stream.set_read_timeout(Some(timeout))?;
    let mut line = Vec::new();
    BufReader::new(stream.take(MAX_REQUEST_BYTES)).read_until(b'\n', &mut line)?;
    if line.is_empty() {
        return Ok(());
    }
    let response = respond(&line, slot, fallback);
    let mut writer = stream;
    writeln!(writer, "{response}")?;
    writer.flush()
}

fn respond(line: &[u8], slot: &ContextSlot, fallback: &Namespace) -> Json {
    let text = String::from_utf8_lossy(line);
    match serde_json::from_str::<PreviewRequest>(text.trim()) {
        Ok(request) => {
            let preview = slot.compute(&request, Some(fallback));
            json!({ "ok": true, "data": preview.to_json() })
        }
        Err(err) => json!({ "ok": false, "error": format!("decode error: {err}") }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn decode_failures_are_reported() {
        let slot = ContextSlot::new();
        let reply = respond(b"{not json\n", &slot, &Namespace::new());
        assert_eq!(reply["ok"], false);
        assert!(reply["error"]
            .as_str()
            .is_some_and(|text| text.starts_with("decode error: ")));
    }

    #[test]
    fn non_string_names_fail_inside_the_payload() {
        let slot = ContextSlot::new();
        let mut globals = Namespace::new();
        globals.insert("x".to_string(), Value::Int(3));
        for line in [&b"{\"name\": null}\n"[..], &b"{\"name\": 7}\n"[..]] {
            let reply = respond(line, &slot, &globals);
            assert_eq!(reply["ok"], true);
            assert!(reply["data"]["error"].is_string());
        }
    }

    #[test]
    fn requests_fall_back_to_globals() {
        let slot = ContextSlot::new();
        let mut globals = Namespace::new();
        globals.insert("x".to_string(), Value::Int(3));
        let reply = respond(b"{\"name\": \"x\"}\n", &slot, &globals);
        assert_eq!(reply["ok"], true);
        assert_eq!(reply["data"]["repr"], "3");
    }

    #[test]
    fn ensure_running_is_idempotent() {
        let mut server = DebugPreviewServer::new(ContextSlot::new(), Arc::new(Namespace::new()));
        let first = server.ensure_running();
        assert!(first.is_some());
        assert_eq!(server.ensure_running(), first);
        assert!(server.is_running());
    }
}
