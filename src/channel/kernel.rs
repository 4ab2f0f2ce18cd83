use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context as AnyhowContext};
use serde_json::Value as Json;

use super::{
    bootstrap_snippet, parse_payload, parse_port_marker, ChannelMessage, ExecuteRequest,
    ExecutionChannel, Stream,
};
use crate::config::Timeouts;
use crate::error::ChannelError;

const READER_THREAD: &str = "varscope-channel-reader";

struct Collected {
    stdout: String,
    /// `None` when the shell reply did not arrive in time.
    reply: Option<ChannelMessage>,
}

/// Line-JSON transport to a target host process. A reader thread splits
/// incoming messages into iopub and shell queues; every wait is bounded.
pub struct KernelChannel {
    writer: Box<dyn Write + Send>,
    iopub: Receiver<ChannelMessage>,
    shell: Receiver<ChannelMessage>,
    timeouts: Timeouts,
    next_id: u64,
    debug_port: Option<u16>,
    child: Option<Child>,
}

impl KernelChannel {
    /// Spawns `command` with piped stdin/stdout; its stderr is inherited.
    pub fn spawn(command: &[String], timeouts: Timeouts) -> anyhow::Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| anyhow!("host command is empty"))?;
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("unable to start host process: {program}"))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("host stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("host stdout unavailable"))?;
        let mut channel = Self::from_streams(stdout, stdin, timeouts)?;
        channel.child = Some(child);
        Ok(channel)
    }

    pub fn from_streams<R, W>(reader: R, writer: W, timeouts: Timeouts) -> anyhow::Result<Self>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let (iopub_tx, iopub) = mpsc::channel();
        let (shell_tx, shell) = mpsc::channel();
        thread::Builder::new()
            .name(READER_THREAD.to_string())
            .spawn(move || route_messages(reader, iopub_tx, shell_tx))
            .context("unable to start channel reader thread")?;
        Ok(Self {
            writer: Box::new(writer),
            iopub,
            shell,
            timeouts,
            next_id: 0,
            debug_port: None,
            child: None,
        })
    }

    /// Sends the bootstrap snippet and records the announced debug port.
    pub fn connect(&mut self, debug: bool) -> Result<Option<u16>, ChannelError> {
        let wait = self.timeouts.handshake;
        let collected = self.execute(&bootstrap_snippet(debug), wait, wait)?;
        if let Some(reply) = &collected.reply {
            check_reply(reply)?;
        }
        self.debug_port = parse_port_marker(&collected.stdout);
        log::debug!("kernel channel connected debug_port={:?}", self.debug_port);
        Ok(self.debug_port)
    }

    fn next_msg_id(&mut self) -> String {
        self.next_id += 1;
        format!("varscope-{}-{}", std::process::id(), self.next_id)
    }

    fn execute(&mut self, code: &str, drain: Duration, shell: Duration) -> Result<Collected, ChannelError> {
        let msg_id = self.next_msg_id();
        let request = ExecuteRequest {
            msg_id: msg_id.clone(),
            code: code.to_string(),
        };
        let line = serde_json::to_string(&request)?;
        writeln!(self.writer, "{line}")?;
        self.writer.flush()?;

        let mut stdout = String::new();
        let deadline = Instant::now() + drain;
        loop {
            let now = Instant::now();
            if now >= deadline {
                log::debug!("iopub drain timed out msg_id={msg_id}");
                break;
            }
            let wait = self.timeouts.poll.min(deadline - now);
            match self.iopub.recv_timeout(wait) {
                Ok(message) if message.parent != msg_id => continue,
                Ok(message) => match message.msg_type.as_str() {
                    "stream" if message.content_str("name") == Some("stdout") => {
                        stdout.push_str(message.content_str("text").unwrap_or_default());
                    }
                    "error" => return Err(ChannelError::Remote(traceback_text(&message.content))),
                    "status" if message.content_str("execution_state") == Some("idle") => break,
                    _ => {}
                },
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Err(ChannelError::Closed),
            }
        }

        let reply = self.wait_reply(&msg_id, shell)?;
        Ok(Collected { stdout, reply })
    }

    fn wait_reply(&self, msg_id: &str, timeout: Duration) -> Result<Option<ChannelMessage>, ChannelError> {
        let deadline = Instant::now() + timeout;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            match self.shell.recv_timeout(deadline - now) {
                Ok(message) if message.parent == msg_id => return Ok(Some(message)),
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => return Err(ChannelError::Closed),
            }
        }
    }
}

impl ExecutionChannel for KernelChannel {
    fn run_and_collect(&mut self, code: &str) -> Result<Json, ChannelError> {
        let (drain, shell) = (self.timeouts.drain, self.timeouts.shell);
        let collected = self.execute(code, drain, shell)?;
        let Some(reply) = collected.reply else {
            // Output may already be complete even though the reply is late.
            return parse_payload(&collected.stdout).map_err(|_| {
                ChannelError::ShellTimeout(format!(
                    "no execute_reply within {}",
                    humantime::format_duration(shell)
                ))
            });
        };
        check_reply(&reply)?;
        parse_payload(&collected.stdout)
    }

    fn debug_port(&self) -> Option<u16> {
        self.debug_port
    }
}

impl Drop for KernelChannel {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

fn check_reply(reply: &ChannelMessage) -> Result<(), ChannelError> {
    if reply.content_str("status") == Some("ok") {
        return Ok(());
    }
    let message = match (reply.content_str("ename"), reply.content_str("evalue")) {
        (Some(ename), Some(evalue)) => format!("{ename}: {evalue}"),
        _ => "error".to_string(),
    };
    Err(ChannelError::Status(message))
}

fn traceback_text(content: &Json) -> String {
    let lines: Vec<&str> = content
        .get("traceback")
        .and_then(Json::as_array)
        .map(|lines| lines.iter().filter_map(Json::as_str).collect())
        .unwrap_or_default();
    if !lines.is_empty() {
        return lines.join("\n");
    }
    format!(
        "{}: {}",
        content.get("ename").and_then(Json::as_str).unwrap_or("Error"),
        content.get("evalue").and_then(Json::as_str).unwrap_or("")
    )
}

fn route_messages<R: Read>(reader: R, iopub: Sender<ChannelMessage>, shell: Sender<ChannelMessage>) {
    for line in BufReader::new(reader).lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                log::warn!("channel read failed: {err}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let message: ChannelMessage = match serde_json::from_str(&line) {
            Ok(message) => message,
            Err(err) => {
                log::warn!("dropping undecodable channel message: {err}");
                continue;
            }
        };
        let target = match message.channel {
            Stream::Iopub => &iopub,
            Stream::Shell => &shell,
        };
        if target.send(message).is_err() {
            break;
        }
    }
    log::debug!("channel reader finished");
}
