//! Driver-side request loop: `{id, op, args}` lines in, one response line
//! out per request.

mod client;

use std::io::{self, BufRead, Write};

use serde_json::{json, Map, Value as Json};

use crate::channel::{
    snippet, ExecutionChannel, DEBUG_PREVIEW_HELPER, LIST_VARS_HELPER, PREVIEW_HELPER,
};
use crate::debug::context::{DEFAULT_COLS, DEFAULT_ROWS};
use crate::preview::coerce_int;
use crate::snapshot::DEFAULT_MAX_REPR;

pub use client::{DebugPreviewClient, PreviewArgs};

pub struct RequestRouter<C> {
    channel: C,
    client: DebugPreviewClient,
}

impl<C: ExecutionChannel> RequestRouter<C> {
    pub fn new(channel: C) -> Self {
        Self::with_client(channel, DebugPreviewClient::default())
    }

    pub fn with_client(channel: C, client: DebugPreviewClient) -> Self {
        Self { channel, client }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Reads requests until EOF, writing and flushing each response before
    /// the next request is read.
    pub fn serve<R: BufRead, W: Write>(&mut self, reader: R, mut writer: W) -> io::Result<()> {
        for line in reader.lines() {
            let line = line?;
            if let Some(response) = self.handle_line(&line) {
                writeln!(writer, "{response}")?;
                writer.flush()?;
            }
        }
        Ok(())
    }

    /// `None` for blank or undecodable lines.
    pub fn handle_line(&mut self, line: &str) -> Option<Json> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match serde_json::from_str::<Json>(line) {
            Ok(request @ Json::Object(_)) => Some(self.handle(&request)),
            Ok(_) => None,
            Err(err) => {
                log::debug!("skipping undecodable request: {err}");
                None
            }
        }
    }

    pub fn handle(&mut self, request: &Json) -> Json {
        let id = request.get("id").cloned().unwrap_or(Json::Null);
        let empty = Map::new();
        let args = request
            .get("args")
            .and_then(Json::as_object)
            .unwrap_or(&empty);
        match request.get("op").and_then(Json::as_str) {
            Some("ping") => json!({ "id": id, "ok": true, "tag": "pong" }),
            Some("vars") => self.vars(id, args),
            Some("preview") => self.preview(id, args),
            _ => json!({ "id": id, "ok": false, "error": "unknown op" }),
        }
    }

    fn vars(&mut self, id: Json, args: &Map<String, Json>) -> Json {
        let max_repr = args
            .get("max_repr")
            .and_then(coerce_int)
            .unwrap_or(DEFAULT_MAX_REPR as i64);
        let mut call = Map::new();
        call.insert("max_repr".to_string(), json!(max_repr));
        call.insert("hide_names".to_string(), pattern_list(args.get("hide_names")));
        call.insert("hide_types".to_string(), pattern_list(args.get("hide_types")));
        let result = self.channel.run_and_collect(&snippet(LIST_VARS_HELPER, &call));
        log::debug!(
            "vars ok={} size={}",
            result.is_ok(),
            result
                .as_ref()
                .ok()
                .and_then(Json::as_object)
                .map_or(0, Map::len)
        );
        respond(id, "vars", result.map_err(|err| err.to_string()), "error")
    }

    fn preview(&mut self, id: Json, args: &Map<String, Json>) -> Json {
        let request = preview_args(args);
        let debug = args.get("debug").is_some_and(truthy);
        if !debug {
            let result = self
                .channel
                .run_and_collect(&snippet(PREVIEW_HELPER, &request.to_map()));
            log::debug!("preview name={} ok={}", request.name, result.is_ok());
            return respond(id, "preview", result.map_err(|err| err.to_string()), "error");
        }

        let result = match self.client.request(&mut self.channel, &request) {
            Ok(data) => Ok(data),
            Err(err) => {
                log::debug!("debug preview socket fallback err={err}");
                self.channel
                    .run_and_collect(&snippet(DEBUG_PREVIEW_HELPER, &request.to_map()))
                    .map_err(|err| err.to_string())
            }
        };
        let result = result.and_then(|data| {
            if data.is_null() {
                Err(String::new())
            } else {
                Ok(data)
            }
        });
        respond(id, "preview", result, "debug preview failed")
    }
}

fn respond(id: Json, tag: &str, result: Result<Json, String>, fallback: &str) -> Json {
    let mut response = Map::new();
    response.insert("id".to_string(), id);
    response.insert("ok".to_string(), Json::Bool(result.is_ok()));
    response.insert("tag".to_string(), json!(tag));
    match result {
        Ok(data) => {
            response.insert("data".to_string(), data);
        }
        Err(err) => {
            let err = if err.is_empty() { fallback.to_string() } else { err };
            response.insert("error".to_string(), Json::String(err));
        }
    }
    Json::Object(response)
}

/// Router defaults: 30 rows, 20 columns, offsets clamped to zero.
pub fn preview_args(args: &Map<String, Json>) -> PreviewArgs {
    let int = |key: &str, default: i64| args.get(key).and_then(coerce_int).unwrap_or(default);
    let name = match args.get("name") {
        Some(Json::String(name)) => name.clone(),
        Some(Json::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };
    PreviewArgs {
        name,
        max_rows: int("max_rows", DEFAULT_ROWS as i64),
        max_cols: int("max_cols", DEFAULT_COLS as i64),
        row_offset: int("row_offset", 0).max(0),
        col_offset: int("col_offset", 0).max(0),
    }
}

/// Absent or null clears the filter, so each `vars` request stands alone.
fn pattern_list(raw: Option<&Json>) -> Json {
    match raw {
        Some(Json::Array(items)) => Json::Array(
            items
                .iter()
                .filter_map(|item| item.as_str().map(|text| json!(text)))
                .collect(),
        ),
        Some(Json::String(single)) => json!([single]),
        _ => json!([]),
    }
}

fn truthy(raw: &Json) -> bool {
    match raw {
        Json::Bool(flag) => *flag,
        Json::Number(number) => number.as_f64().is_some_and(|value| value != 0.0),
        Json::String(text) => !text.is_empty(),
        Json::Array(items) => !items.is_empty(),
        Json::Object(entries) => !entries.is_empty(),
        Json::Null => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChannelError;
    use std::io::Cursor;
    use std::net::TcpListener;

    /// Records every snippet and answers from a closure.
    struct Scripted<F> {
        calls: Vec<String>,
        port: Option<u16>,
        reply: F,
    }

    impl<F> Scripted<F>
    where
        F: FnMut(&str) -> Result<Json, ChannelError>,
    {
        fn new(reply: F) -> Self {
            Self {
                calls: Vec::new(),
                port: None,
                reply,
            }
        }
    }

    impl<F> ExecutionChannel for Scripted<F>
    where
        F: FnMut(&str) -> Result<Json, ChannelError>,
    {
        fn run_and_collect(&mut self, code: &str) -> Result<Json, ChannelError> {
            self.calls.push(code.to_string());
            (self.reply)(code)
        }

        fn debug_port(&self) -> Option<u16> {
            self.port
        }
    }

    #[test]
    fn ping_and_unknown_ops_need_no_channel() {
        let mut router = RequestRouter::new(Scripted::new(|_| Err(ChannelError::Closed)));
        assert_eq!(
            router.handle_line(r#"{"id": 7, "op": "ping"}"#),
            Some(json!({"id": 7, "ok": true, "tag": "pong"}))
        );
        assert_eq!(
            router.handle_line(r#"{"id": "a", "op": "explode"}"#),
            Some(json!({"id": "a", "ok": false, "error": "unknown op"}))
        );
        assert_eq!(router.handle_line("   "), None);
        assert_eq!(router.handle_line("{broken"), None);
        assert!(router.channel().calls.is_empty());
    }

    #[test]
    fn vars_forwards_filters_and_defaults() {
        let mut router = RequestRouter::new(Scripted::new(|_| Ok(json!({"x": {"type": "int"}}))));
        let response = router
            .handle_line(r#"{"id": "1", "op": "vars", "args": {"hide_names": ["tmp*"]}}"#)
            .unwrap();
        assert_eq!(response["ok"], true);
        assert_eq!(response["tag"], "vars");
        assert_eq!(response["data"]["x"]["type"], "int");

        let call = &router.channel().calls[0];
        let args: Json = serde_json::from_str(
            call.strip_prefix("__mi_list_vars(")
                .and_then(|rest| rest.strip_suffix(')'))
                .unwrap(),
        )
        .unwrap();
        assert_eq!(args, json!({"max_repr": 120, "hide_names": ["tmp*"], "hide_types": []}));
    }

    #[test]
    fn channel_failures_become_error_responses() {
        let mut router = RequestRouter::new(Scripted::new(|_| Err(ChannelError::EmptyPayload)));
        let response = router.handle_line(r#"{"id": 2, "op": "vars"}"#).unwrap();
        assert_eq!(
            response,
            json!({"id": 2, "ok": false, "tag": "vars", "error": "empty payload"})
        );
    }

    #[test]
    fn preview_arguments_are_defaulted_and_clamped() {
        let args = json!({"name": "df", "max_rows": "5", "row_offset": -3, "col_offset": 2.7});
        let parsed = preview_args(args.as_object().unwrap());
        assert_eq!(
            parsed,
            PreviewArgs {
                name: "df".to_string(),
                max_rows: 5,
                max_cols: 20,
                row_offset: 0,
                col_offset: 2,
            }
        );
    }

    #[test]
    fn debug_preview_falls_back_to_the_channel() -> anyhow::Result<()> {
        let closed = TcpListener::bind(("127.0.0.1", 0))?.local_addr()?.port();
        let mut channel = Scripted::new(|_| Ok(json!({"name": "x", "kind": "object", "repr": "1"})));
        channel.port = Some(closed);
        let mut router = RequestRouter::new(channel);

        let response = router
            .handle_line(r#"{"id": 3, "op": "preview", "args": {"name": "x", "debug": true}}"#)
            .unwrap();
        assert_eq!(response["ok"], true);
        assert_eq!(response["data"]["repr"], "1");
        let calls = &router.channel().calls;
        assert_eq!(calls.len(), 1);
        assert!(calls[0].starts_with("__mi_debug_preview("));
        Ok(())
    }

    #[test]
    fn failed_debug_fallback_reports_channel_error() {
        let mut router = RequestRouter::new(Scripted::new(|code: &str| {
            if code.starts_with("__mi_debug_server_info") {
                Ok(json!({"port": null}))
            } else {
                Err(ChannelError::Remote(String::new()))
            }
        }));
        let response = router
            .handle_line(r#"{"id": 4, "op": "preview", "args": {"name": "x", "debug": 1}}"#)
            .unwrap();
        assert_eq!(
            response,
            json!({"id": 4, "ok": false, "tag": "preview", "error": "debug preview failed"})
        );
    }

    #[test]
    fn serve_writes_one_line_per_request() -> anyhow::Result<()> {
        let mut router = RequestRouter::new(Scripted::new(|_| Ok(json!({}))));
        let input = "{\"id\": 1, \"op\": \"ping\"}\n\nnot json\n{\"id\": 2, \"op\": \"vars\"}\n";
        let mut output = Vec::new();
        router.serve(Cursor::new(input), &mut output)?;
        let lines: Vec<Json> = String::from_utf8(output)?
            .lines()
            .map(serde_json::from_str)
            .collect::<Result<_, _>>()?;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["tag"], "vars");
        Ok(())
    }
}
