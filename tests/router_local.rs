use anyhow::Result;
use std::io::{BufRead, BufReader, Cursor, Write};
use std::net::TcpStream;

use serde_json::{json, Value as Json};
use varscope::channel::{ExecutionChannel, LocalChannel};
use varscope::host::Session;
use varscope::router::RequestRouter;
use varscope::value::{Column, DataFrame, Key, Namespace, Value};

fn namespace() -> Namespace {
    let mut ns = Namespace::new();
    ns.insert("_internal".to_string(), Value::Int(1));
    ns.insert("x".to_string(), Value::Int(5));
    ns.insert(
        "numbers".to_string(),
        Value::List((0..5).map(Value::Int).collect()),
    );
    ns.insert(
        "table".to_string(),
        Value::Frame(DataFrame::new(vec![
            Column::new("idx", (0..30).map(Value::Int).collect()),
            Column::new("half", (0..30).map(|i| Value::Float(i as f64 / 2.0)).collect()),
        ])),
    );
    ns.insert("helper".to_string(), Value::Function("helper".to_string()));
    ns.insert(
        "frame".to_string(),
        Value::Dict(vec![(Key::Str("local_only".to_string()), Value::Int(42))]),
    );
    ns
}

fn router() -> Result<RequestRouter<LocalChannel>> {
    let channel = LocalChannel::new(Session::new(namespace()), false)?;
    Ok(RequestRouter::new(channel))
}

fn ask(router: &mut RequestRouter<LocalChannel>, request: Json) -> Json {
    router
        .handle_line(&request.to_string())
        .expect("request produced no response")
}

#[test]
fn preview_of_numbers_respects_row_limit() -> Result<()> {
    let mut router = router()?;
    let response = ask(
        &mut router,
        json!({"id": "1", "op": "preview", "args": {"name": "numbers", "max_rows": 3}}),
    );
    assert_eq!(response["ok"], true);
    assert_eq!(response["tag"], "preview");
    assert_eq!(response["data"]["name"], "numbers");
    assert_eq!(response["data"]["kind"], "object");
    assert_eq!(response["data"]["values1d"], json!([0, 1, 2]));
    Ok(())
}

#[test]
fn vars_lists_visible_names_only() -> Result<()> {
    let mut router = router()?;
    let response = ask(&mut router, json!({"id": "2", "op": "vars"}));
    assert_eq!(response["ok"], true);
    let data = response["data"].as_object().expect("vars data");
    assert_eq!(data["x"]["type"], "int");
    assert!(!data.contains_key("_internal"));
    assert!(!data.contains_key("helper"));
    assert_eq!(data["table"]["shape"], json!([30, 2]));
    Ok(())
}

#[test]
fn bare_vars_clears_earlier_hide_filters() -> Result<()> {
    let mut router = router()?;
    let hidden = ask(
        &mut router,
        json!({"id": 1, "op": "vars", "args": {"hide_types": ["int"]}}),
    );
    assert!(hidden["data"].get("x").is_none());

    let bare = ask(&mut router, json!({"id": 2, "op": "vars"}));
    assert_eq!(bare["data"]["x"]["type"], "int");
    assert!(bare["data"].get("numbers").is_some());
    Ok(())
}

#[test]
fn zero_row_preview_is_an_empty_window() -> Result<()> {
    let mut router = router()?;
    let response = ask(
        &mut router,
        json!({"id": 1, "op": "preview", "args": {"name": "numbers", "max_rows": 0}}),
    );
    assert_eq!(response["ok"], true);
    assert_eq!(response["data"]["values1d"], json!([]));
    Ok(())
}

#[test]
fn table_windows_concatenate() -> Result<()> {
    let mut router = router()?;
    let mut window = |offset: usize, rows: usize| {
        let response = ask(
            &mut router,
            json!({"id": offset, "op": "preview",
                   "args": {"name": "table", "max_rows": rows, "row_offset": offset}}),
        );
        response["data"]["rows"]
            .as_array()
            .cloned()
            .unwrap_or_default()
    };
    let mut split = window(0, 10);
    split.extend(window(10, 10));
    assert_eq!(split, window(0, 20));
    assert_eq!(split.len(), 20);
    Ok(())
}

#[test]
fn unresolved_paths_are_payload_errors() -> Result<()> {
    let mut router = router()?;
    let response = ask(
        &mut router,
        json!({"id": 9, "op": "preview", "args": {"name": "numbers[7"}}),
    );
    assert_eq!(response["ok"], true);
    assert_eq!(response["data"], json!({"name": "numbers[7", "error": "missing ]"}));
    Ok(())
}

#[test]
fn paused_locals_are_served_through_the_debug_socket() -> Result<()> {
    let mut channel = LocalChannel::new(Session::new(namespace()), false)?;
    let snapshot = channel.run_and_collect("__mi_debug_vars({\"frame\": \"frame\"})")?;
    assert_eq!(snapshot["__scoped__"], true);
    assert!(snapshot["__locals__"]["local_only"].is_object());

    let mut router = RequestRouter::new(channel);
    let plain = ask(
        &mut router,
        json!({"id": 1, "op": "preview", "args": {"name": "local_only"}}),
    );
    assert_eq!(plain["data"]["error"], "Name not found");

    let debug = ask(
        &mut router,
        json!({"id": 2, "op": "preview", "args": {"name": "local_only", "debug": true}}),
    );
    assert_eq!(debug["ok"], true);
    assert_eq!(debug["data"]["repr"], "42");
    Ok(())
}

#[test]
fn debug_socket_reports_unknown_names_inside_payload() -> Result<()> {
    let channel = LocalChannel::new(Session::new(namespace()), false)?;
    let port = channel.debug_port().expect("debug server port");

    let mut stream = TcpStream::connect(("127.0.0.1", port))?;
    writeln!(
        stream,
        "{}",
        json!({"name": "ghost", "max_rows": 5, "max_cols": 5, "row_offset": -1, "col_offset": 0})
    )?;
    let mut line = String::new();
    BufReader::new(&stream).read_line(&mut line)?;
    let reply: Json = serde_json::from_str(line.trim())?;
    assert_eq!(
        reply,
        json!({"ok": true, "data": {"name": "ghost", "error": "Name not found"}})
    );
    Ok(())
}

#[test]
fn serve_answers_in_request_order() -> Result<()> {
    let mut router = router()?;
    let input = [
        json!({"id": "a", "op": "ping"}).to_string(),
        String::new(),
        "garbage".to_string(),
        json!({"id": "b", "op": "nope"}).to_string(),
        json!({"id": "c", "op": "vars", "args": {"hide_types": ["int"]}}).to_string(),
    ]
    .join("\n");
    let mut output = Vec::new();
    router.serve(Cursor::new(input), &mut output)?;
    let responses: Vec<Json> = String::from_utf8(output)?
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    let ids: Vec<&Json> = responses.iter().map(|response| &response["id"]).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(responses[1]["error"], "unknown op");
    assert!(responses[2]["data"].get("x").is_none());
    assert!(responses[2]["data"].get("numbers").is_some());
    Ok(())
}
