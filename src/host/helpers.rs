use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use serde::Deserialize;
use serde_json::{json, Map, Value as Json};

use super::Session;
use crate::channel::{
    BOOTSTRAP_HELPER, DEBUG_PORT_MARKER, DEBUG_PREVIEW_HELPER, DEBUG_SERVER_INFO_HELPER,
    DEBUG_VARS_HELPER, LIST_VARS_HELPER, PREVIEW_HELPER, SET_FILTERS_HELPER,
};
use crate::debug::Pause;
use crate::logging::set_debug_logging;
use crate::preview::{coerce_int, preview, PreviewOptions, PreviewRequest};
use crate::snapshot::list;
use crate::value::{Key, Namespace, Value};

const HELPER_DEFAULT_ROWS: usize = 50;
const HELPER_DEFAULT_COLS: usize = 20;

/// A snippet-callable function. Its return value is printed to stdout:
/// `null` prints nothing, a string prints as raw text, anything else prints
/// as one JSON line.
pub trait Func: Send + Sync {
    fn call(&self, session: &mut Session, args: Map<String, Json>) -> Result<Json>;
}

impl<F> Func for F
where
    F: Fn(&mut Session, Map<String, Json>) -> Result<Json> + Send + Sync + 'static,
{
    fn call(&self, session: &mut Session, args: Map<String, Json>) -> Result<Json> {
        (self)(session, args)
    }
}

#[derive(Clone, Default)]
pub struct HelperRegistry {
    inner: Arc<Mutex<HashMap<String, Arc<dyn Func>>>>,
}

impl HelperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register(BOOTSTRAP_HELPER, bootstrap);
        registry.register(SET_FILTERS_HELPER, set_filters);
        registry.register(LIST_VARS_HELPER, list_vars);
        registry.register(PREVIEW_HELPER, preview_helper);
        registry.register(DEBUG_PREVIEW_HELPER, debug_preview);
        registry.register(DEBUG_SERVER_INFO_HELPER, debug_server_info);
        registry.register(DEBUG_VARS_HELPER, debug_vars);
        registry
    }

    pub fn register<F>(&self, name: impl Into<String>, func: F)
    where
        F: Func + 'static,
    {
        let func: Arc<dyn Func> = Arc::new(func);
        let mut inner = self.inner.lock().expect("registry poisoned");
        inner.insert(name.into(), func);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Func>> {
        let inner = self.inner.lock().expect("registry poisoned");
        inner.get(name).cloned()
    }
}

fn from_args<T: for<'de> Deserialize<'de>>(args: Map<String, Json>) -> Result<T> {
    serde_json::from_value(Json::Object(args)).map_err(|err| anyhow!("invalid arguments: {err}"))
}

#[derive(Deserialize)]
struct BootstrapArgs {
    #[serde(default)]
    debug: bool,
}

fn bootstrap(session: &mut Session, args: Map<String, Json>) -> Result<Json> {
    let args: BootstrapArgs = from_args(args)?;
    if args.debug {
        set_debug_logging(true);
    }
    let port = session.ensure_debug_server();
    let announced = port.map_or_else(|| "None".to_string(), |port| port.to_string());
    Ok(Json::String(format!("{DEBUG_PORT_MARKER}{announced}")))
}

#[derive(Deserialize)]
struct FilterArgs {
    #[serde(default)]
    names: Option<Vec<String>>,
    #[serde(default)]
    types: Option<Vec<String>>,
    #[serde(default)]
    max_repr: Json,
}

fn set_filters(session: &mut Session, args: Map<String, Json>) -> Result<Json> {
    let args: FilterArgs = from_args(args)?;
    session
        .filters
        .update(args.names, args.types, coerce_int(&args.max_repr));
    Ok(Json::Null)
}

#[derive(Deserialize)]
struct ListArgs {
    #[serde(default)]
    max_repr: Json,
    #[serde(default)]
    hide_names: Option<Vec<String>>,
    #[serde(default)]
    hide_types: Option<Vec<String>>,
}

fn list_vars(session: &mut Session, args: Map<String, Json>) -> Result<Json> {
    let args: ListArgs = from_args(args)?;
    session
        .filters
        .update(args.hide_names, args.hide_types, coerce_int(&args.max_repr));
    let listed = list(&session.globals, &session.filters);
    Ok(serde_json::to_value(listed)?)
}

/// Applies the request limits (helper defaults when absent) and remembers
/// them as the session's preview limits.
fn preview_request(
    session: &mut Session,
    args: Map<String, Json>,
) -> Result<(PreviewRequest, PreviewOptions)> {
    let mut request: PreviewRequest = from_args(args)?;
    let options = request.options(HELPER_DEFAULT_ROWS, HELPER_DEFAULT_COLS);
    session.limits.rows = options.max_rows;
    session.limits.cols = options.max_cols;
    request.max_rows = json!(options.max_rows);
    request.max_cols = json!(options.max_cols);
    Ok((request, options))
}

/// Explicit non-positive limits give an empty window here; only absent
/// limits take the helper defaults.
fn preview_helper(session: &mut Session, args: Map<String, Json>) -> Result<Json> {
    let request: PreviewRequest = from_args(args)?;
    let options = request.window_options(HELPER_DEFAULT_ROWS, HELPER_DEFAULT_COLS);
    if options.max_rows > 0 && options.max_cols > 0 {
        session.limits.rows = options.max_rows;
        session.limits.cols = options.max_cols;
    }
    Ok(preview(&request.name, &session.globals, &options).to_json())
}

fn debug_preview(session: &mut Session, args: Map<String, Json>) -> Result<Json> {
    let (request, _) = preview_request(session, args)?;
    Ok(session
        .slot
        .compute(&request, Some(&*session.globals))
        .to_json())
}

fn debug_server_info(session: &mut Session, _args: Map<String, Json>) -> Result<Json> {
    Ok(json!({ "port": session.ensure_debug_server() }))
}

#[derive(Deserialize)]
struct DebugVarsArgs {
    #[serde(default)]
    frame: Option<String>,
}

fn debug_vars(session: &mut Session, args: Map<String, Json>) -> Result<Json> {
    let args: DebugVarsArgs = from_args(args)?;
    let frame = args
        .frame
        .map(|name| frame_locals(&session.globals, &name))
        .transpose()?;
    let snapshot = Pause {
        globals: &session.globals,
        frame: frame.as_ref(),
        filters: &session.filters,
        max_rows: session.limits.rows,
        max_cols: session.limits.cols,
        child_budget: session.limits.child_budget,
    }
    .capture(&session.slot);
    Ok(serde_json::to_value(snapshot)?)
}

/// A frame is named by a dict-valued global whose string keys become the
/// frame locals.
fn frame_locals(globals: &Namespace, name: &str) -> Result<Namespace> {
    match globals.get(name) {
        Some(Value::Dict(entries)) => Ok(entries
            .iter()
            .filter_map(|(key, value)| match key {
                Key::Str(key) => Some((key.clone(), value.clone())),
                Key::Int(_) => None,
            })
            .collect()),
        Some(other) => Err(anyhow!(
            "frame '{name}' must be a dict, got {}",
            other.type_name()
        )),
        None => Err(anyhow!("frame '{name}' is not defined")),
    }
}
