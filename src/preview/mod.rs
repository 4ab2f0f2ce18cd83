mod record;
mod table;

use std::ops::Range;

use serde::Serialize;
use serde_json::Value as Json;

use crate::path::resolve;
use crate::value::{CArray, CStruct, DataFrame, NdArray, Namespace, Record, Value};

pub use record::{CtypesField, DataclassField};

pub const REPR_LIMIT: usize = 300;
pub const FIELD_REPR_LIMIT: usize = 120;
pub const UNBOX_DEPTH: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PreviewOptions {
    pub max_rows: usize,
    pub max_cols: usize,
    pub row_offset: usize,
    pub col_offset: usize,
}

impl PreviewOptions {
    pub fn new(max_rows: usize, max_cols: usize) -> Self {
        Self {
            max_rows,
            max_cols,
            row_offset: 0,
            col_offset: 0,
        }
    }

    pub fn with_offsets(mut self, row_offset: usize, col_offset: usize) -> Self {
        self.row_offset = row_offset;
        self.col_offset = col_offset;
        self
    }

    fn rows(&self, len: usize) -> Range<usize> {
        window(len, self.row_offset, self.max_rows)
    }

    fn cols(&self, len: usize) -> Range<usize> {
        window(len, self.col_offset, self.max_cols)
    }
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self::new(50, 20)
    }
}

/// Wire form of a preview request. Limits and offsets arrive as loosely
/// typed JSON and are coerced by [`PreviewRequest::options`].
#[derive(Clone, Debug, Default, serde::Deserialize)]
pub struct PreviewRequest {
    #[serde(default, deserialize_with = "lenient_name")]
    pub name: String,
    #[serde(default)]
    pub max_rows: Json,
    #[serde(default)]
    pub max_cols: Json,
    #[serde(default)]
    pub row_offset: Json,
    #[serde(default)]
    pub col_offset: Json,
}

impl PreviewRequest {
    /// Missing or non-positive limits fall back to the given defaults;
    /// offsets clamp to zero.
    pub fn options(&self, default_rows: usize, default_cols: usize) -> PreviewOptions {
        let limit = |raw: &Json, fallback: usize| match coerce_int(raw) {
            Some(value) if value > 0 => value as usize,
            _ => fallback,
        };
        let offset = |raw: &Json| coerce_int(raw).map_or(0, |value| value.max(0) as usize);
        PreviewOptions {
            max_rows: limit(&self.max_rows, default_rows),
            max_cols: limit(&self.max_cols, default_cols),
            row_offset: offset(&self.row_offset),
            col_offset: offset(&self.col_offset),
        }
    }

    /// Like [`PreviewRequest::options`], but an explicit non-positive limit
    /// clamps to zero instead of taking the default.
    pub fn window_options(&self, default_rows: usize, default_cols: usize) -> PreviewOptions {
        let limit = |raw: &Json, fallback: usize| {
            coerce_int(raw).map_or(fallback, |value| value.max(0) as usize)
        };
        PreviewOptions {
            max_rows: limit(&self.max_rows, default_rows),
            max_cols: limit(&self.max_cols, default_cols),
            ..self.options(default_rows, default_cols)
        }
    }
}

/// Null reads as an empty path; other non-strings read as their JSON text.
/// Either way the name fails to resolve inside the payload.
fn lenient_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match <Json as serde::Deserialize>::deserialize(deserializer)? {
        Json::String(name) => name,
        Json::Null => String::new(),
        other => other.to_string(),
    })
}

pub fn coerce_int(raw: &Json) -> Option<i64> {
    match raw {
        Json::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Json::String(text) => text.trim().parse().ok(),
        Json::Bool(flag) => Some(*flag as i64),
        _ => None,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Preview {
    pub name: String,
    #[serde(flatten)]
    pub body: PreviewBody,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PreviewBody {
    Value(PreviewKind),
    Error { error: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PreviewKind {
    Dataframe {
        shape: [usize; 2],
        columns: Vec<String>,
        rows: Vec<Vec<Json>>,
        row_offset: usize,
        col_offset: usize,
    },
    Ndarray {
        dtype: String,
        shape: Vec<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        values1d: Option<Vec<Json>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        rows: Option<Vec<Vec<Json>>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        repr: Option<String>,
    },
    Dataclass {
        class_name: String,
        fields: Vec<DataclassField>,
    },
    Ctypes {
        struct_name: String,
        fields: Vec<CtypesField>,
    },
    CtypesArray {
        ctype: String,
        length: usize,
        values: Vec<Json>,
    },
    Object {
        repr: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        length: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        values1d: Option<Vec<Json>>,
    },
}

impl Preview {
    pub fn error(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: PreviewBody::Error {
                error: error.into(),
            },
        }
    }

    pub fn kind(&self) -> Option<&PreviewKind> {
        match &self.body {
            PreviewBody::Value(kind) => Some(kind),
            PreviewBody::Error { .. } => None,
        }
    }

    pub fn to_json(&self) -> Json {
        serde_json::to_value(self).unwrap_or_else(|err| {
            serde_json::json!({ "name": self.name, "error": err.to_string() })
        })
    }
}

/// How a value is previewed. Classification is first-match over
/// [`CLASSIFIERS`]; anything unmatched is an opaque object.
#[derive(Clone, Copy, Debug)]
pub enum ValueKind<'v> {
    Frame(&'v DataFrame),
    Array(&'v NdArray),
    Record(&'v Record),
    Struct(&'v CStruct),
    StructArray(&'v CArray),
    Object,
}

impl ValueKind<'_> {
    /// Descriptor label for the listing; opaque objects carry none.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            ValueKind::Frame(_) => Some("dataframe"),
            ValueKind::Array(_) => Some("ndarray"),
            ValueKind::Record(_) => Some("dataclass"),
            ValueKind::Struct(_) => Some("ctypes"),
            ValueKind::StructArray(_) => Some("ctypes_array"),
            ValueKind::Object => None,
        }
    }
}

type Classifier = for<'v> fn(&'v Value) -> Option<ValueKind<'v>>;

const CLASSIFIERS: &[Classifier] = &[as_frame, as_array, as_record, as_struct, as_struct_array];

fn as_frame(value: &Value) -> Option<ValueKind<'_>> {
    match value {
        Value::Frame(frame) => Some(ValueKind::Frame(frame)),
        _ => None,
    }
}

fn as_array(value: &Value) -> Option<ValueKind<'_>> {
    match value {
        Value::Array(array) => Some(ValueKind::Array(array)),
        _ => None,
    }
}

fn as_record(value: &Value) -> Option<ValueKind<'_>> {
    match value {
        Value::Record(record) => Some(ValueKind::Record(record)),
        _ => None,
    }
}

fn as_struct(value: &Value) -> Option<ValueKind<'_>> {
    match value {
        Value::CStruct(structure) => Some(ValueKind::Struct(structure)),
        _ => None,
    }
}

fn as_struct_array(value: &Value) -> Option<ValueKind<'_>> {
    match value {
        Value::CArray(array) => Some(ValueKind::StructArray(array)),
        _ => None,
    }
}

pub fn classify(value: &Value) -> ValueKind<'_> {
    CLASSIFIERS
        .iter()
        .find_map(|classifier| classifier(value))
        .unwrap_or(ValueKind::Object)
}

pub fn preview(name: &str, namespace: &Namespace, options: &PreviewOptions) -> Preview {
    match resolve(name, namespace) {
        Ok(value) => {
            log::debug!("preview building name={name}");
            preview_value(name, &value, options)
        }
        Err(err) => {
            log::debug!("preview resolve failed name={name} error={err}");
            Preview::error(name, err.to_string())
        }
    }
}

pub fn preview_value(name: &str, value: &Value, options: &PreviewOptions) -> Preview {
    let body = match classify(value) {
        ValueKind::Frame(frame) => table::frame_preview(frame, options),
        ValueKind::Array(array) => table::array_preview(array, options),
        ValueKind::Record(record) => record::dataclass_preview(record),
        ValueKind::Struct(structure) => record::struct_preview(structure, options),
        ValueKind::StructArray(array) => record::struct_array_preview(array, options),
        ValueKind::Object => object_preview(value, options),
    };
    Preview {
        name: name.to_string(),
        body: PreviewBody::Value(body),
    }
}

fn object_preview(value: &Value, options: &PreviewOptions) -> PreviewKind {
    let repr = safe_repr(value, REPR_LIMIT);
    match value {
        Value::List(items) | Value::Tuple(items) => PreviewKind::Object {
            repr,
            length: Some(items.len()),
            values1d: Some(items[options.rows(items.len())].iter().map(element_json).collect()),
        },
        _ => PreviewKind::Object {
            repr,
            length: None,
            values1d: None,
        },
    }
}

/// Scalars as JSON, everything else as a truncated repr.
fn element_json(value: &Value) -> Json {
    value
        .scalar_json()
        .unwrap_or_else(|| Json::String(safe_repr(value, FIELD_REPR_LIMIT)))
}

pub fn window(len: usize, offset: usize, limit: usize) -> Range<usize> {
    let start = offset.min(len);
    let end = start.saturating_add(limit).min(len);
    start..end
}

pub fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

pub fn safe_repr(value: &Value, limit: usize) -> String {
    match value.repr() {
        Ok(text) => truncate(&text, limit),
        Err(_) => "<unrepr>".to_string(),
    }
}

fn more_marker(remaining: usize) -> Json {
    Json::String(format!("...(+{remaining} more)"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn numbers(count: i64) -> Value {
        Value::List((0..count).map(Value::Int).collect())
    }

    #[test]
    fn list_preview_is_windowed() {
        let mut ns = Namespace::new();
        ns.insert("numbers".to_string(), numbers(5));
        let preview = preview("numbers", &ns, &PreviewOptions::new(3, 20));
        let payload = preview.to_json();
        assert_eq!(payload["name"], "numbers");
        assert_eq!(payload["kind"], "object");
        assert_eq!(payload["repr"], "[0, 1, 2, 3, 4]");
        assert_eq!(payload["length"], 5);
        assert_eq!(payload["values1d"], json!([0, 1, 2]));
    }

    #[test]
    fn unresolved_name_yields_error_payload() {
        let preview = preview("missing", &Namespace::new(), &PreviewOptions::default());
        assert_eq!(
            preview.to_json(),
            json!({ "name": "missing", "error": "Name not found" })
        );
    }

    #[test]
    fn adjacent_windows_compose() {
        let mut ns = Namespace::new();
        ns.insert("numbers".to_string(), numbers(25));
        let values = |offset| {
            let options = PreviewOptions::new(10, 20).with_offsets(offset, 0);
            preview("numbers", &ns, &options).to_json()["values1d"].clone()
        };
        let whole = preview("numbers", &ns, &PreviewOptions::new(20, 20)).to_json()["values1d"].clone();
        let mut joined = values(0).as_array().cloned().unwrap_or_default();
        joined.extend(values(10).as_array().cloned().unwrap_or_default());
        assert_eq!(Json::Array(joined), whole);
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("abc", 3), "abc");
        assert_eq!(truncate("ééé", 2), "éé...");
    }

    #[test]
    fn unrepresentable_object_is_marked() {
        let value = Value::Unreadable("repr exploded".to_string());
        let payload = preview_value("bad", &value, &PreviewOptions::default()).to_json();
        assert_eq!(payload, json!({ "name": "bad", "kind": "object", "repr": "<unrepr>" }));
    }

    #[test]
    fn request_options_coerce_and_clamp() {
        let request: PreviewRequest = serde_json::from_value(json!({
            "name": "x",
            "max_rows": "7",
            "max_cols": 0,
            "row_offset": -4,
            "col_offset": 2.9,
        }))
        .unwrap();
        let options = request.options(30, 20);
        assert_eq!(options, PreviewOptions::new(7, 20).with_offsets(0, 2));
    }
}
