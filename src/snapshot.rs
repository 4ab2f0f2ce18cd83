use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::preview::{classify, safe_repr, Preview, ValueKind};
use crate::value::{Namespace, Value};

pub const DEFAULT_MAX_REPR: usize = 120;

/// Interpreter-provided names that never show up as variables.
const PSEUDO_NAMES: &[&str] = &["In", "Out", "exit", "quit", "get_ipython"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filters {
    pub hide_names: Option<Vec<String>>,
    pub hide_types: Option<Vec<String>>,
    pub max_repr: usize,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            hide_names: None,
            hide_types: None,
            max_repr: DEFAULT_MAX_REPR,
        }
    }
}

impl Filters {
    /// `None` leaves a setting untouched; `max_repr` only applies when positive.
    pub fn update(
        &mut self,
        hide_names: Option<Vec<String>>,
        hide_types: Option<Vec<String>>,
        max_repr: Option<i64>,
    ) {
        if hide_names.is_some() {
            self.hide_names = hide_names;
        }
        if hide_types.is_some() {
            self.hide_types = hide_types;
        }
        if let Some(limit) = max_repr.filter(|limit| *limit > 0) {
            self.max_repr = limit as usize;
        }
        log::debug!(
            "filters updated names={} types={} max_repr={}",
            self.hide_names.as_ref().map_or(0, Vec::len),
            self.hide_types.as_ref().map_or(0, Vec::len),
            self.max_repr
        );
    }

    pub fn hides_name(&self, name: &str) -> bool {
        name.starts_with('_')
            || PSEUDO_NAMES.contains(&name)
            || matches_any(name, self.hide_names.as_deref())
    }

    pub fn hides_type(&self, type_name: &str) -> bool {
        matches_any(type_name, self.hide_types.as_deref())
    }
}

/// Exact match, or prefix match when the pattern ends with `*`.
pub fn matches_any(name: &str, patterns: Option<&[String]>) -> bool {
    patterns.unwrap_or_default().iter().any(|pattern| {
        match pattern.strip_suffix('*') {
            Some(prefix) => name.starts_with(prefix),
            None => name == pattern,
        }
    })
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VariableDescriptor {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<Vec<usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dtype: Option<String>,
    pub repr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    #[serde(rename = "_preview_cache", skip_serializing_if = "Option::is_none")]
    pub preview_cache: Option<Preview>,
    #[serde(rename = "_preview_children", skip_serializing_if = "Option::is_none")]
    pub preview_children: Option<BTreeMap<String, Preview>>,
}

impl VariableDescriptor {
    pub fn describe(value: &Value, max_repr: usize) -> Self {
        let kind = classify(value);
        Self {
            type_name: value.type_name().into_owned(),
            shape: shape_of(value),
            dtype: dtype_of(&kind),
            repr: safe_repr(value, max_repr),
            kind: kind.label(),
            preview_cache: None,
            preview_children: None,
        }
    }
}

pub fn list(namespace: &Namespace, filters: &Filters) -> BTreeMap<String, VariableDescriptor> {
    log::debug!("listing variables from namespace size={}", namespace.len());
    let listed: BTreeMap<_, _> = namespace
        .iter()
        .filter(|(name, _)| !filters.hides_name(name))
        .filter(|(_, value)| !value.is_callable_like())
        .filter(|(_, value)| !filters.hides_type(&value.type_name()))
        .map(|(name, value)| {
            (
                name.clone(),
                VariableDescriptor::describe(value, filters.max_repr),
            )
        })
        .collect();
    log::debug!("variables listed count={}", listed.len());
    listed
}

fn shape_of(value: &Value) -> Option<Vec<usize>> {
    match value {
        Value::Array(array) => Some(array.shape.clone()),
        Value::Frame(frame) => Some(vec![frame.height(), frame.width()]),
        Value::Str(_) | Value::Bytes(_) | Value::Dict(_) => None,
        other => other.len().map(|len| vec![len]),
    }
}

fn dtype_of(kind: &ValueKind<'_>) -> Option<String> {
    match kind {
        ValueKind::Array(array) => Some(array.dtype.clone()),
        ValueKind::Frame(frame) => {
            let entries: Vec<String> = frame
                .columns
                .iter()
                .map(|column| format!("'{}': dtype('{}')", column.name, column.dtype))
                .collect();
            Some(format!("{{{}}}", entries.join(", ")))
        }
        _ => None,
    }
}
