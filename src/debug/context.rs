use std::sync::{Arc, Mutex};

use crate::preview::{preview, Preview, PreviewRequest};
use crate::value::Namespace;

pub const DEFAULT_ROWS: usize = 30;
pub const DEFAULT_COLS: usize = 20;

/// Namespace and limits captured at the most recent pause.
#[derive(Clone, Debug)]
pub struct PreviewContext {
    pub namespace: Arc<Namespace>,
    pub scoped: bool,
    pub max_rows: usize,
    pub max_cols: usize,
}

impl PreviewContext {
    pub fn new(namespace: Arc<Namespace>, scoped: bool, max_rows: usize, max_cols: usize) -> Self {
        Self {
            namespace,
            scoped,
            max_rows: if max_rows == 0 { DEFAULT_ROWS } else { max_rows },
            max_cols: if max_cols == 0 { DEFAULT_COLS } else { max_cols },
        }
    }
}

/// Single shared slot holding the current [`PreviewContext`]. Each capture
/// replaces the previous one; readers see whichever context is current.
#[derive(Clone, Default)]
pub struct ContextSlot {
    inner: Arc<Mutex<Option<Arc<PreviewContext>>>>,
}

impl ContextSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capture(&self, context: PreviewContext) {
        log::debug!(
            "debug context stored scoped={} namespace_items={}",
            context.scoped,
            context.namespace.len()
        );
        let mut slot = self.inner.lock().expect("context slot poisoned");
        *slot = Some(Arc::new(context));
    }

    pub fn current(&self) -> Option<Arc<PreviewContext>> {
        self.inner.lock().expect("context slot poisoned").clone()
    }

    /// Previews `request.name` against the captured namespace, or `fallback`
    /// when nothing has been captured yet.
    pub fn compute(&self, request: &PreviewRequest, fallback: Option<&Namespace>) -> Preview {
        let context = self.current();
        let (rows, cols) = context
            .as_ref()
            .map_or((DEFAULT_ROWS, DEFAULT_COLS), |ctx| (ctx.max_rows, ctx.max_cols));
        let options = request.options(rows, cols);
        let namespace = context
            .as_ref()
            .map(|ctx| &*ctx.namespace)
            .filter(|namespace| !namespace.is_empty())
            .or(fallback.filter(|namespace| !namespace.is_empty()));
        let Some(namespace) = namespace else {
            log::debug!(
                "debug preview compute skipped name={} reason=no-context",
                request.name
            );
            return Preview::error(&request.name, "debug namespace unavailable");
        };
        let result = preview(&request.name, namespace, &options);
        log::debug!(
            "debug preview compute name={} status={} rows={} cols={} row_offset={} col_offset={}",
            request.name,
            if result.kind().is_some() { "ok" } else { "error" },
            options.max_rows,
            options.max_cols,
            options.row_offset,
            options.col_offset
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use serde_json::json;

    fn request(value: serde_json::Value) -> PreviewRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn empty_slot_without_fallback_is_unavailable() {
        let slot = ContextSlot::new();
        let preview = slot.compute(&request(json!({"name": "x"})), None);
        assert_eq!(
            preview.to_json(),
            json!({"name": "x", "error": "debug namespace unavailable"})
        );
    }

    #[test]
    fn captured_context_wins_over_fallback() {
        let slot = ContextSlot::new();
        let mut captured = Namespace::new();
        captured.insert("x".to_string(), Value::Int(1));
        let mut fallback = Namespace::new();
        fallback.insert("x".to_string(), Value::Int(2));

        let before = slot.compute(&request(json!({"name": "x"})), Some(&fallback));
        assert_eq!(before.to_json()["repr"], "2");

        slot.capture(PreviewContext::new(Arc::new(captured), true, 5, 5));
        let after = slot.compute(&request(json!({"name": "x"})), Some(&fallback));
        assert_eq!(after.to_json()["repr"], "1");
    }

    #[test]
    fn non_positive_limits_use_context_limits() {
        let slot = ContextSlot::new();
        let mut ns = Namespace::new();
        ns.insert("numbers".to_string(), Value::List((0..10).map(Value::Int).collect()));
        slot.capture(PreviewContext::new(Arc::new(ns), false, 4, 4));
        let preview = slot.compute(
            &request(json!({"name": "numbers", "max_rows": -1, "row_offset": -3})),
            None,
        );
        assert_eq!(preview.to_json()["values1d"], json!([0, 1, 2, 3]));
    }

    #[test]
    fn last_capture_replaces_previous() {
        let slot = ContextSlot::new();
        slot.capture(PreviewContext::new(Arc::new(Namespace::new()), false, 1, 1));
        slot.capture(PreviewContext::new(Arc::new(Namespace::new()), true, 9, 9));
        let current = slot.current().unwrap();
        assert!(current.scoped);
        assert_eq!(current.max_rows, 9);
    }
}
