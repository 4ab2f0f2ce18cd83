pub mod cache;
pub mod context;
pub mod server;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::preview::PreviewOptions;
use crate::snapshot::{list, Filters, VariableDescriptor};
use crate::value::Namespace;

pub use cache::{PreviewCache, DEFAULT_CHILD_BUDGET};
pub use context::{ContextSlot, PreviewContext};
pub use server::DebugPreviewServer;

#[derive(Clone, Debug, Serialize)]
pub struct PausedSnapshot {
    #[serde(rename = "__locals__")]
    pub locals: BTreeMap<String, VariableDescriptor>,
    #[serde(rename = "__globals__")]
    pub globals: BTreeMap<String, VariableDescriptor>,
    #[serde(rename = "__scoped__")]
    pub scoped: bool,
}

/// Inputs of a pause. With a frame only its locals are listed; the globals
/// are listed only when no frame is active.
pub struct Pause<'a> {
    pub globals: &'a Arc<Namespace>,
    pub frame: Option<&'a Namespace>,
    pub filters: &'a Filters,
    pub max_rows: usize,
    pub max_cols: usize,
    pub child_budget: usize,
}

impl Pause<'_> {
    pub fn capture(self, slot: &ContextSlot) -> PausedSnapshot {
        let scoped = self.frame.is_some();
        let merged = match self.frame {
            Some(locals) => {
                let mut merged = Namespace::clone(self.globals);
                merged.extend(locals.iter().map(|(name, value)| (name.clone(), value.clone())));
                Arc::new(merged)
            }
            None => Arc::clone(self.globals),
        };
        let mut locals = self
            .frame
            .map(|frame| list(frame, self.filters))
            .unwrap_or_default();
        let mut globals = if scoped {
            BTreeMap::new()
        } else {
            list(self.globals, self.filters)
        };
        log::debug!(
            "debug locals size={} globals size={} frame={}",
            locals.len(),
            globals.len(),
            if scoped { "yes" } else { "no" }
        );

        let options = PreviewOptions::new(self.max_rows, self.max_cols);
        let mut cache = PreviewCache::new(&merged, options, self.child_budget);
        let previewable = cache.enrich(&mut locals) + cache.enrich(&mut globals);

        slot.capture(PreviewContext::new(
            Arc::clone(&merged),
            scoped,
            self.max_rows,
            self.max_cols,
        ));
        log::debug!(
            "debug vars snapshot count={} previewable={previewable}",
            locals.len() + globals.len()
        );
        PausedSnapshot {
            locals,
            globals,
            scoped,
        }
    }
}
