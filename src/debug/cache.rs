use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::path::PathExpr;
use crate::preview::{preview, Preview, PreviewKind, PreviewOptions};
use crate::snapshot::VariableDescriptor;
use crate::value::{Key, Namespace};

pub const DEFAULT_CHILD_BUDGET: usize = 40;

/// Nested previews computed for one pause. Every path is computed at most
/// once; child drill-down shares a single budget across the whole pass.
pub struct PreviewCache<'ns> {
    namespace: &'ns Namespace,
    options: PreviewOptions,
    remaining: usize,
    computed: HashMap<String, Preview>,
}

impl<'ns> PreviewCache<'ns> {
    pub fn new(namespace: &'ns Namespace, options: PreviewOptions, budget: usize) -> Self {
        Self {
            namespace,
            options,
            remaining: budget,
            computed: HashMap::new(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Number of distinct paths previewed so far.
    pub fn computed(&self) -> usize {
        self.computed.len()
    }

    pub fn fetch(&mut self, path: &str) -> Preview {
        if let Some(found) = self.computed.get(path) {
            return found.clone();
        }
        let result = preview(path, self.namespace, &self.options);
        self.computed.insert(path.to_string(), result.clone());
        result
    }

    /// Attaches `_preview_cache` and `_preview_children` to every descriptor.
    /// Returns how many top-level previews succeeded.
    pub fn enrich(&mut self, descriptors: &mut BTreeMap<String, VariableDescriptor>) -> usize {
        let mut previewable = 0;
        for (name, descriptor) in descriptors.iter_mut() {
            let top = self.fetch(name);
            if top.kind().is_some() {
                previewable += 1;
            }
            let children = self.drill_down(name, &top);
            descriptor.preview_cache = Some(top);
            if !children.is_empty() {
                descriptor.preview_children = Some(children);
            }
        }
        previewable
    }

    fn drill_down(&mut self, name: &str, top: &Preview) -> BTreeMap<String, Preview> {
        let mut children = BTreeMap::new();
        let mut queue: VecDeque<String> = child_paths(name, top, self.remaining).into();
        let mut queued: HashSet<String> = queue.iter().cloned().collect();
        while self.remaining > 0 {
            let Some(child) = queue.pop_front() else {
                break;
            };
            let found = self.fetch(&child);
            self.remaining -= 1;
            for grand in child_paths(&child, &found, self.remaining) {
                if !self.computed.contains_key(&grand) && queued.insert(grand.clone()) {
                    queue.push_back(grand);
                }
            }
            children.insert(child, found);
        }
        children
    }
}

/// Paths one level below a record or frame preview: `base.field` or
/// `base['column']`, at most `limit` of them.
pub fn child_paths(name: &str, preview: &Preview, limit: usize) -> Vec<String> {
    if limit == 0 {
        return Vec::new();
    }
    let Ok(base) = PathExpr::parse(name) else {
        return Vec::new();
    };
    let children: Vec<PathExpr> = match preview.kind() {
        Some(PreviewKind::Dataclass { fields, .. }) => fields
            .iter()
            .filter(|field| !field.name.is_empty())
            .map(|field| base.with_attr(field.name.as_str()))
            .collect(),
        Some(PreviewKind::Ctypes { fields, .. }) => fields
            .iter()
            .filter(|field| !field.name.is_empty())
            .map(|field| base.with_attr(field.name.as_str()))
            .collect(),
        Some(PreviewKind::Dataframe { columns, .. }) => columns
            .iter()
            .filter(|column| !column.is_empty())
            .map(|column| base.with_key(Key::Str(column.clone())))
            .collect(),
        _ => Vec::new(),
    };
    children
        .into_iter()
        .take(limit)
        .map(|path| path.to_string())
        .collect()
}
