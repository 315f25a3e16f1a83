//! View registry: document identity to view handle cache.
//!
//! Entries are hints. A cached view may have been closed or repurposed
//! since it was recorded, so callers that act on an entry go through
//! [`ViewRegistry::resolve`], which re-validates against the live view
//! set and falls back to a full rescan on a miss.

use std::collections::HashMap;

use crate::workspace::{DocumentId, LiveView, ViewId, ViewKind, Workspace};

#[derive(Debug, Default)]
pub struct ViewRegistry {
    bindings: HashMap<DocumentId, ViewId>,
    kind: ViewKind,
}

impl ViewRegistry {
    /// Registry tracking views of `kind` only.
    pub fn new(kind: ViewKind) -> Self {
        Self {
            bindings: HashMap::new(),
            kind,
        }
    }

    pub fn kind(&self) -> &ViewKind {
        &self.kind
    }

    /// Bind `document` to `view` unless a binding already exists.
    ///
    /// First writer wins, so a rescan that meets the same document in
    /// several views (e.g. after a split) keeps the earliest one.
    /// Returns `true` if the binding was inserted.
    pub fn record(&mut self, document: DocumentId, view: ViewId) -> bool {
        match self.bindings.entry(document) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(view);
                true
            }
        }
    }

    /// Bind `document` to `view`, replacing any existing binding.
    ///
    /// Used after a confirmed open, where the new binding is known good.
    pub fn bind(&mut self, document: DocumentId, view: ViewId) {
        self.bindings.insert(document, view);
    }

    /// Cached hint for `document`, not validated against the host.
    pub fn lookup(&self, document: &DocumentId) -> Option<ViewId> {
        self.bindings.get(document).copied()
    }

    /// Drop the binding for `document`, returning the evicted view.
    pub fn invalidate(&mut self, document: &DocumentId) -> Option<ViewId> {
        self.bindings.remove(document)
    }

    /// Walk the live views once and record every tracked view whose
    /// document is not yet a key. Views with no resolvable document are
    /// skipped. Returns the number of new bindings.
    pub fn rebuild_from<I>(&mut self, views: I) -> usize
    where
        I: IntoIterator<Item = LiveView>,
    {
        let mut added = 0;
        for view in views {
            if view.kind != self.kind {
                continue;
            }
            let Some(document) = view.displayed_document() else {
                continue;
            };
            if self.record(document, view.id) {
                added += 1;
            }
        }
        tracing::debug!(added, total = self.bindings.len(), "registry rebuilt");
        added
    }

    /// Live view currently showing `document`.
    ///
    /// Validates the cached hint against the workspace. A stale hint is
    /// evicted and the registry is rebuilt from the live views before a
    /// single retry. Returns `None` when no live view shows the document.
    pub fn resolve(&mut self, workspace: &dyn Workspace, document: &DocumentId) -> Option<ViewId> {
        if let Some(view) = self.validated(workspace, document) {
            tracing::debug!(document = %document, view = %view, "registry hit");
            return Some(view);
        }

        if let Some(stale) = self.invalidate(document) {
            tracing::debug!(document = %document, view = %stale, "evicted stale binding");
        }

        self.rebuild_from(workspace.live_views());
        let found = self.validated(workspace, document);
        match found {
            Some(view) => tracing::debug!(document = %document, view = %view, "hit after rebuild"),
            None => tracing::debug!(document = %document, "registry miss"),
        }
        found
    }

    /// Whether the cached hint for `document` still names a live,
    /// tracked view showing it.
    fn validated(&self, workspace: &dyn Workspace, document: &DocumentId) -> Option<ViewId> {
        let view = self.lookup(document)?;
        let live = workspace.view(view)?;
        if live.kind == self.kind && live.displayed_document().as_ref() == Some(document) {
            Some(view)
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Snapshot of all bindings, sorted by document.
    pub fn entries(&self) -> Vec<(DocumentId, ViewId)> {
        let mut entries: Vec<_> = self
            .bindings
            .iter()
            .map(|(document, view)| (document.clone(), *view))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}
