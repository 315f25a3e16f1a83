//! Focus corrector: the non-intercepting observe-and-refocus mode.
//!
//! Never prevents an open. It learns bindings from "document opened"
//! notifications and, when the foreground moves to a view whose document
//! is already shown by a different live view, moves focus back to that
//! earlier view. One redundant load happens before the correction.

use std::cell::RefCell;
use std::rc::Rc;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::registry::ViewRegistry;
use crate::workspace::{DocumentId, ViewId, Workspace, WorkspaceEvent};

/// Upper bound on events handled per drain, so a host that answers
/// every reveal with another foreground change cannot spin forever.
pub const MAX_EVENTS_PER_DRAIN: usize = 256;

/// What the corrector did for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    None,
    /// Focus moved from the duplicate `from` to the existing `to`.
    Refocused { from: ViewId, to: ViewId },
}

pub struct FocusCorrector {
    registry: Rc<RefCell<ViewRegistry>>,
}

impl FocusCorrector {
    pub fn new(registry: Rc<RefCell<ViewRegistry>>) -> Self {
        Self { registry }
    }

    pub fn handle(&self, workspace: &mut dyn Workspace, event: &WorkspaceEvent) -> Correction {
        match event {
            WorkspaceEvent::DocumentOpened { view, document } => {
                self.correct(workspace, *view, document.clone())
            }
            WorkspaceEvent::ForegroundChanged { view } => {
                let Some(document) = workspace.view(*view).and_then(|live| live.displayed_document())
                else {
                    return Correction::None;
                };
                self.correct(workspace, *view, document)
            }
        }
    }

    /// Learn that `view` shows `document`, and if `view` is in the
    /// foreground while an earlier live view shows the same document,
    /// move focus to that earlier view.
    fn correct(&self, workspace: &mut dyn Workspace, view: ViewId, document: DocumentId) -> Correction {
        match workspace.view(view) {
            Some(live) if &live.kind == self.registry.borrow().kind() => {}
            _ => return Correction::None,
        }

        let existing = self.registry.borrow_mut().resolve(workspace, &document);
        let Some(existing) = existing else {
            self.registry.borrow_mut().record(document, view);
            return Correction::None;
        };
        // Events queue up; only act for the view still in front.
        if existing == view || workspace.active_view() != Some(view) {
            return Correction::None;
        }

        match workspace.reveal_view(existing) {
            Ok(()) => {
                tracing::debug!(
                    document = %document,
                    from = %view,
                    to = %existing,
                    "refocused existing view"
                );
                Correction::Refocused {
                    from: view,
                    to: existing,
                }
            }
            Err(e) => {
                tracing::warn!(view = %existing, error = %e, "refocus failed");
                let mut registry = self.registry.borrow_mut();
                registry.invalidate(&document);
                registry.record(document, view);
                Correction::None
            }
        }
    }

    /// Handle every event already queued on `events`. Returns the
    /// corrections made, in order.
    pub fn drain(
        &self,
        workspace: &mut dyn Workspace,
        events: &mut UnboundedReceiver<WorkspaceEvent>,
    ) -> Vec<Correction> {
        let mut corrections = Vec::new();
        for _ in 0..MAX_EVENTS_PER_DRAIN {
            let Ok(event) = events.try_recv() else {
                return corrections;
            };
            if let correction @ Correction::Refocused { .. } = self.handle(workspace, &event) {
                corrections.push(correction);
            }
        }
        tracing::warn!(limit = MAX_EVENTS_PER_DRAIN, "event drain limit reached");
        corrections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::memory::InMemoryWorkspace;
    use crate::workspace::{LiveView, OpenState, ViewKind, WorkspaceError};
    use tokio::sync::mpsc::unbounded_channel;

    fn doc(path: &str) -> DocumentId {
        DocumentId::parse(path).unwrap()
    }

    fn markdown() -> ViewKind {
        ViewKind::default()
    }

    fn corrector() -> (FocusCorrector, Rc<RefCell<ViewRegistry>>) {
        let registry = Rc::new(RefCell::new(ViewRegistry::new(markdown())));
        (FocusCorrector::new(Rc::clone(&registry)), registry)
    }

    #[test]
    fn duplicate_open_is_refocused_to_original() {
        let (corrector, _registry) = corrector();
        let mut ws = InMemoryWorkspace::new();
        let a = ws.open_view(markdown(), Some(doc("/x.md")));
        let b = ws.open_view(markdown(), None);
        let mut rx = ws.subscribe();

        ws.load_document(b, &doc("/x.md"), &OpenState::default())
            .unwrap();
        let corrections = corrector.drain(&mut ws, &mut rx);

        assert_eq!(corrections, vec![Correction::Refocused { from: b, to: a }]);
        assert_eq!(ws.active_view(), Some(a));
    }

    #[test]
    fn first_open_is_recorded_without_correction() {
        let (corrector, registry) = corrector();
        let mut ws = InMemoryWorkspace::new();
        ws.add_document(doc("/y.md"));
        let _a = ws.open_view(markdown(), Some(doc("/x.md")));
        let b = ws.open_view(markdown(), None);
        let mut rx = ws.subscribe();

        ws.load_document(b, &doc("/y.md"), &OpenState::default())
            .unwrap();
        let corrections = corrector.drain(&mut ws, &mut rx);

        assert!(corrections.is_empty());
        assert_eq!(ws.active_view(), Some(b));
        assert_eq!(registry.borrow().lookup(&doc("/y.md")), Some(b));
    }

    #[test]
    fn closed_original_is_replaced_by_new_view() {
        let (corrector, registry) = corrector();
        let mut ws = InMemoryWorkspace::new();
        let a = ws.open_view(markdown(), Some(doc("/x.md")));
        let b = ws.open_view(markdown(), None);
        registry.borrow_mut().rebuild_from(ws.live_views());

        ws.close_view(a).unwrap();
        let mut rx = ws.subscribe();
        ws.load_document(b, &doc("/x.md"), &OpenState::default())
            .unwrap();
        let corrections = corrector.drain(&mut ws, &mut rx);

        assert!(corrections.is_empty());
        assert_eq!(registry.borrow().lookup(&doc("/x.md")), Some(b));
    }

    #[test]
    fn switching_between_distinct_documents_is_untouched() {
        let (corrector, _registry) = corrector();
        let mut ws = InMemoryWorkspace::new();
        let a = ws.open_view(markdown(), Some(doc("/x.md")));
        let b = ws.open_view(markdown(), Some(doc("/y.md")));
        let mut rx = ws.subscribe();

        ws.focus(b).unwrap();
        ws.focus(a).unwrap();
        assert!(corrector.drain(&mut ws, &mut rx).is_empty());
        assert_eq!(ws.active_view(), Some(a));
    }

    #[test]
    fn other_view_kinds_are_ignored() {
        let (corrector, _registry) = corrector();
        let mut ws = InMemoryWorkspace::new();
        let _a = ws.open_view(ViewKind::new("canvas"), Some(doc("/b.canvas")));
        let b = ws.open_view(ViewKind::new("canvas"), Some(doc("/b.canvas")));

        assert_eq!(
            corrector.handle(&mut ws, &WorkspaceEvent::ForegroundChanged { view: b }),
            Correction::None
        );
    }

    /// Workspace whose views can never be brought forward.
    struct RevealFails(InMemoryWorkspace);

    impl Workspace for RevealFails {
        fn live_views(&self) -> Vec<LiveView> {
            self.0.live_views()
        }
        fn view(&self, id: ViewId) -> Option<LiveView> {
            self.0.view(id)
        }
        fn active_view(&self) -> Option<ViewId> {
            self.0.active_view()
        }
        fn has_document(&self, document: &DocumentId) -> bool {
            self.0.has_document(document)
        }
        fn create_view(&mut self, kind: &ViewKind) -> Result<ViewId, WorkspaceError> {
            self.0.create_view(kind)
        }
        fn reveal_view(&mut self, id: ViewId) -> Result<(), WorkspaceError> {
            Err(WorkspaceError::Rejected(format!("cannot reveal {id}")))
        }
        fn load_document(
            &mut self,
            id: ViewId,
            document: &DocumentId,
            state: &OpenState,
        ) -> Result<(), WorkspaceError> {
            self.0.load_document(id, document, state)
        }
        fn subscribe(&mut self) -> UnboundedReceiver<WorkspaceEvent> {
            self.0.subscribe()
        }
    }

    #[test]
    fn failed_refocus_rebinds_to_foreground_view() {
        let (corrector, registry) = corrector();
        let mut inner = InMemoryWorkspace::new();
        let a = inner.open_view(markdown(), Some(doc("/x.md")));
        let b = inner.open_view(markdown(), None);
        registry.borrow_mut().rebuild_from(inner.live_views());
        let mut ws = RevealFails(inner);
        let mut rx = ws.subscribe();

        ws.load_document(b, &doc("/x.md"), &OpenState::default())
            .unwrap();

        assert!(corrector.drain(&mut ws, &mut rx).is_empty());
        assert_eq!(ws.active_view(), Some(b));
        assert_eq!(registry.borrow().lookup(&doc("/x.md")), Some(b));
        assert!(ws.view(a).is_some());
    }

    #[test]
    fn drain_stops_at_event_limit() {
        let (corrector, _registry) = corrector();
        let mut ws = InMemoryWorkspace::new();
        let a = ws.open_view(markdown(), Some(doc("/x.md")));
        let (tx, mut rx) = unbounded_channel();
        let extra = 44;
        for _ in 0..MAX_EVENTS_PER_DRAIN + extra {
            tx.send(WorkspaceEvent::ForegroundChanged { view: a }).unwrap();
        }

        assert!(corrector.drain(&mut ws, &mut rx).is_empty());
        assert_eq!(rx.len(), extra);

        corrector.drain(&mut ws, &mut rx);
        assert!(rx.is_empty());
    }
}
