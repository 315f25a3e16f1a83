//! In-memory workspace: a complete reference host for the view set.
//!
//! Keeps views in creation order, tracks the foreground view, and only
//! loads documents that exist in its vault. Every successful load and
//! every foreground change is broadcast to subscribers.

use std::collections::BTreeSet;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use super::{
    DeferredState, DocumentId, LiveView, OpenState, ViewContent, ViewId, ViewKind, Workspace,
    WorkspaceError, WorkspaceEvent,
};

#[derive(Debug, Default)]
pub struct InMemoryWorkspace {
    views: Vec<LiveView>,
    active: Option<ViewId>,
    vault: BTreeSet<DocumentId>,
    subscribers: Vec<UnboundedSender<WorkspaceEvent>>,
}

impl InMemoryWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document to the vault so it can be loaded.
    pub fn add_document(&mut self, document: DocumentId) {
        self.vault.insert(document);
    }

    /// Open a view already showing `document` (or empty) without going
    /// through any open hook, as the host does when restoring a layout.
    pub fn open_view(&mut self, kind: ViewKind, document: Option<DocumentId>) -> ViewId {
        let content = match document {
            Some(document) => {
                self.vault.insert(document.clone());
                ViewContent::Live(document)
            }
            None => ViewContent::Empty,
        };
        self.push_view(kind, content)
    }

    /// Open a view that is still restoring and only exposes deferred state.
    pub fn open_deferred_view(&mut self, kind: ViewKind, document: DocumentId) -> ViewId {
        let content = ViewContent::Deferred(DeferredState::for_document(&document));
        self.vault.insert(document);
        self.push_view(kind, content)
    }

    /// Close a view. The active view falls back to the last remaining one.
    pub fn close_view(&mut self, id: ViewId) -> Result<(), WorkspaceError> {
        let index = self
            .views
            .iter()
            .position(|view| view.id == id)
            .ok_or(WorkspaceError::StaleView(id))?;
        self.views.remove(index);

        if self.active == Some(id) {
            self.active = self.views.last().map(|view| view.id);
            if let Some(view) = self.active {
                self.emit(WorkspaceEvent::ForegroundChanged { view });
            }
        }
        Ok(())
    }

    /// Focus a view as the user would by clicking its tab.
    pub fn focus(&mut self, id: ViewId) -> Result<(), WorkspaceError> {
        self.reveal_view(id)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    fn push_view(&mut self, kind: ViewKind, content: ViewContent) -> ViewId {
        let id = ViewId::new();
        self.views.push(LiveView { id, kind, content });
        if self.active.is_none() {
            self.active = Some(id);
        }
        id
    }

    fn view_mut(&mut self, id: ViewId) -> Result<&mut LiveView, WorkspaceError> {
        self.views
            .iter_mut()
            .find(|view| view.id == id)
            .ok_or(WorkspaceError::StaleView(id))
    }

    fn set_active(&mut self, id: ViewId) {
        if self.active != Some(id) {
            self.active = Some(id);
            self.emit(WorkspaceEvent::ForegroundChanged { view: id });
        }
    }

    fn emit(&mut self, event: WorkspaceEvent) {
        // Receivers dropped on unsubscribe; prune them as we go.
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl Workspace for InMemoryWorkspace {
    fn live_views(&self) -> Vec<LiveView> {
        self.views.clone()
    }

    fn view(&self, id: ViewId) -> Option<LiveView> {
        self.views.iter().find(|view| view.id == id).cloned()
    }

    fn active_view(&self) -> Option<ViewId> {
        self.active
    }

    fn has_document(&self, document: &DocumentId) -> bool {
        self.vault.contains(document)
    }

    fn create_view(&mut self, kind: &ViewKind) -> Result<ViewId, WorkspaceError> {
        let id = ViewId::new();
        self.views.push(LiveView {
            id,
            kind: kind.clone(),
            content: ViewContent::Empty,
        });
        Ok(id)
    }

    fn reveal_view(&mut self, id: ViewId) -> Result<(), WorkspaceError> {
        self.view_mut(id)?;
        self.set_active(id);
        Ok(())
    }

    fn load_document(
        &mut self,
        id: ViewId,
        document: &DocumentId,
        _state: &OpenState,
    ) -> Result<(), WorkspaceError> {
        if !self.vault.contains(document) {
            return Err(WorkspaceError::NotFound(document.clone()));
        }
        let view = self.view_mut(id)?;
        view.content = ViewContent::Live(document.clone());

        self.emit(WorkspaceEvent::DocumentOpened {
            view: id,
            document: document.clone(),
        });
        self.set_active(id);
        Ok(())
    }

    fn subscribe(&mut self) -> UnboundedReceiver<WorkspaceEvent> {
        let (tx, rx) = unbounded_channel();
        self.subscribers.push(tx);
        rx
    }
}
