//! Host trait: what the plugin needs from the application around it.
//!
//! Beyond the [`Workspace`] the host exposes its open dispatch slot and
//! a context menu. [`LoadInPlace`] is the host's stock open behavior.

pub mod memory;

use std::fmt;

use futures::future::LocalBoxFuture;
use uuid::Uuid;

use crate::intercept::hook::OpenHookPoint;
use crate::intercept::{OpenError, OpenFile, OpenRequest, Opened};
use crate::workspace::{DocumentId, ViewId, Workspace};

/// Host integration error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// The context menu refused the action.
    #[error("context menu unavailable: {0}")]
    MenuUnavailable(String),
}

/// Identifier of a registered context menu action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MenuActionId(Uuid);

impl MenuActionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MenuActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MenuActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// What the context menu was opened on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuContext {
    pub document: Option<DocumentId>,
    pub view: Option<ViewId>,
}

/// A user-invocable context menu entry.
pub struct MenuAction {
    pub label: String,
    /// Whether the entry is shown for a given context.
    pub predicate: Box<dyn Fn(&MenuContext) -> bool>,
    pub on_invoke: Box<dyn Fn(&MenuContext)>,
}

impl fmt::Debug for MenuAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuAction")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// The application hosting the plugin.
pub trait Host {
    fn workspace(&mut self) -> &mut dyn Workspace;

    /// Handle to the slot every "open document in view" goes through.
    fn open_hook(&self) -> OpenHookPoint;

    fn add_context_menu_action(&mut self, action: MenuAction) -> Result<MenuActionId, HostError>;

    /// Remove a menu action. Unknown ids are ignored.
    fn remove_context_menu_action(&mut self, id: MenuActionId);
}

/// The host's stock open behavior: load the document into the target
/// view, whatever that view was showing.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoadInPlace;

impl OpenFile for LoadInPlace {
    fn open_file<'a>(
        &'a self,
        workspace: &'a mut dyn Workspace,
        request: OpenRequest,
    ) -> LocalBoxFuture<'a, Result<Opened, OpenError>> {
        Box::pin(async move {
            let document = request.document.ok_or(OpenError::MissingDocument)?;
            workspace.load_document(request.view, &document, &request.state)?;
            Ok(Opened::Loaded(request.view))
        })
    }
}
