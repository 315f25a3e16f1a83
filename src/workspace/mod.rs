//! Workspace trait: the host's live view set as seen by the dedupe core.
//!
//! The host owns every view. This module defines the identities the core
//! passes around ([`DocumentId`], [`ViewId`]), the two shapes a view can
//! report its document in ([`ViewContent`]), and the [`Workspace`] trait
//! that host adapters implement.

pub mod memory;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

/// Key of the deferred-state map that names the document a restoring
/// view will show.
pub const DEFERRED_FILE_KEY: &str = "file";

/// Workspace operation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkspaceError {
    /// The view handle no longer refers to a live view.
    #[error("view {0} is no longer live")]
    StaleView(ViewId),
    /// The document does not exist in the host's vault.
    #[error("document not found: {0}")]
    NotFound(DocumentId),
    /// The host refused the operation.
    #[error("host rejected operation: {0}")]
    Rejected(String),
}

/// Stable identity of a logical document (its vault path).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    /// Parse a document path. Blank paths are not valid identities.
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.trim();
        if path.is_empty() {
            None
        } else {
            Some(Self(path.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque, non-owning handle to a host view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewId(Uuid);

impl ViewId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ViewId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Host-defined view type (e.g. `"markdown"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewKind(String);

impl ViewKind {
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ViewKind {
    fn default() -> Self {
        Self::new("markdown")
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// View state of a view that has not finished restoring.
///
/// Such a view has no live document yet; the target is only reachable
/// through its state map under [`DEFERRED_FILE_KEY`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeferredState {
    pub state: BTreeMap<String, String>,
}

impl DeferredState {
    /// Deferred state pointing at `document`.
    pub fn for_document(document: &DocumentId) -> Self {
        let mut state = BTreeMap::new();
        state.insert(DEFERRED_FILE_KEY.to_string(), document.as_str().to_string());
        Self { state }
    }
}

/// What a view is displaying, in whichever shape the host exposes it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewContent {
    /// No document.
    #[default]
    Empty,
    /// A loaded document reference.
    Live(DocumentId),
    /// A restoring view that only carries deferred state.
    Deferred(DeferredState),
}

impl ViewContent {
    /// Resolve the document this view shows, whichever variant it is.
    ///
    /// Deferred state without a parseable file entry is an ambiguous
    /// binding and resolves to `None`.
    pub fn displayed_document(&self) -> Option<DocumentId> {
        match self {
            Self::Empty => None,
            Self::Live(document) => Some(document.clone()),
            Self::Deferred(deferred) => deferred
                .state
                .get(DEFERRED_FILE_KEY)
                .and_then(|path| DocumentId::parse(path)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.displayed_document().is_none()
    }
}

/// Snapshot of one live view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveView {
    pub id: ViewId,
    pub kind: ViewKind,
    pub content: ViewContent,
}

impl LiveView {
    pub fn displayed_document(&self) -> Option<DocumentId> {
        self.content.displayed_document()
    }
}

/// Rendering mode a caller may request for the target view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    Source,
    Preview,
}

impl std::str::FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "source" => Ok(Self::Source),
            "preview" => Ok(Self::Preview),
            other => Err(format!("unknown view mode: {other}")),
        }
    }
}

/// In-document target of an open request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubLocation {
    Heading(String),
    Line(usize),
}

/// Optional payload of an open request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OpenState {
    pub mode: Option<ViewMode>,
    pub sub_location: Option<SubLocation>,
}

/// Notification delivered to subscribers of a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceEvent {
    /// `document` finished loading into `view`.
    DocumentOpened { view: ViewId, document: DocumentId },
    /// `view` became the foreground view.
    ForegroundChanged { view: ViewId },
}

/// The host's live view set.
///
/// Host adapters implement this trait so the registry and the policy
/// engine never touch host UI types directly. Every method must tolerate
/// stale handles: lookups return `None`, mutations return
/// [`WorkspaceError::StaleView`].
pub trait Workspace {
    /// All live views, in the host's enumeration order.
    fn live_views(&self) -> Vec<LiveView>;

    /// Snapshot of one view, or `None` if it is no longer live.
    fn view(&self, id: ViewId) -> Option<LiveView>;

    /// The foreground view, if any.
    fn active_view(&self) -> Option<ViewId>;

    /// Whether `document` exists and can be loaded.
    fn has_document(&self, document: &DocumentId) -> bool;

    /// Create a fresh empty view of `kind`.
    fn create_view(&mut self, kind: &ViewKind) -> Result<ViewId, WorkspaceError>;

    /// Bring `id` to the foreground without changing its document.
    fn reveal_view(&mut self, id: ViewId) -> Result<(), WorkspaceError>;

    /// Give `document` to view `id` to display and make it active.
    fn load_document(
        &mut self,
        id: ViewId,
        document: &DocumentId,
        state: &OpenState,
    ) -> Result<(), WorkspaceError>;

    /// Subscribe to document-opened and foreground-changed notifications.
    fn subscribe(&mut self) -> UnboundedReceiver<WorkspaceEvent>;
}
