//! OpenFile trait: the single "open document in view" dispatch point.
//!
//! The host's default open behavior and the dedupe policy engine both
//! implement [`OpenFile`]. The policy engine decorates the default and is
//! swapped into the host through an [`hook::OpenHookPoint`].

pub mod hook;
pub mod policy;

use futures::future::LocalBoxFuture;

use crate::workspace::{DocumentId, OpenState, ViewId, Workspace, WorkspaceError};

/// Open failure, propagated to the caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OpenError {
    /// The request carried no valid document.
    #[error("open request has no document")]
    MissingDocument,
    /// The host failed to load the document.
    #[error("load failed: {0}")]
    Load(#[from] WorkspaceError),
}

/// A request to open `document` in `view`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRequest {
    /// View the caller targeted.
    pub view: ViewId,
    /// `None` when the host handed over an absent or invalid document.
    pub document: Option<DocumentId>,
    pub state: OpenState,
}

impl OpenRequest {
    pub fn new(view: ViewId, document: DocumentId) -> Self {
        Self {
            view,
            document: Some(document),
            state: OpenState::default(),
        }
    }

    pub fn with_state(mut self, state: OpenState) -> Self {
        self.state = state;
        self
    }

    /// Same request aimed at a different view.
    pub fn retarget(&self, view: ViewId) -> Self {
        Self {
            view,
            ..self.clone()
        }
    }
}

/// Where an open request ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opened {
    /// The document was loaded into this view.
    Loaded(ViewId),
    /// An existing view already showing the document was brought forward.
    Revealed(ViewId),
}

impl Opened {
    pub fn view(&self) -> ViewId {
        match self {
            Self::Loaded(view) | Self::Revealed(view) => *view,
        }
    }
}

/// Handles "open document in view" requests.
///
/// Implementations run on the host's single event loop; the returned
/// future is not `Send`.
pub trait OpenFile {
    fn open_file<'a>(
        &'a self,
        workspace: &'a mut dyn Workspace,
        request: OpenRequest,
    ) -> LocalBoxFuture<'a, Result<Opened, OpenError>>;
}
