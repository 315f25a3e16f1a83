//! Dedupe policy engine: decides, per open request, whether to reuse an
//! existing view, delegate in place, or open in a fresh view.
//!
//! Order of checks:
//! 1. A one-shot "open in same view" override delegates unmodified.
//! 2. A request without a document, or naming one the host does not
//!    have, delegates unmodified.
//! 3. A mode request against an empty target view delegates unmodified.
//! 4. A sub-location request for the document already in the foreground
//!    view delegates unmodified (in-place navigation).
//! 5. Otherwise the registry is consulted: a live hit is revealed and the
//!    default open never runs; a miss opens in a newly created view and
//!    binds it once the load succeeds.
//!
//! Host inconsistencies never escape as errors: a failed reveal falls
//! back to the miss path, and a failed view creation falls back to the
//! caller's original target. Only the delegated load's own failure is
//! propagated.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use futures::future::LocalBoxFuture;

use super::{OpenError, OpenFile, OpenRequest, Opened};
use crate::registry::ViewRegistry;
use crate::workspace::{DocumentId, ViewId, ViewKind, Workspace};

/// Why a request skipped the dedupe lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassReason {
    SameViewOverride,
    MissingDocument,
    ModeOnEmptyView,
    InPlaceNavigation,
}

impl fmt::Display for BypassReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::SameViewOverride => "same-view override",
            Self::MissingDocument => "missing document",
            Self::ModeOnEmptyView => "mode on empty view",
            Self::InPlaceNavigation => "in-place navigation",
        };
        f.write_str(reason)
    }
}

/// Outcome of the decision step, before anything is executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Run the default open on the original target.
    Bypass(BypassReason),
    /// Reveal this live view showing the document.
    Reuse(ViewId),
    /// Open in a fresh view.
    NewView(DocumentId),
}

/// One-shot flag that lets the next open through untouched.
///
/// Cloned handles share the flag; it is cleared by the first open
/// decision that follows arming, whatever path that decision takes.
#[derive(Debug, Clone, Default)]
pub struct SameViewOverride(Rc<Cell<bool>>);

impl SameViewOverride {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&self) {
        self.0.set(true);
    }

    pub fn is_armed(&self) -> bool {
        self.0.get()
    }

    /// Read and clear the flag.
    pub fn take(&self) -> bool {
        self.0.replace(false)
    }
}

/// Decorator over the host's open handler that suppresses duplicate views.
pub struct DedupeOpener {
    inner: Rc<dyn OpenFile>,
    registry: Rc<RefCell<ViewRegistry>>,
    same_view: SameViewOverride,
    new_view_kind: ViewKind,
}

impl DedupeOpener {
    pub fn new(
        inner: Rc<dyn OpenFile>,
        registry: Rc<RefCell<ViewRegistry>>,
        same_view: SameViewOverride,
    ) -> Self {
        let new_view_kind = registry.borrow().kind().clone();
        Self {
            inner,
            registry,
            same_view,
            new_view_kind,
        }
    }

    /// Decide what to do with `request`. Consumes the one-shot override
    /// and may refresh the registry, but never touches the views.
    pub fn decide(&self, workspace: &dyn Workspace, request: &OpenRequest) -> Decision {
        if self.same_view.take() {
            return Decision::Bypass(BypassReason::SameViewOverride);
        }

        let Some(document) = request.document.as_ref() else {
            return Decision::Bypass(BypassReason::MissingDocument);
        };
        if !workspace.has_document(document) {
            return Decision::Bypass(BypassReason::MissingDocument);
        }

        let target_is_empty = workspace
            .view(request.view)
            .is_some_and(|view| view.content.is_empty());
        if target_is_empty && request.state.mode.is_some() {
            return Decision::Bypass(BypassReason::ModeOnEmptyView);
        }

        if request.state.sub_location.is_some() {
            let active_document = workspace
                .active_view()
                .and_then(|id| workspace.view(id))
                .and_then(|view| view.displayed_document());
            if active_document.as_ref() == Some(document) {
                return Decision::Bypass(BypassReason::InPlaceNavigation);
            }
        }

        match self.registry.borrow_mut().resolve(workspace, document) {
            Some(view) => Decision::Reuse(view),
            None => Decision::NewView(document.clone()),
        }
    }

    async fn execute(
        &self,
        workspace: &mut dyn Workspace,
        request: OpenRequest,
    ) -> Result<Opened, OpenError> {
        let document = match self.decide(workspace, &request) {
            Decision::Bypass(reason) => {
                tracing::debug!(%reason, view = %request.view, "open bypasses dedupe");
                return self.delegate(workspace, request).await;
            }
            Decision::Reuse(view) => match workspace.reveal_view(view) {
                Ok(()) => {
                    tracing::debug!(view = %view, "revealed existing view");
                    return Ok(Opened::Revealed(view));
                }
                Err(e) => {
                    tracing::warn!(view = %view, error = %e, "reveal failed, opening in new view");
                    let Some(document) = request.document.clone() else {
                        return self.delegate(workspace, request).await;
                    };
                    self.registry.borrow_mut().invalidate(&document);
                    document
                }
            },
            Decision::NewView(document) => document,
        };

        let fresh = match workspace.create_view(&self.new_view_kind) {
            Ok(fresh) => fresh,
            Err(e) => {
                tracing::warn!(error = %e, "view creation failed, opening in target view");
                return self.delegate(workspace, request).await;
            }
        };

        let opened = self
            .inner
            .open_file(workspace, request.retarget(fresh))
            .await?;
        tracing::debug!(document = %document, view = %fresh, "opened in new view");
        self.registry.borrow_mut().bind(document, fresh);
        Ok(opened)
    }

    /// Run the wrapped handler unmodified and record whatever it loaded.
    async fn delegate(
        &self,
        workspace: &mut dyn Workspace,
        request: OpenRequest,
    ) -> Result<Opened, OpenError> {
        let document = request.document.clone();
        let opened = self.inner.open_file(workspace, request).await?;
        if let (Some(document), Opened::Loaded(view)) = (document, opened) {
            self.registry.borrow_mut().record(document, view);
        }
        Ok(opened)
    }
}

impl OpenFile for DedupeOpener {
    fn open_file<'a>(
        &'a self,
        workspace: &'a mut dyn Workspace,
        request: OpenRequest,
    ) -> LocalBoxFuture<'a, Result<Opened, OpenError>> {
        Box::pin(self.execute(workspace, request))
    }
}
