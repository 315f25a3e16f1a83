//! Plugin lifecycle: activation and teardown of the dedupe core.
//!
//! Activation warms the registry from the live views, then either
//! installs the [`DedupeOpener`] on the host's open hook or subscribes a
//! [`FocusCorrector`] to workspace notifications, and finally registers
//! the "Open in same tab" menu action. Deactivation undoes all of it and
//! is safe to call at any point, including after a failed activation.

pub mod settings;

use std::cell::RefCell;
use std::rc::Rc;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::host::{Host, HostError, MenuAction, MenuActionId};
use crate::intercept::OpenFile;
use crate::intercept::hook::{HookError, HookGuard};
use crate::intercept::policy::{DedupeOpener, SameViewOverride};
use crate::observe::{Correction, FocusCorrector};
use crate::registry::ViewRegistry;
use crate::workspace::WorkspaceEvent;

pub use settings::{Mode, Settings, SettingsError};

/// Label of the context menu action that skips dedupe for one open.
pub const SAME_VIEW_LABEL: &str = "Open in same tab";

/// Plugin lifecycle error.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("plugin is already active")]
    AlreadyActive,
    #[error(transparent)]
    Hook(#[from] HookError),
    #[error(transparent)]
    Host(#[from] HostError),
}

struct Observer {
    corrector: FocusCorrector,
    events: UnboundedReceiver<WorkspaceEvent>,
}

pub struct DedupePlugin {
    settings: Settings,
    registry: Rc<RefCell<ViewRegistry>>,
    same_view: SameViewOverride,
    hook: Option<HookGuard>,
    observer: Option<Observer>,
    menu_action: Option<MenuActionId>,
}

impl DedupePlugin {
    pub fn new(settings: Settings) -> Self {
        let registry = Rc::new(RefCell::new(ViewRegistry::new(settings.view_kind.clone())));
        Self {
            settings,
            registry,
            same_view: SameViewOverride::new(),
            hook: None,
            observer: None,
            menu_action: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Shared registry, for inspection.
    pub fn registry(&self) -> Rc<RefCell<ViewRegistry>> {
        Rc::clone(&self.registry)
    }

    /// Handle to the one-shot "open in same tab" flag.
    pub fn same_view(&self) -> SameViewOverride {
        self.same_view.clone()
    }

    pub fn is_active(&self) -> bool {
        self.hook.is_some() || self.observer.is_some()
    }

    pub fn activate(&mut self, host: &mut dyn Host) -> Result<(), PluginError> {
        if self.is_active() {
            return Err(PluginError::AlreadyActive);
        }
        tracing::info!(mode = ?self.settings.mode, kind = %self.settings.view_kind, "activating");

        if self.settings.warm_up {
            let views = host.workspace().live_views();
            self.registry.borrow_mut().rebuild_from(views);
        }

        match self.settings.mode {
            Mode::Intercept => {
                let registry = Rc::clone(&self.registry);
                let same_view = self.same_view.clone();
                let guard = host.open_hook().install(move |inner| {
                    Rc::new(DedupeOpener::new(inner, registry, same_view)) as Rc<dyn OpenFile>
                })?;
                self.hook = Some(guard);
            }
            Mode::Observe => {
                let events = host.workspace().subscribe();
                self.observer = Some(Observer {
                    corrector: FocusCorrector::new(Rc::clone(&self.registry)),
                    events,
                });
            }
        }

        if let Err(e) = self.register_menu_action(host) {
            tracing::warn!(error = %e, "menu registration failed, rolling back");
            self.deactivate(host);
            return Err(e.into());
        }

        tracing::info!(tracked = self.registry.borrow().len(), "activated");
        Ok(())
    }

    fn register_menu_action(&mut self, host: &mut dyn Host) -> Result<(), HostError> {
        let same_view = self.same_view.clone();
        let id = host.add_context_menu_action(MenuAction {
            label: SAME_VIEW_LABEL.to_string(),
            predicate: Box::new(|context| context.document.is_some()),
            on_invoke: Box::new(move |_context| same_view.arm()),
        })?;
        self.menu_action = Some(id);
        Ok(())
    }

    /// Tear everything down. Idempotent.
    pub fn deactivate(&mut self, host: &mut dyn Host) {
        let was_active = self.is_active();
        if let Some(guard) = self.hook.take() {
            guard.uninstall();
        }
        self.observer = None;
        if let Some(id) = self.menu_action.take() {
            host.remove_context_menu_action(id);
        }
        self.same_view.take();
        self.registry.borrow_mut().clear();
        if was_active {
            tracing::info!("deactivated");
        }
    }

    /// Feed queued workspace notifications to the focus corrector.
    ///
    /// Only does anything in [`Mode::Observe`].
    pub fn pump(&mut self, host: &mut dyn Host) -> Vec<Correction> {
        match self.observer.as_mut() {
            Some(observer) => observer
                .corrector
                .drain(host.workspace(), &mut observer.events),
            None => Vec::new(),
        }
    }
}
