//! Open hook point: swappable indirection in front of the host's open path.
//!
//! The host dispatches every open through [`OpenHookPoint::handler`]. A
//! plugin installs a wrapper with [`OpenHookPoint::install`] and gets a
//! [`HookGuard`] back; dropping the guard restores the original handler,
//! so teardown happens on every exit path.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::OpenFile;

/// Hook installation error.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// A wrapper is already installed on this hook point.
    #[error("open hook already installed")]
    AlreadyInstalled,
}

struct HookSlot {
    current: Rc<dyn OpenFile>,
    original: Option<Rc<dyn OpenFile>>,
}

impl HookSlot {
    fn restore(&mut self) -> bool {
        match self.original.take() {
            Some(original) => {
                self.current = original;
                true
            }
            None => false,
        }
    }
}

/// Shared handle to the host's open dispatch slot.
///
/// Cloning yields another handle to the same slot.
#[derive(Clone)]
pub struct OpenHookPoint {
    slot: Rc<RefCell<HookSlot>>,
}

impl OpenHookPoint {
    /// Hook point dispatching to `default` until a wrapper is installed.
    pub fn new(default: Rc<dyn OpenFile>) -> Self {
        Self {
            slot: Rc::new(RefCell::new(HookSlot {
                current: default,
                original: None,
            })),
        }
    }

    /// Handler the host should dispatch the next open to.
    pub fn handler(&self) -> Rc<dyn OpenFile> {
        Rc::clone(&self.slot.borrow().current)
    }

    pub fn is_installed(&self) -> bool {
        self.slot.borrow().original.is_some()
    }

    /// Replace the current handler with `wrap(current)`.
    ///
    /// If a wrapper is already installed the slot is left untouched and
    /// `wrap` is never called.
    pub fn install<F>(&self, wrap: F) -> Result<HookGuard, HookError>
    where
        F: FnOnce(Rc<dyn OpenFile>) -> Rc<dyn OpenFile>,
    {
        if self.is_installed() {
            return Err(HookError::AlreadyInstalled);
        }
        let original = self.handler();
        let wrapped = wrap(Rc::clone(&original));

        let mut slot = self.slot.borrow_mut();
        slot.original = Some(original);
        slot.current = wrapped;
        tracing::info!("open hook installed");

        Ok(HookGuard {
            slot: Rc::downgrade(&self.slot),
        })
    }
}

/// Keeps a wrapper installed; restores the original handler on drop.
pub struct HookGuard {
    slot: Weak<RefCell<HookSlot>>,
}

impl HookGuard {
    /// Restore the original handler now.
    pub fn uninstall(self) {
        drop(self);
    }
}

impl Drop for HookGuard {
    fn drop(&mut self) {
        let Some(slot) = self.slot.upgrade() else {
            // Host already gone; nothing to restore.
            return;
        };
        match slot.try_borrow_mut() {
            Ok(mut slot) => {
                if slot.restore() {
                    tracing::info!("open hook uninstalled");
                }
            }
            Err(e) => tracing::error!(error = %e, "open hook busy during uninstall"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::LoadInPlace;
    use crate::intercept::{OpenError, OpenRequest, Opened};
    use crate::workspace::Workspace;
    use futures::future::LocalBoxFuture;

    struct Marker;

    impl OpenFile for Marker {
        fn open_file<'a>(
            &'a self,
            _workspace: &'a mut dyn Workspace,
            request: OpenRequest,
        ) -> LocalBoxFuture<'a, Result<Opened, OpenError>> {
            Box::pin(async move { Ok(Opened::Revealed(request.view)) })
        }
    }

    fn default_handler() -> Rc<dyn OpenFile> {
        Rc::new(LoadInPlace)
    }

    #[test]
    fn install_then_drop_restores_original() {
        let original = default_handler();
        let hook = OpenHookPoint::new(Rc::clone(&original));

        let guard = hook
            .install(|_inner| Rc::new(Marker) as Rc<dyn OpenFile>)
            .unwrap();
        assert!(hook.is_installed());
        assert!(!Rc::ptr_eq(&hook.handler(), &original));

        drop(guard);
        assert!(!hook.is_installed());
        assert!(Rc::ptr_eq(&hook.handler(), &original));
    }

    #[test]
    fn wrapper_receives_original_handler() {
        let original = default_handler();
        let hook = OpenHookPoint::new(Rc::clone(&original));

        let _guard = hook
            .install(|inner| {
                assert!(Rc::ptr_eq(&inner, &original));
                Rc::new(Marker) as Rc<dyn OpenFile>
            })
            .unwrap();
    }

    #[test]
    fn second_install_is_rejected() {
        let hook = OpenHookPoint::new(default_handler());
        let _guard = hook
            .install(|_inner| Rc::new(Marker) as Rc<dyn OpenFile>)
            .unwrap();

        let current = hook.handler();
        let again = hook.install(|_inner| -> Rc<dyn OpenFile> {
            panic!("wrapper built while installed")
        });
        assert!(matches!(again, Err(HookError::AlreadyInstalled)));
        assert!(Rc::ptr_eq(&hook.handler(), &current));
    }

    #[test]
    fn guard_outliving_host_is_harmless() {
        let hook = OpenHookPoint::new(default_handler());
        let guard = hook
            .install(|_inner| Rc::new(Marker) as Rc<dyn OpenFile>)
            .unwrap();
        drop(hook);
        guard.uninstall();
    }
}
