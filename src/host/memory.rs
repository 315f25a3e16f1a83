//! In-memory host: composes an [`InMemoryWorkspace`], an open hook point
//! and a context menu table, and dispatches opens through the hook the
//! way the real application does.

use std::rc::Rc;

use super::{Host, HostError, LoadInPlace, MenuAction, MenuActionId, MenuContext};
use crate::intercept::hook::OpenHookPoint;
use crate::intercept::{OpenError, OpenRequest, Opened};
use crate::workspace::Workspace;
use crate::workspace::memory::InMemoryWorkspace;

pub struct InMemoryHost {
    workspace: InMemoryWorkspace,
    hook: OpenHookPoint,
    menu: Vec<(MenuActionId, MenuAction)>,
    menu_enabled: bool,
}

impl InMemoryHost {
    pub fn new(workspace: InMemoryWorkspace) -> Self {
        Self {
            workspace,
            hook: OpenHookPoint::new(Rc::new(LoadInPlace)),
            menu: Vec::new(),
            menu_enabled: true,
        }
    }

    /// Host whose context menu rejects new actions.
    pub fn without_menu(workspace: InMemoryWorkspace) -> Self {
        Self {
            menu_enabled: false,
            ..Self::new(workspace)
        }
    }

    pub fn memory(&self) -> &InMemoryWorkspace {
        &self.workspace
    }

    pub fn memory_mut(&mut self) -> &mut InMemoryWorkspace {
        &mut self.workspace
    }

    /// Dispatch an open request through whatever handler is installed.
    pub async fn open(&mut self, request: OpenRequest) -> Result<Opened, OpenError> {
        let handler = self.hook.handler();
        handler.open_file(&mut self.workspace, request).await
    }

    /// Labels and ids of the menu entries shown for `context`.
    pub fn menu_actions(&self, context: &MenuContext) -> Vec<(MenuActionId, String)> {
        self.menu
            .iter()
            .filter(|(_, action)| (action.predicate)(context))
            .map(|(id, action)| (*id, action.label.clone()))
            .collect()
    }

    /// Invoke a menu entry. Returns `false` if it is unknown or hidden
    /// for `context`.
    pub fn invoke_menu_action(&self, id: MenuActionId, context: &MenuContext) -> bool {
        let Some((_, action)) = self.menu.iter().find(|(entry, _)| *entry == id) else {
            return false;
        };
        if !(action.predicate)(context) {
            return false;
        }
        (action.on_invoke)(context);
        true
    }
}

impl Host for InMemoryHost {
    fn workspace(&mut self) -> &mut dyn Workspace {
        &mut self.workspace
    }

    fn open_hook(&self) -> OpenHookPoint {
        self.hook.clone()
    }

    fn add_context_menu_action(&mut self, action: MenuAction) -> Result<MenuActionId, HostError> {
        if !self.menu_enabled {
            return Err(HostError::MenuUnavailable("menu disabled".into()));
        }
        let id = MenuActionId::new();
        self.menu.push((id, action));
        Ok(id)
    }

    fn remove_context_menu_action(&mut self, id: MenuActionId) {
        self.menu.retain(|(entry, _)| *entry != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use crate::workspace::{DocumentId, ViewKind};

    fn doc(path: &str) -> DocumentId {
        DocumentId::parse(path).unwrap()
    }

    #[tokio::test]
    async fn open_goes_through_default_handler() {
        let mut ws = InMemoryWorkspace::new();
        ws.add_document(doc("/y.md"));
        let a = ws.open_view(ViewKind::default(), Some(doc("/x.md")));
        let mut host = InMemoryHost::new(ws);

        let opened = host.open(OpenRequest::new(a, doc("/y.md"))).await.unwrap();
        assert_eq!(opened, Opened::Loaded(a));
        assert_eq!(host.memory().len(), 1);
    }

    #[test]
    fn menu_respects_predicate() {
        let mut host = InMemoryHost::new(InMemoryWorkspace::new());
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let id = host
            .add_context_menu_action(MenuAction {
                label: "Open in same tab".into(),
                predicate: Box::new(|ctx| ctx.document.is_some()),
                on_invoke: Box::new(move |_| counter.set(counter.get() + 1)),
            })
            .unwrap();

        let with_doc = MenuContext {
            document: Some(doc("/x.md")),
            view: None,
        };
        let without_doc = MenuContext {
            document: None,
            view: None,
        };

        assert_eq!(host.menu_actions(&with_doc).len(), 1);
        assert!(host.menu_actions(&without_doc).is_empty());
        assert!(host.invoke_menu_action(id, &with_doc));
        assert!(!host.invoke_menu_action(id, &without_doc));
        assert_eq!(hits.get(), 1);

        host.remove_context_menu_action(id);
        assert!(!host.invoke_menu_action(id, &with_doc));
    }

    #[test]
    fn disabled_menu_rejects_actions() {
        let mut host = InMemoryHost::without_menu(InMemoryWorkspace::new());
        let result = host.add_context_menu_action(MenuAction {
            label: "x".into(),
            predicate: Box::new(|_| true),
            on_invoke: Box::new(|_| {}),
        });
        assert!(matches!(result, Err(HostError::MenuUnavailable(_))));
    }
}
