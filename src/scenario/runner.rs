//! Scenario runner: replays a script against [`InMemoryHost`] with the
//! dedupe plugin active and records a transcript.
//!
//! Views declared by the script keep their labels; views the host
//! creates along the way get the next unused capital letter. Labels of
//! closed views stay bound to their stale handles and are never reused.

use std::collections::HashMap;

use super::{Line, ScenarioError, Step};
use crate::host::MenuContext;
use crate::host::memory::InMemoryHost;
use crate::intercept::{OpenRequest, Opened};
use crate::observe::Correction;
use crate::plugin::{DedupePlugin, SAME_VIEW_LABEL, Settings};
use crate::workspace::memory::InMemoryWorkspace;
use crate::workspace::{DocumentId, OpenState, ViewId, Workspace};

pub struct ScenarioRunner {
    host: InMemoryHost,
    plugin: DedupePlugin,
    labels: HashMap<String, ViewId>,
    names: HashMap<ViewId, String>,
}

impl ScenarioRunner {
    /// Runner with an empty workspace and the plugin activated.
    pub fn new(settings: Settings) -> Result<Self, ScenarioError> {
        let mut host = InMemoryHost::new(InMemoryWorkspace::new());
        let mut plugin = DedupePlugin::new(settings);
        plugin.activate(&mut host)?;
        Ok(Self {
            host,
            plugin,
            labels: HashMap::new(),
            names: HashMap::new(),
        })
    }

    pub fn host(&self) -> &InMemoryHost {
        &self.host
    }

    /// Run every line, stopping at the first script error.
    pub async fn run(&mut self, lines: &[Line]) -> Result<Vec<String>, ScenarioError> {
        let mut transcript = Vec::new();
        for line in lines {
            transcript.extend(self.step(line).await?);
        }
        Ok(transcript)
    }

    /// Run one line and return its transcript entries.
    pub async fn step(&mut self, line: &Line) -> Result<Vec<String>, ScenarioError> {
        let number = line.number;
        let mut out = Vec::new();

        match &line.step {
            Step::File(document) => self.host.memory_mut().add_document(document.clone()),
            Step::View { label, document } => {
                self.ensure_unused(number, label)?;
                let kind = self.plugin.settings().view_kind.clone();
                let id = self.host.memory_mut().open_view(kind, document.clone());
                self.name(label.clone(), id);
            }
            Step::Restore { label, document } => {
                self.ensure_unused(number, label)?;
                let kind = self.plugin.settings().view_kind.clone();
                let id = self
                    .host
                    .memory_mut()
                    .open_deferred_view(kind, document.clone());
                self.name(label.clone(), id);
            }
            Step::Focus(label) => {
                let id = self.resolve_label(number, label)?;
                self.host
                    .memory_mut()
                    .focus(id)
                    .map_err(|source| ScenarioError::Workspace { line: number, source })?;
            }
            Step::Close(label) => {
                let id = self.resolve_label(number, label)?;
                self.host
                    .memory_mut()
                    .close_view(id)
                    .map_err(|source| ScenarioError::Workspace { line: number, source })?;
            }
            Step::Open {
                document,
                view,
                state,
            } => {
                let target = match view {
                    Some(label) => self.resolve_label(number, label)?,
                    None => self.active(number)?,
                };
                out.push(self.open(document, target, state.clone()).await);
            }
            Step::Same(document) => {
                let target = self.active(number)?;
                let context = MenuContext {
                    document: Some(document.clone()),
                    view: Some(target),
                };
                let action = self
                    .host
                    .menu_actions(&context)
                    .into_iter()
                    .find(|(_, label)| label == SAME_VIEW_LABEL);
                if let Some((id, _)) = action {
                    self.host.invoke_menu_action(id, &context);
                }
                out.push(self.open(document, target, OpenState::default()).await);
            }
            Step::ExpectActive(label) => {
                let expected = self.resolve_label(number, label)?;
                let active = self.host.memory().active_view();
                if active != Some(expected) {
                    return Err(ScenarioError::Expectation {
                        line: number,
                        message: format!(
                            "active view is {}, expected {label}",
                            self.describe(active)
                        ),
                    });
                }
            }
            Step::ExpectViews(count) => {
                let live = self.host.memory().len();
                if live != *count {
                    return Err(ScenarioError::Expectation {
                        line: number,
                        message: format!("{live} live views, expected {count}"),
                    });
                }
            }
            Step::ExpectShows { label, document } => {
                let id = self.resolve_label(number, label)?;
                let shown = self
                    .host
                    .memory()
                    .view(id)
                    .and_then(|view| view.displayed_document());
                if shown != *document {
                    return Err(ScenarioError::Expectation {
                        line: number,
                        message: format!(
                            "{label} shows {}, expected {}",
                            show(shown.as_ref()),
                            show(document.as_ref())
                        ),
                    });
                }
            }
        }

        for correction in self.plugin.pump(&mut self.host) {
            if let Correction::Refocused { from, to } = correction {
                self.label_new_views();
                out.push(format!(
                    "refocus {} -> {}",
                    self.describe(Some(from)),
                    self.describe(Some(to))
                ));
            }
        }
        self.label_new_views();
        Ok(out)
    }

    async fn open(&mut self, document: &DocumentId, target: ViewId, state: OpenState) -> String {
        let request = OpenRequest::new(target, document.clone()).with_state(state);
        let result = self.host.open(request).await;
        self.label_new_views();
        match result {
            Ok(Opened::Revealed(view)) => {
                format!("open {document} -> revealed {}", self.describe(Some(view)))
            }
            Ok(Opened::Loaded(view)) => {
                format!("open {document} -> loaded in {}", self.describe(Some(view)))
            }
            Err(e) => format!("open {document} -> failed: {e}"),
        }
    }

    fn active(&self, line: usize) -> Result<ViewId, ScenarioError> {
        self.host
            .memory()
            .active_view()
            .ok_or(ScenarioError::NoTargetView { line })
    }

    fn resolve_label(&self, line: usize, label: &str) -> Result<ViewId, ScenarioError> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| ScenarioError::UnknownView {
                line,
                label: label.to_string(),
            })
    }

    fn ensure_unused(&self, line: usize, label: &str) -> Result<(), ScenarioError> {
        if self.labels.contains_key(label) {
            Err(ScenarioError::DuplicateView {
                line,
                label: label.to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn name(&mut self, label: String, id: ViewId) {
        self.names.insert(id, label.clone());
        self.labels.insert(label, id);
    }

    /// Give every unnamed live view the next free label.
    fn label_new_views(&mut self) {
        let unnamed: Vec<ViewId> = self
            .host
            .memory()
            .live_views()
            .into_iter()
            .map(|view| view.id)
            .filter(|id| !self.names.contains_key(id))
            .collect();
        for id in unnamed {
            let label = self.next_free_label();
            self.name(label, id);
        }
    }

    fn next_free_label(&self) -> String {
        let letters = ('A'..='Z').map(String::from);
        let numbered = (1..).map(|n| format!("V{n}"));
        letters
            .chain(numbered)
            .find(|label| !self.labels.contains_key(label))
            .unwrap_or_default()
    }

    fn describe(&self, view: Option<ViewId>) -> String {
        match view {
            Some(id) => self
                .names
                .get(&id)
                .cloned()
                .unwrap_or_else(|| id.to_string()),
            None => "none".to_string(),
        }
    }

    /// Deactivate the plugin and hand back the host.
    pub fn finish(mut self) -> InMemoryHost {
        self.plugin.deactivate(&mut self.host);
        self.host
    }
}

fn show(document: Option<&DocumentId>) -> String {
    document.map_or_else(|| "nothing".to_string(), |document| document.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Host;
    use crate::plugin::Mode;
    use crate::scenario::load;

    async fn run_script(settings: Settings, script: &str) -> Result<Vec<String>, ScenarioError> {
        let lines = load(script.as_bytes()).await?;
        let mut runner = ScenarioRunner::new(settings)?;
        runner.run(&lines).await
    }

    #[tokio::test]
    async fn reveal_then_new_view_after_close() {
        let script = "\
view A /notes/x.md
view B
focus B
open /notes/x.md
expect active A
expect views 2
close A
open /notes/x.md
expect views 2
expect shows C /notes/x.md
";
        let transcript = run_script(Settings::default(), script).await.unwrap();
        assert_eq!(
            transcript,
            vec![
                "open /notes/x.md -> revealed A".to_string(),
                "open /notes/x.md -> loaded in C".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn bypasses_load_in_place() {
        let script = "\
view A /notes/x.md
view B
open /notes/x.md in B mode=preview
expect shows B /notes/x.md
open /notes/x.md #Intro
expect views 2
";
        let transcript = run_script(Settings::default(), script).await.unwrap();
        assert_eq!(
            transcript,
            vec![
                "open /notes/x.md -> loaded in B".to_string(),
                "open /notes/x.md -> loaded in B".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn same_tab_action_skips_dedupe_once() {
        let script = "\
view A /notes/x.md
view B /notes/y.md
focus B
same /notes/x.md
expect shows B /notes/x.md
focus A
open /notes/y.md
";
        let transcript = run_script(Settings::default(), script).await.unwrap();
        assert_eq!(
            transcript,
            vec![
                "open /notes/x.md -> loaded in B".to_string(),
                "open /notes/y.md -> loaded in C".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn unknown_document_is_reported_not_fatal() {
        let script = "\
view A
open /notes/missing.md
";
        let transcript = run_script(Settings::default(), script).await.unwrap();
        assert_eq!(transcript.len(), 1);
        assert!(transcript[0].starts_with("open /notes/missing.md -> failed:"));
    }

    #[tokio::test]
    async fn observe_mode_refocuses() {
        let script = "\
view A /notes/x.md
view B /notes/y.md
focus B
open /notes/x.md
expect active A
";
        let settings = Settings {
            mode: Mode::Observe,
            ..Settings::default()
        };
        let transcript = run_script(settings, script).await.unwrap();
        assert_eq!(
            transcript,
            vec![
                "open /notes/x.md -> loaded in B".to_string(),
                "refocus B -> A".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn failed_expectation_stops_the_run() {
        let script = "\
view A /notes/x.md
expect views 3
";
        let err = run_script(Settings::default(), script).await.unwrap_err();
        assert!(matches!(err, ScenarioError::Expectation { line: 2, .. }));
    }

    #[tokio::test]
    async fn unknown_label_is_an_error() {
        let err = run_script(Settings::default(), "focus Z\n")
            .await
            .unwrap_err();
        assert!(matches!(err, ScenarioError::UnknownView { line: 1, .. }));
    }

    #[tokio::test]
    async fn open_with_no_views_is_an_error() {
        let err = run_script(Settings::default(), "open /x.md\n")
            .await
            .unwrap_err();
        assert!(matches!(err, ScenarioError::NoTargetView { line: 1 }));
    }

    #[tokio::test]
    async fn finish_uninstalls_hook() {
        let runner = ScenarioRunner::new(Settings::default()).unwrap();
        assert!(runner.host().open_hook().is_installed());
        let host = runner.finish();
        assert!(!host.open_hook().is_installed());
    }
}
