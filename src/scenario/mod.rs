//! Scenario scripts: line-based descriptions of host activity.
//!
//! One command per line. A `#` followed by whitespace starts a comment:
//!
//! ```text
//! file /notes/y.md
//! view A /notes/x.md
//! view B
//! restore C /notes/z.md
//! focus B
//! open /notes/x.md
//! open /notes/x.md in B mode=preview
//! open /notes/x.md #Intro
//! same /notes/y.md
//! close A
//! expect active A
//! expect views 3
//! expect shows C /notes/x.md
//! ```

pub mod runner;

use std::path::Path;
use std::sync::LazyLock;

use futures::StreamExt;
use regex::Regex;
use tokio::io::AsyncRead;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};

use crate::plugin::PluginError;
use crate::workspace::{DocumentId, OpenState, SubLocation, ViewMode, WorkspaceError};

pub use runner::ScenarioRunner;

static OPEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^open\s+(?P<doc>\S+)(?:\s+in\s+(?P<view>\S+))?(?:\s+mode=(?P<mode>\S+))?(?:\s+(?P<loc>[#:]\S+))?\s*$",
    )
    .expect("open pattern is valid")
});

// `#` directly followed by text is a heading in `open`, not a comment.
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)#(?:\s|$)").expect("comment pattern is valid"));

static LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("label pattern is valid"));

/// Scenario error.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("line {line}: expectation failed: {message}")]
    Expectation { line: usize, message: String },
    #[error("line {line}: unknown view {label}")]
    UnknownView { line: usize, label: String },
    #[error("line {line}: view {label} already exists")]
    DuplicateView { line: usize, label: String },
    #[error("line {line}: no view to open into")]
    NoTargetView { line: usize },
    #[error("line {line}: {source}")]
    Workspace {
        line: usize,
        #[source]
        source: WorkspaceError,
    },
    #[error(transparent)]
    Plugin(#[from] PluginError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Lines(#[from] LinesCodecError),
}

/// One parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    File(DocumentId),
    View {
        label: String,
        document: Option<DocumentId>,
    },
    Restore {
        label: String,
        document: DocumentId,
    },
    Focus(String),
    Close(String),
    Open {
        document: DocumentId,
        view: Option<String>,
        state: OpenState,
    },
    Same(DocumentId),
    ExpectActive(String),
    ExpectViews(usize),
    ExpectShows {
        label: String,
        document: Option<DocumentId>,
    },
}

/// A step with its 1-based source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub number: usize,
    pub step: Step,
}

fn document(path: &str) -> Result<DocumentId, String> {
    DocumentId::parse(path).ok_or_else(|| format!("invalid document path {path:?}"))
}

fn label(raw: &str) -> Result<String, String> {
    if LABEL_RE.is_match(raw) {
        Ok(raw.to_string())
    } else {
        Err(format!("invalid view label {raw:?}"))
    }
}

fn sub_location(raw: &str) -> Result<SubLocation, String> {
    if let Some(heading) = raw.strip_prefix('#') {
        return Ok(SubLocation::Heading(heading.to_string()));
    }
    raw.strip_prefix(':')
        .and_then(|line| line.parse().ok())
        .map(SubLocation::Line)
        .ok_or_else(|| format!("invalid sub-location {raw:?}"))
}

fn parse_open(text: &str) -> Result<Step, String> {
    let caps = OPEN_RE
        .captures(text)
        .ok_or_else(|| format!("malformed open: {text:?}"))?;
    let mode = caps
        .name("mode")
        .map(|m| m.as_str().parse::<ViewMode>())
        .transpose()?;
    let sub_location = caps
        .name("loc")
        .map(|m| sub_location(m.as_str()))
        .transpose()?;
    Ok(Step::Open {
        document: document(&caps["doc"])?,
        view: caps.name("view").map(|m| label(m.as_str())).transpose()?,
        state: OpenState { mode, sub_location },
    })
}

/// Parse one script line. Blank lines and comments yield `None`.
pub fn parse_line(raw: &str) -> Result<Option<Step>, String> {
    let text = COMMENT_RE
        .find(raw)
        .map_or(raw, |comment| &raw[..comment.start()])
        .trim();
    if text.is_empty() {
        return Ok(None);
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let step = match words.as_slice() {
        ["file", path] => Step::File(document(path)?),
        ["view", name] => Step::View {
            label: label(name)?,
            document: None,
        },
        ["view", name, path] => Step::View {
            label: label(name)?,
            document: Some(document(path)?),
        },
        ["restore", name, path] => Step::Restore {
            label: label(name)?,
            document: document(path)?,
        },
        ["focus", name] => Step::Focus(label(name)?),
        ["close", name] => Step::Close(label(name)?),
        ["open", ..] => parse_open(text)?,
        ["same", path] => Step::Same(document(path)?),
        ["expect", "active", name] => Step::ExpectActive(label(name)?),
        ["expect", "views", count] => Step::ExpectViews(
            count
                .parse()
                .map_err(|_| format!("invalid view count {count:?}"))?,
        ),
        ["expect", "shows", name] => Step::ExpectShows {
            label: label(name)?,
            document: None,
        },
        ["expect", "shows", name, path] => Step::ExpectShows {
            label: label(name)?,
            document: Some(document(path)?),
        },
        _ => return Err(format!("unrecognized command: {text:?}")),
    };
    Ok(Some(step))
}

/// Read and parse a script line by line.
pub async fn load<R>(reader: R) -> Result<Vec<Line>, ScenarioError>
where
    R: AsyncRead + Unpin,
{
    let mut lines = FramedRead::new(reader, LinesCodec::new());
    let mut steps = Vec::new();
    let mut number = 0;

    while let Some(raw) = lines.next().await {
        let raw = raw?;
        number += 1;
        let parsed = parse_line(&raw).map_err(|message| ScenarioError::Parse {
            line: number,
            message,
        })?;
        if let Some(step) = parsed {
            steps.push(Line { number, step });
        }
    }
    Ok(steps)
}

/// Read a script from a file.
pub async fn load_path(path: &Path) -> Result<Vec<Line>, ScenarioError> {
    let file = tokio::fs::File::open(path).await?;
    load(file).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(path: &str) -> DocumentId {
        DocumentId::parse(path).unwrap()
    }

    #[test]
    fn parses_plain_open() {
        assert_eq!(
            parse_line("open /notes/x.md").unwrap(),
            Some(Step::Open {
                document: doc("/notes/x.md"),
                view: None,
                state: OpenState::default(),
            })
        );
    }

    #[test]
    fn parses_open_with_all_options() {
        assert_eq!(
            parse_line("open /notes/x.md in B mode=preview #Intro").unwrap(),
            Some(Step::Open {
                document: doc("/notes/x.md"),
                view: Some("B".into()),
                state: OpenState {
                    mode: Some(ViewMode::Preview),
                    sub_location: Some(SubLocation::Heading("Intro".into())),
                },
            })
        );
        assert_eq!(
            parse_line("open /notes/x.md :42").unwrap(),
            Some(Step::Open {
                document: doc("/notes/x.md"),
                view: None,
                state: OpenState {
                    mode: None,
                    sub_location: Some(SubLocation::Line(42)),
                },
            })
        );
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   # setup").unwrap(), None);
        assert_eq!(
            parse_line("view A /x.md # first tab").unwrap(),
            Some(Step::View {
                label: "A".into(),
                document: Some(doc("/x.md")),
            })
        );
    }

    #[test]
    fn parses_expectations() {
        assert_eq!(parse_line("expect views 3").unwrap(), Some(Step::ExpectViews(3)));
        assert_eq!(
            parse_line("expect active A").unwrap(),
            Some(Step::ExpectActive("A".into()))
        );
        assert_eq!(
            parse_line("expect shows B").unwrap(),
            Some(Step::ExpectShows {
                label: "B".into(),
                document: None,
            })
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_line("teleport A").is_err());
        assert!(parse_line("open /x.md mode=graph").is_err());
        assert!(parse_line("open /x.md :abc").is_err());
        assert!(parse_line("view 1A").is_err());
        assert!(parse_line("expect views many").is_err());
    }

    #[tokio::test]
    async fn load_reports_line_numbers() {
        let script = b"view A /x.md\n\n# comment\nopen /x.md\nbogus\n";
        let err = load(&script[..]).await.unwrap_err();
        assert!(matches!(err, ScenarioError::Parse { line: 5, .. }));
    }

    #[tokio::test]
    async fn load_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.txt");
        tokio::fs::write(&path, "view A /x.md\nopen /x.md\n")
            .await
            .unwrap();

        let lines = load_path(&path).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].number, 2);
    }

    #[tokio::test]
    async fn load_path_missing_file() {
        let result = load_path(Path::new("/nonexistent/dir/scenario.txt")).await;
        assert!(matches!(result, Err(ScenarioError::Io(_))));
    }
}
