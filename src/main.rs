//! tabkeeper CLI: replay a workspace scenario with duplicate-view
//! suppression active and print what happened to each open.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use tabkeeper::plugin::{Mode, Settings};
use tabkeeper::scenario::{self, ScenarioRunner};
use tabkeeper::workspace::ViewKind;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Redirect opens before anything loads.
    Intercept,
    /// Let opens happen, then move focus back.
    Observe,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Intercept => Mode::Intercept,
            ModeArg::Observe => Mode::Observe,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "tabkeeper")]
#[command(about = "Replay a workspace scenario with duplicate-view suppression")]
struct Args {
    /// Scenario script, or `-` for stdin
    #[arg(value_name = "SCRIPT")]
    script: PathBuf,

    /// Suppression mode
    #[arg(short, long, value_enum, default_value = "intercept")]
    mode: ModeArg,

    /// View kind to track
    #[arg(long, default_value = "markdown")]
    view_kind: String,

    /// Start with an empty registry instead of scanning live views
    #[arg(long)]
    no_warm_up: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_level = if args.verbose {
        "tabkeeper=debug"
    } else {
        "tabkeeper=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let lines = if args.script.as_os_str() == "-" {
        scenario::load(tokio::io::stdin()).await?
    } else {
        scenario::load_path(&args.script).await?
    };
    tracing::debug!(steps = lines.len(), "scenario loaded");

    let settings = Settings {
        mode: args.mode.into(),
        view_kind: ViewKind::new(args.view_kind),
        warm_up: !args.no_warm_up,
    };
    let mut runner = ScenarioRunner::new(settings)?;
    let result = runner.run(&lines).await;
    let host = runner.finish();

    for line in result? {
        println!("{line}");
    }
    tracing::info!(views = host.memory().len(), "scenario complete");
    Ok(())
}
