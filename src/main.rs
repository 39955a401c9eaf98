use browser_refs::{
    BrowserSession, ChromeBrowser, Config, DomProcessor, Snapshot, SnapshotOptions, Verbosity,
};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "browser-refs", version, about = "Ref-tagged page snapshots for browser agents")]
struct Cli {
    /// JSON config file; defaults apply to anything it leaves out
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Open a URL in Chrome and print its snapshot
    Snapshot {
        url: String,
        #[command(flatten)]
        view: ViewArgs,
        /// Show the browser window
        #[arg(long)]
        headed: bool,
    },
    /// Classify a local HTML file without starting a browser
    Html {
        file: PathBuf,
        #[command(flatten)]
        view: ViewArgs,
    },
}

#[derive(Args)]
struct ViewArgs {
    /// minimal, normal or detailed
    #[arg(long)]
    verbosity: Option<Verbosity>,
    #[arg(long)]
    max_refs: Option<usize>,
    /// Only classify inside the first element matching this selector
    #[arg(long)]
    scope: Option<String>,
    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

impl ViewArgs {
    fn options(&self) -> SnapshotOptions {
        SnapshotOptions {
            scope: self.scope.clone(),
            verbosity: self.verbosity,
            max_refs: self.max_refs,
        }
    }

    fn print(&self, snapshot: &Snapshot) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(snapshot)?);
        } else {
            print!("{}", snapshot.to_text());
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    match cli.command {
        Command::Snapshot { url, view, headed } => {
            config.browser.headless = !headed;
            let mut session = BrowserSession::new(ChromeBrowser::new(), config).await?;
            info!(session_id = session.session_id(), "browser ready");

            session.navigate(&url).await?;
            let snapshot = session.observe(&view.options()).await?;
            view.print(&snapshot)?;
            session.close().await?;
        }
        Command::Html { file, view } => {
            let html = std::fs::read_to_string(&file)?;
            let url = format!("file://{}", file.display());
            let processor = DomProcessor::new(config.snapshot);
            let snapshot = processor.snapshot_html(&url, &html, &view.options())?;
            view.print(&snapshot)?;
        }
    }

    Ok(())
}
