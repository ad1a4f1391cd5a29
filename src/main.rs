use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;

use web_import::application::{DownloadOutcome, SessionStep};
use web_import::settings::JsonFileSettings;
use web_import::ui::{ConsolePresenter, HeadlessSurface};
use web_import::{logging, HttpClient, ImportConfig, ImportSession};

/// Open a page and, if it is downloadable media, save it.
#[derive(Debug, Parser)]
#[command(name = "web-import", version)]
struct Cli {
    /// Address to open. Defaults to the last page visited.
    url: Option<String>,

    /// Directory downloads are saved into.
    #[arg(long)]
    download_dir: Option<PathBuf>,

    /// Settings file holding the home page.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Append logs to this file instead of stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.log_file {
        Some(path) => {
            if let Err(e) = logging::init_logging_file(path) {
                logging::init_logging_stderr();
                tracing::warn!(path = %path.display(), error = %e, "log file unavailable, using stderr");
            }
        }
        None => logging::init_logging_stderr(),
    }

    let mut config = ImportConfig::default();
    if let Some(dir) = cli.download_dir {
        config.download_dir = dir;
    }
    if let Some(path) = cli.settings {
        config.settings_path = path;
    }

    let client = HttpClient::new(&config).context("building HTTP client")?;
    let (tx, mut events) = mpsc::channel(64);
    let surface = Arc::new(HeadlessSurface::new(client.clone(), tx));
    let settings = JsonFileSettings::load(&config.settings_path);

    let mut session = ImportSession::new(
        &config,
        Arc::new(client),
        surface,
        Arc::new(ConsolePresenter::new()),
        Box::new(settings),
    );

    let opened = match cli.url.as_deref() {
        Some(url) => session.browse_to(url),
        None => session.open_home_page(),
    };
    if opened.is_none() {
        bail!("nothing to open: pass a URL");
    }

    loop {
        let step = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                session.downloads_mut().cancel().await;
                return Ok(());
            }
            step = session.step(&mut events) => step,
        };

        match step {
            SessionStep::DownloadFinished(DownloadOutcome::Failed { message, .. }) => {
                bail!(message);
            }
            SessionStep::DownloadFinished(_) | SessionStep::Closed => break,
            SessionStep::NavigationFinished(url) if !session.downloads().is_active() => {
                info!(%url, "ordinary page, nothing to import");
                break;
            }
            SessionStep::NavigationFailed { shown: true } if !session.downloads().is_active() => {
                bail!("page could not be loaded");
            }
            _ => {}
        }
    }

    Ok(())
}
