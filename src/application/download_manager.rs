use std::path::PathBuf;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use url::Url;

use super::download_coordinator::{remove_partial_file, DownloadCoordinator, TransferEvent};
use crate::domain::{AuthMethod, Credential, DownloadState, DownloadTask, ImportError};
use crate::ui::Presenter;

/// How a download ended, handed back to the session once the task is gone.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadOutcome {
    Succeeded {
        path: PathBuf,
    },
    Failed {
        message: String,
        status: Option<u16>,
    },
    /// The server wants credentials. Nothing was shown to the user yet.
    ChallengeRequired {
        url: Url,
        host: String,
        method: AuthMethod,
        had_credential: bool,
    },
}

struct ActiveDownload {
    task: DownloadTask,
    had_credential: bool,
    events: mpsc::UnboundedReceiver<TransferEvent>,
    handle: JoinHandle<()>,
}

/// Owns the single download. The transfer itself runs on a spawned task;
/// its events come back here and only here is the task state changed.
pub struct DownloadManager {
    coordinator: DownloadCoordinator,
    presenter: Arc<dyn Presenter>,
    active: Option<ActiveDownload>,
}

impl DownloadManager {
    pub fn new(coordinator: DownloadCoordinator, presenter: Arc<dyn Presenter>) -> Self {
        Self {
            coordinator,
            presenter,
            active: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_task(&self) -> Option<&DownloadTask> {
        self.active.as_ref().map(|active| &active.task)
    }

    /// Starts downloading `url`. A second start while one is running is
    /// rejected and reported to the user; the running one is left alone.
    pub fn start(&mut self, url: Url, credential: Option<Credential>) -> Result<(), ImportError> {
        if let Some(active) = &self.active {
            warn!(%url, running = %active.task.url, "download already in progress, rejecting");
            let error = ImportError::DownloadInProgress;
            self.presenter.show_error(&error.to_string());
            return Err(error);
        }

        info!(%url, authenticated = credential.is_some(), "starting download");
        let had_credential = credential.is_some();
        let mut stream = self.coordinator.download_stream(url.clone(), credential);
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                if tx.send(event).is_err() {
                    break;
                }
            }
        });

        self.presenter.show_progress(0.0, &progress_label(0.0));
        self.active = Some(ActiveDownload {
            task: DownloadTask::new(url),
            had_credential,
            events: rx,
            handle,
        });
        Ok(())
    }

    /// Applies the next transfer event. Returns the outcome when it was the
    /// terminal one, `None` after a progress step. Pending forever while
    /// idle, so it can sit in a `select!`.
    pub async fn pump(&mut self) -> Option<DownloadOutcome> {
        let Some(active) = self.active.as_mut() else {
            return std::future::pending().await;
        };

        let event = match active.events.recv().await {
            Some(event) => event,
            None => {
                // Sender dropped without a terminal event: the transfer task died.
                if let Some(path) = &active.task.destination_path {
                    remove_partial_file(path).await;
                }
                TransferEvent::Failed(ImportError::Transport(
                    "transfer ended unexpectedly".to_string(),
                ))
            }
        };

        self.apply(event)
    }

    /// Drives the active download to its end. `None` if nothing was running.
    pub async fn wait(&mut self) -> Option<DownloadOutcome> {
        while self.is_active() {
            if let Some(outcome) = self.pump().await {
                return Some(outcome);
            }
        }
        None
    }

    /// Stops the running download, removes its partial file and reports the
    /// failure once.
    pub async fn cancel(&mut self) -> Option<DownloadOutcome> {
        let mut active = self.active.take()?;
        active.handle.abort();
        let _ = (&mut active.handle).await;

        let mut finished = None;
        while let Ok(event) = active.events.try_recv() {
            match event {
                TransferEvent::Started { path, .. } => active.task.destination_path = Some(path),
                TransferEvent::Progress { .. } => {}
                terminal => finished = Some(terminal),
            }
        }
        self.active = Some(active);

        // Ended on its own before the abort landed.
        if let Some(terminal) = finished {
            return self.apply(terminal);
        }

        if let Some(path) = self
            .active
            .as_ref()
            .and_then(|active| active.task.destination_path.as_ref())
        {
            remove_partial_file(path).await;
        }
        info!("download cancelled");
        self.apply(TransferEvent::Failed(ImportError::Cancelled))
    }

    fn apply(&mut self, event: TransferEvent) -> Option<DownloadOutcome> {
        let active = self.active.as_mut()?;
        let task = &mut active.task;

        match event {
            TransferEvent::Started {
                path,
                bytes_expected,
            } => {
                task.state = DownloadState::InProgress;
                task.destination_path = Some(path);
                task.bytes_expected = bytes_expected;
                None
            }
            TransferEvent::Progress {
                bytes_received,
                bytes_expected,
            } => {
                task.state = DownloadState::InProgress;
                task.bytes_received = task.bytes_received.max(bytes_received);
                task.bytes_expected = bytes_expected.or(task.bytes_expected);
                let fraction = task.fraction_completed();
                self.presenter.show_progress(fraction, &progress_label(fraction));
                None
            }
            TransferEvent::Completed {
                path,
                bytes_received,
            } => {
                task.state = DownloadState::Succeeded;
                task.bytes_received = bytes_received;
                info!(url = %task.url, path = %path.display(), bytes = bytes_received, "download successful");
                self.active = None;
                self.presenter.hide_progress();
                self.presenter.show_success_prompt(&path);
                Some(DownloadOutcome::Succeeded { path })
            }
            TransferEvent::Failed(error) => {
                task.state = DownloadState::Failed;
                task.error = Some(error.to_string());
                let url = task.url.clone();
                let had_credential = active.had_credential;
                self.active = None;
                self.presenter.hide_progress();

                if let ImportError::AuthenticationRequired { host, method } = error {
                    info!(%url, %host, %method, "download needs authentication");
                    return Some(DownloadOutcome::ChallengeRequired {
                        url,
                        host,
                        method,
                        had_credential,
                    });
                }

                warn!(%url, error = %error, "download failed");
                let message = failure_message(&error);
                self.presenter.show_error(&message);
                Some(DownloadOutcome::Failed {
                    message,
                    status: error.status(),
                })
            }
        }
    }
}

pub fn progress_label(fraction: f32) -> String {
    format!("Downloading... {:.0}%", fraction * 100.0)
}

pub fn failure_message(error: &ImportError) -> String {
    match error {
        ImportError::Cancelled => error.to_string(),
        _ => format!("Error downloading file: {}", error),
    }
}
