use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

use super::challenge_handler::ChallengeHandler;
use super::classifier::ContentClassifier;
use super::credential_store::CredentialStore;
use super::download_coordinator::DownloadCoordinator;
use super::download_manager::{failure_message, DownloadManager, DownloadOutcome};
use super::navigation_gate::NavigationGate;
use crate::api::{ImportConfig, Transport};
use crate::domain::{ChallengeDecision, ImportError, NavigationDecision};
use crate::settings::{SettingsStore, HOME_PAGE_KEY};
use crate::ui::{BrowserEvent, BrowsingSurface, Presenter};
use crate::utils::normalize_browse_input;

/// What one turn of the event loop did.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStep {
    Response(NavigationDecision),
    Challenge(ChallengeDecision),
    NavigationFailed { shown: bool },
    NavigationFinished(Url),
    DownloadProgress,
    /// A download hit a 401, got credentials and started over.
    DownloadRestarted,
    DownloadFinished(DownloadOutcome),
    /// The surface went away and no download is left.
    Closed,
}

/// Wires the browsing surface's events to the gate, the challenge handler
/// and the download manager. All state lives here, owned by one task.
pub struct ImportSession {
    surface: Arc<dyn BrowsingSurface>,
    presenter: Arc<dyn Presenter>,
    settings: Box<dyn SettingsStore>,
    gate: NavigationGate,
    challenges: ChallengeHandler,
    credentials: CredentialStore,
    downloads: DownloadManager,
}

impl ImportSession {
    pub fn new(
        config: &ImportConfig,
        transport: Arc<dyn Transport>,
        surface: Arc<dyn BrowsingSurface>,
        presenter: Arc<dyn Presenter>,
        settings: Box<dyn SettingsStore>,
    ) -> Self {
        let coordinator = DownloadCoordinator::new(transport, config.download_dir.clone());
        Self {
            downloads: DownloadManager::new(coordinator, presenter.clone()),
            surface,
            presenter,
            settings,
            gate: NavigationGate::new(ContentClassifier::new()),
            challenges: ChallengeHandler::new(),
            credentials: CredentialStore::new(),
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn downloads(&self) -> &DownloadManager {
        &self.downloads
    }

    pub fn downloads_mut(&mut self) -> &mut DownloadManager {
        &mut self.downloads
    }

    pub fn home_page(&self) -> Option<String> {
        self.settings.get_string(HOME_PAGE_KEY)
    }

    /// Browses to the saved home page, if there is one.
    pub fn open_home_page(&mut self) -> Option<Url> {
        let saved = self.home_page()?;
        self.browse_to(&saved)
    }

    /// Loads what the user typed, assuming `http://` when no scheme is given.
    pub fn browse_to(&mut self, input: &str) -> Option<Url> {
        let normalized = normalize_browse_input(input)?;
        let url = match Url::parse(&normalized) {
            Ok(url) => url,
            Err(e) => {
                debug!(input, error = %e, "rejecting address");
                self.presenter
                    .show_error(&ImportError::InvalidUrl(normalized).to_string());
                return None;
            }
        };

        self.surface.set_address_bar_text(url.as_str());
        self.surface.load(&url);
        self.remember(&url);
        Some(url)
    }

    pub fn go_back(&self) {
        self.surface.go_back();
    }

    pub fn go_forward(&self) {
        self.surface.go_forward();
    }

    pub async fn handle_event(&mut self, event: BrowserEvent) -> SessionStep {
        match event {
            BrowserEvent::ResponseReceived {
                url,
                status,
                headers,
            } => {
                let decision = self.gate.on_response(
                    &url,
                    status,
                    &headers,
                    self.surface.as_ref(),
                    &mut self.downloads,
                    &self.credentials,
                );
                SessionStep::Response(decision)
            }
            BrowserEvent::AuthChallenge {
                hostname,
                method,
                reply,
            } => {
                let title = self
                    .surface
                    .navigation_state()
                    .title
                    .unwrap_or_else(|| hostname.clone());
                let decision = self
                    .challenges
                    .on_auth_challenge(
                        &hostname,
                        method,
                        &title,
                        self.presenter.as_ref(),
                        &mut self.credentials,
                    )
                    .await;
                if reply.send(decision.clone()).is_err() {
                    debug!(host = %hostname, "challenge answered after the request went away");
                }
                SessionStep::Challenge(decision)
            }
            BrowserEvent::NavigationFailed { code, message } => {
                let shown = self
                    .gate
                    .on_navigation_failed(code, &message, self.presenter.as_ref());
                SessionStep::NavigationFailed { shown }
            }
            BrowserEvent::NavigationFinished { url } => {
                self.surface.set_address_bar_text(url.as_str());
                let state = self.surface.navigation_state();
                self.surface
                    .set_back_forward_button_enabled(state.can_go_back, state.can_go_forward);
                self.remember(&url);
                SessionStep::NavigationFinished(url)
            }
        }
    }

    /// Handles one surface event or one download event, whichever is first.
    pub async fn step(&mut self, events: &mut mpsc::Receiver<BrowserEvent>) -> SessionStep {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => self.handle_event(event).await,
                None if self.downloads.is_active() => {
                    let outcome = self.downloads.pump().await;
                    self.on_download_step(outcome).await
                }
                None => SessionStep::Closed,
            },
            outcome = self.downloads.pump() => self.on_download_step(outcome).await,
        }
    }

    /// Runs until the surface closes its event channel and the last
    /// download has ended.
    pub async fn run(&mut self, mut events: mpsc::Receiver<BrowserEvent>) {
        while self.step(&mut events).await != SessionStep::Closed {}
        info!("import session closed");
    }

    async fn on_download_step(&mut self, outcome: Option<DownloadOutcome>) -> SessionStep {
        match outcome {
            None => SessionStep::DownloadProgress,
            Some(DownloadOutcome::ChallengeRequired {
                url,
                host,
                method,
                had_credential,
            }) => {
                if !had_credential {
                    let decision = self
                        .challenges
                        .on_auth_challenge(
                            &host,
                            method,
                            &host,
                            self.presenter.as_ref(),
                            &mut self.credentials,
                        )
                        .await;
                    if let ChallengeDecision::UseCredential(credential) = decision {
                        if self.downloads.start(url, Some(credential)).is_ok() {
                            return SessionStep::DownloadRestarted;
                        }
                    }
                }

                let error = ImportError::HttpStatus { status: 401 };
                let message = failure_message(&error);
                self.presenter.show_error(&message);
                SessionStep::DownloadFinished(DownloadOutcome::Failed {
                    message,
                    status: error.status(),
                })
            }
            Some(outcome) => SessionStep::DownloadFinished(outcome),
        }
    }

    fn remember(&mut self, url: &Url) {
        if let Err(e) = self.settings.set_string(HOME_PAGE_KEY, url.as_str()) {
            warn!(%url, error = %e, "could not save home page");
        }
    }
}
