//! Terminal stand-ins for the embedded browser and the alert/progress UI,
//! used by the `web-import` binary.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use reqwest::header::WWW_AUTHENTICATE;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use url::Url;

use super::{BrowserEvent, BrowsingSurface, CredentialInput, CredentialRequest, Presenter};
use crate::api::HttpClient;
use crate::application::FRAME_LOAD_INTERRUPTED;
use crate::domain::{AuthMethod, ChallengeDecision, Credential, NavigationState};

/// Code reported when the user declines to authenticate a page load.
pub const USER_CANCELLED_AUTHENTICATION: i64 = -1012;
/// Code reported when the page could not be fetched at all.
pub const CANNOT_LOAD_PAGE: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingKind {
    New,
    Reload,
}

#[derive(Debug)]
struct PendingNavigation {
    url: Url,
    kind: PendingKind,
}

#[derive(Debug, Default)]
struct SurfaceState {
    history: Vec<Url>,
    index: Option<usize>,
    pending: Option<PendingNavigation>,
    credential: Option<Credential>,
}

impl SurfaceState {
    fn current(&self) -> Option<&Url> {
        self.index.and_then(|i| self.history.get(i))
    }
}

/// A browser without a renderer: it fetches each navigation's headers and
/// reports them as the events a web view would send.
#[derive(Clone)]
pub struct HeadlessSurface {
    client: HttpClient,
    events: mpsc::Sender<BrowserEvent>,
    state: Arc<Mutex<SurfaceState>>,
}

impl HeadlessSurface {
    pub fn new(client: HttpClient, events: mpsc::Sender<BrowserEvent>) -> Self {
        Self {
            client,
            events,
            state: Arc::new(Mutex::new(SurfaceState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SurfaceState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: BrowserEvent) {
        if let Err(e) = self.events.try_send(event) {
            warn!(error = %e, "dropping browser event");
        }
    }

    fn navigate(&self, url: Url, kind: PendingKind) {
        let client = self.client.clone();
        let events = self.events.clone();
        let state = self.state.clone();

        tokio::spawn(async move {
            let host = url.host_str().unwrap_or_default().to_string();
            let mut credential = state
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .credential
                .clone()
                .filter(|c| c.host == host);

            let mut head = client.probe(&url, credential.as_ref()).await;

            let challenged = credential.is_none() && matches!(&head, Ok(h) if h.status == 401);
            if challenged {
                let method = head
                    .as_ref()
                    .ok()
                    .and_then(|h| h.headers.get(WWW_AUTHENTICATE))
                    .and_then(|v| v.to_str().ok())
                    .map(|v| AuthMethod::from_www_authenticate(Some(v)))
                    .unwrap_or(AuthMethod::Default);
                let (reply, answer) = oneshot::channel();
                let challenge = BrowserEvent::AuthChallenge {
                    hostname: host.clone(),
                    method,
                    reply,
                };
                if events.send(challenge).await.is_err() {
                    return;
                }

                match answer.await {
                    Ok(ChallengeDecision::UseCredential(c)) => {
                        state
                            .lock()
                            .unwrap_or_else(|poisoned| poisoned.into_inner())
                            .credential = Some(c.clone());
                        credential = Some(c);
                        head = client.probe(&url, credential.as_ref()).await;
                    }
                    Ok(ChallengeDecision::PerformDefault) => {}
                    Ok(ChallengeDecision::Cancel) | Err(_) => {
                        let _ = events
                            .send(BrowserEvent::NavigationFailed {
                                code: USER_CANCELLED_AUTHENTICATION,
                                message: "The user canceled authentication.".to_string(),
                            })
                            .await;
                        return;
                    }
                }
            }

            let event = match head {
                Ok(head) => {
                    state
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .pending = Some(PendingNavigation {
                        url: head.url.clone(),
                        kind,
                    });
                    BrowserEvent::ResponseReceived {
                        url: head.url,
                        status: head.status,
                        headers: head.headers,
                    }
                }
                Err(e) => BrowserEvent::NavigationFailed {
                    code: CANNOT_LOAD_PAGE,
                    message: e.to_string(),
                },
            };
            let _ = events.send(event).await;
        });
    }

    fn move_in_history(&self, forward: bool) {
        let url = {
            let mut state = self.lock();
            let Some(index) = state.index else {
                return;
            };
            let target = if forward {
                index + 1
            } else {
                match index.checked_sub(1) {
                    Some(i) => i,
                    None => return,
                }
            };
            let Some(url) = state.history.get(target).cloned() else {
                return;
            };
            state.index = Some(target);
            url
        };
        self.emit(BrowserEvent::NavigationFinished { url });
    }
}

impl BrowsingSurface for HeadlessSurface {
    fn load(&self, url: &Url) {
        self.navigate(url.clone(), PendingKind::New);
    }

    fn cancel_current_navigation(&self) {
        if self.lock().pending.take().is_some() {
            self.emit(BrowserEvent::NavigationFailed {
                code: FRAME_LOAD_INTERRUPTED,
                message: "Frame load interrupted".to_string(),
            });
        }
    }

    fn allow_current_navigation(&self) {
        let url = {
            let mut state = self.lock();
            let Some(pending) = state.pending.take() else {
                return;
            };
            if pending.kind == PendingKind::New {
                let keep = state.index.map_or(0, |i| i + 1);
                state.history.truncate(keep);
                state.history.push(pending.url.clone());
                state.index = Some(state.history.len() - 1);
            }
            pending.url
        };
        self.emit(BrowserEvent::NavigationFinished { url });
    }

    fn go_back(&self) {
        self.move_in_history(false);
    }

    fn go_forward(&self) {
        self.move_in_history(true);
    }

    fn reload(&self) {
        let current = self.lock().current().cloned();
        if let Some(url) = current {
            self.navigate(url, PendingKind::Reload);
        }
    }

    fn set_address_bar_text(&self, text: &str) {
        debug!(text, "address bar");
    }

    fn set_back_forward_button_enabled(&self, back: bool, forward: bool) {
        debug!(back, forward, "history buttons");
    }

    fn navigation_state(&self) -> NavigationState {
        let state = self.lock();
        let index = state.index;
        NavigationState {
            current_url: state.current().cloned(),
            title: state.current().and_then(|u| u.host_str()).map(str::to_string),
            can_go_back: index.is_some_and(|i| i > 0),
            can_go_forward: index.is_some_and(|i| i + 1 < state.history.len()),
        }
    }
}

/// Progress on stderr, credentials read from stdin.
pub struct ConsolePresenter {
    last_percent: Mutex<Option<u32>>,
    stdin: tokio::sync::Mutex<Lines<BufReader<Stdin>>>,
}

impl ConsolePresenter {
    pub fn new() -> Self {
        Self {
            last_percent: Mutex::new(None),
            stdin: tokio::sync::Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }

    async fn read_line(&self, prompt: &str) -> Option<String> {
        eprint!("{}", prompt);
        self.stdin.lock().await.next_line().await.ok().flatten()
    }
}

impl Default for ConsolePresenter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Presenter for ConsolePresenter {
    fn show_progress(&self, fraction: f32, label: &str) {
        let percent = (fraction * 100.0).round() as u32;
        let mut last = self
            .last_percent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *last != Some(percent) {
            *last = Some(percent);
            eprint!("\r{}", label);
        }
    }

    fn hide_progress(&self) {
        let mut last = self
            .last_percent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if last.take().is_some() {
            eprintln!();
        }
    }

    fn show_success_prompt(&self, path: &Path) {
        println!("Downloaded successfully: {}", path.display());
    }

    fn show_error(&self, message: &str) {
        eprintln!("Error: {}", message);
    }

    async fn prompt_credentials(&self, request: &CredentialRequest) -> Option<CredentialInput> {
        eprintln!("{}: {}", request.title, request.message());
        let user = self.read_line("User (empty to cancel): ").await?;
        if user.trim().is_empty() {
            return None;
        }
        let secret = self.read_line("Password: ").await?;
        Some(CredentialInput {
            user: user.trim().to_string(),
            secret,
        })
    }
}
