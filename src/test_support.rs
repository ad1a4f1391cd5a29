//! Recording fakes of the collaborators, shared by the unit tests.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use url::Url;

use crate::api::{ApiError, Result, Transport, TransportResponse};
use crate::domain::{AuthMethod, Credential, NavigationState};
use crate::ui::{BrowsingSurface, CredentialInput, CredentialRequest, Presenter};

#[derive(Debug, Clone, PartialEq)]
pub enum PresenterCall {
    Progress(f32, String),
    HideProgress,
    Success(PathBuf),
    Error(String),
}

pub struct RecordingPresenter {
    answer: Option<CredentialInput>,
    calls: Mutex<Vec<PresenterCall>>,
    prompts: Mutex<Vec<CredentialRequest>>,
}

impl RecordingPresenter {
    pub fn dismissing() -> Self {
        Self {
            answer: None,
            calls: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn answering(user: &str, secret: &str) -> Self {
        Self {
            answer: Some(CredentialInput {
                user: user.to_string(),
                secret: secret.to_string(),
            }),
            ..Self::dismissing()
        }
    }

    pub fn calls(&self) -> Vec<PresenterCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<CredentialRequest> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PresenterCall::Error(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn successes(&self) -> Vec<PathBuf> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PresenterCall::Success(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn progress_fractions(&self) -> Vec<f32> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PresenterCall::Progress(fraction, _) => Some(fraction),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Presenter for RecordingPresenter {
    fn show_progress(&self, fraction: f32, label: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(PresenterCall::Progress(fraction, label.to_string()));
    }

    fn hide_progress(&self) {
        self.calls.lock().unwrap().push(PresenterCall::HideProgress);
    }

    fn show_success_prompt(&self, path: &Path) {
        self.calls
            .lock()
            .unwrap()
            .push(PresenterCall::Success(path.to_path_buf()));
    }

    fn show_error(&self, message: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(PresenterCall::Error(message.to_string()));
    }

    async fn prompt_credentials(&self, request: &CredentialRequest) -> Option<CredentialInput> {
        self.prompts.lock().unwrap().push(request.clone());
        self.answer.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCommand {
    Load(Url),
    Cancel,
    Allow,
    GoBack,
    GoForward,
    Reload,
    AddressBar(String),
    Buttons(bool, bool),
}

pub struct RecordingSurface {
    state: Mutex<NavigationState>,
    commands: Mutex<Vec<SurfaceCommand>>,
}

impl RecordingSurface {
    pub fn new(state: NavigationState) -> Self {
        Self {
            state: Mutex::new(state),
            commands: Mutex::new(Vec::new()),
        }
    }

    pub fn with_history() -> Self {
        Self::new(NavigationState {
            current_url: Url::parse("http://example.com/list.html").ok(),
            title: Some("Catalog".to_string()),
            can_go_back: true,
            can_go_forward: false,
        })
    }

    pub fn commands(&self) -> Vec<SurfaceCommand> {
        self.commands.lock().unwrap().clone()
    }

    fn record(&self, command: SurfaceCommand) {
        self.commands.lock().unwrap().push(command);
    }
}

impl BrowsingSurface for RecordingSurface {
    fn load(&self, url: &Url) {
        self.record(SurfaceCommand::Load(url.clone()));
    }

    fn cancel_current_navigation(&self) {
        self.record(SurfaceCommand::Cancel);
    }

    fn allow_current_navigation(&self) {
        self.record(SurfaceCommand::Allow);
    }

    fn go_back(&self) {
        self.record(SurfaceCommand::GoBack);
    }

    fn go_forward(&self) {
        self.record(SurfaceCommand::GoForward);
    }

    fn reload(&self) {
        self.record(SurfaceCommand::Reload);
    }

    fn set_address_bar_text(&self, text: &str) {
        self.record(SurfaceCommand::AddressBar(text.to_string()));
    }

    fn set_back_forward_button_enabled(&self, back: bool, forward: bool) {
        self.record(SurfaceCommand::Buttons(back, forward));
    }

    fn navigation_state(&self) -> NavigationState {
        self.state.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ending {
    Complete,
    Interrupted,
    Stalled,
}

/// A transport whose responses are fixed up front.
pub struct ScriptedTransport {
    chunks: Vec<Vec<u8>>,
    content_length: Option<u64>,
    ending: Ending,
    suggested_filename: Option<String>,
    /// Answer 401 with this method until a credential is supplied.
    requires: Option<AuthMethod>,
    /// Answer every request with this non-success status.
    fails_with: Option<u16>,
    requests: Mutex<Vec<Option<Credential>>>,
}

impl ScriptedTransport {
    fn new(chunks: Vec<Vec<u8>>, content_length: Option<u64>, ending: Ending) -> Self {
        Self {
            chunks,
            content_length,
            ending,
            suggested_filename: None,
            requires: None,
            fails_with: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn chunks(chunks: Vec<Vec<u8>>, content_length: Option<u64>) -> Self {
        Self::new(chunks, content_length, Ending::Complete)
    }

    pub fn interrupted(chunks: Vec<Vec<u8>>, content_length: Option<u64>) -> Self {
        Self::new(chunks, content_length, Ending::Interrupted)
    }

    /// Sends `chunks`, then never finishes.
    pub fn stalled(chunks: Vec<Vec<u8>>, content_length: Option<u64>) -> Self {
        Self::new(chunks, content_length, Ending::Stalled)
    }

    pub fn failing_with(status: u16) -> Self {
        let mut transport = Self::chunks(Vec::new(), None);
        transport.fails_with = Some(status);
        transport
    }

    pub fn requiring(mut self, method: AuthMethod) -> Self {
        self.requires = Some(method);
        self
    }

    pub fn suggesting(mut self, filename: &str) -> Self {
        self.suggested_filename = Some(filename.to_string());
        self
    }

    pub fn requests(&self) -> Vec<Option<Credential>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self, url: &Url, credential: Option<&Credential>) -> Result<TransportResponse> {
        self.requests.lock().unwrap().push(credential.cloned());

        if let (Some(method), None) = (&self.requires, credential) {
            return Err(ApiError::Unauthorized {
                host: url.host_str().unwrap_or_default().to_string(),
                method: method.clone(),
            });
        }

        if let Some(status) = self.fails_with {
            return Err(ApiError::Status {
                status,
                url: url.to_string(),
            });
        }

        let chunks: Vec<Result<Bytes>> = self
            .chunks
            .iter()
            .map(|chunk| Ok(Bytes::from(chunk.clone())))
            .collect();
        let head = futures::stream::iter(chunks);
        let body = match self.ending {
            Ending::Complete => head.boxed(),
            Ending::Interrupted => head
                .chain(futures::stream::once(async {
                    Err(ApiError::Interrupted("connection reset by peer".to_string()))
                }))
                .boxed(),
            Ending::Stalled => head.chain(futures::stream::pending()).boxed(),
        };

        Ok(TransportResponse {
            status: 200,
            content_length: self.content_length,
            suggested_filename: self.suggested_filename.clone(),
            body,
        })
    }
}
