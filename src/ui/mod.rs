//! Boundary between the import core and the browser engine / presentation
//! layer that host it.

pub mod console;

use std::path::Path;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use tokio::sync::oneshot;
use url::Url;

use crate::domain::{AuthMethod, ChallengeDecision, NavigationState};

pub use console::{ConsolePresenter, HeadlessSurface};

/// Events the browsing surface delivers to the session.
#[derive(Debug)]
pub enum BrowserEvent {
    /// A main-frame response arrived; the surface waits for
    /// `allow_current_navigation` or `cancel_current_navigation`.
    ResponseReceived {
        url: Url,
        status: u16,
        headers: HeaderMap,
    },
    /// The surface suspends the request until `reply` is answered.
    AuthChallenge {
        hostname: String,
        method: AuthMethod,
        reply: oneshot::Sender<ChallengeDecision>,
    },
    NavigationFailed {
        code: i64,
        message: String,
    },
    NavigationFinished {
        url: Url,
    },
}

/// Commands the core issues to the embedded browser.
pub trait BrowsingSurface: Send + Sync {
    fn load(&self, url: &Url);
    fn cancel_current_navigation(&self);
    fn allow_current_navigation(&self);
    fn go_back(&self);
    fn go_forward(&self);
    fn reload(&self);
    fn set_address_bar_text(&self, text: &str);
    fn set_back_forward_button_enabled(&self, back: bool, forward: bool);
    fn navigation_state(&self) -> NavigationState;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRequest {
    pub title: String,
    pub host: String,
}

impl CredentialRequest {
    pub fn message(&self) -> String {
        format!("{} requires a user name and password", self.host)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialInput {
    pub user: String,
    pub secret: String,
}

/// Progress, alerts and prompts shown to the user.
#[async_trait]
pub trait Presenter: Send + Sync {
    fn show_progress(&self, fraction: f32, label: &str);
    fn hide_progress(&self);
    /// A download finished; the user picks between leaving and browsing on.
    fn show_success_prompt(&self, path: &Path);
    fn show_error(&self, message: &str);
    /// `None` when the user dismisses the prompt.
    async fn prompt_credentials(&self, request: &CredentialRequest) -> Option<CredentialInput>;
}
