use tracing::{debug, info};

use super::credential_store::CredentialStore;
use crate::domain::{AuthMethod, ChallengeDecision, Credential};
use crate::ui::{CredentialRequest, Presenter};

/// Lifecycle of one challenge. Both resolved states are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeState {
    AwaitingUserInput,
    Resolved(Credential),
    Cancelled,
}

/// One authentication challenge being answered.
#[derive(Debug)]
pub struct PendingChallenge {
    pub host: String,
    pub method: AuthMethod,
    state: ChallengeState,
}

impl PendingChallenge {
    pub fn new(host: impl Into<String>, method: AuthMethod) -> Self {
        Self {
            host: host.into(),
            method,
            state: ChallengeState::AwaitingUserInput,
        }
    }

    pub fn state(&self) -> &ChallengeState {
        &self.state
    }

    fn resolve(&mut self, credential: Credential) {
        if self.state == ChallengeState::AwaitingUserInput {
            self.state = ChallengeState::Resolved(credential);
        }
    }

    fn cancel(&mut self) {
        if self.state == ChallengeState::AwaitingUserInput {
            self.state = ChallengeState::Cancelled;
        }
    }
}

/// Answers authentication challenges from the browsing surface and the
/// download transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChallengeHandler;

impl ChallengeHandler {
    pub fn new() -> Self {
        Self
    }

    /// Suspends until the user answers when the method needs a password.
    /// `title` is shown on the prompt, usually the page title.
    pub async fn on_auth_challenge(
        &self,
        hostname: &str,
        method: AuthMethod,
        title: &str,
        presenter: &dyn Presenter,
        credentials: &mut CredentialStore,
    ) -> ChallengeDecision {
        if hostname.is_empty() {
            debug!(%method, "challenge without a host, cancelling");
            return ChallengeDecision::Cancel;
        }

        match method {
            AuthMethod::ServerTrust => return ChallengeDecision::PerformDefault,
            ref m if !m.wants_password() => {
                debug!(host = hostname, method = %m, "unsupported challenge method");
                return ChallengeDecision::Cancel;
            }
            _ => {}
        }

        let mut challenge = PendingChallenge::new(hostname, method);
        let request = CredentialRequest {
            title: title.to_string(),
            host: hostname.to_string(),
        };

        match presenter.prompt_credentials(&request).await {
            Some(input) => {
                credentials.set(hostname, &input.user, &input.secret);
                challenge.resolve(Credential::for_session(hostname, input.user, input.secret));
            }
            None => challenge.cancel(),
        }

        match challenge.state {
            ChallengeState::Resolved(credential) => {
                info!(host = hostname, user = %credential.user, "credentials supplied");
                ChallengeDecision::UseCredential(credential)
            }
            _ => {
                info!(host = hostname, "credential prompt dismissed");
                ChallengeDecision::Cancel
            }
        }
    }
}
