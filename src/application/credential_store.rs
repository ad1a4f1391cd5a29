use tracing::debug;

use crate::domain::Credential;

/// Holds at most one credential for the session, keyed by host.
#[derive(Debug, Default)]
pub struct CredentialStore {
    slot: Option<Credential>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored credential, only if it was entered for exactly `host`.
    pub fn get(&self, host: &str) -> Option<&Credential> {
        self.slot.as_ref().filter(|credential| credential.host == host)
    }

    /// Replaces whatever was stored, for any host.
    pub fn set(&mut self, host: &str, user: &str, secret: &str) {
        debug!(host, user, "storing session credential");
        self.slot = Some(Credential::for_session(host, user, secret));
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }
}
