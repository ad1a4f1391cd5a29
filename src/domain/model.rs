use std::fmt;
use std::path::PathBuf;

use url::Url;

/// How long a credential lives. Only session scope exists; nothing is
/// written to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    ForSession,
}

/// A user/secret pair bound to the host it was entered for.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub host: String,
    pub user: String,
    pub secret: String,
    pub persistence: Persistence,
}

impl Credential {
    pub fn for_session(
        host: impl Into<String>,
        user: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            secret: secret.into(),
            persistence: Persistence::ForSession,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("secret", &"<redacted>")
            .field("persistence", &self.persistence)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationReason {
    MimeMatch,
    ExtensionMatch,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationResult {
    pub is_downloadable: bool,
    pub reason: ClassificationReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadState {
    Pending,
    InProgress,
    Succeeded,
    Failed,
}

impl DownloadState {
    pub fn is_terminal(self) -> bool {
        matches!(self, DownloadState::Succeeded | DownloadState::Failed)
    }
}

/// The single download currently owned by the download manager.
#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub url: Url,
    /// Known once the transfer has created its file.
    pub destination_path: Option<PathBuf>,
    pub state: DownloadState,
    pub bytes_expected: Option<u64>,
    pub bytes_received: u64,
    pub error: Option<String>,
}

impl DownloadTask {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            destination_path: None,
            state: DownloadState::Pending,
            bytes_expected: None,
            bytes_received: 0,
            error: None,
        }
    }

    /// Fraction in `[0, 1]`; zero while the length is unknown.
    pub fn fraction_completed(&self) -> f32 {
        match self.bytes_expected {
            Some(total) if total > 0 => {
                (self.bytes_received as f64 / total as f64).clamp(0.0, 1.0) as f32
            }
            _ => 0.0,
        }
    }
}

/// Read-only projection of the browsing surface's history position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationState {
    pub current_url: Option<Url>,
    pub title: Option<String>,
    pub can_go_back: bool,
    pub can_go_forward: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDecision {
    Allow,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    Default,
    HttpBasic,
    HttpDigest,
    ServerTrust,
    ClientCertificate,
    Negotiate,
    Ntlm,
    Other(String),
}

impl AuthMethod {
    /// Maps the scheme token of a `WWW-Authenticate` header value.
    pub fn from_www_authenticate(header: Option<&str>) -> Self {
        let scheme = header
            .and_then(|value| value.split_whitespace().next())
            .map(|token| token.trim_end_matches(',').to_ascii_lowercase());

        match scheme.as_deref() {
            None | Some("") => AuthMethod::Default,
            Some("basic") => AuthMethod::HttpBasic,
            Some("digest") => AuthMethod::HttpDigest,
            Some("negotiate") => AuthMethod::Negotiate,
            Some("ntlm") => AuthMethod::Ntlm,
            Some(other) => AuthMethod::Other(other.to_string()),
        }
    }

    /// Methods answered with a user name and password prompt.
    pub fn wants_password(&self) -> bool {
        matches!(
            self,
            AuthMethod::Default | AuthMethod::HttpBasic | AuthMethod::HttpDigest
        )
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::Default => f.write_str("default"),
            AuthMethod::HttpBasic => f.write_str("basic"),
            AuthMethod::HttpDigest => f.write_str("digest"),
            AuthMethod::ServerTrust => f.write_str("server-trust"),
            AuthMethod::ClientCertificate => f.write_str("client-certificate"),
            AuthMethod::Negotiate => f.write_str("negotiate"),
            AuthMethod::Ntlm => f.write_str("ntlm"),
            AuthMethod::Other(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeDecision {
    UseCredential(Credential),
    PerformDefault,
    Cancel,
}
