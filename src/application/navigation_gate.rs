use reqwest::header::{HeaderMap, CONTENT_TYPE};
use tracing::{debug, info};
use url::Url;

use super::classifier::ContentClassifier;
use super::credential_store::CredentialStore;
use super::download_manager::DownloadManager;
use crate::domain::NavigationDecision;
use crate::ui::{BrowsingSurface, Presenter};

/// Error code the browser engine reports when a navigation was dropped
/// because its response was turned into a download.
pub const FRAME_LOAD_INTERRUPTED: i64 = 102;

/// Decides, per main-frame response, between rendering and downloading.
#[derive(Debug, Clone, Copy, Default)]
pub struct NavigationGate {
    classifier: ContentClassifier,
}

impl NavigationGate {
    pub fn new(classifier: ContentClassifier) -> Self {
        Self { classifier }
    }

    /// The decision is sent to the surface before any history command, so
    /// the engine never sees `go_back` while the diverted load is pending.
    /// Only the classification decides; an error status on a media response
    /// surfaces as a failed download.
    pub fn on_response(
        &self,
        url: &Url,
        status: u16,
        headers: &HeaderMap,
        surface: &dyn BrowsingSurface,
        downloads: &mut DownloadManager,
        credentials: &CredentialStore,
    ) -> NavigationDecision {
        let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
        let result = self.classifier.classify(content_type, url.path());

        if !result.is_downloadable {
            debug!(%url, status, content_type = ?content_type, "rendering response");
            surface.allow_current_navigation();
            return NavigationDecision::Allow;
        }

        info!(%url, reason = ?result.reason, content_type = ?content_type, "diverting response to download");
        surface.cancel_current_navigation();

        let credential = url
            .host_str()
            .and_then(|host| credentials.get(host))
            .cloned();
        // A rejected start has already been reported by the manager.
        let _ = downloads.start(url.clone(), credential);

        if surface.navigation_state().can_go_back {
            surface.go_back();
            surface.reload();
        }

        NavigationDecision::Cancel
    }

    /// Shows main-frame load failures, except the abort caused by a diversion.
    /// Returns whether anything was shown.
    pub fn on_navigation_failed(&self, code: i64, message: &str, presenter: &dyn Presenter) -> bool {
        if code == FRAME_LOAD_INTERRUPTED {
            debug!(code, "navigation aborted for download");
            return false;
        }
        info!(code, message, "navigation failed");
        presenter.show_error(&format!("Error accessing page: {}", message));
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqwest::header::HeaderValue;

    use super::*;
    use crate::application::download_coordinator::DownloadCoordinator;
    use crate::application::download_manager::DownloadOutcome;
    use crate::domain::NavigationState;
    use crate::test_support::{RecordingPresenter, RecordingSurface, ScriptedTransport, SurfaceCommand};

    struct Fixture {
        _dir: tempfile::TempDir,
        transport: Arc<ScriptedTransport>,
        presenter: Arc<RecordingPresenter>,
        downloads: DownloadManager,
        credentials: CredentialStore,
    }

    fn fixture(transport: ScriptedTransport) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(transport);
        let presenter = Arc::new(RecordingPresenter::dismissing());
        let coordinator = DownloadCoordinator::new(transport.clone(), dir.path().to_path_buf());
        Fixture {
            downloads: DownloadManager::new(coordinator, presenter.clone()),
            _dir: dir,
            transport,
            presenter,
            credentials: CredentialStore::new(),
        }
    }

    fn content_type(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_audio_mime_is_diverted() {
        let mut f = fixture(ScriptedTransport::chunks(vec![vec![0u8; 8]], Some(8)));
        let surface = RecordingSurface::with_history();
        let target = url("http://example.com/book");

        let decision = NavigationGate::default().on_response(
            &target,
            200,
            &content_type("audio/mpeg"),
            &surface,
            &mut f.downloads,
            &f.credentials,
        );

        assert_eq!(decision, NavigationDecision::Cancel);
        assert_eq!(f.downloads.active_task().unwrap().url, target);
        assert_eq!(
            surface.commands(),
            vec![SurfaceCommand::Cancel, SurfaceCommand::GoBack, SurfaceCommand::Reload]
        );
        f.downloads.wait().await;
        assert_eq!(f.transport.requests(), vec![None]);
    }

    #[tokio::test]
    async fn test_extension_match_beats_html_mime() {
        let mut f = fixture(ScriptedTransport::chunks(vec![vec![0u8; 8]], Some(8)));
        let surface = RecordingSurface::new(NavigationState::default());

        let decision = NavigationGate::default().on_response(
            &url("http://example.com/page.mp3"),
            200,
            &content_type("text/html"),
            &surface,
            &mut f.downloads,
            &f.credentials,
        );

        assert_eq!(decision, NavigationDecision::Cancel);
        // nothing to go back to
        assert_eq!(surface.commands(), vec![SurfaceCommand::Cancel]);
        assert!(f.downloads.is_active());
        f.downloads.wait().await;
    }

    #[tokio::test]
    async fn test_html_page_is_allowed() {
        let mut f = fixture(ScriptedTransport::chunks(Vec::new(), None));
        let surface = RecordingSurface::with_history();

        let decision = NavigationGate::default().on_response(
            &url("http://example.com/index.html"),
            200,
            &content_type("text/html"),
            &surface,
            &mut f.downloads,
            &f.credentials,
        );

        assert_eq!(decision, NavigationDecision::Allow);
        assert_eq!(surface.commands(), vec![SurfaceCommand::Allow]);
        assert!(!f.downloads.is_active());
    }

    #[tokio::test]
    async fn test_missing_content_type_is_allowed() {
        let mut f = fixture(ScriptedTransport::chunks(Vec::new(), None));
        let surface = RecordingSurface::with_history();

        let decision = NavigationGate::default().on_response(
            &url("http://example.com/book"),
            200,
            &HeaderMap::new(),
            &surface,
            &mut f.downloads,
            &f.credentials,
        );

        assert_eq!(decision, NavigationDecision::Allow);
        assert!(!f.downloads.is_active());
    }

    #[tokio::test]
    async fn test_media_with_error_status_fails_as_download() {
        let mut f = fixture(ScriptedTransport::failing_with(404));
        let surface = RecordingSurface::with_history();

        let decision = NavigationGate::default().on_response(
            &url("http://example.com/book"),
            404,
            &content_type("audio/mpeg"),
            &surface,
            &mut f.downloads,
            &f.credentials,
        );

        assert_eq!(decision, NavigationDecision::Cancel);
        assert!(f.downloads.is_active());
        match f.downloads.wait().await {
            Some(DownloadOutcome::Failed { status, .. }) => assert_eq!(status, Some(404)),
            other => panic!("expected failure, got {:?}", other),
        }
        let errors = f.presenter.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("HTTP 404"), "{}", errors[0]);
    }

    #[tokio::test]
    async fn test_matching_credential_is_attached() {
        let mut f = fixture(ScriptedTransport::chunks(vec![vec![0u8; 4]], Some(4)));
        f.credentials.set("site.org", "alice", "pw");
        let surface = RecordingSurface::new(NavigationState::default());
        let gate = NavigationGate::default();

        gate.on_response(
            &url("http://site.org/a.zip"),
            200,
            &HeaderMap::new(),
            &surface,
            &mut f.downloads,
            &f.credentials,
        );
        f.downloads.wait().await;
        gate.on_response(
            &url("http://mirror.net/b.zip"),
            200,
            &HeaderMap::new(),
            &surface,
            &mut f.downloads,
            &f.credentials,
        );
        f.downloads.wait().await;

        let requests = f.transport.requests();
        assert_eq!(requests[0].as_ref().unwrap().user, "alice");
        assert_eq!(requests[1], None);
    }

    #[tokio::test]
    async fn test_diversion_while_downloading_is_rejected() {
        let mut f = fixture(ScriptedTransport::stalled(vec![vec![0u8; 4]], Some(40)));
        let surface = RecordingSurface::new(NavigationState::default());
        let gate = NavigationGate::default();

        for path in ["a.mp3", "b.mp3"] {
            let decision = gate.on_response(
                &url(&format!("http://example.com/{}", path)),
                200,
                &HeaderMap::new(),
                &surface,
                &mut f.downloads,
                &f.credentials,
            );
            assert_eq!(decision, NavigationDecision::Cancel);
        }

        assert_eq!(
            f.downloads.active_task().unwrap().url.as_str(),
            "http://example.com/a.mp3"
        );
        assert_eq!(f.presenter.errors().len(), 1);
        f.downloads.cancel().await;
    }

    #[test]
    fn test_download_abort_is_swallowed() {
        let presenter = RecordingPresenter::dismissing();
        let gate = NavigationGate::default();

        assert!(!gate.on_navigation_failed(FRAME_LOAD_INTERRUPTED, "Frame load interrupted", &presenter));
        assert!(presenter.errors().is_empty());

        assert!(gate.on_navigation_failed(-1003, "A server with the specified hostname could not be found.", &presenter));
        assert_eq!(
            presenter.errors(),
            vec!["Error accessing page: A server with the specified hostname could not be found.".to_string()]
        );
    }
}
