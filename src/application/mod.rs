pub mod challenge_handler;
pub mod classifier;
pub mod credential_store;
pub mod download_coordinator;
pub mod download_manager;
pub mod navigation_gate;
pub mod session;

pub use challenge_handler::{ChallengeHandler, ChallengeState, PendingChallenge};
pub use classifier::{ContentClassifier, DOWNLOADABLE_EXTENSIONS, DOWNLOADABLE_MIME_TYPES};
pub use credential_store::CredentialStore;
pub use download_coordinator::{DownloadCoordinator, TransferEvent};
pub use download_manager::{DownloadManager, DownloadOutcome};
pub use navigation_gate::{NavigationGate, FRAME_LOAD_INTERRUPTED};
pub use session::{ImportSession, SessionStep};
