pub mod error;
pub mod model;

pub use error::ImportError;
pub use model::{
    AuthMethod, ChallengeDecision, ClassificationReason, ClassificationResult, Credential,
    DownloadState, DownloadTask, NavigationDecision, NavigationState, Persistence,
};
