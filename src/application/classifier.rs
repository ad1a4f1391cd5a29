use crate::domain::{ClassificationReason, ClassificationResult};
use crate::utils::path_extension;

/// Content types diverted into a download.
pub const DOWNLOADABLE_MIME_TYPES: [&str; 5] = [
    "audio/mpeg",
    "audio/mp3",
    "audio/m4a",
    "audio/m4b",
    "application/zip",
];

/// URL path extensions diverted into a download. Matched case-sensitively.
pub const DOWNLOADABLE_EXTENSIONS: [&str; 4] = ["mp3", "m4a", "m4b", "zip"];

/// Decides whether a response is media to save rather than a page to render.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentClassifier;

impl ContentClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, mime_type: Option<&str>, url_path: &str) -> ClassificationResult {
        if mime_type.is_some_and(is_downloadable_mime) {
            return ClassificationResult {
                is_downloadable: true,
                reason: ClassificationReason::MimeMatch,
            };
        }

        if DOWNLOADABLE_EXTENSIONS.contains(&path_extension(url_path)) {
            return ClassificationResult {
                is_downloadable: true,
                reason: ClassificationReason::ExtensionMatch,
            };
        }

        ClassificationResult {
            is_downloadable: false,
            reason: ClassificationReason::None,
        }
    }

    pub fn is_downloadable(&self, mime_type: Option<&str>, url_path: &str) -> bool {
        self.classify(mime_type, url_path).is_downloadable
    }
}

// `Audio/MPEG; charset=binary` compares as `audio/mpeg`.
fn is_downloadable_mime(mime_type: &str) -> bool {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    DOWNLOADABLE_MIME_TYPES.contains(&essence.as_str())
}
