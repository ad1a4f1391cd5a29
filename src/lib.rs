//! Turns downloadable media met while browsing into tracked downloads.
//!
//! The browser engine and the alert/progress UI stay outside this crate;
//! they talk to an [`application::ImportSession`] through the traits and
//! events in [`ui`].

pub mod api;
pub mod application;
pub mod domain;
pub mod logging;
pub mod settings;
pub mod ui;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use api::{HttpClient, ImportConfig, Transport};
pub use application::{ContentClassifier, CredentialStore, DownloadManager, ImportSession};
pub use domain::ImportError;
