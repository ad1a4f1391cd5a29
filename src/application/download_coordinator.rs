use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::{stream::BoxStream, StreamExt};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    api::{Transport, TransportResponse},
    domain::{Credential, ImportError},
    utils::{download_filename, numbered_filename},
};

/// Attempts at finding a free `name (n).ext` before giving up.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// What the background transfer reports, in order: `Started`, any number of
/// `Progress`, then exactly one of `Completed`/`Failed`.
#[derive(Debug, Clone)]
pub enum TransferEvent {
    Started {
        path: PathBuf,
        bytes_expected: Option<u64>,
    },
    Progress {
        bytes_received: u64,
        bytes_expected: Option<u64>,
    },
    Completed {
        path: PathBuf,
        bytes_received: u64,
    },
    /// Any partial file has already been removed.
    Failed(ImportError),
}

/// Streams one resource into the download directory.
#[derive(Clone)]
pub struct DownloadCoordinator {
    transport: Arc<dyn Transport>,
    download_dir: PathBuf,
}

impl DownloadCoordinator {
    pub fn new(transport: Arc<dyn Transport>, download_dir: PathBuf) -> Self {
        Self {
            transport,
            download_dir,
        }
    }

    pub fn download_stream(
        &self,
        url: Url,
        credential: Option<Credential>,
    ) -> BoxStream<'static, TransferEvent> {
        futures::stream::unfold(
            TransferState::Start {
                transport: self.transport.clone(),
                url,
                credential,
                dir: self.download_dir.clone(),
            },
            |state| async move {
                match state {
                    TransferState::Start {
                        transport,
                        url,
                        credential,
                        dir,
                    } => {
                        let response = match transport.open(&url, credential.as_ref()).await {
                            Ok(response) => response,
                            Err(e) => {
                                warn!(%url, error = %e, "download request failed");
                                return Some((
                                    TransferEvent::Failed(e.into()),
                                    TransferState::Finished,
                                ));
                            }
                        };

                        let TransportResponse {
                            content_length,
                            suggested_filename,
                            body,
                            ..
                        } = response;

                        let filename = download_filename(suggested_filename.as_deref(), &url);
                        let (file, partial) = match create_destination(dir, filename).await {
                            Ok(created) => created,
                            Err(e) => {
                                return Some((
                                    TransferEvent::Failed(ImportError::Io(format!(
                                        "Failed to create file: {}",
                                        e
                                    ))),
                                    TransferState::Finished,
                                ));
                            }
                        };

                        info!(%url, path = %partial.path().display(), bytes = ?content_length, "download started");
                        Some((
                            TransferEvent::Started {
                                path: partial.path().to_path_buf(),
                                bytes_expected: content_length,
                            },
                            TransferState::Downloading {
                                file,
                                stream: body,
                                downloaded: 0,
                                total: content_length,
                                partial,
                            },
                        ))
                    }
                    TransferState::Downloading {
                        mut file,
                        mut stream,
                        mut downloaded,
                        total,
                        partial,
                    } => match stream.next().await {
                        Some(Ok(chunk)) => {
                            if let Err(e) = file.write_all(&chunk).await {
                                drop(file);
                                drop(partial);
                                return Some((
                                    TransferEvent::Failed(ImportError::Io(format!(
                                        "Write error: {}",
                                        e
                                    ))),
                                    TransferState::Finished,
                                ));
                            }

                            downloaded += chunk.len() as u64;

                            Some((
                                TransferEvent::Progress {
                                    bytes_received: downloaded,
                                    bytes_expected: total,
                                },
                                TransferState::Downloading {
                                    file,
                                    stream,
                                    downloaded,
                                    total,
                                    partial,
                                },
                            ))
                        }
                        Some(Err(e)) => {
                            warn!(path = %partial.path().display(), downloaded, error = %e, "transfer interrupted");
                            drop(file);
                            drop(partial);
                            Some((TransferEvent::Failed(e.into()), TransferState::Finished))
                        }
                        None => {
                            if let Some(expected) = total.filter(|&t| t != downloaded) {
                                drop(file);
                                drop(partial);
                                return Some((
                                    TransferEvent::Failed(ImportError::Incomplete {
                                        received: downloaded,
                                        expected,
                                    }),
                                    TransferState::Finished,
                                ));
                            }

                            if let Err(e) = file.sync_all().await {
                                drop(file);
                                drop(partial);
                                return Some((
                                    TransferEvent::Failed(ImportError::Io(format!(
                                        "Failed to sync file: {}",
                                        e
                                    ))),
                                    TransferState::Finished,
                                ));
                            }

                            drop(file);
                            Some((
                                TransferEvent::Completed {
                                    path: partial.keep(),
                                    bytes_received: downloaded,
                                },
                                TransferState::Finished,
                            ))
                        }
                    },
                    TransferState::Finished => None,
                }
            },
        )
        .boxed()
    }
}

enum TransferState {
    Start {
        transport: Arc<dyn Transport>,
        url: Url,
        credential: Option<Credential>,
        dir: PathBuf,
    },
    Downloading {
        file: tokio::fs::File,
        stream: BoxStream<'static, crate::api::Result<bytes::Bytes>>,
        downloaded: u64,
        total: Option<u64>,
        partial: PartialFile,
    },
    Finished,
}

/// A destination file this download created. Deleted on drop unless kept,
/// so a transfer dropped at any await point leaves nothing behind.
#[derive(Debug)]
struct PartialFile {
    path: PathBuf,
    keep: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self { path, keep: false }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn keep(mut self) -> PathBuf {
        self.keep = true;
        std::mem::take(&mut self.path)
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.keep {
            log_removal(&self.path, std::fs::remove_file(&self.path));
        }
    }
}

/// Creates `dir/filename`, or the first free numbered variant. Never opens an
/// existing file, so cleanup can only remove what this download wrote.
///
/// Runs on the blocking pool and hands back a [`PartialFile`]. If the caller
/// is dropped mid-await, the finished task drops its output and the file
/// goes with it.
async fn create_destination(
    dir: PathBuf,
    filename: String,
) -> std::io::Result<(tokio::fs::File, PartialFile)> {
    let (file, partial) =
        tokio::task::spawn_blocking(move || create_destination_blocking(&dir, &filename))
            .await
            .map_err(std::io::Error::other)??;
    Ok((tokio::fs::File::from_std(file), partial))
}

fn create_destination_blocking(
    dir: &Path,
    filename: &str,
) -> std::io::Result<(std::fs::File, PartialFile)> {
    std::fs::create_dir_all(dir)?;

    let mut last_error = None;
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let candidate = if attempt == 0 {
            dir.join(filename)
        } else {
            dir.join(numbered_filename(filename, attempt))
        };

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(file) => return Ok((file, PartialFile::new(candidate))),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => last_error = Some(e),
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or_else(|| std::io::Error::other("no free file name")))
}

/// Best-effort delete of a partial download. A missing file is fine; any
/// other error is logged and swallowed.
pub async fn remove_partial_file(path: &Path) {
    log_removal(path, tokio::fs::remove_file(path).await);
}

fn log_removal(path: &Path, result: std::io::Result<()>) {
    match result {
        Ok(()) => info!(path = %path.display(), "deleted partial file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no partial file to delete");
        }
        Err(e) => warn!(path = %path.display(), error = %e, "could not delete partial file"),
    }
}
