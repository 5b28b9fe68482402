//! Artifact fetcher
//!
//! Streams installer packages to disk and computes their SHA-1 digest for
//! verification against the feed-supplied checksum.
//!
//! The download never buffers the whole body: response bytes are written to
//! the destination as they arrive, so arbitrarily large packages do not
//! require proportional memory. A non-success HTTP status is raised before
//! any byte touches the destination path. On failure no guarantee is made
//! about partial contents at the destination - the file is truncated and
//! rewritten from scratch on the next attempt.
//!
//! SHA-1 is a feed-compatibility choice carried over from the upstream
//! release metadata, not a security-strength claim.

use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::core::PlexupError;

/// Read granularity for checksum computation.
const HASH_CHUNK_SIZE: usize = 4096;

/// A successfully downloaded artifact.
#[derive(Debug)]
pub struct DownloadedArtifact {
    /// Where the artifact landed.
    pub path: PathBuf,
    /// Total bytes written to disk.
    pub bytes_written: u64,
}

/// Streaming downloader for installer packages.
pub struct ArtifactFetcher {
    client: reqwest::Client,
    show_progress: bool,
}

impl ArtifactFetcher {
    /// Create a fetcher, optionally bounding the total download duration.
    ///
    /// # Errors
    ///
    /// [`PlexupError::HttpClient`] when the underlying client cannot be
    /// constructed.
    pub fn new(timeout: Option<Duration>) -> Result<Self, PlexupError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("plexup/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10));

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| PlexupError::HttpClient {
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            show_progress: true,
        })
    }

    /// Enable or disable the download progress bar.
    #[must_use]
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Stream `url` to `dest` in bounded chunks.
    ///
    /// # Errors
    ///
    /// - [`PlexupError::DownloadNetwork`] on connection or stream failures
    /// - [`PlexupError::DownloadHttp`] on a non-success status, raised before
    ///   any bytes are written
    /// - [`PlexupError::DownloadIo`] on local write failures
    pub async fn download(
        &self,
        url: &str,
        dest: &Path,
    ) -> Result<DownloadedArtifact, PlexupError> {
        tracing::info!(target: "fetch", "Downloading {} -> {}", url, dest.display());

        let response = self.client.get(url).send().await.map_err(|e| {
            PlexupError::DownloadNetwork {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlexupError::DownloadHttp {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let progress = match (self.show_progress, response.content_length()) {
            (true, Some(total)) if total > 0 => {
                let pb = ProgressBar::new(total);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
                        .expect("progress bar template is valid")
                        .progress_chars("#>-"),
                );
                Some(pb)
            }
            _ => None,
        };

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| PlexupError::DownloadIo {
                path: dest.display().to_string(),
                reason: e.to_string(),
            })?;

        let mut stream = response.bytes_stream();
        let mut bytes_written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| PlexupError::DownloadNetwork {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

            file.write_all(&chunk)
                .await
                .map_err(|e| PlexupError::DownloadIo {
                    path: dest.display().to_string(),
                    reason: e.to_string(),
                })?;

            bytes_written += chunk.len() as u64;
            if let Some(pb) = &progress {
                pb.set_position(bytes_written);
            }
        }

        file.flush().await.map_err(|e| PlexupError::DownloadIo {
            path: dest.display().to_string(),
            reason: e.to_string(),
        })?;

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        tracing::info!(target: "fetch", "Downloaded {bytes_written} bytes to {}", dest.display());
        Ok(DownloadedArtifact {
            path: dest.to_path_buf(),
            bytes_written,
        })
    }
}

/// Compute the SHA-1 digest of a file, reading in fixed-size chunks.
///
/// Never loads the whole file into memory; chunking does not alter the
/// digest. Returns the lowercase hex encoding.
///
/// # Errors
///
/// [`PlexupError::Io`] when the file cannot be opened or read.
///
/// # Examples
///
/// ```rust,no_run
/// # async fn example() -> anyhow::Result<()> {
/// let digest = plexup::fetch::sha1_file(std::path::Path::new("/tmp/plex.deb")).await?;
/// println!("sha1: {digest}");
/// # Ok(())
/// # }
/// ```
pub async fn sha1_file(path: &Path) -> Result<String, PlexupError> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha1::new();
    let mut buffer = [0u8; HASH_CHUNK_SIZE];

    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compare two hex digests, ignoring case and surrounding whitespace.
#[must_use]
pub fn checksum_matches(expected: &str, actual: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(actual.trim())
}
