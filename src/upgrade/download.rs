use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info};

use crate::constants::{IO_CHUNK_SIZE, USER_AGENT};
use crate::core::UpdateError;

/// Streams release archives to disk.
///
/// The response body is written chunk by chunk, so memory use stays flat no
/// matter how large the archive is. Chunks handed over by the HTTP stack are
/// further split into pieces of at most 64 KiB, and the progress callback is
/// invoked after each piece is written.
///
/// The request timeout covers the whole transfer (connect through last byte)
/// and is supplied by the caller, typically the long download timeout from
/// [`UpgradeConfig`](crate::upgrade::config::UpgradeConfig).
pub struct Downloader {
    client: reqwest::Client,
    timeout: Duration,
}

impl Downloader {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
        }
    }

    /// Download `url` to `dest`, returning the number of bytes written.
    ///
    /// `on_progress(downloaded, total)` receives the running byte count and
    /// the `Content-Length` if the server sent one.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::Network`] on transport failure or timeout
    /// - [`UpdateError::HttpStatus`] for any status other than 200
    /// - [`UpdateError::FileSystem`] if `dest` cannot be written
    pub async fn download<F>(&self, url: &str, dest: &Path, mut on_progress: F) -> Result<u64, UpdateError>
    where
        F: FnMut(u64, Option<u64>),
    {
        info!(url, dest = %dest.display(), "Downloading");

        let mut response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| UpdateError::network("downloading archive", url, &e))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(UpdateError::HttpStatus {
                operation: "downloading archive".to_string(),
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let total = response.content_length();
        debug!(?total, "Download started");

        let file = File::create(dest)
            .await
            .map_err(|e| UpdateError::fs("creating", dest, e))?;
        let mut writer = BufWriter::new(file);
        let mut downloaded: u64 = 0;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| UpdateError::network("downloading archive", url, &e))?
        {
            for piece in chunk.chunks(IO_CHUNK_SIZE) {
                writer
                    .write_all(piece)
                    .await
                    .map_err(|e| UpdateError::fs("writing", dest, e))?;
                downloaded += piece.len() as u64;
                on_progress(downloaded, total);
            }
        }

        writer.flush().await.map_err(|e| UpdateError::fs("flushing", dest, e))?;
        writer
            .into_inner()
            .sync_all()
            .await
            .map_err(|e| UpdateError::fs("syncing", dest, e))?;

        info!(bytes = downloaded, "Download complete");
        Ok(downloaded)
    }
}
