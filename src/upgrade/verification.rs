use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use crate::constants::{IO_CHUNK_SIZE, USER_AGENT};
use crate::core::UpdateError;

/// One line of a `checksums.txt` manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumEntry {
    /// Lowercase hex SHA-256 digest.
    pub digest: String,
    pub filename: String,
}

/// Verifies downloaded archives against the release checksum manifest.
///
/// This is the trust boundary of the update pipeline: nothing may be
/// extracted or installed from an archive until [`verify`](Self::verify)
/// returns `Ok`.
///
/// # Fail-closed matching
///
/// The manifest entry is located by **exact** filename equality with the
/// archive name derived from the resolved version. Suffix or prefix matching
/// is never attempted, since it can pick up a line for a differently
/// versioned archive that happens to share the platform suffix. A missing
/// entry is an error, never a skipped check.
///
/// # Examples
///
/// ```rust,no_run
/// use assistd::upgrade::ChecksumVerifier;
/// use std::path::Path;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), assistd::core::UpdateError> {
/// let verifier = ChecksumVerifier::new(reqwest::Client::new(), Duration::from_secs(30));
/// verifier
///     .verify(
///         Path::new("/tmp/scratch/assistd_1.0.0_linux_amd64.tar.gz"),
///         "assistd_1.0.0_linux_amd64.tar.gz",
///         "https://github.com/assistd/assistd/releases/download/v1.0.0/checksums.txt",
///     )
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct ChecksumVerifier {
    client: reqwest::Client,
    timeout: Duration,
}

impl ChecksumVerifier {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
        }
    }

    /// Verify `file_path` against the manifest entry for `expected_archive_name`.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::Network`] / [`UpdateError::HttpStatus`] if the manifest cannot be fetched
    /// - [`UpdateError::ChecksumNotFound`] if no line names the archive exactly
    /// - [`UpdateError::ChecksumMismatch`] if the digests differ
    pub async fn verify(
        &self,
        file_path: &Path,
        expected_archive_name: &str,
        manifest_url: &str,
    ) -> Result<(), UpdateError> {
        info!(archive = expected_archive_name, "Verifying checksum");

        let manifest = self.fetch_manifest(manifest_url).await?;
        let entries = parse_manifest(&manifest);

        let Some(expected) = find_checksum(&entries, expected_archive_name) else {
            warn!(archive = expected_archive_name, "No checksum entry for archive");
            return Err(UpdateError::ChecksumNotFound {
                archive: expected_archive_name.to_string(),
                manifest_url: manifest_url.to_string(),
            });
        };

        let actual = compute_sha256(file_path).await?;
        verify_digest(expected_archive_name, expected, &actual)?;

        info!(archive = expected_archive_name, "Checksum verification successful");
        Ok(())
    }

    /// Fetch the manifest as plain text.
    pub async fn fetch_manifest(&self, manifest_url: &str) -> Result<String, UpdateError> {
        debug!(url = manifest_url, "Fetching checksum manifest");

        let response = self
            .client
            .get(manifest_url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| UpdateError::network("fetching checksum manifest", manifest_url, &e))?;

        if !response.status().is_success() {
            return Err(UpdateError::HttpStatus {
                operation: "fetching checksum manifest".to_string(),
                url: manifest_url.to_string(),
                status: response.status().as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| UpdateError::network("reading checksum manifest", manifest_url, &e))
    }
}

/// Parse `<digest>  <filename>` lines, skipping anything malformed.
///
/// A line is accepted only if it has exactly two whitespace-separated fields
/// and the first is a 64 character hex string.
#[must_use]
pub fn parse_manifest(content: &str) -> Vec<ChecksumEntry> {
    content
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let (digest, filename) = (parts.next()?, parts.next()?);
            if parts.next().is_some() || !is_sha256_hex(digest) {
                return None;
            }
            Some(ChecksumEntry {
                digest: digest.to_ascii_lowercase(),
                filename: filename.to_string(),
            })
        })
        .collect()
}

/// Find the digest whose filename exactly equals `archive_name`.
#[must_use]
pub fn find_checksum<'a>(entries: &'a [ChecksumEntry], archive_name: &str) -> Option<&'a str> {
    entries.iter().find(|e| e.filename == archive_name).map(|e| e.digest.as_str())
}

/// Compare two hex digests, ignoring case.
pub fn verify_digest(archive: &str, expected: &str, actual: &str) -> Result<(), UpdateError> {
    if expected.eq_ignore_ascii_case(actual) {
        Ok(())
    } else {
        Err(UpdateError::ChecksumMismatch {
            archive: archive.to_string(),
            expected: expected.to_ascii_lowercase(),
            actual: actual.to_ascii_lowercase(),
        })
    }
}

/// Stream a file through SHA-256 and return the lowercase hex digest.
pub async fn compute_sha256(file_path: &Path) -> Result<String, UpdateError> {
    debug!(path = %file_path.display(), "Computing SHA256 checksum");

    let mut file = File::open(file_path)
        .await
        .map_err(|e| UpdateError::fs("opening", file_path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; IO_CHUNK_SIZE];

    loop {
        let n = file
            .read(&mut buf)
            .await
            .map_err(|e| UpdateError::fs("reading", file_path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

fn is_sha256_hex(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}
