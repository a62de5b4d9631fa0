//! Release archive fixtures.
//!
//! [`ArchiveBuilder`] writes entry names straight into the tar header, so
//! tests can produce the `../../etc/passwd` and `/etc/passwd` entries that the
//! `tar` crate's own path setters refuse to create.

use anyhow::{Context, Result, ensure};
use flate2::Compression;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};
use std::io::{self, Read};
use std::path::Path;
use tar::{Builder, EntryType, Header};

/// Size of the name field in a v7 tar header.
const MAX_RAW_NAME: usize = 100;

/// Builds `.tar.gz` archives in memory.
///
/// # Examples
///
/// ```rust,no_run
/// use assistd::test_utils::ArchiveBuilder;
///
/// # fn example() -> anyhow::Result<()> {
/// let bytes = ArchiveBuilder::new()
///     .file("assistd", b"#!/bin/sh\necho new\n", 0o755)?
///     .file("../../etc/passwd", b"root::0:0::/:/bin/sh\n", 0o644)?
///     .finish()?;
/// # Ok(())
/// # }
/// ```
pub struct ArchiveBuilder {
    builder: Builder<GzEncoder<Vec<u8>>>,
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self {
            builder: Builder::new(GzEncoder::new(Vec::new(), Compression::fast())),
        }
    }

    /// Append a regular file.
    pub fn file(self, name: &str, data: &[u8], mode: u32) -> Result<Self> {
        self.entry(name, EntryType::Regular, mode, data.len() as u64, data)
    }

    /// Append a regular file of `size` zero bytes without buffering it.
    pub fn zeroed_file(self, name: &str, size: u64, mode: u32) -> Result<Self> {
        self.entry(name, EntryType::Regular, mode, size, io::repeat(0).take(size))
    }

    pub fn dir(self, name: &str) -> Result<Self> {
        self.entry(name, EntryType::Directory, 0o755, 0, io::empty())
    }

    /// Append a symbolic link pointing at `target`.
    pub fn symlink(mut self, name: &str, target: &str) -> Result<Self> {
        let mut header = raw_header(name, EntryType::Symlink, 0o777, 0)?;
        header.set_link_name(target).context("Invalid link target")?;
        header.set_cksum();
        self.builder.append(&header, io::empty()).context("Failed to append symlink")?;
        Ok(self)
    }

    /// Finish the archive and return the gzip bytes.
    pub fn finish(self) -> Result<Vec<u8>> {
        let encoder = self.builder.into_inner().context("Failed to finish tar stream")?;
        encoder.finish().context("Failed to finish gzip stream")
    }

    /// Finish the archive and write it to `path`.
    pub fn write_to(self, path: &Path) -> Result<Vec<u8>> {
        let bytes = self.finish()?;
        std::fs::write(path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(bytes)
    }

    fn entry(mut self, name: &str, kind: EntryType, mode: u32, size: u64, data: impl Read) -> Result<Self> {
        let header = raw_header(name, kind, mode, size)?;
        self.builder.append(&header, data).with_context(|| format!("Failed to append {name}"))?;
        Ok(self)
    }
}

fn raw_header(name: &str, kind: EntryType, mode: u32, size: u64) -> Result<Header> {
    let bytes = name.as_bytes();
    ensure!(bytes.len() <= MAX_RAW_NAME, "Entry name too long for a raw header: {name}");

    let mut header = Header::new_old();
    header.set_entry_type(kind);
    header.set_mode(mode);
    header.set_size(size);
    header.as_old_mut().name[..bytes.len()].copy_from_slice(bytes);
    header.set_cksum();
    Ok(header)
}

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Render a `checksums.txt` body from `(file name, contents)` pairs.
pub fn checksum_manifest(files: &[(&str, &[u8])]) -> String {
    files.iter().map(|(name, data)| format!("{}  {name}\n", sha256_hex(data))).collect()
}
