use crate::core::path::ensure_dir;
use crate::core::{EsmError, EsmResult};
use crate::registry::ResolvedVersion;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use flate2::read::GzDecoder;
use futures_util::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha512};
use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};
use tar::{Archive, EntryType};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

/// Downloads a package tarball and unpacks it with the outer directory stripped
pub struct ArchiveFetcher {
    client: Client,
}

impl ArchiveFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetch and extract into `dest` (created if missing)
    ///
    /// Returns only once every entry has been written.
    pub async fn fetch(&self, resolved: &ResolvedVersion, dest: &Path) -> EsmResult<()> {
        ensure_dir(dest).map_err(|e| {
            EsmError::ExtractionFailed(format!("Failed to prepare {}: {}", dest.display(), e))
        })?;

        let (archive, digest) = self.download(resolved).await?;
        if let Some(integrity) = &resolved.integrity {
            verify_integrity(&resolved.name, integrity, &digest)?;
        }

        let archive_path = archive.path().to_path_buf();
        let dest = dest.to_path_buf();
        let entries = tokio::task::spawn_blocking(move || extract_archive(&archive_path, &dest))
            .await
            .map_err(|e| EsmError::ExtractionFailed(format!("Extraction task failed: {}", e)))??;

        tracing::debug!(package = %resolved.name, entries, "archive extracted");
        Ok(())
    }

    /// Stream the tarball into a scratch file, hashing as it goes
    async fn download(&self, resolved: &ResolvedVersion) -> EsmResult<(NamedTempFile, Vec<u8>)> {
        let url = &resolved.tarball_url;
        tracing::debug!(%url, "downloading tarball");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| EsmError::DownloadFailed(format!("{}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(EsmError::DownloadFailed(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }

        let scratch_failed = |e: std::io::Error| {
            EsmError::DownloadFailed(format!("{}: scratch file: {}", url, e))
        };
        let scratch = NamedTempFile::new().map_err(scratch_failed)?;
        let mut file =
            tokio::fs::File::from_std(scratch.as_file().try_clone().map_err(scratch_failed)?);
        let mut hasher = Sha512::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| EsmError::DownloadFailed(format!("{}: {}", url, e)))?;
            hasher.update(&chunk);
            file.write_all(&chunk).await.map_err(scratch_failed)?;
        }
        file.flush().await.map_err(scratch_failed)?;

        Ok((scratch, hasher.finalize().to_vec()))
    }
}

/// Check a `sha512-<base64>` integrity string against the archive digest
///
/// Integrity strings using other algorithms are not checked.
pub fn verify_integrity(name: &str, integrity: &str, sha512_digest: &[u8]) -> EsmResult<()> {
    let Some(expected) = integrity
        .split_whitespace()
        .find_map(|part| part.strip_prefix("sha512-"))
    else {
        tracing::debug!(package = name, %integrity, "no sha512 integrity, skipping check");
        return Ok(());
    };

    let actual = BASE64.encode(sha512_digest);
    if actual != expected {
        return Err(EsmError::IntegrityMismatch {
            name: name.to_string(),
            expected: format!("sha512-{}", expected),
            actual: format!("sha512-{}", actual),
        });
    }

    Ok(())
}

/// Unpack a `.tgz`, dropping the first path component of every entry
///
/// Returns the number of entries written.
pub fn extract_archive(archive_path: &Path, dest: &Path) -> EsmResult<usize> {
    let file = File::open(archive_path)
        .map_err(|e| EsmError::ExtractionFailed(format!("Failed to open archive: {}", e)))?;
    let mut archive = Archive::new(GzDecoder::new(file));
    let mut written = 0;

    let entries = archive
        .entries()
        .map_err(|e| EsmError::ExtractionFailed(format!("Failed to read archive: {}", e)))?;

    for entry in entries {
        let mut entry =
            entry.map_err(|e| EsmError::ExtractionFailed(format!("Corrupt archive entry: {}", e)))?;

        let entry_type = entry.header().entry_type();
        if !matches!(entry_type, EntryType::Regular | EntryType::Directory) {
            continue;
        }

        let path = entry
            .path()
            .map_err(|e| EsmError::ExtractionFailed(format!("Invalid entry path: {}", e)))?
            .into_owned();
        let Some(relative) = strip_first_component(&path)? else {
            continue;
        };

        let target = dest.join(&relative);
        let create_failed = |e: std::io::Error| {
            EsmError::ExtractionFailed(format!("Failed to create {}: {}", relative.display(), e))
        };
        if entry_type == EntryType::Directory {
            fs::create_dir_all(&target).map_err(create_failed)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(create_failed)?;
        }
        entry.unpack(&target).map_err(|e| {
            EsmError::ExtractionFailed(format!("Failed to unpack {}: {}", relative.display(), e))
        })?;
        written += 1;
    }

    Ok(written)
}

fn strip_first_component(path: &Path) -> EsmResult<Option<PathBuf>> {
    let mut stripped = PathBuf::new();

    for (i, component) in path.components().enumerate() {
        match component {
            Component::Normal(part) if i > 0 => stripped.push(part),
            Component::Normal(_) | Component::CurDir if i == 0 => {}
            Component::CurDir => {}
            _ => {
                return Err(EsmError::ExtractionFailed(format!(
                    "Refusing unsafe archive path {}",
                    path.display()
                )))
            }
        }
    }

    Ok((!stripped.as_os_str().is_empty()).then_some(stripped))
}
