//! File downloads (chat history CSV export)

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static PART_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A binary payload and the name it should be saved under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadDescriptor {
    pub bytes: Bytes,
    pub filename: String,
}

/// Trait for persisting a downloaded file
///
/// This abstraction allows easy mocking of the file system in tests.
#[async_trait]
pub trait FileSaver: Send + Sync {
    /// Saves the download and returns where it ended up
    async fn save(&self, download: DownloadDescriptor) -> Result<PathBuf>;
}

/// Saves downloads into a directory
///
/// The payload is first written to a hidden `.part` file and then renamed, so a
/// failed write never leaves a truncated file under the final name. Every save
/// gets its own `.part` file; concurrent saves under one name leave the last
/// rename in place.
#[derive(Debug, Clone)]
pub struct DirectorySaver {
    dir: PathBuf,
}

impl DirectorySaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Saver targeting the user's download directory
    pub fn downloads() -> Result<Self> {
        let dir = dirs::download_dir()
            .or_else(dirs::home_dir)
            .context("Could not determine download directory")?;
        Ok(Self::new(dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl FileSaver for DirectorySaver {
    async fn save(&self, download: DownloadDescriptor) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .context("Failed to create download directory")?;

        let target = self.dir.join(&download.filename);
        let temp = self.dir.join(part_name(&download.filename));

        let written = match tokio::fs::write(&temp, &download.bytes).await {
            Ok(()) => tokio::fs::rename(&temp, &target).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e).with_context(|| format!("Failed to save {}", target.display()));
        }

        tracing::info!(path = %target.display(), bytes = download.bytes.len(), "Download saved");
        Ok(target)
    }
}

fn part_name(filename: &str) -> String {
    let n = PART_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!(".{filename}.{}-{n}.part", std::process::id())
}

/// Default name of a group's chat history export
pub fn default_export_filename(group_id: i64) -> String {
    format!("chat_history_group_{group_id}.csv")
}

/// Extracts the file name from a `Content-Disposition` header value
///
/// Parameter names match case-insensitively and quotes are optional. A plain
/// `filename` wins over RFC 5987 `filename*`. Directory components are stripped.
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for param in header.split(';').skip(1) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "filename" => plain = Some(value.trim_matches('"').to_string()),
            "filename*" => extended = decode_extended(value),
            _ => {}
        }
    }

    plain
        .or(extended)
        .as_deref()
        .and_then(sanitize_filename)
}

/// Decodes `UTF-8''name%20here` style values
fn decode_extended(value: &str) -> Option<String> {
    let value = value.trim_matches('"');
    let encoded = match value.splitn(3, '\'').collect::<Vec<_>>().as_slice() {
        [_charset, _lang, encoded] => *encoded,
        _ => value,
    };
    urlencoding::decode(encoded).ok().map(|s| s.into_owned())
}

fn sanitize_filename(name: &str) -> Option<String> {
    let name = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    match name {
        "" | "." | ".." => None,
        _ => Some(name.to_string()),
    }
}

/// Resolves the export file name, falling back to the per-group default
pub fn resolve_export_filename(disposition: Option<&str>, group_id: i64) -> String {
    disposition
        .and_then(filename_from_disposition)
        .unwrap_or_else(|| default_export_filename(group_id))
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::{Arc, RwLock};

    /// File saver that keeps downloads in memory
    #[derive(Debug, Default, Clone)]
    pub struct RecordingFileSaver {
        saved: Arc<RwLock<Vec<DownloadDescriptor>>>,
    }

    impl RecordingFileSaver {
        pub fn new() -> Self {
            Self::default()
        }

        /// Returns all saved downloads
        pub fn saved(&self) -> Vec<DownloadDescriptor> {
            self.saved.read().unwrap().clone()
        }
    }

    #[async_trait]
    impl FileSaver for RecordingFileSaver {
        async fn save(&self, download: DownloadDescriptor) -> Result<PathBuf> {
            let path = PathBuf::from(&download.filename);
            self.saved.write().unwrap().push(download);
            Ok(path)
        }
    }
}
