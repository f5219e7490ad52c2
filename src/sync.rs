//! Download-with-fallback for the library file.
//!
//! A successful fetch atomically replaces the cached copy. Any failure
//! leaves the cache untouched and the session continues offline.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::{RemoteConfig, RemoteSource};

/// Outcome of the last sync attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connection {
    Connected,
    Disconnected,
}

impl Connection {
    pub fn is_connected(self) -> bool {
        matches!(self, Connection::Connected)
    }
}

/// A place the authoritative library can be fetched from
pub trait Remote {
    /// Human-readable location, used in log output
    fn describe(&self) -> String;

    /// Fetch the full library text
    fn fetch(&self) -> Result<Vec<u8>>;
}

/// Library served over HTTP(S)
pub struct HttpRemote {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpRemote {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            url: url.to_string(),
            client,
        })
    }
}

impl Remote for HttpRemote {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn fetch(&self) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .with_context(|| format!("request to {} failed", self.url))?
            .error_for_status()
            .with_context(|| format!("{} returned an error status", self.url))?;
        let body = response
            .bytes()
            .with_context(|| format!("failed to read response body from {}", self.url))?;
        Ok(body.to_vec())
    }
}

/// Library kept in a locally mounted folder
pub struct FileRemote {
    path: PathBuf,
}

impl FileRemote {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Remote for FileRemote {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> Result<Vec<u8>> {
        fs::read(&self.path).with_context(|| format!("failed to read {}", self.path.display()))
    }
}

pub fn remote_from_config(config: &RemoteConfig) -> Result<Box<dyn Remote>> {
    Ok(match &config.source {
        RemoteSource::Http(url) => Box::new(HttpRemote::new(url, config.timeout)?),
        RemoteSource::File(path) => Box::new(FileRemote::new(path)),
    })
}

/// Try to refresh `cache` from `remote`.
pub fn sync_library(remote: Option<&dyn Remote>, cache: &Path) -> Connection {
    let Some(remote) = remote else {
        tracing::debug!("no remote configured, using cached library");
        return Connection::Disconnected;
    };

    let source = remote.describe();
    match remote.fetch().and_then(|bytes| write_atomic(cache, &bytes)) {
        Ok(()) => {
            tracing::info!(source = %source, cache = %cache.display(), "library synced");
            Connection::Connected
        }
        Err(err) => {
            tracing::warn!(
                source = %source,
                error = %format!("{:#}", err),
                "sync failed, using cached library"
            );
            Connection::Disconnected
        }
    }
}

/// Write through a sibling temp file and rename it over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory: {}", dir.display()))?;
    }

    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    let written = fs::write(&partial, bytes)
        .with_context(|| format!("failed to write {}", partial.display()))
        .and_then(|()| {
            fs::rename(&partial, path).with_context(|| {
                format!(
                    "failed to move {} into place at {}",
                    partial.display(),
                    path.display()
                )
            })
        });
    if written.is_err() {
        let _ = fs::remove_file(&partial);
    }
    written
}
