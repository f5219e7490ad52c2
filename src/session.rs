use std::fs;

use anyhow::{Context, Result};

use crate::bibtex;
use crate::config::Config;
use crate::extract::{ExtractError, Extractor};
use crate::filter::FilterView;
use crate::store::Library;
use crate::sync::{self, Connection};

/// One loaded library plus the connectivity of the sync that produced it.
///
/// A reload builds a whole new `Session` and replaces the old one; nothing
/// is updated in place.
#[derive(Debug)]
pub struct Session {
    library: Library,
    connection: Connection,
    extractor: Extractor,
}

impl Session {
    /// Sync (unless `offline`), then parse the cached library.
    pub fn load(config: &Config, offline: bool) -> Result<Self> {
        let connection = if offline {
            Connection::Disconnected
        } else {
            let remote = config
                .remote
                .as_ref()
                .map(sync::remote_from_config)
                .transpose()?;
            sync::sync_library(remote.as_deref(), &config.library)
        };

        let text = fs::read_to_string(&config.library).with_context(|| {
            format!(
                "failed to read cached library at {}",
                config.library.display()
            )
        })?;

        let session = Self::from_text(&text, config, connection)
            .with_context(|| format!("failed to parse {}", config.library.display()))?;
        tracing::info!(
            records = session.library.len(),
            keywords = session.library.keywords().len(),
            connected = connection.is_connected(),
            "library loaded"
        );
        Ok(session)
    }

    pub fn from_text(text: &str, config: &Config, connection: Connection) -> Result<Self> {
        let parsed = bibtex::parse_str(text)?;
        Ok(Self {
            library: Library::build(parsed.records, text, &config.display),
            connection,
            extractor: Extractor::new(&config.extract),
        })
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn connection(&self) -> Connection {
        self.connection
    }

    /// Changes may only be saved back when the last sync reached the remote.
    pub fn editable(&self) -> bool {
        self.connection.is_connected()
    }

    /// A fresh, unfiltered view over this session's library.
    pub fn view(&self) -> FilterView<'_> {
        FilterView::new(&self.library)
    }

    pub fn raw_entry(&self, key: &str) -> Result<Option<String>, ExtractError> {
        self.extractor.extract(key, self.library.raw_lines())
    }
}
