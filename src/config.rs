use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use directories::BaseDirs;
use serde::Deserialize;

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_NAME: &str = "bibrowse";

const DEFAULT_KEY_WIDTH: usize = 25;
const DEFAULT_AUTHOR_WIDTH: usize = 50;
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub config_path: PathBuf,
    /// Local cached copy of the library. Always the file that gets parsed.
    pub library: PathBuf,
    pub remote: Option<RemoteConfig>,
    pub display: DisplayConfig,
    pub extract: ExtractConfig,
}

// =============================================================================
// Remote Configuration
// =============================================================================

/// Where the authoritative copy of the library lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteSource {
    /// Fetched over HTTP(S)
    Http(String),
    /// Copied from a local path (e.g. a folder kept in sync by another tool)
    File(PathBuf),
}

impl RemoteSource {
    fn parse(raw: &str, base: &Path) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Some(RemoteSource::Http(trimmed.to_string()))
        } else {
            Some(RemoteSource::File(resolve_path(base, Path::new(trimmed))))
        }
    }
}

#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub source: RemoteSource,
    pub timeout: Duration,
}

// =============================================================================
// Display Configuration
// =============================================================================

/// Column widths for the list summary of each entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayConfig {
    /// Minimum width the `KEY:` label is padded to
    pub key_width: usize,
    /// Maximum number of characters kept from the `AUTHOR(S):` label
    pub author_width: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            key_width: DEFAULT_KEY_WIDTH,
            author_width: DEFAULT_AUTHOR_WIDTH,
        }
    }
}

// =============================================================================
// Extraction Configuration
// =============================================================================

/// How a citation key is recognised in the raw library text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMatch {
    /// Only `@type{key,` header lines whose key is exactly equal
    Header,
    /// Any line containing the key as a literal substring
    Substring,
}

impl KeyMatch {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "header" => Some(KeyMatch::Header),
            "substring" => Some(KeyMatch::Substring),
            _ => None,
        }
    }
}

/// What to do when more than one block matches a citation key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Report the key as ambiguous
    Error,
    /// Return the first block and log a warning
    First,
}

impl DuplicatePolicy {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Some(DuplicatePolicy::Error),
            "first" => Some(DuplicatePolicy::First),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractConfig {
    pub key_match: KeyMatch,
    pub duplicates: DuplicatePolicy,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            key_match: KeyMatch::Header,
            duplicates: DuplicatePolicy::Error,
        }
    }
}

/// Expand ~ to home directory in paths
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = home::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

/// Relative paths are taken relative to the directory holding the config file
fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    let expanded = expand_tilde(path);
    if expanded.is_relative() {
        base.join(expanded)
    } else {
        expanded
    }
}

// =============================================================================
// File Deserialization
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    library: Option<PathBuf>,
    remote: Option<RemoteFile>,
    display: DisplayFile,
    extract: ExtractFile,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RemoteFile {
    source: Option<String>,
    timeout_secs: u64,
}

impl Default for RemoteFile {
    fn default() -> Self {
        Self {
            source: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl RemoteFile {
    fn into_config(self, base: &Path) -> Result<Option<RemoteConfig>> {
        let Some(raw) = self.source else {
            bail!("remote.source is required when a [remote] section is present");
        };
        let Some(source) = RemoteSource::parse(&raw, base) else {
            return Ok(None);
        };
        let timeout_secs = if self.timeout_secs == 0 {
            DEFAULT_TIMEOUT_SECS
        } else {
            self.timeout_secs
        };
        Ok(Some(RemoteConfig {
            source,
            timeout: Duration::from_secs(timeout_secs),
        }))
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DisplayFile {
    key_width: usize,
    author_width: usize,
}

impl Default for DisplayFile {
    fn default() -> Self {
        let defaults = DisplayConfig::default();
        Self {
            key_width: defaults.key_width,
            author_width: defaults.author_width,
        }
    }
}

impl From<DisplayFile> for DisplayConfig {
    fn from(file: DisplayFile) -> Self {
        let key_width = if file.key_width == 0 {
            DEFAULT_KEY_WIDTH
        } else {
            file.key_width
        };
        let author_width = if file.author_width == 0 {
            DEFAULT_AUTHOR_WIDTH
        } else {
            file.author_width
        };
        Self {
            key_width,
            author_width,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExtractFile {
    #[serde(rename = "match")]
    key_match: Option<String>,
    duplicates: Option<String>,
}

impl ExtractFile {
    fn into_config(self) -> Result<ExtractConfig> {
        let defaults = ExtractConfig::default();
        let key_match = match self.key_match.as_deref() {
            Some(raw) => KeyMatch::from_str(raw).ok_or_else(|| {
                anyhow!(
                    "invalid extract.match '{}', expected one of: header, substring",
                    raw
                )
            })?,
            None => defaults.key_match,
        };
        let duplicates = match self.duplicates.as_deref() {
            Some(raw) => DuplicatePolicy::from_str(raw).ok_or_else(|| {
                anyhow!(
                    "invalid extract.duplicates '{}', expected one of: error, first",
                    raw
                )
            })?,
            None => defaults.duplicates,
        };
        Ok(ExtractConfig {
            key_match,
            duplicates,
        })
    }
}

fn config_root() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine base directories")?;
    let dir = base.config_dir().join(APP_NAME);
    Ok(dir)
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_root()?.join(CONFIG_FILE_NAME))
}

/// Load the configuration from `path`, or from the default location.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => config_path()?,
    };
    if !path.exists() {
        bail!(
            "configuration file not found at {}. Please create it as per docs.",
            path.display()
        );
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read configuration file at {}", path.display()))?;

    parse_str(&raw, path)
}

/// Parse configuration text. `config_path` anchors relative paths.
pub fn parse_str(raw: &str, config_path: PathBuf) -> Result<Config> {
    let value: toml::Value = toml::from_str(raw)
        .with_context(|| format!("failed to parse {} as TOML", config_path.display()))?;

    warn_unknown_keys(&value);

    let cfg_file: ConfigFile = value
        .try_into()
        .with_context(|| format!("failed to deserialize config from {}", config_path.display()))?;

    let base = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let library = cfg_file
        .library
        .ok_or_else(|| anyhow!("`library` must be specified in configuration"))?;
    let library = resolve_path(&base, &library);

    let remote = match cfg_file.remote {
        Some(remote) => remote
            .into_config(&base)
            .with_context(|| "failed to parse remote configuration")?,
        None => None,
    };

    let extract = cfg_file
        .extract
        .into_config()
        .with_context(|| "failed to parse extract configuration")?;

    Ok(Config {
        config_path,
        library,
        remote,
        display: cfg_file.display.into(),
        extract,
    })
}

// =============================================================================
// Unknown key warnings
// =============================================================================

fn warn_unknown_keys(value: &toml::Value) {
    let Some(table) = value.as_table() else {
        return;
    };

    let known = HashSet::from(["library", "remote", "display", "extract"]);

    for key in table.keys() {
        if !known.contains(key.as_str()) {
            tracing::warn!(key = %key, "unknown configuration key");
        }
    }

    if let Some(v) = table.get("remote") {
        warn_unknown_in_section(v, "remote", &["source", "timeout_secs"]);
    }
    if let Some(v) = table.get("display") {
        warn_unknown_in_section(v, "display", &["key_width", "author_width"]);
    }
    if let Some(v) = table.get("extract") {
        warn_unknown_in_section(v, "extract", &["match", "duplicates"]);
    }
}

fn warn_unknown_in_section(value: &toml::Value, section: &str, known: &[&str]) {
    let Some(table) = value.as_table() else {
        return;
    };
    let known_set: HashSet<&str> = known.iter().copied().collect();
    for key in table.keys() {
        if !known_set.contains(key.as_str()) {
            tracing::warn!(section, key = %key, "unknown configuration entry");
        }
    }
}
