//! Recovers the verbatim source text of one entry by citation key.

use thiserror::Error;

use crate::config::{DuplicatePolicy, ExtractConfig, KeyMatch};

/// `@`-blocks that never carry a citation key.
const NON_ENTRY_TYPES: [&str; 3] = ["comment", "preamble", "string"];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ExtractError {
    #[error("citation key `{key}` matches {count} entries in the library")]
    Ambiguous { key: String, count: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct Extractor {
    key_match: KeyMatch,
    duplicates: DuplicatePolicy,
}

impl Extractor {
    pub fn new(config: &ExtractConfig) -> Self {
        Self {
            key_match: config.key_match,
            duplicates: config.duplicates,
        }
    }

    /// Return the block that starts at the line matching `key` and runs up
    /// to and including the next line consisting of a lone `}`.
    ///
    /// `Ok(None)` when no line matches. A block left open at end of input is
    /// returned as captured.
    pub fn extract(&self, key: &str, lines: &[String]) -> Result<Option<String>, ExtractError> {
        if key.trim().is_empty() {
            return Ok(None);
        }

        let mut blocks: Vec<String> = Vec::new();
        let mut current: Option<String> = None;

        for line in lines {
            if current.is_none() && self.starts_block(key, line) {
                current = Some(String::new());
            }
            if let Some(block) = current.as_mut() {
                block.push_str(line);
                if line.trim() == "}" {
                    blocks.extend(current.take());
                }
            }
        }
        blocks.extend(current);

        let count = blocks.len();
        if count > 1 {
            match self.duplicates {
                DuplicatePolicy::Error => {
                    return Err(ExtractError::Ambiguous {
                        key: key.to_string(),
                        count,
                    });
                }
                DuplicatePolicy::First => {
                    tracing::warn!(key, count, "citation key matches several entries, using the first");
                }
            }
        }

        Ok(blocks.into_iter().next())
    }

    fn starts_block(&self, key: &str, line: &str) -> bool {
        match self.key_match {
            KeyMatch::Header => header_key(line) == Some(key),
            KeyMatch::Substring => line.contains(key),
        }
    }
}

/// Citation key declared by an entry header line such as `@article{smith99,`.
pub fn header_key(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix('@')?;
    let open = rest.find(['{', '('])?;
    let entry_type = rest[..open].trim();
    if entry_type.is_empty()
        || NON_ENTRY_TYPES
            .iter()
            .any(|skip| entry_type.eq_ignore_ascii_case(skip))
    {
        return None;
    }

    let body = &rest[open + 1..];
    let end = body.find([',', '}', ')']).unwrap_or(body.len());
    let key = body[..end].trim();
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}
