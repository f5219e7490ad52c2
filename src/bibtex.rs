//! BibTeX text to ordered [`Record`]s, backed by the `biblatex` crate.

use biblatex::{Bibliography, Chunk, Entry, Spanned};
use thiserror::Error;

use crate::store::Record;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("no BibTeX entries could be parsed ({skipped} malformed)")]
    Unparseable { skipped: usize },
}

#[derive(Debug, Clone, Default)]
pub struct ParsedLibrary {
    /// Records in source order.
    pub records: Vec<Record>,
    /// Entries dropped because they failed to parse on their own.
    pub skipped: usize,
}

/// Parse a whole `.bib` document.
///
/// Falls back to parsing entry by entry when the document as a whole is
/// rejected, so one broken entry does not hide the rest of the library.
pub fn parse_str(input: &str) -> Result<ParsedLibrary, ParseError> {
    match Bibliography::parse(input) {
        Ok(bibliography) => Ok(ParsedLibrary {
            records: bibliography.iter().map(entry_to_record).collect(),
            skipped: 0,
        }),
        Err(err) => {
            tracing::debug!(error = %err, "whole-file parse failed, parsing entries individually");
            parse_individually(input)
        }
    }
}

fn parse_individually(input: &str) -> Result<ParsedLibrary, ParseError> {
    let starts = entry_starts(input);
    let chunks: Vec<&str> = starts
        .iter()
        .enumerate()
        .map(|(i, &start)| &input[start..starts.get(i + 1).copied().unwrap_or(input.len())])
        .collect();

    // Entries parsed alone still need the macros they reference.
    let mut macros = String::new();
    for chunk in chunks.iter().filter(|chunk| block_type(chunk) == "string") {
        match Bibliography::parse(chunk) {
            Ok(_) => macros.push_str(chunk),
            Err(err) => tracing::warn!(error = %err, "ignoring malformed @string definition"),
        }
    }

    let mut parsed = ParsedLibrary::default();
    for chunk in chunks {
        if matches!(block_type(chunk).as_str(), "string" | "preamble" | "comment") {
            continue;
        }
        match Bibliography::parse(&format!("{macros}{chunk}")) {
            Ok(bibliography) => parsed.records.extend(bibliography.iter().map(entry_to_record)),
            Err(_) => parsed.skipped += 1,
        }
    }

    if parsed.records.is_empty() && parsed.skipped > 0 {
        return Err(ParseError::Unparseable {
            skipped: parsed.skipped,
        });
    }
    if parsed.skipped > 0 {
        tracing::warn!(skipped = parsed.skipped, "skipped malformed BibTeX entries");
    }
    Ok(parsed)
}

/// Lowercased type name of an `@type{...}` chunk.
fn block_type(chunk: &str) -> String {
    let rest = chunk.strip_prefix('@').unwrap_or(chunk);
    let end = rest.find(['{', '(']).unwrap_or(rest.len());
    rest[..end].trim().to_lowercase()
}

/// Byte offsets of lines that open an `@type` block.
fn entry_starts(input: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut offset = 0;
    for line in input.split_inclusive('\n') {
        let opens_entry = line
            .strip_prefix('@')
            .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_alphabetic()));
        if opens_entry {
            starts.push(offset);
        }
        offset += line.len();
    }
    starts
}

fn entry_to_record(entry: &Entry) -> Record {
    let mut record = Record::new(entry.key.clone(), entry.entry_type.to_string().to_lowercase());
    for (name, chunks) in &entry.fields {
        record = record.with_field(name, chunks_to_string(chunks));
    }
    record
}

fn chunks_to_string(chunks: &[Spanned<Chunk>]) -> String {
    chunks
        .iter()
        .map(|c| match &c.v {
            Chunk::Normal(s) | Chunk::Verbatim(s) | Chunk::Math(s) => s.as_str(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIBRARY: &str = r#"@article{smith99,
  author = {Smith, John},
  title = {Learning Things},
  year = {1999},
  keywords = {ml,stats}
}

@book{doe00,
  author = {Doe, Alice},
  title = {Counting},
  year = {2000}
}
"#;

    #[test]
    fn test_parses_records_in_source_order() {
        let parsed = parse_str(LIBRARY).unwrap();
        let keys: Vec<&str> = parsed.records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["smith99", "doe00"]);
        assert_eq!(parsed.skipped, 0);
    }

    #[test]
    fn test_fields_are_flattened_to_strings() {
        let parsed = parse_str(LIBRARY).unwrap();
        let smith = &parsed.records[0];
        assert_eq!(smith.entry_type, "article");
        assert_eq!(smith.get("title"), Some("Learning Things"));
        assert_eq!(smith.get("keywords"), Some("ml,stats"));

        let doe = &parsed.records[1];
        assert_eq!(doe.entry_type, "book");
        assert_eq!(doe.get("keywords"), None);
    }

    #[test]
    fn test_empty_document_has_no_records() {
        let parsed = parse_str("").unwrap();
        assert!(parsed.records.is_empty());
    }

    #[test]
    fn test_malformed_entry_is_skipped() {
        let input = format!("{LIBRARY}\n@article{{broken,\n  title = {{Unclosed\n\n@misc{{tail,\n  title = {{Tail}}\n}}\n");
        let parsed = parse_str(&input).unwrap();
        let keys: Vec<&str> = parsed.records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["smith99", "doe00", "tail"]);
        assert_eq!(parsed.skipped, 1);
    }

    #[test]
    fn test_string_macros_survive_entry_by_entry_parsing() {
        let input = "@string{jml = {Journal of ML}}\n\
@article{a,\n  journal = jml,\n  title = {A}\n}\n\
@article{broken,\n  title = {Unclosed\n\n\
@comment{ignored}\n\
@article{b,\n  title = {B}\n}\n";
        let parsed = parse_str(input).unwrap();
        let keys: Vec<&str> = parsed.records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(parsed.records[0].get("journal"), Some("Journal of ML"));
        assert_eq!(parsed.skipped, 1);
    }

    #[test]
    fn test_block_type() {
        assert_eq!(block_type("@String{jml = {J}}\n"), "string");
        assert_eq!(block_type("@article(a,\n)\n"), "article");
        assert_eq!(block_type("@ Preamble {x}"), "preamble");
    }

    #[test]
    fn test_nothing_parseable_is_an_error() {
        let err = parse_str("@article{broken,\n  title = {Unclosed\n").unwrap_err();
        assert_eq!(err, ParseError::Unparseable { skipped: 1 });
    }

    #[test]
    fn test_entry_starts() {
        let input = "% comment\n@article{a,\n}\n  @not-at-line-start\n@misc{b,\n}\n";
        assert_eq!(entry_starts(input), vec![10, 45]);
    }
}
