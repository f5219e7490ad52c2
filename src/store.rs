//! In-memory library: parsed records, their list summaries, the keyword
//! vocabulary, and the raw source lines used for entry extraction.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::DisplayConfig;

/// Field holding the comma-separated keyword list of a record.
pub const KEYWORDS_FIELD: &str = "keywords";

/// One bibliography entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Citation key, unique within a library.
    pub key: String,
    /// Lowercase entry type (`article`, `book`, ...).
    pub entry_type: String,
    /// Field values keyed by lowercase field name.
    pub fields: BTreeMap<String, String>,
}

impl Record {
    pub fn new(key: impl Into<String>, entry_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            entry_type: entry_type.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.insert(name.to_lowercase(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Every searchable value: the key, the entry type, then field values.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        [self.key.as_str(), self.entry_type.as_str()]
            .into_iter()
            .chain(self.fields.values().map(String::as_str))
    }

    /// Keyword tokens of this record; empty when it has no `keywords` field.
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.get(KEYWORDS_FIELD)
            .into_iter()
            .flat_map(keyword_tokens)
    }

    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords().any(|token| token == keyword)
    }
}

/// Split a raw `keywords` value into trimmed, non-empty tokens.
pub fn keyword_tokens(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|token| !token.is_empty())
}

/// Records together with everything derived from them at load time.
///
/// `records()` and `entries()` are positionally aligned: `entries()[i]`
/// always summarises `records()[i]`.
#[derive(Debug, Clone, Default)]
pub struct Library {
    records: Vec<Record>,
    entries: Vec<String>,
    keywords: Vec<String>,
    raw_lines: Vec<String>,
}

impl Library {
    pub fn build(records: Vec<Record>, raw_text: &str, display: &DisplayConfig) -> Self {
        let entries = records
            .iter()
            .map(|record| display_entry(record, display))
            .collect();
        let keywords = keyword_vocabulary(&records);
        let raw_lines = split_lines(raw_text);
        Self {
            records,
            entries,
            keywords,
            raw_lines,
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Sorted, deduplicated keyword vocabulary.
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn raw_lines(&self) -> &[String] {
        &self.raw_lines
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Two-line list summary: padded key label and truncated author label, then
/// the title.
pub fn display_entry(record: &Record, display: &DisplayConfig) -> String {
    let key_label = format!("KEY: {}", record.key);
    let author_label = format!("AUTHOR(S): {}", record.get("author").unwrap_or_default());
    let author_label: String = author_label.chars().take(display.author_width).collect();
    format!(
        "{:<width$}{}\nTITLE: {}",
        key_label,
        author_label,
        record.get("title").unwrap_or_default(),
        width = display.key_width
    )
}

pub fn keyword_vocabulary(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .flat_map(Record::keywords)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Split text into lines, keeping each line's terminator.
pub fn split_lines(text: &str) -> Vec<String> {
    text.split_inclusive('\n').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_records() -> Vec<Record> {
        vec![
            Record::new("smith99", "article")
                .with_field("author", "Smith, J.")
                .with_field("title", "Learning Things")
                .with_field("keywords", "ml,stats"),
            Record::new("doe00", "book")
                .with_field("author", "Doe, A.")
                .with_field("title", "Counting")
                .with_field("keywords", "ml"),
            Record::new("roe01", "misc").with_field("title", "No Keywords Here"),
        ]
    }

    #[test]
    fn test_vocabulary_is_union_of_tokens() {
        let vocabulary = keyword_vocabulary(&sample_records());
        assert_eq!(vocabulary, vec!["ml".to_string(), "stats".to_string()]);
    }

    #[test]
    fn test_vocabulary_trims_and_drops_empty_tokens() {
        let records = vec![
            Record::new("a", "misc").with_field("keywords", " ml , ,stats,"),
            Record::new("b", "misc").with_field("keywords", ""),
            Record::new("c", "misc").with_field("keywords", "stats,  optics"),
        ];
        assert_eq!(
            keyword_vocabulary(&records),
            vec!["ml".to_string(), "optics".to_string(), "stats".to_string()]
        );
    }

    #[test]
    fn test_record_without_keywords_contributes_nothing() {
        let record = Record::new("roe01", "misc");
        assert_eq!(record.keywords().count(), 0);
        assert!(!record.has_keyword("ml"));
        assert!(keyword_vocabulary(&[record]).is_empty());
    }

    #[test]
    fn test_has_keyword_is_exact_token_match() {
        let record = Record::new("a", "misc").with_field("keywords", "machine learning, ml");
        assert!(record.has_keyword("ml"));
        assert!(record.has_keyword("machine learning"));
        assert!(!record.has_keyword("machine"));
        assert!(!record.has_keyword("ML"));
    }

    #[test]
    fn test_values_include_key_and_type() {
        let record = Record::new("smith99", "article").with_field("title", "T");
        let values: Vec<&str> = record.values().collect();
        assert_eq!(values, vec!["smith99", "article", "T"]);
    }

    #[test]
    fn test_display_entry_layout() {
        let record = Record::new("smith99", "article")
            .with_field("author", "Smith, J.")
            .with_field("title", "Learning Things");
        let entry = display_entry(&record, &DisplayConfig::default());

        let (first, second) = entry.split_once('\n').unwrap();
        assert!(first.starts_with("KEY: smith99 "));
        assert_eq!(&first[25..], "AUTHOR(S): Smith, J.");
        assert_eq!(second, "TITLE: Learning Things");
    }

    #[test]
    fn test_display_entry_truncates_author_by_chars() {
        let record = Record::new("k", "article").with_field("author", "Ünsal, Ö. and Çelik, Ş.");
        let display = DisplayConfig {
            key_width: 8,
            author_width: 16,
        };
        let entry = display_entry(&record, &display);
        let first = entry.lines().next().unwrap();
        assert_eq!(first, "KEY: k  AUTHOR(S): Ünsal");
    }

    #[test]
    fn test_long_key_is_not_truncated() {
        let record = Record::new("a-very-long-citation-key-2024", "misc");
        let entry = display_entry(&record, &DisplayConfig::default());
        assert!(entry.starts_with("KEY: a-very-long-citation-key-2024AUTHOR(S): "));
    }

    #[test]
    fn test_missing_author_and_title_render_empty() {
        let entry = display_entry(&Record::new("k", "misc"), &DisplayConfig::default());
        assert!(entry.ends_with("AUTHOR(S): \nTITLE: "));
    }

    #[test]
    fn test_library_keeps_entries_aligned_with_records() {
        let library = Library::build(sample_records(), "", &DisplayConfig::default());
        assert_eq!(library.len(), 3);
        assert_eq!(library.entries().len(), library.records().len());
        for (record, entry) in library.records().iter().zip(library.entries()) {
            assert!(entry.starts_with(&format!("KEY: {}", record.key)));
        }
    }

    #[test]
    fn test_split_lines_preserves_terminators() {
        let lines = split_lines("@misc{a,\r\n  title={T},\n}");
        assert_eq!(lines, vec!["@misc{a,\r\n", "  title={T},\n", "}"]);
        assert!(split_lines("").is_empty());
    }
}
