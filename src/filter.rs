//! Search and keyword filtering over a loaded [`Library`].
//!
//! The two filters compose as AND: a search selects the search-filtered
//! set from the whole library, and the active keyword (if any) narrows that
//! set to what is displayed. Both sets are kept as ascending indices into the
//! library, so records and their list entries can never drift apart and the
//! displayed order is always the library order.

use thiserror::Error;

use crate::store::{Library, Record};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FilterError {
    #[error("keyword index {index} is out of range ({len} keywords)")]
    UnknownKeywordIndex { index: usize, len: usize },
}

/// Split a user query into search terms.
///
/// A blank query yields a single empty term, which matches every record.
pub fn search_terms(query: &str) -> Vec<String> {
    let terms: Vec<String> = query.split_whitespace().map(str::to_string).collect();
    if terms.is_empty() {
        vec![String::new()]
    } else {
        terms
    }
}

#[derive(Debug, Clone)]
pub struct FilterView<'a> {
    library: &'a Library,
    search_hits: Vec<usize>,
    displayed: Vec<usize>,
    keyword: Option<String>,
}

impl<'a> FilterView<'a> {
    pub fn new(library: &'a Library) -> Self {
        let all: Vec<usize> = (0..library.len()).collect();
        Self {
            library,
            search_hits: all.clone(),
            displayed: all,
            keyword: None,
        }
    }

    /// Drop both filters and show the whole library.
    pub fn reset(&mut self) {
        self.keyword = None;
        self.search_hits = (0..self.library.len()).collect();
        self.displayed = self.search_hits.clone();
    }

    /// Keep records where any term is a case-insensitive substring of any
    /// of their values, then re-apply the active keyword on top.
    pub fn apply_search<S: AsRef<str>>(&mut self, terms: &[S]) {
        let terms: Vec<String> = terms.iter().map(|t| t.as_ref().to_lowercase()).collect();

        self.search_hits = self
            .library
            .records()
            .iter()
            .enumerate()
            .filter(|(_, record)| matches_any_term(record, &terms))
            .map(|(index, _)| index)
            .collect();

        match self.keyword.clone() {
            Some(keyword) => self.apply_keyword(&keyword),
            None => self.displayed = self.search_hits.clone(),
        }
    }

    pub fn apply_query(&mut self, query: &str) {
        self.apply_search(&search_terms(query));
    }

    /// Show only search-filtered records tagged with `keyword`. A blank
    /// keyword clears the keyword filter.
    pub fn apply_keyword(&mut self, keyword: &str) {
        if keyword.trim().is_empty() {
            self.keyword = None;
            self.displayed = self.search_hits.clone();
            return;
        }
        let records = self.library.records();
        self.displayed = self
            .search_hits
            .iter()
            .copied()
            .filter(|&index| records[index].has_keyword(keyword))
            .collect();
        self.keyword = Some(keyword.to_string());
    }

    /// Apply the vocabulary keyword at `index`.
    pub fn select_keyword(&mut self, index: usize) -> Result<(), FilterError> {
        let keywords = self.library.keywords();
        let keyword = keywords.get(index).ok_or(FilterError::UnknownKeywordIndex {
            index,
            len: keywords.len(),
        })?;
        self.apply_keyword(keyword);
        Ok(())
    }

    pub fn active_keyword(&self) -> Option<&str> {
        self.keyword.as_deref()
    }

    pub fn library(&self) -> &'a Library {
        self.library
    }

    pub fn search_filtered_records(&self) -> impl Iterator<Item = &'a Record> + '_ {
        let records = self.library.records();
        self.search_hits.iter().map(move |&index| &records[index])
    }

    pub fn displayed_records(&self) -> impl Iterator<Item = &'a Record> + '_ {
        let records = self.library.records();
        self.displayed.iter().map(move |&index| &records[index])
    }

    pub fn displayed_entries(&self) -> impl Iterator<Item = &'a str> + '_ {
        let entries = self.library.entries();
        self.displayed.iter().map(move |&index| entries[index].as_str())
    }

    /// Displayed records paired with their list entries.
    pub fn displayed(&self) -> impl Iterator<Item = (&'a Record, &'a str)> + '_ {
        self.displayed_records().zip(self.displayed_entries())
    }

    pub fn displayed_len(&self) -> usize {
        self.displayed.len()
    }

    /// Record shown at `position` in the current list.
    pub fn displayed_at(&self, position: usize) -> Option<&'a Record> {
        let records = self.library.records();
        self.displayed.get(position).map(|&index| &records[index])
    }
}

fn matches_any_term(record: &Record, lowered_terms: &[String]) -> bool {
    record.values().any(|value| {
        let value = value.to_lowercase();
        lowered_terms.iter().any(|term| value.contains(term.as_str()))
    })
}
