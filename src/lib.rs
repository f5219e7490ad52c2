//! Personal bibliography browser: load a BibTeX library, narrow it by
//! free-text search and a single keyword, and recover any entry's raw text.

pub mod bibtex;
pub mod config;
pub mod extract;
pub mod filter;
pub mod session;
pub mod store;
pub mod sync;
pub mod ui;
