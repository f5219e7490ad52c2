//! Plain-text output for lists, keywords, and raw entries.

use std::io::Write;

use anyhow::Result;

use crate::filter::FilterView;
use crate::session::Session;
use crate::store::Library;

/// Write the displayed entries, separated by blank lines.
pub fn entries<W: Write>(out: &mut W, view: &FilterView<'_>) -> Result<()> {
    for (index, entry) in view.displayed_entries().enumerate() {
        if index > 0 {
            writeln!(out)?;
        }
        writeln!(out, "{}", entry)?;
    }
    Ok(())
}

/// Numbered list with a status line, as shown in the browse loop.
pub fn numbered_entries<W: Write>(out: &mut W, view: &FilterView<'_>) -> Result<()> {
    let total = view.library().len();
    match view.active_keyword() {
        Some(keyword) => writeln!(
            out,
            "-- {} of {} entries (keyword: {})",
            view.displayed_len(),
            total,
            keyword
        )?,
        None => writeln!(out, "-- {} of {} entries", view.displayed_len(), total)?,
    }

    for (index, entry) in view.displayed_entries().enumerate() {
        let (first, rest) = entry.split_once('\n').unwrap_or((entry, ""));
        writeln!(out, "{:>4}  {}", index + 1, first)?;
        writeln!(out, "      {}", rest)?;
    }
    Ok(())
}

/// Write the keyword vocabulary as `<index>\t<keyword>`.
pub fn keywords<W: Write>(out: &mut W, library: &Library) -> Result<()> {
    for (index, keyword) in library.keywords().iter().enumerate() {
        writeln!(out, "{}\t{}", index, keyword)?;
    }
    Ok(())
}

/// Write the raw block for `key`. Returns false when the key is not found.
pub fn raw_entry<W: Write>(out: &mut W, session: &Session, key: &str) -> Result<bool> {
    match session.raw_entry(key)? {
        Some(block) => {
            write!(out, "{}", block)?;
            if !block.ends_with('\n') {
                writeln!(out)?;
            }
            Ok(true)
        }
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DisplayConfig;
    use crate::store::Record;

    fn library() -> Library {
        Library::build(
            vec![
                Record::new("smith99", "article")
                    .with_field("title", "X")
                    .with_field("keywords", "ml,stats"),
                Record::new("doe00", "article")
                    .with_field("title", "Y")
                    .with_field("keywords", "ml"),
            ],
            "",
            &DisplayConfig {
                key_width: 16,
                author_width: 11,
            },
        )
    }

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> Result<()>,
    {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_entries_are_blank_line_separated() {
        let lib = library();
        let view = FilterView::new(&lib);
        let text = render(|out| entries(out, &view));
        assert_eq!(
            text,
            "KEY: smith99    AUTHOR(S): \nTITLE: X\n\nKEY: doe00      AUTHOR(S): \nTITLE: Y\n"
        );
    }

    #[test]
    fn test_numbered_entries_show_keyword_status() {
        let lib = library();
        let mut view = FilterView::new(&lib);
        view.apply_keyword("stats");
        let text = render(|out| numbered_entries(out, &view));
        assert_eq!(
            text,
            "-- 1 of 2 entries (keyword: stats)\n   1  KEY: smith99    AUTHOR(S): \n      TITLE: X\n"
        );
    }

    #[test]
    fn test_keywords_are_indexed() {
        let lib = library();
        let text = render(|out| keywords(out, &lib));
        assert_eq!(text, "0\tml\n1\tstats\n");
    }
}
