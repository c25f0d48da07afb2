use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::info;

use crate::document::{PageTextSource, text_of_pages};
use crate::model::Section;
use crate::util::normalize_whitespace;

/// Pages read starting at the "List of Tables" heading page.
const LIST_OF_TABLES_WINDOW: usize = 6;

/// Table references declared in the front-matter "List of Tables".
///
/// Empty when no heading is found within the first `scan_pages` pages.
pub fn declared_tables(source: &dyn PageTextSource, scan_pages: usize) -> Result<Vec<String>> {
    let heading_regex =
        Regex::new(r"(?i)\bList of Tables\b").context("failed to compile list-of-tables regex")?;
    let entry_regex = Regex::new(
        r"(?i)\bTable\s+[A-Z]?\d+(?:[-\x{2012}\x{2013}\x{2014}\x{2015}]\d+)?[A-Za-z0-9-]*",
    )
    .context("failed to compile list-of-tables entry regex")?;

    let page_count = source.page_count();
    let heading_page = (0..scan_pages.min(page_count)).find(|index| {
        source
            .page_text(*index)
            .is_some_and(|text| heading_regex.is_match(text))
    });

    let Some(heading_page) = heading_page else {
        info!(scanned = scan_pages.min(page_count), "no list of tables found");
        return Ok(Vec::new());
    };

    let end = (heading_page + LIST_OF_TABLES_WINDOW).min(page_count);
    let text = text_of_pages(source, heading_page..end);
    // Keyed on the lowercase form; the smallest exact spelling is kept.
    let mut unique = BTreeMap::<String, String>::new();
    for found in entry_regex.find_iter(&text) {
        let table = normalize_whitespace(found.as_str());
        match unique.entry(table.to_lowercase()) {
            Entry::Vacant(slot) => {
                slot.insert(table);
            }
            Entry::Occupied(mut slot) => {
                if table < *slot.get() {
                    slot.insert(table);
                }
            }
        }
    }
    let tables = unique.into_values().collect::<Vec<String>>();

    info!(
        heading_page = heading_page + 1,
        pages = end - heading_page,
        tables = tables.len(),
        "read list of tables"
    );

    Ok(tables)
}

/// Table references observed anywhere in resolved section bodies.
pub fn observed_tables(sections: &[Section]) -> Result<Vec<String>> {
    let body_regex = Regex::new(
        r"(?i)\bTable\s+[A-Z]?\d+(?:[-\x{2012}\x{2013}\x{2014}\x{2015}]\d+)?[A-Za-z0-9\-]*",
    )
    .context("failed to compile body table regex")?;

    let mut found = Vec::<String>::new();
    for text in sections.iter().filter_map(|section| section.text.as_deref()) {
        found.extend(
            body_regex
                .find_iter(text)
                .map(|reference| normalize_whitespace(reference.as_str())),
        );
    }

    let mut keyed = found
        .into_iter()
        .map(|reference| (reference.to_lowercase(), reference))
        .collect::<Vec<(String, String)>>();
    keyed.sort();
    keyed.dedup_by(|later, earlier| later.0 == earlier.0);
    let tables = keyed
        .into_iter()
        .map(|(_, reference)| reference)
        .collect::<Vec<String>>();
    info!(tables = tables.len(), "scanned section bodies for table references");
    Ok(tables)
}
