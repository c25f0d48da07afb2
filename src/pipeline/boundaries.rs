use serde::Serialize;
use tracing::info;

use crate::document::{PageTextSource, text_of_pages};
use crate::model::Section;

/// Inclusive, 1-indexed page range owned by one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRange {
    pub start: usize,
    pub end: usize,
}

impl PageRange {
    /// 0-indexed page indices covered by this range.
    pub fn page_indices(&self) -> std::ops::Range<usize> {
        self.start.saturating_sub(1)..self.end
    }
}

/// Ranges for start pages that are already sorted ascending.
///
/// Each range runs up to the page before the next start; the last one runs to
/// `page_count`. Two sections starting on the same page both get that single page.
pub fn page_ranges(sorted_starts: &[usize], page_count: usize) -> Vec<PageRange> {
    sorted_starts
        .iter()
        .enumerate()
        .map(|(index, start)| {
            let end = match sorted_starts.get(index + 1) {
                Some(next) => next.saturating_sub(1),
                None => page_count,
            };
            PageRange {
                start: *start,
                end: end.max(*start),
            }
        })
        .collect()
}

/// Sorts sections by start page (stable) and pairs each with its range.
pub fn section_ranges(sections: &[Section], page_count: usize) -> Vec<(&Section, PageRange)> {
    let mut ordered = sections.iter().collect::<Vec<&Section>>();
    ordered.sort_by_key(|section| section.page_start);

    let starts = ordered
        .iter()
        .map(|section| section.page_start)
        .collect::<Vec<usize>>();
    let ranges = page_ranges(&starts, page_count);

    ordered.into_iter().zip(ranges).collect()
}

/// Returns new sections, in page order, with `text` filled from their page ranges.
pub fn resolve_sections(source: &dyn PageTextSource, sections: &[Section]) -> Vec<Section> {
    let page_count = source.page_count();
    let ranged = section_ranges(sections, page_count);

    let shared_page_count = ranged
        .windows(2)
        .filter(|pair| pair[0].0.page_start == pair[1].0.page_start)
        .count();

    let resolved = ranged
        .into_iter()
        .map(|(section, range)| {
            let text = text_of_pages(source, range.page_indices());
            section.with_text(text.trim().to_string())
        })
        .collect::<Vec<Section>>();

    info!(
        sections = resolved.len(),
        page_count,
        shared_start_pages = shared_page_count,
        "resolved section boundaries"
    );

    resolved
}
