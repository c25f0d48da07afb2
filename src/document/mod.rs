mod poppler;

pub use poppler::{PopplerDocument, collect_tool_versions, read_page_count};

/// One bookmark from the document outline. `page` is 1-indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub level: usize,
    pub title: String,
    pub page: usize,
}

/// Read-only per-page text access over one loaded document.
pub trait PageTextSource {
    fn page_count(&self) -> usize;

    /// Plain text of a 0-indexed page, `None` past the end.
    fn page_text(&self, page_index: usize) -> Option<&str>;

    /// Outline triples in declaration order; empty when the document has none.
    fn outline(&self) -> &[OutlineEntry];
}

/// Concatenates 0-indexed pages in order, one newline between pages.
pub fn text_of_pages<I>(source: &dyn PageTextSource, page_indices: I) -> String
where
    I: IntoIterator<Item = usize>,
{
    page_indices
        .into_iter()
        .filter_map(|index| source.page_text(index))
        .collect::<Vec<&str>>()
        .join("\n")
}

/// Strips NULs and carriage returns that poppler leaves in some text layers.
pub fn normalize_page_text(raw: &str) -> String {
    raw.replace('\u{0000}', "")
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}

#[cfg(test)]
pub mod testing {
    use super::{OutlineEntry, PageTextSource};

    /// In-memory document used by pipeline tests.
    #[derive(Debug, Clone, Default)]
    pub struct MemoryDocument {
        pub pages: Vec<String>,
        pub outline: Vec<OutlineEntry>,
    }

    impl MemoryDocument {
        pub fn from_pages<S: AsRef<str>>(pages: &[S]) -> Self {
            Self {
                pages: pages.iter().map(|page| page.as_ref().to_string()).collect(),
                outline: Vec::new(),
            }
        }

        pub fn blank(page_count: usize) -> Self {
            Self {
                pages: (1..=page_count).map(|page| format!("page {page}")).collect(),
                outline: Vec::new(),
            }
        }

        pub fn with_outline(mut self, entries: &[(usize, &str, usize)]) -> Self {
            self.outline = entries
                .iter()
                .map(|(level, title, page)| OutlineEntry {
                    level: *level,
                    title: title.to_string(),
                    page: *page,
                })
                .collect();
            self
        }
    }

    impl PageTextSource for MemoryDocument {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn page_text(&self, page_index: usize) -> Option<&str> {
            self.pages.get(page_index).map(String::as_str)
        }

        fn outline(&self) -> &[OutlineEntry] {
            &self.outline
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MemoryDocument;
    use super::*;

    #[test]
    fn text_of_pages_keeps_given_order_and_skips_missing() {
        let document = MemoryDocument::from_pages(&["one", "two", "three"]);
        assert_eq!(text_of_pages(&document, [2, 0, 9]), "three\none");
        assert_eq!(text_of_pages(&document, 0..2), "one\ntwo");
    }

    #[test]
    fn normalize_page_text_unifies_line_endings() {
        assert_eq!(normalize_page_text("a\r\nb\rc\u{0000}"), "a\nb\nc");
    }
}
