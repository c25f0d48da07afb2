use std::collections::{BTreeSet, HashMap, HashSet};

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::TocConfig;
use crate::document::{PageTextSource, normalize_page_text, text_of_pages};
use crate::error::PipelineError;
use crate::model::{Section, is_synthetic_id};
use crate::util::normalize_whitespace;

/// One way of turning a document into ordered ToC sections.
pub trait TocStrategy {
    fn name(&self) -> &'static str;

    /// Sections in declaration order; empty when this strategy finds nothing.
    fn extract(&self, source: &dyn PageTextSource, doc_title: &str) -> Vec<Section>;
}

/// Sections taken from the PDF outline (bookmarks).
pub struct BookmarkStrategy {
    id_regex: Regex,
}

impl BookmarkStrategy {
    pub fn new() -> Result<Self> {
        Ok(Self {
            id_regex: Regex::new(r"^(?P<id>\d+(?:\.\d+)*)\.?\s+(?P<title>.+?)\s*$")
                .context("failed to compile outline id regex")?,
        })
    }

    fn split_label(&self, label: &str) -> (String, String) {
        match self.id_regex.captures(label) {
            Some(captures) => (
                captures["id"].to_string(),
                captures["title"].trim().to_string(),
            ),
            None => (String::new(), label.to_string()),
        }
    }
}

impl TocStrategy for BookmarkStrategy {
    fn name(&self) -> &'static str {
        "bookmarks"
    }

    fn extract(&self, source: &dyn PageTextSource, doc_title: &str) -> Vec<Section> {
        let mut sections = source
            .outline()
            .iter()
            .map(|entry| {
                let label = normalize_whitespace(&entry.title);
                let (section_id, title) = self.split_label(&label);
                Section::new(doc_title, &section_id, &title, entry.page, entry.level)
            })
            .collect::<Vec<Section>>();

        let mut counters = HashMap::<usize, usize>::new();
        for section in sections.iter_mut().filter(|section| section.section_id.is_empty()) {
            let counter = counters.entry(section.level).or_insert(0);
            *counter += 1;
            section.assign_synthetic_id(*counter);
        }

        sections
    }
}

/// Fallback: scan ToC pages for `<id> <title> ... <page>` lines.
pub struct RegexStrategy {
    config: TocConfig,
    heading_regex: Regex,
    line_regex: Regex,
    candidate_regex: Regex,
}

impl RegexStrategy {
    pub fn new(config: TocConfig) -> Result<Self> {
        Ok(Self {
            config,
            heading_regex: Regex::new(r"(?i)\b(Table of Contents|Contents)\b")
                .context("failed to compile ToC heading regex")?,
            line_regex: Regex::new(
                r"(?m)^[ \t]*(?P<id>\d{1,3}(?:\.\d{1,3})*)\.?[ \t]+(?P<title>[^\n.]+?)(?:[ \t]*(?:\.[ \t]*){2,}|[ \t]+)(?P<page>\d+)[ \t]*$",
            )
            .context("failed to compile ToC line regex")?,
            candidate_regex: Regex::new(r"(?m)^[ \t]*\d{1,3}(?:\.\d{1,3})*\.?[ \t]+\S")
                .context("failed to compile ToC candidate regex")?,
        })
    }

    /// 0-indexed pages to read the ToC from, ascending and without repeats.
    /// Never empty for a non-empty document.
    pub fn toc_page_window(&self, source: &dyn PageTextSource) -> Vec<usize> {
        let page_count = source.page_count();

        let hinted = self
            .config
            .toc_pages
            .iter()
            .filter_map(|page| {
                if *page >= 1 && *page <= page_count {
                    Some(page - 1)
                } else {
                    warn!(page = *page, page_count, "ignoring out-of-range ToC page hint");
                    None
                }
            })
            .collect::<BTreeSet<usize>>();
        if !hinted.is_empty() {
            return hinted.into_iter().collect();
        }

        let scan_limit = self.config.scan_pages.min(page_count);
        let first_hit = (0..scan_limit).find(|index| {
            source
                .page_text(*index)
                .is_some_and(|text| self.heading_regex.is_match(text))
        });

        match first_hit {
            Some(hit) => {
                let start = hit.saturating_sub(self.config.window_before);
                let end = (hit + self.config.window_after).min(page_count.saturating_sub(1));
                debug!(heading_page = hit + 1, start = start + 1, end = end + 1, "ToC heading found");
                (start..=end).collect()
            }
            None => {
                debug!(
                    scanned = scan_limit,
                    "no ToC heading found; using leading pages"
                );
                (0..self.config.fallback_pages.min(page_count)).collect()
            }
        }
    }

    /// Parses ToC lines out of already-concatenated ToC text.
    pub fn parse_toc_text(&self, text: &str, doc_title: &str) -> Vec<Section> {
        let text = normalize_page_text(text);
        let mut sections = Vec::<Section>::new();

        for captures in self.line_regex.captures_iter(&text) {
            let section_id = &captures["id"];
            let title = normalize_whitespace(&captures["title"]);
            if title.is_empty() {
                continue;
            }

            let Ok(printed_page) = captures["page"].parse::<i64>() else {
                continue;
            };
            let page_start = usize::try_from(printed_page + self.config.page_offset).unwrap_or(0);

            sections.push(Section::from_dotted_id(
                doc_title,
                section_id,
                &title,
                page_start,
            ));
        }

        let candidates = self.candidate_regex.find_iter(&text).count();
        info!(
            matched = sections.len(),
            skipped = candidates.saturating_sub(sections.len()),
            "parsed ToC lines"
        );

        sections
    }
}

impl TocStrategy for RegexStrategy {
    fn name(&self) -> &'static str {
        "toc-text"
    }

    fn extract(&self, source: &dyn PageTextSource, doc_title: &str) -> Vec<Section> {
        let pages = self.toc_page_window(source);
        info!(
            first_page = pages.first().map(|page| page + 1),
            last_page = pages.last().map(|page| page + 1),
            pages = pages.len(),
            "reading ToC pages"
        );
        let text = text_of_pages(source, pages);
        self.parse_toc_text(&text, doc_title)
    }
}

#[derive(Debug, Clone)]
pub struct TocExtraction {
    pub strategy: &'static str,
    pub sections: Vec<Section>,
    pub duplicate_ids_dropped: usize,
    pub out_of_range_dropped: usize,
    pub synthetic_ids: usize,
}

/// Tries strategies in order; the first one that yields usable sections wins.
pub struct TocExtractor {
    strategies: Vec<Box<dyn TocStrategy>>,
}

impl TocExtractor {
    pub fn new(config: &TocConfig) -> Result<Self> {
        Ok(Self::with_strategies(vec![
            Box::new(BookmarkStrategy::new()?),
            Box::new(RegexStrategy::new(config.clone())?),
        ]))
    }

    pub fn with_strategies(strategies: Vec<Box<dyn TocStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn extract(&self, source: &dyn PageTextSource, doc_title: &str) -> Result<TocExtraction> {
        for strategy in &self.strategies {
            let raw = strategy.extract(source, doc_title);
            if raw.is_empty() {
                info!(strategy = strategy.name(), "ToC strategy found no entries");
                continue;
            }

            let extraction = retain_valid_entries(strategy.name(), raw, source.page_count());
            if extraction.sections.is_empty() {
                warn!(
                    strategy = strategy.name(),
                    out_of_range = extraction.out_of_range_dropped,
                    "ToC strategy entries all point outside the document"
                );
                continue;
            }

            info!(
                strategy = extraction.strategy,
                sections = extraction.sections.len(),
                duplicate_ids_dropped = extraction.duplicate_ids_dropped,
                out_of_range_dropped = extraction.out_of_range_dropped,
                synthetic_ids = extraction.synthetic_ids,
                "extracted table of contents"
            );
            return Ok(extraction);
        }

        warn!("no ToC found");
        Err(PipelineError::NoTableOfContents.into())
    }
}

fn retain_valid_entries(
    strategy: &'static str,
    raw: Vec<Section>,
    page_count: usize,
) -> TocExtraction {
    let mut seen_ids = HashSet::<String>::new();
    let mut sections = Vec::with_capacity(raw.len());
    let mut duplicate_ids_dropped = 0usize;
    let mut out_of_range_dropped = 0usize;

    for section in raw {
        if section.page_start == 0 || section.page_start > page_count {
            debug!(
                section_id = %section.section_id,
                page = section.page_start,
                page_count,
                "dropping ToC entry outside document"
            );
            out_of_range_dropped += 1;
            continue;
        }
        if !seen_ids.insert(section.section_id.clone()) {
            debug!(section_id = %section.section_id, "dropping duplicate ToC id");
            duplicate_ids_dropped += 1;
            continue;
        }
        sections.push(section);
    }

    let synthetic_ids = sections
        .iter()
        .filter(|section| is_synthetic_id(&section.section_id))
        .count();

    TocExtraction {
        strategy,
        sections,
        duplicate_ids_dropped,
        out_of_range_dropped,
        synthetic_ids,
    }
}
