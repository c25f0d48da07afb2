use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// One table-of-contents entry, and after boundary resolution, its body text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub doc_title: String,
    pub section_id: String,
    pub title: String,
    /// 1-indexed PDF page on which the section begins.
    #[serde(rename = "page")]
    pub page_start: usize,
    pub level: usize,
    pub parent_id: Option<String>,
    pub full_path: String,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Section {
    /// Builds a section whose hierarchy comes purely from the dotted id.
    pub fn from_dotted_id(doc_title: &str, section_id: &str, title: &str, page_start: usize) -> Self {
        Self::new(
            doc_title,
            section_id,
            title,
            page_start,
            level_for_id(section_id),
        )
    }

    /// Builds a section with an externally declared level (outline nesting).
    pub fn new(
        doc_title: &str,
        section_id: &str,
        title: &str,
        page_start: usize,
        level: usize,
    ) -> Self {
        Self {
            doc_title: doc_title.to_string(),
            section_id: section_id.to_string(),
            title: title.to_string(),
            page_start,
            level: level.max(1),
            parent_id: parent_for_id(section_id),
            full_path: full_path_for(section_id, title),
            tags: Vec::new(),
            text: None,
        }
    }

    /// Replaces a missing id with a synthetic `L{level}-{seq:03}` id.
    pub fn assign_synthetic_id(&mut self, sequence: usize) {
        self.section_id = format!("L{}-{:03}", self.level, sequence);
        self.parent_id = None;
        self.full_path = full_path_for(&self.section_id, &self.title);
    }

    pub fn with_text(&self, text: String) -> Self {
        Self {
            text: Some(text),
            ..self.clone()
        }
    }
}

pub fn level_for_id(section_id: &str) -> usize {
    section_id.matches('.').count() + 1
}

pub fn parent_for_id(section_id: &str) -> Option<String> {
    section_id
        .rsplit_once('.')
        .map(|(parent, _)| parent.to_string())
        .filter(|parent| !parent.is_empty())
}

/// True for ids of the form `L{level}-{seq}` minted for outline entries without a number.
pub fn is_synthetic_id(section_id: &str) -> bool {
    synthetic_parts(section_id).is_some()
}

fn synthetic_parts(section_id: &str) -> Option<(u64, u64)> {
    let (level, sequence) = section_id.strip_prefix('L')?.split_once('-')?;
    let all_digits = |part: &str| !part.is_empty() && part.chars().all(|ch| ch.is_ascii_digit());
    if !all_digits(level) || !all_digits(sequence) {
        return None;
    }
    Some((level.parse().ok()?, sequence.parse().ok()?))
}

fn full_path_for(section_id: &str, title: &str) -> String {
    format!("{} {}", section_id, title).trim().to_string()
}

/// Orders ids by their dotted numeric components, so `2.10` sorts after `2.9`.
/// Synthetic ids sort after numbered ones, by level then sequence.
pub fn compare_section_ids(left: &str, right: &str) -> Ordering {
    match (synthetic_parts(left), synthetic_parts(right)) {
        (Some(left_parts), Some(right_parts)) => {
            return left_parts.cmp(&right_parts).then_with(|| left.cmp(right));
        }
        (Some(_), None) => return Ordering::Greater,
        (None, Some(_)) => return Ordering::Less,
        (None, None) => {}
    }

    let mut left_parts = left.split('.');
    let mut right_parts = right.split('.');

    loop {
        match (left_parts.next(), right_parts.next()) {
            (None, None) => return left.cmp(right),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(a), Some(b)) => {
                let ordering = match (a.parse::<u64>(), b.parse::<u64>()) {
                    (Ok(a_num), Ok(b_num)) => a_num.cmp(&b_num),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => a.cmp(b),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub doc_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    pub total_pages: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub toc_section_count: usize,
    pub parsed_section_count: usize,
    pub ids_match: bool,
    pub declared_table_count: usize,
    pub observed_table_count: usize,
    pub in_toc_not_parsed: Vec<String>,
    pub parsed_not_in_toc: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfEntry {
    pub filename: String,
    pub sha256: String,
    pub page_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfInventoryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_directory: String,
    pub pdf_count: usize,
    pub pdfs: Vec<PdfEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolVersions {
    pub pdftotext: Option<String>,
    pub pdftohtml: Option<String>,
    pub pdfinfo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunPaths {
    pub source_pdf: String,
    pub toc_path: String,
    pub spec_path: String,
    pub metadata_path: String,
    pub report_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunCounts {
    pub total_pages: usize,
    pub toc_sections: usize,
    pub spec_sections: usize,
    pub declared_tables: usize,
    pub observed_tables: usize,
    pub duplicate_ids_dropped: usize,
    pub out_of_range_entries_dropped: usize,
    pub synthetic_ids_assigned: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub doc_title: String,
    pub source_sha256: Option<String>,
    pub toc_strategy: Option<String>,
    pub tool_versions: ToolVersions,
    pub paths: RunPaths,
    pub counts: RunCounts,
    pub validation: Option<ValidationSummary>,
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_ids_derive_level_and_parent() {
        let two = Section::from_dotted_id("Doc", "6.4", "Negotiation", 10);
        assert_eq!(two.level, 2);
        assert_eq!(two.parent_id.as_deref(), Some("6"));

        let three = Section::from_dotted_id("Doc", "6.4.2", "Power Negotiation", 301);
        assert_eq!(three.level, 3);
        assert_eq!(three.parent_id.as_deref(), Some("6.4"));
        assert_eq!(three.full_path, "6.4.2 Power Negotiation");

        let top = Section::from_dotted_id("Doc", "6", "Protocol", 5);
        assert_eq!(top.level, 1);
        assert_eq!(top.parent_id, None);
    }

    #[test]
    fn synthetic_ids_drop_parent() {
        let mut section = Section::new("Doc", "", "Foreword", 2, 1);
        section.assign_synthetic_id(7);
        assert_eq!(section.section_id, "L1-007");
        assert_eq!(section.parent_id, None);
        assert_eq!(section.full_path, "L1-007 Foreword");
        assert!(is_synthetic_id(&section.section_id));
        assert!(!is_synthetic_id("1.2"));
        assert!(!is_synthetic_id("L-1"));
    }

    #[test]
    fn section_ids_compare_numerically() {
        let mut ids = vec!["2.10", "10", "2.9", "2", "1.1.3", "L1-001"];
        ids.sort_by(|a, b| compare_section_ids(a, b));
        assert_eq!(ids, vec!["1.1.3", "2", "2.9", "2.10", "10", "L1-001"]);
    }

    #[test]
    fn synthetic_ids_compare_by_level_then_sequence() {
        let mut ids = vec!["L10-001", "L2-010", "3", "L2-002", "L1-100"];
        ids.sort_by(|a, b| compare_section_ids(a, b));
        assert_eq!(ids, vec!["3", "L1-100", "L2-002", "L2-010", "L10-001"]);
    }

    #[test]
    fn toc_records_omit_text_and_keep_null_parent() {
        let section = Section::from_dotted_id("Doc", "1", "Überblick", 1);
        let json = serde_json::to_string(&section).unwrap();
        assert_eq!(
            json,
            r#"{"doc_title":"Doc","section_id":"1","title":"Überblick","page":1,"level":1,"parent_id":null,"full_path":"1 Überblick","tags":[]}"#
        );

        let with_text = section.with_text("Body".to_string());
        let json = serde_json::to_string(&with_text).unwrap();
        assert!(json.ends_with(r#""tags":[],"text":"Body"}"#));
    }
}
