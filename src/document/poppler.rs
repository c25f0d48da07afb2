use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use regex::{Captures, Regex};
use tracing::{info, warn};

use super::{OutlineEntry, PageTextSource, normalize_page_text};
use crate::error::PipelineError;
use crate::model::ToolVersions;

/// A PDF loaded through poppler-utils. All tool output is captured once at open time.
#[derive(Debug, Clone)]
pub struct PopplerDocument {
    path: PathBuf,
    pages: Vec<String>,
    outline: Vec<OutlineEntry>,
}

impl PopplerDocument {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(PipelineError::input(path, "file not found").into());
        }

        let page_count = read_page_count(path)?;
        let mut pages = extract_pages_with_pdftotext(path)?;
        if pages.len() != page_count {
            warn!(
                path = %path.display(),
                pdfinfo_pages = page_count,
                pdftotext_pages = pages.len(),
                "page count mismatch between pdfinfo and pdftotext; padding to pdfinfo count"
            );
            pages.resize(page_count, String::new());
        }

        let outline = match extract_outline_with_pdftohtml(path) {
            Ok(outline) => outline,
            Err(error) => {
                warn!(
                    path = %path.display(),
                    error = %error,
                    "outline extraction failed; continuing without bookmarks"
                );
                Vec::new()
            }
        };

        info!(
            path = %path.display(),
            pages = pages.len(),
            outline_entries = outline.len(),
            "loaded document"
        );

        Ok(Self {
            path: path.to_path_buf(),
            pages,
            outline,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PageTextSource for PopplerDocument {
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

pub fn read_page_count(pdf_path: &Path) -> Result<usize> {
    let output = Command::new("pdfinfo").arg(pdf_path).output().map_err(|error| {
        PipelineError::input(pdf_path, format!("failed to execute pdfinfo: {error}"))
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PipelineError::input(
            pdf_path,
            format!("pdfinfo returned non-zero exit status: {}", stderr.trim()),
        )
        .into());
    }

    parse_pdfinfo_pages(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
        PipelineError::input(pdf_path, "pdfinfo output did not report a page count").into()
    })
}

fn parse_pdfinfo_pages(output: &str) -> Option<usize> {
    output.lines().find_map(|line| {
        line.strip_prefix("Pages:")
            .and_then(|value| value.trim().parse::<usize>().ok())
    })
}

fn extract_pages_with_pdftotext(pdf_path: &Path) -> Result<Vec<String>> {
    let output = Command::new("pdftotext")
        .arg("-enc")
        .arg("UTF-8")
        .arg(pdf_path)
        .arg("-")
        .output()
        .map_err(|error| {
            PipelineError::input(pdf_path, format!("failed to execute pdftotext: {error}"))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PipelineError::input(
            pdf_path,
            format!("pdftotext returned non-zero exit status: {}", stderr.trim()),
        )
        .into());
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    Ok(split_pdftotext_pages(&raw))
}

/// pdftotext terminates every page with a form feed, so the final chunk is empty.
fn split_pdftotext_pages(raw: &str) -> Vec<String> {
    let mut pages: Vec<String> = raw.split('\u{000C}').map(normalize_page_text).collect();
    if pages.last().is_some_and(|last| last.is_empty()) {
        pages.pop();
    }
    pages
}

fn extract_outline_with_pdftohtml(pdf_path: &Path) -> Result<Vec<OutlineEntry>> {
    let output = Command::new("pdftohtml")
        .arg("-xml")
        .arg("-i")
        .arg("-f")
        .arg("1")
        .arg("-l")
        .arg("1")
        .arg(pdf_path)
        .arg("-stdout")
        .output()
        .with_context(|| format!("failed to execute pdftohtml for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!(
            "pdftohtml returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    parse_outline_xml(&String::from_utf8_lossy(&output.stdout))
}

/// Walks the `<outline>` tree emitted by `pdftohtml -xml`; nesting depth is the level.
fn parse_outline_xml(xml: &str) -> Result<Vec<OutlineEntry>> {
    let token_regex = Regex::new(
        r#"(?s)(?P<open><outline\b[^>]*>)|(?P<close></outline>)|<item\b(?:[^>]*?\bpage="(?P<page>\d+)")?[^>]*>(?P<label>.*?)</item>"#,
    )
    .context("failed to compile outline token regex")?;
    let tag_regex = Regex::new(r"<[^>]+>").context("failed to compile tag regex")?;
    let entity_regex = Regex::new(r"&#(?:[xX](?P<hex>[0-9A-Fa-f]{1,6})|(?P<dec>[0-9]{1,7}));")
        .context("failed to compile character reference regex")?;

    let mut entries = Vec::<OutlineEntry>::new();
    let mut depth = 0usize;

    for captures in token_regex.captures_iter(xml) {
        if captures.name("open").is_some() {
            depth += 1;
            continue;
        }
        if captures.name("close").is_some() {
            depth = depth.saturating_sub(1);
            continue;
        }

        let page = captures
            .name("page")
            .and_then(|value| value.as_str().parse::<usize>().ok())
            .unwrap_or(0);
        if page == 0 {
            continue;
        }

        let raw_label = captures.name("label").map(|value| value.as_str()).unwrap_or("");
        let title = normalize_outline_label(&tag_regex.replace_all(raw_label, ""), &entity_regex);
        if title.is_empty() {
            continue;
        }

        entries.push(OutlineEntry {
            level: depth.max(1),
            title,
            page,
        });
    }

    Ok(entries)
}

/// Decodes XML entities and collapses whitespace. `&amp;` goes last so that
/// `&amp;#39;` stays literal.
fn normalize_outline_label(raw_label: &str, entity_regex: &Regex) -> String {
    let decoded = entity_regex.replace_all(raw_label, |captures: &Captures<'_>| {
        let code_point = match (captures.name("hex"), captures.name("dec")) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (None, Some(dec)) => dec.as_str().parse::<u32>().ok(),
            (None, None) => None,
        };
        match code_point.and_then(char::from_u32) {
            Some(ch) => ch.to_string(),
            None => captures[0].to_string(),
        }
    });

    decoded
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
        .replace('\u{00a0}', " ")
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}

pub fn collect_tool_versions() -> ToolVersions {
    ToolVersions {
        pdftotext: command_version_optional("pdftotext", &["-v"]),
        pdftohtml: command_version_optional("pdftohtml", &["-v"]),
        pdfinfo: command_version_optional("pdfinfo", &["-v"]),
    }
}

fn command_version_optional(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let source = if stdout.trim().is_empty() {
        stderr.trim()
    } else {
        stdout.trim()
    };

    source
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outline_levels_follow_nesting_depth() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<pdf2xml producer="poppler" version="23.02.0">
<page number="1" position="absolute" top="0" left="0" height="1188" width="918">
</page>
<outline>
<item page="1">Cover</item>
<item page="3">1 Introduction</item>
<outline>
<item page="4">1.1 Scope &amp; Purpose</item>
<outline>
<item page="5"><a href="x">1.1.1   Terms</a></item>
</outline>
</outline>
<item>Unlinked</item>
<item page="9">2 Overview</item>
</outline>
</pdf2xml>"#;

        let entries = parse_outline_xml(xml).unwrap();
        let triples = entries
            .iter()
            .map(|entry| (entry.level, entry.title.as_str(), entry.page))
            .collect::<Vec<_>>();

        assert_eq!(
            triples,
            vec![
                (1, "Cover", 1),
                (1, "1 Introduction", 3),
                (2, "1.1 Scope & Purpose", 4),
                (3, "1.1.1 Terms", 5),
                (1, "2 Overview", 9),
            ]
        );
    }

    #[test]
    fn outline_labels_decode_numeric_character_references() {
        let xml = r#"<outline>
<item page="2">6.4 Source&#8211;Sink &#x201C;Caps&#x201d; &#39;v2&#39;&#160;Notes</item>
<item page="3">7 R&amp;D &amp;#39;raw&amp;#39; &#xD800;</item>
</outline>"#;

        let entries = parse_outline_xml(xml).unwrap();
        let titles = entries
            .iter()
            .map(|entry| entry.title.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            titles,
            vec![
                "6.4 Source\u{2013}Sink \u{201C}Caps\u{201D} 'v2' Notes",
                "7 R&D &#39;raw&#39; &#xD800;",
            ]
        );
    }

    #[test]
    fn outline_absent_yields_no_entries() {
        let xml = r#"<pdf2xml><page number="1"><text>Hello</text></page></pdf2xml>"#;
        assert!(parse_outline_xml(xml).unwrap().is_empty());
    }

    #[test]
    fn pdftotext_output_splits_on_form_feed() {
        let pages = split_pdftotext_pages("first\r\n\u{000C}second\n\u{000C}\u{000C}");
        assert_eq!(pages, vec!["first\n", "second\n", ""]);
    }

    #[test]
    fn pdfinfo_pages_line_is_parsed() {
        let output = "Title:          USB PD\nPages:          842\nEncrypted:      no\n";
        assert_eq!(parse_pdfinfo_pages(output), Some(842));
        assert_eq!(parse_pdfinfo_pages("Title: x\n"), None);
    }

    #[test]
    fn opening_missing_file_is_an_input_error() {
        let error = PopplerDocument::open(Path::new("/nonexistent/spec.pdf")).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<PipelineError>(),
            Some(PipelineError::Input { .. })
        ));
    }
}
