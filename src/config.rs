use std::path::{Path, PathBuf};

use crate::cli::{ParseArgs, TocScanArgs};

/// Knobs for locating and reading the table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocConfig {
    /// Explicit ToC pages, 1-indexed. Overrides heading detection when non-empty.
    pub toc_pages: Vec<usize>,
    /// Added to page numbers read from ToC lines (printed vs. PDF page).
    pub page_offset: i64,
    pub scan_pages: usize,
    pub window_before: usize,
    pub window_after: usize,
    pub fallback_pages: usize,
}

impl Default for TocConfig {
    fn default() -> Self {
        Self {
            toc_pages: Vec::new(),
            page_offset: 0,
            scan_pages: 40,
            window_before: 1,
            window_after: 8,
            fallback_pages: 10,
        }
    }
}

impl TocConfig {
    pub fn from_args(args: &TocScanArgs) -> Self {
        Self {
            toc_pages: args.toc_pages.clone(),
            page_offset: args.page_offset,
            scan_pages: args.toc_scan_pages,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub toc: PathBuf,
    pub spec: PathBuf,
    pub metadata: PathBuf,
    pub report: PathBuf,
    pub manifest: PathBuf,
}

impl OutputPaths {
    pub fn new(
        out_dir: &Path,
        prefix: &str,
        report: Option<PathBuf>,
        manifest: Option<PathBuf>,
    ) -> Self {
        Self {
            toc: out_dir.join(format!("{prefix}_toc.jsonl")),
            spec: out_dir.join(format!("{prefix}_spec.jsonl")),
            metadata: out_dir.join(format!("{prefix}_metadata.jsonl")),
            report: report.unwrap_or_else(|| out_dir.join("validation_report.xlsx")),
            manifest: manifest.unwrap_or_else(|| out_dir.join("run_manifest.json")),
        }
    }
}

/// Everything one pipeline run needs; passed explicitly instead of living in globals.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub doc_title: String,
    pub source_file: Option<String>,
    pub toc: TocConfig,
    pub lot_scan_pages: usize,
    pub outputs: OutputPaths,
}

impl RunConfig {
    pub fn from_args(args: &ParseArgs, pdf_path: &Path) -> Self {
        Self {
            doc_title: args.doc_title.clone(),
            source_file: pdf_path
                .file_name()
                .and_then(|name| name.to_str())
                .map(ToOwned::to_owned),
            toc: TocConfig::from_args(&args.toc_scan),
            lot_scan_pages: args.lot_scan_pages,
            outputs: OutputPaths::new(
                &args.out_dir,
                &args.prefix,
                args.report_path.clone(),
                args.manifest_path.clone(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_paths_derive_from_prefix_and_directory() {
        let outputs = OutputPaths::new(Path::new("out"), "usb_pd", None, None);
        assert_eq!(outputs.toc, Path::new("out/usb_pd_toc.jsonl"));
        assert_eq!(outputs.spec, Path::new("out/usb_pd_spec.jsonl"));
        assert_eq!(outputs.metadata, Path::new("out/usb_pd_metadata.jsonl"));
        assert_eq!(outputs.report, Path::new("out/validation_report.xlsx"));
        assert_eq!(outputs.manifest, Path::new("out/run_manifest.json"));

        let custom = OutputPaths::new(
            Path::new("out"),
            "doc",
            Some(PathBuf::from("reports/check.xlsx")),
            None,
        );
        assert_eq!(custom.report, Path::new("reports/check.xlsx"));
    }

    #[test]
    fn toc_defaults_match_scan_windows() {
        let config = TocConfig::default();
        assert_eq!(config.scan_pages, 40);
        assert_eq!(config.window_before, 1);
        assert_eq!(config.window_after, 8);
        assert_eq!(config.fallback_pages, 10);
        assert!(config.toc_pages.is_empty());
    }
}
