use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::ParseArgs;
use crate::commands::inventory::locate_pdf;
use crate::config::RunConfig;
use crate::document::{PageTextSource, PopplerDocument, collect_tool_versions};
use crate::model::{RunCounts, RunManifest, RunPaths};
use crate::pipeline::run_pipeline;
use crate::util::{now_utc_string, sha256_file, utc_compact_string, write_json_pretty};

pub fn run(args: ParseArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let pdf_path = locate_pdf(&args.source)?;
    let config = RunConfig::from_args(&args, &pdf_path);

    info!(
        run_id = %run_id,
        pdf = %pdf_path.display(),
        doc_title = %config.doc_title,
        "starting parse"
    );

    let document = PopplerDocument::open(&pdf_path)?;
    let source_sha256 = sha256_file(document.path())?;

    let outputs = &config.outputs;
    let mut manifest = RunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        status: "running".to_string(),
        started_at,
        updated_at: now_utc_string(),
        command: render_parse_command(&args),
        doc_title: config.doc_title.clone(),
        source_sha256: Some(source_sha256),
        toc_strategy: None,
        tool_versions: collect_tool_versions(),
        paths: RunPaths {
            source_pdf: pdf_path.display().to_string(),
            toc_path: outputs.toc.display().to_string(),
            spec_path: outputs.spec.display().to_string(),
            metadata_path: outputs.metadata.display().to_string(),
            report_path: outputs.report.display().to_string(),
        },
        counts: RunCounts {
            total_pages: document.page_count(),
            ..RunCounts::default()
        },
        validation: None,
        warnings: Vec::new(),
    };

    match run_pipeline(&config, &document) {
        Ok(outcome) => {
            if !outcome.validation.ids_match {
                manifest
                    .warnings
                    .push("section ids differ between ToC and parsed sections".to_string());
            }
            if outcome.counts.declared_tables != outcome.counts.observed_tables {
                manifest.warnings.push(format!(
                    "declared table count {} differs from observed count {}",
                    outcome.counts.declared_tables, outcome.counts.observed_tables
                ));
            }

            manifest.status = "completed".to_string();
            manifest.updated_at = now_utc_string();
            manifest.toc_strategy = Some(outcome.toc_strategy.to_string());
            manifest.counts = outcome.counts;
            manifest.validation = Some(outcome.validation);

            write_json_pretty(&outputs.manifest, &manifest)?;
            info!(path = %outputs.manifest.display(), "wrote run manifest");
            info!(
                run_id = %run_id,
                sections = manifest.counts.spec_sections,
                pages = manifest.counts.total_pages,
                "parse completed"
            );
            Ok(())
        }
        Err(error) => {
            manifest.status = "failed".to_string();
            manifest.updated_at = now_utc_string();
            manifest.warnings.push(format!("{error:#}"));

            if let Err(write_error) = write_json_pretty(&outputs.manifest, &manifest) {
                warn!(error = %write_error, "failed to record failed run manifest");
            }
            Err(error)
        }
    }
}

fn render_parse_command(args: &ParseArgs) -> String {
    let mut command = vec!["specsections".to_string(), "parse".to_string()];

    if let Some(path) = &args.source.pdf {
        command.push("--pdf".to_string());
        command.push(path.display().to_string());
    } else {
        command.push("--search-dir".to_string());
        command.push(args.source.search_dir.display().to_string());
    }
    if let Some(prefer) = &args.source.prefer {
        command.push("--prefer".to_string());
        command.push(prefer.clone());
    }
    command.push("--doc-title".to_string());
    command.push(format!("{:?}", args.doc_title));
    for page in &args.toc_scan.toc_pages {
        command.push("--toc-page".to_string());
        command.push(page.to_string());
    }
    if args.toc_scan.page_offset != 0 {
        command.push("--page-offset".to_string());
        command.push(args.toc_scan.page_offset.to_string());
    }
    command.push("--toc-scan-pages".to_string());
    command.push(args.toc_scan.toc_scan_pages.to_string());
    command.push("--lot-scan-pages".to_string());
    command.push(args.lot_scan_pages.to_string());
    command.push("--out-dir".to_string());
    command.push(args.out_dir.display().to_string());
    command.push("--prefix".to_string());
    command.push(args.prefix.clone());
    if let Some(path) = &args.report_path {
        command.push("--report-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.manifest_path {
        command.push("--manifest-path".to_string());
        command.push(path.display().to_string());
    }

    command.join(" ")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::cli::{SourceArgs, TocScanArgs};

    fn parse_args() -> ParseArgs {
        ParseArgs {
            source: SourceArgs {
                pdf: Some(PathBuf::from("specs/usb_pd.pdf")),
                search_dir: PathBuf::from("."),
                prefer: None,
            },
            doc_title: "USB PD".to_string(),
            toc_scan: TocScanArgs {
                toc_pages: vec![3, 4],
                page_offset: -2,
                toc_scan_pages: 25,
            },
            lot_scan_pages: 70,
            out_dir: PathBuf::from("out"),
            prefix: "usb_pd".to_string(),
            report_path: Some(PathBuf::from("reports/check.xlsx")),
            manifest_path: Some(PathBuf::from("runs/manifest.json")),
        }
    }

    #[test]
    fn render_parse_command_records_scan_windows_and_paths() {
        let command = render_parse_command(&parse_args());
        assert!(command.starts_with("specsections parse --pdf specs/usb_pd.pdf"));
        assert!(command.contains("--doc-title \"USB PD\""));
        assert!(command.contains("--toc-page 3 --toc-page 4"));
        assert!(command.contains("--page-offset -2"));
        assert!(command.contains("--toc-scan-pages 25"));
        assert!(command.contains("--lot-scan-pages 70"));
        assert!(command.contains("--out-dir out --prefix usb_pd"));
        assert!(command.contains("--report-path reports/check.xlsx"));
        assert!(command.contains("--manifest-path runs/manifest.json"));
    }

    #[test]
    fn render_parse_command_omits_unset_optional_flags() {
        let mut args = parse_args();
        args.source.pdf = None;
        args.toc_scan.toc_pages.clear();
        args.toc_scan.page_offset = 0;
        args.report_path = None;
        args.manifest_path = None;

        let command = render_parse_command(&args);
        assert!(command.contains("--search-dir ."));
        assert!(!command.contains("--pdf"));
        assert!(!command.contains("--toc-page "));
        assert!(!command.contains("--page-offset"));
        assert!(!command.contains("--report-path"));
        assert!(!command.contains("--manifest-path"));
        assert!(command.contains("--toc-scan-pages 25"));
    }
}
