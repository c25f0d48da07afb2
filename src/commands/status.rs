use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::model::RunManifest;

pub fn run(args: StatusArgs) -> Result<()> {
    let manifest_path = args
        .manifest_path
        .clone()
        .unwrap_or_else(|| args.out_dir.join("run_manifest.json"));

    info!(path = %manifest_path.display(), "status requested");

    if !manifest_path.exists() {
        warn!(path = %manifest_path.display(), "run manifest missing");
        return Ok(());
    }

    let manifest = load_manifest(&manifest_path)?;

    info!(
        run_id = %manifest.run_id,
        status = %manifest.status,
        doc_title = %manifest.doc_title,
        started_at = %manifest.started_at,
        updated_at = %manifest.updated_at,
        toc_strategy = %manifest.toc_strategy.clone().unwrap_or_default(),
        source_sha256 = %manifest.source_sha256.clone().unwrap_or_default(),
        pages = manifest.counts.total_pages,
        toc_sections = manifest.counts.toc_sections,
        spec_sections = manifest.counts.spec_sections,
        declared_tables = manifest.counts.declared_tables,
        observed_tables = manifest.counts.observed_tables,
        "loaded run manifest"
    );

    if let Some(validation) = &manifest.validation {
        info!(
            ids_match = validation.ids_match,
            in_toc_not_parsed = validation.in_toc_not_parsed.len(),
            parsed_not_in_toc = validation.parsed_not_in_toc.len(),
            "validation"
        );
    }

    for warning in &manifest.warnings {
        warn!(warning = %warning, "recorded warning");
    }

    let outputs = [
        ("toc", &manifest.paths.toc_path),
        ("spec", &manifest.paths.spec_path),
        ("metadata", &manifest.paths.metadata_path),
        ("report", &manifest.paths.report_path),
    ];
    for (kind, path) in outputs {
        if Path::new(path).exists() {
            info!(kind, path = %path, "output present");
        } else {
            warn!(kind, path = %path, "output missing");
        }
    }

    Ok(())
}

fn load_manifest(path: &Path) -> Result<RunManifest> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RunCounts, RunPaths, ToolVersions};
    use crate::util::write_json_pretty;

    #[test]
    fn status_reads_manifest_written_by_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run_manifest.json");
        let manifest = RunManifest {
            manifest_version: 1,
            run_id: "run-20261019T101500Z".to_string(),
            status: "completed".to_string(),
            started_at: "2026-10-19T10:15:00Z".to_string(),
            updated_at: "2026-10-19T10:15:04Z".to_string(),
            command: "specsections parse --pdf spec.pdf".to_string(),
            doc_title: "Example".to_string(),
            source_sha256: Some("abc123".to_string()),
            toc_strategy: Some("bookmarks".to_string()),
            tool_versions: ToolVersions::default(),
            paths: RunPaths {
                source_pdf: "spec.pdf".to_string(),
                toc_path: dir.path().join("doc_toc.jsonl").display().to_string(),
                spec_path: dir.path().join("doc_spec.jsonl").display().to_string(),
                metadata_path: dir.path().join("doc_metadata.jsonl").display().to_string(),
                report_path: dir.path().join("validation_report.xlsx").display().to_string(),
            },
            counts: RunCounts {
                total_pages: 12,
                toc_sections: 4,
                spec_sections: 4,
                ..RunCounts::default()
            },
            validation: None,
            warnings: vec!["declared table count 1 differs from observed count 2".to_string()],
        };
        write_json_pretty(&path, &manifest).unwrap();

        let loaded = load_manifest(&path).unwrap();
        assert_eq!(loaded.run_id, manifest.run_id);
        assert_eq!(loaded.counts.total_pages, 12);
        assert_eq!(loaded.toc_strategy.as_deref(), Some("bookmarks"));

        run(StatusArgs {
            out_dir: dir.path().to_path_buf(),
            manifest_path: None,
        })
        .unwrap();
    }

    #[test]
    fn missing_manifest_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        run(StatusArgs {
            out_dir: dir.path().to_path_buf(),
            manifest_path: None,
        })
        .unwrap();
    }
}
