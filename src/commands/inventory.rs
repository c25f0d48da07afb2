use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::{InventoryArgs, SourceArgs};
use crate::document::read_page_count;
use crate::error::PipelineError;
use crate::model::{PdfEntry, PdfInventoryManifest};
use crate::util::{now_utc_string, sha256_file, write_json_pretty};

pub fn run(args: InventoryArgs) -> Result<()> {
    let manifest = build_manifest(&args.search_dir)?;

    for pdf in &manifest.pdfs {
        info!(
            filename = %pdf.filename,
            sha256 = %pdf.sha256,
            pages = pdf.page_count,
            "found pdf"
        );
    }

    if args.dry_run {
        info!(
            pdf_count = manifest.pdf_count,
            source = %manifest.source_directory,
            "inventory dry-run complete"
        );
        return Ok(());
    }

    let manifest_path = args
        .manifest_path
        .unwrap_or_else(|| args.search_dir.join("pdf_inventory.json"));

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote inventory manifest");
    info!(pdf_count = manifest.pdf_count, "inventory completed");

    Ok(())
}

pub fn build_manifest(search_dir: &Path) -> Result<PdfInventoryManifest> {
    let pdf_paths = discover_pdfs(search_dir)?;

    let mut pdfs = Vec::with_capacity(pdf_paths.len());
    for path in pdf_paths {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToOwned::to_owned)
            .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))?;

        let page_count = match read_page_count(&path) {
            Ok(count) => Some(count),
            Err(error) => {
                warn!(path = %path.display(), error = %error, "could not read page count");
                None
            }
        };

        pdfs.push(PdfEntry {
            filename,
            sha256: sha256_file(&path)?,
            page_count,
        });
    }

    Ok(PdfInventoryManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        source_directory: search_dir.display().to_string(),
        pdf_count: pdfs.len(),
        pdfs,
    })
}

/// Resolves the PDF for a run: an explicit `--pdf`, else the single or preferred
/// candidate found in the search directory.
pub fn locate_pdf(args: &SourceArgs) -> Result<PathBuf> {
    if let Some(path) = &args.pdf {
        return Ok(path.clone());
    }

    let candidates = discover_pdfs(&args.search_dir)?;
    let chosen = choose_candidate(&candidates, args.prefer.as_deref());

    match chosen {
        Some(path) => {
            info!(path = %path.display(), candidates = candidates.len(), "selected pdf");
            Ok(path.clone())
        }
        None if candidates.is_empty() => Err(PipelineError::input(
            &args.search_dir,
            "no PDF files found; pass --pdf or place one in the search directory",
        )
        .into()),
        None => Err(PipelineError::input(
            &args.search_dir,
            format!(
                "{} PDF files found and none matches --prefer; pass --pdf explicitly",
                candidates.len()
            ),
        )
        .into()),
    }
}

fn choose_candidate<'a>(candidates: &'a [PathBuf], prefer: Option<&str>) -> Option<&'a PathBuf> {
    if let Some(fragment) = prefer.map(str::to_lowercase).filter(|value| !value.is_empty()) {
        let preferred = candidates.iter().find(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.to_lowercase().contains(&fragment))
                .unwrap_or(false)
        });
        if preferred.is_some() {
            return preferred;
        }
    }

    match candidates {
        [only] => Some(only),
        _ => None,
    }
}

fn discover_pdfs(search_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pdfs = Vec::new();

    let entries = fs::read_dir(search_dir)
        .with_context(|| format!("failed to read {}", search_dir.display()))?;

    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", search_dir.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);

        if is_pdf {
            pdfs.push(path);
        }
    }

    pdfs.sort();
    Ok(pdfs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_args(dir: &Path, prefer: Option<&str>) -> SourceArgs {
        SourceArgs {
            pdf: None,
            search_dir: dir.to_path_buf(),
            prefer: prefer.map(ToOwned::to_owned),
        }
    }

    #[test]
    fn discover_pdfs_finds_only_pdf_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.PDF"), b"%PDF-1.7").unwrap();
        fs::write(dir.path().join("a.pdf"), b"%PDF-1.7").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let found = discover_pdfs(dir.path()).unwrap();
        let names = found
            .iter()
            .map(|path| path.file_name().unwrap().to_str().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["a.pdf", "b.PDF"]);
    }

    #[test]
    fn locate_pdf_prefers_matching_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("other.pdf"), b"%PDF").unwrap();
        fs::write(dir.path().join("USB_PD_R3_2.pdf"), b"%PDF").unwrap();

        let chosen = locate_pdf(&source_args(dir.path(), Some("usb"))).unwrap();
        assert_eq!(chosen.file_name().unwrap(), "USB_PD_R3_2.pdf");
    }

    #[test]
    fn locate_pdf_uses_single_candidate() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("spec.pdf"), b"%PDF").unwrap();

        let chosen = locate_pdf(&source_args(dir.path(), Some("usb"))).unwrap();
        assert_eq!(chosen.file_name().unwrap(), "spec.pdf");
    }

    #[test]
    fn locate_pdf_rejects_empty_or_ambiguous_directories() {
        let dir = tempfile::tempdir().unwrap();
        let error = locate_pdf(&source_args(dir.path(), None)).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<PipelineError>(),
            Some(PipelineError::Input { .. })
        ));

        fs::write(dir.path().join("one.pdf"), b"%PDF").unwrap();
        fs::write(dir.path().join("two.pdf"), b"%PDF").unwrap();
        let error = locate_pdf(&source_args(dir.path(), None)).unwrap_err();
        assert!(error.to_string().contains("2 PDF files found"));
    }

    #[test]
    fn explicit_pdf_path_wins() {
        let args = SourceArgs {
            pdf: Some(PathBuf::from("/data/spec.pdf")),
            search_dir: PathBuf::from("/nonexistent"),
            prefer: None,
        };
        assert_eq!(locate_pdf(&args).unwrap(), PathBuf::from("/data/spec.pdf"));
    }
}
