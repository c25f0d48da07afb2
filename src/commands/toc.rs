use std::io::Write;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::TocArgs;
use crate::commands::inventory::locate_pdf;
use crate::config::TocConfig;
use crate::document::PopplerDocument;
use crate::pipeline::TocExtractor;
use crate::util::{jsonl_bytes, write_jsonl};

pub fn run(args: TocArgs) -> Result<()> {
    let pdf_path = locate_pdf(&args.source)?;
    let document = PopplerDocument::open(&pdf_path)?;

    let extraction = TocExtractor::new(&TocConfig::from_args(&args.toc_scan))?
        .extract(&document, &args.doc_title)?;

    match &args.output {
        Some(path) => {
            write_jsonl(path, &extraction.sections)?;
            info!(
                path = %path.display(),
                records = extraction.sections.len(),
                strategy = extraction.strategy,
                "wrote ToC records"
            );
        }
        None => {
            let data = jsonl_bytes(&extraction.sections)?;
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(&data)
                .and_then(|_| stdout.flush())
                .context("failed to write ToC records to stdout")?;
        }
    }

    Ok(())
}
