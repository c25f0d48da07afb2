use anyhow::Result;
use tracing::info;

use crate::config::RunConfig;
use crate::document::PageTextSource;
use crate::model::{MetadataRecord, RunCounts, ValidationSummary};
use crate::util::write_jsonl;

mod boundaries;
mod report;
mod tables;
mod toc;

pub use boundaries::resolve_sections;
pub use report::{log_summary, summarize, write_validation_report};
pub use tables::{declared_tables, observed_tables};
pub use toc::TocExtractor;

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub toc_strategy: &'static str,
    pub counts: RunCounts,
    pub validation: ValidationSummary,
}

/// Runs extraction, boundary resolution, table reconciliation and reporting in order.
///
/// Stops with `PipelineError::NoTableOfContents` before any file is written when the
/// ToC is empty. Id or table disagreements are reported, never fatal.
pub fn run_pipeline(config: &RunConfig, source: &dyn PageTextSource) -> Result<PipelineOutcome> {
    let outputs = &config.outputs;

    let extraction = TocExtractor::new(&config.toc)?.extract(source, &config.doc_title)?;
    let toc_sections = extraction.sections;
    write_jsonl(&outputs.toc, &toc_sections)?;
    info!(path = %outputs.toc.display(), records = toc_sections.len(), "wrote ToC records");

    let spec_sections = resolve_sections(source, &toc_sections);
    write_jsonl(&outputs.spec, &spec_sections)?;
    info!(path = %outputs.spec.display(), records = spec_sections.len(), "wrote spec records");

    let metadata = MetadataRecord {
        doc_title: config.doc_title.clone(),
        source_file: config.source_file.clone(),
        total_pages: source.page_count(),
    };
    write_jsonl(&outputs.metadata, &[metadata])?;

    let declared = declared_tables(source, config.lot_scan_pages)?;
    let observed = observed_tables(&spec_sections)?;

    let validation = summarize(&toc_sections, &spec_sections, &declared, &observed);
    log_summary(&validation);
    write_validation_report(&outputs.report, &validation)?;

    Ok(PipelineOutcome {
        toc_strategy: extraction.strategy,
        counts: RunCounts {
            total_pages: source.page_count(),
            toc_sections: toc_sections.len(),
            spec_sections: spec_sections.len(),
            declared_tables: declared.len(),
            observed_tables: observed.len(),
            duplicate_ids_dropped: extraction.duplicate_ids_dropped,
            out_of_range_entries_dropped: extraction.out_of_range_dropped,
            synthetic_ids_assigned: extraction.synthetic_ids,
        },
        validation,
    })
}
