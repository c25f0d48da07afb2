use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use tracing::{info, warn};

use crate::model::{Section, ValidationSummary, compare_section_ids};
use crate::util::ensure_parent_directory;

pub const SUMMARY_SHEET: &str = "Summary";
pub const MISMATCH_SHEET: &str = "Mismatches";

/// Set comparison of ToC ids against resolved ids, plus inventory sizes.
pub fn summarize(
    toc_sections: &[Section],
    spec_sections: &[Section],
    declared_tables: &[String],
    observed_tables: &[String],
) -> ValidationSummary {
    let toc_ids = toc_sections
        .iter()
        .map(|section| section.section_id.as_str())
        .collect::<HashSet<&str>>();
    let spec_ids = spec_sections
        .iter()
        .map(|section| section.section_id.as_str())
        .collect::<HashSet<&str>>();

    ValidationSummary {
        toc_section_count: toc_sections.len(),
        parsed_section_count: spec_sections.len(),
        ids_match: toc_ids == spec_ids,
        declared_table_count: declared_tables.len(),
        observed_table_count: observed_tables.len(),
        in_toc_not_parsed: sorted_difference(&toc_ids, &spec_ids),
        parsed_not_in_toc: sorted_difference(&spec_ids, &toc_ids),
    }
}

fn sorted_difference(left: &HashSet<&str>, right: &HashSet<&str>) -> Vec<String> {
    let mut ids = left
        .difference(right)
        .map(|id| id.to_string())
        .collect::<Vec<String>>();
    ids.sort_by(|a, b| compare_section_ids(a, b));
    ids
}

pub fn log_summary(summary: &ValidationSummary) {
    info!(
        toc_sections = summary.toc_section_count,
        parsed_sections = summary.parsed_section_count,
        ids_match = summary.ids_match,
        declared_tables = summary.declared_table_count,
        observed_tables = summary.observed_table_count,
        "validation summary"
    );

    if !summary.ids_match {
        warn!(
            in_toc_not_parsed = summary.in_toc_not_parsed.len(),
            parsed_not_in_toc = summary.parsed_not_in_toc.len(),
            "section ids differ between ToC and parsed sections"
        );
    }
    if summary.declared_table_count != summary.observed_table_count {
        warn!(
            declared = summary.declared_table_count,
            observed = summary.observed_table_count,
            "declared and observed table counts differ"
        );
    }
}

/// Writes the two-sheet workbook: summary metrics and ragged mismatch columns.
pub fn write_validation_report(path: &Path, summary: &ValidationSummary) -> Result<()> {
    ensure_parent_directory(path)?;

    let header = Format::new().set_bold();
    let mut workbook = Workbook::new();

    write_summary_sheet(workbook.add_worksheet(), summary, &header)
        .context("failed to build summary sheet")?;
    write_mismatch_sheet(workbook.add_worksheet(), summary, &header)
        .context("failed to build mismatch sheet")?;

    workbook
        .save(path)
        .with_context(|| format!("failed to write validation report: {}", path.display()))?;

    info!(path = %path.display(), "report written");
    Ok(())
}

fn write_summary_sheet(
    sheet: &mut Worksheet,
    summary: &ValidationSummary,
    header: &Format,
) -> Result<()> {
    sheet.set_name(SUMMARY_SHEET)?;
    sheet.set_column_width(0, 36)?;
    sheet.write_string_with_format(0, 0, "Metric", header)?;
    sheet.write_string_with_format(0, 1, "Value", header)?;

    let counts = [
        ("Total Sections in ToC", summary.toc_section_count),
        ("Total Sections Parsed (with text)", summary.parsed_section_count),
    ];
    let mut row = 1u32;
    for (metric, value) in counts {
        sheet.write_string(row, 0, metric)?;
        sheet.write_number(row, 1, value as f64)?;
        row += 1;
    }

    sheet.write_string(row, 0, "Sections Match (IDs)")?;
    sheet.write_string(row, 1, if summary.ids_match { "Yes" } else { "No" })?;
    row += 1;

    let table_counts = [
        ("Total Tables in ToC List", summary.declared_table_count),
        ("Total Tables Found in Body", summary.observed_table_count),
    ];
    for (metric, value) in table_counts {
        sheet.write_string(row, 0, metric)?;
        sheet.write_number(row, 1, value as f64)?;
        row += 1;
    }

    Ok(())
}

fn write_mismatch_sheet(
    sheet: &mut Worksheet,
    summary: &ValidationSummary,
    header: &Format,
) -> Result<()> {
    sheet.set_name(MISMATCH_SHEET)?;
    sheet.set_column_width(0, 20)?;
    sheet.set_column_width(1, 20)?;
    sheet.write_string_with_format(0, 0, "In ToC not Parsed", header)?;
    sheet.write_string_with_format(0, 1, "Parsed not in ToC", header)?;

    let columns = [&summary.in_toc_not_parsed, &summary.parsed_not_in_toc];
    for (column, ids) in columns.into_iter().enumerate() {
        for (index, id) in ids.iter().enumerate() {
            sheet.write_string(index as u32 + 1, column as u16, id)?;
        }
    }

    Ok(())
}
