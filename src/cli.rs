use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "specsections",
    version,
    about = "Section and ToC extraction for large specification PDFs"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract ToC and section text, then write records and the validation report.
    Parse(ParseArgs),
    /// Extract only the table of contents.
    Toc(TocArgs),
    /// List candidate PDFs in a directory.
    Inventory(InventoryArgs),
    /// Summarize a previous parse run from its manifest.
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// PDF to process. When omitted, a PDF is picked from --search-dir.
    #[arg(long)]
    pub pdf: Option<PathBuf>,

    #[arg(long, default_value = ".")]
    pub search_dir: PathBuf,

    /// Case-insensitive file name fragment preferred when several PDFs are found.
    #[arg(long)]
    pub prefer: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct TocScanArgs {
    /// 1-indexed page to treat as part of the table of contents; overrides detection.
    #[arg(long = "toc-page")]
    pub toc_pages: Vec<usize>,

    /// Added to every page number read from ToC text lines.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub page_offset: i64,

    #[arg(long, default_value_t = 40)]
    pub toc_scan_pages: usize,
}

#[derive(Args, Debug, Clone)]
pub struct ParseArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[arg(long)]
    pub doc_title: String,

    #[command(flatten)]
    pub toc_scan: TocScanArgs,

    #[arg(long, default_value_t = 50)]
    pub lot_scan_pages: usize,

    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    #[arg(long, default_value = "doc")]
    pub prefix: String,

    #[arg(long)]
    pub report_path: Option<PathBuf>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct TocArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[arg(long, default_value = "")]
    pub doc_title: String,

    #[command(flatten)]
    pub toc_scan: TocScanArgs,

    /// Write JSONL here instead of stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    #[arg(long, default_value = ".")]
    pub search_dir: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}
