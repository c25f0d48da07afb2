use std::path::PathBuf;

/// Fatal conditions that callers distinguish from ordinary I/O failures.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Source document missing, unreadable, or not resolvable.
    #[error("input error for {}: {reason}", .path.display())]
    Input { path: PathBuf, reason: String },

    /// Neither ToC strategy produced a single entry.
    #[error("no table of contents found")]
    NoTableOfContents,
}

impl PipelineError {
    pub fn input(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Input {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
