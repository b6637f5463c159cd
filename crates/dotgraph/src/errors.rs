use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DotGraphError {
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("manifest error: {0}")]
    Manifest(String),
}

/// Failures of the rendering collaborator. Both write and conversion failures
/// are terminal for the render call; nothing is retried or cleaned up.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed writing dot file '{}': {source}", .path.display())]
    WriteDot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("conversion with '{program}' failed: {message}")]
    Conversion { program: String, message: String },
    #[error("render config error: {0}")]
    Config(String),
}
