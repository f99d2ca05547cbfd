use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("document not found: {}", .0.display())]
    MissingDocument(PathBuf),

    #[error("output directory not found: {}", .0.display())]
    MissingOutputDir(PathBuf),

    #[error("request failed for {url}")]
    Transport {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("could not extract `{label}` from {url}")]
    Extraction { label: String, url: String },

    #[error("invalid page label `{label}`")]
    LabelPattern {
        label: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid asset URL prefix `{prefix}`")]
    AssetPattern {
        prefix: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to {action} {}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EnrichError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}
