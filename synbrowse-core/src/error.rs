//! Error types for the synbrowse pipeline.

use std::path::PathBuf;
use thiserror::Error;

use crate::command::CommandError;
use crate::io::gene_spans::ConvertError;
use crate::io::maf::MafError;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// How the orchestrator treats an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Abort the run.
    Fatal,
    /// One bounded retry is allowed before it becomes fatal.
    Retryable,
    /// Logged and otherwise ignored.
    Swallowed,
}

/// Errors that can occur while preparing browser data.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Required external program is not on PATH
    #[error("Required tool '{0}' was not found on PATH")]
    ToolMissing(String),

    /// External program ran and failed
    #[error(transparent)]
    CommandFailed(#[from] CommandError),

    #[error("Download of {url} failed: {source}")]
    DownloadFailed {
        url: String,
        #[source]
        source: CommandError,
    },

    #[error("{path} is not a valid {format} file: {message}")]
    ValidationFailed {
        path: PathBuf,
        format: &'static str,
        message: String,
    },

    #[error("Sorting {path} failed: {message}")]
    SortFailed { path: PathBuf, message: String },

    /// A stage input that should have been produced earlier is gone
    #[error("Missing artifact: {0}")]
    MissingArtifact(PathBuf),

    #[error("Adding track for '{assembly}' failed: {message}")]
    TrackRegistration { assembly: String, message: String },

    #[error("Track '{track}' references undeclared assembly '{assembly}'")]
    UndeclaredAssembly { track: String, assembly: String },

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Conversion failed: {0}")]
    Convert(#[from] ConvertError),

    #[error("Alignment conversion failed: {0}")]
    Maf(#[from] MafError),

    #[error("Browser configuration {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Classification used by the retry and alignment wrappers.
    ///
    /// A tool that ran and exited non-zero, or an output that went missing,
    /// may succeed once its inputs are rebuilt; anything else will not.
    pub fn severity(&self) -> Severity {
        match self {
            PipelineError::CommandFailed(CommandError::Exit { .. }) | PipelineError::MissingArtifact(_) => {
                Severity::Retryable
            }
            _ => Severity::Fatal,
        }
    }

    /// Name of the tool involved, when there is one
    pub fn tool(&self) -> Option<&str> {
        match self {
            PipelineError::ToolMissing(tool) => Some(tool),
            PipelineError::CommandFailed(e) | PipelineError::DownloadFailed { source: e, .. } => {
                Some(e.program())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity() {
        let missing = PipelineError::MissingArtifact(PathBuf::from("genes.gff.gz"));
        assert_eq!(missing.severity(), Severity::Retryable);

        let tool = PipelineError::ToolMissing("bgzip".to_string());
        assert_eq!(tool.severity(), Severity::Fatal);
        assert_eq!(tool.tool(), Some("bgzip"));

        let exited = PipelineError::CommandFailed(CommandError::Exit {
            program: "jbrowse".to_string(),
            code: Some(1),
            stderr: String::new(),
        });
        assert_eq!(exited.severity(), Severity::Retryable);

        let spawn = PipelineError::CommandFailed(CommandError::Spawn {
            program: "jbrowse".to_string(),
            message: "permission denied".to_string(),
        });
        assert_eq!(spawn.severity(), Severity::Fatal);
    }

    #[test]
    fn test_messages() {
        let err = PipelineError::UndeclaredAssembly {
            track: "mers_vs_sars-synteny".to_string(),
            assembly: "sars".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Track 'mers_vs_sars-synteny' references undeclared assembly 'sars'"
        );
    }
}
