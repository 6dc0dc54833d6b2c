//! Error handling for the synbrowse CLI

use std::path::PathBuf;
use synbrowse_core::PipelineError;
use thiserror::Error;

/// Main error type for synbrowse CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Input/Output error: {message}")]
    Io { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("Required tool not found: {tool}")]
    MissingTool { tool: String },

    #[error("External tool error: {tool} - {message}")]
    ExternalTool { tool: String, message: String },

    #[error("Browser configuration error: {message}")]
    BrowserConfig { message: String },

    #[error("Pipeline error: {message}")]
    Pipeline { message: String },
}

impl CliError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io { message: message.into() }
    }

    pub fn file_not_found(path: PathBuf) -> Self {
        Self::FileNotFound { path }
    }

    pub fn invalid_format<S: Into<String>>(message: S) -> Self {
        Self::InvalidFormat { message: message.into() }
    }

    pub fn external_tool<S: Into<String>>(tool: S, message: S) -> Self {
        Self::ExternalTool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn browser_config<S: Into<String>>(message: S) -> Self {
        Self::BrowserConfig { message: message.into() }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<toml::ser::Error> for CliError {
    fn from(err: toml::ser::Error) -> Self {
        Self::config(format!("TOML serialization error: {}", err))
    }
}

impl From<PipelineError> for CliError {
    fn from(err: PipelineError) -> Self {
        let message = err.to_string();
        match err {
            PipelineError::ToolMissing(tool) => Self::MissingTool { tool },
            PipelineError::CommandFailed(ref e) | PipelineError::DownloadFailed { source: ref e, .. } => {
                Self::external_tool(e.program().to_string(), message)
            }
            PipelineError::ValidationFailed { .. } | PipelineError::Convert(_) | PipelineError::Maf(_) => {
                Self::invalid_format(message)
            }
            PipelineError::MissingArtifact(path) => Self::file_not_found(path),
            PipelineError::InvalidDataset(_) => Self::config(message),
            PipelineError::TrackRegistration { .. }
            | PipelineError::UndeclaredAssembly { .. }
            | PipelineError::Config { .. } => Self::browser_config(message),
            PipelineError::Io(_) => Self::io(message),
            PipelineError::SortFailed { .. } => Self::Pipeline { message },
        }
    }
}

fn install_hint(tool: &str) -> &'static str {
    match tool {
        "jbrowse" => "Install the JBrowse CLI: npm install -g @jbrowse/cli",
        "lastdb" | "lastal" => "Install LAST: https://gitlab.com/mcfrith/last (Debian/Ubuntu: apt install last-align)",
        "samtools" => "Install samtools: https://www.htslib.org/download/",
        "bgzip" | "tabix" => "Install htslib, which provides bgzip and tabix: https://www.htslib.org/download/",
        "wget" | "curl" => "Install wget, or set `downloader = \"curl\"` under [tools] in synbrowse.toml",
        _ => "Install it with your system package manager",
    }
}

/// Provide helpful error messages and suggestions
pub fn format_error_with_suggestions(error: &CliError) -> String {
    let mut message = error.to_string();

    match error {
        CliError::MissingTool { tool } => {
            message.push_str(&format!(
                "\n\nSuggestions:\n\
                 • {}\n\
                 • Ensure {} is in your PATH\n\
                 • Point [tools] in synbrowse.toml at a differently named binary",
                install_hint(tool),
                tool
            ));
        }

        CliError::ExternalTool { tool, .. } => {
            message.push_str(&format!(
                "\n\nSuggestions:\n\
                 • Run again with -v to see the exact {} command line\n\
                 • Check network access if this was a download\n\
                 • Re-running resumes from the last completed step",
                tool
            ));
        }

        CliError::FileNotFound { path } => {
            message.push_str(&format!(
                "\n\nSuggestions:\n\
                 • An earlier step should have produced {}\n\
                 • Run with --clean to rebuild the output directory from scratch",
                path.display()
            ));
        }

        CliError::InvalidFormat { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Check that the dataset URLs point at gzipped FASTA / GFF3 files\n\
                 • Delete the offending file so it is downloaded again",
            );
        }

        CliError::Config { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Check your synbrowse.toml configuration file\n\
                 • Use 'synbrowse --example-config' to generate a sample configuration\n\
                 • Dataset keys may only contain letters, digits, '_', '-' and '.'",
            );
        }

        CliError::BrowserConfig { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Check that config.json in the output directory is valid JSON\n\
                 • Run with --clean to regenerate the browser project",
            );
        }

        _ => {}
    }

    message
}

/// Print error with helpful suggestions and exit
pub fn print_error_and_exit(error: &CliError) -> ! {
    eprintln!("Error: {}", format_error_with_suggestions(error));
    std::process::exit(1);
}
