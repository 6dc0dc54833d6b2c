//! synbrowse core library
//!
//! Artifact pipeline, MAF/FASTA converters, JBrowse 2 configuration
//! synthesis and the run orchestrator.

pub mod alignment;
pub mod browser_config;
pub mod command;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod settings;
pub mod types;
pub mod workflow;

// Re-export commonly used types and functions
pub use browser_config::{BrowserConfig, ConfigFile, Plugin};
pub use command::{CommandError, CommandRunner, Invocation, SystemRunner};
pub use error::{PipelineError, Result, Severity};
pub use io as formats;
pub use settings::{AlignmentFailurePolicy, AlignmentSettings, Downloader, RunSettings, Toolchain};
pub use types::{Dataset, GeneSpanSource, Strand};
pub use workflow::{purge_output, Orchestrator, RunSummary};

/// Version information for the synbrowse core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
