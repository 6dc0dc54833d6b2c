//! Idempotent artifact pipeline
//!
//! Each stage looks at the filesystem before acting, so an interrupted run
//! resumes from the last complete artifact and a finished one is a no-op.
//! All external programs go through a [`CommandRunner`].

pub mod annotation;
pub mod artifact;
pub mod registration;
pub mod sequence;

use std::fs;
use std::path::{Path, PathBuf};

use crate::command::{partial_path, CommandRunner, Invocation};
use crate::error::{PipelineError, Result};
use crate::settings::{Downloader, Toolchain};

pub use annotation::{prepare_annotation, prepare_gene_spans};
pub use artifact::{ArtifactKind, ArtifactPaths, ArtifactState};
pub use registration::{register_annotation_track, register_assembly, setup_project, text_index};
pub use sequence::prepare_sequence;

/// Counters reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageStats {
    /// External programs started
    pub invocations: usize,
    /// Stages skipped because their output already existed
    pub skipped: usize,
    /// Assemblies and tracks added to the browser configuration
    pub registered: usize,
}

/// Shared context for running stages in one output directory
pub struct Stages<'a, R: CommandRunner> {
    runner: R,
    tools: &'a Toolchain,
    output_dir: PathBuf,
    stats: StageStats,
}

impl<'a, R: CommandRunner> Stages<'a, R> {
    pub fn new(runner: R, tools: &'a Toolchain, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            tools,
            output_dir: output_dir.into(),
            stats: StageStats::default(),
        }
    }

    pub fn tools(&self) -> &Toolchain {
        self.tools
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn stats(&self) -> StageStats {
        self.stats
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub(crate) fn skipped(&mut self) {
        self.stats.skipped += 1;
    }

    pub(crate) fn registered(&mut self) {
        self.stats.registered += 1;
    }

    /// Run one external program to completion
    pub fn exec(&mut self, invocation: Invocation) -> Result<()> {
        self.stats.invocations += 1;
        log::debug!("$ {}", invocation);
        self.runner.run(&invocation)?;
        Ok(())
    }

    /// Fetch `url` into `dest`; nothing appears at `dest` unless the transfer succeeds
    pub fn download(&mut self, url: &str, dest: &Path) -> Result<()> {
        let partial = partial_path(dest);
        let downloader = self.tools.downloader;
        let invocation = Invocation::new(downloader.program());
        let invocation = match downloader {
            Downloader::Wget => invocation.arg(url).arg("-O").arg(&partial),
            Downloader::Curl => invocation.arg("-fsSL").arg("-o").arg(&partial).arg(url),
        };

        log::info!("Downloading {} to {}", url, dest.display());
        self.stats.invocations += 1;
        if let Err(source) = self.runner.run(&invocation) {
            let _ = fs::remove_file(&partial);
            return Err(PipelineError::DownloadFailed {
                url: url.to_string(),
                source,
            });
        }
        fs::rename(&partial, dest)?;
        Ok(())
    }

    /// `path` must exist after the stage that was supposed to produce it
    pub fn expect_output(&self, path: &Path) -> Result<()> {
        if path.exists() {
            Ok(())
        } else {
            Err(PipelineError::MissingArtifact(path.to_path_buf()))
        }
    }
}
