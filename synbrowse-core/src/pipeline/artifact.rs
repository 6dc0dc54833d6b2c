use flate2::read::MultiGzDecoder;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::types::Dataset;

/// Where a file is in its download-to-index lifecycle.
///
/// `Validated` and `Sorted` leave nothing distinct on disk; detection never
/// reports them and the stages that produce them always run from the state
/// before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArtifactState {
    Absent,
    Downloaded,
    Validated,
    Decompressed,
    Sorted,
    Compressed,
    Indexed,
}

impl fmt::Display for ArtifactState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactState::Absent => "absent",
            ArtifactState::Downloaded => "downloaded",
            ArtifactState::Validated => "validated",
            ArtifactState::Decompressed => "decompressed",
            ArtifactState::Sorted => "sorted",
            ArtifactState::Compressed => "compressed",
            ArtifactState::Indexed => "indexed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// `<key>.fa.gz` → `<key>.fa` → `<key>.fa.fai`
    Sequence,
    /// `<gff>.gz` → `<gff>` → `<gff>.gz` (bgzip) → `<gff>.gz.tbi`
    Annotation,
}

impl ArtifactKind {
    /// Format name and expected first-line prefix of the decompressed download.
    /// Genomes go straight from download to decompression and have none.
    pub fn signature(self) -> Option<(&'static str, &'static str)> {
        match self {
            ArtifactKind::Sequence => None,
            ArtifactKind::Annotation => Some(("GFF3", "##gff-version")),
        }
    }
}

/// The files one pipeline run reads and writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub kind: ArtifactKind,
    /// Decompressed file
    pub source: PathBuf,
    /// Downloaded or bgzip-compressed file
    pub compressed: PathBuf,
    /// Final artifact (`.fai` or `.tbi`)
    pub index: PathBuf,
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

impl ArtifactPaths {
    pub fn sequence(output_dir: &Path, dataset: &Dataset) -> Self {
        let source = output_dir.join(dataset.sequence_file());
        Self {
            kind: ArtifactKind::Sequence,
            compressed: with_suffix(&source, ".gz"),
            index: with_suffix(&source, ".fai"),
            source,
        }
    }

    pub fn annotation(output_dir: &Path, file_name: &str) -> Self {
        let source = output_dir.join(file_name);
        let compressed = with_suffix(&source, ".gz");
        Self {
            kind: ArtifactKind::Annotation,
            index: with_suffix(&compressed, ".tbi"),
            compressed,
            source,
        }
    }

    /// Scratch output of the sort stage
    pub fn sorted(&self) -> PathBuf {
        with_suffix(&self.source, ".sorted")
    }

    pub fn state(&self) -> ArtifactState {
        match self.kind {
            ArtifactKind::Sequence => {
                if self.index.exists() {
                    ArtifactState::Indexed
                } else if self.source.exists() {
                    ArtifactState::Decompressed
                } else if self.compressed.exists() {
                    ArtifactState::Downloaded
                } else {
                    ArtifactState::Absent
                }
            }
            ArtifactKind::Annotation => {
                match (self.index.exists(), self.compressed.exists(), self.source.exists()) {
                    (true, _, _) => ArtifactState::Indexed,
                    (false, true, true) => ArtifactState::Compressed,
                    (false, true, false) => ArtifactState::Downloaded,
                    (false, false, true) => ArtifactState::Decompressed,
                    (false, false, false) => ArtifactState::Absent,
                }
            }
        }
    }

    /// Check that the downloaded `.gz` decompresses to the expected format
    pub fn validate_download(&self) -> Result<()> {
        let Some((format, prefix)) = self.kind.signature() else {
            return Ok(());
        };
        let invalid = |message: String| PipelineError::ValidationFailed {
            path: self.compressed.clone(),
            format,
            message,
        };

        let file = File::open(&self.compressed)?;
        let mut reader = BufReader::new(MultiGzDecoder::new(file));
        let mut first_line = String::new();
        reader
            .read_line(&mut first_line)
            .map_err(|e| invalid(format!("cannot decompress: {}", e)))?;

        if first_line.trim_start().starts_with(prefix) {
            log::debug!("{} is a gzipped {} file", self.compressed.display(), format);
            Ok(())
        } else {
            Err(invalid(format!(
                "first line {:?} does not start with {:?}",
                first_line.trim_end(),
                prefix
            )))
        }
    }
}
