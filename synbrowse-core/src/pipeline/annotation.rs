use std::fs;
use std::path::PathBuf;

use super::{ArtifactPaths, ArtifactState, Stages};
use crate::command::{CommandRunner, Invocation};
use crate::error::{PipelineError, Result};
use crate::io::gene_spans::convert_fasta_to_gff;
use crate::types::{Dataset, GeneSpanSource};

/// Download, validate, decompress, sort, bgzip and tabix an annotation file
pub fn prepare_annotation<R: CommandRunner>(stages: &mut Stages<'_, R>, dataset: &Dataset) -> Result<ArtifactPaths> {
    let paths = ArtifactPaths::annotation(stages.output_dir(), &dataset.annotation_file);
    let state = paths.state();

    if state == ArtifactState::Indexed {
        log::info!("{} annotations are already prepared, skipping", dataset.name);
        stages.skipped();
        return Ok(paths);
    }
    log::info!("Preparing {} annotations (currently {})", dataset.name, state);

    if state < ArtifactState::Downloaded {
        stages.download(&dataset.annotation_url, &paths.compressed)?;
    }

    let state = if state < ArtifactState::Decompressed {
        paths.validate_download()?;
        log::info!("{} is a valid gzipped GFF3 file", paths.compressed.display());
        let gunzip = Invocation::new(stages.tools().gunzip.as_str())
            .arg("-f")
            .arg(&paths.compressed);
        stages.exec(gunzip)?;
        stages.expect_output(&paths.source)?;
        ArtifactState::Decompressed
    } else {
        state
    };

    finish(stages, &paths, state)?;
    log::info!("{} annotations indexed at {}", dataset.name, paths.index.display());
    Ok(paths)
}

/// Convert a local FASTA into a pseudo-GFF3 gene track and index it.
///
/// Returns `None` when the FASTA is not there; the gene-span track is optional.
pub fn prepare_gene_spans<R: CommandRunner>(
    stages: &mut Stages<'_, R>,
    dataset: &Dataset,
    spans: &GeneSpanSource,
) -> Result<Option<ArtifactPaths>> {
    let paths = ArtifactPaths::annotation(stages.output_dir(), &spans.gff);
    let state = paths.state();

    if state == ArtifactState::Indexed {
        log::info!("{} gene spans are already prepared, skipping", dataset.name);
        stages.skipped();
        return Ok(Some(paths));
    }

    let state = if state == ArtifactState::Absent {
        let fasta = gene_span_fasta(stages, spans);
        if !fasta.exists() {
            log::info!(
                "No gene span FASTA for {} at {}, skipping that track",
                dataset.name,
                fasta.display()
            );
            return Ok(None);
        }
        convert_fasta_to_gff(&fasta, &paths.source, spans.header)?;
        ArtifactState::Decompressed
    } else if state == ArtifactState::Downloaded {
        // only the compressed copy survived
        paths.validate_download()?;
        let gunzip = Invocation::new(stages.tools().gunzip.as_str())
            .arg("-f")
            .arg(&paths.compressed);
        stages.exec(gunzip)?;
        ArtifactState::Decompressed
    } else {
        state
    };

    finish(stages, &paths, state)?;
    Ok(Some(paths))
}

fn gene_span_fasta<R: CommandRunner>(stages: &Stages<'_, R>, spans: &GeneSpanSource) -> PathBuf {
    if spans.fasta.is_absolute() {
        spans.fasta.clone()
    } else {
        stages.output_dir().join(&spans.fasta)
    }
}

/// Run the stages after `state` up to `Indexed`
fn finish<R: CommandRunner>(stages: &mut Stages<'_, R>, paths: &ArtifactPaths, state: ArtifactState) -> Result<()> {
    if state < ArtifactState::Compressed {
        sort(stages, paths)?;
        compress(stages, paths)?;
    }
    index(stages, paths)
}

/// `LC_ALL=C sort -k1,1 -k4,4n` in place
pub(crate) fn sort<R: CommandRunner>(stages: &mut Stages<'_, R>, paths: &ArtifactPaths) -> Result<()> {
    let sorted = paths.sorted();
    let invocation = Invocation::new(stages.tools().sort.as_str())
        .env("LC_ALL", "C")
        .args(["-k1,1", "-k4,4n"])
        .arg(&paths.source)
        .stdout_to(&sorted);

    log::info!("Sorting {}", paths.source.display());
    stages.exec(invocation).map_err(|e| PipelineError::SortFailed {
        path: paths.source.clone(),
        message: e.to_string(),
    })?;
    fs::rename(&sorted, &paths.source).map_err(|e| PipelineError::SortFailed {
        path: paths.source.clone(),
        message: e.to_string(),
    })
}

/// `bgzip -c <gff> > <gff>.gz`, keeping the source for later recompression
pub(crate) fn compress<R: CommandRunner>(stages: &mut Stages<'_, R>, paths: &ArtifactPaths) -> Result<()> {
    if !paths.source.exists() {
        return Err(PipelineError::MissingArtifact(paths.source.clone()));
    }
    let invocation = Invocation::new(stages.tools().bgzip.as_str())
        .arg("-c")
        .arg(&paths.source)
        .stdout_to(&paths.compressed);

    log::info!("Compressing {} with BGZF", paths.source.display());
    stages.exec(invocation)?;
    stages.expect_output(&paths.compressed)
}

/// `tabix -f -p gff <gff>.gz`
pub(crate) fn index<R: CommandRunner>(stages: &mut Stages<'_, R>, paths: &ArtifactPaths) -> Result<()> {
    let invocation = Invocation::new(stages.tools().tabix.as_str())
        .args(["-f", "-p", "gff"])
        .arg(&paths.compressed);

    log::info!("Indexing {}", paths.compressed.display());
    stages.exec(invocation)?;
    stages.expect_output(&paths.index)
}
