use super::{ArtifactPaths, ArtifactState, Stages};
use crate::command::{CommandRunner, Invocation};
use crate::error::Result;
use crate::types::Dataset;

/// Download, decompress and `samtools faidx` a genome.
///
/// There is no content check; whatever gunzip produces goes to samtools.
///
/// Resumes from whatever is already on disk; an existing `.fai` skips the
/// whole pipeline.
pub fn prepare_sequence<R: CommandRunner>(stages: &mut Stages<'_, R>, dataset: &Dataset) -> Result<ArtifactPaths> {
    let paths = ArtifactPaths::sequence(stages.output_dir(), dataset);
    let state = paths.state();

    if state == ArtifactState::Indexed {
        log::info!("{} genome is already prepared, skipping", dataset.name);
        stages.skipped();
        return Ok(paths);
    }
    log::info!("Preparing {} genome (currently {})", dataset.name, state);

    if state < ArtifactState::Downloaded {
        stages.download(&dataset.genome_url, &paths.compressed)?;
    }

    if state < ArtifactState::Decompressed {
        let gunzip = Invocation::new(stages.tools().gunzip.as_str())
            .arg("-f")
            .arg(&paths.compressed);
        stages.exec(gunzip)?;
        stages.expect_output(&paths.source)?;
    }

    let faidx = Invocation::new(stages.tools().samtools.as_str())
        .arg("faidx")
        .arg(&paths.source);
    stages.exec(faidx)?;
    stages.expect_output(&paths.index)?;

    log::info!("{} genome indexed at {}", dataset.name, paths.index.display());
    Ok(paths)
}
