use std::fs;

use super::annotation::{compress, index};
use super::{ArtifactPaths, Stages};
use crate::browser_config::{annotation_track_id, ConfigFile};
use crate::command::{CommandRunner, Invocation};
use crate::error::{PipelineError, Result, Severity};
use crate::types::Dataset;

/// `jbrowse create` unless the project directory exists, then make sure
/// there is a `config.json`
pub fn setup_project<R: CommandRunner>(stages: &mut Stages<'_, R>) -> Result<ConfigFile> {
    let dir = stages.output_dir().to_path_buf();

    if dir.exists() {
        log::info!("Browser project {} already exists", dir.display());
        stages.skipped();
    } else {
        log::info!("Creating browser project in {}", dir.display());
        let create = Invocation::new(stages.tools().jbrowse.as_str())
            .arg("create")
            .arg(&dir)
            .arg("--force");
        stages.exec(create)?;
        // `create` normally makes it; an empty project is still usable
        fs::create_dir_all(&dir)?;
    }

    let config = ConfigFile::in_project(&dir);
    config.create_if_missing()?;
    Ok(config)
}

/// `jbrowse add-assembly` for a prepared genome, unless already registered.
/// Returns whether anything was added.
pub fn register_assembly<R: CommandRunner>(
    stages: &mut Stages<'_, R>,
    config: &ConfigFile,
    dataset: &Dataset,
    sequence: &ArtifactPaths,
) -> Result<bool> {
    if config.load()?.has_assembly(&dataset.key) {
        log::info!("Assembly for {} is already registered", dataset.name);
        stages.skipped();
        return Ok(false);
    }
    stages.expect_output(&sequence.source)?;

    log::info!("Adding assembly for {}", dataset.name);
    let add = Invocation::new(stages.tools().jbrowse.as_str())
        .arg("add-assembly")
        .arg(&sequence.source)
        .arg("--name")
        .arg(&dataset.key)
        .arg("--out")
        .arg(stages.output_dir())
        .args(["--load", "inPlace", "--force"]);
    stages.exec(add)?;

    config.edit(|doc| Ok(doc.ensure_assembly(&dataset.key, &sequence.source, &sequence.index)))?;
    stages.registered();
    Ok(true)
}

fn add_track<R: CommandRunner>(stages: &mut Stages<'_, R>, assembly: &str, paths: &ArtifactPaths) -> Result<()> {
    let add = Invocation::new(stages.tools().jbrowse.as_str())
        .arg("add-track")
        .arg(&paths.compressed)
        .arg("--out")
        .arg(stages.output_dir())
        .arg("--assemblyNames")
        .arg(assembly)
        .args(["--load", "inPlace", "--force"]);
    stages.exec(add)
}

fn recompress<R: CommandRunner>(stages: &mut Stages<'_, R>, paths: &ArtifactPaths) -> Result<()> {
    compress(stages, paths)?;
    index(stages, paths)
}

/// Register a prepared annotation file as a track on `assembly`.
///
/// A missing `.gz` is rebuilt from the decompressed source first. If the
/// browser CLI then exits with an error, the file is rebuilt and the call
/// retried once; a second failure is fatal, as is a CLI that cannot start.
pub fn register_annotation_track<R: CommandRunner>(
    stages: &mut Stages<'_, R>,
    config: &ConfigFile,
    assembly: &str,
    paths: &ArtifactPaths,
) -> Result<bool> {
    let track_id = annotation_track_id(&paths.compressed);
    if config.load()?.has_track(&track_id) {
        log::info!("Track '{}' is already registered", track_id);
        stages.skipped();
        return Ok(false);
    }

    if !paths.compressed.exists() {
        log::warn!("{} is missing, recreating it", paths.compressed.display());
        recompress(stages, paths).map_err(|e| registration_error(assembly, e))?;
    }

    log::info!("Adding track '{}' on '{}'", track_id, assembly);
    if let Err(first) = add_track(stages, assembly, paths) {
        if first.severity() != Severity::Retryable {
            return Err(registration_error(assembly, first));
        }
        log::warn!("Adding track '{}' failed: {}; retrying with a recreated archive", track_id, first);
        if !paths.source.exists() {
            return Err(PipelineError::TrackRegistration {
                assembly: assembly.to_string(),
                message: format!("{} is missing, cannot retry: {}", paths.source.display(), first),
            });
        }
        recompress(stages, paths)
            .and_then(|_| add_track(stages, assembly, paths))
            .map_err(|e| registration_error(assembly, e))?;
    }

    config.edit(|doc| doc.ensure_annotation_track(assembly, &paths.compressed, &paths.index))?;
    stages.registered();
    Ok(true)
}

fn registration_error(assembly: &str, error: PipelineError) -> PipelineError {
    match error {
        PipelineError::TrackRegistration { .. } => error,
        other => PipelineError::TrackRegistration {
            assembly: assembly.to_string(),
            message: other.to_string(),
        },
    }
}

/// `jbrowse text-index` when something changed or no index exists yet
pub fn text_index<R: CommandRunner>(stages: &mut Stages<'_, R>, changed: bool) -> Result<bool> {
    let trix = stages.output_dir().join("trix");
    if !changed && trix.exists() {
        log::info!("Text index is up to date");
        stages.skipped();
        return Ok(false);
    }

    log::info!("Building text index for gene search");
    let invocation = Invocation::new(stages.tools().jbrowse.as_str())
        .arg("text-index")
        .arg("--out")
        .arg(stages.output_dir());
    stages.exec(invocation)?;
    Ok(true)
}
