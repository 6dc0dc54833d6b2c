//! End-to-end run: project setup, per-dataset pipelines, alignment, and
//! final configuration cleanup.

use std::fs;
use std::path::Path;

use crate::alignment::{align_datasets, apply_policy, AlignmentRunStats, LastAligner, LastParams};
use crate::browser_config::paths::absolute;
use crate::browser_config::ConfigFile;
use crate::command::CommandRunner;
use crate::error::{PipelineError, Result};
use crate::pipeline::{
    prepare_annotation, prepare_gene_spans, prepare_sequence, register_annotation_track, register_assembly,
    setup_project, text_index, StageStats, Stages,
};
use crate::settings::RunSettings;
use crate::types::Dataset;

/// What a run did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub datasets: usize,
    pub stages: StageStats,
    /// `None` when alignment is disabled or its failure was swallowed
    pub alignment: Option<AlignmentRunStats>,
    pub text_indexed: bool,
}

pub struct Orchestrator<R: CommandRunner> {
    settings: RunSettings,
    runner: R,
}

impl<R: CommandRunner> Orchestrator<R> {
    pub fn new(settings: RunSettings, runner: R) -> Self {
        Self { settings, runner }
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Fail fast on anything missing from PATH
    pub fn check_tools(&self) -> Result<()> {
        let required = self.settings.tools.required(self.settings.alignment.enabled);
        for tool in required {
            if self.runner.is_available(tool) {
                log::debug!("Checking availability of {}... OK", tool);
            } else {
                return Err(PipelineError::ToolMissing(tool.to_string()));
            }
        }
        Ok(())
    }

    pub fn run(&self) -> Result<RunSummary> {
        self.settings.validate()?;
        self.check_tools()?;

        let settings = &self.settings;
        // locations written into the document are absolute until normalized
        let output_dir = absolute(&settings.output_dir)?;
        let mut stages = Stages::new(&self.runner, &settings.tools, output_dir.clone());
        let config = setup_project(&mut stages)?;

        for dataset in &settings.datasets {
            self.process_dataset(&mut stages, &config, dataset)?;
        }

        let alignment = if settings.alignment.enabled {
            self.align(&mut stages, &config)?
        } else {
            log::info!("Alignment step disabled");
            None
        };

        let changed = stages.stats().registered > 0;
        let text_indexed = text_index(&mut stages, changed)?;

        let plugins = settings.plugins.clone();
        config.edit(|doc| {
            doc.normalize_paths(&output_dir)?;
            doc.set_plugins(plugins);
            Ok(())
        })?;
        log::info!("Normalized paths and plugins in {}", config.path().display());

        let summary = RunSummary {
            datasets: settings.datasets.len(),
            stages: stages.stats(),
            alignment,
            text_indexed,
        };
        log::info!(
            "All tasks completed: {} datasets, {} commands run, {} stages skipped, {} entries registered",
            summary.datasets,
            summary.stages.invocations,
            summary.stages.skipped,
            summary.stages.registered
        );
        Ok(summary)
    }

    fn process_dataset(&self, stages: &mut Stages<'_, &R>, config: &ConfigFile, dataset: &Dataset) -> Result<()> {
        log::info!("Processing {}", dataset.name);

        let sequence = prepare_sequence(stages, dataset)?;
        register_assembly(stages, config, dataset, &sequence)?;

        let annotation = prepare_annotation(stages, dataset)?;
        register_annotation_track(stages, config, &dataset.key, &annotation)?;

        if let Some(spans) = &dataset.gene_spans {
            if let Some(paths) = prepare_gene_spans(stages, dataset, spans)? {
                register_annotation_track(stages, config, &dataset.key, &paths)?;
            }
        }
        Ok(())
    }

    fn align(&self, stages: &mut Stages<'_, &R>, config: &ConfigFile) -> Result<Option<AlignmentRunStats>> {
        let settings = &self.settings.alignment;
        let (Some(reference), Some(query)) = (
            self.settings.dataset(&settings.reference),
            self.settings.dataset(&settings.query),
        ) else {
            return Err(PipelineError::InvalidDataset(format!(
                "alignment datasets '{}' and '{}' are not both configured",
                settings.reference, settings.query
            )));
        };

        let aligner = LastAligner::new(
            stages.output_dir().join(&settings.database),
            LastParams::viral(settings.threads).with_custom_args(&settings.lastal_args),
        );
        let outcome = align_datasets(stages, config, &aligner, settings, reference, query);
        apply_policy(settings.on_error, outcome)
    }
}

/// Remove everything a previous run produced
pub fn purge_output(output_dir: &Path) -> Result<bool> {
    if !output_dir.exists() {
        log::info!("Nothing to clean at {}", output_dir.display());
        return Ok(false);
    }
    log::info!("Removing existing directory: {}", output_dir.display());
    fs::remove_dir_all(output_dir)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandError, Invocation};
    use tempfile::TempDir;

    struct NoTools;

    impl CommandRunner for NoTools {
        fn run(&self, invocation: &Invocation) -> std::result::Result<(), CommandError> {
            panic!("unexpected invocation: {}", invocation);
        }

        fn is_available(&self, _program: &str) -> bool {
            false
        }
    }

    #[test]
    fn test_missing_tool_is_fatal_before_any_work() {
        let dir = TempDir::new().unwrap();
        let settings = RunSettings {
            output_dir: dir.path().join("jbrowse2"),
            ..RunSettings::default()
        };

        let err = Orchestrator::new(settings, NoTools).run().unwrap_err();
        assert!(matches!(err, PipelineError::ToolMissing(_)));
        assert!(!dir.path().join("jbrowse2").exists());
    }

    #[test]
    fn test_invalid_settings_rejected_first() {
        let mut settings = RunSettings::default();
        settings.datasets.clear();
        let err = Orchestrator::new(settings, NoTools).run().unwrap_err();
        assert!(matches!(err, PipelineError::InvalidDataset(_)));
    }

    #[test]
    fn test_purge_output() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("jbrowse2");
        assert!(!purge_output(&out).unwrap());

        fs::create_dir_all(out.join("trix")).unwrap();
        assert!(purge_output(&out).unwrap());
        assert!(!out.exists());
    }
}
