use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::browser_config::ConfigFile;
use crate::command::{CommandRunner, Invocation};
use crate::error::{PipelineError, Result, Severity};
use crate::io::{maf_to_paf, read_paf};
use crate::pipeline::Stages;
use crate::settings::{AlignmentFailurePolicy, AlignmentSettings};
use crate::types::{Dataset, Strand};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastParams {
    pub max_initial_matches: u32, // -m
    pub max_eg2: f64,             // -E, expected alignments per square giga
    pub threads: usize,           // -P
    pub custom_args: Vec<String>,
}

impl LastParams {
    /// Settings for small, related viral genomes
    pub fn viral(threads: usize) -> Self {
        Self {
            max_initial_matches: 100,
            max_eg2: 0.05,
            threads,
            custom_args: Vec::new(),
        }
    }

    pub fn with_custom_args(mut self, args: &[String]) -> Self {
        self.custom_args.extend(args.iter().cloned());
        self
    }

    pub fn to_lastal_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("-m{}", self.max_initial_matches),
            format!("-E{}", self.max_eg2),
            format!("-P{}", self.threads),
        ];
        args.extend(self.custom_args.iter().cloned());
        args
    }
}

/// Produces a MAF alignment of `query` against `reference`
pub trait Aligner {
    fn align<R: CommandRunner>(
        &self,
        stages: &mut Stages<'_, R>,
        reference: &Path,
        query: &Path,
        output: &Path,
    ) -> Result<()>;

    fn name(&self) -> &'static str;
}

pub struct LastAligner {
    database: PathBuf,
    params: LastParams,
}

impl LastAligner {
    pub fn new(database: impl Into<PathBuf>, params: LastParams) -> Self {
        Self {
            database: database.into(),
            params,
        }
    }

    /// lastdb writes several files; `<db>.prj` is the one that marks it complete
    pub fn database_marker(&self) -> PathBuf {
        let mut name = self.database.as_os_str().to_os_string();
        name.push(".prj");
        PathBuf::from(name)
    }
}

impl Aligner for LastAligner {
    fn align<R: CommandRunner>(
        &self,
        stages: &mut Stages<'_, R>,
        reference: &Path,
        query: &Path,
        output: &Path,
    ) -> Result<()> {
        if self.database_marker().exists() {
            log::info!("LAST database {} already exists", self.database.display());
            stages.skipped();
        } else {
            log::info!("Creating LAST database {} from {}", self.database.display(), reference.display());
            let lastdb = Invocation::new(stages.tools().lastdb.as_str())
                .arg(&self.database)
                .arg(reference);
            stages.exec(lastdb)?;
        }

        if output.exists() {
            log::info!("Alignment {} already exists", output.display());
            stages.skipped();
            return Ok(());
        }

        log::info!("Running alignment: {} against {}", query.display(), reference.display());
        let lastal = Invocation::new(stages.tools().lastal.as_str())
            .args(self.params.to_lastal_args())
            .arg(&self.database)
            .arg(query)
            .stdout_to(output);
        stages.exec(lastal)?;
        stages.expect_output(output)
    }

    fn name(&self) -> &'static str {
        "last"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentRunStats {
    pub total_records: u64,
    pub total_aligned_bases: u64,
    pub strand_forward_count: u64,
    pub strand_reverse_count: u64,
}

fn calculate_paf_stats(paf_path: &Path) -> Result<AlignmentRunStats> {
    let records = read_paf(paf_path).map_err(|e| PipelineError::ValidationFailed {
        path: paf_path.to_path_buf(),
        format: "PAF",
        message: e.to_string(),
    })?;

    let mut stats = AlignmentRunStats::default();
    for record in &records {
        stats.total_records += 1;
        stats.total_aligned_bases += record.alignment_block_length;
        match record.strand {
            Strand::Forward => stats.strand_forward_count += 1,
            Strand::Reverse => stats.strand_reverse_count += 1,
        }
    }
    Ok(stats)
}

/// Align `query` to `reference`, convert to PAF and register the synteny track
pub fn align_datasets<R: CommandRunner, A: Aligner>(
    stages: &mut Stages<'_, R>,
    config: &ConfigFile,
    aligner: &A,
    settings: &AlignmentSettings,
    reference: &Dataset,
    query: &Dataset,
) -> Result<AlignmentRunStats> {
    let dir = stages.output_dir().to_path_buf();
    let reference_fa = dir.join(reference.sequence_file());
    let query_fa = dir.join(query.sequence_file());
    let maf = dir.join(&settings.maf);
    let paf = dir.join(&settings.paf);

    stages.expect_output(&reference_fa)?;
    stages.expect_output(&query_fa)?;

    aligner.align(stages, &reference_fa, &query_fa, &maf)?;

    if paf.exists() {
        log::info!("{} already exists, skipping conversion", paf.display());
        stages.skipped();
    } else {
        let report = maf_to_paf(&maf, &paf)?;
        if report.records == 0 {
            log::warn!("{} produced no alignment records", maf.display());
        }
    }

    let stats = calculate_paf_stats(&paf)?;
    log::info!(
        "{} alignment: {} records, {} aligned bases ({} forward, {} reverse)",
        aligner.name(),
        stats.total_records,
        stats.total_aligned_bases,
        stats.strand_forward_count,
        stats.strand_reverse_count
    );

    // lastal prints the database sequence first, so the reference fills the PAF query columns
    let added = config.edit(|doc| doc.ensure_synteny_track([reference.key.as_str(), query.key.as_str()], &paf))?;
    if added {
        stages.registered();
    } else {
        stages.skipped();
    }
    Ok(stats)
}

/// Apply the configured failure policy to the outcome of the alignment step.
/// `Ok(None)` means the failure was logged and swallowed.
pub fn apply_policy(
    policy: AlignmentFailurePolicy,
    outcome: Result<AlignmentRunStats>,
) -> Result<Option<AlignmentRunStats>> {
    match outcome {
        Ok(stats) => Ok(Some(stats)),
        Err(e) => match handling(policy, &e) {
            Severity::Swallowed => {
                log::warn!("Alignment step failed, continuing without synteny track: {}", e);
                Ok(None)
            }
            _ => Err(e),
        },
    }
}

fn handling(policy: AlignmentFailurePolicy, error: &PipelineError) -> Severity {
    match policy {
        AlignmentFailurePolicy::Abort => error.severity(),
        AlignmentFailurePolicy::Warn => Severity::Swallowed,
    }
}
