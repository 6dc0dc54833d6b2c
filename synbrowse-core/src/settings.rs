//! Run settings
//!
//! Everything the orchestrator needs is passed in through [`RunSettings`];
//! there is no module-level dataset table. Defaults reproduce the MERS /
//! SARS-CoV-2 comparison.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::browser_config::Plugin;
use crate::error::{PipelineError, Result};
use crate::types::Dataset;

/// Program used to fetch remote files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Downloader {
    #[default]
    Wget,
    Curl,
}

impl Downloader {
    pub fn program(self) -> &'static str {
        match self {
            Downloader::Wget => "wget",
            Downloader::Curl => "curl",
        }
    }
}

/// Names of the external programs, overridable for non-standard installs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toolchain {
    #[serde(default)]
    pub downloader: Downloader,
    #[serde(default = "default_gunzip")]
    pub gunzip: String,
    #[serde(default = "default_sort")]
    pub sort: String,
    #[serde(default = "default_bgzip")]
    pub bgzip: String,
    #[serde(default = "default_tabix")]
    pub tabix: String,
    #[serde(default = "default_samtools")]
    pub samtools: String,
    #[serde(default = "default_lastdb")]
    pub lastdb: String,
    #[serde(default = "default_lastal")]
    pub lastal: String,
    #[serde(default = "default_jbrowse")]
    pub jbrowse: String,
}

fn default_gunzip() -> String { "gunzip".to_string() }
fn default_sort() -> String { "sort".to_string() }
fn default_bgzip() -> String { "bgzip".to_string() }
fn default_tabix() -> String { "tabix".to_string() }
fn default_samtools() -> String { "samtools".to_string() }
fn default_lastdb() -> String { "lastdb".to_string() }
fn default_lastal() -> String { "lastal".to_string() }
fn default_jbrowse() -> String { "jbrowse".to_string() }

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            downloader: Downloader::default(),
            gunzip: default_gunzip(),
            sort: default_sort(),
            bgzip: default_bgzip(),
            tabix: default_tabix(),
            samtools: default_samtools(),
            lastdb: default_lastdb(),
            lastal: default_lastal(),
            jbrowse: default_jbrowse(),
        }
    }
}

impl Toolchain {
    /// Programs that must be on PATH before a run starts
    pub fn required(&self, with_alignment: bool) -> Vec<&str> {
        let mut tools = vec![
            self.downloader.program(),
            self.gunzip.as_str(),
            self.sort.as_str(),
            self.bgzip.as_str(),
            self.tabix.as_str(),
            self.samtools.as_str(),
            self.jbrowse.as_str(),
        ];
        if with_alignment {
            tools.push(self.lastdb.as_str());
            tools.push(self.lastal.as_str());
        }
        tools
    }
}

/// What happens when the alignment step fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentFailurePolicy {
    /// Fail the run like any other stage
    #[default]
    Abort,
    /// Log the error and finish the run without a synteny track
    Warn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Dataset key whose sequence becomes the LAST database
    #[serde(default = "default_reference")]
    pub reference: String,
    /// Dataset key aligned against the database
    #[serde(default = "default_query")]
    pub query: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_maf")]
    pub maf: String,
    #[serde(default = "default_paf")]
    pub paf: String,
    #[serde(default = "default_threads")]
    pub threads: usize,
    #[serde(default)]
    pub on_error: AlignmentFailurePolicy,
    /// Appended to the lastal command line after the built-in options
    #[serde(default)]
    pub lastal_args: Vec<String>,
}

fn default_true() -> bool { true }
fn default_reference() -> String { "mers".to_string() }
fn default_query() -> String { "sars_cov_2".to_string() }
fn default_database() -> String { "mers_db".to_string() }
fn default_maf() -> String { "sars_mers.maf".to_string() }
fn default_paf() -> String { "mers_sars.paf".to_string() }
fn default_threads() -> usize { 4 }

impl Default for AlignmentSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            reference: default_reference(),
            query: default_query(),
            database: default_database(),
            maf: default_maf(),
            paf: default_paf(),
            threads: default_threads(),
            on_error: AlignmentFailurePolicy::default(),
            lastal_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    /// Browser project directory; every artifact is written here
    pub output_dir: PathBuf,
    /// Processed in order, one at a time
    pub datasets: Vec<Dataset>,
    pub tools: Toolchain,
    pub alignment: AlignmentSettings,
    /// Replaces the document's plugin list at the end of a run
    pub plugins: Vec<Plugin>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("jbrowse2"),
            datasets: vec![Dataset::sars_cov_2(), Dataset::mers()],
            tools: Toolchain::default(),
            alignment: AlignmentSettings::default(),
            plugins: vec![Plugin::protein3d()],
        }
    }
}

impl RunSettings {
    pub fn dataset(&self, key: &str) -> Option<&Dataset> {
        self.datasets.iter().find(|d| d.key == key)
    }

    pub fn validate(&self) -> Result<()> {
        if self.datasets.is_empty() {
            return Err(PipelineError::InvalidDataset("no datasets configured".to_string()));
        }

        let mut keys = HashSet::new();
        for dataset in &self.datasets {
            dataset.validate().map_err(PipelineError::InvalidDataset)?;
            if !keys.insert(dataset.key.as_str()) {
                return Err(PipelineError::InvalidDataset(format!(
                    "dataset key '{}' is used more than once",
                    dataset.key
                )));
            }
        }

        if self.alignment.enabled {
            let alignment = &self.alignment;
            for key in [&alignment.reference, &alignment.query] {
                if self.dataset(key).is_none() {
                    return Err(PipelineError::InvalidDataset(format!(
                        "alignment refers to unknown dataset '{}'",
                        key
                    )));
                }
            }
            if alignment.reference == alignment.query {
                return Err(PipelineError::InvalidDataset(
                    "alignment reference and query must be different datasets".to_string(),
                ));
            }
            if alignment.threads == 0 {
                return Err(PipelineError::InvalidDataset("alignment threads must be at least 1".to_string()));
            }
        }
        Ok(())
    }
}
