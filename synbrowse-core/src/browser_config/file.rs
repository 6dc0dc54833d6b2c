use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::document::BrowserConfig;
use crate::error::{PipelineError, Result};

/// A `config.json` on disk
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<project_dir>/config.json`
    pub fn in_project(project_dir: &Path) -> Self {
        Self::new(project_dir.join("config.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Write the minimal template if there is no document yet.
    /// Returns whether a file was created.
    pub fn create_if_missing(&self) -> Result<bool> {
        if self.exists() {
            return Ok(false);
        }
        self.save(&BrowserConfig::minimal())?;
        log::info!("Created {}", self.path.display());
        Ok(true)
    }

    pub fn load(&self) -> Result<BrowserConfig> {
        let content = fs::read_to_string(&self.path)?;
        serde_json::from_str(&content).map_err(|source| PipelineError::Config {
            path: self.path.clone(),
            source,
        })
    }

    /// Replace the document through a sibling temp file and rename
    pub fn save(&self, config: &BrowserConfig) -> Result<()> {
        let json = serde_json::to_string_pretty(config).map_err(|source| PipelineError::Config {
            path: self.path.clone(),
            source,
        })?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.persist(&self.path).map_err(|e| PipelineError::Io(e.error))?;
        Ok(())
    }

    /// Load, mutate, and write back.
    ///
    /// The file is rewritten only when `f` succeeds and actually changed the
    /// document; an error from `f` leaves it exactly as it was.
    pub fn edit<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut BrowserConfig) -> Result<T>,
    {
        let original = self.load()?;
        let mut config = original.clone();
        let value = f(&mut config)?;
        if config != original {
            self.save(&config)?;
            log::debug!("Updated {}", self.path.display());
        }
        Ok(value)
    }
}
