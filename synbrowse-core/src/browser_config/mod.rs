//! JBrowse 2 configuration synthesizer
//!
//! Typed view of `config.json` with idempotent upserts for assemblies and
//! tracks, path normalization, plugin declaration, and a scoped
//! load-mutate-save wrapper that never leaves a half-written document.

pub mod document;
pub mod file;
pub mod paths;

pub use document::{
    annotation_track_id, synteny_track_id, Adapter, Assembly, BrowserConfig, IndexLocation, Location, Plugin,
    ReferenceSequence, Track,
};
pub use file::ConfigFile;
