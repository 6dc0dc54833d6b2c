use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use super::paths::{portable_uri, with_gz_suffix, with_tbi_suffix};
use crate::error::{PipelineError, Result};

pub const URI_LOCATION: &str = "UriLocation";
pub const REFERENCE_SEQUENCE_TRACK: &str = "ReferenceSequenceTrack";
pub const INDEXED_FASTA_ADAPTER: &str = "IndexedFastaAdapter";
pub const FEATURE_TRACK: &str = "FeatureTrack";
pub const GFF3_TABIX_ADAPTER: &str = "Gff3TabixAdapter";
pub const SYNTENY_TRACK: &str = "SyntenyTrack";
pub const PAF_ADAPTER: &str = "PAFAdapter";

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn default_session() -> Value {
    serde_json::json!({ "name": "New Session" })
}

/// The JBrowse 2 `config.json` document.
///
/// Only the parts synbrowse edits are typed; everything else the browser
/// CLI writes is carried through `extra` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserConfig {
    #[serde(default)]
    pub assemblies: Vec<Assembly>,
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub plugins: Vec<Plugin>,
    #[serde(default = "empty_object")]
    pub configuration: Value,
    #[serde(default)]
    pub connections: Vec<Value>,
    #[serde(default = "default_session")]
    pub default_session: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assembly {
    pub name: String,
    pub sequence: ReferenceSequence,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceSequence {
    #[serde(rename = "type")]
    pub kind: String,
    pub track_id: String,
    pub adapter: Adapter,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    #[serde(rename = "type")]
    pub kind: String,
    pub track_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub assembly_names: Vec<String>,
    pub adapter: Adapter,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Data adapter; the location fields present depend on `kind`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Adapter {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fasta_location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fai_location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gff_gz_location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<IndexLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paf_location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assembly_names: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub uri: String,
    #[serde(default = "default_location_type")]
    pub location_type: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_location_type() -> String {
    URI_LOCATION.to_string()
}

impl Location {
    pub fn uri(path: &Path) -> Self {
        Self {
            uri: path.to_string_lossy().into_owned(),
            location_type: default_location_type(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexLocation {
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Plugin declaration as listed in the JBrowse plugin store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plugin {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Plugin {
    pub fn protein3d() -> Self {
        Self {
            name: "Protein3d".to_string(),
            url: "https://unpkg.com/jbrowse-plugin-protein3d/dist/jbrowse-plugin-protein3d.umd.production.min.js".to_string(),
            authors: vec!["Colin Diesh".to_string()],
            description: Some("View 3-D protein structures in JBrowse 2".to_string()),
            location: Some("https://github.com/cmdcolin/jbrowse-plugin-protein3d".to_string()),
            license: Some("MIT".to_string()),
            image: Some("https://raw.githubusercontent.com/GMOD/jbrowse-plugin-list/main/img/protein3d-fs8.png".to_string()),
        }
    }
}

/// Track id the jbrowse CLI assigns to a `.gz` annotation: the file name minus `.gz`
pub fn annotation_track_id(compressed: &Path) -> String {
    let name = compressed
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.strip_suffix(".gz").map(str::to_string).unwrap_or(name)
}

pub fn synteny_track_id(query: &str, target: &str) -> String {
    format!("{query}_vs_{target}-synteny")
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self::minimal()
    }
}

impl BrowserConfig {
    /// Template used when the browser project has no `config.json` yet
    pub fn minimal() -> Self {
        Self {
            assemblies: Vec::new(),
            tracks: Vec::new(),
            plugins: Vec::new(),
            configuration: empty_object(),
            connections: Vec::new(),
            default_session: default_session(),
            extra: Map::new(),
        }
    }

    pub fn assembly(&self, name: &str) -> Option<&Assembly> {
        self.assemblies.iter().find(|a| a.name == name)
    }

    pub fn has_assembly(&self, name: &str) -> bool {
        self.assembly(name).is_some()
    }

    pub fn track(&self, track_id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.track_id == track_id)
    }

    pub fn has_track(&self, track_id: &str) -> bool {
        self.track(track_id).is_some()
    }

    fn require_assemblies(&self, track_id: &str, names: &[String]) -> Result<()> {
        match names.iter().find(|name| !self.has_assembly(name)) {
            Some(missing) => Err(PipelineError::UndeclaredAssembly {
                track: track_id.to_string(),
                assembly: missing.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Add an indexed FASTA assembly unless one with `name` exists.
    /// Returns whether the document changed.
    pub fn ensure_assembly(&mut self, name: &str, sequence: &Path, index: &Path) -> bool {
        if self.has_assembly(name) {
            log::info!("Assembly '{}' is already present in the browser config", name);
            return false;
        }

        self.assemblies.push(Assembly {
            name: name.to_string(),
            sequence: ReferenceSequence {
                kind: REFERENCE_SEQUENCE_TRACK.to_string(),
                track_id: format!("{name}-{REFERENCE_SEQUENCE_TRACK}"),
                adapter: Adapter {
                    kind: INDEXED_FASTA_ADAPTER.to_string(),
                    fasta_location: Some(Location::uri(sequence)),
                    fai_location: Some(Location::uri(index)),
                    ..Adapter::default()
                },
                extra: Map::new(),
            },
            extra: Map::new(),
        });
        log::info!("Added assembly '{}' to the browser config", name);
        true
    }

    /// Add a tabix-indexed GFF3 track on `assembly`
    pub fn ensure_annotation_track(&mut self, assembly: &str, compressed: &Path, index: &Path) -> Result<bool> {
        let track_id = annotation_track_id(compressed);
        if self.has_track(&track_id) {
            log::info!("Track '{}' is already present in the browser config", track_id);
            return Ok(false);
        }

        let assembly_names = vec![assembly.to_string()];
        self.require_assemblies(&track_id, &assembly_names)?;

        self.tracks.push(Track {
            kind: FEATURE_TRACK.to_string(),
            track_id: track_id.clone(),
            name: Some(track_id.clone()),
            assembly_names,
            adapter: Adapter {
                kind: GFF3_TABIX_ADAPTER.to_string(),
                gff_gz_location: Some(Location::uri(compressed)),
                index: Some(IndexLocation {
                    location: Location::uri(index),
                    index_type: Some("TBI".to_string()),
                    extra: Map::new(),
                }),
                ..Adapter::default()
            },
            extra: Map::new(),
        });
        log::info!("Added annotation track '{}' on '{}'", track_id, assembly);
        Ok(true)
    }

    /// Add a two-assembly synteny track backed by a PAF file.
    /// `assemblies` is `[query, target]` in PAF column order.
    pub fn ensure_synteny_track(&mut self, assemblies: [&str; 2], paf: &Path) -> Result<bool> {
        let [query, target] = assemblies;
        let track_id = synteny_track_id(query, target);
        if self.has_track(&track_id) {
            log::info!("Track '{}' is already present in the browser config", track_id);
            return Ok(false);
        }

        let assembly_names = vec![query.to_string(), target.to_string()];
        self.require_assemblies(&track_id, &assembly_names)?;

        self.tracks.push(Track {
            kind: SYNTENY_TRACK.to_string(),
            track_id: track_id.clone(),
            name: Some(format!("{query} vs {target}")),
            assembly_names: assembly_names.clone(),
            adapter: Adapter {
                kind: PAF_ADAPTER.to_string(),
                paf_location: Some(Location::uri(paf)),
                assembly_names: Some(assembly_names),
                ..Adapter::default()
            },
            extra: Map::new(),
        });
        log::info!("Added synteny track '{}'", track_id);
        Ok(true)
    }

    /// Rewrite every file location to be relative to `base_dir` and fix
    /// missing `.gz` / `.gz.tbi` suffixes on annotation tracks.
    pub fn normalize_paths(&mut self, base_dir: &Path) -> std::io::Result<()> {
        for assembly in &mut self.assemblies {
            normalize_adapter(&mut assembly.sequence.adapter, base_dir)?;
        }
        for track in &mut self.tracks {
            if track.adapter.kind == GFF3_TABIX_ADAPTER {
                if let Some(location) = track.adapter.gff_gz_location.as_mut() {
                    location.uri = with_gz_suffix(&location.uri);
                }
                if let Some(index) = track.adapter.index.as_mut() {
                    index.location.uri = with_tbi_suffix(&index.location.uri);
                }
            }
            normalize_adapter(&mut track.adapter, base_dir)?;
        }
        Ok(())
    }

    /// Replace the plugin list wholesale
    pub fn set_plugins(&mut self, plugins: Vec<Plugin>) {
        self.plugins = plugins;
    }
}

fn normalize_adapter(adapter: &mut Adapter, base_dir: &Path) -> std::io::Result<()> {
    let locations = [
        adapter.fasta_location.as_mut(),
        adapter.fai_location.as_mut(),
        adapter.gff_gz_location.as_mut(),
        adapter.paf_location.as_mut(),
        adapter.index.as_mut().map(|index| &mut index.location),
    ];
    for location in locations.into_iter().flatten() {
        location.uri = portable_uri(&location.uri, base_dir)?;
    }
    Ok(())
}
