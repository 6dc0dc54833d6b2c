use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::io::gene_spans::HeaderLayout;

pub type Position = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    /// Strand of `other` as seen from `self`: equal strands give `Forward`.
    pub fn relative_to(self, other: Strand) -> Strand {
        if self == other {
            Strand::Forward
        } else {
            Strand::Reverse
        }
    }
}

impl From<Strand> for char {
    fn from(strand: Strand) -> Self {
        match strand {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }
}

impl TryFrom<&str> for Strand {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "+" => Ok(Strand::Forward),
            "-" => Ok(Strand::Reverse),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", char::from(*self))
    }
}

/// Local FASTA whose records become one `gene` span each in a pseudo-GFF3 track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneSpanSource {
    /// FASTA path, relative paths resolve against the output directory
    pub fasta: PathBuf,
    #[serde(default = "default_header_layout")]
    pub header: HeaderLayout,
    /// Pseudo-GFF3 filename written into the output directory
    pub gff: String,
}

fn default_header_layout() -> HeaderLayout {
    HeaderLayout::Cds
}

/// One genome to process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    /// Display name used in log messages
    pub name: String,
    /// Filesystem-safe identifier, doubles as the assembly name
    pub key: String,
    pub genome_url: String,
    pub annotation_url: String,
    /// Annotation filename inside the output directory, without `.gz`
    pub annotation_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gene_spans: Option<GeneSpanSource>,
}

impl Dataset {
    /// Sequence filename inside the output directory
    pub fn sequence_file(&self) -> String {
        format!("{}.fa", self.key)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.key.is_empty() {
            return Err(format!("dataset '{}' has an empty key", self.name));
        }
        if let Some(c) = self
            .key
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
        {
            return Err(format!(
                "dataset key '{}' contains unsupported character {:?}",
                self.key, c
            ));
        }
        if self.key == "." || self.key == ".." {
            return Err(format!("dataset key '{}' is not a valid file stem", self.key));
        }
        for file in [Some(self.annotation_file.as_str()), self.gene_spans.as_ref().map(|g| g.gff.as_str())]
            .into_iter()
            .flatten()
        {
            if file.is_empty() || file.contains('/') || file.contains('\\') {
                return Err(format!(
                    "dataset '{}': output filename '{}' must be a plain file name",
                    self.key, file
                ));
            }
        }
        Ok(())
    }

    pub fn mers() -> Self {
        Self {
            name: "MERS".to_string(),
            key: "mers".to_string(),
            genome_url: "https://ftp.ncbi.nlm.nih.gov/genomes/all/GCF/000/901/155/GCF_000901155.1_ViralProj183710/GCF_000901155.1_ViralProj183710_genomic.fna.gz".to_string(),
            annotation_url: "https://ftp.ncbi.nlm.nih.gov/genomes/all/GCF/000/901/155/GCF_000901155.1_ViralProj183710/GCF_000901155.1_ViralProj183710_genomic.gff.gz".to_string(),
            annotation_file: "mers_genes.gff".to_string(),
            gene_spans: Some(GeneSpanSource {
                fasta: PathBuf::from("mers.cds"),
                header: HeaderLayout::Cds,
                gff: "mers_cds.gff".to_string(),
            }),
        }
    }

    pub fn sars_cov_2() -> Self {
        Self {
            name: "SARS Covid 2".to_string(),
            key: "sars_cov_2".to_string(),
            genome_url: "https://ftp.ncbi.nlm.nih.gov/genomes/all/GCF/009/858/895/GCF_009858895.2_ASM985889v3/GCF_009858895.2_ASM985889v3_genomic.fna.gz".to_string(),
            annotation_url: "https://ftp.ncbi.nlm.nih.gov/genomes/all/GCF/009/858/895/GCF_009858895.2_ASM985889v3/GCF_009858895.2_ASM985889v3_genomic.gff.gz".to_string(),
            annotation_file: "sars_genes.gff".to_string(),
            gene_spans: Some(GeneSpanSource {
                fasta: PathBuf::from("sars_cov.cds"),
                header: HeaderLayout::Cds,
                gff: "sars_cds.gff".to_string(),
            }),
        }
    }
}
