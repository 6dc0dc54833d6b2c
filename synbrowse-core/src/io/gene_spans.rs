//! FASTA to pseudo-GFF3 gene spans
//!
//! Every FASTA record becomes a single `gene` feature spanning the whole
//! record, which is enough for the browser to search and display named
//! CDS or genome segments without a real annotation.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Position;

pub const GFF3_HEADER: &str = "##gff-version 3";

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Header on line {line} has no field {field} (fields are '|'-separated): {header}")]
    MissingHeaderField {
        line: usize,
        field: usize,
        header: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which `|`-separated header field holds the feature ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderLayout {
    /// Full-genome headers, `>db|ID|...`
    Genome,
    /// CDS headers, `>ID|...`
    Cds,
}

impl HeaderLayout {
    pub fn field_index(self) -> usize {
        match self {
            HeaderLayout::Genome => 1,
            HeaderLayout::Cds => 0,
        }
    }

    fn extract_id(self, header: &str, line: usize) -> Result<String, ConvertError> {
        header
            .split('|')
            .nth(self.field_index())
            .map(|id| id.trim().to_string())
            .ok_or_else(|| ConvertError::MissingHeaderField {
                line,
                field: self.field_index() + 1,
                header: header.to_string(),
            })
    }
}

fn write_span<W: Write>(writer: &mut W, id: &str, length: Position) -> std::io::Result<()> {
    writeln!(writer, "{id}\t.\tgene\t1\t{length}\t.\t+\t.\tID={id}")
}

/// Stream FASTA records from `reader` into pseudo-GFF3 lines on `writer`.
/// Returns the number of features written.
pub fn write_gene_spans<R: BufRead, W: Write>(
    reader: R,
    mut writer: W,
    layout: HeaderLayout,
) -> Result<usize, ConvertError> {
    writeln!(writer, "{GFF3_HEADER}")?;

    let mut current: Option<(String, Position)> = None;
    let mut features = 0;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();

        if let Some(header) = line.strip_prefix('>') {
            if let Some((id, length)) = current.take() {
                write_span(&mut writer, &id, length)?;
                features += 1;
            }
            let id = layout.extract_id(header, index + 1)?;
            if id.is_empty() {
                log::warn!("Skipping FASTA record with an empty ID on line {}", index + 1);
                current = None;
            } else {
                current = Some((id, 0));
            }
        } else if let Some((_, length)) = current.as_mut() {
            *length += line.len() as Position;
        }
    }

    if let Some((id, length)) = current {
        write_span(&mut writer, &id, length)?;
        features += 1;
    }

    writer.flush()?;
    Ok(features)
}

/// Convert `fasta` into a pseudo-GFF3 file at `gff`.
///
/// Returns `Ok(false)` without touching anything when `gff` already exists.
pub fn convert_fasta_to_gff<P: AsRef<Path>, Q: AsRef<Path>>(
    fasta: P,
    gff: Q,
    layout: HeaderLayout,
) -> Result<bool, ConvertError> {
    let gff = gff.as_ref();
    if gff.exists() {
        log::info!("GFF file {} already exists, skipping conversion", gff.display());
        return Ok(false);
    }

    log::info!(
        "Converting {} to pseudo-GFF3 at {}",
        fasta.as_ref().display(),
        gff.display()
    );
    let reader = BufReader::new(File::open(fasta.as_ref())?);

    let dir = gff.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    let features = write_gene_spans(reader, BufWriter::new(tmp.as_file_mut()), layout)?;
    tmp.persist(gff).map_err(|e| e.error)?;

    log::info!("Wrote {} gene spans to {}", features, gff.display());
    Ok(true)
}
