//! PAF (Pairwise mApping Format) records
//!
//! PAF is a text format used to describe the approximate mapping positions
//! between two sets of sequences. It consists of at least 12 fields separated by tabs.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::types::{Position, Strand};

#[derive(Debug, Error)]
pub enum PafError {
    #[error("Invalid PAF line: insufficient fields (expected at least 12, got {0})")]
    InsufficientFields(usize),
    #[error("Invalid position value: {0}")]
    InvalidPosition(String),
    #[error("Invalid strand: {0}")]
    InvalidStrand(String),
    #[error("Invalid mapping quality: {0}")]
    InvalidMappingQuality(String),
    #[error("Error parsing line {line}: {source}")]
    Line {
        line: usize,
        #[source]
        source: Box<PafError>,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The 12 mandatory PAF columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PafRecord {
    pub query_name: String,
    pub query_length: Position,
    pub query_start: Position,
    pub query_end: Position,
    pub strand: Strand,
    pub target_name: String,
    pub target_length: Position,
    pub target_start: Position,
    pub target_end: Position,
    pub residue_matches: Position,
    pub alignment_block_length: Position,
    pub mapping_quality: u8,
}

impl fmt::Display for PafRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.query_name,
            self.query_length,
            self.query_start,
            self.query_end,
            self.strand,
            self.target_name,
            self.target_length,
            self.target_start,
            self.target_end,
            self.residue_matches,
            self.alignment_block_length,
            self.mapping_quality
        )
    }
}

impl FromStr for PafRecord {
    type Err = PafError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = line.trim_end().split('\t').collect();

        if fields.len() < 12 {
            return Err(PafError::InsufficientFields(fields.len()));
        }

        let position = |value: &str| {
            value
                .parse::<Position>()
                .map_err(|_| PafError::InvalidPosition(value.to_string()))
        };

        Ok(PafRecord {
            query_name: fields[0].to_string(),
            query_length: position(fields[1])?,
            query_start: position(fields[2])?,
            query_end: position(fields[3])?,
            strand: Strand::try_from(fields[4]).map_err(PafError::InvalidStrand)?,
            target_name: fields[5].to_string(),
            target_length: position(fields[6])?,
            target_start: position(fields[7])?,
            target_end: position(fields[8])?,
            residue_matches: position(fields[9])?,
            alignment_block_length: position(fields[10])?,
            mapping_quality: fields[11]
                .parse::<u8>()
                .map_err(|_| PafError::InvalidMappingQuality(fields[11].to_string()))?,
        })
    }
}

/// Read every record of a PAF file, skipping blank lines and `#` comments
pub fn read_paf<P: AsRef<Path>>(path: P) -> Result<Vec<PafRecord>, PafError> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let record = line.parse::<PafRecord>().map_err(|e| PafError::Line {
            line: line_num + 1,
            source: Box::new(e),
        })?;
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_paf_line() {
        let line = "query1\t1000\t100\t900\t+\ttarget1\t2000\t500\t1300\t750\t800\t60\tAS:i:750";

        let record: PafRecord = line.parse().unwrap();

        assert_eq!(record.query_name, "query1");
        assert_eq!(record.query_length, 1000);
        assert_eq!(record.query_start, 100);
        assert_eq!(record.query_end, 900);
        assert_eq!(record.strand, Strand::Forward);
        assert_eq!(record.target_name, "target1");
        assert_eq!(record.target_length, 2000);
        assert_eq!(record.target_start, 500);
        assert_eq!(record.target_end, 1300);
        assert_eq!(record.residue_matches, 750);
        assert_eq!(record.alignment_block_length, 800);
        assert_eq!(record.mapping_quality, 60);
    }

    #[test]
    fn test_display_writes_twelve_columns() {
        let line = "q\t100\t0\t10\t-\tt\t200\t5\t15\t10\t10\t60";
        let record: PafRecord = line.parse().unwrap();
        assert_eq!(record.to_string(), line);
        assert_eq!(record.to_string().split('\t').count(), 12);
    }

    #[test]
    fn test_parse_insufficient_fields() {
        let result = "query1\t1000\t100\t900\t+\ttarget1\t2000\t500".parse::<PafRecord>();
        assert!(matches!(result, Err(PafError::InsufficientFields(8))));
    }

    #[test]
    fn test_parse_invalid_strand() {
        let result = "query1\t1000\t100\t900\tx\ttarget1\t2000\t500\t1300\t750\t800\t60".parse::<PafRecord>();
        assert!(matches!(result, Err(PafError::InvalidStrand(_))));
    }

    #[test]
    fn test_read_paf_skips_comments() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "q\t100\t0\t10\t+\tt\t200\t5\t15\t10\t10\t60").unwrap();

        let records = read_paf(file.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].target_end, 15);
    }

    #[test]
    fn test_read_paf_reports_line() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "q\t100\t0\t10\t+\tt\t200\t5\t15\t10\t10\t60").unwrap();
        writeln!(file, "broken").unwrap();

        let err = read_paf(file.path()).unwrap_err();
        assert!(matches!(err, PafError::Line { line: 2, .. }));
    }
}
