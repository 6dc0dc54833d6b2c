//! MAF (Multiple Alignment Format) reader and MAF→PAF conversion
//!
//! MAF is a text format for storing multiple alignments at the DNA level.
//! Each alignment block begins with an "a" line and contains one or more "s" lines.
//! Sequence lines are paired within a block, first as query and second as
//! target, and each pair becomes one PAF record.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use flate2::read::GzDecoder;
use thiserror::Error;

use crate::io::paf::PafRecord;
use crate::types::{Position, Strand};

/// Mapping quality written for every converted block
pub const CONVERTED_MAPQ: u8 = 60;

#[derive(Debug, Error)]
pub enum MafError {
    #[error("Invalid position value on line {line}: {value}")]
    InvalidPosition { line: usize, value: String },
    #[error("Invalid strand on line {line}: {value}")]
    InvalidStrand { line: usize, value: String },
    #[error("Invalid sequence line {line}: expected at least 7 fields, got {fields}")]
    InvalidSequenceLine { line: usize, fields: usize },
    #[error("Sequence line without alignment block at line {0}")]
    MissingAlignmentBlock(usize),
    #[error("Aligned region exceeds sequence length on line {0}")]
    OutOfBounds(usize),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Represents a sequence within a MAF alignment block
#[derive(Debug, Clone, PartialEq)]
pub struct MafSequence {
    pub src: String,        // Source sequence name
    pub start: Position,    // Start position on `strand`
    pub size: Position,     // Size of aligned sequence
    pub strand: Strand,     // Strand orientation
    pub src_size: Position, // Total size of source sequence
    pub line: usize,
}

impl MafSequence {
    /// Start/end on the forward strand
    pub fn forward_interval(&self) -> Result<(Position, Position), MafError> {
        let end = self.start + self.size;
        if end > self.src_size {
            return Err(MafError::OutOfBounds(self.line));
        }
        Ok(match self.strand {
            Strand::Forward => (self.start, end),
            Strand::Reverse => (self.src_size - end, self.src_size - self.start),
        })
    }
}

/// Represents a MAF alignment block
#[derive(Debug, Clone, PartialEq)]
pub struct MafBlock {
    pub sequences: Vec<MafSequence>,
    /// Line of the `a` record
    pub line: usize,
}

impl MafBlock {
    /// Pair `s` lines as (query, target) and emit one PAF record per pair.
    /// An unpaired trailing line is returned separately.
    pub fn to_records(&self) -> Result<(Vec<PafRecord>, Option<&MafSequence>), MafError> {
        let mut pairs = self.sequences.chunks_exact(2);
        let mut records = Vec::with_capacity(self.sequences.len() / 2);

        for pair in pairs.by_ref() {
            records.push(sequences_to_record(&pair[0], &pair[1])?);
        }

        Ok((records, pairs.remainder().first()))
    }
}

fn sequences_to_record(query: &MafSequence, target: &MafSequence) -> Result<PafRecord, MafError> {
    let (query_start, query_end) = query.forward_interval()?;
    let (target_start, target_end) = target.forward_interval()?;

    Ok(PafRecord {
        query_name: query.src.clone(),
        query_length: query.src_size,
        query_start,
        query_end,
        strand: query.strand.relative_to(target.strand),
        target_name: target.src.clone(),
        target_length: target.src_size,
        target_start,
        target_end,
        residue_matches: query.size,
        alignment_block_length: query.size,
        mapping_quality: CONVERTED_MAPQ,
    })
}

/// Counts produced by [`maf_to_paf`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionReport {
    pub blocks: usize,
    pub records: usize,
    pub unpaired_lines: usize,
}

/// MAF parser for reading alignment blocks
struct MafParser;

impl MafParser {
    /// Open a MAF file, transparently decompressing `.gz`
    fn open<P: AsRef<Path>>(path: P) -> Result<BufReader<Box<dyn Read>>, MafError> {
        let file = File::open(&path)?;
        let path_str = path.as_ref().to_string_lossy();

        let reader: Box<dyn Read> = if path_str.ends_with(".gz") {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };

        Ok(BufReader::new(reader))
    }

    /// Start a block at an alignment line (starts with 'a'); its score and
    /// other key=value pairs play no part in the PAF output
    fn parse_alignment_line(line_number: usize) -> MafBlock {
        MafBlock {
            sequences: Vec::new(),
            line: line_number,
        }
    }

    /// Parse a sequence line (starts with 's')
    fn parse_sequence_line(line: &str, line_number: usize) -> Result<MafSequence, MafError> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        if parts.len() < 7 {
            return Err(MafError::InvalidSequenceLine {
                line: line_number,
                fields: parts.len(),
            });
        }

        let position = |value: &str| {
            value.parse::<Position>().map_err(|_| MafError::InvalidPosition {
                line: line_number,
                value: value.to_string(),
            })
        };

        let strand = Strand::try_from(parts[4]).map_err(|value| MafError::InvalidStrand {
            line: line_number,
            value,
        })?;

        Ok(MafSequence {
            src: parts[1].to_string(),
            start: position(parts[2])?,
            size: position(parts[3])?,
            strand,
            src_size: position(parts[5])?,
            line: line_number,
        })
    }
}

/// Iterator over MAF blocks
pub struct MafBlockIterator<R: BufRead> {
    reader: R,
    line_buffer: String,
    line_number: usize,
    current_block: Option<MafBlock>,
}

impl<R: BufRead> MafBlockIterator<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_buffer: String::new(),
            line_number: 0,
            current_block: None,
        }
    }
}

impl<R: BufRead> Iterator for MafBlockIterator<R> {
    type Item = Result<MafBlock, MafError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line_buffer.clear();

            match self.reader.read_line(&mut self.line_buffer) {
                Ok(0) => {
                    // EOF - return current block if exists
                    return self.current_block.take().map(Ok);
                }
                Ok(_) => {
                    self.line_number += 1;
                    let line = self.line_buffer.trim();

                    // Skip empty lines and comments
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }

                    let Some(first_char) = line.chars().next() else {
                        continue;
                    };

                    match first_char {
                        'a' => {
                            let previous_block = self.current_block.take();
                            self.current_block = Some(MafParser::parse_alignment_line(self.line_number));
                            if let Some(block) = previous_block {
                                return Some(Ok(block));
                            }
                        }
                        's' => {
                            let Some(block) = self.current_block.as_mut() else {
                                return Some(Err(MafError::MissingAlignmentBlock(self.line_number)));
                            };
                            match MafParser::parse_sequence_line(line, self.line_number) {
                                Ok(sequence) => block.sequences.push(sequence),
                                Err(e) => return Some(Err(e)),
                            }
                        }
                        // i/e/q lines carry nothing PAF needs
                        _ => {}
                    }
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

/// Convert MAF blocks from `reader` into PAF rows on `writer`
pub fn write_paf<R: BufRead, W: Write>(reader: R, mut writer: W) -> Result<ConversionReport, MafError> {
    let mut report = ConversionReport::default();

    for block in MafBlockIterator::new(reader) {
        let block = block?;
        report.blocks += 1;

        let (records, unpaired) = block.to_records()?;
        for record in &records {
            writeln!(writer, "{record}")?;
        }
        report.records += records.len();

        if let Some(sequence) = unpaired {
            report.unpaired_lines += 1;
            log::warn!(
                "Alignment block at line {} has an odd number of sequence lines; \
                 dropping unpaired '{}' (line {})",
                block.line,
                sequence.src,
                sequence.line
            );
        }
    }

    writer.flush()?;
    Ok(report)
}

/// Convert a MAF file into a PAF file, replacing `paf` atomically
pub fn maf_to_paf<P: AsRef<Path>, Q: AsRef<Path>>(maf: P, paf: Q) -> Result<ConversionReport, MafError> {
    let paf = paf.as_ref();
    let reader = MafParser::open(maf)?;

    let dir = paf.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    let report = write_paf(reader, BufWriter::new(tmp.as_file_mut()))?;
    tmp.persist(paf).map_err(|e| e.error)?;

    log::info!(
        "Converted {} alignment blocks into {} PAF records at {}",
        report.blocks,
        report.records,
        paf.display()
    );
    Ok(report)
}
