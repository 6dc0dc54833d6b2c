//! File format converters
//!
//! Pure file-to-file transformations: FASTA records into pseudo-GFF3 gene
//! spans, and MAF alignment blocks into PAF rows.

pub mod gene_spans;
pub mod maf;
pub mod paf;

pub use gene_spans::{convert_fasta_to_gff, write_gene_spans, ConvertError, HeaderLayout};
pub use maf::{maf_to_paf, write_paf, ConversionReport, MafBlock, MafError, MafSequence};
pub use paf::{read_paf, PafError, PafRecord};
