//! Sequence ingestion: FASTA/FASTQ files into `Sequence` records.

use std::path::Path;

use anyhow::{Context, Result};
use bio::io::{fasta, fastq};

use crate::sequence::Sequence;

/// Read all records from a FASTA or FASTQ file, chosen by extension
/// (`.fastq`/`.fq` means FASTQ), in file order.
pub fn read_sequences(path: &Path) -> Result<Vec<Sequence>> {
    let is_fastq = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("fastq") | Some("fq")
    );
    if is_fastq {
        read_fastq(path)
    } else {
        read_fasta(path)
    }
}

pub fn read_fasta(path: &Path) -> Result<Vec<Sequence>> {
    let reader = fasta::Reader::from_file(path)
        .with_context(|| format!("failed to open FASTA file {}", path.display()))?;
    let mut sequences = Vec::new();
    for record in reader.records() {
        let record =
            record.with_context(|| format!("malformed FASTA record in {}", path.display()))?;
        sequences.push(Sequence::new(record.id(), record.seq().to_vec(), None)?);
    }
    Ok(sequences)
}

pub fn read_fastq(path: &Path) -> Result<Vec<Sequence>> {
    let reader = fastq::Reader::from_file(path)
        .with_context(|| format!("failed to open FASTQ file {}", path.display()))?;
    let mut sequences = Vec::new();
    for record in reader.records() {
        let record =
            record.with_context(|| format!("malformed FASTQ record in {}", path.display()))?;
        sequences.push(Sequence::new(
            record.id(),
            record.seq().to_vec(),
            Some(record.qual().to_vec()),
        )?);
    }
    Ok(sequences)
}
