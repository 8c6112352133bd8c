//! Tumor/normal pairing of alignment files

use crate::{Phenotype, Sample, SentieonError, SentieonResult};
use std::path::{Path, PathBuf};

/// Tumor alignment with its matched normal, when one is available
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairedBams {
    pub tumor_bam: PathBuf,
    pub tumor_name: String,
    pub normal_bam: Option<PathBuf>,
    pub normal_name: Option<String>,
}

impl PairedBams {
    /// Normal BAM and sample name, or a precondition error naming `tool`
    pub fn require_normal(&self, tool: &str) -> SentieonResult<(&Path, &str)> {
        match (&self.normal_bam, &self.normal_name) {
            (Some(bam), Some(name)) => Ok((bam.as_path(), name.as_str())),
            _ => Err(SentieonError::Precondition(format!(
                "Require normal BAM for Sentieon {}",
                tool
            ))),
        }
    }
}

/// Pair alignments by sample phenotype.
///
/// Returns `None` when no tumor sample is present. BAMs and samples are
/// matched by position; a later sample of the same phenotype replaces an
/// earlier one.
pub fn get_paired_bams(
    align_bams: &[PathBuf],
    samples: &[Sample],
) -> SentieonResult<Option<PairedBams>> {
    if align_bams.len() != samples.len() {
        return Err(SentieonError::Precondition(format!(
            "Got {} alignment files for {} samples",
            align_bams.len(),
            samples.len()
        )));
    }

    let mut tumor: Option<(&PathBuf, &str)> = None;
    let mut normal: Option<(&PathBuf, &str)> = None;
    for (bam, sample) in align_bams.iter().zip(samples) {
        match sample.phenotype {
            Some(Phenotype::Tumor) => tumor = Some((bam, sample.name.as_str())),
            Some(Phenotype::Normal) => normal = Some((bam, sample.name.as_str())),
            None => log::debug!("Sample {} has no tumor/normal phenotype", sample.name),
        }
    }

    Ok(tumor.map(|(tumor_bam, tumor_name)| PairedBams {
        tumor_bam: tumor_bam.clone(),
        tumor_name: tumor_name.to_string(),
        normal_bam: normal.map(|(bam, _)| bam.clone()),
        normal_name: normal.map(|(_, name)| name.to_string()),
    }))
}
