//! BAM header inspection

use crate::{SentieonError, SentieonResult};
use rust_htslib::bam::{Read, Reader};
use std::path::Path;

/// Distinct `SM` values of the `@RG` header lines, in header order
pub fn read_group_samples<P: AsRef<Path>>(bam_path: P) -> SentieonResult<Vec<String>> {
    let bam_path = bam_path.as_ref();
    if !bam_path.exists() {
        return Err(SentieonError::FileNotFound(
            bam_path.to_string_lossy().to_string(),
        ));
    }

    let reader = Reader::from_path(bam_path)?;
    let header = String::from_utf8_lossy(reader.header().as_bytes()).to_string();

    let mut samples: Vec<String> = Vec::new();
    for line in header.lines().filter(|l| l.starts_with("@RG")) {
        let sample = line
            .split('\t')
            .skip(1)
            .find_map(|field| field.strip_prefix("SM:"));
        if let Some(sample) = sample {
            if !samples.iter().any(|s| s == sample) {
                samples.push(sample.to_string());
            }
        }
    }
    Ok(samples)
}

/// Sample name recorded in the BAM read groups.
///
/// Uses the first sample when read groups disagree.
pub fn sample_name_from_bam<P: AsRef<Path>>(bam_path: P) -> SentieonResult<String> {
    let bam_path = bam_path.as_ref();
    let samples = read_group_samples(bam_path)?;
    if samples.len() > 1 {
        log::warn!(
            "{} has read groups for {} samples, using {}",
            bam_path.display(),
            samples.len(),
            samples[0]
        );
    }
    samples.into_iter().next().ok_or_else(|| {
        SentieonError::InvalidArgument(format!(
            "No @RG sample name (SM) found in {}, pass the sample name explicitly",
            bam_path.display()
        ))
    })
}
