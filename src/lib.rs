//! # sentieon-rs - Sentieon variant calling wrappers
//!
//! Builds and runs `sentieon driver` command lines for the TNscope,
//! TNhaplotyper and Haplotyper algorithms. Output files are written through a
//! file transaction and existing outputs are never recomputed.

pub mod bam;
pub mod bed;
pub mod caller;
pub mod command;
pub mod config;
pub mod license;
pub mod pairing;
pub mod region;
pub mod runner;
pub mod transaction;
pub mod utils;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Role of a sample in a tumor/normal comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phenotype {
    Tumor,
    Normal,
}

/// Sample metadata accompanying one alignment file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub name: String,
    pub phenotype: Option<Phenotype>,
    /// BED file restricting calling for this sample
    pub variant_regions: Option<PathBuf>,
}

impl Sample {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phenotype: None,
            variant_regions: None,
        }
    }

    pub fn tumor(name: impl Into<String>) -> Self {
        Self::new(name).with_phenotype(Phenotype::Tumor)
    }

    pub fn normal(name: impl Into<String>) -> Self {
        Self::new(name).with_phenotype(Phenotype::Normal)
    }

    pub fn with_phenotype(mut self, phenotype: Phenotype) -> Self {
        self.phenotype = Some(phenotype);
        self
    }

    pub fn with_variant_regions(mut self, bed: impl Into<PathBuf>) -> Self {
        self.variant_regions = Some(bed.into());
        self
    }
}

/// Annotation resources passed through to the caller as optional flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssocFiles {
    #[serde(default)]
    pub dbsnp: Option<PathBuf>,
    #[serde(default)]
    pub cosmic: Option<PathBuf>,
}

/// Error types for the sentieon-rs library
#[derive(Debug, thiserror::Error)]
pub enum SentieonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTSlib error: {0}")]
    Htslib(#[from] rust_htslib::errors::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("{description} failed ({}): {command}\n{stderr}", describe_status(.status))]
    Execution {
        description: String,
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("Unsupported license value: {0}")]
    InvalidLicenseValue(String),

    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Command finished without producing {0}")]
    MissingOutput(String),
}

pub type SentieonResult<T> = Result<T, SentieonError>;

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_builders() {
        let sample = Sample::tumor("T1").with_variant_regions("/x/targets.bed");
        assert_eq!(sample.phenotype, Some(Phenotype::Tumor));
        assert_eq!(sample.variant_regions, Some(PathBuf::from("/x/targets.bed")));
        assert_eq!(Sample::new("S1").phenotype, None);
    }

    #[test]
    fn test_execution_error_message() {
        let err = SentieonError::Execution {
            description: "Sentieon Haplotyper".to_string(),
            command: "sentieon driver".to_string(),
            status: Some(2),
            stderr: "license expired".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Sentieon Haplotyper failed (exit status 2)"));
        assert!(msg.contains("license expired"));
    }
}
