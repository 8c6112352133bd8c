//! Sentieon variant callers: TNscope, TNhaplotyper and Haplotyper
//!
//! Every caller returns the output path without doing any work when that file
//! already exists. Otherwise it builds a `sentieon driver` command line and
//! runs it inside a file transaction.

use crate::bed::merge_overlaps;
use crate::command::CommandLine;
use crate::config::ToolResources;
use crate::license::LicenseConfig;
use crate::pairing::{get_paired_bams, PairedBams};
use crate::region::{resolve_interval, Region};
use crate::runner::{CommandRunner, ShellRunner};
use crate::transaction::file_transaction;
use crate::utils::{default_out_file, file_exists};
use crate::{AssocFiles, Sample, SentieonError, SentieonResult};
use std::path::{Path, PathBuf};

pub const SENTIEON_BIN: &str = "sentieon";

/// Sentieon algorithms driven by this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    TNscope,
    TNhaplotyper,
    Haplotyper,
}

impl Algorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::TNscope => "TNscope",
            Algorithm::TNhaplotyper => "TNhaplotyper",
            Algorithm::Haplotyper => "Haplotyper",
        }
    }

    pub fn description(&self) -> String {
        format!("Sentieon {}", self.name())
    }
}

/// Inputs shared by every command line
pub struct DriverArgs<'a> {
    pub license: &'a LicenseConfig,
    pub ref_file: &'a Path,
    pub interval: &'a [String],
    pub out_file: &'a Path,
}

fn driver(args: &DriverArgs) -> CommandLine {
    CommandLine::new(SENTIEON_BIN)
        .exports(args.license.exports())
        .arg("driver")
        .flag("-t", "1")
        .arg("-r")
        .path_arg(args.ref_file)
}

/// `sentieon driver ... --algo TNscope` for a tumor/normal pair
pub fn tnscope_command(
    args: &DriverArgs,
    paired: &PairedBams,
    assoc_files: &AssocFiles,
) -> SentieonResult<CommandLine> {
    let (normal_bam, normal_name) = paired.require_normal(Algorithm::TNscope.name())?;
    Ok(driver(args)
        .arg("-i")
        .path_arg(&paired.tumor_bam)
        .arg("-i")
        .path_arg(normal_bam)
        .args(args.interval.iter().cloned())
        .flag("--algo", Algorithm::TNscope.name())
        .flag("--tumor_sample", paired.tumor_name.as_str())
        .flag("--normal_sample", normal_name)
        .opt_path("--dbsnp", assoc_files.dbsnp.as_deref())
        .path_arg(args.out_file))
}

/// `sentieon driver ... --algo TNhaplotyper` for a tumor/normal pair
pub fn tnhaplotyper_command(
    args: &DriverArgs,
    paired: &PairedBams,
    assoc_files: &AssocFiles,
) -> SentieonResult<CommandLine> {
    let (normal_bam, normal_name) = paired.require_normal(Algorithm::TNhaplotyper.name())?;
    Ok(driver(args)
        .arg("-i")
        .path_arg(&paired.tumor_bam)
        .arg("-i")
        .path_arg(normal_bam)
        .args(args.interval.iter().cloned())
        .flag("--algo", Algorithm::TNhaplotyper.name())
        .flag("--tumor_sample", paired.tumor_name.as_str())
        .flag("--normal_sample", normal_name)
        .opt_path("--dbsnp", assoc_files.dbsnp.as_deref())
        .opt_path("--cosmic", assoc_files.cosmic.as_deref())
        .path_arg(args.out_file))
}

/// `sentieon driver ... --algo Haplotyper` over all alignments
pub fn haplotyper_command(
    args: &DriverArgs,
    align_bams: &[PathBuf],
    assoc_files: &AssocFiles,
) -> CommandLine {
    align_bams
        .iter()
        .fold(driver(args), |cmd, bam| cmd.arg("-i").path_arg(bam))
        .args(args.interval.iter().cloned())
        .flag("--algo", Algorithm::Haplotyper.name())
        .opt_path("--dbsnp", assoc_files.dbsnp.as_deref())
        .path_arg(args.out_file)
}

/// Runs Sentieon algorithms with an injected resource record and runner
pub struct Sentieon<R = ShellRunner> {
    resources: ToolResources,
    runner: R,
}

impl Sentieon<ShellRunner> {
    pub fn new(resources: ToolResources) -> Self {
        Self::with_runner(resources, ShellRunner::default())
    }
}

impl<R: CommandRunner> Sentieon<R> {
    pub fn with_runner(resources: ToolResources, runner: R) -> Self {
        Self { resources, runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Call somatic variants with TNscope
    pub fn run_tnscope(
        &self,
        align_bams: &[PathBuf],
        samples: &[Sample],
        ref_file: &Path,
        assoc_files: &AssocFiles,
        region: Option<&Region>,
        out_file: Option<&Path>,
    ) -> SentieonResult<PathBuf> {
        let algo = Algorithm::TNscope;
        let out_file = resolve_out_file(align_bams, out_file)?;
        if file_exists(&out_file) {
            log::info!("{} output {} exists, skipping", algo.name(), out_file.display());
            return Ok(out_file);
        }

        let paired = get_paired_bams(align_bams, samples)?.ok_or_else(|| {
            SentieonError::Precondition(format!("Require normal BAM for Sentieon {}", algo.name()))
        })?;
        paired.require_normal(algo.name())?;

        self.run_in_transaction(algo, samples, ref_file, region, &out_file, |args| {
            tnscope_command(args, &paired, assoc_files)
        })
    }

    /// Call somatic variants with TNhaplotyper (MuTect2 like)
    pub fn run_tnhaplotyper(
        &self,
        align_bams: &[PathBuf],
        samples: &[Sample],
        ref_file: &Path,
        assoc_files: &AssocFiles,
        region: Option<&Region>,
        out_file: Option<&Path>,
    ) -> SentieonResult<PathBuf> {
        let algo = Algorithm::TNhaplotyper;
        let out_file = resolve_out_file(align_bams, out_file)?;
        if file_exists(&out_file) {
            log::info!("{} output {} exists, skipping", algo.name(), out_file.display());
            return Ok(out_file);
        }

        // Without a tumor there is no normal either
        let paired = get_paired_bams(align_bams, samples)?.ok_or_else(|| {
            SentieonError::Precondition(format!("Require normal BAM for Sentieon {}", algo.name()))
        })?;
        paired.require_normal(algo.name())?;

        self.run_in_transaction(algo, samples, ref_file, region, &out_file, |args| {
            tnhaplotyper_command(args, &paired, assoc_files)
        })
    }

    /// Call germline variants over one or more samples with Haplotyper
    /// (GATK HaplotypeCaller like)
    pub fn run_haplotyper(
        &self,
        align_bams: &[PathBuf],
        samples: &[Sample],
        ref_file: &Path,
        assoc_files: &AssocFiles,
        region: Option<&Region>,
        out_file: Option<&Path>,
    ) -> SentieonResult<PathBuf> {
        let algo = Algorithm::Haplotyper;
        if align_bams.is_empty() {
            return Err(SentieonError::Precondition(
                "Haplotyper needs at least one alignment file".to_string(),
            ));
        }
        let out_file = resolve_out_file(align_bams, out_file)?;
        if file_exists(&out_file) {
            log::info!("{} output {} exists, skipping", algo.name(), out_file.display());
            return Ok(out_file);
        }

        self.run_in_transaction(algo, samples, ref_file, region, &out_file, |args| {
            Ok(haplotyper_command(args, align_bams, assoc_files))
        })
    }

    fn run_in_transaction<F>(
        &self,
        algo: Algorithm,
        samples: &[Sample],
        ref_file: &Path,
        region: Option<&Region>,
        out_file: &Path,
        build: F,
    ) -> SentieonResult<PathBuf>
    where
        F: Fn(&DriverArgs) -> SentieonResult<CommandLine>,
    {
        let license = LicenseConfig::from_resources(&self.resources)?;

        // Target regions come from the first sample, as for the whole batch
        let variant_regions = samples
            .first()
            .and_then(|s| s.variant_regions.as_deref());
        let variant_regions = merge_overlaps(variant_regions, out_file)?;
        let interval = resolve_interval(variant_regions.as_deref(), region, out_file)?;

        file_transaction(out_file, |tx_out_file| {
            let args = DriverArgs {
                license: &license,
                ref_file,
                interval: &interval,
                out_file: tx_out_file,
            };
            let cmd = build(&args)?;
            self.runner.run(&cmd, &algo.description())
        })?;

        log::info!("{} calls written to {}", algo.name(), out_file.display());
        Ok(out_file.to_path_buf())
    }
}

fn resolve_out_file(align_bams: &[PathBuf], out_file: Option<&Path>) -> SentieonResult<PathBuf> {
    match out_file {
        Some(path) => Ok(path.to_path_buf()),
        None => default_out_file(align_bams),
    }
}
