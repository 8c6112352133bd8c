//! CLI binary for running Sentieon variant callers

use anyhow::Context;
use clap::{Parser, Subcommand};
use env_logger::Env;
use sentieon_rs::{
    bam::sample_name_from_bam,
    caller::Sentieon,
    config::{Config, ToolResources, SENTIEON_TOOL},
    region::Region,
    utils::validate_file_readable,
    AssocFiles, Sample, SentieonError, SentieonResult,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sentieon_call")]
#[command(about = "Run Sentieon TNscope, TNhaplotyper or Haplotyper variant calling")]
#[command(long_about = "
Builds and runs a `sentieon driver` command for one of three algorithms:

- tnscope       somatic calling on a tumor/normal pair
- tnhaplotyper  somatic calling on a tumor/normal pair (MuTect2 like)
- haplotyper    germline calling on one or more samples

Nothing is run when the output file already exists. Results are written to a
temporary location and moved into place only when Sentieon succeeds.

The Sentieon license is read from `resources: sentieon: keyfile:` in the YAML
configuration, or from --keyfile / SENTIEON_LICENSE.
")]
struct Args {
    /// YAML configuration with a `resources: sentieon:` entry
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// License server (host:port) or license file, overrides the configuration
    #[arg(long, env = "SENTIEON_LICENSE", global = true)]
    keyfile: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Somatic calling with TNscope
    Tnscope(PairedArgs),
    /// Somatic calling with TNhaplotyper
    Tnhaplotyper(TnhaplotyperArgs),
    /// Germline calling with Haplotyper
    Haplotyper(GermlineArgs),
}

#[derive(clap::Args)]
struct CommonArgs {
    /// Reference genome FASTA
    #[arg(long, value_name = "FILE")]
    reference: PathBuf,

    /// dbSNP VCF of known variants
    #[arg(long, value_name = "FILE")]
    dbsnp: Option<PathBuf>,

    /// Restrict calling to a contig or chrom:start-end (1-based)
    #[arg(long, value_parser = parse_region)]
    region: Option<Region>,

    /// BED file of target regions
    #[arg(long, value_name = "FILE")]
    variant_regions: Option<PathBuf>,

    /// Output VCF, defaults to <first BAM>-variants.vcf.gz
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
struct PairedArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Tumor alignments
    #[arg(long, value_name = "FILE")]
    tumor_bam: PathBuf,

    /// Matched normal alignments
    #[arg(long, value_name = "FILE")]
    normal_bam: PathBuf,

    /// Tumor sample name, read from the BAM read groups when omitted
    #[arg(long)]
    tumor_name: Option<String>,

    /// Normal sample name, read from the BAM read groups when omitted
    #[arg(long)]
    normal_name: Option<String>,
}

#[derive(clap::Args)]
struct TnhaplotyperArgs {
    #[command(flatten)]
    paired: PairedArgs,

    /// COSMIC VCF of known somatic variants
    #[arg(long, value_name = "FILE")]
    cosmic: Option<PathBuf>,
}

#[derive(clap::Args)]
struct GermlineArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Alignment files, one per sample
    #[arg(long = "bam", value_name = "FILE", required = true)]
    bams: Vec<PathBuf>,

    /// Sample names in --bam order, read from the BAM read groups when omitted
    #[arg(long = "sample-name")]
    sample_names: Vec<String>,
}

fn parse_region(s: &str) -> anyhow::Result<Region> {
    s.parse::<Region>()
        .with_context(|| format!("expected a contig or chrom:start-end, got '{}'", s))
}

/// Resources from the configuration, with the command line keyfile on top
fn load_resources(config: Option<&Path>, keyfile: Option<&str>) -> SentieonResult<ToolResources> {
    let mut resources = match config {
        Some(path) => Config::from_path(path)?.get_resources(SENTIEON_TOOL),
        None => ToolResources::default(),
    };
    if let Some(keyfile) = keyfile {
        log::debug!("Using license from --keyfile/SENTIEON_LICENSE");
        resources.keyfile = Some(keyfile.into());
    }
    Ok(resources)
}

fn sample_name(bam: &Path, name: Option<&String>) -> SentieonResult<String> {
    match name {
        Some(name) => Ok(name.clone()),
        None => sample_name_from_bam(bam),
    }
}

fn paired_inputs(args: &PairedArgs) -> SentieonResult<(Vec<PathBuf>, Vec<Sample>)> {
    validate_file_readable(&args.tumor_bam)?;
    validate_file_readable(&args.normal_bam)?;
    let tumor = Sample::tumor(sample_name(&args.tumor_bam, args.tumor_name.as_ref())?);
    let normal = Sample::normal(sample_name(&args.normal_bam, args.normal_name.as_ref())?);
    let bams = vec![args.tumor_bam.clone(), args.normal_bam.clone()];
    Ok((bams, with_targets(vec![tumor, normal], &args.common)))
}

fn germline_inputs(args: &GermlineArgs) -> SentieonResult<Vec<Sample>> {
    if !args.sample_names.is_empty() && args.sample_names.len() != args.bams.len() {
        return Err(SentieonError::InvalidArgument(format!(
            "Got {} sample names for {} BAM files",
            args.sample_names.len(),
            args.bams.len()
        )));
    }
    let mut samples = Vec::with_capacity(args.bams.len());
    for (i, bam) in args.bams.iter().enumerate() {
        validate_file_readable(bam)?;
        samples.push(Sample::new(sample_name(bam, args.sample_names.get(i))?));
    }
    Ok(with_targets(samples, &args.common))
}

fn with_targets(samples: Vec<Sample>, common: &CommonArgs) -> Vec<Sample> {
    match &common.variant_regions {
        Some(bed) => samples
            .into_iter()
            .map(|s| s.with_variant_regions(bed))
            .collect(),
        None => samples,
    }
}

fn run() -> SentieonResult<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_secs()
        .init();

    let resources = load_resources(args.config.as_deref(), args.keyfile.as_deref())?;
    let sentieon = Sentieon::new(resources);

    let out_file = match &args.command {
        Command::Tnscope(paired) => {
            let common = &paired.common;
            validate_common(common)?;
            let (bams, samples) = paired_inputs(paired)?;
            let assoc = AssocFiles {
                dbsnp: common.dbsnp.clone(),
                cosmic: None,
            };
            sentieon.run_tnscope(
                &bams,
                &samples,
                &common.reference,
                &assoc,
                common.region.as_ref(),
                common.output.as_deref(),
            )?
        }
        Command::Tnhaplotyper(tn) => {
            let common = &tn.paired.common;
            validate_common(common)?;
            let (bams, samples) = paired_inputs(&tn.paired)?;
            let assoc = AssocFiles {
                dbsnp: common.dbsnp.clone(),
                cosmic: tn.cosmic.clone(),
            };
            sentieon.run_tnhaplotyper(
                &bams,
                &samples,
                &common.reference,
                &assoc,
                common.region.as_ref(),
                common.output.as_deref(),
            )?
        }
        Command::Haplotyper(germline) => {
            let common = &germline.common;
            validate_common(common)?;
            let samples = germline_inputs(germline)?;
            let assoc = AssocFiles {
                dbsnp: common.dbsnp.clone(),
                cosmic: None,
            };
            sentieon.run_haplotyper(
                &germline.bams,
                &samples,
                &common.reference,
                &assoc,
                common.region.as_ref(),
                common.output.as_deref(),
            )?
        }
    };

    println!("{}", out_file.display());
    Ok(())
}

fn validate_common(common: &CommonArgs) -> SentieonResult<()> {
    validate_file_readable(&common.reference)?;
    if let Some(bed) = &common.variant_regions {
        validate_file_readable(bed)?;
    }
    Ok(())
}

/// Handle application errors and provide user-friendly messages
fn handle_error(error: SentieonError) -> ! {
    match error {
        SentieonError::Config(msg) => {
            eprintln!("Error: Invalid configuration: {}", msg);
            eprintln!("Set the license with --keyfile, SENTIEON_LICENSE or the YAML configuration.");
        }
        SentieonError::InvalidLicenseValue(msg) => {
            eprintln!("Error: {}", msg);
            eprintln!("keyfile must be a license string or a mapping of variables to export.");
        }
        SentieonError::Precondition(msg) => {
            eprintln!("Error: {}", msg);
        }
        ref e @ SentieonError::Execution { .. } => {
            eprintln!("Error: {}", e);
            eprintln!("No output was written; rerun once the problem is fixed.");
        }
        SentieonError::FileNotFound(path) => {
            eprintln!("Error: File not found: {}", path);
            eprintln!("Please check that the file exists and is readable.");
        }
        SentieonError::InvalidRegion(msg) => {
            eprintln!("Error: Invalid region: {}", msg);
            eprintln!("Please check the --region value and the target BED file.");
        }
        SentieonError::Htslib(ref e) => {
            eprintln!("Error: BAM processing error: {}", e);
            eprintln!("Please check that your BAM files are valid, or pass sample names explicitly.");
        }
        ref e @ (SentieonError::Io(_)
        | SentieonError::Csv(_)
        | SentieonError::Yaml(_)
        | SentieonError::InvalidArgument(_)
        | SentieonError::MissingOutput(_)) => {
            eprintln!("Error: {}", e);
        }
    }
    std::process::exit(1);
}

fn main() {
    if let Err(e) = run() {
        handle_error(e);
    }
}
