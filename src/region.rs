//! Genomic regions and `--interval` resolution

use crate::bed::{merge_intervals, read_bed, write_bed, BedInterval};
use crate::transaction::file_transaction;
use crate::utils::{file_uptodate, replace_extension};
use crate::{SentieonError, SentieonResult};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A region to restrict calling to. Span coordinates are 0-based, half-open.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Region {
    Contig(String),
    Span { chrom: String, start: u64, end: u64 },
}

impl Region {
    pub fn span(chrom: impl Into<String>, start: u64, end: u64) -> Self {
        Region::Span {
            chrom: chrom.into(),
            start,
            end,
        }
    }

    pub fn chrom(&self) -> &str {
        match self {
            Region::Contig(chrom) => chrom,
            Region::Span { chrom, .. } => chrom,
        }
    }

    /// Region in the `chrom:start-end` syntax Sentieon accepts (1-based)
    pub fn to_sentieon(&self) -> String {
        match self {
            Region::Contig(chrom) => chrom.clone(),
            Region::Span { chrom, start, end } => format!("{}:{}-{}", chrom, start + 1, end),
        }
    }

    /// Region as a file name fragment: `chr1` or `chr1_1000_2000`
    pub fn file_tag(&self) -> String {
        let tag = match self {
            Region::Contig(chrom) => chrom.clone(),
            Region::Span { chrom, start, end } => format!("{}_{}_{}", chrom, start, end),
        };
        tag.chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
            .collect()
    }

    fn overlap(&self, interval: &BedInterval) -> Option<BedInterval> {
        if interval.chrom != self.chrom() {
            return None;
        }
        match self {
            Region::Contig(_) => Some(interval.clone()),
            Region::Span { start, end, .. } => {
                let clipped_start = interval.start.max(*start);
                let clipped_end = interval.end.min(*end);
                (clipped_start < clipped_end)
                    .then(|| BedInterval::new(interval.chrom.clone(), clipped_start, clipped_end))
            }
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_sentieon())
    }
}

impl FromStr for Region {
    type Err = SentieonError;

    /// Parse `chr1` or `chr1:1,001-2,000` (1-based, inclusive)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SentieonError::InvalidRegion("empty region".to_string()));
        }
        let (chrom, range) = match s.rsplit_once(':') {
            Some((chrom, range)) if range.contains('-') => (chrom, range),
            _ => return Ok(Region::Contig(s.to_string())),
        };
        let (start, end) = range.split_once('-').ok_or_else(|| {
            SentieonError::InvalidRegion(format!("Could not parse region {}", s))
        })?;
        let parse = |v: &str| -> SentieonResult<u64> {
            v.replace([',', '_'], "")
                .parse::<u64>()
                .map_err(|_| SentieonError::InvalidRegion(format!("Invalid coordinate in {}", s)))
        };
        let start = parse(start)?;
        let end = parse(end)?;
        if chrom.is_empty() || start == 0 || end < start {
            return Err(SentieonError::InvalidRegion(format!(
                "Region must be chrom:start-end with 1 <= start <= end, got {}",
                s
            )));
        }
        Ok(Region::span(chrom, start - 1, end))
    }
}

/// Outcome of reconciling a target BED with a requested region
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionTarget {
    /// Call over the whole genome
    Whole,
    File(PathBuf),
    Region(Region),
}

/// Restrict `variant_regions` to `region`.
///
/// Without a region the BED is used unchanged, without a BED the region is.
/// When both are given the overlap is written next to `out_file` as
/// `<base>-<region>-regions.bed`, refreshed when the BED changes; an empty
/// overlap falls back to the region itself.
pub fn subset_variant_regions(
    variant_regions: Option<&Path>,
    region: Option<&Region>,
    out_file: &Path,
) -> SentieonResult<RegionTarget> {
    let (bed, region) = match (variant_regions, region) {
        (None, None) => return Ok(RegionTarget::Whole),
        (Some(bed), None) => return Ok(RegionTarget::File(bed.to_path_buf())),
        (None, Some(region)) => return Ok(RegionTarget::Region(region.clone())),
        (Some(bed), Some(region)) => (bed, region),
    };

    let subset_file = replace_extension(out_file, &format!("-{}-regions.bed", region.file_tag()));
    if !file_uptodate(&subset_file, bed) {
        let intervals = read_bed(bed)?;
        let mut subset: Vec<BedInterval> =
            intervals.iter().filter_map(|i| region.overlap(i)).collect();
        if let Region::Span { .. } = region {
            subset = merge_intervals(&subset);
        }
        log::debug!(
            "{} of {} target regions overlap {}",
            subset.len(),
            intervals.len(),
            region
        );
        file_transaction(&subset_file, |tx_out| write_bed(&subset, tx_out))?;
    }

    if std::fs::metadata(&subset_file)?.len() == 0 {
        Ok(RegionTarget::Region(region.clone()))
    } else {
        Ok(RegionTarget::File(subset_file))
    }
}

/// `--interval` arguments for a resolved target
pub fn interval_args(target: &RegionTarget) -> Vec<String> {
    match target {
        RegionTarget::Whole => Vec::new(),
        RegionTarget::File(path) => {
            if !path.is_file() {
                log::warn!("Interval file {} does not exist", path.display());
            }
            vec!["--interval".to_string(), path.to_string_lossy().to_string()]
        }
        RegionTarget::Region(region) => vec!["--interval".to_string(), region.to_sentieon()],
    }
}

/// Resolve the interval restriction for a run into its argument list
pub fn resolve_interval(
    variant_regions: Option<&Path>,
    region: Option<&Region>,
    out_file: &Path,
) -> SentieonResult<Vec<String>> {
    let target = subset_variant_regions(variant_regions, region, out_file)?;
    Ok(interval_args(&target))
}

/// Interval restriction rendered as a command fragment, empty when calling
/// genome wide
pub fn get_interval(
    variant_regions: Option<&Path>,
    region: Option<&Region>,
    out_file: &Path,
) -> SentieonResult<String> {
    Ok(resolve_interval(variant_regions, region, out_file)?.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_regions() {
        assert_eq!(
            "chr1".parse::<Region>().unwrap(),
            Region::Contig("chr1".to_string())
        );
        assert_eq!(
            "chr1:1,001-2,000".parse::<Region>().unwrap(),
            Region::span("chr1", 1000, 2000)
        );
        assert_eq!(
            "HLA-A*01:01:01:01".parse::<Region>().unwrap(),
            Region::Contig("HLA-A*01:01:01:01".to_string())
        );
        assert!("chr1:0-10".parse::<Region>().is_err());
        assert!("chr1:20-10".parse::<Region>().is_err());
        assert!("chr1:a-10".parse::<Region>().is_err());
        assert!("".parse::<Region>().is_err());
    }

    #[test]
    fn test_to_sentieon() {
        assert_eq!(Region::span("chr2", 0, 500).to_sentieon(), "chr2:1-500");
        assert_eq!(Region::Contig("chrM".to_string()).to_sentieon(), "chrM");
    }

    #[test]
    fn test_no_restriction() {
        let out = Path::new("/tmp/out-variants.vcf.gz");
        assert_eq!(subset_variant_regions(None, None, out).unwrap(), RegionTarget::Whole);
        assert_eq!(get_interval(None, None, out).unwrap(), "");
    }

    #[test]
    fn test_existing_bed_becomes_interval_path() {
        let dir = tempdir().unwrap();
        let bed = dir.path().join("targets.bed");
        std::fs::write(&bed, "chr1\t0\t100\n").unwrap();
        let out = dir.path().join("s1-variants.vcf.gz");

        assert_eq!(
            get_interval(Some(bed.as_path()), None, &out).unwrap(),
            format!("--interval {}", bed.display())
        );
    }

    #[test]
    fn test_region_only_uses_formatted_region() {
        let out = Path::new("/tmp/out-variants.vcf.gz");
        let region = Region::span("chr3", 99, 200);
        assert_eq!(
            get_interval(None, Some(&region), out).unwrap(),
            "--interval chr3:100-200"
        );
    }

    #[test]
    fn test_subset_bed_by_span() {
        let dir = tempdir().unwrap();
        let bed = dir.path().join("targets.bed");
        std::fs::write(&bed, "chr1\t0\t100\nchr1\t150\t400\nchr1\t380\t500\nchr2\t0\t100\n").unwrap();
        let out = dir.path().join("s1-variants.vcf.gz");
        let region = Region::span("chr1", 50, 450);

        let target = subset_variant_regions(Some(bed.as_path()), Some(&region), &out).unwrap();
        let subset_file = dir.path().join("s1-variants-chr1_50_450-regions.bed");
        assert_eq!(target, RegionTarget::File(subset_file.clone()));
        assert_eq!(
            read_bed(&subset_file).unwrap(),
            vec![BedInterval::new("chr1", 50, 100), BedInterval::new("chr1", 150, 450)]
        );
        assert_eq!(
            interval_args(&target),
            vec!["--interval".to_string(), subset_file.to_string_lossy().to_string()]
        );
    }

    #[test]
    fn test_file_tag() {
        assert_eq!(Region::span("chr1", 50, 450).file_tag(), "chr1_50_450");
        assert_eq!(
            Region::Contig("HLA-A*01:01".to_string()).file_tag(),
            "HLA-A_01_01"
        );
    }

    #[test]
    fn test_rerun_with_another_region() {
        let dir = tempdir().unwrap();
        let bed = dir.path().join("targets.bed");
        std::fs::write(&bed, "chr1\t0\t100\nchr2\t0\t100\n").unwrap();
        let out = dir.path().join("s1-variants.vcf.gz");

        let first = subset_variant_regions(
            Some(bed.as_path()),
            Some(&Region::Contig("chr1".to_string())),
            &out,
        )
        .unwrap();
        let second = subset_variant_regions(
            Some(bed.as_path()),
            Some(&Region::Contig("chr2".to_string())),
            &out,
        )
        .unwrap();

        match (first, second) {
            (RegionTarget::File(a), RegionTarget::File(b)) => {
                assert_ne!(a, b);
                assert_eq!(read_bed(&a).unwrap(), vec![BedInterval::new("chr1", 0, 100)]);
                assert_eq!(read_bed(&b).unwrap(), vec![BedInterval::new("chr2", 0, 100)]);
            }
            other => panic!("expected two subset files, got {:?}", other),
        }
    }

    #[test]
    fn test_subset_bed_by_contig() {
        let dir = tempdir().unwrap();
        let bed = dir.path().join("targets.bed");
        std::fs::write(&bed, "chr1\t0\t100\nchr2\t10\t20\nchr2\t30\t40\n").unwrap();
        let out = dir.path().join("s1-variants.vcf.gz");
        let region = Region::Contig("chr2".to_string());

        let target = subset_variant_regions(Some(bed.as_path()), Some(&region), &out).unwrap();
        match target {
            RegionTarget::File(path) => assert_eq!(
                read_bed(&path).unwrap(),
                vec![BedInterval::new("chr2", 10, 20), BedInterval::new("chr2", 30, 40)]
            ),
            other => panic!("expected subset file, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_overlap_falls_back_to_region() {
        let dir = tempdir().unwrap();
        let bed = dir.path().join("targets.bed");
        std::fs::write(&bed, "chr1\t0\t100\n").unwrap();
        let out = dir.path().join("s1-variants.vcf.gz");
        let region = Region::span("chr5", 0, 1000);

        assert_eq!(
            get_interval(Some(bed.as_path()), Some(&region), &out).unwrap(),
            "--interval chr5:1-1000"
        );
    }
}
