//! BED interval reading, writing and merging

use crate::transaction::file_transaction;
use crate::utils::{file_uptodate, is_gzipped, replace_extension, splitext_plus};
use crate::{SentieonError, SentieonResult};
use flate2::read::MultiGzDecoder;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// A 0-based, half-open genomic interval
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BedInterval {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
}

impl BedInterval {
    pub fn new(chrom: impl Into<String>, start: u64, end: u64) -> Self {
        Self {
            chrom: chrom.into(),
            start,
            end,
        }
    }
}

/// Read intervals from a plain or gzip-compressed BED file.
///
/// Header lines (`#`, `track`, `browser`) are skipped and columns past the
/// third are ignored.
pub fn read_bed<P: AsRef<Path>>(path: P) -> SentieonResult<Vec<BedInterval>> {
    let file = File::open(&path)
        .map_err(|_| SentieonError::FileNotFound(path.as_ref().to_string_lossy().to_string()))?;

    let reader: Box<dyn BufRead> = if is_gzipped(&path)? {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .quoting(false)
        .from_reader(reader);

    let mut intervals = Vec::new();
    for result in csv_reader.records() {
        let record = result?;
        let chrom = match record.get(0) {
            Some(c) if !c.trim().is_empty() => c.trim(),
            _ => continue,
        };
        if chrom.starts_with("track") || chrom.starts_with("browser") {
            continue;
        }
        if record.len() < 3 {
            return Err(SentieonError::InvalidRegion(format!(
                "BED line with fewer than three columns in {}: {:?}",
                path.as_ref().display(),
                record
            )));
        }
        let start = parse_coord(&record[1], &path)?;
        let end = parse_coord(&record[2], &path)?;
        intervals.push(BedInterval::new(chrom, start, end));
    }

    log::debug!(
        "Read {} intervals from {}",
        intervals.len(),
        path.as_ref().display()
    );
    Ok(intervals)
}

fn parse_coord<P: AsRef<Path>>(field: &str, path: P) -> SentieonResult<u64> {
    field.trim().parse::<u64>().map_err(|_| {
        SentieonError::InvalidRegion(format!(
            "Invalid BED coordinate '{}' in {}",
            field,
            path.as_ref().display()
        ))
    })
}

/// Write three-column BED
pub fn write_bed<P: AsRef<Path>>(intervals: &[BedInterval], path: P) -> SentieonResult<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_path(&path)?;

    for interval in intervals {
        let start = interval.start.to_string();
        let end = interval.end.to_string();
        writer.write_record([interval.chrom.as_str(), start.as_str(), end.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Sort by chromosome (in order of first appearance) and start, then join
/// overlapping or abutting intervals.
pub fn merge_intervals(intervals: &[BedInterval]) -> Vec<BedInterval> {
    let mut chrom_order: HashMap<&str, usize> = HashMap::new();
    for interval in intervals {
        let next = chrom_order.len();
        chrom_order.entry(interval.chrom.as_str()).or_insert(next);
    }

    let mut sorted: Vec<&BedInterval> = intervals.iter().collect();
    sorted.sort_by_key(|i| (chrom_order[i.chrom.as_str()], i.start, i.end));

    let mut merged: Vec<BedInterval> = Vec::new();
    for interval in sorted {
        match merged.last_mut() {
            Some(last) if last.chrom == interval.chrom && interval.start <= last.end => {
                last.end = last.end.max(interval.end);
            }
            _ => merged.push(interval.clone()),
        }
    }
    merged
}

/// Merge overlapping regions of `bed` for the call writing `out_file`.
///
/// The merged intervals go to `<out base>-<bed name>-merged.bed` and are
/// rewritten whenever `bed` is newer. Returns `None` when `bed` holds no
/// intervals, so calling covers the whole genome.
pub fn merge_overlaps(bed: Option<&Path>, out_file: &Path) -> SentieonResult<Option<PathBuf>> {
    let bed = match bed {
        Some(b) => b,
        None => return Ok(None),
    };
    let (bed_base, _) = splitext_plus(bed);
    let name = bed_base.file_name().ok_or_else(|| {
        SentieonError::InvalidArgument(format!("Not a BED file path: {}", bed.display()))
    })?;
    let merged_file = replace_extension(
        out_file,
        &format!("-{}-merged.bed", name.to_string_lossy()),
    );

    if !file_uptodate(&merged_file, bed) {
        let intervals = read_bed(bed)?;
        let merged = merge_intervals(&intervals);
        log::info!(
            "Merged {} regions into {} for {}",
            intervals.len(),
            merged.len(),
            bed.display()
        );
        file_transaction(&merged_file, |tx_out| write_bed(&merged, tx_out))?;
    }

    if std::fs::metadata(&merged_file)?.len() == 0 {
        log::warn!("No target regions in {}, calling genome wide", bed.display());
        return Ok(None);
    }
    Ok(Some(merged_file))
}
