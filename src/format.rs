//! Input preparation for the three estimators: region lists for HESS/LDAK
//! and summary statistics for KGGSEE, HESS and LDAK.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::{info, warn};

use crate::error::CollectError;
use crate::io::open_text;
use crate::qc::check_file_exists;
use crate::sources::read_regions;
use crate::types::normalize_chromosome;

pub const DEFAULT_SITE_VCF: &str = "metadata/auto_coding_with10kb_flk.vcf.gz";

/// Autosomes that get their own HESS region file.
const AUTOSOMES: std::ops::RangeInclusive<u8> = 1..=22;

#[derive(Debug, Clone)]
pub struct FormatRegionConfig {
    pub region: PathBuf,
    pub out_prefix: Option<PathBuf>,
}

/// Paths written by [`format_region`].
#[derive(Debug, Clone)]
pub struct RegionOutputs {
    pub ldak: PathBuf,
    pub hess: Vec<PathBuf>,
}

pub fn format_region(config: &FormatRegionConfig) -> Result<RegionOutputs> {
    check_file_exists(&config.region, "region")?;
    let prefix = config
        .out_prefix
        .clone()
        .unwrap_or_else(|| config.region.with_extension(""));
    let regions = read_regions(&config.region)?;
    info!("Read {} regions from {}", regions.len(), config.region.display());

    let ldak = suffixed(&prefix, "ldak");
    let mut out = create(&ldak)?;
    for r in &regions {
        writeln!(out, "{}\t{}\t{}\t{}", r.gene_id, r.chromosome, r.start, r.end)?;
    }
    out.flush()?;

    let mut hess = Vec::new();
    for chrom in AUTOSOMES {
        let label = chrom.to_string();
        let path = suffixed(&prefix, &format!("hess.{chrom}"));
        let mut out = create(&path)?;
        writeln!(out, "chr\tstart\tstop")?;
        for r in regions.iter().filter(|r| r.chromosome == label) {
            writeln!(out, "chr{}\t{}\t{}", r.chromosome, r.start, r.end)?;
        }
        out.flush()?;
        hess.push(path);
    }
    info!("Wrote {} and {} HESS region files", ldak.display(), hess.len());
    Ok(RegionOutputs { ldak, hess })
}

#[derive(Debug, Clone)]
pub struct FormatSumstatConfig {
    pub from_neale: PathBuf,
    pub vcf: PathBuf,
    pub out_prefix: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SumstatOutputs {
    pub kggsee: PathBuf,
    pub hess: PathBuf,
    pub ldak: PathBuf,
    pub written: usize,
    pub unmatched: usize,
}

#[derive(Debug, Clone)]
struct Site {
    chrom: String,
    pos: u64,
    snp: String,
    a1: String,
    a2: String,
}

#[derive(Debug, Clone)]
struct GwasRecord {
    n: String,
    z: String,
    p: String,
}

pub fn format_sumstat(config: &FormatSumstatConfig) -> Result<SumstatOutputs> {
    check_file_exists(&config.vcf, "vcf")?;
    check_file_exists(&config.from_neale, "from-neale")?;

    info!("Read {}", config.vcf.display());
    let sites = read_sites(&config.vcf)?;
    let mut wanted: HashMap<(String, u64), Vec<usize>> = HashMap::new();
    for (i, site) in sites.iter().enumerate() {
        wanted
            .entry((site.chrom.clone(), site.pos))
            .or_default()
            .push(i);
    }

    info!("Read {} and extract SNPs", config.from_neale.display());
    let records = read_neale(&config.from_neale, &wanted, sites.len())?;

    let kggsee = suffixed(&config.out_prefix, "kggsee.gz");
    let hess = suffixed(&config.out_prefix, "hess.gz");
    let ldak = suffixed(&config.out_prefix, "ldak");

    let mut kggsee_out = BufWriter::new(GzEncoder::new(
        File::create(&kggsee).with_context(|| format!("create {}", kggsee.display()))?,
        Compression::default(),
    ));
    let mut hess_out = BufWriter::new(GzEncoder::new(
        File::create(&hess).with_context(|| format!("create {}", hess.display()))?,
        Compression::default(),
    ));
    let mut ldak_out = create(&ldak)?;
    writeln!(kggsee_out, "CHR\tBP\tP\tN")?;
    writeln!(hess_out, "CHR\tBP\tSNP\tA1\tA2\tZ\tN")?;
    writeln!(ldak_out, "Predictor\tA1\tA2\tn\tZ")?;

    let mut written = 0usize;
    let mut unmatched = 0usize;
    for (i, site) in sites.iter().enumerate() {
        let Some(rec) = &records[i] else {
            unmatched += 1;
            continue;
        };
        let (chr, bp) = (&site.chrom, site.pos);
        writeln!(kggsee_out, "{chr}\t{bp}\t{}\t{}", rec.p, rec.n)?;
        writeln!(
            hess_out,
            "{chr}\t{bp}\t{}\t{}\t{}\t{}\t{}",
            site.snp, site.a1, site.a2, rec.z, rec.n
        )?;
        writeln!(ldak_out, "{}\t{}\t{}\t{}\t{}", site.snp, site.a1, site.a2, rec.n, rec.z)?;
        written += 1;
    }
    kggsee_out
        .into_inner()
        .map_err(|e| e.into_error())?
        .finish()?;
    hess_out.into_inner().map_err(|e| e.into_error())?.finish()?;
    ldak_out.flush()?;

    if unmatched > 0 {
        warn!("{unmatched} sites have no association result and were skipped");
    }
    info!("Wrote {written} SNPs to KGGSEE, HESS and LDAK inputs");
    Ok(SumstatOutputs {
        kggsee,
        hess,
        ldak,
        written,
        unmatched,
    })
}

/// Site list: CHROM, POS, ID, REF, ALT; `#` lines skipped. REF becomes A2
/// and ALT A1.
fn read_sites(path: &Path) -> Result<Vec<Site>> {
    let reader = open_text(path)?;
    let mut sites = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 5 {
            return Err(CollectError::Parse(format!(
                "{} line {}: expected at least 5 columns",
                path.display(),
                lineno + 1
            ))
            .into());
        }
        let pos = fields[1].parse::<u64>().map_err(|_| {
            CollectError::Parse(format!(
                "{} line {}: bad position {}",
                path.display(),
                lineno + 1,
                fields[1]
            ))
        })?;
        sites.push(Site {
            chrom: normalize_chromosome(fields[0]),
            pos,
            snp: fields[2].to_string(),
            a2: fields[3].to_string(),
            a1: fields[4].to_string(),
        });
    }
    Ok(sites)
}

/// Streams the Neale-lab table and keeps the first record at each wanted
/// site; the result is indexed by site.
fn read_neale(
    path: &Path,
    wanted: &HashMap<(String, u64), Vec<usize>>,
    n_sites: usize,
) -> Result<Vec<Option<GwasRecord>>> {
    let mut reader = open_text(path)?;
    let mut header = String::new();
    reader.read_line(&mut header)?;
    let columns: Vec<&str> = header.trim_end().split('\t').collect();
    let col = |name: &str| {
        columns
            .iter()
            .position(|c| *c == name)
            .ok_or_else(|| CollectError::MissingColumn(format!("{name} in {}", path.display())))
    };
    let variant = col("variant")?;
    let n = col("n_complete_samples")?;
    let tstat = col("tstat")?;
    let pval = col("pval")?;
    let width = [variant, n, tstat, pval].into_iter().max().unwrap_or(0) + 1;

    let mut out: Vec<Option<GwasRecord>> = vec![None; n_sites];
    let mut duplicates = 0usize;
    for line in reader.lines() {
        let line = line?;
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < width || fields[variant].starts_with('X') {
            continue;
        }
        let mut parts = fields[variant].split(':');
        let (Some(chrom), Some(pos)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Ok(pos) = pos.parse::<u64>() else {
            continue;
        };
        let Some(slots) = wanted.get(&(normalize_chromosome(chrom), pos)) else {
            continue;
        };
        if out[slots[0]].is_some() {
            duplicates += 1;
            continue;
        }
        let record = GwasRecord {
            n: fields[n].to_string(),
            z: fields[tstat].to_string(),
            p: fields[pval].to_string(),
        };
        for &slot in slots {
            out[slot] = Some(record.clone());
        }
    }
    if duplicates > 0 {
        warn!("{duplicates} additional records at already-seen sites ignored");
    }
    Ok(out)
}

fn suffixed(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = prefix.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    Ok(BufWriter::new(file))
}
