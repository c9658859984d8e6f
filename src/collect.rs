//! Per-method collection: re-key native result rows onto the canonical index
//! and put them on the liability scale.

use std::collections::HashSet;
use std::io::BufRead;

use regex::Regex;
use tracing::warn;

use crate::error::{CollectError, Result};
use crate::region::CoordinateIndex;
use crate::types::{Estimate, Interval, KeyKind, Method};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeKey {
    Gene(String),
    Interval(Interval),
}

impl NativeKey {
    fn kind(&self) -> KeyKind {
        match self {
            NativeKey::Gene(_) => KeyKind::GeneName,
            NativeKey::Interval(_) => KeyKind::Interval,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NativeRow {
    pub key: NativeKey,
    pub h2: Option<f64>,
    pub se: Option<f64>,
}

/// One method's result table for one phenotype, statistics already mapped
/// onto `h2`/`se`.
#[derive(Debug, Clone)]
pub struct MethodTable {
    pub method: Method,
    pub phenotype: String,
    pub rows: Vec<NativeRow>,
}

/// What to do with a native key that the reference table does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlignPolicy {
    #[default]
    Warn,
    Strict,
}

/// Genes a method reported it could not estimate.
#[derive(Debug, Clone, Default)]
pub struct Exclusions {
    genes: HashSet<String>,
}

impl Exclusions {
    pub fn new<I, S>(genes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            genes: genes.into_iter().map(Into::into).collect(),
        }
    }

    /// Scans a GBAT `calc_genes_reml.log` stream for
    /// `Warning, Gene/Chunk <name> is excluded` lines.
    pub fn from_gbat_log<R: BufRead>(reader: R) -> Result<Self> {
        let pattern = Regex::new(r"^Warning, Gene/Chunk (.+) is excluded")
            .map_err(|e| CollectError::Parse(e.to_string()))?;
        let mut genes = HashSet::new();
        for line in reader.lines() {
            let line = line?;
            if let Some(caps) = pattern.captures(&line) {
                let name = caps[1].trim();
                let name = name
                    .strip_prefix('(')
                    .and_then(|n| n.strip_suffix(')'))
                    .unwrap_or(name);
                genes.insert(name.to_string());
            }
        }
        Ok(Self { genes })
    }

    pub fn contains(&self, gene: &str) -> bool {
        self.genes.contains(gene)
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

pub fn collect(
    table: &MethodTable,
    exclusions: &Exclusions,
    index: &CoordinateIndex,
    coefficient: f64,
    policy: AlignPolicy,
) -> Result<Vec<Estimate>> {
    let method = table.method;
    let run_prefix = Regex::new(r"\d+_").map_err(|e| CollectError::Parse(e.to_string()))?;
    let mut out = Vec::with_capacity(table.rows.len());
    let mut dropped = 0usize;
    let mut excluded = 0usize;

    for row in &table.rows {
        if row.key.kind() != method.key_kind() {
            return Err(CollectError::InvalidArgument(format!(
                "{method} rows for {} carry a {:?} key, expected {:?}",
                table.phenotype,
                row.key.kind(),
                method.key_kind()
            )));
        }

        let (found, is_excluded) = match &row.key {
            NativeKey::Gene(raw) => {
                // GBAT prefixes gene names with its run index (`12_BRCA1`).
                let name = if method == Method::Gbat {
                    run_prefix.replace_all(raw, "").into_owned()
                } else {
                    raw.clone()
                };
                let excluded = exclusions.contains(raw) || exclusions.contains(&name);
                (index.lookup_gene(&name), excluded)
            }
            NativeKey::Interval(iv) => (
                index.lookup_interval(&iv.chromosome, iv.start, iv.end),
                false,
            ),
        };
        let Some(key) = found else {
            if policy == AlignPolicy::Strict {
                return Err(CollectError::MissingRegion(format!(
                    "{} reported by {method} for {}",
                    describe(&row.key),
                    table.phenotype
                )));
            }
            dropped += 1;
            warn!(
                "{method} {}: {} has no matching region; row dropped",
                table.phenotype,
                describe(&row.key)
            );
            continue;
        };

        let mut h2 = row.h2.filter(|v| !v.is_nan());
        let mut se = row.se.filter(|v| !v.is_nan());
        if is_excluded || (method.couples_missing_se() && se.is_none()) {
            excluded += 1;
            h2 = None;
            se = None;
        }

        out.push(Estimate {
            key: key.clone(),
            method,
            phenotype: table.phenotype.clone(),
            h2: h2.map(|v| v * coefficient),
            se: se.map(|v| v * coefficient),
        });
    }

    if dropped > 0 {
        warn!(
            "{method} {}: {dropped} of {} rows could not be aligned to the region table",
            table.phenotype,
            table.rows.len()
        );
    }
    if excluded > 0 {
        tracing::debug!("{method} {}: {excluded} rows set to missing", table.phenotype);
    }
    Ok(out)
}

fn describe(key: &NativeKey) -> String {
    match key {
        NativeKey::Gene(name) => format!("gene {name}"),
        NativeKey::Interval(interval) => format!("region {interval}"),
    }
}
