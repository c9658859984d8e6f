//! Readers for the native inputs: region reference, phenotype metadata,
//! per-method result files and GBAT exclusion logs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polars::prelude::*;

use crate::collect::{Exclusions, MethodTable, NativeKey, NativeRow};
use crate::error::CollectError;
use crate::io::{
    ensure_column, f64_values, open_text, read_headerless_table, read_table, string_values,
    u64_values,
};
use crate::types::{Interval, Method, Phenotype, Region};

/// File holding `method`'s results for phenotype `abbr` under `result_dir`.
pub fn method_result_path(result_dir: &Path, method: Method, abbr: &str) -> PathBuf {
    match method {
        Method::Ehe => result_dir.join(format!("{abbr}.ehe.gene.pvalue.txt")),
        Method::Hess => result_dir.join(format!("{abbr}.hess.step2.txt")),
        Method::Gbat => result_dir.join(format!("{abbr}.gbat")).join("remls.all"),
    }
}

pub fn gbat_log_path(result_dir: &Path, abbr: &str) -> PathBuf {
    result_dir
        .join(format!("{abbr}.gbat"))
        .join("calc_genes_reml.log")
}

/// Every file a collection run over `phenotypes` needs from `result_dir`.
pub fn required_result_files(result_dir: &Path, phenotypes: &[String]) -> Vec<PathBuf> {
    let mut out = Vec::with_capacity(phenotypes.len() * 4);
    for abbr in phenotypes {
        for method in Method::ALL {
            out.push(method_result_path(result_dir, method, abbr));
        }
        out.push(gbat_log_path(result_dir, abbr));
    }
    out
}

/// Region table columns: chromosome, start, end, gene; no header.
pub fn read_regions(path: &Path) -> Result<Vec<Region>> {
    let df = read_headerless_table(path)?;
    let cols = df.columns();
    if cols.len() < 4 {
        return Err(CollectError::MissingColumn(format!(
            "{} has {} columns, expected chromosome, start, end, gene",
            path.display(),
            cols.len()
        ))
        .into());
    }
    let chrom = string_values(&cols[0])?;
    let start = u64_values(&cols[1])?;
    let end = u64_values(&cols[2])?;
    let gene = string_values(&cols[3])?;

    let mut regions = Vec::with_capacity(df.height());
    for (i, (((c, s), e), g)) in chrom.into_iter().zip(start).zip(end).zip(gene).enumerate() {
        match (c, s, e, g) {
            (Some(c), Some(s), Some(e), Some(g)) => regions.push(Region::new(g, &c, s, e)),
            _ => {
                return Err(CollectError::Parse(format!(
                    "incomplete region on line {} of {}",
                    i + 1,
                    path.display()
                ))
                .into());
            }
        }
    }
    Ok(regions)
}

/// Looks up the `Prevalence` of each requested phenotype in the metadata
/// table (indexed by `Abbr`), in request order.
pub fn read_phenotypes(path: &Path, abbrs: &[String]) -> Result<Vec<Phenotype>> {
    let df = read_table(path)?;
    ensure_column(&df, "Abbr")?;
    ensure_column(&df, "Prevalence")?;
    let names = string_values(df.column("Abbr")?)?;
    let prevalence = f64_values(df.column("Prevalence")?)?;

    abbrs
        .iter()
        .map(|abbr| -> Result<Phenotype> {
            let row = names
                .iter()
                .position(|n| n.as_deref() == Some(abbr.as_str()))
                .ok_or_else(|| {
                    CollectError::InvalidArgument(format!(
                        "phenotype {abbr} not found in {}",
                        path.display()
                    ))
                })?;
            Ok(Phenotype {
                abbr: abbr.clone(),
                prevalence: prevalence[row],
            })
        })
        .collect()
}

pub fn read_method_table(method: Method, path: &Path, phenotype: &str) -> Result<MethodTable> {
    let df = read_table(path)?;
    let (h2_col, se_col) = method.native_columns();
    ensure_column(&df, h2_col)?;
    ensure_column(&df, se_col)?;
    let h2 = f64_values(df.column(h2_col)?)?;
    let se = f64_values(df.column(se_col)?)?;
    let keys = native_keys(method, &df).with_context(|| format!("read {}", path.display()))?;

    let total = keys.len();
    let rows: Vec<NativeRow> = keys
        .into_iter()
        .zip(h2)
        .zip(se)
        .filter_map(|((key, h2), se)| key.map(|key| NativeRow { key, h2, se }))
        .collect();
    if rows.len() < total {
        tracing::warn!(
            "{} rows without a usable key skipped in {}",
            total - rows.len(),
            path.display()
        );
    }
    Ok(MethodTable {
        method,
        phenotype: phenotype.to_string(),
        rows,
    })
}

fn native_keys(method: Method, df: &DataFrame) -> Result<Vec<Option<NativeKey>>> {
    match method {
        Method::Ehe | Method::Gbat => {
            let column = if method == Method::Ehe { "Gene" } else { "Gene_Name" };
            ensure_column(df, column)?;
            Ok(string_values(df.column(column)?)?
                .into_iter()
                .map(|g| g.map(NativeKey::Gene))
                .collect())
        }
        Method::Hess => {
            for column in ["chr", "start", "end"] {
                ensure_column(df, column)?;
            }
            let chrom = string_values(df.column("chr")?)?;
            let start = u64_values(df.column("start")?)?;
            let end = u64_values(df.column("end")?)?;
            Ok(chrom
                .into_iter()
                .zip(start)
                .zip(end)
                .map(|((c, s), e)| match (c, s, e) {
                    (Some(c), Some(s), Some(e)) => {
                        Some(NativeKey::Interval(Interval::new(&c, s, e)))
                    }
                    _ => None,
                })
                .collect())
        }
    }
}

pub fn read_gbat_exclusions(path: &Path) -> Result<Exclusions> {
    let reader = open_text(path)?;
    Exclusions::from_gbat_log(reader).with_context(|| format!("read {}", path.display()))
}
