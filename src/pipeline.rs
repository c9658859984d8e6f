//! End-to-end collection run: metadata and reference → per-method
//! collectors → merger → combined table on disk.

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use crate::collect::{AlignPolicy, Exclusions, collect};
use crate::io::{HeaderStyle, write_combined_table};
use crate::liability::LiabilityTable;
use crate::logging::RunLog;
use crate::merge::{CombinedTable, MethodEstimates, merge};
use crate::parallel::map_methods;
use crate::qc::{check_file_exists, check_files_exist, check_non_empty, check_unique};
use crate::region::CoordinateIndex;
use crate::sources::{
    gbat_log_path, method_result_path, read_gbat_exclusions, read_method_table, read_phenotypes,
    read_regions, required_result_files,
};
use crate::types::Method;

pub const DEFAULT_PHENOTYPE_TABLE: &str = "metadata/phenotype.tsv";
pub const DEFAULT_REGION_TABLE: &str = "metadata/auto_coding_with10kb_flk.region.kggsee";

#[derive(Debug, Clone)]
pub struct CollectConfig {
    pub result_dir: PathBuf,
    pub phenotypes: Vec<String>,
    pub out: PathBuf,
    pub phenotype_table: PathBuf,
    pub region_table: PathBuf,
    pub header: HeaderStyle,
    pub policy: AlignPolicy,
    pub cores: Option<usize>,
}

impl CollectConfig {
    pub fn new(result_dir: impl Into<PathBuf>, phenotypes: Vec<String>, out: impl Into<PathBuf>) -> Self {
        Self {
            result_dir: result_dir.into(),
            phenotypes,
            out: out.into(),
            phenotype_table: PathBuf::from(DEFAULT_PHENOTYPE_TABLE),
            region_table: PathBuf::from(DEFAULT_REGION_TABLE),
            header: HeaderStyle::default(),
            policy: AlignPolicy::default(),
            cores: None,
        }
    }
}

/// Collects, aligns and merges every method's estimates without writing
/// anything.
pub fn collect_estimates(config: &CollectConfig) -> Result<CombinedTable> {
    check_non_empty(&config.phenotypes, "phenotypes")?;
    check_unique(&config.phenotypes, "phenotypes")?;
    check_file_exists(&config.phenotype_table, "phenotype-table")?;
    check_file_exists(&config.region_table, "region-table")?;
    check_files_exist(
        &required_result_files(&config.result_dir, &config.phenotypes),
        "result-dir",
    )?;

    info!(
        "Read {} and {}",
        config.phenotype_table.display(),
        config.region_table.display()
    );
    let phenotypes = read_phenotypes(&config.phenotype_table, &config.phenotypes)?;
    let liability = LiabilityTable::from_phenotypes(&phenotypes)?;
    let index = CoordinateIndex::from_regions(&read_regions(&config.region_table)?)?;
    info!("{} regions in the reference table", index.len());

    let sets = map_methods(config.cores, &Method::ALL, |method| {
        collect_method(method, config, &index, &liability)
    })?;
    Ok(merge(&index, &sets, &config.phenotypes)?)
}

fn collect_method(
    method: Method,
    config: &CollectConfig,
    index: &CoordinateIndex,
    liability: &LiabilityTable,
) -> Result<MethodEstimates> {
    info!("Collect {method} estimates");
    let mut estimates = Vec::new();
    for abbr in &config.phenotypes {
        let path = method_result_path(&config.result_dir, method, abbr);
        let table = read_method_table(method, &path, abbr)?;
        let exclusions = match method {
            Method::Gbat => read_gbat_exclusions(&gbat_log_path(&config.result_dir, abbr))?,
            Method::Ehe | Method::Hess => Exclusions::default(),
        };
        if !exclusions.is_empty() {
            info!("{method} {abbr}: {} genes excluded by the method", exclusions.len());
        }
        estimates.extend(collect(
            &table,
            &exclusions,
            index,
            liability.coefficient(abbr),
            config.policy,
        )?);
    }
    Ok(MethodEstimates { method, estimates })
}

/// Runs the collection and writes the combined table to `config.out`.
pub fn run(config: &CollectConfig) -> Result<CombinedTable> {
    let mut log = RunLog::create_for(&config.out)?;
    log.line(&format!(
        "Collect heritability estimates of {} phenotype(s): {}",
        config.phenotypes.len(),
        config.phenotypes.join(",")
    ))?;
    let table = match collect_estimates(config) {
        Ok(table) => table,
        Err(err) => {
            log.warn(&format!("Collection failed: {err:#}"))?;
            return Err(err);
        }
    };
    log.line(&format!(
        "Write the results of all methods to {}",
        config.out.display()
    ))?;
    write_combined_table(&table, &config.out, config.header)?;
    log.line(&format!(
        "Done. {} genes x {} columns; log written to {}",
        table.height(),
        table.width(),
        log.path().display()
    ))?;
    Ok(table)
}
