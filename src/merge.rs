//! Outer join of all aligned estimate sets onto the canonical index.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::error::{CollectError, Result};
use crate::region::CoordinateIndex;
use crate::types::{Estimate, GeneKey, Method, Statistic};

/// All estimates one method produced, across phenotypes.
#[derive(Debug, Clone)]
pub struct MethodEstimates {
    pub method: Method,
    pub estimates: Vec<Estimate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnKey {
    pub phenotype: String,
    pub method: Method,
    pub statistic: Statistic,
}

/// Wide table: one row per canonical key, one column per
/// `(phenotype, method, statistic)`. `None` cells are missing.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedTable {
    rows: Vec<GeneKey>,
    columns: Vec<ColumnKey>,
    cells: Vec<Option<f64>>,
}

impl CombinedTable {
    pub fn rows(&self) -> &[GeneKey] {
        &self.rows
    }

    pub fn columns(&self) -> &[ColumnKey] {
        &self.columns
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn row_values(&self, row: usize) -> &[Option<f64>] {
        let width = self.width();
        &self.cells[row * width..(row + 1) * width]
    }

    pub fn value(
        &self,
        gene_id: &str,
        phenotype: &str,
        method: Method,
        statistic: Statistic,
    ) -> Option<f64> {
        let row = self.rows.iter().position(|k| k.gene_id == gene_id)?;
        let col = self.columns.iter().position(|c| {
            c.phenotype == phenotype && c.method == method && c.statistic == statistic
        })?;
        self.cells[row * self.width() + col]
    }
}

pub fn merge(
    index: &CoordinateIndex,
    sets: &[MethodEstimates],
    phenotypes: &[String],
) -> Result<CombinedTable> {
    let mut pheno_pos: HashMap<&str, usize> = HashMap::with_capacity(phenotypes.len());
    for (i, abbr) in phenotypes.iter().enumerate() {
        if pheno_pos.insert(abbr.as_str(), i).is_some() {
            return Err(CollectError::InvalidArgument(format!(
                "phenotype {abbr} is listed more than once"
            )));
        }
    }

    // Column order depends only on the phenotype list and the canonical
    // method order, never on the order of `sets`.
    let methods: Vec<Method> = Method::ALL
        .into_iter()
        .filter(|m| sets.iter().any(|s| s.method == *m))
        .collect();
    let mut columns = Vec::with_capacity(phenotypes.len() * methods.len() * 2);
    let mut base_col: HashMap<(usize, Method), usize> = HashMap::new();
    for (p, abbr) in phenotypes.iter().enumerate() {
        for &method in &methods {
            base_col.insert((p, method), columns.len());
            for statistic in Statistic::ALL {
                columns.push(ColumnKey {
                    phenotype: abbr.clone(),
                    method,
                    statistic,
                });
            }
        }
    }

    let width = columns.len();
    let mut cells = vec![None; index.len() * width];
    let mut seen: HashSet<(Method, usize, usize)> = HashSet::new();
    let mut skipped: HashSet<&str> = HashSet::new();

    for set in sets {
        for est in &set.estimates {
            if est.method != set.method {
                return Err(CollectError::InvalidArgument(format!(
                    "{} estimate for {} found among {} estimates",
                    est.method, est.key, set.method
                )));
            }
            let Some(&p) = pheno_pos.get(est.phenotype.as_str()) else {
                skipped.insert(est.phenotype.as_str());
                continue;
            };
            let row = index.position(&est.key)?;
            if !seen.insert((est.method, p, row)) {
                return Err(CollectError::DuplicateKey {
                    origin: format!("{} results for {}", est.method, est.phenotype),
                    key: est.key.to_string(),
                });
            }
            let base = row * width + base_col[&(p, est.method)];
            for (offset, statistic) in Statistic::ALL.into_iter().enumerate() {
                cells[base + offset] = est.value(statistic);
            }
        }
    }

    for abbr in skipped {
        warn!("Estimates for unrequested phenotype {abbr} were ignored");
    }

    Ok(CombinedTable {
        rows: index.keys().to_vec(),
        columns,
        cells,
    })
}
