//! Canonical coordinate index built from the region reference table.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::warn;

use crate::error::{CollectError, Result};
use crate::types::{GeneKey, Interval, Region, normalize_chromosome};

/// Ordered `(gene, chromosome, midpoint)` keys plus the two native-key
/// lookups the collectors need: gene symbol and coordinate triple.
#[derive(Debug, Clone, Default)]
pub struct CoordinateIndex {
    keys: Vec<GeneKey>,
    by_gene: HashMap<String, usize>,
    by_interval: HashMap<Interval, usize>,
    by_key: HashMap<GeneKey, usize>,
}

impl CoordinateIndex {
    pub fn from_regions(regions: &[Region]) -> Result<Self> {
        let mut index = Self {
            keys: Vec::with_capacity(regions.len()),
            by_gene: HashMap::with_capacity(regions.len()),
            by_interval: HashMap::with_capacity(regions.len()),
            by_key: HashMap::with_capacity(regions.len()),
        };
        let mut ambiguous_genes = 0usize;
        let mut ambiguous_intervals = 0usize;

        for (row, region) in regions.iter().enumerate() {
            let chromosome = normalize_chromosome(&region.chromosome);
            let key = GeneKey {
                gene_id: region.gene_id.clone(),
                chromosome: chromosome.clone(),
                midpoint: region.midpoint(),
            };
            match index.by_key.entry(key.clone()) {
                Entry::Occupied(_) => {
                    return Err(CollectError::DuplicateKey {
                        origin: "region table".to_string(),
                        key: key.to_string(),
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(row);
                }
            }
            match index.by_gene.entry(region.gene_id.clone()) {
                Entry::Occupied(_) => ambiguous_genes += 1,
                Entry::Vacant(slot) => {
                    slot.insert(row);
                }
            }
            let interval = Interval {
                chromosome,
                start: region.start,
                end: region.end,
            };
            match index.by_interval.entry(interval) {
                Entry::Occupied(_) => ambiguous_intervals += 1,
                Entry::Vacant(slot) => {
                    slot.insert(row);
                }
            }
            index.keys.push(key);
        }

        if ambiguous_genes > 0 {
            warn!(
                "{ambiguous_genes} gene symbol(s) occur on more than one region; name lookups use the first occurrence"
            );
        }
        if ambiguous_intervals > 0 {
            warn!(
                "{ambiguous_intervals} coordinate triple(s) occur on more than one region; coordinate lookups use the first occurrence"
            );
        }
        Ok(index)
    }

    pub fn keys(&self) -> &[GeneKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn lookup_gene(&self, gene: &str) -> Option<&GeneKey> {
        self.by_gene.get(gene).map(|&row| &self.keys[row])
    }

    pub fn lookup_interval(&self, chromosome: &str, start: u64, end: u64) -> Option<&GeneKey> {
        let interval = Interval {
            chromosome: normalize_chromosome(chromosome),
            start,
            end,
        };
        self.by_interval.get(&interval).map(|&row| &self.keys[row])
    }

    pub fn resolve_gene(&self, gene: &str) -> Result<&GeneKey> {
        self.lookup_gene(gene)
            .ok_or_else(|| CollectError::MissingRegion(format!("gene {gene}")))
    }

    pub fn resolve_interval(&self, chromosome: &str, start: u64, end: u64) -> Result<&GeneKey> {
        self.lookup_interval(chromosome, start, end).ok_or_else(|| {
            CollectError::MissingRegion(format!("region {}", Interval::new(chromosome, start, end)))
        })
    }

    /// Row ordinal of a canonical key in reference order.
    pub fn position(&self, key: &GeneKey) -> Result<usize> {
        self.by_key
            .get(key)
            .copied()
            .ok_or_else(|| CollectError::MissingRegion(format!("key {key}")))
    }
}
