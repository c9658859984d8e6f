use std::fmt;

/// Heritability estimator whose per-gene output is being collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    Ehe,
    Hess,
    Gbat,
}

impl Method {
    /// Canonical column order of the combined table.
    pub const ALL: [Method; 3] = [Method::Ehe, Method::Hess, Method::Gbat];

    pub fn label(self) -> &'static str {
        match self {
            Method::Ehe => "EHE",
            Method::Hess => "HESS",
            Method::Gbat => "GBAT",
        }
    }

    pub fn key_kind(self) -> KeyKind {
        match self {
            Method::Ehe | Method::Gbat => KeyKind::GeneName,
            Method::Hess => KeyKind::Interval,
        }
    }

    /// Native column names of the point estimate and its standard error.
    pub fn native_columns(self) -> (&'static str, &'static str) {
        match self {
            Method::Ehe => ("Herit", "HeritSE"),
            Method::Hess => ("local_h2g", "se"),
            Method::Gbat => ("Heritability", "SD"),
        }
    }

    /// GBAT reports a null SD for genes it failed to fit; the point estimate
    /// of such a row is not trusted either.
    pub fn couples_missing_se(self) -> bool {
        matches!(self, Method::Gbat)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    GeneName,
    Interval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statistic {
    H2,
    Se,
}

impl Statistic {
    pub const ALL: [Statistic; 2] = [Statistic::H2, Statistic::Se];

    pub fn label(self) -> &'static str {
        match self {
            Statistic::H2 => "h2",
            Statistic::Se => "se",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Phenotype {
    pub abbr: String,
    pub prevalence: Option<f64>,
}

/// One row of the region reference table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub gene_id: String,
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
}

impl Region {
    pub fn new(gene_id: impl Into<String>, chromosome: &str, start: u64, end: u64) -> Self {
        Self {
            gene_id: gene_id.into(),
            chromosome: normalize_chromosome(chromosome),
            start,
            end,
        }
    }

    pub fn midpoint(&self) -> u64 {
        (self.start + self.end) / 2
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Interval {
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
}

impl Interval {
    pub fn new(chromosome: &str, start: u64, end: u64) -> Self {
        Self {
            chromosome: normalize_chromosome(chromosome),
            start,
            end,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chromosome, self.start, self.end)
    }
}

/// Canonical row key of the combined table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GeneKey {
    pub gene_id: String,
    pub chromosome: String,
    pub midpoint: u64,
}

impl fmt::Display for GeneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.gene_id, self.chromosome, self.midpoint)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub key: GeneKey,
    pub method: Method,
    pub phenotype: String,
    pub h2: Option<f64>,
    pub se: Option<f64>,
}

impl Estimate {
    pub fn value(&self, stat: Statistic) -> Option<f64> {
        match stat {
            Statistic::H2 => self.h2,
            Statistic::Se => self.se,
        }
    }
}

/// Strips a leading `chr` so `chr7` and `7` compare equal.
pub fn normalize_chromosome(label: &str) -> String {
    let trimmed = label.trim();
    match trimmed.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("chr") => trimmed[3..].to_string(),
        _ => trimmed.to_string(),
    }
}
