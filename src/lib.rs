//! Collects gene-level heritability estimates of EHE, HESS and GBAT into one
//! table on the liability scale.

pub mod error;
pub mod logging;
pub mod types;

pub mod io;
pub mod parallel;
pub mod qc;
pub mod sources;

pub mod collect;
pub mod format;
pub mod liability;
pub mod merge;
pub mod pipeline;
pub mod region;
