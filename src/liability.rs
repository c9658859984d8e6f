//! Observed-to-liability scale conversion for dichotomous phenotypes.

use std::collections::HashMap;

use statrs::distribution::{Continuous, ContinuousCDF, Normal};

use crate::error::{CollectError, Result};
use crate::types::Phenotype;

/// Falconer liability-threshold factor `4 * [k(1-k) / phi(Phi^-1(k))]^2`.
///
/// An undefined prevalence (`None` or NaN) marks a continuous trait and maps
/// to the identity factor `1`.
pub fn liability_coefficient(prevalence: Option<f64>) -> Result<f64> {
    coefficient_for("<unnamed>", prevalence)
}

fn coefficient_for(phenotype: &str, prevalence: Option<f64>) -> Result<f64> {
    let k = match prevalence {
        Some(k) if !k.is_nan() => k,
        _ => return Ok(1.0),
    };
    let invalid = || CollectError::InvalidPrevalence {
        phenotype: phenotype.to_string(),
        value: k,
    };
    if !(k > 0.0 && k < 1.0) {
        return Err(invalid());
    }

    let norm = Normal::new(0.0, 1.0).map_err(|e| CollectError::Distribution(e.to_string()))?;
    let threshold = norm.inverse_cdf(k);
    let density = norm.pdf(threshold);
    let ratio = k * (1.0 - k) / density;
    let coef = ratio * ratio * 4.0;
    if !coef.is_finite() || coef <= 0.0 {
        return Err(invalid());
    }
    Ok(coef)
}

/// Per-phenotype coefficients, computed once and shared read-only by the
/// collectors.
#[derive(Debug, Clone, Default)]
pub struct LiabilityTable {
    coefficients: HashMap<String, f64>,
}

impl LiabilityTable {
    pub fn from_phenotypes(phenotypes: &[Phenotype]) -> Result<Self> {
        let mut coefficients = HashMap::with_capacity(phenotypes.len());
        for phenotype in phenotypes {
            let coef = coefficient_for(&phenotype.abbr, phenotype.prevalence)?;
            if coef != 1.0 {
                tracing::info!(
                    "Liability coefficient for {}: {:.4} (prevalence {})",
                    phenotype.abbr,
                    coef,
                    phenotype.prevalence.unwrap_or(f64::NAN)
                );
            }
            coefficients.insert(phenotype.abbr.clone(), coef);
        }
        Ok(Self { coefficients })
    }

    /// Phenotypes without an entry are treated as continuous.
    pub fn coefficient(&self, abbr: &str) -> f64 {
        self.coefficients.get(abbr).copied().unwrap_or(1.0)
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }
}
