//! Parsing of ExAC gene constraint tables.
//!
//! The tables are TSV files with the following leading columns
//!
//! 1. Gene symbol
//! 2. Observed missense variants (`N_missense`, integer)
//! 3. Expected missense variants (`Exp_missense`, float)
//! 4. Missense Z score (`Z_missense`, float)
//! 5. Observed loss-of-function variants (`N_lof`, integer)
//! 6. Expected loss-of-function variants (`Exp_lof`, float)
//! 7. Probability of loss-of-function intolerance (`pLI`, float)
//!
//! Lines containing `N_missense` are header lines and skipped.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::common::Float;

/// Output columns in the order of [`GeneConstraint::values`].
pub static COLUMNS: &[&str] = &[
    "ExAC_N_missense",
    "ExAC_Exp_missense",
    "ExAC_Z_missense",
    "ExAC_N_lof",
    "ExAC_Exp_lof",
    "ExAC_pLI",
];

/// Number of leading columns read from each row.
const USED_COLUMNS: usize = 7;

/// Constraint metrics of one gene.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct GeneConstraint {
    pub gene: String,
    pub n_missense: u32,
    pub exp_missense: f64,
    pub z_missense: f64,
    pub n_lof: u32,
    pub exp_lof: f64,
    pub p_li: f64,
}

impl GeneConstraint {
    /// Values in the order of [`COLUMNS`].
    pub fn values(&self) -> Vec<String> {
        vec![
            self.n_missense.to_string(),
            Float(self.exp_missense).to_string(),
            Float(self.z_missense).to_string(),
            self.n_lof.to_string(),
            Float(self.exp_lof).to_string(),
            Float(self.p_li).to_string(),
        ]
    }
}

/// Constraint metrics by gene symbol.
#[derive(Debug, Clone, Default)]
pub struct ConstraintTable {
    genes: HashMap<String, GeneConstraint>,
}

impl ConstraintTable {
    /// Load `ConstraintTable` from the given path.
    pub fn from_path<P>(path: P) -> Result<Self, anyhow::Error>
    where
        P: AsRef<Path>,
    {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .from_path(path.as_ref())?;
        let mut genes = HashMap::new();
        for result in rdr.records() {
            let record = result?;
            if record.iter().any(|field| field.contains("N_missense")) {
                continue;
            }
            let record = csv::StringRecord::from(record.iter().take(USED_COLUMNS).collect::<Vec<_>>());
            let constraint: GeneConstraint = record.deserialize(None).map_err(|e| {
                anyhow::anyhow!("invalid ExAC record {:?} in {:?}: {}", record, path.as_ref(), e)
            })?;
            genes.insert(constraint.gene.clone(), constraint);
        }
        tracing::debug!("loaded constraints of {} genes", genes.len());
        Ok(Self { genes })
    }

    pub fn get(&self, gene: &str) -> Option<&GeneConstraint> {
        self.genes.get(gene)
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}
