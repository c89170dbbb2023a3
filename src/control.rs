//! Carrier frequencies in an internal control cohort.
//!
//! The tables are TSV files starting with a `##SAMPLES=<n>` meta line and a `#CHROM` header
//! line, followed by one row per variant.  Of the rows, the variant (columns 1-4), gene
//! (column 7), CSN (column 10) and carrier count (column 21) are used.

use std::collections::HashMap;
use std::path::Path;

use serde::de::IgnoredAny;
use serde::Deserialize;

use crate::common::io::std::open_read_maybe_gz;
use crate::variant::{CsnKey, VariantKey};

/// Prefix of the meta line giving the cohort size.
const SAMPLES_PREFIX: &str = "##SAMPLES=";

/// One data row of the control table.
#[derive(Debug, Deserialize)]
struct Row {
    chrom: String,
    pos: u32,
    reference: String,
    alternative: String,
    _qual: IgnoredAny,
    _filter: IgnoredAny,
    gene: String,
    _transcript: IgnoredAny,
    _class: IgnoredAny,
    csn: String,
    _so: IgnoredAny,
    _impact: IgnoredAny,
    _altann: IgnoredAny,
    _altclass: IgnoredAny,
    _tr: IgnoredAny,
    _tc: IgnoredAny,
    _nf: IgnoredAny,
    _nr: IgnoredAny,
    _hom: IgnoredAny,
    _het: IgnoredAny,
    carriers: u32,
}

/// Control cohort carrier frequencies in percent.
#[derive(Debug, Clone, Default)]
pub struct ControlTable {
    /// Number of samples in the cohort.
    samples: u32,
    /// Whether rows carry gene and CSN.
    by_csn: bool,
    by_variant: HashMap<VariantKey, f64>,
    by_csn_key: HashMap<CsnKey, f64>,
}

impl ControlTable {
    /// Load the table from a tab-separated file (plain or gzip-compressed).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_reader(open_read_maybe_gz(path)?);

        let mut result = Self::default();
        let mut samples: Option<u32> = None;
        for record in rdr.records() {
            let record = record?;
            let first = record.get(0).unwrap_or_default();
            if let Some(value) = first.strip_prefix(SAMPLES_PREFIX) {
                let value = value
                    .trim()
                    .parse::<u32>()
                    .map_err(|e| anyhow::anyhow!("invalid sample count in {:?}: {}", path, e))?;
                if value == 0 {
                    anyhow::bail!("control table {:?} declares zero samples", path);
                }
                samples = Some(value);
                continue;
            }
            if first.starts_with('#') {
                result.by_csn = record.iter().any(|field| field.contains("CSN"));
                continue;
            }

            let samples = samples.ok_or_else(|| {
                anyhow::anyhow!("control table {:?} lacks a {} line", path, SAMPLES_PREFIX)
            })?;
            let row: Row = record.deserialize(None).map_err(|e| {
                anyhow::anyhow!("invalid control record {:?} in {:?}: {}", record, path, e)
            })?;
            result.insert_row(row, samples);
        }

        result.samples = samples.unwrap_or_default();
        tracing::debug!(
            "loaded {} control variants from {:?} ({} samples)",
            result.by_variant.len(),
            path,
            result.samples
        );
        Ok(result)
    }

    fn insert_row(&mut self, row: Row, samples: u32) {
        let frequency = 100.0 * row.carriers as f64 / samples as f64;
        self.by_variant.insert(
            VariantKey::new(&row.chrom, row.pos, &row.reference, &row.alternative),
            frequency,
        );
        if self.by_csn {
            self.by_csn_key
                .insert(CsnKey::new(&row.gene, &row.csn), frequency);
        }
    }

    /// Number of samples in the cohort, zero for an empty table.
    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn len(&self) -> usize {
        self.by_variant.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_variant.is_empty()
    }

    /// Carrier frequency of a variant, `0.0` if not in the cohort.
    ///
    /// Annotations with CSN are looked up by gene and CSN when the table provides them,
    /// everything else by variant.
    pub fn frequency(&self, key: &VariantKey, csn_key: &CsnKey) -> f64 {
        let value = if self.by_csn && csn_key.has_csn() {
            self.by_csn_key.get(csn_key)
        } else {
            self.by_variant.get(key)
        };
        value.copied().unwrap_or(0.0)
    }
}
