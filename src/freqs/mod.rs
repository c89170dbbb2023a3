//! Population frequencies from gnomAD exomes and genomes.

use indexmap::IndexMap;
use noodles::vcf;

use crate::common::noodles::{parse_info, record_pos, text};
use crate::variant::{ChromKind, CsnKey, VariantKey};

pub mod counts;
pub mod reading;

/// Population codes in reporting order.
pub static POPULATIONS: &[&str] = &["AFR", "AMR", "ASJ", "EAS", "FIN", "NFE", "OTH", "SAS"];

/// Half-width of the window around a variant in which database records are considered.
pub const WINDOW: i64 = 100;

/// Maximal carrier frequency over all populations together with the population.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyRecord {
    /// Frequency in percent, in `[0, 100]`.
    pub frequency: f64,
    /// Population code, `"."` if no record matched.
    pub population: String,
}

impl Default for FrequencyRecord {
    fn default() -> Self {
        Self {
            frequency: 0.0,
            population: String::from("."),
        }
    }
}

/// A frequency database record reduced to the values needed for lookups.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FreqVcfRecord {
    /// 1-based position.
    pub pos: u32,
    pub reference: String,
    pub alternatives: Vec<String>,
    /// Whether the record's `FILTER` is `PASS`.
    pub pass: bool,
    /// Raw `INFO` values by key.
    pub info: IndexMap<String, String>,
}

impl FreqVcfRecord {
    /// Convert from a lazy noodles VCF record.
    pub fn from_vcf(record: &vcf::Record) -> Result<Self, anyhow::Error> {
        Ok(Self {
            pos: record_pos(record)?,
            reference: text(record.reference_bases()),
            alternatives: text(record.alternate_bases())
                .split(',')
                .map(String::from)
                .collect(),
            pass: text(record.filters()) == "PASS",
            info: parse_info(&text(record.info())),
        })
    }

    /// Value of the INFO key, failing if it is missing.
    fn require(&self, key: &str) -> Result<&str, anyhow::Error> {
        self.info
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| anyhow::anyhow!("record at {} lacks INFO/{}", self.pos, key))
    }

    /// Element `alt_idx` of the comma-separated INFO value for `key`.
    fn require_alt(&self, key: &str, alt_idx: usize) -> Result<&str, anyhow::Error> {
        self.require(key)?.split(',').nth(alt_idx).ok_or_else(|| {
            anyhow::anyhow!(
                "record at {} has no INFO/{} value for allele {}",
                self.pos,
                key,
                alt_idx + 1
            )
        })
    }

    /// Whether allele `alt_idx` of this record matches the variant.
    ///
    /// Without CSN the exact position and alleles are compared, otherwise gene and CSN.
    fn matches(
        &self,
        key: &VariantKey,
        csn_key: &CsnKey,
        alt_idx: usize,
    ) -> Result<bool, anyhow::Error> {
        if csn_key.has_csn() {
            Ok(self.require_alt("GENE", alt_idx)? == csn_key.gene
                && self.require_alt("CSN", alt_idx)? == csn_key.csn)
        } else {
            Ok(self.pos == key.pos()
                && self.reference == key.reference()
                && self.alternatives[alt_idx] == key.alternative())
        }
    }

    /// Populations with any frequency information in this record.
    pub fn populations(&self) -> Vec<&'static str> {
        POPULATIONS
            .iter()
            .copied()
            .filter(|pop| {
                [
                    format!("AF_{}", pop),
                    format!("GC_{}", pop),
                    format!("GC_{}_Male", pop),
                    format!("GC_{}_Female", pop),
                ]
                .iter()
                .any(|key| self.info.contains_key(key))
            })
            .collect()
    }

    /// Carrier frequency of allele `alt_idx` in population `pop`.
    fn population_frequency(
        &self,
        chrom_kind: ChromKind,
        pop: &str,
        alt_idx: usize,
    ) -> Result<f64, anyhow::Error> {
        let n_alts = self.alternatives.len();
        match chrom_kind {
            ChromKind::Autosome => {
                let gc = counts::parse_counts(self.require(&format!("GC_{}", pop))?, n_alts)?;
                Ok(counts::carrier_frequency(&[&gc], n_alts, alt_idx))
            }
            ChromKind::X => {
                let male =
                    counts::parse_counts(self.require(&format!("GC_{}_Male", pop))?, n_alts)?;
                let female =
                    counts::parse_counts(self.require(&format!("GC_{}_Female", pop))?, n_alts)?;
                Ok(counts::carrier_frequency(&[&male, &female], n_alts, alt_idx))
            }
            ChromKind::Y => {
                let key = format!("AF_{}", pop);
                let value = self.require_alt(&key, alt_idx)?;
                value.parse::<f64>().map_err(|e| {
                    anyhow::anyhow!("invalid INFO/{} value {:?} at {}: {}", key, value, self.pos, e)
                })
            }
        }
    }

    /// Maximal frequency over the populations of allele `alt_idx`.
    ///
    /// Ties go to the population listed first.
    fn max_frequency(
        &self,
        chrom_kind: ChromKind,
        alt_idx: usize,
    ) -> Result<FrequencyRecord, anyhow::Error> {
        let populations = self.populations();
        if populations.is_empty() {
            anyhow::bail!("matching record at {} has no population data", self.pos);
        }

        let mut result: Option<FrequencyRecord> = None;
        for pop in populations {
            let frequency = self.population_frequency(chrom_kind, pop, alt_idx)?;
            if result
                .as_ref()
                .map(|best| frequency > best.frequency)
                .unwrap_or(true)
            {
                result = Some(FrequencyRecord {
                    frequency,
                    population: pop.to_string(),
                });
            }
        }
        Ok(result.unwrap_or_default())
    }
}

/// Region-queryable source of frequency database records.
pub trait RecordSource {
    /// Records overlapping the 1-based inclusive interval `[start, end]` on `chrom`.
    fn fetch(
        &mut self,
        chrom: &str,
        start: i64,
        end: i64,
    ) -> Result<Vec<FreqVcfRecord>, anyhow::Error>;
}

/// Records held in memory; an empty instance stands for an unconfigured database.
#[derive(Debug, Default, Clone)]
pub struct MemoryRecords {
    records: Vec<(String, FreqVcfRecord)>,
}

impl MemoryRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chrom: &str, record: FreqVcfRecord) {
        self.records.push((chrom.to_string(), record));
    }
}

impl RecordSource for MemoryRecords {
    fn fetch(
        &mut self,
        chrom: &str,
        start: i64,
        end: i64,
    ) -> Result<Vec<FreqVcfRecord>, anyhow::Error> {
        Ok(self
            .records
            .iter()
            .filter(|(name, record)| {
                name == chrom && (record.pos as i64) >= start && (record.pos as i64) <= end
            })
            .map(|(_, record)| record.clone())
            .collect())
    }
}

/// Resolve the maximal population frequency of a variant.
///
/// Only `PASS` records within [`WINDOW`] bases are considered; the first matching allele
/// decides.  No match yields [`FrequencyRecord::default`].
pub fn max_frequency<S>(
    source: &mut S,
    key: &VariantKey,
    csn_key: &CsnKey,
) -> Result<FrequencyRecord, anyhow::Error>
where
    S: RecordSource + ?Sized,
{
    let pos = key.pos() as i64;
    let records = source.fetch(key.chrom(), pos - WINDOW, pos + WINDOW)?;
    for record in records.iter().filter(|record| record.pass) {
        for alt_idx in 0..record.alternatives.len() {
            if record.matches(key, csn_key, alt_idx)? {
                let result = record.max_frequency(key.chrom_kind(), alt_idx)?;
                tracing::trace!(
                    "{} matches record at {} -> {} ({})",
                    key,
                    record.pos,
                    result.frequency,
                    result.population
                );
                return Ok(result);
            }
        }
    }
    Ok(FrequencyRecord::default())
}
