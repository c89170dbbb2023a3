//! Filter thresholds and data sources.

use std::path::Path;
use std::str::FromStr;

use crate::common::io::std::read_lines_maybe_gz;

/// Configuration of the de novo filter.
///
/// Loaded from `KEY = VALUE` files; keys are case-insensitive and `#` starts a comment line.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Maximal gnomAD carrier frequency in percent.
    pub gnomad_max_frequency: f64,
    /// Maximal control cohort carrier frequency in percent.
    pub control_max_frequency: f64,
    /// Maximal distance of intronic variants to the exon boundary.
    pub splice_site_boundary: u32,
    pub child_min_tr: u32,
    pub child_min_tc: u32,
    pub child_min_tr_per_tc: f64,
    /// Minimal coverage in each parent.
    pub parent_min_coverage: u32,
    /// Maximal number of reads supporting the allele in each parent.
    pub parent_max_alt_allele_count: u32,
    pub remove_multi_allele_calls: bool,
    /// gnomAD exomes VCF, `{}` is replaced by the chromosome name.
    pub gnomad_exomes_data_file: String,
    /// gnomAD genomes VCF, `{}` is replaced by the chromosome name.
    pub gnomad_genomes_data_file: String,
    pub control_data_file: String,
    pub maxentscan_data_file: String,
    pub exac_data_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gnomad_max_frequency: 0.1,
            control_max_frequency: 0.1,
            splice_site_boundary: 10,
            child_min_tr: 3,
            child_min_tc: 15,
            child_min_tr_per_tc: 0.2,
            parent_min_coverage: 6,
            parent_max_alt_allele_count: 1,
            remove_multi_allele_calls: true,
            gnomad_exomes_data_file: String::new(),
            gnomad_genomes_data_file: String::new(),
            control_data_file: String::new(),
            maxentscan_data_file: String::new(),
            exac_data_file: String::new(),
        }
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, anyhow::Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("invalid value {:?} for {}: {}", value, key, e))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, anyhow::Error> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => anyhow::bail!("invalid value {:?} for {}: expected true or false", value, key),
    }
}

impl Config {
    /// Load configuration from `path`, defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, anyhow::Error> {
        match path {
            Some(path) => Self::from_path(path),
            None => Ok(Self::default()),
        }
    }

    /// Read the configuration file at `path`, starting out from the defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let lines = read_lines_maybe_gz(path)?;
        Self::from_lines(lines.iter().map(String::as_str))
            .map_err(|e| anyhow::anyhow!("problem with configuration file {:?}: {}", path, e))
    }

    /// Apply `KEY = VALUE` lines to the defaults.
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Result<Self, anyhow::Error> {
        let mut result = Self::default();
        for line in lines {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("expected KEY = VALUE, got {:?}", line))?;
            result.set(&key.trim().to_ascii_uppercase(), value.trim())?;
        }
        Ok(result)
    }

    /// Set the value for `key` (upper case); unknown keys are ignored with a warning.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), anyhow::Error> {
        match key {
            "GNOMAD_MAX_FREQUENCY" => self.gnomad_max_frequency = parse_value(key, value)?,
            "CONTROL_MAX_FREQUENCY" => self.control_max_frequency = parse_value(key, value)?,
            "SPLICE_SITE_BOUNDARY" => self.splice_site_boundary = parse_value(key, value)?,
            "CHILD_MIN_TR" => self.child_min_tr = parse_value(key, value)?,
            "CHILD_MIN_TC" => self.child_min_tc = parse_value(key, value)?,
            "CHILD_MIN_TR_PER_TC" => self.child_min_tr_per_tc = parse_value(key, value)?,
            "PARENT_MIN_COVERAGE" => self.parent_min_coverage = parse_value(key, value)?,
            "PARENT_MAX_ALT_ALLELE_COUNT" => {
                self.parent_max_alt_allele_count = parse_value(key, value)?
            }
            "REMOVE_MULTI_ALLELE_CALLS" => self.remove_multi_allele_calls = parse_bool(key, value)?,
            "GNOMAD_EXOMES_DATA_FILE" => self.gnomad_exomes_data_file = value.to_string(),
            "GNOMAD_GENOMES_DATA_FILE" => self.gnomad_genomes_data_file = value.to_string(),
            "CONTROL_DATA_FILE" => self.control_data_file = value.to_string(),
            "MAXENTSCAN_DATA_FILE" => self.maxentscan_data_file = value.to_string(),
            "EXAC_DATA_FILE" => self.exac_data_file = value.to_string(),
            _ => tracing::warn!("ignoring unknown configuration key {}", key),
        }
        Ok(())
    }
}
