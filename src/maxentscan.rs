//! MaxEntScan splice-site scores for reporting.

use std::collections::HashMap;
use std::path::Path;

use serde::de::IgnoredAny;
use serde::Deserialize;

use crate::common::io::std::open_read_maybe_gz;
use crate::common::{round2, Float};
use crate::csn;
use crate::variant::{VariantKey, VariantKind};

/// Output columns in the order of [`Scores::values`].
pub static COLUMNS: &[&str] = &[
    "MaxEntScan_RefKnown5",
    "MaxEntScan_RefKnown3",
    "MaxEntScan_AltKnown",
    "MaxEntScan_AltHighest5",
    "MaxEntScan_RefHighest5",
    "MaxEntScan_AltHighest3",
    "MaxEntScan_RefHighest3",
    "MaxEntScan_Boundary5",
    "MaxEntScan_Boundary3",
    "MaxEntScan_PI5",
    "MaxEntScan_PI3",
    "MaxEntScan_RefKnown",
    "MaxEntScan_SpliceSiteScore",
    "MaxEntScan_SpliceSiteType",
    "MaxEntScan_PercentReduction",
    "MaxEntScan_MAX5",
    "MaxEntScan_MAX3",
];

/// One line of the input table.
#[derive(Debug, Deserialize)]
struct Record {
    chrom: String,
    pos: u32,
    reference: String,
    alternative: String,
    _transcript: IgnoredAny,
    _gene: IgnoredAny,
    _location: IgnoredAny,
    csn: String,
    _class: IgnoredAny,
    ref_known5: String,
    ref_known3: String,
    alt_known: String,
    alt_highest5: String,
    ref_highest5: String,
    alt_highest3: String,
    ref_highest3: String,
    boundary5: String,
    boundary3: String,
}

/// One row of the MaxEntScan table, values kept as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub csn: String,
    pub ref_known5: String,
    pub ref_known3: String,
    pub alt_known: String,
    pub alt_highest5: String,
    pub ref_highest5: String,
    pub alt_highest3: String,
    pub ref_highest3: String,
    pub boundary5: String,
    pub boundary3: String,
}

/// Table values together with the derived scores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scores {
    pub row: Row,
    pub pi5: String,
    pub pi3: String,
    pub ref_known: String,
    pub splice_site_score: String,
    pub splice_site_type: String,
    pub percent_reduction: String,
    pub max5: String,
    pub max3: String,
}

impl Scores {
    /// Values in the order of [`COLUMNS`].
    pub fn values(&self) -> Vec<String> {
        vec![
            self.row.ref_known5.clone(),
            self.row.ref_known3.clone(),
            self.row.alt_known.clone(),
            self.row.alt_highest5.clone(),
            self.row.ref_highest5.clone(),
            self.row.alt_highest3.clone(),
            self.row.ref_highest3.clone(),
            self.row.boundary5.clone(),
            self.row.boundary3.clone(),
            self.pi5.clone(),
            self.pi3.clone(),
            self.ref_known.clone(),
            self.splice_site_score.clone(),
            self.splice_site_type.clone(),
            self.percent_reduction.clone(),
            self.max5.clone(),
            self.max3.clone(),
        ]
    }
}

fn parse_f64(name: &str, value: &str) -> Result<f64, anyhow::Error> {
    value
        .parse::<f64>()
        .map_err(|e| anyhow::anyhow!("invalid MaxEntScan {} value {:?}: {}", name, value, e))
}

fn parse_i64(name: &str, value: &str) -> Result<i64, anyhow::Error> {
    value
        .parse::<i64>()
        .map_err(|e| anyhow::anyhow!("invalid MaxEntScan {} value {:?}: {}", name, value, e))
}

impl Row {
    fn has_alt_known(&self) -> bool {
        self.alt_known != "."
    }

    /// Percentage increase of the highest alternative score over the reference score.
    fn pi(&self, alt_highest: &str, ref_highest: &str) -> Result<String, anyhow::Error> {
        if self.has_alt_known() || alt_highest == "." {
            return Ok(String::from("."));
        }
        let alt = parse_f64("AltHighest", alt_highest)?;
        let reference = parse_f64("RefHighest", ref_highest)?;
        let value = if alt <= 0.0 {
            0
        } else if reference <= 0.0 {
            100
        } else {
            let value = (100.0 * (alt - reference.min(alt)) / reference).round() as i64;
            value.min(100)
        };
        Ok(value.to_string())
    }

    /// The score of the known splice site closest to the variant.
    fn ref_known(&self) -> Result<String, anyhow::Error> {
        if !self.has_alt_known() {
            return Ok(String::from("."));
        }
        if self.csn.contains('+') {
            return Ok(self.ref_known5.clone());
        }
        if self.csn.contains('-') {
            return Ok(self.ref_known3.clone());
        }

        let coordinate = csn::coordinates(&self.csn)?
            .first()
            .map(|coordinate| coordinate.exonic)
            .ok_or_else(|| anyhow::anyhow!("no coordinate in CSN {:?}", self.csn))?;
        let boundary5 = parse_i64("Boundary5", &self.boundary5)?;
        let boundary3 = parse_i64("Boundary3", &self.boundary3)?;
        if (boundary5 - 2..=boundary5).contains(&coordinate) {
            Ok(self.ref_known5.clone())
        } else if (boundary3..=boundary3 + 2).contains(&coordinate) {
            Ok(self.ref_known3.clone())
        } else {
            Ok(String::from("check"))
        }
    }

    /// Reduction of the known splice site score by the variant in percent.
    ///
    /// `.` when no numeric reference score is available.
    fn percent_reduction(&self, ref_known: &str) -> Result<String, anyhow::Error> {
        if !self.has_alt_known() {
            return Ok(String::from("."));
        }
        let Ok(reference) = ref_known.parse::<f64>() else {
            return Ok(String::from("."));
        };
        if reference == 0.0 {
            return Ok(String::from("."));
        }
        let alt = parse_f64("AltKnown", &self.alt_known)?.clamp(0.0, reference.max(0.0));
        Ok(format!(
            "{}",
            Float(round2(100.0 * (reference - alt) / reference))
        ))
    }

    fn scores(&self) -> Result<Scores, anyhow::Error> {
        let ref_known = self.ref_known()?;
        let percent_reduction = self.percent_reduction(&ref_known)?;
        let (max5, max3) = if self.has_alt_known() {
            (String::from("."), String::from("."))
        } else {
            (self.alt_highest5.clone(), self.alt_highest3.clone())
        };
        Ok(Scores {
            row: self.clone(),
            pi5: self.pi(&self.alt_highest5, &self.ref_highest5)?,
            pi3: self.pi(&self.alt_highest3, &self.ref_highest3)?,
            splice_site_score: ref_known.clone(),
            splice_site_type: if ref_known == "." {
                String::from(".")
            } else {
                String::from("spliceSiteRegion")
            },
            ref_known,
            percent_reduction,
            max5,
            max3,
        })
    }
}

/// MaxEntScan values keyed by variant.
#[derive(Debug, Clone, Default)]
pub struct MaxEntScanTable {
    rows: HashMap<VariantKey, Row>,
}

impl MaxEntScanTable {
    /// Load from a tab-separated file; a header line starting with `CHROM` and `#` comments
    /// are skipped.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .comment(Some(b'#'))
            .quoting(false)
            .from_reader(open_read_maybe_gz(path)?);

        let mut rows = HashMap::new();
        for record in rdr.records() {
            let record = record?;
            let first = record.get(0).unwrap_or_default();
            if first.to_ascii_uppercase().starts_with("CHROM") {
                continue;
            }
            let Record {
                chrom,
                pos,
                reference,
                alternative,
                csn,
                ref_known5,
                ref_known3,
                alt_known,
                alt_highest5,
                ref_highest5,
                alt_highest3,
                ref_highest3,
                boundary5,
                boundary3,
                ..
            } = record.deserialize::<Record>(None).map_err(|e| {
                anyhow::anyhow!("invalid MaxEntScan record {:?} in {:?}: {}", record, path, e)
            })?;
            rows.insert(
                VariantKey::new(&chrom, pos, &reference, &alternative),
                Row {
                    csn,
                    ref_known5,
                    ref_known3,
                    alt_known,
                    alt_highest5,
                    ref_highest5,
                    alt_highest3,
                    ref_highest3,
                    boundary5,
                    boundary3,
                },
            );
        }
        tracing::debug!("loaded {} MaxEntScan rows from {:?}", rows.len(), path);
        Ok(Self { rows })
    }

    /// Scores of a substitution, `None` for other variants and variants not in the table.
    pub fn scores(&self, key: &VariantKey) -> Result<Option<Scores>, anyhow::Error> {
        if key.kind() != VariantKind::Substitution {
            return Ok(None);
        }
        self.rows.get(key).map(Row::scores).transpose()
    }
}
