//! Writing of the candidate and filtered-out tables.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::calls::VariantAnnotation;
use crate::common::Float;
use crate::variant::VariantKey;
use crate::{constraint, maxentscan};

use super::checks::Evaluation;

/// Leading columns of the full rows.
static FULL_COLUMNS: &[&str] = &[
    "CHROM",
    "POS",
    "REF",
    "ALT",
    "GENE",
    "CSN",
    "CLASS",
    "ALTANN",
    "ALTCLASS",
    "TR",
    "TC",
    "CONTROL_FREQ",
    "GNOMAD_EXOMES_FREQ",
    "GNOMAD_EXOMES_POP",
    "GNOMAD_GENOMES_FREQ",
    "GNOMAD_GENOMES_POP",
    "MOTHER_TC",
    "MOTHER_TR",
    "FATHER_TC",
    "FATHER_TR",
];

/// Columns of the short rows.
static SHORT_COLUMNS: &[&str] = &["CHROM", "POS", "REF", "ALT", "GENE", "CSN", "FILTER"];

/// Placeholder for values that were not computed.
const MISSING: &str = ".";

/// Which optional reporting columns are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Columns {
    pub maxentscan: bool,
    pub exac: bool,
}

impl Columns {
    /// Header of the full rows.
    pub fn full_header(&self) -> Vec<&'static str> {
        let mut result = FULL_COLUMNS.to_vec();
        if self.maxentscan {
            result.extend_from_slice(maxentscan::COLUMNS);
        }
        if self.exac {
            result.extend_from_slice(constraint::COLUMNS);
        }
        result.push("FILTER");
        result
    }
}

/// Values of the optional reporting columns of one row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Extras {
    /// MaxEntScan values, `None` if no scores are available for the variant.
    pub maxentscan: Option<Vec<String>>,
    /// ExAC values, `None` if the gene has no constraint metrics.
    pub exac: Option<Vec<String>>,
}

fn or_missing<T: ToString>(value: Option<T>) -> String {
    value
        .map(|value| value.to_string())
        .unwrap_or_else(|| String::from(MISSING))
}

fn missing(count: usize) -> Vec<String> {
    vec![String::from(MISSING); count]
}

/// Build the full row of one evaluated annotation.
pub fn full_row(
    columns: &Columns,
    key: &VariantKey,
    annotation: &VariantAnnotation,
    evaluation: &Evaluation,
    extras: &Extras,
) -> Vec<String> {
    let mut result = vec![
        key.chrom().to_string(),
        key.pos().to_string(),
        key.reference().to_string(),
        key.alternative().to_string(),
        annotation.gene.clone(),
        annotation.csn.clone(),
        annotation.class.clone(),
        annotation.altann.clone(),
        annotation.altclass.clone(),
        annotation.tr.to_string(),
        annotation.tc.to_string(),
        or_missing(evaluation.control_frequency.map(Float)),
        or_missing(evaluation.gnomad_exomes.as_ref().map(|r| Float(r.frequency))),
        or_missing(evaluation.gnomad_exomes.as_ref().map(|r| &r.population)),
        or_missing(evaluation.gnomad_genomes.as_ref().map(|r| Float(r.frequency))),
        or_missing(evaluation.gnomad_genomes.as_ref().map(|r| &r.population)),
        or_missing(evaluation.mother.map(|e| e.tc)),
        or_missing(evaluation.mother.map(|e| e.tr)),
        or_missing(evaluation.father.map(|e| e.tc)),
        or_missing(evaluation.father.map(|e| e.tr)),
    ];
    if columns.maxentscan {
        result.extend(
            extras
                .maxentscan
                .clone()
                .unwrap_or_else(|| missing(maxentscan::COLUMNS.len())),
        );
    }
    if columns.exac {
        result.extend(
            extras
                .exac
                .clone()
                .unwrap_or_else(|| missing(constraint::COLUMNS.len())),
        );
    }
    result.push(evaluation.filter_value());
    result
}

/// Build the short row of one rejected annotation.
pub fn short_row(
    key: &VariantKey,
    annotation: &VariantAnnotation,
    evaluation: &Evaluation,
) -> Vec<String> {
    vec![
        key.chrom().to_string(),
        key.pos().to_string(),
        key.reference().to_string(),
        key.alternative().to_string(),
        annotation.gene.clone(),
        annotation.csn.clone(),
        evaluation.filter_value(),
    ]
}

fn open_writer(path: &Path) -> Result<csv::Writer<File>, anyhow::Error> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .from_path(path)
        .map_err(|e| anyhow::anyhow!("could not create output file {:?}: {}", path, e))
}

/// Path of the candidates table for `prefix`.
pub fn candidates_path(prefix: &str) -> PathBuf {
    PathBuf::from(format!("{}_denovo_candidates.txt", prefix))
}

/// Path of the filtered-out table for `prefix`.
pub fn filtered_out_path(prefix: &str) -> PathBuf {
    PathBuf::from(format!("{}_filtered_out.txt", prefix))
}

/// Writers for the two output tables of a run.
pub struct Writers {
    columns: Columns,
    full_details: bool,
    candidates: csv::Writer<File>,
    filtered_out: csv::Writer<File>,
}

impl Writers {
    /// Create both output files for `prefix` and write their headers.
    pub fn create(prefix: &str, columns: Columns, full_details: bool) -> Result<Self, anyhow::Error> {
        let mut candidates = open_writer(&candidates_path(prefix))?;
        let mut filtered_out = open_writer(&filtered_out_path(prefix))?;

        let header = columns.full_header();
        candidates.write_record(&header)?;
        if full_details {
            filtered_out.write_record(&header)?;
        } else {
            filtered_out.write_record(SHORT_COLUMNS)?;
        }

        Ok(Self {
            columns,
            full_details,
            candidates,
            filtered_out,
        })
    }

    /// Write the row of one evaluated annotation to the matching table.
    pub fn write(
        &mut self,
        key: &VariantKey,
        annotation: &VariantAnnotation,
        evaluation: &Evaluation,
        extras: &Extras,
    ) -> Result<(), anyhow::Error> {
        if evaluation.is_accepted() {
            self.candidates
                .write_record(full_row(&self.columns, key, annotation, evaluation, extras))?;
        } else if self.full_details {
            self.filtered_out
                .write_record(full_row(&self.columns, key, annotation, evaluation, extras))?;
        } else {
            self.filtered_out
                .write_record(short_row(key, annotation, evaluation))?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), anyhow::Error> {
        self.candidates.flush()?;
        self.filtered_out.flush()?;
        Ok(())
    }
}
