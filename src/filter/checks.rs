//! Evaluation of the de novo checks for one variant annotation.

use std::collections::HashSet;

use itertools::Itertools;
use parse_display::Display;

use crate::alleles::{self, AlleleEvidence, ReadSource};
use crate::calls::{CallSet, Quality, VariantAnnotation};
use crate::common::{round2, Float};
use crate::config::Config;
use crate::control::ControlTable;
use crate::csn;
use crate::freqs::{self, FrequencyRecord, RecordSource};
use crate::variant::{Site, VariantKey};

/// Reason for rejecting a candidate, rendered as written to the `FILTER` column.
#[derive(Debug, Clone, Copy, PartialEq, Display, strum::IntoStaticStr)]
#[display(style = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Reason {
    Multiallelic,
    CalledInParent,
    LowQuality,
    OutsideSpliceSiteBoundary,
    #[display("low_child_tr ({0})")]
    LowChildTr(u32),
    #[display("low_child_tc ({0})")]
    LowChildTc(u32),
    /// Ratio rounded to two decimals.
    #[display("low_child_tr_per_tc ({0})")]
    LowChildTrPerTc(Float),
    #[display("high_control_frequency ({0})")]
    HighControlFrequency(Float),
    /// Frequency rounded to two decimals.
    #[display("high_gnomad_exomes_frequency ({0})")]
    HighGnomadExomesFrequency(Float),
    /// Frequency rounded to two decimals.
    #[display("high_gnomad_genomes_frequency ({0})")]
    HighGnomadGenomesFrequency(Float),
    #[display("low_mother_tc ({0})")]
    LowMotherTc(u32),
    #[display("high_mother_tr ({0})")]
    HighMotherTr(u32),
    #[display("low_father_tc ({0})")]
    LowFatherTc(u32),
    #[display("high_father_tr ({0})")]
    HighFatherTr(u32),
}

impl Reason {
    /// The label without the value, e.g. `low_child_tr`.
    pub fn label(&self) -> &'static str {
        self.into()
    }
}

/// Whether evaluation stops at the first failing check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    /// Stop at the first failing check.
    #[default]
    Fast,
    /// Run all checks and collect every reason.
    Detailed,
}

/// Outcome of evaluating one variant annotation.
///
/// Auxiliary values are `None` when evaluation stopped before they were computed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Evaluation {
    /// Reasons in check order, empty for accepted candidates.
    pub reasons: Vec<Reason>,
    pub control_frequency: Option<f64>,
    pub gnomad_exomes: Option<FrequencyRecord>,
    pub gnomad_genomes: Option<FrequencyRecord>,
    pub mother: Option<AlleleEvidence>,
    pub father: Option<AlleleEvidence>,
}

impl Evaluation {
    pub fn is_accepted(&self) -> bool {
        self.reasons.is_empty()
    }

    /// Comma-joined reasons, `.` when accepted.
    pub fn filter_value(&self) -> String {
        if self.reasons.is_empty() {
            String::from(".")
        } else {
            self.reasons.iter().join(",")
        }
    }
}

/// Resources shared by the evaluation of all variants of one run.
pub struct Context {
    /// `(chrom, pos, ref)` sites of the child with more than one alternative allele.
    pub multiallelic_sites: HashSet<Site>,
    pub mother_calls: CallSet,
    pub father_calls: CallSet,
    pub control: ControlTable,
    pub gnomad_exomes: Box<dyn RecordSource>,
    pub gnomad_genomes: Box<dyn RecordSource>,
    pub mother_reads: Box<dyn ReadSource>,
    pub father_reads: Box<dyn ReadSource>,
}

/// Why the checks stopped early.
enum Interrupt {
    /// A check failed in fast mode.
    Threshold(Reason),
    Data(anyhow::Error),
}

impl From<anyhow::Error> for Interrupt {
    fn from(value: anyhow::Error) -> Self {
        Interrupt::Data(value)
    }
}

struct Accumulator {
    mode: Mode,
    evaluation: Evaluation,
}

impl Accumulator {
    /// Record `reason` if `failed`; in fast mode this ends the evaluation.
    fn check(&mut self, failed: bool, reason: Reason) -> Result<(), Interrupt> {
        if !failed {
            return Ok(());
        }
        match self.mode {
            Mode::Fast => Err(Interrupt::Threshold(reason)),
            Mode::Detailed => {
                self.evaluation.reasons.push(reason);
                Ok(())
            }
        }
    }
}

fn run_checks(
    acc: &mut Accumulator,
    key: &VariantKey,
    annotation: &VariantAnnotation,
    config: &Config,
    context: &mut Context,
) -> Result<(), Interrupt> {
    acc.check(
        config.remove_multi_allele_calls && context.multiallelic_sites.contains(&key.site()),
        Reason::Multiallelic,
    )?;
    acc.check(
        context.mother_calls.contains(key) || context.father_calls.contains(key),
        Reason::CalledInParent,
    )?;
    acc.check(annotation.quality == Quality::Low, Reason::LowQuality)?;
    acc.check(
        !csn::within_boundary(&annotation.csn, config.splice_site_boundary)?,
        Reason::OutsideSpliceSiteBoundary,
    )?;

    acc.check(
        annotation.tr < config.child_min_tr,
        Reason::LowChildTr(annotation.tr),
    )?;
    acc.check(
        annotation.tc < config.child_min_tc,
        Reason::LowChildTc(annotation.tc),
    )?;
    let ratio = annotation.tr_per_tc();
    acc.check(
        ratio < config.child_min_tr_per_tc,
        Reason::LowChildTrPerTc(Float(round2(ratio))),
    )?;

    let csn_key = annotation.csn_key();
    let control = context.control.frequency(key, &csn_key);
    acc.evaluation.control_frequency = Some(control);
    acc.check(
        control > config.control_max_frequency,
        Reason::HighControlFrequency(Float(control)),
    )?;

    let exomes = freqs::max_frequency(context.gnomad_exomes.as_mut(), key, &csn_key)?;
    acc.evaluation.gnomad_exomes = Some(exomes.clone());
    acc.check(
        exomes.frequency > config.gnomad_max_frequency,
        Reason::HighGnomadExomesFrequency(Float(round2(exomes.frequency))),
    )?;
    let genomes = freqs::max_frequency(context.gnomad_genomes.as_mut(), key, &csn_key)?;
    acc.evaluation.gnomad_genomes = Some(genomes.clone());
    acc.check(
        genomes.frequency > config.gnomad_max_frequency,
        Reason::HighGnomadGenomesFrequency(Float(round2(genomes.frequency))),
    )?;

    let mother = alleles::count_in_source(context.mother_reads.as_mut(), key)?;
    let father = alleles::count_in_source(context.father_reads.as_mut(), key)?;
    acc.evaluation.mother = Some(mother);
    acc.evaluation.father = Some(father);
    acc.check(
        mother.tc < config.parent_min_coverage,
        Reason::LowMotherTc(mother.tc),
    )?;
    acc.check(
        mother.tr > config.parent_max_alt_allele_count,
        Reason::HighMotherTr(mother.tr),
    )?;
    acc.check(
        father.tc < config.parent_min_coverage,
        Reason::LowFatherTc(father.tc),
    )?;
    acc.check(
        father.tr > config.parent_max_alt_allele_count,
        Reason::HighFatherTr(father.tr),
    )?;

    Ok(())
}

/// Run the de novo checks in their fixed order.
///
/// In [`Mode::Fast`] the first failing check ends the evaluation and is the only reason; in
/// [`Mode::Detailed`] all checks run.  Malformed input is returned as error, annotated with
/// the variant.
pub fn evaluate(
    key: &VariantKey,
    annotation: &VariantAnnotation,
    config: &Config,
    context: &mut Context,
    mode: Mode,
) -> Result<Evaluation, anyhow::Error> {
    let mut acc = Accumulator {
        mode,
        evaluation: Evaluation::default(),
    };
    match run_checks(&mut acc, key, annotation, config, context) {
        Ok(()) => {}
        Err(Interrupt::Threshold(reason)) => acc.evaluation.reasons.push(reason),
        Err(Interrupt::Data(e)) => {
            return Err(e.context(format!(
                "could not evaluate {} ({} {})",
                key, annotation.gene, annotation.csn
            )))
        }
    }
    tracing::trace!("{} {} -> {}", key, annotation.csn, acc.evaluation.filter_value());
    Ok(acc.evaluation)
}
