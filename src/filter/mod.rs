//! Implementation of the `filter` sub command.

pub mod checks;
pub mod output;

use std::path::Path;
use std::time::Instant;

use clap::Parser;
use indexmap::IndexMap;
use thousands::Separable;

use crate::calls::{CallSet, VariantAnnotation};
use crate::common::noodles::IndexedBam;
use crate::config::Config;
use crate::constraint::ConstraintTable;
use crate::control::ControlTable;
use crate::freqs::reading::open_source;
use crate::maxentscan::MaxEntScanTable;
use crate::variant::VariantKey;

use self::checks::{Context, Mode};
use self::output::{Columns, Extras, Writers};

/// Command line arguments for `filter` sub command.
#[derive(Parser, Debug)]
#[command(about = "Filter de novo candidates of a trio", long_about = None)]
pub struct Args {
    /// Path to the annotated VCF file of the child.
    #[arg(long)]
    pub path_child_vcf: String,
    /// Path to the annotated VCF file of the mother.
    #[arg(long)]
    pub path_mother_vcf: String,
    /// Path to the annotated VCF file of the father.
    #[arg(long)]
    pub path_father_vcf: String,
    /// Path to the indexed BAM file of the mother.
    #[arg(long)]
    pub path_mother_bam: String,
    /// Path to the indexed BAM file of the father.
    #[arg(long)]
    pub path_father_bam: String,
    /// Path to the configuration file, defaults are used if not given.
    #[arg(long)]
    pub path_config: Option<String>,

    /// Prefix of the output files.
    #[arg(long)]
    pub output_prefix: String,
    /// Run all checks and write full rows for filtered out variants.
    #[arg(long, default_value_t = false)]
    pub full_details: bool,
    /// Stop at the first variant that cannot be evaluated.
    #[arg(long, default_value_t = false)]
    pub fail_fast: bool,

    /// For debug purposes, maximal number of variants to filter.
    #[arg(long)]
    pub max_var_count: Option<usize>,
}

/// Options of the processing loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    pub mode: Mode,
    pub fail_fast: bool,
    pub max_var_count: Option<usize>,
}

/// Tables that only contribute output columns.
#[derive(Debug, Default)]
pub struct Reporting {
    pub maxentscan: Option<MaxEntScanTable>,
    pub constraint: Option<ConstraintTable>,
}

impl Reporting {
    /// Load the tables configured in `config`.
    pub fn load(config: &Config) -> Result<Self, anyhow::Error> {
        let maxentscan = if config.maxentscan_data_file.is_empty() {
            None
        } else {
            tracing::info!("Loading MaxEntScan table ...");
            Some(MaxEntScanTable::from_path(&config.maxentscan_data_file)?)
        };
        let constraint = if config.exac_data_file.is_empty() {
            None
        } else {
            tracing::info!("Loading ExAC constraint table ...");
            Some(ConstraintTable::from_path(&config.exac_data_file)?)
        };
        Ok(Self {
            maxentscan,
            constraint,
        })
    }

    pub fn columns(&self) -> Columns {
        Columns {
            maxentscan: self.maxentscan.is_some(),
            exac: self.constraint.is_some(),
        }
    }

    fn extras(
        &self,
        key: &VariantKey,
        annotation: &VariantAnnotation,
    ) -> Result<Extras, anyhow::Error> {
        let maxentscan = match &self.maxentscan {
            Some(table) => table.scores(key)?.map(|scores| scores.values()),
            None => None,
        };
        let exac = self
            .constraint
            .as_ref()
            .and_then(|table| table.get(&annotation.gene))
            .map(|constraint| constraint.values());
        Ok(Extras { maxentscan, exac })
    }
}

/// Counts of one processing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub accepted: usize,
    pub rejected: usize,
    /// Annotations that could not be evaluated.
    pub errors: usize,
    /// Rejected annotations by label of their first reason.
    pub reasons: IndexMap<&'static str, usize>,
}

impl Summary {
    fn log(&self) {
        tracing::info!(
            "{} candidates, {} filtered out, {} errors",
            self.accepted.separate_with_commas(),
            self.rejected.separate_with_commas(),
            self.errors.separate_with_commas()
        );
        for (label, count) in &self.reasons {
            tracing::info!("  - {}: {}", label, count.separate_with_commas());
        }
    }
}

/// Evaluate all annotations of `child` in input order and write them to `writers`.
pub fn process(
    child: &CallSet,
    config: &Config,
    context: &mut Context,
    reporting: &Reporting,
    writers: &mut Writers,
    options: &Options,
) -> Result<Summary, anyhow::Error> {
    let mut summary = Summary::default();
    let mut total_seen = 0usize;

    for (key, annotations) in child.iter() {
        if let Some(max_var_count) = options.max_var_count {
            if total_seen >= max_var_count {
                tracing::warn!(
                    "Stopping after {} variants as requested by --max-var-count",
                    total_seen
                );
                break;
            }
        }
        total_seen += 1;

        for annotation in annotations {
            let result = checks::evaluate(key, annotation, config, context, options.mode)
                .and_then(|evaluation| Ok((reporting.extras(key, annotation)?, evaluation)));
            let (extras, evaluation) = match result {
                Ok(value) => value,
                Err(e) if options.fail_fast => return Err(e),
                Err(e) => {
                    tracing::error!("skipping: {:#}", e);
                    summary.errors += 1;
                    continue;
                }
            };

            writers.write(key, annotation, &evaluation, &extras)?;
            match evaluation.reasons.first() {
                None => summary.accepted += 1,
                Some(reason) => {
                    summary.rejected += 1;
                    *summary.reasons.entry(reason.label()).or_default() += 1;
                }
            }
        }
    }
    writers.flush()?;

    Ok(summary)
}

fn load_calls(label: &str, path: &str) -> Result<CallSet, anyhow::Error> {
    tracing::info!("Loading {} calls from {} ...", label, path);
    let result = CallSet::from_path(path)?;
    tracing::info!(
        "... loaded {} variants with {} annotations",
        result.len().separate_with_commas(),
        result.annotation_count().separate_with_commas()
    );
    Ok(result)
}

/// Main entry point for `filter` sub command.
pub fn run(_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("args = {:#?}", &args);
    let config = Config::load(args.path_config.as_deref().map(Path::new))?;
    tracing::info!("config = {:#?}", &config);

    let child = load_calls("child", &args.path_child_vcf)?;
    let mother_calls = load_calls("mother", &args.path_mother_vcf)?;
    let father_calls = load_calls("father", &args.path_father_vcf)?;

    let control = if config.control_data_file.is_empty() {
        ControlTable::default()
    } else {
        tracing::info!("Loading control table ...");
        let control = ControlTable::from_path(&config.control_data_file)?;
        tracing::info!(
            "... loaded {} control variants of {} samples",
            control.len().separate_with_commas(),
            control.samples()
        );
        control
    };
    let reporting = Reporting::load(&config)?;

    tracing::info!("Opening frequency databases and alignments");
    let mut context = Context {
        multiallelic_sites: child.multiallelic_sites(),
        mother_calls,
        father_calls,
        control,
        gnomad_exomes: open_source("gnomAD exomes", &config.gnomad_exomes_data_file)?,
        gnomad_genomes: open_source("gnomAD genomes", &config.gnomad_genomes_data_file)?,
        mother_reads: Box::new(IndexedBam::from_path(&args.path_mother_bam)?),
        father_reads: Box::new(IndexedBam::from_path(&args.path_father_bam)?),
    };
    let mut writers = Writers::create(&args.output_prefix, reporting.columns(), args.full_details)?;
    let options = Options {
        mode: if args.full_details {
            Mode::Detailed
        } else {
            Mode::Fast
        },
        fail_fast: args.fail_fast,
        max_var_count: args.max_var_count,
    };

    tracing::info!("Filtering variants ({} mode) ...", options.mode);
    let start = Instant::now();
    let summary = process(&child, &config, &mut context, &reporting, &mut writers, &options)?;
    tracing::info!("... done filtering in {:?}", start.elapsed());
    summary.log();

    if summary.errors > 0 {
        anyhow::bail!(
            "{} variant annotations could not be evaluated",
            summary.errors.separate_with_commas()
        );
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use clap_verbosity_flag::Verbosity;
    use pretty_assertions::assert_eq;
    use temp_testdir::TempDir;

    use super::*;
    use crate::calls::test::call;
    use crate::filter::checks::test::reads;
    use crate::filter::output::{candidates_path, filtered_out_path};
    use crate::freqs::MemoryRecords;

    fn context() -> Result<Context, anyhow::Error> {
        Ok(Context {
            multiallelic_sites: HashSet::new(),
            mother_calls: CallSet::from_path("tests/data/calls/mother.vcf")?,
            father_calls: CallSet::from_path("tests/data/calls/father.vcf")?,
            control: ControlTable::default(),
            gnomad_exomes: Box::new(MemoryRecords::new()),
            gnomad_genomes: Box::new(MemoryRecords::new()),
            mother_reads: Box::new(reads("11", 1642299, 20, 0)),
            father_reads: Box::new(reads("11", 1642299, 18, 0)),
        })
    }

    fn prefix(tmp_dir: &TempDir) -> String {
        format!("{}/trio", tmp_dir.to_string_lossy())
    }

    fn lines(path: impl AsRef<Path>) -> Result<Vec<String>, anyhow::Error> {
        Ok(std::fs::read_to_string(path)?
            .lines()
            .map(String::from)
            .collect())
    }

    #[test]
    fn process_fast() -> Result<(), anyhow::Error> {
        let tmp_dir = TempDir::default();
        let child = CallSet::from_path("tests/data/calls/child.vcf")?;
        let mut context = Context {
            multiallelic_sites: child.multiallelic_sites(),
            ..context()?
        };
        let mut writers = Writers::create(&prefix(&tmp_dir), Columns::default(), false)?;

        let summary = process(
            &child,
            &Config::default(),
            &mut context,
            &Reporting::default(),
            &mut writers,
            &Options::default(),
        )?;
        drop(writers);

        assert_eq!(
            summary,
            Summary {
                accepted: 1,
                rejected: 9,
                errors: 0,
                reasons: [
                    ("multiallelic", 6),
                    ("outside_splice_site_boundary", 2),
                    ("called_in_parent", 1),
                ]
                .into_iter()
                .collect(),
            }
        );

        let candidates = lines(candidates_path(&prefix(&tmp_dir)))?;
        assert_eq!(candidates.len(), 2);
        assert_eq!(
            candidates[1],
            "11\t1642299\tT\tA\tKRTAP5-4\tc.+338A>T\t3PU\t.\t.\t27\t60\t0.0\t0.0\t.\t0.0\t.\t20\t0\t18\t0\t."
        );

        let filtered_out = lines(filtered_out_path(&prefix(&tmp_dir)))?;
        assert_eq!(filtered_out.len(), 10);
        assert_eq!(
            filtered_out[3],
            "X\t152728155\tT\tC\tTREX2\tc.-1229-26A>G\toutside_splice_site_boundary"
        );
        assert_eq!(
            filtered_out[9],
            "1\t20699518\tC\tT\tNELL1\tc.96C>T_p.=\tcalled_in_parent"
        );

        Ok(())
    }

    #[test]
    fn process_full_details() -> Result<(), anyhow::Error> {
        let tmp_dir = TempDir::default();
        let child = CallSet::from_path("tests/data/calls/child.vcf")?;
        let mut context = Context {
            multiallelic_sites: child.multiallelic_sites(),
            ..context()?
        };
        let reporting = Reporting {
            maxentscan: Some(MaxEntScanTable::from_path(
                "tests/data/maxentscan/maxentscan.txt",
            )?),
            constraint: Some(ConstraintTable::from_path("tests/data/constraint/exac.txt")?),
        };
        let mut writers = Writers::create(&prefix(&tmp_dir), reporting.columns(), true)?;

        let summary = process(
            &child,
            &Config::default(),
            &mut context,
            &reporting,
            &mut writers,
            &Options {
                mode: Mode::Detailed,
                ..Default::default()
            },
        )?;
        drop(writers);

        assert_eq!((summary.accepted, summary.rejected), (1, 9));

        let filtered_out = lines(filtered_out_path(&prefix(&tmp_dir)))?;
        let header = filtered_out[0].split('\t').collect::<Vec<_>>();
        assert_eq!(header.len(), 44);
        let nell1 = filtered_out[9].split('\t').collect::<Vec<_>>();
        assert_eq!(nell1.len(), 44);
        assert_eq!(&nell1[..2], &["1", "20699518"]);
        // no reads at this locus in the parents
        assert_eq!(&nell1[16..20], &["0", "0", "0", "0"]);
        assert_eq!(&nell1[37..39], &["287", "362.5"]);
        assert_eq!(
            nell1[43],
            "called_in_parent,low_mother_tc (0),low_father_tc (0)"
        );

        Ok(())
    }

    #[rstest::rstest]
    #[case(false)]
    #[case(true)]
    fn process_with_error(#[case] fail_fast: bool) -> Result<(), anyhow::Error> {
        let tmp_dir = TempDir::default();
        let mut child = CallSet::default();
        child.extend_from(&call(
            "11  1642298  .  G  C  200  PASS  TC=60;TR=27;GENE=KRTAP5-4;CSN=p.Gly12Asp;CLASS=3PU",
        ))?;
        child.extend_from(&call(
            "11  1642299  .  T  A  200  PASS  TC=60;TR=27;GENE=KRTAP5-4;CSN=c.+338A>T;CLASS=3PU",
        ))?;
        let mut writers = Writers::create(&prefix(&tmp_dir), Columns::default(), false)?;

        let result = process(
            &child,
            &Config::default(),
            &mut context()?,
            &Reporting::default(),
            &mut writers,
            &Options {
                fail_fast,
                ..Default::default()
            },
        );
        drop(writers);

        if fail_fast {
            assert!(result.is_err());
        } else {
            let summary = result?;
            assert_eq!((summary.accepted, summary.rejected, summary.errors), (1, 0, 1));
            assert_eq!(lines(candidates_path(&prefix(&tmp_dir)))?.len(), 2);
            assert_eq!(lines(filtered_out_path(&prefix(&tmp_dir)))?.len(), 1);
        }

        Ok(())
    }

    #[test]
    fn process_max_var_count() -> Result<(), anyhow::Error> {
        let tmp_dir = TempDir::default();
        let child = CallSet::from_path("tests/data/calls/child.vcf")?;
        let mut writers = Writers::create(&prefix(&tmp_dir), Columns::default(), false)?;

        let summary = process(
            &child,
            &Config::default(),
            &mut context()?,
            &Reporting::default(),
            &mut writers,
            &Options {
                max_var_count: Some(1),
                ..Default::default()
            },
        )?;

        assert_eq!((summary.accepted, summary.rejected), (1, 0));

        Ok(())
    }

    #[test]
    fn run_with_indexed_files() -> Result<(), anyhow::Error> {
        let tmp_dir = TempDir::default();
        let path_config = format!("{}/config.txt", tmp_dir.to_string_lossy());
        std::fs::write(
            &path_config,
            "GNOMAD_MAX_FREQUENCY = 20\n\
             GNOMAD_EXOMES_DATA_FILE = tests/data/freqs/gnomad_exomes.vcf.gz\n\
             GNOMAD_GENOMES_DATA_FILE = tests/data/freqs/gnomad_genomes.{}.vcf.gz\n",
        )?;
        let args_common = crate::common::Args {
            verbose: Verbosity::new(0, 1),
        };
        let args = Args {
            path_child_vcf: String::from("tests/data/calls/child.vcf"),
            path_mother_vcf: String::from("tests/data/calls/mother.vcf"),
            path_father_vcf: String::from("tests/data/calls/father.vcf"),
            path_mother_bam: String::from("tests/data/alignments/mother.bam"),
            path_father_bam: String::from("tests/data/alignments/mother.bam"),
            path_config: Some(path_config),
            output_prefix: prefix(&tmp_dir),
            full_details: false,
            fail_fast: false,
            max_var_count: None,
        };

        run(&args_common, &args)?;

        assert_eq!(lines(candidates_path(&prefix(&tmp_dir)))?.len(), 1);
        let filtered_out = lines(filtered_out_path(&prefix(&tmp_dir)))?;
        assert_eq!(filtered_out.len(), 11);
        assert_eq!(
            filtered_out[1],
            "11\t1642299\tT\tA\tKRTAP5-4\tc.+338A>T\thigh_mother_tr (4)"
        );

        Ok(())
    }

    #[test]
    fn run_missing_bam() {
        let tmp_dir = TempDir::default();
        let args_common = crate::common::Args {
            verbose: Verbosity::new(0, 1),
        };
        let args = Args {
            path_child_vcf: String::from("tests/data/calls/child.vcf"),
            path_mother_vcf: String::from("tests/data/calls/mother.vcf"),
            path_father_vcf: String::from("tests/data/calls/father.vcf"),
            path_mother_bam: String::from("tests/data/calls/missing.bam"),
            path_father_bam: String::from("tests/data/calls/missing.bam"),
            path_config: None,
            output_prefix: prefix(&tmp_dir),
            full_details: false,
            fail_fast: false,
            max_var_count: None,
        };

        assert!(run(&args_common, &args).is_err());
    }
}
