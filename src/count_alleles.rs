//! Implementation of the `count-alleles` sub command.

use std::io::Write;

use clap::Parser;

use crate::alleles::{self, ReadSource};
use crate::common::noodles::IndexedBam;
use crate::variant::VariantKey;

/// Command line arguments for `count-alleles` sub command.
#[derive(Parser, Debug)]
#[command(about = "Count coverage and allele support in an alignment", long_about = None)]
pub struct Args {
    /// Path to the indexed BAM file.
    #[arg(long)]
    pub path_bam: String,
    /// Variant as `CHROM:POS:REF:ALT`, 1-based position.
    #[arg(long)]
    pub variant: VariantKey,
}

/// Count the reads for `key` in `source` and write `TC` and `TR` to `out`.
pub fn run_with_source<S, W>(source: &mut S, key: &VariantKey, out: &mut W) -> Result<(), anyhow::Error>
where
    S: ReadSource + ?Sized,
    W: Write,
{
    let evidence = alleles::count_in_source(source, key)?;
    writeln!(out, "VARIANT\tTC\tTR")?;
    writeln!(out, "{}\t{}\t{}", key, evidence.tc, evidence.tr)?;
    Ok(())
}

/// Main entry point for `count-alleles` sub command.
pub fn run(_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("args = {:#?}", &args);
    let mut source = IndexedBam::from_path(&args.path_bam)?;
    run_with_source(&mut source, &args.variant, &mut std::io::stdout().lock())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::filter::checks::test::reads;

    #[test]
    fn counts() -> Result<(), anyhow::Error> {
        let mut source = reads("11", 1642299, 12, 5);
        let key: VariantKey = "chr11:1642299:T:A".parse()?;

        let mut out = Vec::new();
        run_with_source(&mut source, &key, &mut out)?;

        assert_eq!(
            String::from_utf8(out)?,
            "VARIANT\tTC\tTR\n11:1642299:T:A\t12\t5\n"
        );

        Ok(())
    }

    #[test]
    fn counts_from_bam() -> Result<(), anyhow::Error> {
        let mut source = IndexedBam::from_path("tests/data/alignments/mother.bam")?;
        let key: VariantKey = "11:1642299:T:A".parse()?;

        let mut out = Vec::new();
        run_with_source(&mut source, &key, &mut out)?;

        assert_eq!(
            String::from_utf8(out)?,
            "VARIANT\tTC\tTR\n11:1642299:T:A\t9\t4\n"
        );

        Ok(())
    }

    #[test]
    fn parse_args() {
        let args = Args::try_parse_from([
            "count-alleles",
            "--path-bam",
            "mother.bam",
            "--variant",
            "X:66765242:GGCA:G",
        ])
        .unwrap();

        assert_eq!(args.variant, VariantKey::new("X", 66765242, "GGCA", "G"));
    }
}
