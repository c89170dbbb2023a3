//! File-backed frequency database sources.

use std::collections::HashMap;
use std::path::Path;

use crate::common::noodles::IndexedVcf;

use super::{FreqVcfRecord, MemoryRecords, RecordSource};

/// Placeholder in a path template that is replaced by the chromosome name.
pub const CHROM_PLACEHOLDER: &str = "{}";

/// Convert the records of an indexed VCF query.
fn fetch_records(
    vcf: &mut IndexedVcf,
    chrom: &str,
    start: i64,
    end: i64,
) -> Result<Vec<FreqVcfRecord>, anyhow::Error> {
    vcf.fetch(chrom, start, end)?
        .iter()
        .map(FreqVcfRecord::from_vcf)
        .collect()
}

/// One tabix-indexed VCF file covering all chromosomes.
pub struct SingleFile {
    vcf: IndexedVcf,
}

impl SingleFile {
    pub fn from_path(path: &str) -> Result<Self, anyhow::Error> {
        Ok(Self {
            vcf: IndexedVcf::from_path(path)?,
        })
    }
}

impl RecordSource for SingleFile {
    fn fetch(
        &mut self,
        chrom: &str,
        start: i64,
        end: i64,
    ) -> Result<Vec<FreqVcfRecord>, anyhow::Error> {
        fetch_records(&mut self.vcf, chrom, start, end)
    }
}

/// One tabix-indexed VCF file per chromosome, opened on first use.
pub struct ChromosomeSplit {
    template: String,
    /// Opened files; `None` when the file for the chromosome does not exist.
    files: HashMap<String, Option<IndexedVcf>>,
}

impl ChromosomeSplit {
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
            files: HashMap::new(),
        }
    }

    /// Path of the file for `chrom`.
    pub fn path_for(&self, chrom: &str) -> String {
        self.template.replace(CHROM_PLACEHOLDER, chrom)
    }

    /// Existing file for `chrom`, trying `chrom` and `chr{chrom}` in the template.
    pub fn resolve_path(&self, chrom: &str) -> Option<String> {
        [chrom.to_string(), format!("chr{}", chrom)]
            .iter()
            .map(|name| self.path_for(name))
            .find(|path| Path::new(path).exists())
    }
}

impl RecordSource for ChromosomeSplit {
    fn fetch(
        &mut self,
        chrom: &str,
        start: i64,
        end: i64,
    ) -> Result<Vec<FreqVcfRecord>, anyhow::Error> {
        if !self.files.contains_key(chrom) {
            let vcf = match self.resolve_path(chrom) {
                Some(path) => {
                    tracing::debug!("opening {}", &path);
                    Some(IndexedVcf::from_path(&path)?)
                }
                None => {
                    tracing::debug!(
                        "no frequency file {} for chromosome {}",
                        self.path_for(chrom),
                        chrom
                    );
                    None
                }
            };
            self.files.insert(chrom.to_string(), vcf);
        }

        match self.files.get_mut(chrom) {
            Some(Some(vcf)) => fetch_records(vcf, chrom, start, end),
            _ => Ok(Vec::new()),
        }
    }
}

/// Open the frequency database configured by `path`.
///
/// An empty path yields an empty source, a path containing `{}` one file per chromosome.
pub fn open_source(label: &str, path: &str) -> Result<Box<dyn RecordSource>, anyhow::Error> {
    if path.is_empty() {
        tracing::info!("{} frequencies not configured", label);
        Ok(Box::new(MemoryRecords::default()))
    } else if path.contains(CHROM_PLACEHOLDER) {
        tracing::info!("{} frequencies from per-chromosome files {}", label, path);
        Ok(Box::new(ChromosomeSplit::new(path)))
    } else {
        tracing::info!("{} frequencies from {}", label, path);
        Ok(Box::new(SingleFile::from_path(path)?))
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::freqs::{max_frequency, FrequencyRecord};
    use crate::variant::{CsnKey, VariantKey};

    fn nfe(frequency: f64) -> FrequencyRecord {
        FrequencyRecord {
            frequency,
            population: String::from("NFE"),
        }
    }

    #[test]
    fn path_for_chrom() {
        let split = ChromosomeSplit::new("/data/gnomad.genomes.chr{}.vcf.gz");
        assert_eq!(split.path_for("X"), "/data/gnomad.genomes.chrX.vcf.gz");
    }

    #[test]
    fn resolve_prefixed_path() {
        let split = ChromosomeSplit::new("tests/data/freqs/gnomad_genomes.{}.vcf.gz");

        assert_eq!(
            split.resolve_path("11").as_deref(),
            Some("tests/data/freqs/gnomad_genomes.chr11.vcf.gz")
        );
        assert_eq!(split.resolve_path("22"), None);
    }

    #[rstest::rstest]
    #[case("tests/data/freqs/gnomad_exomes.vcf.gz")]
    #[case("tests/data/freqs/gnomad_genomes.chr11.vcf.gz")]
    #[case("tests/data/freqs/gnomad_genomes.{}.vcf.gz")]
    fn max_frequency_from_file(#[case] path: &str) -> Result<(), anyhow::Error> {
        let mut source = open_source("gnomAD", path)?;
        let key = VariantKey::new("11", 1642299, "T", "A");

        assert_eq!(
            max_frequency(source.as_mut(), &key, &CsnKey::new("KRTAP5-4", "c.+338A>T"))?,
            nfe(10.0)
        );
        assert_eq!(
            max_frequency(source.as_mut(), &key, &CsnKey::new("KRTAP5-4", "."))?,
            nfe(10.0)
        );
        assert_eq!(
            max_frequency(
                source.as_mut(),
                &VariantKey::new("11", 1642350, "C", "G"),
                &CsnKey::new("KRTAP5-4", "c.+389G>C")
            )?,
            FrequencyRecord {
                frequency: 1.0,
                population: String::from("AFR"),
            }
        );
        assert_eq!(
            max_frequency(
                source.as_mut(),
                &VariantKey::new("22", 1642299, "T", "A"),
                &CsnKey::new("KRTAP5-4", "c.+338A>T")
            )?,
            FrequencyRecord::default()
        );

        Ok(())
    }

    #[test]
    fn records_from_indexed_file() -> Result<(), anyhow::Error> {
        let mut source = SingleFile::from_path("tests/data/freqs/gnomad_genomes.chr11.vcf.gz")?;

        let records = source.fetch("11", 1642199, 1642399)?;

        assert_eq!(records.len(), 3);
        let filtered = &records[0];
        assert_eq!(filtered.pos, 1642250);
        assert_eq!(filtered.reference, "G");
        assert_eq!(filtered.alternatives, vec!["C", "T"]);
        assert!(!filtered.pass);
        assert_eq!(
            filtered.info.keys().collect::<Vec<_>>(),
            vec!["GENE", "CSN", "GC_AFR", "GC_NFE"]
        );
        assert_eq!(
            filtered.info.get("CSN").map(String::as_str),
            Some("c.+289G>C,c.+289G>T")
        );
        assert!(records[1].pass);
        assert_eq!(records[1].populations(), vec!["AFR", "NFE"]);

        Ok(())
    }

    #[test]
    fn missing_chromosome_file_is_a_miss() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let template = format!("{}/missing.{{}}.vcf.gz", tmp_dir.to_string_lossy());
        let mut split = ChromosomeSplit::new(&template);

        assert!(split.fetch("22", 1000, 1200)?.is_empty());
        assert!(split.fetch("22", 5000, 5200)?.is_empty());

        Ok(())
    }

    #[test]
    fn open_unconfigured_source() -> Result<(), anyhow::Error> {
        let mut source = open_source("gnomAD exomes", "")?;
        assert!(source.fetch("1", 1, 1_000_000)?.is_empty());
        Ok(())
    }
}
