//! Annotated variant call sets of the trio.
//!
//! Calls are read from Platypus VCF files annotated with CAVA.  Per-allele INFO values are
//! comma-separated, per-transcript values within one allele colon-separated.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use indexmap::IndexMap;
use noodles::vcf;

use crate::common::noodles::{open_vcf_reader, parse_info, record_pos, text};
use crate::variant::{CsnKey, Site, VariantKey};

/// Minimal `TR / TC` ratio for a `PASS` call to be of high quality.
pub const HIGH_QUALITY_MIN_TR_PER_TC: f64 = 0.2;

/// Upstream quality flag of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Quality {
    High,
    Low,
}

/// Per-transcript annotation of a called allele.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantAnnotation {
    pub quality: Quality,
    /// Reads supporting the allele.
    pub tr: u32,
    /// Total coverage.
    pub tc: u32,
    /// Supporting reads on the forward strand.
    pub nf: Option<u32>,
    /// Supporting reads on the reverse strand.
    pub nr: Option<u32>,
    pub gene: String,
    pub csn: String,
    pub class: String,
    pub altann: String,
    pub altclass: String,
}

impl VariantAnnotation {
    pub fn csn_key(&self) -> CsnKey {
        CsnKey::new(&self.gene, &self.csn)
    }

    /// `TR / TC`, zero without coverage.
    pub fn tr_per_tc(&self) -> f64 {
        if self.tc == 0 {
            0.0
        } else {
            self.tr as f64 / self.tc as f64
        }
    }
}

/// The columns of a VCF call record used for building annotations.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallRecord {
    pub chrom: String,
    pub pos: u32,
    pub reference: String,
    pub alternatives: Vec<String>,
    pub filter: String,
    pub info: IndexMap<String, String>,
}

impl CallRecord {
    /// Convert from a lazy noodles VCF record.
    pub fn from_vcf(record: &vcf::Record) -> Result<Self, anyhow::Error> {
        Ok(Self {
            chrom: text(record.reference_sequence_name()),
            pos: record_pos(record)?,
            reference: text(record.reference_bases()),
            alternatives: text(record.alternate_bases())
                .split(',')
                .map(String::from)
                .collect(),
            filter: text(record.filters()),
            info: parse_info(&text(record.info())),
        })
    }

    fn location(&self) -> String {
        format!("{}:{}", self.chrom, self.pos)
    }

    fn get(&self, key: &str) -> Result<&str, anyhow::Error> {
        self.info
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| anyhow::anyhow!("call at {} lacks INFO/{}", self.location(), key))
    }

    /// Per-allele values of `key`, one entry per alternative allele.
    ///
    /// Missing optional keys yield `.` for every allele.
    fn per_allele(&self, key: &str, required: bool) -> Result<Vec<String>, anyhow::Error> {
        let value = match self.info.get(key) {
            Some(value) => value.as_str(),
            None if required => self.get(key)?,
            None => ".",
        };
        let values = value.split(',').map(String::from).collect::<Vec<_>>();
        if values.len() == self.alternatives.len() {
            Ok(values)
        } else if values.len() == 1 && !required {
            Ok(vec![values[0].clone(); self.alternatives.len()])
        } else {
            anyhow::bail!(
                "call at {} has {} INFO/{} values for {} alternative allele(s)",
                self.location(),
                values.len(),
                key,
                self.alternatives.len()
            )
        }
    }

    fn per_allele_counts(&self, key: &str) -> Result<Option<Vec<u32>>, anyhow::Error> {
        if !self.info.contains_key(key) {
            return Ok(None);
        }
        self.per_allele(key, true)?
            .iter()
            .map(|value| {
                value.parse::<u32>().map_err(|e| {
                    anyhow::anyhow!(
                        "invalid INFO/{} value {:?} at {}: {}",
                        key,
                        value,
                        self.location(),
                        e
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    /// Build the annotations of all alleles of this record.
    ///
    /// Returns an empty list for records without coverage.
    pub fn annotations(&self) -> Result<Vec<(VariantKey, Vec<VariantAnnotation>)>, anyhow::Error> {
        let tc_value = self.get("TC")?;
        let tc = tc_value.parse::<u32>().map_err(|e| {
            anyhow::anyhow!("invalid INFO/TC value {:?} at {}: {}", tc_value, self.location(), e)
        })?;
        if tc == 0 {
            tracing::trace!("skipping call at {} without coverage", self.location());
            return Ok(Vec::new());
        }

        let trs = self
            .per_allele_counts("TR")?
            .ok_or_else(|| anyhow::anyhow!("call at {} lacks INFO/TR", self.location()))?;
        let nfs = self.per_allele_counts("NF")?;
        let nrs = self.per_allele_counts("NR")?;
        let genes = self.per_allele("GENE", true)?;
        let csns = self.per_allele("CSN", true)?;
        let classes = self.per_allele("CLASS", true)?;
        let altanns = self.per_allele("ALTANN", false)?;
        let altclasses = self.per_allele("ALTCLASS", false)?;

        let mut result = Vec::with_capacity(self.alternatives.len());
        for (i, alternative) in self.alternatives.iter().enumerate() {
            let tr = trs[i];
            let quality = if self.filter == "PASS" && tr as f64 / tc as f64 >= HIGH_QUALITY_MIN_TR_PER_TC {
                Quality::High
            } else {
                Quality::Low
            };

            let transcript_genes = genes[i].split(':').collect::<Vec<_>>();
            let n = transcript_genes.len();
            let transcripts = |key: &str, value: &str| -> Result<Vec<String>, anyhow::Error> {
                let values = value.split(':').map(String::from).collect::<Vec<_>>();
                if values.len() == n {
                    Ok(values)
                } else if values.len() == 1 && values[0] == "." {
                    Ok(vec![values[0].clone(); n])
                } else {
                    anyhow::bail!(
                        "call at {} has {} INFO/{} transcript values for {} gene(s)",
                        self.location(),
                        values.len(),
                        key,
                        n
                    )
                }
            };
            let transcript_csns = transcripts("CSN", &csns[i])?;
            let transcript_classes = transcripts("CLASS", &classes[i])?;
            let transcript_altanns = transcripts("ALTANN", &altanns[i])?;
            let transcript_altclasses = transcripts("ALTCLASS", &altclasses[i])?;

            let annotations = (0..n)
                .map(|j| VariantAnnotation {
                    quality,
                    tr,
                    tc,
                    nf: nfs.as_ref().map(|nfs| nfs[i]),
                    nr: nrs.as_ref().map(|nrs| nrs[i]),
                    gene: transcript_genes[j].to_string(),
                    csn: transcript_csns[j].clone(),
                    class: transcript_classes[j].clone(),
                    altann: transcript_altanns[j].clone(),
                    altclass: transcript_altclasses[j].clone(),
                })
                .collect::<Vec<_>>();

            result.push((
                VariantKey::new(&self.chrom, self.pos, &self.reference, alternative),
                annotations,
            ));
        }

        Ok(result)
    }
}

/// Called variants of one sample in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallSet {
    variants: IndexMap<VariantKey, Vec<VariantAnnotation>>,
}

impl CallSet {
    /// Read the calls from an annotated VCF file (plain or gzip-compressed).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        tracing::debug!("reading calls from {:?}", path);
        let mut reader = open_vcf_reader(path)?;
        let _header = reader
            .read_header()
            .map_err(|e| anyhow::anyhow!("could not read VCF header of {:?}: {}", path, e))?;

        let mut result = Self::default();
        for record in reader.records() {
            let record = record
                .map_err(|e| anyhow::anyhow!("could not read record from {:?}: {}", path, e))?;
            let call = CallRecord::from_vcf(&record)?;
            result.extend_from(&call)?;
        }
        Ok(result)
    }

    /// Add the alleles of `call`.
    pub fn extend_from(&mut self, call: &CallRecord) -> Result<(), anyhow::Error> {
        for (key, annotations) in call.annotations()? {
            self.variants.entry(key).or_default().extend(annotations);
        }
        Ok(())
    }

    pub fn contains(&self, key: &VariantKey) -> bool {
        self.variants.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn get(&self, key: &VariantKey) -> Option<&Vec<VariantAnnotation>> {
        self.variants.get(key)
    }

    /// Iterate over the variants in input order.
    pub fn iter(&self) -> impl Iterator<Item = (&VariantKey, &Vec<VariantAnnotation>)> {
        self.variants.iter()
    }

    /// Number of annotations over all variants.
    pub fn annotation_count(&self) -> usize {
        self.variants.values().map(Vec::len).sum()
    }

    /// Sites called with more than one alternative allele.
    pub fn multiallelic_sites(&self) -> HashSet<Site> {
        let mut counts: HashMap<Site, usize> = HashMap::new();
        for key in self.variants.keys() {
            *counts.entry(key.site()).or_default() += 1;
        }
        counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(site, _)| site)
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    /// Build a record from a whitespace-separated VCF line.
    pub(crate) fn call(line: &str) -> CallRecord {
        let cols = line.split_whitespace().collect::<Vec<_>>();
        CallRecord {
            chrom: cols[0].to_string(),
            pos: cols[1].parse().unwrap(),
            reference: cols[3].to_string(),
            alternatives: cols[4].split(',').map(String::from).collect(),
            filter: cols[6].to_string(),
            info: parse_info(cols[7]),
        }
    }

    fn annotations(line: &str) -> Vec<(VariantKey, Vec<VariantAnnotation>)> {
        call(line).annotations().unwrap()
    }

    #[test]
    fn single_alt_single_transcript() {
        let result = annotations(
            "11  1642299  .  T  A  200  PASS  ABPV=1.00e+00;FR=0.5000;HP=1;NF=14;NR=13;\
             SC=CCCACCTTGTTGCAGGTGGGA;TC=60;TCF=39;TCR=21;TR=27;TYPE=Substitution;\
             TRANSCRIPT=ENST00000399682;GENE=KRTAP5-4;LOC=3UTR;CSN=c.+338A>T;CLASS=3PU;\
             SO=3_prime_UTR_variant;IMPACT=3;ALTANN=.;ALTCLASS=.;ALTSO=.",
        );

        assert_eq!(
            result,
            vec![(
                VariantKey::new("11", 1642299, "T", "A"),
                vec![VariantAnnotation {
                    quality: Quality::High,
                    tr: 27,
                    tc: 60,
                    nf: Some(14),
                    nr: Some(13),
                    gene: String::from("KRTAP5-4"),
                    csn: String::from("c.+338A>T"),
                    class: String::from("3PU"),
                    altann: String::from("."),
                    altclass: String::from("."),
                }]
            )]
        );
    }

    #[test]
    fn multiple_alt_single_transcript() {
        let result = annotations(
            "chrX  3523053  .  GACACACACAC  GAC,G  200  PASS  FR=0.5000,0.5000;HP=3;NF=0,3;NR=5,3;\
             TC=35;TCF=18;TCR=17;TR=5,6;TYPE=Deletion,Deletion;GENE=PRKX,PRKX;\
             CSN=c.+3949_+3956del8,c.+3947_+3956del10;CLASS=3PU,3PU;\
             ALTANN=c.+3909_+3916del8,c.+3909_+3918del10;ALTCLASS=.,.",
        );

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].0, VariantKey::new("X", 3523053, "GACACACACAC", "GAC"));
        assert_eq!(result[1].0, VariantKey::new("X", 3523053, "GACACACACAC", "G"));

        let first = &result[0].1[0];
        assert_eq!(first.quality, Quality::Low);
        assert_eq!((first.tr, first.tc, first.nf, first.nr), (5, 35, Some(0), Some(5)));
        assert_eq!(first.csn, "c.+3949_+3956del8");
        assert_eq!(first.altann, "c.+3909_+3916del8");

        let second = &result[1].1[0];
        assert_eq!(second.quality, Quality::Low);
        assert_eq!((second.tr, second.tc, second.nf, second.nr), (6, 35, Some(3), Some(3)));
        assert_eq!(second.csn, "c.+3947_+3956del10");
        assert_eq!(second.altann, "c.+3909_+3918del10");
    }

    #[test]
    fn single_alt_multiple_transcripts() {
        let result = annotations(
            "X  152728155  .  T  C  200  PASS  FR=1.0000;HP=2;NF=5;NR=5;TC=12;TR=10;\
             TRANSCRIPT=ENST00000330912:ENST00000370219;GENE=TREX2:HAUS7;\
             CSN=c.-1229-26A>G:c.323-26A>G;CLASS=5PU:INT;ALTANN=.:.;ALTCLASS=.:.",
        );

        assert_eq!(result.len(), 1);
        let (key, annotations) = &result[0];
        assert_eq!(key, &VariantKey::new("X", 152728155, "T", "C"));
        assert_eq!(
            annotations
                .iter()
                .map(|a| (a.quality, a.gene.as_str(), a.csn.as_str(), a.class.as_str()))
                .collect::<Vec<_>>(),
            vec![
                (Quality::High, "TREX2", "c.-1229-26A>G", "5PU"),
                (Quality::High, "HAUS7", "c.323-26A>G", "INT"),
            ]
        );
    }

    #[test]
    fn multiple_alt_multiple_transcripts() {
        let result = annotations(
            "chrX  106184601  .  TGAGAGAGAGAGA  TGAGA,T  200  PASS  NF=5,4;NR=5,2;TC=39;TR=10,6;\
             GENE=MORC4:AL158821.1,MORC4:AL158821.1;\
             CSN=c.+100_+107del8:c.-139+51851_-139+51858del8,c.+96_+107del12:c.-139+51847_-139+51858del12;\
             CLASS=3PU:5PU,3PU:5PU;\
             ALTANN=c.+68_+75del8:c.-139+51819_-139+51826del8,c.+68_+79del12:c.-139+51819_-139+51830del12;\
             ALTCLASS=.:.,.:.",
        );

        assert_eq!(result.len(), 2);
        assert_eq!(
            result
                .iter()
                .flat_map(|(key, annotations)| annotations.iter().map(move |a| (
                    key.alternative().to_string(),
                    a.quality,
                    a.tr,
                    a.gene.clone(),
                    a.altann.clone()
                )))
                .collect::<Vec<_>>(),
            vec![
                (
                    String::from("TGAGA"),
                    Quality::High,
                    10,
                    String::from("MORC4"),
                    String::from("c.+68_+75del8")
                ),
                (
                    String::from("TGAGA"),
                    Quality::High,
                    10,
                    String::from("AL158821.1"),
                    String::from("c.-139+51819_-139+51826del8")
                ),
                (
                    String::from("T"),
                    Quality::Low,
                    6,
                    String::from("MORC4"),
                    String::from("c.+68_+79del12")
                ),
                (
                    String::from("T"),
                    Quality::Low,
                    6,
                    String::from("AL158821.1"),
                    String::from("c.-139+51819_-139+51830del12")
                ),
            ]
        );
    }

    #[test]
    fn zero_coverage_is_skipped() {
        let result = annotations(
            "11  1642299  .  T  A  200  PASS  NF=14;NR=13;TC=0;TR=27;GENE=KRTAP5-4;\
             CSN=c.+338A>T;CLASS=3PU;ALTANN=.;ALTCLASS=.",
        );
        assert!(result.is_empty());
    }

    #[test]
    fn non_pass_is_low_quality() {
        let result = annotations(
            "11  1642299  .  T  A  200  badReads  TC=60;TR=27;GENE=KRTAP5-4;CSN=c.+338A>T;CLASS=3PU",
        );
        assert_eq!(result[0].1[0].quality, Quality::Low);
        assert_eq!(result[0].1[0].altann, ".");
        assert_eq!(result[0].1[0].nf, None);
    }

    #[rstest::rstest]
    #[case::missing_tc("TR=27;GENE=G;CSN=c.1A>T;CLASS=3PU")]
    #[case::missing_gene("TC=60;TR=27;CSN=c.1A>T;CLASS=3PU")]
    #[case::bad_tr("TC=60;TR=x;GENE=G;CSN=c.1A>T;CLASS=3PU")]
    #[case::tr_per_allele("TC=60;TR=27,3;GENE=G;CSN=c.1A>T;CLASS=3PU")]
    #[case::transcripts("TC=60;TR=27;GENE=G:H;CSN=c.1A>T;CLASS=3PU")]
    fn malformed_calls(#[case] info: &str) {
        let record = call(&format!("11  1642299  .  T  A  200  PASS  {}", info));
        assert!(record.annotations().is_err());
    }

    #[test]
    fn read_call_set() -> Result<(), anyhow::Error> {
        let calls = CallSet::from_path("tests/data/calls/child.vcf")?;

        assert_eq!(calls.len(), 7);
        assert_eq!(calls.annotation_count(), 10);
        assert_eq!(
            calls.iter().next().map(|(key, _)| key.clone()),
            Some(VariantKey::new("11", 1642299, "T", "A"))
        );
        assert!(calls.contains(&VariantKey::new("X", 3523053, "GACACACACAC", "G")));
        assert!(!calls.contains(&VariantKey::new("11", 1642400, "T", "A")));

        let mut sites = calls.multiallelic_sites().into_iter().collect::<Vec<_>>();
        sites.sort();
        assert_eq!(
            sites,
            vec![
                VariantKey::new("X", 3523053, "GACACACACAC", "G").site(),
                VariantKey::new("X", 106184601, "TGAGAGAGAGAGA", "T").site(),
            ]
        );

        Ok(())
    }

    #[test]
    fn read_gzip_call_set() -> Result<(), anyhow::Error> {
        let plain = CallSet::from_path("tests/data/calls/child.vcf")?;
        let gzip = CallSet::from_path("tests/data/calls/child.vcf.gz")?;
        assert_eq!(plain, gzip);
        Ok(())
    }
}
