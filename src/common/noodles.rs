//! Helper code for using noodles.

use std::collections::HashSet;
use std::path::Path;

use indexmap::IndexMap;
use noodles::core::{Position, Region};
use noodles::csi::BinningIndex as _;
use noodles::sam::alignment::record::cigar::Op;
use noodles::{bam, vcf};

use crate::alleles::{AlignedRead, ReadSource};
use crate::common::io::std::open_read_maybe_gz;

/// Alias for the vcf reader type that we will use.
pub type VcfReader = vcf::io::Reader<Box<dyn std::io::BufRead>>;

/// Helper function that opens one VCF reader at the given path.
pub fn open_vcf_reader(path: impl AsRef<Path>) -> Result<VcfReader, anyhow::Error> {
    Ok(vcf::io::Reader::new(open_read_maybe_gz(path).map_err(
        |e| anyhow::anyhow!("could not build VCF reader: {}", e),
    )?))
}

/// Convert a lazy record field into an owned string.
pub fn text<T: AsRef<str>>(value: T) -> String {
    value.as_ref().to_string()
}

/// Parse a raw VCF `INFO` column into key/value pairs.
///
/// Flags (entries without `=`) and the missing value `.` yield no entries.
pub fn parse_info(info: &str) -> IndexMap<String, String> {
    info.split(';')
        .filter_map(|entry| entry.split_once('='))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// 1-based start position of a lazy VCF record.
pub fn record_pos(record: &vcf::Record) -> Result<u32, anyhow::Error> {
    let pos = record
        .variant_start()
        .transpose()
        .map_err(|e| anyhow::anyhow!("invalid position: {}", e))?
        .ok_or_else(|| anyhow::anyhow!("record without position"))?;
    Ok(u32::try_from(usize::from(pos))?)
}

/// Build a region from 1-based inclusive coordinates, clamping the start to 1.
pub fn region(chrom: &str, start: i64, end: i64) -> Result<Region, anyhow::Error> {
    let start = Position::try_from(start.max(1) as usize)?;
    let end = Position::try_from(end.max(1) as usize)?;
    Ok(Region::new(chrom, start..=end))
}

/// Name of `chrom` among `contigs`, trying `chrom` and `chr{chrom}`.
///
/// Without any known contigs, `chrom` is used as given.
pub fn resolve_contig(contigs: &HashSet<String>, chrom: &str) -> Option<String> {
    if contigs.is_empty() || contigs.contains(chrom) {
        Some(chrom.to_string())
    } else {
        let prefixed = format!("chr{}", chrom);
        contigs.contains(&prefixed).then_some(prefixed)
    }
}

type VcfQuery = Box<dyn FnMut(&Region) -> std::io::Result<Vec<vcf::Record>>>;

/// A bgzip-compressed, tabix-indexed VCF file.
pub struct IndexedVcf {
    /// Contig names of the index, or of the header for indexes without names.
    contigs: HashSet<String>,
    query: VcfQuery,
}

impl IndexedVcf {
    /// Open the file at `path` together with its index.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let mut reader = vcf::io::indexed_reader::Builder::default()
            .build_from_path(path)
            .map_err(|e| anyhow::anyhow!("could not open indexed VCF {:?}: {}", path, e))?;
        let header = reader.read_header()?;
        // only contigs with records are in the index and can be queried
        let contigs = match reader.index().header() {
            Some(index_header) => index_header
                .reference_sequence_names()
                .iter()
                .map(|name| name.to_string())
                .collect::<HashSet<_>>(),
            None => header.contigs().keys().cloned().collect::<HashSet<_>>(),
        };
        tracing::debug!("VCF file {:?} has {} contigs", path, contigs.len());

        let query = move |region: &Region| -> std::io::Result<Vec<vcf::Record>> {
            reader.query(&header, region)?.collect()
        };

        Ok(Self {
            contigs,
            query: Box::new(query),
        })
    }

    /// Records overlapping the 1-based inclusive interval `[start, end]` on `chrom`.
    pub fn fetch(
        &mut self,
        chrom: &str,
        start: i64,
        end: i64,
    ) -> Result<Vec<vcf::Record>, anyhow::Error> {
        let Some(contig) = resolve_contig(&self.contigs, chrom) else {
            tracing::trace!("contig {} not in VCF", chrom);
            return Ok(Vec::new());
        };
        let region = region(&contig, start, end)?;
        (self.query)(&region).map_err(|e| anyhow::anyhow!("could not query {}: {}", region, e))
    }
}

/// Convert a BAM record, `None` for unmapped records.
fn aligned_read(record: &bam::Record) -> std::io::Result<Option<AlignedRead>> {
    let flags = record.flags();
    if flags.is_unmapped() {
        return Ok(None);
    }
    let Some(start) = record.alignment_start().transpose()? else {
        return Ok(None);
    };
    let cigar = record.cigar().iter().collect::<std::io::Result<Vec<Op>>>()?;
    let sequence = record.sequence().iter().collect::<Vec<u8>>();

    Ok(Some(AlignedRead {
        is_duplicate: flags.is_duplicate(),
        start: usize::from(start) as i64 - 1,
        cigar,
        sequence,
    }))
}

type BamQuery = Box<dyn FnMut(&Region) -> std::io::Result<Vec<AlignedRead>>>;

/// A coordinate-sorted, indexed BAM file.
pub struct IndexedBam {
    contigs: HashSet<String>,
    query: BamQuery,
}

impl IndexedBam {
    /// Open the file at `path` together with its index.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let mut reader = bam::io::indexed_reader::Builder::default()
            .build_from_path(path)
            .map_err(|e| anyhow::anyhow!("could not open indexed BAM {:?}: {}", path, e))?;
        let header = reader.read_header()?;
        let contigs = header
            .reference_sequences()
            .keys()
            .map(|name| name.to_string())
            .collect::<HashSet<_>>();
        tracing::debug!("BAM file {:?} has {} contigs", path, contigs.len());

        let query = move |region: &Region| -> std::io::Result<Vec<AlignedRead>> {
            let mut result = Vec::new();
            for record in reader.query(&header, region)? {
                if let Some(read) = aligned_read(&record?)? {
                    result.push(read);
                }
            }
            Ok(result)
        };

        Ok(Self {
            contigs,
            query: Box::new(query),
        })
    }
}

impl ReadSource for IndexedBam {
    fn fetch(
        &mut self,
        chrom: &str,
        start: i64,
        end: i64,
    ) -> Result<Vec<AlignedRead>, anyhow::Error> {
        let Some(contig) = resolve_contig(&self.contigs, chrom) else {
            tracing::trace!("contig {} not in BAM header", chrom);
            return Ok(Vec::new());
        };
        let region = region(&contig, start + 1, end)?;
        (self.query)(&region).map_err(|e| anyhow::anyhow!("could not query {}: {}", region, e))
    }
}
