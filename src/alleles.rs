//! Counting of reads supporting a candidate allele.
//!
//! Support is decided from the mapped reference blocks of each read: deletions show up as
//! reference gaps between consecutive blocks, insertions as two blocks touching without a
//! reference gap.  Substitutions are decided from the read base aligned to the variant
//! position.
//!
//! All alignment coordinates in this module are 0-based; variant positions are 1-based as in
//! [`VariantKey`].

use noodles::sam::alignment::record::cigar::{op::Kind, Op};

use crate::variant::{VariantKey, VariantKind};

/// Coverage (`TC`) and supporting read count (`TR`) for one sample.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AlleleEvidence {
    /// Number of non-duplicate reads overlapping the evidence window.
    pub tc: u32,
    /// Number of those reads supporting the alternative allele.
    pub tr: u32,
}

/// The alignment information of one read needed for deciding allele support.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AlignedRead {
    /// Whether the read is flagged as optical or PCR duplicate.
    pub is_duplicate: bool,
    /// 0-based reference position of the first aligned base.
    pub start: i64,
    /// CIGAR operations of the alignment.
    pub cigar: Vec<Op>,
    /// Read bases, upper case ASCII.
    pub sequence: Vec<u8>,
}

fn consumes_reference(kind: Kind) -> bool {
    matches!(
        kind,
        Kind::Match | Kind::SequenceMatch | Kind::SequenceMismatch | Kind::Deletion | Kind::Skip
    )
}

fn consumes_read(kind: Kind) -> bool {
    matches!(
        kind,
        Kind::Match
            | Kind::SequenceMatch
            | Kind::SequenceMismatch
            | Kind::Insertion
            | Kind::SoftClip
    )
}

fn is_aligned(kind: Kind) -> bool {
    matches!(
        kind,
        Kind::Match | Kind::SequenceMatch | Kind::SequenceMismatch
    )
}

impl AlignedRead {
    /// 0-based exclusive end of the alignment on the reference.
    pub fn end(&self) -> i64 {
        self.start
            + self
                .cigar
                .iter()
                .filter(|op| consumes_reference(op.kind()))
                .map(|op| op.len() as i64)
                .sum::<i64>()
    }

    /// Whether the alignment overlaps the 0-based half-open interval `[start, end)`.
    pub fn overlaps(&self, start: i64, end: i64) -> bool {
        self.start < end && self.end() > start
    }

    /// Contiguous mapped reference blocks as 0-based half-open intervals.
    ///
    /// Consecutive aligned operations (`M`, `=`, `X`) are merged into one block.
    pub fn blocks(&self) -> Vec<(i64, i64)> {
        let mut result: Vec<(i64, i64)> = Vec::new();
        let mut ref_pos = self.start;
        let mut extend_last = false;
        for op in &self.cigar {
            let len = op.len() as i64;
            if is_aligned(op.kind()) {
                match result.last_mut() {
                    Some(last) if extend_last => last.1 += len,
                    _ => result.push((ref_pos, ref_pos + len)),
                }
                extend_last = true;
            } else {
                extend_last = false;
            }
            if consumes_reference(op.kind()) {
                ref_pos += len;
            }
        }
        result
    }

    /// Reference gaps between consecutive blocks as inclusive `(first, last)` positions.
    pub fn deletion_blocks(&self) -> Vec<(i64, i64)> {
        self.blocks()
            .windows(2)
            .filter(|pair| pair[1].0 > pair[0].1)
            .map(|pair| (pair[0].1, pair[1].0 - 1))
            .collect()
    }

    /// Insertion points between consecutive blocks without reference gap.
    ///
    /// Each entry is `(anchor, next)` where `anchor` is the last reference position before
    /// the inserted bases.
    pub fn insertion_blocks(&self) -> Vec<(i64, i64)> {
        self.blocks()
            .windows(2)
            .filter(|pair| pair[1].0 == pair[0].1)
            .map(|pair| (pair[0].1 - 1, pair[1].0))
            .collect()
    }

    /// The read base aligned to the given reference position, `None` if the position is not
    /// covered by an aligned base (deleted, skipped, or outside the alignment).
    pub fn base_at(&self, ref_pos: i64) -> Option<u8> {
        let mut read_pos = 0usize;
        let mut curr = self.start;
        for op in &self.cigar {
            let len = op.len();
            let kind = op.kind();
            if consumes_reference(kind) && ref_pos < curr + len as i64 {
                if ref_pos < curr || !is_aligned(kind) {
                    return None;
                }
                let offset = (ref_pos - curr) as usize;
                return self.sequence.get(read_pos + offset).copied();
            }
            if consumes_reference(kind) {
                curr += len as i64;
            }
            if consumes_read(kind) {
                read_pos += len;
            }
        }
        None
    }

    fn supports_deletion(&self, pos0: i64, ref_len: usize) -> bool {
        let first = pos0 + 1;
        let last = pos0 + ref_len as i64 - 1;
        self.deletion_blocks()
            .iter()
            .any(|&(begin, end)| begin <= first && last <= end)
    }

    fn supports_insertion(&self, pos0: i64) -> bool {
        self.insertion_blocks()
            .iter()
            .any(|&(anchor, _)| anchor == pos0)
    }

    /// Whether the read supports the alternative allele of `key`.
    pub fn supports(&self, key: &VariantKey) -> bool {
        let pos0 = key.pos() as i64 - 1;
        let ref_len = key.reference().len();
        match key.kind() {
            VariantKind::Substitution => self
                .base_at(pos0)
                .map(|base| {
                    key.alternative()
                        .as_bytes()
                        .first()
                        .map(|alt| base.eq_ignore_ascii_case(alt))
                        .unwrap_or(false)
                })
                .unwrap_or(false),
            VariantKind::Deletion => self.supports_deletion(pos0, ref_len),
            VariantKind::Insertion => self.supports_insertion(pos0),
            VariantKind::Complex => {
                self.supports_deletion(pos0, ref_len)
                    || (pos0..pos0 + ref_len as i64 - 1).any(|p| self.supports_insertion(p))
            }
        }
    }
}

/// The 0-based inclusive reference window in which reads are collected for `key`.
pub fn evidence_window(key: &VariantKey) -> (i64, i64) {
    let pos0 = key.pos() as i64 - 1;
    match key.kind() {
        VariantKind::Substitution | VariantKind::Deletion => (pos0, pos0),
        VariantKind::Insertion => (pos0, pos0 + 1),
        VariantKind::Complex => (pos0, pos0 + key.reference().len() as i64 - 1),
    }
}

/// Count coverage and supporting reads for `key` among `reads`.
///
/// Duplicate reads are ignored.  Each remaining read adds one to the coverage and at most
/// one to the support count.
pub fn count<'a, I>(reads: I, key: &VariantKey) -> AlleleEvidence
where
    I: IntoIterator<Item = &'a AlignedRead>,
{
    let mut result = AlleleEvidence::default();
    for read in reads.into_iter().filter(|read| !read.is_duplicate) {
        result.tc += 1;
        if read.supports(key) {
            result.tr += 1;
        }
    }
    result
}

/// Region-queryable source of aligned reads.
pub trait ReadSource {
    /// Return the reads overlapping the 0-based half-open interval `[start, end)`.
    fn fetch(&mut self, chrom: &str, start: i64, end: i64)
        -> Result<Vec<AlignedRead>, anyhow::Error>;
}

/// Fetch the reads in the evidence window of `key` from `source` and count them.
pub fn count_in_source<S>(source: &mut S, key: &VariantKey) -> Result<AlleleEvidence, anyhow::Error>
where
    S: ReadSource + ?Sized,
{
    let (start, end) = evidence_window(key);
    let reads = source.fetch(key.chrom(), start, end + 1)?;
    let result = count(&reads, key);
    tracing::trace!("{} -> TC={} TR={}", key, result.tc, result.tr);
    Ok(result)
}

/// Reads held in memory, keyed by chromosome.
#[derive(Debug, Default, Clone)]
pub struct MemoryReads {
    reads: Vec<(String, AlignedRead)>,
}

impl MemoryReads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a read aligned to `chrom`.
    pub fn push(&mut self, chrom: &str, read: AlignedRead) {
        self.reads.push((chrom.to_string(), read));
    }
}

impl ReadSource for MemoryReads {
    fn fetch(
        &mut self,
        chrom: &str,
        start: i64,
        end: i64,
    ) -> Result<Vec<AlignedRead>, anyhow::Error> {
        Ok(self
            .reads
            .iter()
            .filter(|(name, read)| name == chrom && read.overlaps(start, end))
            .map(|(_, read)| read.clone())
            .collect())
    }
}
