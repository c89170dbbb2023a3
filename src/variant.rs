//! Variant identity and allele classification.

use std::str::FromStr;

use crate::common::normalize_chrom;

/// Identity of a called allele at a locus.
///
/// The position is 1-based as in VCF.  The chromosome name is stored without a leading
/// `chr`.  Fields are private so a key cannot change once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantKey {
    chrom: String,
    pos: u32,
    reference: String,
    alternative: String,
}

impl VariantKey {
    /// Construct a new key, normalizing the chromosome name.
    pub fn new(chrom: &str, pos: u32, reference: &str, alternative: &str) -> Self {
        Self {
            chrom: normalize_chrom(chrom).to_string(),
            pos,
            reference: reference.to_string(),
            alternative: alternative.to_string(),
        }
    }

    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    pub fn pos(&self) -> u32 {
        self.pos
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn alternative(&self) -> &str {
        &self.alternative
    }

    /// The `(chrom, pos, ref)` part of the key shared by alleles at the same site.
    pub fn site(&self) -> Site {
        Site {
            chrom: self.chrom.clone(),
            pos: self.pos,
            reference: self.reference.clone(),
        }
    }

    /// Classify the allele change.
    pub fn kind(&self) -> VariantKind {
        VariantKind::classify(&self.reference, &self.alternative)
    }

    /// Kind of chromosome the variant is located on.
    pub fn chrom_kind(&self) -> ChromKind {
        ChromKind::from_name(&self.chrom)
    }
}

impl std::fmt::Display for VariantKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.chrom, self.pos, self.reference, self.alternative
        )
    }
}

/// Parse from `CHROM:POS:REF:ALT`.
impl FromStr for VariantKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens = s.split(':').collect::<Vec<_>>();
        if tokens.len() != 4 || tokens.iter().any(|token| token.is_empty()) {
            anyhow::bail!("invalid variant {:?}, expected CHROM:POS:REF:ALT", s);
        }
        let pos = tokens[1]
            .parse::<u32>()
            .map_err(|e| anyhow::anyhow!("invalid position in variant {:?}: {}", s, e))?;
        if pos == 0 {
            anyhow::bail!("invalid position 0 in variant {:?}", s);
        }
        Ok(Self::new(tokens[0], pos, tokens[2], tokens[3]))
    }
}

/// A `(chrom, pos, ref)` site, used for detecting multi-allelic calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Site {
    pub chrom: String,
    pub pos: u32,
    pub reference: String,
}

/// Transcript-level identity of an annotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CsnKey {
    /// Gene symbol.
    pub gene: String,
    /// Coding sequence notation, `"."` when unavailable.
    pub csn: String,
}

impl CsnKey {
    pub fn new(gene: &str, csn: &str) -> Self {
        Self {
            gene: gene.to_string(),
            csn: csn.to_string(),
        }
    }

    /// Whether a coding sequence notation is available.
    pub fn has_csn(&self) -> bool {
        self.csn != "."
    }
}

/// Classification of an allele change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum VariantKind {
    /// Single base change.
    Substitution,
    /// Anchored deletion, e.g., `ACG>A`.
    Deletion,
    /// Anchored insertion, e.g., `A>ACG`.
    Insertion,
    /// Everything else.
    Complex,
}

impl VariantKind {
    pub fn classify(reference: &str, alternative: &str) -> Self {
        let first_equal = !reference.is_empty()
            && !alternative.is_empty()
            && reference.as_bytes()[0] == alternative.as_bytes()[0];
        if reference.len() == 1 && alternative.len() == 1 {
            VariantKind::Substitution
        } else if first_equal && reference.len() > 1 && alternative.len() == 1 {
            VariantKind::Deletion
        } else if first_equal && reference.len() == 1 && alternative.len() > 1 {
            VariantKind::Insertion
        } else {
            VariantKind::Complex
        }
    }
}

/// Kind of chromosome, decides the frequency arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChromKind {
    Autosome,
    X,
    Y,
}

impl ChromKind {
    pub fn from_name(chrom: &str) -> Self {
        match normalize_chrom(chrom) {
            "X" => ChromKind::X,
            "Y" => ChromKind::Y,
            _ => ChromKind::Autosome,
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[rstest::rstest]
    #[case("A", "T", VariantKind::Substitution)]
    #[case("ACG", "A", VariantKind::Deletion)]
    #[case("A", "AGT", VariantKind::Insertion)]
    #[case("AC", "GT", VariantKind::Complex)]
    #[case("ACG", "T", VariantKind::Complex)]
    #[case("A", "TGG", VariantKind::Complex)]
    #[case("GACACACACAC", "GAC", VariantKind::Complex)]
    fn classify(#[case] reference: &str, #[case] alternative: &str, #[case] expected: VariantKind) {
        assert_eq!(VariantKind::classify(reference, alternative), expected);
    }

    #[test]
    fn key_normalizes_chrom() {
        let key = VariantKey::new("chrX", 3523053, "GACACACACAC", "G");
        assert_eq!(key.chrom(), "X");
        assert_eq!(key.chrom_kind(), ChromKind::X);
        assert_eq!(key, VariantKey::new("X", 3523053, "GACACACACAC", "G"));
    }

    #[test]
    fn key_from_str() -> Result<(), anyhow::Error> {
        let key: VariantKey = "chr11:1642299:T:A".parse()?;
        assert_eq!(key, VariantKey::new("11", 1642299, "T", "A"));
        assert_eq!(format!("{}", key), "11:1642299:T:A");

        assert!("11:1642299:T".parse::<VariantKey>().is_err());
        assert!("11:x:T:A".parse::<VariantKey>().is_err());
        assert!("11:0:T:A".parse::<VariantKey>().is_err());

        Ok(())
    }

    #[test]
    fn site_ignores_alternative() {
        let lhs = VariantKey::new("7", 100, "AC", "A");
        let rhs = VariantKey::new("7", 100, "AC", "T");
        assert_eq!(lhs.site(), rhs.site());
    }

    #[rstest::rstest]
    #[case("1", ChromKind::Autosome)]
    #[case("chr22", ChromKind::Autosome)]
    #[case("X", ChromKind::X)]
    #[case("chrY", ChromKind::Y)]
    fn chrom_kind(#[case] chrom: &str, #[case] expected: ChromKind) {
        assert_eq!(ChromKind::from_name(chrom), expected);
    }

    #[test]
    fn csn_key_has_csn() {
        assert!(CsnKey::new("NELL1", "c.96C>T_p.=").has_csn());
        assert!(!CsnKey::new("NELL1", ".").has_csn());
    }
}
