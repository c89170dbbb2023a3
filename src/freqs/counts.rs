//! Decoding of genotype count vectors into carrier frequencies.
//!
//! A genotype count vector holds one count per unordered genotype `(a1, a2)` with
//! `a1 = 0..=n` and `a2 = 0..=a1`, where `n` is the number of alternative alleles and `0`
//! denotes the reference allele.

/// Number of unordered diploid genotypes for `n_alts` alternative alleles.
pub fn genotype_count(n_alts: usize) -> usize {
    (n_alts + 1) * (n_alts + 2) / 2
}

/// Flags telling which genotypes (in canonical order) carry the alternative allele with the
/// 0-based index `alt_idx`.
pub fn carrier_mask(n_alts: usize, alt_idx: usize) -> Vec<bool> {
    let allele = alt_idx + 1;
    let mut result = Vec::with_capacity(genotype_count(n_alts));
    for a1 in 0..=n_alts {
        for a2 in 0..=a1 {
            result.push(a1 == allele || a2 == allele);
        }
    }
    result
}

/// Parse a comma-separated genotype count vector for `n_alts` alternative alleles.
pub fn parse_counts(value: &str, n_alts: usize) -> Result<Vec<u64>, anyhow::Error> {
    let counts = value
        .split(',')
        .map(|count| {
            count
                .trim()
                .parse::<u64>()
                .map_err(|e| anyhow::anyhow!("invalid genotype count {:?}: {}", count, e))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if counts.len() != genotype_count(n_alts) {
        anyhow::bail!(
            "genotype count vector {:?} has {} entries, expected {} for {} alternative allele(s)",
            value,
            counts.len(),
            genotype_count(n_alts),
            n_alts
        );
    }
    Ok(counts)
}

/// Carrier frequency in percent for the allele `alt_idx` from one or more count vectors of
/// equal layout.
///
/// The vectors are summed before dividing (e.g., male and female counts on chrX).  A total of
/// zero yields `0.0`.
pub fn carrier_frequency(vectors: &[&[u64]], n_alts: usize, alt_idx: usize) -> f64 {
    let mask = carrier_mask(n_alts, alt_idx);
    let mut carriers = 0u64;
    let mut total = 0u64;
    for counts in vectors {
        for (count, is_carrier) in counts.iter().zip(mask.iter()) {
            total += count;
            if *is_carrier {
                carriers += count;
            }
        }
    }
    if total == 0 {
        0.0
    } else {
        100.0 * carriers as f64 / total as f64
    }
}
