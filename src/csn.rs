//! Splice-site boundary classification from coding sequence notation (CSN).
//!
//! A CSN string such as `c.323-26A>G_p.=` gives the position of a change relative to the
//! coding sequence; intronic positions carry a signed offset to the closest exon boundary.

use nom::{
    character::complete::{digit1, one_of},
    combinator::{all_consuming, opt, recognize},
    sequence::preceded,
    IResult, Parser,
};

/// Tokens that terminate the coordinate span of a CSN string.
static MARKERS: &[&str] = &["A>", "C>", "G>", "T>", "del", "ins", "dup"];

/// One coordinate of a CSN string, e.g., `-1229-26` or `*45+3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coordinate {
    /// Position in the coding sequence.
    pub exonic: i64,
    /// Signed distance into the intron, if any.
    pub offset: Option<i64>,
}

fn coordinate(input: &str) -> IResult<&str, (&str, Option<&str>)> {
    all_consuming((
        recognize(preceded(opt(one_of("+-*")), digit1)),
        opt(recognize(preceded(one_of("+-"), digit1))),
    ))
    .parse(input)
}

impl std::str::FromStr for Coordinate {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (_, (exonic, offset)) =
            coordinate(s).map_err(|e| anyhow::anyhow!("invalid CSN coordinate {:?}: {}", s, e))?;
        Ok(Self {
            exonic: exonic.trim_start_matches(['*', '+']).parse::<i64>()?,
            offset: offset.map(|offset| offset.parse::<i64>()).transpose()?,
        })
    }
}

/// Extract the one or two coordinates of a CSN string.
pub fn coordinates(csn: &str) -> Result<Vec<Coordinate>, anyhow::Error> {
    let nucleotide = csn.split("_p.").next().unwrap_or(csn);
    let begin = nucleotide
        .find("c.")
        .ok_or_else(|| anyhow::anyhow!("CSN {:?} has no coding coordinate", csn))?
        + 2;
    let end = MARKERS
        .iter()
        .filter_map(|marker| nucleotide[begin..].find(marker))
        .min()
        .ok_or_else(|| anyhow::anyhow!("CSN {:?} has no change marker", csn))?
        + begin;

    let span = &nucleotide[begin..end];
    let parts = match span.split_once('_') {
        Some((first, second)) => vec![first, second],
        None => vec![span],
    };
    parts
        .into_iter()
        .map(|part| {
            part.parse::<Coordinate>()
                .map_err(|e| anyhow::anyhow!("invalid CSN {:?}: {}", csn, e))
        })
        .collect()
}

/// Whether the change described by `csn` lies at most `cutoff` bases into an intron.
///
/// A missing CSN (`.`) is treated as within the boundary.
pub fn within_boundary(csn: &str, cutoff: u32) -> Result<bool, anyhow::Error> {
    if csn == "." {
        return Ok(true);
    }
    Ok(coordinates(csn)?.iter().all(|coordinate| {
        coordinate
            .offset
            .map(|offset| offset.unsigned_abs() <= cutoff as u64)
            .unwrap_or(true)
    }))
}
