//! Commonly used code.

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};

pub mod io;
pub mod noodles;

/// Commonly used command line arguments.
#[derive(Parser, Debug, Default)]
pub struct Args {
    /// Verbosity of the program
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

/// The version of `denovo-filter` package.
#[cfg(not(test))]
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// This allows us to override the version to `0.0.0` in tests.
pub fn version() -> &'static str {
    #[cfg(test)]
    return "0.0.0";
    #[cfg(not(test))]
    return VERSION;
}

/// Strip a leading `chr` from a chromosome name.
///
/// Call sets, the control table, and the frequency databases are all keyed by the
/// stripped name (`chrX` and `X` denote the same contig).
pub fn normalize_chrom(chrom: &str) -> &str {
    chrom.strip_prefix("chr").unwrap_or(chrom)
}

/// Round to two decimal places as Python's `round(value, 2)` does.
///
/// The exact binary value is rounded, so `2.675` (stored slightly below) gives `2.67`, and exact
/// ties go to the even digit, so `0.125` gives `0.12`.
pub fn round2(value: f64) -> f64 {
    let scaled = value * 100.0;
    // exact ties are odd multiples of 1/8, for which `scaled` is exact
    if (value * 8.0).fract() == 0.0 && scaled - scaled.floor() == 0.5 {
        let floor = scaled.floor();
        let even = if floor % 2.0 == 0.0 { floor } else { floor + 1.0 };
        return even / 100.0;
    }
    format!("{:.2}", value).parse().unwrap_or(value)
}

/// Render a floating point number in shortest round-trip form, keeping at least one
/// fractional digit (`1.0` rather than `1`).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Float(pub f64);

impl std::fmt::Display for Float {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = format!("{}", self.0);
        if self.0.is_finite() && !text.contains(['.', 'e', 'E']) {
            write!(f, "{}.0", text)
        } else {
            write!(f, "{}", text)
        }
    }
}
