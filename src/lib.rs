//! De novo variant filter library main entry point.

pub mod alleles;
pub mod calls;
pub mod common;
pub mod config;
pub mod constraint;
pub mod control;
pub mod count_alleles;
pub mod csn;
pub mod filter;
pub mod freqs;
pub mod maxentscan;
pub mod variant;
