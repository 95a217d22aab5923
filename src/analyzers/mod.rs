//! Per-region, per-band statistics and quality scoring.
//!
//! For every configured (region, band) pair this module counts spots sent
//! and received, measures how much of that traffic left the tracked regions,
//! averages SNR, and assigns a 1–5 score from the configured tiers.

pub mod aggregate;
pub mod grade;
pub mod types;
