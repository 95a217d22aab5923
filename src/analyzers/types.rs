//! Data types produced by the aggregation stage.

use serde::Serialize;

/// Statistics for one (region, band) pair, stored in `band_stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BandStat {
    pub region: String,
    pub band: String,
    pub spots_as_sender: i64,
    pub spots_as_receiver: i64,
    pub dx_count: i64,
    /// `dx_count * 100 / total`, truncated.
    pub dx_percentage: i64,
    /// `None` when the band saw no activity.
    pub avg_snr: Option<i64>,
    /// `None` when no score tier matched.
    pub band_score: Option<i64>,
}

/// Raw counts read from the store before derived fields are computed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BandCounts {
    pub spots_as_sender: i64,
    pub spots_as_receiver: i64,
    pub dx_count: i64,
    pub avg_snr: Option<i64>,
}

impl BandCounts {
    /// Spots seen on the band with the region on either side.
    pub fn total_spots(&self) -> i64 {
        self.spots_as_sender + self.spots_as_receiver
    }
}
