use crate::config::ScoreTier;

/// Score of the first tier, in configured order, whose spot count, average
/// SNR and DX percentage minimums are all met. `None` if no tier matches.
pub fn score(tiers: &[ScoreTier], spot_count: i64, avg_snr: i64, dx_percentage: i64) -> Option<i64> {
    tiers
        .iter()
        .find(|t| {
            spot_count >= t.spot_count && avg_snr >= t.avg_snr && dx_percentage >= t.dx_percentage
        })
        .map(|t| t.score)
}

/// Integer DX share of `total`, truncated toward zero.
pub fn dx_percentage(dx_count: i64, total: i64) -> i64 {
    if total == 0 {
        0
    } else {
        dx_count * 100 / total
    }
}
