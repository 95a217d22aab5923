use anyhow::Result;
use tracing::{debug, info};

use crate::analyzers::grade::{dx_percentage, score};
use crate::analyzers::types::{BandCounts, BandStat};
use crate::config::{Config, ScoreTier};
use crate::store::Store;

/// Builds a [`BandStat`] from raw counts.
///
/// A band with no activity is pinned to score 1 with no average SNR and
/// skips the tiers entirely.
pub fn band_stat(region: &str, band: &str, counts: BandCounts, tiers: &[ScoreTier]) -> BandStat {
    let total = counts.total_spots();

    let (avg_snr, dx_pct, band_score) = if total == 0 {
        (None, 0, Some(1))
    } else {
        let dx_pct = dx_percentage(counts.dx_count, total);
        let band_score = counts
            .avg_snr
            .and_then(|snr| score(tiers, total, snr, dx_pct));
        (counts.avg_snr, dx_pct, band_score)
    };

    BandStat {
        region: region.to_string(),
        band: band.to_string(),
        spots_as_sender: counts.spots_as_sender,
        spots_as_receiver: counts.spots_as_receiver,
        dx_count: counts.dx_count,
        dx_percentage: dx_pct,
        avg_snr,
        band_score,
    }
}

/// Reads the counts for one (region, band) pair from the store.
pub fn band_counts(store: &Store, region: &str, band: &str) -> Result<BandCounts> {
    let spots_as_sender = store.count_as_sender(region, band)?;
    let spots_as_receiver = store.count_as_receiver(region, band)?;
    let dx_count = store.count_dx(region, band)?;

    let mut counts = BandCounts {
        spots_as_sender,
        spots_as_receiver,
        dx_count,
        avg_snr: None,
    };
    if counts.total_spots() > 0 {
        counts.avg_snr = store.avg_snr(region, band)?.map(|avg| avg.trunc() as i64);
    }

    Ok(counts)
}

/// Computes and stores a [`BandStat`] for every configured region and band,
/// in configured order.
#[tracing::instrument(skip_all)]
pub fn aggregate_all(store: &Store, config: &Config) -> Result<Vec<BandStat>> {
    let mut stats = Vec::with_capacity(config.regions.len() * config.bands.len());

    for region in &config.regions {
        for band in &config.bands {
            let counts = band_counts(store, &region.code, &band.name)?;
            let stat = band_stat(&region.code, &band.name, counts, &config.score_tiers);
            store.insert_band_stat(&stat)?;

            info!(
                grid = %stat.region,
                band = %stat.band,
                sender = stat.spots_as_sender,
                receiver = stat.spots_as_receiver,
                dx = stat.dx_count,
                dx_percentage = stat.dx_percentage,
                avg_snr = ?stat.avg_snr,
                score = ?stat.band_score,
                "Band stats"
            );
            debug!("{}", serde_json::to_string_pretty(&stat)?);

            stats.push(stat);
        }
    }

    info!(count = stats.len(), "Band stats process completed");
    Ok(stats)
}
