//! Filtering and band classification of raw reception reports.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::config::BandRange;
use crate::parser::ReceptionReport;

/// A storage-ready spot: locators reduced to their region codes and the
/// frequency resolved to a band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Spot {
    pub sender_region: String,
    pub receiver_region: String,
    pub band: String,
    pub snr: i64,
    pub spot_time: DateTime<Utc>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub received: usize,
    pub loaded: usize,
    pub skipped: usize,
}

/// First two characters of a locator, upper-cased.
pub fn region_prefix(locator: &str) -> String {
    locator.chars().take(2).collect::<String>().to_ascii_uppercase()
}

/// First configured band whose range holds `frequency`.
pub fn resolve_band(bands: &[BandRange], frequency: i64) -> Option<&BandRange> {
    bands.iter().find(|b| b.contains(frequency))
}

fn present(locator: &Option<String>) -> Option<&str> {
    locator.as_deref().filter(|l| !l.is_empty())
}

/// Shapes one report into a [`Spot`], or `None` when it is not relevant to
/// the configured regions and bands.
pub fn normalize_report(
    report: &ReceptionReport,
    region_codes: &HashSet<String>,
    bands: &[BandRange],
) -> Option<Spot> {
    let sender = present(&report.sender_locator)?;
    let receiver = present(&report.receiver_locator)?;

    let sender_region = region_prefix(sender);
    let receiver_region = region_prefix(receiver);
    if !region_codes.contains(&sender_region) && !region_codes.contains(&receiver_region) {
        return None;
    }

    let band = resolve_band(bands, report.frequency?)?;

    let spot_time =
        DateTime::<Utc>::from_timestamp(report.flow_start_seconds.unwrap_or(0), 0).unwrap_or_default();

    Some(Spot {
        sender_region,
        receiver_region,
        band: band.name.clone(),
        snr: report.snr.unwrap_or(0),
        spot_time,
    })
}

/// Normalizes every report, silently dropping the ones that fail validation.
pub fn normalize(
    reports: &[ReceptionReport],
    region_codes: &HashSet<String>,
    bands: &[BandRange],
) -> (Vec<Spot>, LoadSummary) {
    let spots: Vec<Spot> = reports
        .iter()
        .filter_map(|report| {
            let spot = normalize_report(report, region_codes, bands);
            if spot.is_none() {
                debug!(?report, "Skipping report");
            }
            spot
        })
        .collect();

    let summary = LoadSummary {
        received: reports.len(),
        loaded: spots.len(),
        skipped: reports.len() - spots.len(),
    };
    info!(
        received = summary.received,
        loaded = summary.loaded,
        skipped = summary.skipped,
        "Spots normalized"
    );

    (spots, summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes() -> HashSet<String> {
        ["AA", "BB"].iter().map(|c| c.to_string()).collect()
    }

    fn bands() -> Vec<BandRange> {
        vec![
            BandRange {
                name: "20".to_string(),
                low: 14000,
                high: 14350,
            },
            BandRange {
                name: "40".to_string(),
                low: 7000,
                high: 7300,
            },
        ]
    }

    fn report(sender: Option<&str>, receiver: Option<&str>, frequency: i64) -> ReceptionReport {
        ReceptionReport {
            sender_locator: sender.map(str::to_string),
            receiver_locator: receiver.map(str::to_string),
            frequency: Some(frequency),
            snr: Some(10),
            flow_start_seconds: Some(1_700_000_000),
        }
    }

    #[test]
    fn test_missing_locator_is_skipped() {
        assert!(normalize_report(&report(None, Some("AA12"), 14100), &codes(), &bands()).is_none());
        assert!(normalize_report(&report(Some("AA12"), None, 14100), &codes(), &bands()).is_none());
        assert!(normalize_report(&report(Some(""), Some("AA12"), 14100), &codes(), &bands()).is_none());
    }

    #[test]
    fn test_non_local_report_is_skipped() {
        let r = report(Some("CC12"), Some("DD34"), 14100);
        assert!(normalize_report(&r, &codes(), &bands()).is_none());
    }

    #[test]
    fn test_either_side_local_is_kept() {
        let as_sender = normalize_report(&report(Some("AA12"), Some("ZZ99"), 14100), &codes(), &bands());
        let as_receiver = normalize_report(&report(Some("ZZ99"), Some("bb34"), 14100), &codes(), &bands());

        assert_eq!(as_sender.unwrap().sender_region, "AA");
        assert_eq!(as_receiver.unwrap().receiver_region, "BB");
    }

    #[test]
    fn test_band_assignment() {
        let spot = normalize_report(&report(Some("AA12"), Some("BB34"), 7074), &codes(), &bands()).unwrap();
        assert_eq!(spot.band, "40");

        assert!(normalize_report(&report(Some("AA12"), Some("BB34"), 10136), &codes(), &bands()).is_none());
    }

    #[test]
    fn test_first_band_wins_on_overlap() {
        let mut overlapping = bands();
        overlapping.push(BandRange {
            name: "wide".to_string(),
            low: 0,
            high: 100_000,
        });
        overlapping.rotate_right(1);

        assert_eq!(resolve_band(&overlapping, 14100).unwrap().name, "wide");
    }

    #[test]
    fn test_missing_frequency_is_skipped() {
        let mut r = report(Some("AA12"), Some("BB34"), 14100);
        r.frequency = None;
        assert!(normalize_report(&r, &codes(), &bands()).is_none());
    }

    #[test]
    fn test_spot_shape() {
        let spot = normalize_report(&report(Some("AA12"), Some("ZZ99"), 14100), &codes(), &bands()).unwrap();
        assert_eq!(
            spot,
            Spot {
                sender_region: "AA".to_string(),
                receiver_region: "ZZ".to_string(),
                band: "20".to_string(),
                snr: 10,
                spot_time: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
            }
        );
    }

    #[test]
    fn test_normalize_counts() {
        let reports = vec![
            report(Some("AA12"), Some("ZZ99"), 14100),
            report(None, Some("AA12"), 14100),
            report(Some("CC12"), Some("DD34"), 14100),
            report(Some("BB12"), Some("AA34"), 7100),
        ];
        let (spots, summary) = normalize(&reports, &codes(), &bands());

        assert_eq!(spots.len(), 2);
        assert_eq!(
            summary,
            LoadSummary {
                received: 4,
                loaded: 2,
                skipped: 2,
            }
        );
    }
}
