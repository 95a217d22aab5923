//! Run configuration loaded from a TOML document.
//!
//! Regions, bands and score tiers are arrays of tables so their declared
//! order survives parsing; band matching and scoring both depend on it.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub log_debug: bool,
    pub source: SourceConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    pub regions: Vec<Region>,
    pub bands: Vec<BandRange>,
    #[serde(default)]
    pub score_tiers: Vec<ScoreTier>,
    pub templates: Templates,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_connect_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub database: PathBuf,
    pub tmp_dir: PathBuf,
    pub log_dir: PathBuf,
    pub web_dir: PathBuf,
    /// File name of the stylesheet written under `<web_dir>/css/`.
    pub stylesheet: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("tmp/spots.db"),
            tmp_dir: PathBuf::from("tmp"),
            log_dir: PathBuf::from("logs"),
            web_dir: PathBuf::from("web"),
            stylesheet: "mdb.min.css".to_string(),
        }
    }
}

impl PathsConfig {
    pub fn css_dir(&self) -> PathBuf {
        self.web_dir.join("css")
    }
}

/// A tracked grid square, keyed by its 2-character locator prefix.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Region {
    pub name: String,
    pub code: String,
}

/// An inclusive frequency range mapped to a band name (e.g. `"20"` for 20m).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BandRange {
    pub name: String,
    pub low: i64,
    pub high: i64,
}

impl BandRange {
    pub fn contains(&self, frequency: i64) -> bool {
        (self.low..=self.high).contains(&frequency)
    }

    fn overlaps(&self, other: &BandRange) -> bool {
        self.low <= other.high && other.low <= self.high
    }
}

/// Minimum thresholds a band must meet to earn `score`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScoreTier {
    pub score: i64,
    pub spot_count: i64,
    pub avg_snr: i64,
    pub dx_percentage: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Templates {
    pub page: String,
    pub stylesheet: String,
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

fn default_placeholder() -> String {
    "<table></table>".to_string()
}

impl Config {
    /// Loads and validates the config from a TOML file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("invalid config file '{}'", path.display()))
    }

    /// Parses a TOML document. Region codes are upper-cased to match the
    /// locator prefixes they are compared against.
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        for region in &mut config.regions {
            region.code = region.code.to_ascii_uppercase();
        }
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations that would break the one-row-per-region
    /// invariant or produce meaningless bands and scores.
    pub fn validate(&self) -> Result<()> {
        if self.regions.is_empty() {
            bail!("no regions configured");
        }
        if self.bands.is_empty() {
            bail!("no bands configured");
        }
        if self.source.timeout_secs == 0 {
            bail!("source.timeout_secs must be at least 1");
        }
        if self.source.connect_timeout_secs == 0 {
            bail!("source.connect_timeout_secs must be at least 1");
        }

        let mut seen = HashSet::new();
        for region in &self.regions {
            if region.code.chars().count() != 2 {
                bail!(
                    "region '{}' has code '{}', expected a 2-character locator prefix",
                    region.name,
                    region.code
                );
            }
            if !seen.insert(region.code.as_str()) {
                bail!("duplicate region code '{}'", region.code);
            }
        }

        for (i, band) in self.bands.iter().enumerate() {
            if band.low > band.high {
                bail!("band '{}' has low {} above high {}", band.name, band.low, band.high);
            }
            for earlier in &self.bands[..i] {
                if band.overlaps(earlier) {
                    warn!(
                        band = %band.name,
                        earlier = %earlier.name,
                        "Band ranges overlap; the earlier band wins"
                    );
                }
            }
        }

        for tier in &self.score_tiers {
            if !(1..=5).contains(&tier.score) {
                bail!("score tier {} is outside 1..=5", tier.score);
            }
        }

        Ok(())
    }

    pub fn region_codes(&self) -> HashSet<String> {
        self.regions.iter().map(|r| r.code.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
log_debug = true

[source]
url = "https://retrieve.pskreporter.info/query?flowStartSeconds=-900"
timeout_secs = 30

[[regions]]
name = "Alpha"
code = "AA"

[[regions]]
name = "Bravo"
code = "BB"

[[bands]]
name = "20"
low = 14000
high = 14350

[[bands]]
name = "40"
low = 7000
high = 7300

[[score_tiers]]
score = 5
spot_count = 10
avg_snr = 5
dx_percentage = 10

[[score_tiers]]
score = 1
spot_count = 0
avg_snr = -999
dx_percentage = 0

[templates]
page = "<html><body><table></table></body></html>"
stylesheet = "body { color: white; }"
"#;

    #[test]
    fn test_from_toml_preserves_order_and_defaults() {
        let config = Config::from_toml(SAMPLE).unwrap();

        assert!(config.log_debug);
        assert_eq!(config.source.timeout(), Duration::from_secs(30));
        assert_eq!(config.source.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.regions[0].code, "AA");
        assert_eq!(config.regions[1].code, "BB");
        assert_eq!(config.bands[0].name, "20");
        assert_eq!(config.score_tiers[0].score, 5);
        assert_eq!(config.paths.stylesheet, "mdb.min.css");
        assert_eq!(config.paths.css_dir(), PathBuf::from("web/css"));
        assert_eq!(config.templates.placeholder, "<table></table>");
    }

    #[test]
    fn test_duplicate_region_code_is_rejected() {
        let doubled = SAMPLE.replace("code = \"BB\"", "code = \"AA\"");
        let err = Config::from_toml(&doubled).unwrap_err();
        assert!(err.to_string().contains("duplicate region code"));
    }

    #[test]
    fn test_bad_region_code_length_is_rejected() {
        let bad = SAMPLE.replace("code = \"BB\"", "code = \"BBB\"");
        assert!(Config::from_toml(&bad).is_err());
    }

    #[test]
    fn test_inverted_band_range_is_rejected() {
        let bad = SAMPLE.replace("low = 7000", "low = 7400");
        assert!(Config::from_toml(&bad).is_err());
    }

    #[test]
    fn test_score_outside_range_is_rejected() {
        let bad = SAMPLE.replace("score = 5", "score = 6");
        assert!(Config::from_toml(&bad).is_err());
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let bad = SAMPLE.replace("timeout_secs = 30", "timeout_secs = 0");
        let err = Config::from_toml(&bad).unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));

        let bad = SAMPLE.replace(
            "timeout_secs = 30",
            "timeout_secs = 30\nconnect_timeout_secs = 0",
        );
        let err = Config::from_toml(&bad).unwrap_err();
        assert!(err.to_string().contains("connect_timeout_secs"));
    }

    #[test]
    fn test_band_contains_is_inclusive() {
        let band = BandRange {
            name: "20".to_string(),
            low: 14000,
            high: 14350,
        };
        assert!(band.contains(14000));
        assert!(band.contains(14350));
        assert!(!band.contains(13999));
        assert!(!band.contains(14351));
    }

    #[test]
    fn test_region_codes_are_uppercased() {
        let lower = SAMPLE.replace("code = \"AA\"", "code = \"aa\"");
        let config = Config::from_toml(&lower).unwrap();
        assert_eq!(config.regions[0].code, "AA");
        assert!(config.region_codes().contains("AA"));
    }
}
