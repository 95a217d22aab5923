//! Sequential refresh run: fetch, load, aggregate, render.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use tracing::info;

use crate::analyzers::aggregate::aggregate_all;
use crate::bootstrap::bootstrap_regions;
use crate::config::Config;
use crate::fetch::{HttpClient, fetch_source};
use crate::normalize::normalize;
use crate::output::render_all;
use crate::parser::parse_reports;
use crate::store::Store;

/// State shared by every stage of a run. The start time stamps the master
/// grid rows and so ends up in each page's footer.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub config: Config,
    pub started_at: DateTime<Utc>,
}

impl RunContext {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            started_at: Utc::now(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub reports: usize,
    pub spots_loaded: usize,
    pub band_stats: usize,
    pub pages: usize,
}

fn ensure_dirs(config: &Config) -> Result<()> {
    let paths = &config.paths;
    for dir in [
        paths.tmp_dir.clone(),
        paths.log_dir.clone(),
        paths.web_dir.clone(),
        paths.css_dir(),
    ] {
        fs::create_dir_all(&dir).with_context(|| format!("failed to create '{}'", dir.display()))?;
    }
    Ok(())
}

/// Runs the whole refresh against `source` (a URL or local file path).
///
/// Any failure aborts the run; the database may be left partially written.
#[tracing::instrument(skip(ctx, client), fields(started_at = %ctx.started_at))]
pub async fn run<C: HttpClient>(ctx: &RunContext, client: &C, source: &str) -> Result<RunSummary> {
    let config = &ctx.config;
    ensure_dirs(config)?;

    let bytes = fetch_source(client, source)
        .await
        .context("error getting PSKReporter spots")?;
    let raw_copy = config.paths.tmp_dir.join("spots.xml");
    fs::write(&raw_copy, &bytes)
        .with_context(|| format!("failed to write '{}'", raw_copy.display()))?;

    let reports = parse_reports(&bytes).context("failed to parse spot document")?;
    info!(spot_count = reports.len(), "Spots received");

    let mut store = Store::recreate(&config.paths.database)?;
    bootstrap_regions(&store, &config.regions, ctx.started_at)?;

    let (spots, summary) = normalize(&reports, &config.region_codes(), &config.bands);
    let loaded = store.insert_spots(&spots)?;
    info!(loaded, "Spots successfully loaded from PSKReporter");

    let stats = aggregate_all(&store, config)?;
    let pages = render_all(&store, config)?;

    Ok(RunSummary {
        reports: summary.received,
        spots_loaded: loaded,
        band_stats: stats.len(),
        pages: pages.len(),
    })
}
