//! HTML dashboard rendering for band statistics.
//!
//! Produces one page per region from the configured page template and a
//! shared stylesheet. Both are overwritten on every run.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::analyzers::types::BandStat;
use crate::config::Config;
use crate::store::Store;

const HEADERS: [&str; 8] = [
    "Grid", "Band", "Sender", "Receiver", "DX", "DX %", "Avg. SNR", "Score",
];

/// Bootstrap contextual class for a row: green for 4–5, yellow for 2–3,
/// red for everything else including an unset score.
pub fn row_class(score: Option<i64>) -> &'static str {
    match score {
        Some(4 | 5) => "table-success",
        Some(2 | 3) => "table-warning",
        _ => "table-danger",
    }
}

fn opt(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn format_updated_at(updated_at: Option<DateTime<Utc>>) -> String {
    updated_at
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_default()
}

fn render_row(stat: &BandStat) -> String {
    format!(
        concat!(
            r#"<tr class="{class} fs-4">"#,
            r#"<th scope="row">{region}</th>"#,
            r#"<th scope="row">{band}m</th>"#,
            "<td>{sender}</td>",
            "<td>{receiver}</td>",
            "<td>{dx}</td>",
            "<td>{dx_pct}%</td>",
            "<td>{avg_snr}</td>",
            "<td>{score}</td>",
            "</tr>",
        ),
        class = row_class(stat.band_score),
        region = stat.region,
        band = stat.band,
        sender = stat.spots_as_sender,
        receiver = stat.spots_as_receiver,
        dx = stat.dx_count,
        dx_pct = stat.dx_percentage,
        avg_snr = opt(stat.avg_snr),
        score = opt(stat.band_score),
    )
}

/// Table markup for one region's stats, followed by the last-updated line.
pub fn render_table(stats: &[BandStat], updated_at: Option<DateTime<Utc>>) -> String {
    let mut html = String::new();
    html.push_str(r#"<table class="table" style="border:5px solid white">"#);
    html.push_str("<thead>");
    html.push_str(r#"<tr class="table-black text-white fs-4">"#);
    for header in HEADERS {
        html.push_str(&format!(r#"<th scope="col">{header}</th>"#));
    }
    html.push_str("</tr>");
    html.push_str("</thead>");
    html.push_str("<tbody>");

    for stat in stats {
        debug!(grid = %stat.region, band = %stat.band, "Adding row");
        html.push_str(&render_row(stat));
    }

    html.push_str("</tbody>");
    html.push_str("</table>");
    html.push_str(&format!(
        r#"<a class="text-white">Last Updated At: {}</a>"#,
        format_updated_at(updated_at)
    ));
    html
}

/// Substitutes `table` into the page template at `placeholder`.
pub fn render_page(template: &str, placeholder: &str, table: &str) -> String {
    template.replace(placeholder, table)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("failed to write '{}'", path.display()))?;
    debug!(path = %path.display(), bytes = contents.len(), "File written");
    Ok(())
}

/// Writes the stylesheet and one page per configured region, returning the
/// page paths.
#[tracing::instrument(skip_all)]
pub fn render_all(store: &Store, config: &Config) -> Result<Vec<PathBuf>> {
    let paths = &config.paths;
    let templates = &config.templates;

    let css_dir = paths.css_dir();
    fs::create_dir_all(&css_dir)
        .with_context(|| format!("failed to create '{}'", css_dir.display()))?;
    write_file(&css_dir.join(&paths.stylesheet), &templates.stylesheet)?;

    let mut pages = Vec::with_capacity(config.regions.len());
    for region in &config.regions {
        let stats = store.band_stats_for(&region.code)?;
        let updated_at = store.region_updated_at(&region.code)?;

        let table = render_table(&stats, updated_at);
        let page = render_page(&templates.page, &templates.placeholder, &table);

        let path = paths.web_dir.join(format!("{}.html", region.code));
        write_file(&path, &page)?;
        pages.push(path);
    }

    info!(pages = pages.len(), "HTML table output completed");
    Ok(pages)
}
