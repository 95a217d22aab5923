//! SQLite store recreated from scratch on every run.
//!
//! Every statement binds its values; no SQL text is built from data.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use tracing::debug;

use crate::analyzers::types::BandStat;
use crate::normalize::Spot;

const SCHEMA: &str = r#"
    -- One row per configured region, refreshed at the start of each run
    CREATE TABLE IF NOT EXISTS spot_masters (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        master_grid_code TEXT NOT NULL,
        master_grid_name TEXT NOT NULL,
        update_time TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS spot_details (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        sender_master_grid_code TEXT NOT NULL,
        receiver_master_grid_code TEXT NOT NULL,
        band TEXT NOT NULL,
        snr INTEGER NOT NULL,
        spot_time TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_spot_details_sender
        ON spot_details (band, sender_master_grid_code);
    CREATE INDEX IF NOT EXISTS idx_spot_details_receiver
        ON spot_details (band, receiver_master_grid_code);

    CREATE TABLE IF NOT EXISTS band_stats (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        master_grid_code TEXT NOT NULL,
        band TEXT NOT NULL,
        spots_as_sender INTEGER NOT NULL,
        spots_as_receiver INTEGER NOT NULL,
        dx_count INTEGER NOT NULL,
        dx_percentage INTEGER NOT NULL,
        avg_snr INTEGER,
        band_score INTEGER
    );
"#;

pub struct Store {
    conn: Connection,
}

impl Store {
    /// Deletes any database left at `path` by a previous run, then creates a
    /// fresh one with the schema applied.
    pub fn recreate(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create '{}'", parent.display()))?;
        }
        if path.exists() {
            std::fs::remove_file(path)
                .with_context(|| format!("failed to delete old database '{}'", path.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database '{}'", path.display()))?;
        Self::init(conn)
    }

    /// Opens an existing database without clearing it.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database '{}'", path.display()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("query failed: create schema")?;
        Ok(Self { conn })
    }

    // ------------------------------------------------------------------
    // spot_masters
    // ------------------------------------------------------------------

    pub fn count_regions(&self, code: &str) -> Result<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM spot_masters WHERE master_grid_code = ?1",
                params![code],
                |row| row.get(0),
            )
            .context("query failed: count spot_masters")
    }

    pub fn insert_region(&self, code: &str, name: &str, at: DateTime<Utc>) -> Result<()> {
        debug!(code, name, "Inserting master grid");
        self.conn
            .execute(
                "INSERT INTO spot_masters (master_grid_code, master_grid_name, update_time)
                 VALUES (?1, ?2, ?3)",
                params![code, name, at],
            )
            .context("query failed: insert spot_masters")?;
        Ok(())
    }

    pub fn touch_region(&self, code: &str, at: DateTime<Utc>) -> Result<()> {
        debug!(code, "Refreshing master grid update time");
        self.conn
            .execute(
                "UPDATE spot_masters SET update_time = ?1 WHERE master_grid_code = ?2",
                params![at, code],
            )
            .context("query failed: update spot_masters")?;
        Ok(())
    }

    pub fn region_updated_at(&self, code: &str) -> Result<Option<DateTime<Utc>>> {
        self.conn
            .query_row(
                "SELECT update_time FROM spot_masters WHERE master_grid_code = ?1",
                params![code],
                |row| row.get(0),
            )
            .optional()
            .context("query failed: select spot_masters update time")
    }

    // ------------------------------------------------------------------
    // spot_details
    // ------------------------------------------------------------------

    /// Loads all spots in one transaction and returns how many were written.
    pub fn insert_spots(&mut self, spots: &[Spot]) -> Result<usize> {
        let tx = self.conn.transaction().context("query failed: begin transaction")?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO spot_details
                     (sender_master_grid_code, receiver_master_grid_code, band, snr, spot_time)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .context("query failed: prepare insert spot_details")?;

            for spot in spots {
                stmt.execute(params![
                    spot.sender_region,
                    spot.receiver_region,
                    spot.band,
                    spot.snr,
                    spot.spot_time,
                ])
                .context("query failed: insert spot_details")?;
            }
        }
        tx.commit().context("query failed: commit spot_details")?;
        Ok(spots.len())
    }

    pub fn spot_count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM spot_details", [], |row| row.get(0))
            .context("query failed: count spot_details")
    }

    pub fn count_as_sender(&self, code: &str, band: &str) -> Result<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM spot_details
                 WHERE band = ?1 AND sender_master_grid_code = ?2",
                params![band, code],
                |row| row.get(0),
            )
            .context("query failed: count spots as sender")
    }

    pub fn count_as_receiver(&self, code: &str, band: &str) -> Result<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM spot_details
                 WHERE band = ?1 AND receiver_master_grid_code = ?2",
                params![band, code],
                |row| row.get(0),
            )
            .context("query failed: count spots as receiver")
    }

    /// Spots on `band` between `code` and a counterpart outside every
    /// tracked region. The tracked set is read from `spot_masters`.
    pub fn count_dx(&self, code: &str, band: &str) -> Result<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM spot_details
                 WHERE band = ?1
                   AND ((sender_master_grid_code = ?2
                         AND receiver_master_grid_code NOT IN
                             (SELECT master_grid_code FROM spot_masters))
                     OR (receiver_master_grid_code = ?2
                         AND sender_master_grid_code NOT IN
                             (SELECT master_grid_code FROM spot_masters)))",
                params![band, code],
                |row| row.get(0),
            )
            .context("query failed: count dx spots")
    }

    /// Mean SNR over spots on `band` that `code` sent or received, or `None`
    /// when there are none.
    pub fn avg_snr(&self, code: &str, band: &str) -> Result<Option<f64>> {
        self.conn
            .query_row(
                "SELECT AVG(snr) FROM spot_details
                 WHERE band = ?1
                   AND (sender_master_grid_code = ?2 OR receiver_master_grid_code = ?2)",
                params![band, code],
                |row| row.get(0),
            )
            .context("query failed: average snr")
    }

    // ------------------------------------------------------------------
    // band_stats
    // ------------------------------------------------------------------

    pub fn insert_band_stat(&self, stat: &BandStat) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO band_stats
                 (master_grid_code, band, spots_as_sender, spots_as_receiver,
                  dx_count, dx_percentage, avg_snr, band_score)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    stat.region,
                    stat.band,
                    stat.spots_as_sender,
                    stat.spots_as_receiver,
                    stat.dx_count,
                    stat.dx_percentage,
                    stat.avg_snr,
                    stat.band_score,
                ],
            )
            .context("query failed: insert band_stats")?;
        Ok(())
    }

    /// Stats for one region in the order they were written.
    pub fn band_stats_for(&self, code: &str) -> Result<Vec<BandStat>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT master_grid_code, band, spots_as_sender, spots_as_receiver,
                        dx_count, dx_percentage, avg_snr, band_score
                 FROM band_stats
                 WHERE master_grid_code = ?1
                 ORDER BY id",
            )
            .context("query failed: prepare select band_stats")?;

        let rows = stmt
            .query_map(params![code], |row| {
                Ok(BandStat {
                    region: row.get(0)?,
                    band: row.get(1)?,
                    spots_as_sender: row.get(2)?,
                    spots_as_receiver: row.get(3)?,
                    dx_count: row.get(4)?,
                    dx_percentage: row.get(5)?,
                    avg_snr: row.get(6)?,
                    band_score: row.get(7)?,
                })
            })
            .context("query failed: select band_stats")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("query failed: read band_stats row")?;

        Ok(rows)
    }
}
