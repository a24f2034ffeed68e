//! Daily CSV snapshots of the ranking.
//!
//! One file per KST calendar day, named `올리브영글로벌_랭킹_{YYYY-MM-DD}.csv`.
//! Files are written UTF-8 with a BOM so spreadsheet apps open the Korean
//! header correctly. Reading is lenient because older files were produced by
//! other tooling: missing columns default, and numeric columns accept `3`,
//! `3.0` or blank.

use crate::oliveyoung::Product;
use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const FILE_PREFIX: &str = "올리브영글로벌_랭킹_";

/// Current date in Korea Standard Time (UTC+9).
pub fn today_kst() -> NaiveDate {
    now_kst().date()
}

/// Current wall-clock time in Korea Standard Time.
pub fn now_kst() -> NaiveDateTime {
    (Utc::now() + Duration::hours(9)).naive_utc()
}

/// The calendar day before `date`.
pub fn previous_day(date: NaiveDate) -> NaiveDate {
    date.pred_opt().unwrap_or(date)
}

/// Snapshot file name for a date.
pub fn file_name(date: NaiveDate) -> String {
    format!("{}{}.csv", FILE_PREFIX, date.format("%Y-%m-%d"))
}

/// Extracts the date from a snapshot file name, if it follows the convention.
pub fn date_from_file_name(path: &Path) -> Option<NaiveDate> {
    let stem = path.file_stem()?.to_str()?;
    let date = stem.strip_prefix(FILE_PREFIX)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// One CSV row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotRow {
    pub date: String,
    #[serde(deserialize_with = "lenient_u32")]
    pub rank: Option<u32>,
    pub brand: String,
    pub product_name: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub orig_price: Option<f64>,
    #[serde(deserialize_with = "lenient_u8")]
    pub discount_percent: Option<u8>,
    pub url: String,
    pub image_url: String,
}

impl SnapshotRow {
    fn from_product(date: NaiveDate, product: &Product) -> Self {
        Self {
            date: date.format("%Y-%m-%d").to_string(),
            rank: Some(product.rank),
            brand: product.brand.clone(),
            product_name: product.title.clone(),
            price: product.current_price(),
            orig_price: product.original_price(),
            discount_percent: product.discount_percent,
            url: product.url.clone(),
            image_url: product.image_url.clone().unwrap_or_default(),
        }
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite()))
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_number(deserializer)
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_number(deserializer)?.filter(|v| *v >= 0.0).map(|v| v as u32))
}

fn lenient_u8<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_number(deserializer)?.map(|v| v.clamp(0.0, 100.0) as u8))
}

/// A day's ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub date: NaiveDate,
    pub rows: Vec<SnapshotRow>,
}

impl Snapshot {
    /// Builds a snapshot from freshly scraped products.
    pub fn from_products(date: NaiveDate, products: &[Product]) -> Self {
        let rows = products.iter().map(|p| SnapshotRow::from_product(date, p)).collect();
        Self { date, rows }
    }

    pub fn file_name(&self) -> String {
        file_name(self.date)
    }

    /// Rows with a rank, ordered by it.
    pub fn ranked(&self) -> Vec<&SnapshotRow> {
        let mut rows: Vec<&SnapshotRow> = self.rows.iter().filter(|r| r.rank.is_some()).collect();
        rows.sort_by_key(|r| r.rank);
        rows
    }

    /// Serializes to CSV bytes with a leading BOM.
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
        for row in &self.rows {
            writer.serialize(row).context("Failed to write CSV row")?;
        }
        if self.rows.is_empty() {
            writer
                .write_record([
                    "date",
                    "rank",
                    "brand",
                    "product_name",
                    "price",
                    "orig_price",
                    "discount_percent",
                    "url",
                    "image_url",
                ])
                .context("Failed to write CSV header")?;
        }
        writer.into_inner().context("Failed to flush CSV")
    }

    /// Parses CSV bytes. A leading BOM is tolerated.
    pub fn from_csv_bytes(date: NaiveDate, bytes: &[u8]) -> Result<Self> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);

        let mut rows = Vec::new();
        for (i, record) in reader.deserialize::<SnapshotRow>().enumerate() {
            let row = record.with_context(|| format!("Malformed CSV row {}", i + 1))?;
            rows.push(row);
        }

        debug!("Parsed {} snapshot rows for {}", rows.len(), date);
        Ok(Self { date, rows })
    }

    /// Writes the snapshot into `dir` under its conventional name.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create data directory: {}", dir.display()))?;

        let path = dir.join(self.file_name());
        std::fs::write(&path, self.to_csv_bytes()?)
            .with_context(|| format!("Failed to write snapshot: {}", path.display()))?;

        info!("Saved snapshot: {}", path.display());
        Ok(path)
    }

    /// Reads a snapshot file. The date comes from the file name, then the
    /// first row's `date` column, then today (KST).
    pub fn read_from(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;

        let mut snapshot = Self::from_csv_bytes(today_kst(), &bytes)
            .with_context(|| format!("Failed to parse snapshot: {}", path.display()))?;

        let row_date = snapshot
            .rows
            .first()
            .and_then(|r| NaiveDate::parse_from_str(r.date.trim(), "%Y-%m-%d").ok());

        if let Some(date) = date_from_file_name(path).or(row_date) {
            snapshot.date = date;
        }
        Ok(snapshot)
    }

    /// Reads the snapshot for `date` from `dir` if the file exists.
    pub fn read_local(dir: &Path, date: NaiveDate) -> Result<Option<Self>> {
        let path = dir.join(file_name(date));
        if !path.exists() {
            return Ok(None);
        }
        Self::read_from(&path).map(Some)
    }
}
