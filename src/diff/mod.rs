//! Day-over-day rank comparison keyed by product URL.

use crate::config::Config;
use crate::format::slack::slack_escape;
use crate::oliveyoung::parser::remove_brand_from_title;
use crate::snapshot::{Snapshot, SnapshotRow};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Limits applied when bucketing movements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffOptions {
    /// Only ranks `<= window` on either day are compared
    pub window: u32,
    pub top_n: usize,
    pub rising_limit: usize,
    pub newcomer_limit: usize,
    pub falling_limit: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self { window: 30, top_n: 10, rising_limit: 3, newcomer_limit: 3, falling_limit: 5 }
    }
}

impl From<&Config> for DiffOptions {
    fn from(config: &Config) -> Self {
        Self {
            window: config.diff_window,
            top_n: config.top_n,
            rising_limit: config.rising_limit,
            newcomer_limit: config.newcomer_limit,
            falling_limit: config.falling_limit,
        }
    }
}

/// A product in today's top list.
#[derive(Debug, Clone, PartialEq)]
pub struct TopEntry {
    pub rank: u32,
    pub name: String,
    pub url: String,
    pub price: Option<f64>,
    pub discount_percent: Option<u8>,
}

/// A product's position on both days. `None` means absent from the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Movement {
    pub name: String,
    pub url: String,
    pub prev_rank: Option<u32>,
    pub curr_rank: Option<u32>,
}

impl Movement {
    /// Positive when the product climbed.
    pub fn delta(&self) -> Option<i64> {
        match (self.prev_rank, self.curr_rank) {
            (Some(prev), Some(curr)) => Some(prev as i64 - curr as i64),
            _ => None,
        }
    }
}

/// Result of comparing two snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankDiff {
    pub top: Vec<TopEntry>,
    pub rising: Vec<Movement>,
    pub newcomers: Vec<Movement>,
    pub falling: Vec<Movement>,
    pub outs: Vec<Movement>,
    /// Newcomers plus outs, before any limit is applied
    pub in_out_count: usize,
}

fn display_name(row: &SnapshotRow) -> String {
    remove_brand_from_title(&row.product_name, &row.brand)
}

/// Ranked rows inside the window keyed by URL; a repeated URL keeps its
/// best (first) rank.
fn windowed(snapshot: &Snapshot, window: u32) -> HashMap<&str, (u32, &SnapshotRow)> {
    let mut map = HashMap::new();
    for row in snapshot.ranked() {
        let Some(rank) = row.rank else { continue };
        if rank > window || row.url.is_empty() {
            continue;
        }
        map.entry(row.url.as_str()).or_insert((rank, row));
    }
    map
}

/// Sort key for rising/falling: magnitude desc, then current rank, previous
/// rank and escaped name ascending.
fn movement_key(magnitude: i64, m: &Movement) -> (i64, u32, u32, String) {
    (
        -magnitude,
        m.curr_rank.unwrap_or(u32::MAX),
        m.prev_rank.unwrap_or(u32::MAX),
        slack_escape(&m.name),
    )
}

impl RankDiff {
    /// Compares today against the previous snapshot. Without one, every
    /// windowed product counts as a newcomer.
    pub fn compute(today: &Snapshot, previous: Option<&Snapshot>, options: DiffOptions) -> Self {
        let top = today
            .ranked()
            .into_iter()
            .take(options.top_n)
            .filter_map(|row| {
                Some(TopEntry {
                    rank: row.rank?,
                    name: display_name(row),
                    url: row.url.clone(),
                    price: row.price,
                    discount_percent: row.discount_percent,
                })
            })
            .collect();

        let curr = windowed(today, options.window);
        let prev = previous.map(|p| windowed(p, options.window)).unwrap_or_default();

        let mut rising = Vec::new();
        let mut falling = Vec::new();
        let mut newcomers = Vec::new();

        for (url, (curr_rank, row)) in &curr {
            let movement = Movement {
                name: display_name(row),
                url: url.to_string(),
                prev_rank: prev.get(url).map(|(rank, _)| *rank),
                curr_rank: Some(*curr_rank),
            };
            match movement.delta() {
                Some(d) if d > 0 => rising.push(movement),
                Some(d) if d < 0 => falling.push(movement),
                Some(_) => {}
                None => newcomers.push(movement),
            }
        }

        // BTreeMap gives the key order for outs.
        let outs: Vec<Movement> = prev
            .iter()
            .filter(|(url, _)| !curr.contains_key(*url))
            .map(|(url, (rank, row))| (*url, (*rank, *row)))
            .collect::<BTreeMap<_, _>>()
            .into_iter()
            .map(|(url, (rank, row))| Movement {
                name: display_name(row),
                url: url.to_string(),
                prev_rank: Some(rank),
                curr_rank: None,
            })
            .collect();

        let in_out_count = newcomers.len() + outs.len();

        rising.sort_by_cached_key(|m| movement_key(m.delta().unwrap_or(0), m));
        rising.truncate(options.rising_limit);

        falling.sort_by_cached_key(|m| movement_key(-m.delta().unwrap_or(0), m));
        falling.truncate(options.falling_limit);

        newcomers.sort_by_key(|m| m.curr_rank);
        newcomers.truncate(options.newcomer_limit);

        debug!(
            "Diff: {} rising, {} new, {} falling, {} out ({} in/out)",
            rising.len(),
            newcomers.len(),
            falling.len(),
            outs.len(),
            in_out_count
        );

        Self { top, rising, newcomers, falling, outs, in_out_count }
    }
}
