//! Slack mrkdwn messages for the daily ranking.

use crate::diff::{Movement, RankDiff, TopEntry};
use crate::oliveyoung::parser::remove_brand_from_title;
use crate::snapshot::Snapshot;
use chrono::NaiveDate;
use std::fmt::Display;

/// Escapes the three characters Slack treats as control sequences.
pub fn slack_escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// `<url|name>` with the name escaped.
pub fn link(url: &str, name: &str) -> String {
    format!("<{}|{}>", url, slack_escape(name))
}

/// Dollar amount with thousands separators; missing values render as `$0.00`.
pub fn fmt_usd(value: Option<f64>) -> String {
    let value = value.filter(|v| v.is_finite()).unwrap_or(0.0);
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, frac_part)
}

pub fn top_line(entry: &TopEntry) -> String {
    let mut line = format!(
        "{}. {} — {}",
        entry.rank,
        link(&entry.url, &entry.name),
        fmt_usd(entry.price)
    );
    if let Some(dc) = entry.discount_percent {
        line.push_str(&format!(" (↓{}%)", dc));
    }
    line
}

pub fn move_line(movement: &Movement) -> String {
    let name_link = link(&movement.url, &movement.name);
    match (movement.prev_rank, movement.curr_rank) {
        (None, Some(curr)) => format!("- {} NEW → {}위", name_link, curr),
        (Some(prev), None) => format!("- {} {}위 → OUT", name_link, prev),
        (None, None) => format!("- {}", name_link),
        (Some(prev), Some(curr)) => {
            let tail = match prev as i64 - curr as i64 {
                d if d > 0 => format!("(↑{})", d),
                d if d < 0 => format!("(↓{})", -d),
                _ => "(변동없음)".to_string(),
            };
            format!("- {} {}위 → {}위 {}", name_link, prev, curr, tail)
        }
    }
}

fn push_section(parts: &mut Vec<String>, title: &str, lines: Vec<String>, empty: &str) {
    parts.push(String::new());
    parts.push(title.to_string());
    if lines.is_empty() {
        parts.push(empty.to_string());
    } else {
        parts.extend(lines);
    }
}

/// The daily ranking message: top list, movers, newcomers, and in/out count.
pub fn ranking_message(date: NaiveDate, diff: &RankDiff) -> String {
    let mut parts = vec![format!("*올리브영 글로벌몰 랭킹 — {}*", date.format("%Y-%m-%d"))];

    push_section(&mut parts, "*TOP 10*", diff.top.iter().map(top_line).collect(), "- 데이터 없음");
    push_section(&mut parts, "*🔥 급상승*", diff.rising.iter().map(move_line).collect(), "- 해당 없음");
    push_section(
        &mut parts,
        "*🆕 뉴랭커*",
        diff.newcomers.iter().map(move_line).collect(),
        "- 해당 없음",
    );
    push_section(&mut parts, "*📉 급하락*", diff.falling.iter().map(move_line).collect(), "- 해당 없음");
    parts.extend(diff.outs.iter().map(move_line));

    parts.push(String::new());
    parts.push("*🔄 랭크 인&아웃*".to_string());
    parts.push(format!("{}개의 제품이 인&아웃 되었습니다.", diff.in_out_count));

    parts.join("\n")
}

/// Top-10 price listing for a single snapshot, no comparison.
pub fn top10_price_message(snapshot: &Snapshot) -> String {
    let mut lines = vec![
        format!("*올리브영 글로벌 전체 랭킹 ({} KST)*", snapshot.date.format("%Y-%m-%d")),
        String::new(),
        "*TOP 10*".to_string(),
    ];

    for row in snapshot.ranked().into_iter().take(10) {
        let name = remove_brand_from_title(&row.product_name, &row.brand);
        let current = row.price.unwrap_or(0.0);
        let mut line = format!(
            "{}. {} – US${:.2}",
            row.rank.unwrap_or_default(),
            link(&row.url, &name),
            current
        );

        // Zero checks run on the rendered text so sub-cent values are dropped too.
        let original = row.orig_price.filter(|o| *o > 0.0);
        if let Some(orig) = original {
            let orig_text = format!("US${:.2}", orig);
            if orig_text != "US$0.00" {
                line.push_str(&format!(" (정가 {})", orig_text));
            }
        }

        let pct = match original {
            Some(orig) if row.price.is_some() => ((1.0 - current / orig) * 100.0).max(0.0),
            _ => row.discount_percent.map(f64::from).unwrap_or(0.0),
        };
        let pct_text = format!("(↓{:.2}%)", pct);
        if pct_text != "(↓0.00%)" {
            line.push_str(&format!(" {}", pct_text));
        }
        lines.push(line);
    }

    lines.join("\n")
}

/// Notice posted when the daily job fails.
pub fn failure_message(error: impl Display) -> String {
    format!("*올리브영 글로벌몰 랭킹 자동화 실패*\n```\n{}\n```", error)
}
