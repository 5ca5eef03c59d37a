//! Export artifacts: stats table, per-day bar chart, raw message dump.
//!
//! Every artifact is written to a sibling temp file first and then renamed over the target,
//! so readers only ever see a complete file.

use std::{
    collections::BTreeMap,
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;

use crate::{
    stats::{AggregateStats, RawMessageLog},
    Result,
};

pub const STATS_FILE: &str = "universities_posts_stats.csv";
pub const CHART_FILE: &str = "publications_count.svg";
pub const RAW_MESSAGES_FILE: &str = "crawled_messages.csv";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportPaths {
    pub stats: PathBuf,
    pub chart: PathBuf,
    pub raw_messages: PathBuf,
}

impl ExportPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            stats: dir.join(STATS_FILE),
            chart: dir.join(CHART_FILE),
            raw_messages: dir.join(RAW_MESSAGES_FILE),
        }
    }
}

/// One `Metric,Value` row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatRow {
    pub metric: String,
    pub value: u64,
}

impl StatRow {
    fn new(metric: impl Into<String>, value: u64) -> Self {
        Self {
            metric: metric.into(),
            value,
        }
    }
}

/// Base metrics first, then one row per mentioned entity in first-mention order.
pub fn snapshot_table(stats: &AggregateStats) -> Vec<StatRow> {
    let mut rows = vec![
        StatRow::new("Total posts", stats.total_posts),
        StatRow::new("Unique channels", stats.unique_channel_count() as u64),
        StatRow::new("Views", stats.total_views),
        StatRow::new("Forwards", stats.total_forwards),
        StatRow::new("Replies", stats.total_replies),
    ];
    rows.extend(
        stats
            .mentions_by_entity
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(entity, count)| StatRow::new(format!("Mentions of university {entity}"), *count)),
    );
    rows
}

pub fn table_to_csv(rows: &[StatRow]) -> String {
    let mut csv = String::from("Metric,Value\n");
    for row in rows {
        csv.push_str(&format!("{},{}\n", escape_csv(&row.metric), row.value));
    }
    csv
}

/// Aligned plain-text rendering for the terminal.
pub fn table_to_text(rows: &[StatRow]) -> String {
    let width = rows
        .iter()
        .map(|r| r.metric.chars().count())
        .max()
        .unwrap_or(0)
        .max("Metric".len());

    let mut out = format!("{:<width$}  Value\n", "Metric");
    for row in rows {
        let pad = width - row.metric.chars().count();
        out.push_str(&format!("{}{}  {}\n", row.metric, " ".repeat(pad), row.value));
    }
    out
}

pub fn write_stats_table(stats: &AggregateStats, path: &Path) -> Result<Vec<StatRow>> {
    let rows = snapshot_table(stats);
    write_atomic(path, table_to_csv(&rows).as_bytes())?;
    Ok(rows)
}

const CHART_WIDTH: f64 = 1200.0;
const CHART_HEIGHT: f64 = 600.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 110.0;
const Y_TICKS: u64 = 5;

/// Bar chart of posts per day as a standalone SVG document. Bars are in ascending date order.
pub fn render_time_series(posts_by_day: &BTreeMap<NaiveDate, u64>) -> String {
    let plot_w = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let baseline = MARGIN_TOP + plot_h;
    let max = posts_by_day.values().copied().max().unwrap_or(0).max(1);

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{CHART_WIDTH}" height="{CHART_HEIGHT}" viewBox="0 0 {CHART_WIDTH} {CHART_HEIGHT}" font-family="sans-serif">"#
    );
    let _ = writeln!(
        svg,
        r#"  <rect width="100%" height="100%" fill="white"/>"#
    );
    let _ = writeln!(
        svg,
        r#"  <text x="{}" y="30" font-size="18" text-anchor="middle">Telegram publications per day</text>"#,
        CHART_WIDTH / 2.0
    );

    // Y axis with evenly spaced ticks.
    let _ = writeln!(
        svg,
        r#"  <line x1="{MARGIN_LEFT}" y1="{MARGIN_TOP}" x2="{MARGIN_LEFT}" y2="{baseline}" stroke="black"/>"#
    );
    for i in 0..=Y_TICKS {
        let value = max * i / Y_TICKS;
        let y = baseline - plot_h * (value as f64) / (max as f64);
        let _ = writeln!(
            svg,
            r#"  <text x="{:.1}" y="{:.1}" font-size="11" text-anchor="end">{value}</text>"#,
            MARGIN_LEFT - 6.0,
            y + 4.0
        );
    }
    let _ = writeln!(
        svg,
        r#"  <text x="20" y="{:.1}" font-size="13" text-anchor="middle" transform="rotate(-90 20 {:.1})">Messages</text>"#,
        MARGIN_TOP + plot_h / 2.0,
        MARGIN_TOP + plot_h / 2.0
    );

    // X axis and bars.
    let _ = writeln!(
        svg,
        r#"  <line x1="{MARGIN_LEFT}" y1="{baseline}" x2="{}" y2="{baseline}" stroke="black"/>"#,
        MARGIN_LEFT + plot_w
    );
    let slot = if posts_by_day.is_empty() {
        plot_w
    } else {
        plot_w / posts_by_day.len() as f64
    };
    for (i, (day, count)) in posts_by_day.iter().enumerate() {
        let bar_h = plot_h * (*count as f64) / (max as f64);
        let x = MARGIN_LEFT + slot * i as f64 + slot * 0.1;
        let label_x = MARGIN_LEFT + slot * i as f64 + slot / 2.0;
        let label_y = baseline + 14.0;
        let _ = writeln!(
            svg,
            r#"  <rect class="bar" data-date="{day}" data-count="{count}" x="{x:.1}" y="{:.1}" width="{:.1}" height="{bar_h:.1}" fill="steelblue"/>"#,
            baseline - bar_h,
            slot * 0.8
        );
        let _ = writeln!(
            svg,
            r#"  <text x="{label_x:.1}" y="{label_y:.1}" font-size="11" text-anchor="end" transform="rotate(-45 {label_x:.1} {label_y:.1})">{day}</text>"#
        );
    }
    let _ = writeln!(
        svg,
        r#"  <text x="{}" y="{}" font-size="13" text-anchor="middle">Date</text>"#,
        MARGIN_LEFT + plot_w / 2.0,
        CHART_HEIGHT - 15.0
    );

    svg.push_str("</svg>\n");
    svg
}

pub fn write_chart(posts_by_day: &BTreeMap<NaiveDate, u64>, path: &Path) -> Result<()> {
    write_atomic(path, render_time_series(posts_by_day).as_bytes())
}

pub fn raw_messages_to_csv(log: &RawMessageLog) -> String {
    let mut csv = String::from("message\n");
    for message in log.iter() {
        csv.push_str(&escape_csv(message));
        csv.push('\n');
    }
    csv
}

pub fn dump_raw_messages(log: &RawMessageLog, path: &Path) -> Result<()> {
    write_atomic(path, raw_messages_to_csv(log).as_bytes())
}

/// Write all three artifacts. Returns the stats rows for display.
pub fn export_all(
    stats: &AggregateStats,
    log: &RawMessageLog,
    paths: &ExportPaths,
) -> Result<Vec<StatRow>> {
    let rows = write_stats_table(stats, &paths.stats)?;
    write_chart(&stats.posts_by_day, &paths.chart)?;
    dump_raw_messages(log, &paths.raw_messages)?;

    tracing::info!(
        stats = %paths.stats.display(),
        chart = %paths.chart.display(),
        messages = %paths.raw_messages.display(),
        "exports written"
    );
    Ok(rows)
}

fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Replace `path` in one step: write a sibling temp file, then rename it over the target.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".to_string());
    let tmp = path.with_file_name(format!(".{file_name}.{}.tmp", std::process::id()));

    fs::write(&tmp, contents)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}
