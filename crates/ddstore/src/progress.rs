//! 📊 progress.rs — "Are we there yet?" — every backfill, every time, forever.
//!
//! 🚀 Answers the age-old question: "how many of these records made it into the cluster?"
//! With cold hard numbers, a progress bar, and a table so comfy it has lumbar support.
//!
//! ⚠️  Watching this progress bar will not make Elasticsearch index faster.
//! Neither will refreshing Kibana. We've tried. Science says no.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::NOTHING};
use indicatif::{ProgressBar, ProgressStyle};

/// 🔢 Formats a number with commas. "1000000 docs" → "1,000,000 docs" — you're welcome, eyes.
pub(crate) fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    let lead = digits.len() % 3;
    for (position, digit) in digits.char_indices() {
        if position != 0 && (position + 3 - lead) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

/// ⏱️ Formats a Duration into MM:SS or HH:MM:SS.
/// If it shows HH:MM:SS, the cluster is either tiny or sad. Possibly both.
pub(crate) fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    match (secs / 3600, (secs % 3600) / 60, secs % 60) {
        (0, minutes, seconds) => format!("{:02}:{:02}", minutes, seconds),
        (hours, minutes, seconds) => format!("{:02}:{:02}:{:02}", hours, minutes, seconds),
    }
}

/// 📊 Tracks written and failed documents, the write rate, and an ETA.
///
/// Uses a sliding 5-second window for the rate so a single slow bulk
/// rejection doesn't make the whole display look like a seismograph.
pub(crate) struct ProgressMetrics {
    /// 🏷️ which index we're filling, for the header line
    label: String,
    /// 📏 how many records the file held
    total_records: u64,
    written: u64,
    failed: u64,
    progress_bar: ProgressBar,
    /// 🔄 (timestamp, documents handled so far)
    rate_samples: VecDeque<(Instant, u64)>,
    start_time: Instant,
}

impl std::fmt::Debug for ProgressMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // -- 🎭 ProgressBar is a diva and doesn't derive Debug
        f.debug_struct("ProgressMetrics")
            .field("label", &self.label)
            .field("total_records", &self.total_records)
            .field("written", &self.written)
            .field("failed", &self.failed)
            .finish()
    }
}

impl ProgressMetrics {
    /// 🚀 A fresh bar for `total_records` documents headed to the `label` index.
    pub(crate) fn new(label: String, total_records: u64) -> Self {
        let progress_bar = ProgressBar::new(total_records);
        // -- 🎨 cyan because it's classy, blue because it's calm. falls back to the plain bar
        // -- if indicatif ever stops liking our template.
        let style = ProgressStyle::default_bar()
            .template("{msg}\n| [{bar:40.cyan/blue}]")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        progress_bar.set_style(style);

        let start_time = Instant::now();
        let mut rate_samples = VecDeque::new();
        rate_samples.push_back((start_time, 0u64));

        Self {
            label,
            total_records,
            written: 0,
            failed: 0,
            progress_bar,
            rate_samples,
            start_time,
        }
    }

    /// 🔄 Count finished writes, recompute the rate, redraw.
    pub(crate) fn update(&mut self, written: u64, failed: u64) {
        self.written += written;
        self.failed += failed;

        let docs_per_sec = self.docs_per_sec();
        self.render(docs_per_sec);
        self.progress_bar.set_position(self.handled());
    }

    /// ✅ Ring the bell. We made it. (Or fail_fast pulled the plug. Same energy.)
    pub(crate) fn finish(&self) {
        self.progress_bar.finish();
    }

    pub(crate) fn handled(&self) -> u64 {
        self.written + self.failed
    }

    fn docs_per_sec(&mut self) -> f64 {
        let now = Instant::now();
        let window = Duration::from_secs(5);
        while let Some(&(timestamp, _)) = self.rate_samples.front() {
            if now.duration_since(timestamp) > window {
                self.rate_samples.pop_front();
            } else {
                break;
            }
        }

        let handled = self.handled();
        self.rate_samples.push_back((now, handled));

        match self.rate_samples.front() {
            Some(&(oldest_time, oldest_handled)) => {
                let elapsed = now.duration_since(oldest_time).as_secs_f64();
                if elapsed > 0.0 {
                    handled.saturating_sub(oldest_handled) as f64 / elapsed
                } else {
                    0.0
                }
            }
            None => 0.0,
        }
    }

    /// 🎨 Two columns, no borders, stuffed into the progress bar message:
    /// ```text
    /// index: <label>
    ///   <docs/s>          <written / total>
    ///   <failed>          <%>
    ///   <elapsed>         <remaining>
    /// | [=====>----------]
    /// ```
    fn render(&self, docs_per_sec: f64) {
        let percent = if self.total_records > 0 {
            (self.handled() as f64 / self.total_records as f64) * 100.0
        } else {
            0.0
        };

        let elapsed = self.start_time.elapsed();
        let remaining = if percent > 0.0 {
            // 🔮 linear extrapolation — assumes the cluster stays as fast as it was
            let total_estimated = elapsed.as_secs_f64() / (percent / 100.0);
            let remaining_secs = total_estimated - elapsed.as_secs_f64();
            if remaining_secs > 0.0 {
                format_duration(Duration::from_secs_f64(remaining_secs))
            } else {
                "--:--".to_string()
            }
        } else {
            "--:--".to_string()
        };

        let mut table = Table::new();
        table.load_preset(NOTHING);
        table.set_content_arrangement(ContentArrangement::Dynamic);

        table.add_row(vec![
            Cell::new(format!("{} Docs/s", format_number(docs_per_sec as u64)))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!(
                "{} / {} Docs",
                format_number(self.written),
                format_number(self.total_records)
            ))
            .set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new(format!("{} failed", format_number(self.failed)))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}%", percent)).set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new(format!("{} elapsed", format_duration(elapsed)))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{} remaining", remaining)).set_alignment(CellAlignment::Right),
        ]);

        self.progress_bar
            .set_message(format!("index: {}\n{}", self.label, table));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_big_numbers_get_commas() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1_000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn the_one_where_an_hour_earns_its_own_column() {
        assert_eq!(format_duration(Duration::from_secs(59)), "00:59");
        assert_eq!(format_duration(Duration::from_secs(61)), "01:01");
        assert_eq!(format_duration(Duration::from_secs(3_661)), "01:01:01");
    }

    #[test]
    fn the_one_where_failures_count_toward_done_but_not_toward_written() {
        let mut progress = ProgressMetrics::new("profile".to_string(), 10);
        progress.update(3, 0);
        progress.update(0, 2);
        progress.finish();

        assert_eq!(progress.written, 3);
        assert_eq!(progress.failed, 2);
        assert_eq!(progress.handled(), 5);
    }

    #[test]
    fn the_one_where_an_empty_file_does_not_divide_by_zero() {
        let mut progress = ProgressMetrics::new("text".to_string(), 0);
        progress.update(0, 0);
        assert_eq!(progress.handled(), 0);
    }
}
