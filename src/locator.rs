//! Segment Locator - render space back to parameter space
//!
//! `locate` turns a normalized position along the tube into a segment id.
//! `range_label` and `timeline_ticks` give the dates covered by each period,
//! walking backward in months from the epoch (top of the spiral = most recent).

use chrono::{Datelike, NaiveDate};

use crate::params::PERIOD_COUNT;

/// Segment id under normalized position u. Never returns an id >= segment_count.
pub fn locate(u: f64, segment_count: usize) -> usize {
    if segment_count == 0 {
        return 0;
    }
    let u = if u.is_finite() { u.clamp(0.0, 1.0) } else { 0.0 };
    ((u * segment_count as f64).floor() as usize).min(segment_count - 1)
}

/// Months since year 0 of the epoch's month
pub fn epoch_months(epoch: NaiveDate) -> f64 {
    (epoch.year() as f64) * 12.0 + epoch.month0() as f64
}

/// Date range covered by one period, e.g. "2026/1 - 2025/1"
pub fn range_label(period: usize, duration: f64, epoch: NaiveDate) -> String {
    let start = epoch_months(epoch);
    let width = months_per_period(duration);

    let from = start - period as f64 * width;
    let to = start - (period + 1) as f64 * width;
    format!("{} - {}", format_month(from), format_month(to))
}

/// The six period boundaries, most recent first
pub fn timeline_ticks(duration: f64, epoch: NaiveDate) -> Vec<String> {
    let start = epoch_months(epoch);
    let width = months_per_period(duration);
    (0..=PERIOD_COUNT)
        .map(|i| format_month(start - i as f64 * width))
        .collect()
}

fn months_per_period(duration: f64) -> f64 {
    duration * 12.0 / PERIOD_COUNT as f64
}

/// Format a fractional month count as "year/month"
fn format_month(months: f64) -> String {
    let year = (months / 12.0).floor() as i64;
    let month = (months.max(0.0).floor() as i64) % 12 + 1;
    format!("{}/{}", year, month)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
    }

    #[test]
    fn test_locate_clamps_top_edge() {
        assert_eq!(locate(1.0, 400), 399);
        assert_eq!(locate(0.0, 400), 0);
        assert_eq!(locate(0.5, 400), 200);
        assert_eq!(locate(0.99999, 400), 399);
    }

    #[test]
    fn test_locate_out_of_range_input() {
        assert_eq!(locate(1.7, 400), 399);
        assert_eq!(locate(-0.2, 400), 0);
        assert_eq!(locate(f64::NAN, 400), 0);
        assert_eq!(locate(0.5, 0), 0);
    }

    #[test]
    fn test_range_labels_five_years() {
        // 5 years -> 12 months per period
        assert_eq!(range_label(0, 5.0, epoch()), "2026/1 - 2025/1");
        assert_eq!(range_label(4, 5.0, epoch()), "2022/1 - 2021/1");
    }

    #[test]
    fn test_range_label_fractional_months() {
        // 2.5 years -> 6 months per period
        assert_eq!(range_label(1, 2.5, epoch()), "2025/7 - 2025/1");
        // 1 year -> 2.4 months per period: 24312 - 2.4 = 24309.6
        assert_eq!(range_label(0, 1.0, epoch()), "2026/1 - 2025/10");
    }

    #[test]
    fn test_timeline_ticks() {
        let ticks = timeline_ticks(5.0, epoch());
        assert_eq!(ticks, vec!["2026/1", "2025/1", "2024/1", "2023/1", "2022/1", "2021/1"]);
    }

    #[test]
    fn test_other_epoch() {
        let epoch = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert_eq!(timeline_ticks(5.0, epoch)[0], "2024/6");
    }
}
