//! Human-readable numbers for profile tables

use crate::api::Stats;

/// Format a duration given in seconds, picking the unit by magnitude
pub fn format_time(secs: f64) -> String {
    let abs = secs.abs();
    if abs == 0.0 {
        "0".to_string()
    } else if abs >= 3600.0 {
        format!("{:.2}h", secs / 3600.0)
    } else if abs >= 60.0 {
        format!("{:.2}m", secs / 60.0)
    } else if abs >= 1.0 {
        format!("{:.2}s", secs)
    } else if abs >= 0.001 {
        format!("{:.2}ms", secs * 1_000.0)
    } else {
        format!("{:.0}µs", secs * 1_000_000.0)
    }
}

/// Format a number with commas for readability
pub fn format_count(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

pub fn format_qps(qps: f64) -> String {
    if qps >= 1000.0 {
        format!("{:.1}k", qps / 1000.0)
    } else if qps >= 1.0 {
        format!("{:.2}", qps)
    } else {
        format!("{:.4}", qps)
    }
}

/// Percentage of total load, `0.2` -> `20.00%`
pub fn format_percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

/// One-line latency summary: min, max and average, plus p95 when known
pub fn latency_summary(stats: &Stats) -> String {
    let mut parts = vec![
        format!("min {}", format_time(stats.min)),
        format!("max {}", format_time(stats.max)),
        format!("avg {}", format_time(stats.avg)),
    ];
    if stats.p95 != 0.0 {
        parts.push(format!("95% {}", format_time(stats.p95)));
    }
    parts.join(", ")
}

/// Shorten a fingerprint for a fixed-width column
pub fn truncate(text: &str, width: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= width {
        return flat;
    }
    let cut: String = flat.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0");
        assert_eq!(format_time(0.000_25), "250µs");
        assert_eq!(format_time(0.0123), "12.30ms");
        assert_eq!(format_time(2.5), "2.50s");
        assert_eq!(format_time(90.0), "1.50m");
        assert_eq!(format_time(7200.0), "2.00h");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1234567), "1,234,567");
    }

    #[test]
    fn test_format_qps_and_percent() {
        assert_eq!(format_qps(0.0123), "0.0123");
        assert_eq!(format_qps(12.0), "12.00");
        assert_eq!(format_qps(2500.0), "2.5k");
        assert_eq!(format_percent(0.2), "20.00%");
    }

    #[test]
    fn test_latency_summary_skips_empty_p95() {
        let stats = Stats {
            min: 0.001,
            max: 2.0,
            avg: 0.5,
            ..Default::default()
        };
        assert_eq!(latency_summary(&stats), "min 1.00ms, max 2.00s, avg 500.00ms");

        let stats = Stats { p95: 1.5, ..stats };
        assert!(latency_summary(&stats).ends_with(", 95% 1.50s"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("select  *\n from t", 40), "select * from t");
        assert_eq!(truncate("select * from sbtest1", 10), "select ...");
    }
}
