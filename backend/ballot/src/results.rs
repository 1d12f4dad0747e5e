//! # Results
//!
//! Turns raw per-option counts into what the poll page shows.
//!
//! - Percentages are relative to the total number of votes on the poll
//! - Rounded half up to a whole number, so rows may not add up to exactly 100%
//! - A poll with no votes shows `0%` everywhere
use std::collections::HashMap;

use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OptionCount {
    pub id: u32,
    pub label: String,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResultRow {
    pub id: u32,
    pub label: String,
    pub count: u64,
    pub percent: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NormalizedResults {
    pub total: u64,
    pub rows: Vec<ResultRow>,
}

pub fn normalize_results(options_with_counts: &[OptionCount]) -> NormalizedResults {
    let total: u64 = options_with_counts.iter().map(|option| option.count).sum();

    let rows = options_with_counts
        .iter()
        .map(|option| {
            let share = if total > 0 {
                option.count as f64 / total as f64 * 100.0
            } else {
                0.0
            };

            ResultRow {
                id: option.id,
                label: option.label.clone(),
                count: option.count,
                percent: format_percent(share),
            }
        })
        .collect();

    NormalizedResults { total, rows }
}

pub fn format_percent(n: f64) -> String {
    // half up, matching how the web client rounds
    format!("{}%", (n + 0.5).floor() as i64)
}

/// Pairs each option label with its stored count.
///
/// Counts stored under an index the poll no longer has (options were edited
/// down) are left out.
pub fn tally(options: &[String], counts: &HashMap<u32, u64>) -> Vec<OptionCount> {
    options
        .iter()
        .enumerate()
        .map(|(index, label)| {
            let id = index as u32;

            OptionCount {
                id,
                label: label.clone(),
                count: counts.get(&id).copied().unwrap_or(0),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(values: &[u64]) -> Vec<OptionCount> {
        values
            .iter()
            .enumerate()
            .map(|(id, &count)| OptionCount {
                id: id as u32,
                label: format!("Option {id}"),
                count,
            })
            .collect()
    }

    fn percents(results: &NormalizedResults) -> Vec<&str> {
        results.rows.iter().map(|row| row.percent.as_str()).collect()
    }

    #[test]
    fn test_uneven_split() {
        let results = normalize_results(&counts(&[3, 2, 1]));

        assert_eq!(results.total, 6);
        assert_eq!(percents(&results), ["50%", "33%", "17%"]);
    }

    #[test]
    fn test_even_split() {
        let results = normalize_results(&counts(&[5, 3, 2]));

        assert_eq!(results.total, 10);
        assert_eq!(percents(&results), ["50%", "30%", "20%"]);
    }

    #[test]
    fn test_rounding_may_not_sum_to_hundred() {
        let results = normalize_results(&counts(&[1, 1, 1]));

        assert_eq!(percents(&results), ["33%", "33%", "33%"]);
    }

    #[test]
    fn test_no_options() {
        let results = normalize_results(&[]);

        assert_eq!(results.total, 0);
        assert!(results.rows.is_empty());
    }

    #[test]
    fn test_all_zero_counts() {
        let results = normalize_results(&counts(&[0, 0, 0]));

        assert_eq!(results.total, 0);
        assert_eq!(percents(&results), ["0%", "0%", "0%"]);
    }

    #[test]
    fn test_rows_keep_order_and_labels() {
        let results = normalize_results(&counts(&[0, 4]));

        assert_eq!(results.rows[0].label, "Option 0");
        assert_eq!(results.rows[1].id, 1);
        assert_eq!(results.rows[1].count, 4);
        assert_eq!(results.rows[1].percent, "100%");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.0), "0%");
        assert_eq!(format_percent(12.5), "13%");
        assert_eq!(format_percent(16.666), "17%");
        assert_eq!(format_percent(33.333), "33%");
        assert_eq!(format_percent(100.0), "100%");
    }

    #[test]
    fn test_tally_fills_missing_and_drops_stale() {
        let options = vec!["Red".to_string(), "Blue".to_string()];
        let stored = HashMap::from([(1, 7), (5, 2)]);

        let rows = tally(&options, &stored);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].count, 0);
        assert_eq!(rows[1].count, 7);
        assert_eq!(rows[1].label, "Blue");
    }
}
