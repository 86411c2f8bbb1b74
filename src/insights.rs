use std::collections::HashMap;

use crate::models::ShiftRow;

const DEFAULT_PEAK_FATIGUE: f64 = 0.4;
const DEFAULT_SLEEP_HOURS: f64 = 6.0;
// Ratio guard against a near-zero denominator.
const MIN_RATIO_DENOMINATOR: f64 = 0.01;

pub const EMPTY_INSIGHTS: [&str; 2] = [
    "No shift history recorded yet; fatigue comparisons will appear after the first completed shift.",
    "Sleep and alert correlations need at least one completed shift on record.",
];

/// Narrative insights over a set of shift-history rows (fleet-wide or a
/// controller-scoped subset). Pure; recomputed per read.
pub fn build_insights(shifts: &[ShiftRow]) -> Vec<String> {
    if shifts.is_empty() {
        return EMPTY_INSIGHTS.iter().map(|s| s.to_string()).collect();
    }

    let mut sentences = Vec::new();
    if let Some(sentence) = shift_type_comparison(shifts) {
        sentences.push(sentence);
    }

    let rows = shifts.len();
    let avg_sleep = shifts
        .iter()
        .map(|row| row.sleep_hours_prior.unwrap_or(DEFAULT_SLEEP_HOURS))
        .sum::<f64>()
        / rows as f64;
    let avg_alerts = shifts
        .iter()
        .map(|row| f64::from(row.alerts_triggered.unwrap_or(0)))
        .sum::<f64>()
        / rows as f64;

    sentences.push(format!(
        "Fleet average sleep before shift is {avg_sleep:.1} h with {avg_alerts:.1} alerts per shift."
    ));

    let advisories = (avg_alerts * rows as f64).round() as i64;
    sentences.push(format!(
        "Expect roughly {advisories} fatigue advisories across {rows} recorded shifts."
    ));

    sentences
}

/// Compare average peak fatigue between the heaviest and lightest shift
/// types. Rows without a shift type stay out of the grouping.
fn shift_type_comparison(shifts: &[ShiftRow]) -> Option<String> {
    let mut totals: HashMap<String, (f64, usize)> = HashMap::new();
    for row in shifts {
        let Some(shift_type) = row.shift_type.as_deref() else {
            continue;
        };
        let value = row
            .peak_fatigue_score
            .or(row.max_fatigue_level)
            .unwrap_or(DEFAULT_PEAK_FATIGUE)
            .clamp(0.0, 1.0);
        let entry = totals
            .entry(shift_type.trim().to_lowercase())
            .or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }

    let mut averages: Vec<(String, f64)> = totals
        .into_iter()
        .map(|(shift_type, (total, count))| (shift_type, total / count as f64))
        .collect();
    averages.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    let (lowest, highest) = (averages.first()?, averages.last()?);
    if averages.len() == 1 {
        return Some(format!(
            "Only {} shifts are on record, averaging {:.2} peak fatigue.",
            lowest.0, lowest.1
        ));
    }

    let ratio = highest.1 / lowest.1.max(MIN_RATIO_DENOMINATOR);
    Some(format!(
        "{} shifts run {ratio:.1}x higher fatigue than {} shifts across the recorded history.",
        capitalize(&highest.0),
        lowest.0
    ))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
