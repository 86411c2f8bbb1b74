use crate::models::{round2, BaselineFactors, ShiftRow};

/// Baseline handed to controllers with no shift history on record.
pub const DEFAULT_BASELINE: BaselineFactors = BaselineFactors {
    blink_rate: 18.0,
    speech_rate: 122.0,
    response_delay: 0.95,
    tone_stability: 0.9,
};

// Statistical fallbacks substituted per row when an indicator is absent.
pub const FALLBACK_PERCLOS: f64 = 0.28;
pub const FALLBACK_FOM: f64 = 0.82;
pub const FALLBACK_REACTION: f64 = 0.92;
pub const FALLBACK_DELTA: f64 = 0.12;

/// Derive a controller's four baseline behavioral factors from their shift
/// history. Deterministic and side-effect free.
pub fn derive_baseline(history: &[ShiftRow]) -> BaselineFactors {
    if history.is_empty() {
        return DEFAULT_BASELINE;
    }

    let avg_perclos = average(history, |row| row.avg_perclos, FALLBACK_PERCLOS);
    let avg_fom = average(history, |row| row.avg_fom, FALLBACK_FOM);
    let avg_reaction = average(history, |row| row.pre_shift_reaction, FALLBACK_REACTION);
    let avg_delta = average(history, |row| row.reaction_delta, FALLBACK_DELTA);

    BaselineFactors {
        blink_rate: (12.0 + (1.0 - avg_perclos) * 18.0).round().clamp(12.0, 24.0),
        speech_rate: (105.0 + avg_fom * 40.0).round().clamp(95.0, 150.0),
        response_delay: round2(avg_reaction.clamp(0.6, 1.4)),
        tone_stability: round2(
            (0.78 + avg_fom * 0.15 - avg_perclos * 0.08 - avg_delta * 0.1).clamp(0.75, 0.99),
        ),
    }
}

/// Mean of one indicator across the history; each row missing (or carrying a
/// non-finite value for) that indicator contributes the fallback instead.
fn average(rows: &[ShiftRow], field: impl Fn(&ShiftRow) -> Option<f64>, fallback: f64) -> f64 {
    let total: f64 = rows
        .iter()
        .map(|row| field(row).filter(|v| v.is_finite()).unwrap_or(fallback))
        .sum();
    total / rows.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_row(
        perclos: Option<f64>,
        fom: Option<f64>,
        reaction: Option<f64>,
        delta: Option<f64>,
    ) -> ShiftRow {
        ShiftRow {
            record_id: Some("sh-001".to_string()),
            controller_id: Some("ctl-01".to_string()),
            avg_perclos: perclos,
            avg_fom: fom,
            pre_shift_reaction: reaction,
            reaction_delta: delta,
            ..ShiftRow::default()
        }
    }

    #[test]
    fn empty_history_returns_default_baseline() {
        let derived = derive_baseline(&[]);
        assert_eq!(derived.blink_rate, 18.0);
        assert_eq!(derived.speech_rate, 122.0);
        assert_eq!(derived.response_delay, 0.95);
        assert_eq!(derived.tone_stability, 0.9);
    }

    #[test]
    fn single_row_follows_the_affine_transforms() {
        let rows = vec![history_row(Some(0.5), Some(0.8), Some(1.0), Some(0.2))];
        let derived = derive_baseline(&rows);
        assert_eq!(derived.blink_rate, 21.0);
        assert_eq!(derived.speech_rate, 137.0);
        assert_eq!(derived.response_delay, 1.0);
        // 0.78 + 0.12 - 0.04 - 0.02
        assert_eq!(derived.tone_stability, 0.84);
    }

    #[test]
    fn extreme_indicators_are_clamped() {
        let rows = vec![history_row(Some(0.0), Some(2.0), Some(0.2), Some(-3.0))];
        let derived = derive_baseline(&rows);
        assert_eq!(derived.blink_rate, 24.0);
        assert_eq!(derived.speech_rate, 150.0);
        assert_eq!(derived.response_delay, 0.6);
        assert_eq!(derived.tone_stability, 0.99);
    }

    #[test]
    fn missing_indicators_substitute_row_fallbacks() {
        // Only PERCLOS is populated; the other three averages come straight
        // from their fallbacks.
        let rows = vec![history_row(Some(0.4), None, None, None)];
        let derived = derive_baseline(&rows);
        assert_eq!(derived.blink_rate, 23.0);
        assert_eq!(derived.speech_rate, 138.0);
        assert_eq!(derived.response_delay, 0.92);
    }

    #[test]
    fn non_finite_values_count_as_missing() {
        let rows = vec![
            history_row(Some(f64::NAN), Some(0.9), Some(0.8), Some(0.1)),
            history_row(Some(0.5), Some(0.9), Some(0.8), Some(0.1)),
        ];
        let derived = derive_baseline(&rows);
        // PERCLOS averages (0.28 + 0.5) / 2, so blink is round(12 + 0.61 * 18)
        assert_eq!(derived.blink_rate, 23.0);
    }

    #[test]
    fn averages_span_all_rows() {
        let rows = vec![
            history_row(Some(0.3), Some(0.8), Some(0.9), Some(0.1)),
            history_row(Some(0.5), Some(0.6), Some(1.1), Some(0.3)),
        ];
        let derived = derive_baseline(&rows);
        // avg PERCLOS 0.4, avg FOM 0.7, avg reaction 1.0
        assert_eq!(derived.blink_rate, 23.0);
        assert_eq!(derived.speech_rate, 133.0);
        assert_eq!(derived.response_delay, 1.0);
    }
}
