use crate::models::{round2, ShiftRow, ShiftSummary};

const DEFAULT_PEAK_FATIGUE: f64 = 0.4;
const DEFAULT_REACTION_DELTA: f64 = 0.12;

/// Map one shift-history row into its bounded summary. Rows without a
/// controller id or shift date produce nothing.
pub fn map_shift_summary(row: &ShiftRow) -> Option<ShiftSummary> {
    let controller_id = row.controller_id.clone()?;
    let shift_date = row.shift_date?;

    let peak_fatigue = round2(
        row.max_fatigue_level
            .or(row.peak_fatigue_score)
            .unwrap_or(DEFAULT_PEAK_FATIGUE)
            .clamp(0.0, 1.0),
    );
    let prediction = row.prediction_score.unwrap_or(peak_fatigue);
    let pre_shift_readiness = round2((1.0 - prediction * 0.55).clamp(0.45, 0.98));
    let post_shift_delta = round2(
        row.reaction_delta
            .unwrap_or(DEFAULT_REACTION_DELTA)
            .clamp(-0.5, 0.5),
    );

    Some(ShiftSummary {
        controller_id,
        shift_date,
        pre_shift_readiness,
        peak_fatigue,
        post_shift_delta,
        note: compose_note(row),
    })
}

fn compose_note(row: &ShiftRow) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(shift_type) = &row.shift_type {
        parts.push(format!("{shift_type} shift"));
    }
    if let Some(category) = &row.fatigue_category {
        parts.push(format!("fatigue marked as {category}"));
    }
    if let Some(alerts) = row.alerts_triggered {
        let plural = if alerts == 1 { "" } else { "s" };
        parts.push(format!("{alerts} alert{plural} triggered"));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}
