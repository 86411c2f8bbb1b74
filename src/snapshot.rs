use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

use crate::baseline::{FALLBACK_FOM, FALLBACK_PERCLOS, FALLBACK_REACTION};
use crate::models::{
    round2, FactorReading, FatigueSnapshot, FatigueStatus, SampleBlock, SampleRow, Trend,
};

const DEFAULT_FATIGUE_SCORE: f64 = 0.42;
const DEFAULT_SLEEP_HOURS: f64 = 6.0;
const DEFAULT_WORK_DAYS: i32 = 1;

/// Classify a clamped fatigue score. Recomputed per sample; there are no
/// transitions between states.
pub fn classify(score: f64) -> FatigueStatus {
    if score >= 0.75 {
        FatigueStatus::HighFatigue
    } else if score >= 0.55 {
        FatigueStatus::Monitor
    } else {
        FatigueStatus::Normal
    }
}

/// Map one live-sample row into a classified snapshot. Rows without a
/// controller id produce nothing.
pub fn map_snapshot(row: &SampleRow) -> Option<FatigueSnapshot> {
    let controller_id = row.controller_id.clone()?;

    let score = row
        .fatigue_score
        .unwrap_or(DEFAULT_FATIGUE_SCORE)
        .clamp(0.0, 1.0);
    let status = classify(score);

    let sleep = row.sleep_hours_prior.unwrap_or(DEFAULT_SLEEP_HOURS);
    let readiness = round2((1.0 - score * 0.6 + (sleep - 6.0) * 0.02).clamp(0.0, 1.0));

    Some(FatigueSnapshot {
        controller_id,
        sector_id: row.sector_id.clone(),
        timestamp: synthesize_timestamp(
            row.shift_date,
            row.shift_type.as_deref(),
            row.sample_block.as_deref(),
        ),
        fatigue_score: score,
        readiness_level: readiness,
        status,
        factors: build_factors(row),
        recommendation: recommend(status, sleep, row.sample_block.as_deref()),
    })
}

/// The four contributing factors, always in the same order.
fn build_factors(row: &SampleRow) -> Vec<FactorReading> {
    let perclos = row.perclos.unwrap_or(FALLBACK_PERCLOS);
    let fom = row.fom.unwrap_or(FALLBACK_FOM);
    let reaction = row.reaction_time.unwrap_or(FALLBACK_REACTION);
    let days = row.consecutive_work_days.unwrap_or(DEFAULT_WORK_DAYS);
    let shift_type = row.shift_type.as_deref().unwrap_or("unscheduled");

    vec![
        FactorReading {
            label: "PERCLOS".to_string(),
            value: format!("{:.0}%", perclos * 100.0),
            trend: if perclos > 0.38 {
                Trend::Up
            } else if perclos < 0.25 {
                Trend::Down
            } else {
                Trend::Steady
            },
        },
        FactorReading {
            label: "Face orientation".to_string(),
            value: format!("{fom:.2}"),
            trend: if fom < 0.75 {
                Trend::Down
            } else if fom > 0.9 {
                Trend::Up
            } else {
                Trend::Steady
            },
        },
        FactorReading {
            label: "Reaction time".to_string(),
            value: format!("{reaction:.2}s"),
            trend: if reaction > 0.85 {
                Trend::Up
            } else {
                Trend::Steady
            },
        },
        FactorReading {
            label: "Context".to_string(),
            value: format!("{shift_type} shift, day {days}"),
            trend: if days > 3 { Trend::Up } else { Trend::Steady },
        },
    ]
}

fn recommend(status: FatigueStatus, sleep: f64, block: Option<&str>) -> String {
    let parsed_block = block.and_then(SampleBlock::parse);
    match status {
        FatigueStatus::HighFatigue => {
            // Late in the shift there is less room to recover; tighten the window.
            let window = if parsed_block == Some(SampleBlock::End) {
                "5 minutes"
            } else {
                "15 minutes"
            };
            format!("Rotate in the backup controller within {window} and stand the position down.")
        }
        FatigueStatus::Monitor => format!(
            "Encourage hydration and a short break; only {sleep:.1} h of sleep before this shift."
        ),
        FatigueStatus::Normal => {
            let label = match parsed_block {
                Some(SampleBlock::Start) => "start",
                Some(SampleBlock::Middle) => "middle",
                Some(SampleBlock::End) => "end",
                None => "current",
            };
            format!("Maintain the standard scan cadence through the {label} block.")
        }
    }
}

/// Deterministic sample timestamp: shift date at midnight UTC, plus the
/// shift type's nominal start hour and the sample block's offset. Added as a
/// duration so a night-end sample rolls into the next calendar day.
pub fn synthesize_timestamp(
    shift_date: Option<NaiveDate>,
    shift_type: Option<&str>,
    block: Option<&str>,
) -> DateTime<Utc> {
    let date = shift_date.unwrap_or_else(|| Utc::now().date_naive());
    let hour = match shift_type
        .map(|v| v.trim().to_ascii_lowercase())
        .as_deref()
    {
        Some("morning") => 7,
        Some("afternoon") => 13,
        Some("evening") => 17,
        Some("night") => 22,
        _ => 9,
    };
    let offset = block
        .and_then(SampleBlock::parse)
        .map(SampleBlock::hour_offset)
        .unwrap_or(0);

    date.and_time(NaiveTime::MIN).and_utc() + Duration::hours(hour + offset)
}
