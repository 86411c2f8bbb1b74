use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Gender {
    Female,
    Male,
    Other,
}

impl Gender {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("female") | Some("f") => Gender::Female,
            Some("male") | Some("m") => Gender::Male,
            _ => Gender::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Female => "female",
            Gender::Male => "male",
            Gender::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RosterRole {
    Primary,
    Backup,
}

impl RosterRole {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("backup") => RosterRole::Backup,
            _ => RosterRole::Primary,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RosterRole::Primary => "primary",
            RosterRole::Backup => "backup",
        }
    }
}

/// Coarse phase marker for a live sample within a shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SampleBlock {
    Start,
    Middle,
    End,
}

impl SampleBlock {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "start" => Some(SampleBlock::Start),
            "middle" => Some(SampleBlock::Middle),
            "end" => Some(SampleBlock::End),
            _ => None,
        }
    }

    pub fn hour_offset(self) -> i64 {
        match self {
            SampleBlock::Start => 0,
            SampleBlock::Middle => 1,
            SampleBlock::End => 2,
        }
    }

    /// Replay order within a shift date; unrecognized blocks rank after `End`.
    pub fn rank(self) -> u8 {
        match self {
            SampleBlock::Start => 0,
            SampleBlock::Middle => 1,
            SampleBlock::End => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FatigueStatus {
    Normal,
    Monitor,
    HighFatigue,
}

impl std::fmt::Display for FatigueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FatigueStatus::Normal => write!(f, "Normal"),
            FatigueStatus::Monitor => write!(f, "Monitor"),
            FatigueStatus::HighFatigue => write!(f, "High Fatigue"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Trend {
    Up,
    Down,
    Steady,
}

/// Roster row as it comes off the controllers sheet. Every field is optional;
/// validation happens in the seeder, not here.
#[derive(Debug, Clone, Default)]
pub struct ControllerRow {
    pub controller_id: Option<String>,
    pub name: Option<String>,
    pub experience_years: Option<i32>,
    pub birth_year: Option<i32>,
    pub gender: Option<String>,
    pub sector_id: Option<String>,
    pub sector_name: Option<String>,
    pub shift_group: Option<String>,
    pub roster_role: Option<String>,
    pub baseline_readiness: Option<f64>,
}

/// One completed shift's aggregate measurements, loosely populated.
/// Shared between the seeder (from the sheet) and the read path (from the
/// store) so the summary mapper stays total over sparse rows.
#[derive(Debug, Clone, Default)]
pub struct ShiftRow {
    pub record_id: Option<String>,
    pub controller_id: Option<String>,
    pub shift_date: Option<NaiveDate>,
    pub shift_type: Option<String>,
    pub sleep_hours_prior: Option<f64>,
    pub consecutive_work_days: Option<i32>,
    pub max_fatigue_level: Option<f64>,
    pub peak_fatigue_score: Option<f64>,
    pub avg_perclos: Option<f64>,
    pub avg_fom: Option<f64>,
    pub pre_shift_reaction: Option<f64>,
    pub post_shift_reaction: Option<f64>,
    pub reaction_delta: Option<f64>,
    pub fatigue_category: Option<String>,
    pub prediction_score: Option<f64>,
    pub alerts_triggered: Option<i32>,
}

/// One periodic in-shift physiological sample, loosely populated.
#[derive(Debug, Clone, Default)]
pub struct SampleRow {
    pub sample_id: Option<String>,
    pub controller_id: Option<String>,
    pub shift_record_id: Option<String>,
    pub sector_id: Option<String>,
    pub shift_date: Option<NaiveDate>,
    pub shift_type: Option<String>,
    pub sample_block: Option<String>,
    pub perclos: Option<f64>,
    pub fom: Option<f64>,
    pub reaction_time: Option<f64>,
    pub fatigue_score: Option<f64>,
    pub sleep_hours_prior: Option<f64>,
    pub consecutive_work_days: Option<i32>,
}

/// Synthetic baseline behavioral factors derived from shift history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BaselineFactors {
    pub blink_rate: f64,
    pub speech_rate: f64,
    pub response_delay: f64,
    pub tone_stability: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ControllerProfile {
    pub controller_id: String,
    pub name: String,
    pub experience_years: Option<i32>,
    pub birth_year: Option<i32>,
    pub gender: Gender,
    pub sector_id: String,
    pub sector_name: String,
    pub shift_group: String,
    pub roster_role: RosterRole,
    pub baseline_readiness: f64,
    pub baseline: BaselineFactors,
}

/// Bounded readiness/fatigue summary of one completed shift. Derived on
/// read, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ShiftSummary {
    pub controller_id: String,
    pub shift_date: NaiveDate,
    pub pre_shift_readiness: f64,
    pub peak_fatigue: f64,
    pub post_shift_delta: f64,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FactorReading {
    pub label: String,
    pub value: String,
    pub trend: Trend,
}

/// Classified live fatigue snapshot. Derived on read, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct FatigueSnapshot {
    pub controller_id: String,
    pub sector_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub fatigue_score: f64,
    pub readiness_level: f64,
    pub status: FatigueStatus,
    pub factors: Vec<FactorReading>,
    pub recommendation: String,
}

/// Snapshots sharing a shift date and sample block, for ordered replay.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotFrame {
    pub shift_date: Option<NaiveDate>,
    pub sample_block: String,
    pub snapshots: Vec<FatigueSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectorRoster {
    pub sector_id: String,
    pub sector_name: String,
    pub primary: Vec<ControllerProfile>,
    pub backup: Vec<ControllerProfile>,
}

/// Append-only supervisor log entry, written and read verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct SupervisorAction {
    pub id: Uuid,
    pub controller_id: String,
    pub kind: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
