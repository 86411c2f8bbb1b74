use std::collections::HashMap;
use std::path::Path;

use sqlx::PgPool;

use crate::baseline;
use crate::db;
use crate::models::{
    round2, ControllerProfile, ControllerRow, Gender, RosterRole, SampleRow, ShiftRow,
};
use crate::source::{self, SheetRow};

const DEFAULT_BASELINE_READINESS: f64 = 0.85;

pub const CONTROLLERS_DATASET: &str = "controllers";
pub const SHIFT_HISTORY_DATASET: &str = "shift_history";
pub const LIVE_SAMPLES_DATASET: &str = "live_samples";

/// Everything one seeding pass would insert, plus the rows it dropped.
#[derive(Debug, Default)]
pub struct SeedPlan {
    pub controllers: Vec<ControllerProfile>,
    pub shifts: Vec<ShiftRow>,
    pub samples: Vec<SampleRow>,
    pub skipped_controllers: usize,
    pub skipped_shifts: usize,
    pub skipped_samples: usize,
}

#[derive(Debug)]
pub struct SeedOutcome {
    pub applied: bool,
    pub plan: SeedPlan,
}

/// One-time ingestion: read the three datasets, build the plan, and apply it
/// atomically. The store-side guard makes re-runs a no-op once any
/// controller exists.
pub async fn run_seed(pool: &PgPool, data_dir: &Path) -> anyhow::Result<SeedOutcome> {
    let controller_rows: Vec<ControllerRow> = source::read_dataset(data_dir, CONTROLLERS_DATASET)?
        .iter()
        .map(controller_row)
        .collect();
    let shift_rows: Vec<ShiftRow> = source::read_dataset(data_dir, SHIFT_HISTORY_DATASET)?
        .iter()
        .map(shift_row)
        .collect();
    let sample_rows: Vec<SampleRow> = source::read_dataset(data_dir, LIVE_SAMPLES_DATASET)?
        .iter()
        .map(sample_row)
        .collect();

    let plan = build_seed_plan(controller_rows, shift_rows, sample_rows);
    let applied = db::apply_seed_plan(pool, &plan).await?;
    Ok(SeedOutcome { applied, plan })
}

/// Seeding proceeds only against an empty controller store.
pub fn should_seed(existing_controllers: i64) -> bool {
    existing_controllers == 0
}

/// Validate rows and derive per-controller baselines. Rows missing required
/// identity fields are dropped, not errored; the counts record what fell out.
pub fn build_seed_plan(
    controller_rows: Vec<ControllerRow>,
    shift_rows: Vec<ShiftRow>,
    sample_rows: Vec<SampleRow>,
) -> SeedPlan {
    let total_shifts = shift_rows.len();
    let shifts: Vec<ShiftRow> = shift_rows
        .into_iter()
        .filter(|row| row.record_id.is_some() && row.controller_id.is_some())
        .collect();

    let total_samples = sample_rows.len();
    let samples: Vec<SampleRow> = sample_rows
        .into_iter()
        .filter(|row| row.sample_id.is_some() && row.controller_id.is_some())
        .collect();

    let mut history: HashMap<String, Vec<ShiftRow>> = HashMap::new();
    for row in &shifts {
        if let Some(controller_id) = &row.controller_id {
            history
                .entry(controller_id.clone())
                .or_default()
                .push(row.clone());
        }
    }

    let total_controllers = controller_rows.len();
    let mut controllers = Vec::new();
    for row in controller_rows {
        let (Some(controller_id), Some(name), Some(sector_id), Some(sector_name), Some(shift_group)) = (
            row.controller_id,
            row.name,
            row.sector_id,
            row.sector_name,
            row.shift_group,
        ) else {
            continue;
        };

        let derived = baseline::derive_baseline(
            history.get(&controller_id).map(Vec::as_slice).unwrap_or(&[]),
        );
        controllers.push(ControllerProfile {
            controller_id,
            name,
            experience_years: row.experience_years,
            birth_year: row.birth_year,
            gender: Gender::parse(row.gender.as_deref()),
            sector_id,
            sector_name,
            shift_group,
            roster_role: RosterRole::parse(row.roster_role.as_deref()),
            baseline_readiness: round2(
                row.baseline_readiness
                    .unwrap_or(DEFAULT_BASELINE_READINESS)
                    .clamp(0.5, 0.99),
            ),
            baseline: derived,
        });
    }

    SeedPlan {
        skipped_controllers: total_controllers - controllers.len(),
        skipped_shifts: total_shifts - shifts.len(),
        skipped_samples: total_samples - samples.len(),
        controllers,
        shifts,
        samples,
    }
}

pub fn controller_row(row: &SheetRow) -> ControllerRow {
    ControllerRow {
        controller_id: row.text("controller_id"),
        name: row.text("name"),
        experience_years: row.integer("experience_years"),
        birth_year: row.integer("birth_year"),
        gender: row.text("gender"),
        sector_id: row.text("sector_id"),
        sector_name: row.text("sector_name"),
        shift_group: row.text("shift_group"),
        roster_role: row.text("roster_role"),
        baseline_readiness: row.number("baseline_readiness"),
    }
}

pub fn shift_row(row: &SheetRow) -> ShiftRow {
    ShiftRow {
        record_id: row.text("record_id"),
        controller_id: row.text("controller_id"),
        shift_date: row.date("shift_date"),
        shift_type: row.text("shift_type"),
        sleep_hours_prior: row.number("sleep_hours_prior"),
        consecutive_work_days: row.integer("consecutive_work_days"),
        max_fatigue_level: row.number("max_fatigue_level"),
        peak_fatigue_score: row.number("peak_fatigue_score"),
        avg_perclos: row.number("avg_perclos"),
        avg_fom: row.number("avg_fom"),
        pre_shift_reaction: row.number("pre_shift_reaction"),
        post_shift_reaction: row.number("post_shift_reaction"),
        reaction_delta: row.number("reaction_delta"),
        fatigue_category: row.text("fatigue_category"),
        prediction_score: row.number("prediction_score"),
        alerts_triggered: row.integer("alerts_triggered"),
    }
}

pub fn sample_row(row: &SheetRow) -> SampleRow {
    SampleRow {
        sample_id: row.text("sample_id"),
        controller_id: row.text("controller_id"),
        shift_record_id: row.text("shift_record_id"),
        sector_id: row.text("sector_id"),
        shift_date: row.date("shift_date"),
        shift_type: row.text("shift_type"),
        sample_block: row.text("sample_block"),
        perclos: row.number("perclos"),
        fom: row.number("fom"),
        reaction_time: row.number("reaction_time"),
        fatigue_score: row.number("fatigue_score"),
        sleep_hours_prior: row.number("sleep_hours_prior"),
        consecutive_work_days: row.integer("consecutive_work_days"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster_row(id: Option<&str>, sector: Option<&str>) -> ControllerRow {
        ControllerRow {
            controller_id: id.map(String::from),
            name: Some("Imani Okafor".to_string()),
            sector_id: sector.map(String::from),
            sector_name: sector.map(|s| format!("Sector {s}")),
            shift_group: Some("A".to_string()),
            ..ControllerRow::default()
        }
    }

    fn shift_for(controller: Option<&str>, record: Option<&str>) -> ShiftRow {
        ShiftRow {
            record_id: record.map(String::from),
            controller_id: controller.map(String::from),
            avg_perclos: Some(0.1),
            avg_fom: Some(0.9),
            ..ShiftRow::default()
        }
    }

    fn sample_for(controller: Option<&str>, id: Option<&str>) -> SampleRow {
        SampleRow {
            sample_id: id.map(String::from),
            controller_id: controller.map(String::from),
            ..SampleRow::default()
        }
    }

    #[test]
    fn controller_rows_missing_identity_fields_are_skipped() {
        let plan = build_seed_plan(
            vec![
                roster_row(Some("ctl-01"), Some("SCT-1")),
                roster_row(None, Some("SCT-1")),
                roster_row(Some("ctl-03"), None),
            ],
            vec![],
            vec![],
        );
        assert_eq!(plan.controllers.len(), 1);
        assert_eq!(plan.skipped_controllers, 2);
        assert_eq!(plan.controllers[0].controller_id, "ctl-01");
    }

    #[test]
    fn shift_and_sample_rows_need_their_own_ids() {
        let plan = build_seed_plan(
            vec![roster_row(Some("ctl-01"), Some("SCT-1"))],
            vec![
                shift_for(Some("ctl-01"), Some("sh-1")),
                shift_for(Some("ctl-01"), None),
                shift_for(None, Some("sh-3")),
            ],
            vec![
                sample_for(Some("ctl-01"), Some("ls-1")),
                sample_for(None, Some("ls-2")),
            ],
        );
        assert_eq!(plan.shifts.len(), 1);
        assert_eq!(plan.skipped_shifts, 2);
        assert_eq!(plan.samples.len(), 1);
        assert_eq!(plan.skipped_samples, 1);
    }

    #[test]
    fn baselines_come_from_each_controllers_own_history() {
        let plan = build_seed_plan(
            vec![
                roster_row(Some("ctl-01"), Some("SCT-1")),
                roster_row(Some("ctl-02"), Some("SCT-1")),
            ],
            vec![shift_for(Some("ctl-01"), Some("sh-1"))],
            vec![],
        );
        let with_history = &plan.controllers[0];
        let without_history = &plan.controllers[1];
        // avg_perclos 0.1 pushes blink rate to the upper clamp.
        assert_eq!(with_history.baseline.blink_rate, 24.0);
        assert_eq!(without_history.baseline, baseline::DEFAULT_BASELINE);
    }

    #[test]
    fn baseline_readiness_defaults_and_clamps() {
        let mut row = roster_row(Some("ctl-01"), Some("SCT-1"));
        row.baseline_readiness = None;
        let plan = build_seed_plan(vec![row], vec![], vec![]);
        assert_eq!(plan.controllers[0].baseline_readiness, 0.85);

        let mut row = roster_row(Some("ctl-02"), Some("SCT-1"));
        row.baseline_readiness = Some(1.7);
        let plan = build_seed_plan(vec![row], vec![], vec![]);
        assert_eq!(plan.controllers[0].baseline_readiness, 0.99);
    }

    #[test]
    fn enum_fields_fall_back_when_unparseable() {
        let mut row = roster_row(Some("ctl-01"), Some("SCT-1"));
        row.gender = Some("unspecified".to_string());
        row.roster_role = Some("standby".to_string());
        let plan = build_seed_plan(vec![row], vec![], vec![]);
        assert_eq!(plan.controllers[0].gender, Gender::Other);
        assert_eq!(plan.controllers[0].roster_role, RosterRole::Primary);
    }

    #[test]
    fn seeding_is_guarded_by_existing_controllers() {
        assert!(should_seed(0));
        assert!(!should_seed(1));
        assert!(!should_seed(42));
    }

    #[test]
    fn sheet_rows_convert_with_field_level_coercion() {
        let sheet = SheetRow::from_pairs(&[
            ("record_id", "sh-9"),
            ("controller_id", "ctl-09"),
            ("shift_date", "2026-03-08"),
            ("sleep_hours_prior", "not recorded"),
            ("alerts_triggered", "2"),
        ]);
        let row = shift_row(&sheet);
        assert_eq!(row.record_id.as_deref(), Some("sh-9"));
        assert!(row.shift_date.is_some());
        assert_eq!(row.sleep_hours_prior, None);
        assert_eq!(row.alerts_triggered, Some(2));
    }
}
