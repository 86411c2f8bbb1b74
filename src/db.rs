use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::ingest::{self, SeedPlan};
use crate::models::{
    BaselineFactors, ControllerProfile, Gender, RosterRole, SampleRow, ShiftRow, SupervisorAction,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Apply one seeding pass atomically. Returns false without touching the
/// store when controllers already exist; the guard shares the transaction
/// with the inserts so concurrent seeders serialize on the store.
pub async fn apply_seed_plan(pool: &PgPool, plan: &SeedPlan) -> anyhow::Result<bool> {
    let mut tx = pool.begin().await?;

    let existing: i64 = sqlx::query("SELECT COUNT(*) AS n FROM fatigue_watch.controllers")
        .fetch_one(&mut *tx)
        .await?
        .get("n");
    if !ingest::should_seed(existing) {
        tx.rollback().await?;
        return Ok(false);
    }

    for controller in &plan.controllers {
        sqlx::query(
            r#"
            INSERT INTO fatigue_watch.controllers
            (controller_id, name, experience_years, birth_year, gender,
             sector_id, sector_name, shift_group, roster_role,
             baseline_readiness, blink_rate, speech_rate, response_delay, tone_stability)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (controller_id) DO NOTHING
            "#,
        )
        .bind(&controller.controller_id)
        .bind(&controller.name)
        .bind(controller.experience_years)
        .bind(controller.birth_year)
        .bind(controller.gender.as_str())
        .bind(&controller.sector_id)
        .bind(&controller.sector_name)
        .bind(&controller.shift_group)
        .bind(controller.roster_role.as_str())
        .bind(controller.baseline_readiness)
        .bind(controller.baseline.blink_rate)
        .bind(controller.baseline.speech_rate)
        .bind(controller.baseline.response_delay)
        .bind(controller.baseline.tone_stability)
        .execute(&mut *tx)
        .await?;
    }

    for shift in &plan.shifts {
        sqlx::query(
            r#"
            INSERT INTO fatigue_watch.shift_history
            (record_id, controller_id, shift_date, shift_type, sleep_hours_prior,
             consecutive_work_days, max_fatigue_level, peak_fatigue_score,
             avg_perclos, avg_fom, pre_shift_reaction, post_shift_reaction,
             reaction_delta, fatigue_category, prediction_score, alerts_triggered)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (record_id) DO NOTHING
            "#,
        )
        .bind(shift.record_id.as_deref())
        .bind(shift.controller_id.as_deref())
        .bind(shift.shift_date)
        .bind(shift.shift_type.as_deref())
        .bind(shift.sleep_hours_prior)
        .bind(shift.consecutive_work_days)
        .bind(shift.max_fatigue_level)
        .bind(shift.peak_fatigue_score)
        .bind(shift.avg_perclos)
        .bind(shift.avg_fom)
        .bind(shift.pre_shift_reaction)
        .bind(shift.post_shift_reaction)
        .bind(shift.reaction_delta)
        .bind(shift.fatigue_category.as_deref())
        .bind(shift.prediction_score)
        .bind(shift.alerts_triggered)
        .execute(&mut *tx)
        .await?;
    }

    for sample in &plan.samples {
        sqlx::query(
            r#"
            INSERT INTO fatigue_watch.live_samples
            (sample_id, controller_id, shift_record_id, sector_id, shift_date,
             shift_type, sample_block, perclos, fom, reaction_time,
             fatigue_score, sleep_hours_prior, consecutive_work_days)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (sample_id) DO NOTHING
            "#,
        )
        .bind(sample.sample_id.as_deref())
        .bind(sample.controller_id.as_deref())
        .bind(sample.shift_record_id.as_deref())
        .bind(sample.sector_id.as_deref())
        .bind(sample.shift_date)
        .bind(sample.shift_type.as_deref())
        .bind(sample.sample_block.as_deref())
        .bind(sample.perclos)
        .bind(sample.fom)
        .bind(sample.reaction_time)
        .bind(sample.fatigue_score)
        .bind(sample.sleep_hours_prior)
        .bind(sample.consecutive_work_days)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(true)
}

/// Manual roster add or correction outside the one-time seed.
pub async fn upsert_controller(
    pool: &PgPool,
    controller: &ControllerProfile,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO fatigue_watch.controllers
        (controller_id, name, experience_years, birth_year, gender,
         sector_id, sector_name, shift_group, roster_role,
         baseline_readiness, blink_rate, speech_rate, response_delay, tone_stability)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        ON CONFLICT (controller_id) DO UPDATE
        SET name = EXCLUDED.name,
            experience_years = EXCLUDED.experience_years,
            birth_year = EXCLUDED.birth_year,
            gender = EXCLUDED.gender,
            sector_id = EXCLUDED.sector_id,
            sector_name = EXCLUDED.sector_name,
            shift_group = EXCLUDED.shift_group,
            roster_role = EXCLUDED.roster_role,
            baseline_readiness = EXCLUDED.baseline_readiness
        "#,
    )
    .bind(&controller.controller_id)
    .bind(&controller.name)
    .bind(controller.experience_years)
    .bind(controller.birth_year)
    .bind(controller.gender.as_str())
    .bind(&controller.sector_id)
    .bind(&controller.sector_name)
    .bind(&controller.shift_group)
    .bind(controller.roster_role.as_str())
    .bind(controller.baseline_readiness)
    .bind(controller.baseline.blink_rate)
    .bind(controller.baseline.speech_rate)
    .bind(controller.baseline.response_delay)
    .bind(controller.baseline.tone_stability)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch_controllers(
    pool: &PgPool,
    sector: Option<&str>,
) -> anyhow::Result<Vec<ControllerProfile>> {
    let mut query = String::from(
        "SELECT controller_id, name, experience_years, birth_year, gender, \
         sector_id, sector_name, shift_group, roster_role, baseline_readiness, \
         blink_rate, speech_rate, response_delay, tone_stability \
         FROM fatigue_watch.controllers",
    );
    if sector.is_some() {
        query.push_str(" WHERE sector_id = $1");
    }
    query.push_str(" ORDER BY controller_id");

    let mut rows = sqlx::query(&query);
    if let Some(value) = sector {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    Ok(records.iter().map(controller_from_row).collect())
}

pub async fn fetch_controller(
    pool: &PgPool,
    controller_id: &str,
) -> anyhow::Result<Option<ControllerProfile>> {
    let record = sqlx::query(
        "SELECT controller_id, name, experience_years, birth_year, gender, \
         sector_id, sector_name, shift_group, roster_role, baseline_readiness, \
         blink_rate, speech_rate, response_delay, tone_stability \
         FROM fatigue_watch.controllers WHERE controller_id = $1",
    )
    .bind(controller_id)
    .fetch_optional(pool)
    .await?;

    Ok(record.as_ref().map(controller_from_row))
}

/// Shift-history rows, most recent first, optionally scoped to one sector
/// (via the roster) or one controller.
pub async fn fetch_shift_rows(
    pool: &PgPool,
    sector: Option<&str>,
    controller: Option<&str>,
) -> anyhow::Result<Vec<ShiftRow>> {
    let mut query = String::from(
        "SELECT s.record_id, s.controller_id, s.shift_date, s.shift_type, \
         s.sleep_hours_prior, s.consecutive_work_days, s.max_fatigue_level, \
         s.peak_fatigue_score, s.avg_perclos, s.avg_fom, s.pre_shift_reaction, \
         s.post_shift_reaction, s.reaction_delta, s.fatigue_category, \
         s.prediction_score, s.alerts_triggered \
         FROM fatigue_watch.shift_history s",
    );
    if sector.is_some() {
        query.push_str(
            " JOIN fatigue_watch.controllers c ON c.controller_id = s.controller_id \
             WHERE c.sector_id = $1",
        );
    } else if controller.is_some() {
        query.push_str(" WHERE s.controller_id = $1");
    }
    query.push_str(" ORDER BY s.shift_date DESC NULLS LAST, s.record_id");

    let mut rows = sqlx::query(&query);
    if let Some(value) = sector {
        rows = rows.bind(value);
    } else if let Some(value) = controller {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    Ok(records.iter().map(shift_from_row).collect())
}

/// Live samples in insertion order, which frame grouping relies on.
pub async fn fetch_sample_rows(pool: &PgPool) -> anyhow::Result<Vec<SampleRow>> {
    let records = sqlx::query(
        "SELECT sample_id, controller_id, shift_record_id, sector_id, shift_date, \
         shift_type, sample_block, perclos, fom, reaction_time, fatigue_score, \
         sleep_hours_prior, consecutive_work_days \
         FROM fatigue_watch.live_samples ORDER BY seq",
    )
    .fetch_all(pool)
    .await?;

    Ok(records.iter().map(sample_from_row).collect())
}

pub async fn fetch_actions(
    pool: &PgPool,
    controller: Option<&str>,
    limit: i64,
) -> anyhow::Result<Vec<SupervisorAction>> {
    let mut query = String::from(
        "SELECT id, controller_id, kind, message, created_at \
         FROM fatigue_watch.supervisor_actions",
    );
    if controller.is_some() {
        query.push_str(" WHERE controller_id = $1 ORDER BY created_at DESC LIMIT $2");
    } else {
        query.push_str(" ORDER BY created_at DESC LIMIT $1");
    }

    let mut rows = sqlx::query(&query);
    if let Some(value) = controller {
        rows = rows.bind(value);
    }
    rows = rows.bind(limit);

    let records = rows.fetch_all(pool).await?;
    Ok(records
        .iter()
        .map(|row| SupervisorAction {
            id: row.get("id"),
            controller_id: row.get("controller_id"),
            kind: row.get("kind"),
            message: row.get("message"),
            created_at: row.get::<DateTime<Utc>, _>("created_at"),
        })
        .collect())
}

pub async fn insert_action(
    pool: &PgPool,
    controller_id: &str,
    kind: &str,
    message: &str,
) -> anyhow::Result<SupervisorAction> {
    let action = SupervisorAction {
        id: Uuid::new_v4(),
        controller_id: controller_id.to_string(),
        kind: kind.to_string(),
        message: message.to_string(),
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO fatigue_watch.supervisor_actions
        (id, controller_id, kind, message, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(action.id)
    .bind(&action.controller_id)
    .bind(&action.kind)
    .bind(&action.message)
    .bind(action.created_at)
    .execute(pool)
    .await?;

    Ok(action)
}

fn controller_from_row(row: &PgRow) -> ControllerProfile {
    ControllerProfile {
        controller_id: row.get("controller_id"),
        name: row.get("name"),
        experience_years: row.get("experience_years"),
        birth_year: row.get("birth_year"),
        gender: Gender::parse(Some(row.get::<String, _>("gender").as_str())),
        sector_id: row.get("sector_id"),
        sector_name: row.get("sector_name"),
        shift_group: row.get("shift_group"),
        roster_role: RosterRole::parse(Some(row.get::<String, _>("roster_role").as_str())),
        baseline_readiness: row.get("baseline_readiness"),
        baseline: BaselineFactors {
            blink_rate: row.get("blink_rate"),
            speech_rate: row.get("speech_rate"),
            response_delay: row.get("response_delay"),
            tone_stability: row.get("tone_stability"),
        },
    }
}

fn shift_from_row(row: &PgRow) -> ShiftRow {
    ShiftRow {
        record_id: Some(row.get("record_id")),
        controller_id: Some(row.get("controller_id")),
        shift_date: row.get::<Option<NaiveDate>, _>("shift_date"),
        shift_type: row.get("shift_type"),
        sleep_hours_prior: row.get("sleep_hours_prior"),
        consecutive_work_days: row.get("consecutive_work_days"),
        max_fatigue_level: row.get("max_fatigue_level"),
        peak_fatigue_score: row.get("peak_fatigue_score"),
        avg_perclos: row.get("avg_perclos"),
        avg_fom: row.get("avg_fom"),
        pre_shift_reaction: row.get("pre_shift_reaction"),
        post_shift_reaction: row.get("post_shift_reaction"),
        reaction_delta: row.get("reaction_delta"),
        fatigue_category: row.get("fatigue_category"),
        prediction_score: row.get("prediction_score"),
        alerts_triggered: row.get("alerts_triggered"),
    }
}

fn sample_from_row(row: &PgRow) -> SampleRow {
    SampleRow {
        sample_id: Some(row.get("sample_id")),
        controller_id: Some(row.get("controller_id")),
        shift_record_id: row.get("shift_record_id"),
        sector_id: row.get("sector_id"),
        shift_date: row.get::<Option<NaiveDate>, _>("shift_date"),
        shift_type: row.get("shift_type"),
        sample_block: row.get("sample_block"),
        perclos: row.get("perclos"),
        fom: row.get("fom"),
        reaction_time: row.get("reaction_time"),
        fatigue_score: row.get("fatigue_score"),
        sleep_hours_prior: row.get("sleep_hours_prior"),
        consecutive_work_days: row.get("consecutive_work_days"),
    }
}
