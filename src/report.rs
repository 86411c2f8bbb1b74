use std::collections::HashMap;
use std::fmt::Write;

use chrono::NaiveDate;

use crate::insights;
use crate::models::{ControllerProfile, RosterRole, SectorRoster, ShiftRow};
use crate::summary;

/// Group roster controllers into per-sector primary/backup buckets, sectors
/// ordered by id, controllers kept in roster order.
pub fn group_sectors(controllers: &[ControllerProfile]) -> Vec<SectorRoster> {
    let mut order: Vec<String> = Vec::new();
    let mut map: HashMap<String, SectorRoster> = HashMap::new();

    for controller in controllers {
        let entry = map
            .entry(controller.sector_id.clone())
            .or_insert_with(|| {
                order.push(controller.sector_id.clone());
                SectorRoster {
                    sector_id: controller.sector_id.clone(),
                    sector_name: controller.sector_name.clone(),
                    primary: Vec::new(),
                    backup: Vec::new(),
                }
            });
        match controller.roster_role {
            RosterRole::Primary => entry.primary.push(controller.clone()),
            RosterRole::Backup => entry.backup.push(controller.clone()),
        }
    }

    let mut sectors: Vec<SectorRoster> = order
        .into_iter()
        .filter_map(|sector_id| map.remove(&sector_id))
        .collect();
    sectors.sort_by(|a, b| a.sector_id.cmp(&b.sector_id));
    sectors
}

pub fn build_report(
    scope: Option<&str>,
    generated: NaiveDate,
    controllers: &[ControllerProfile],
    shifts: &[ShiftRow],
) -> String {
    let sectors = group_sectors(controllers);
    let insight_lines = insights::build_insights(shifts);

    let mut output = String::new();
    let scope_label = scope.unwrap_or("all sectors");

    let _ = writeln!(output, "# Controller Fatigue Report");
    let _ = writeln!(output, "Generated for {scope_label} on {generated}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Sector Coverage");

    if sectors.is_empty() {
        let _ = writeln!(output, "No controllers on the roster.");
    } else {
        for sector in &sectors {
            let _ = writeln!(
                output,
                "- {} ({}): {} primary, {} backup",
                sector.sector_name,
                sector.sector_id,
                sector.primary.len(),
                sector.backup.len()
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Operational Insights");
    for line in &insight_lines {
        let _ = writeln!(output, "- {line}");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Shift Summaries");

    let summaries: Vec<_> = shifts
        .iter()
        .filter_map(summary::map_shift_summary)
        .take(5)
        .collect();
    if summaries.is_empty() {
        let _ = writeln!(output, "No summarizable shifts on record.");
    } else {
        for item in &summaries {
            let note = item
                .note
                .as_deref()
                .map(|n| format!(" ({n})"))
                .unwrap_or_default();
            let _ = writeln!(
                output,
                "- {} on {}: readiness {:.2}, peak fatigue {:.2}, post-shift delta {:+.2}{}",
                item.controller_id,
                item.shift_date,
                item.pre_shift_readiness,
                item.peak_fatigue,
                item.post_shift_delta,
                note
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BaselineFactors, Gender};

    fn profile(id: &str, sector: &str, role: RosterRole) -> ControllerProfile {
        ControllerProfile {
            controller_id: id.to_string(),
            name: format!("Controller {id}"),
            experience_years: None,
            birth_year: None,
            gender: Gender::Other,
            sector_id: sector.to_string(),
            sector_name: format!("Sector {sector}"),
            shift_group: "A".to_string(),
            roster_role: role,
            baseline_readiness: 0.85,
            baseline: BaselineFactors {
                blink_rate: 18.0,
                speech_rate: 122.0,
                response_delay: 0.95,
                tone_stability: 0.9,
            },
        }
    }

    #[test]
    fn sectors_bucket_by_roster_role() {
        let controllers = vec![
            profile("ctl-01", "SCT-2", RosterRole::Primary),
            profile("ctl-02", "SCT-1", RosterRole::Backup),
            profile("ctl-03", "SCT-2", RosterRole::Backup),
        ];
        let sectors = group_sectors(&controllers);
        assert_eq!(sectors.len(), 2);
        assert_eq!(sectors[0].sector_id, "SCT-1");
        assert_eq!(sectors[0].backup.len(), 1);
        assert!(sectors[0].primary.is_empty());
        assert_eq!(sectors[1].primary.len(), 1);
        assert_eq!(sectors[1].backup.len(), 1);
    }

    #[test]
    fn report_covers_roster_insights_and_summaries() {
        let controllers = vec![profile("ctl-01", "SCT-1", RosterRole::Primary)];
        let shifts = vec![ShiftRow {
            record_id: Some("sh-1".to_string()),
            controller_id: Some("ctl-01".to_string()),
            shift_date: NaiveDate::from_ymd_opt(2026, 3, 9),
            shift_type: Some("night".to_string()),
            peak_fatigue_score: Some(0.6),
            ..ShiftRow::default()
        }];
        let generated = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let report = build_report(Some("SCT-1"), generated, &controllers, &shifts);

        assert!(report.contains("# Controller Fatigue Report"));
        assert!(report.contains("Generated for SCT-1 on 2026-03-10"));
        assert!(report.contains("Sector SCT-1 (SCT-1): 1 primary, 0 backup"));
        assert!(report.contains("Only night shifts are on record"));
        assert!(report.contains("ctl-01 on 2026-03-09"));
    }
}
