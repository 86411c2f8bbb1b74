use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{
    round2, ControllerProfile, FactorReading, FatigueSnapshot, FatigueStatus, SampleBlock,
    SampleRow, SnapshotFrame, Trend,
};
use crate::snapshot;

/// Partition live samples into replay frames keyed by shift date and
/// lowercased sample block. Frames come back ordered by parsed shift date
/// ascending (undated frames last), tie-broken by block rank; snapshots keep
/// their within-frame insertion order.
pub fn build_frames(
    samples: &[SampleRow],
    controllers: &[ControllerProfile],
) -> Vec<SnapshotFrame> {
    if samples.is_empty() {
        return vec![baseline_frame(controllers)];
    }

    let mut order: Vec<(Option<NaiveDate>, String)> = Vec::new();
    let mut groups: HashMap<(Option<NaiveDate>, String), Vec<FatigueSnapshot>> = HashMap::new();

    for row in samples {
        let Some(snap) = snapshot::map_snapshot(row) else {
            continue;
        };
        let block = row
            .sample_block
            .as_deref()
            .unwrap_or("")
            .trim()
            .to_lowercase();
        let key = (row.shift_date, block);
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(snap);
    }

    let mut frames: Vec<SnapshotFrame> = order
        .into_iter()
        .map(|key| {
            let snapshots = groups.remove(&key).unwrap_or_default();
            SnapshotFrame {
                shift_date: key.0,
                sample_block: key.1,
                snapshots,
            }
        })
        .collect();

    frames.sort_by_key(|frame| {
        (
            frame.shift_date.is_none(),
            frame.shift_date,
            block_rank(&frame.sample_block),
        )
    });
    frames
}

fn block_rank(block: &str) -> u8 {
    SampleBlock::parse(block).map(SampleBlock::rank).unwrap_or(3)
}

/// With no live samples on record, replay still shows one frame built from
/// every controller's baseline.
fn baseline_frame(controllers: &[ControllerProfile]) -> SnapshotFrame {
    let snapshots = controllers
        .iter()
        .map(|controller| {
            let readiness = controller.baseline_readiness;
            let score = round2((1.0 - readiness).clamp(0.0, 1.0));
            FatigueSnapshot {
                controller_id: controller.controller_id.clone(),
                sector_id: Some(controller.sector_id.clone()),
                timestamp: snapshot::synthesize_timestamp(None, None, None),
                fatigue_score: score,
                readiness_level: readiness,
                status: FatigueStatus::Normal,
                factors: baseline_factors(controller),
                recommendation: "Maintain the standard scan cadence through the start block."
                    .to_string(),
            }
        })
        .collect();

    SnapshotFrame {
        shift_date: None,
        sample_block: "start".to_string(),
        snapshots,
    }
}

fn baseline_factors(controller: &ControllerProfile) -> Vec<FactorReading> {
    let b = &controller.baseline;
    [
        ("Blink rate", format!("{:.0} blinks/min", b.blink_rate)),
        ("Speech rate", format!("{:.0} wpm", b.speech_rate)),
        ("Response delay", format!("{:.2}s", b.response_delay)),
        ("Tone stability", format!("{:.2}", b.tone_stability)),
    ]
    .into_iter()
    .map(|(label, value)| FactorReading {
        label: label.to_string(),
        value,
        trend: Trend::Steady,
    })
    .collect()
}

/// Replay position over a frame list, owned by the caller. Advancing wraps
/// around so the frame cycle repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameCursor {
    index: usize,
    frame_count: usize,
}

impl FrameCursor {
    pub fn new(frame_count: usize) -> Self {
        FrameCursor {
            index: 0,
            frame_count,
        }
    }

    pub fn current(&self) -> Option<usize> {
        (self.frame_count > 0).then_some(self.index)
    }

    pub fn advance(&mut self) -> Option<usize> {
        if self.frame_count == 0 {
            return None;
        }
        self.index = (self.index + 1) % self.frame_count;
        Some(self.index)
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BaselineFactors, Gender, RosterRole};

    fn sample(
        id: &str,
        date: Option<&str>,
        block: Option<&str>,
        score: f64,
    ) -> SampleRow {
        SampleRow {
            sample_id: Some(id.to_string()),
            controller_id: Some("ctl-04".to_string()),
            shift_date: date.and_then(|d| d.parse().ok()),
            sample_block: block.map(String::from),
            fatigue_score: Some(score),
            ..SampleRow::default()
        }
    }

    fn profile(id: &str, readiness: f64) -> ControllerProfile {
        ControllerProfile {
            controller_id: id.to_string(),
            name: "Imani Okafor".to_string(),
            experience_years: Some(7),
            birth_year: Some(1991),
            gender: Gender::Female,
            sector_id: "SCT-1".to_string(),
            sector_name: "North Approach".to_string(),
            shift_group: "A".to_string(),
            roster_role: RosterRole::Primary,
            baseline_readiness: readiness,
            baseline: BaselineFactors {
                blink_rate: 18.0,
                speech_rate: 122.0,
                response_delay: 0.95,
                tone_stability: 0.9,
            },
        }
    }

    #[test]
    fn frames_sort_by_date_then_block_rank() {
        let samples = vec![
            sample("a", Some("2026-03-11"), Some("End"), 0.2),
            sample("b", Some("2026-03-10"), Some("middle"), 0.3),
            sample("c", Some("2026-03-11"), Some("start"), 0.4),
            sample("d", Some("2026-03-10"), Some("start"), 0.5),
        ];
        let frames = build_frames(&samples, &[]);
        let keys: Vec<(Option<NaiveDate>, &str)> = frames
            .iter()
            .map(|f| (f.shift_date, f.sample_block.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("2026-03-10".parse().ok(), "start"),
                ("2026-03-10".parse().ok(), "middle"),
                ("2026-03-11".parse().ok(), "start"),
                ("2026-03-11".parse().ok(), "end"),
            ]
        );
    }

    #[test]
    fn within_frame_insertion_order_is_preserved() {
        let mut first = sample("a", Some("2026-03-10"), Some("start"), 0.3);
        first.controller_id = Some("ctl-10".to_string());
        let mut second = sample("b", Some("2026-03-10"), Some("start"), 0.4);
        second.controller_id = Some("ctl-11".to_string());

        let frames = build_frames(&[first, second], &[]);
        assert_eq!(frames.len(), 1);
        let ids: Vec<&str> = frames[0]
            .snapshots
            .iter()
            .map(|s| s.controller_id.as_str())
            .collect();
        assert_eq!(ids, vec!["ctl-10", "ctl-11"]);
    }

    #[test]
    fn unrecognized_blocks_and_undated_frames_sort_last() {
        let samples = vec![
            sample("a", None, Some("start"), 0.2),
            sample("b", Some("2026-03-10"), Some("handover"), 0.3),
            sample("c", Some("2026-03-10"), Some("end"), 0.4),
        ];
        let frames = build_frames(&samples, &[]);
        let keys: Vec<(Option<NaiveDate>, &str)> = frames
            .iter()
            .map(|f| (f.shift_date, f.sample_block.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("2026-03-10".parse().ok(), "end"),
                ("2026-03-10".parse().ok(), "handover"),
                (None, "start"),
            ]
        );
    }

    #[test]
    fn no_samples_yields_a_single_baseline_frame() {
        let controllers = vec![profile("ctl-20", 0.9), profile("ctl-21", 0.6)];
        let frames = build_frames(&[], &controllers);
        assert_eq!(frames.len(), 1);
        let frame = &frames[0];
        assert_eq!(frame.snapshots.len(), 2);
        assert_eq!(frame.snapshots[0].readiness_level, 0.9);
        assert_eq!(frame.snapshots[0].fatigue_score, 0.1);
        assert_eq!(frame.snapshots[1].fatigue_score, 0.4);
        assert!(frame
            .snapshots
            .iter()
            .all(|s| s.status == FatigueStatus::Normal));
    }

    #[test]
    fn cursor_wraps_and_resets() {
        let mut cursor = FrameCursor::new(3);
        assert_eq!(cursor.current(), Some(0));
        assert_eq!(cursor.advance(), Some(1));
        assert_eq!(cursor.advance(), Some(2));
        assert_eq!(cursor.advance(), Some(0));
        cursor.advance();
        cursor.reset();
        assert_eq!(cursor.current(), Some(0));
    }

    #[test]
    fn empty_cursor_has_no_position() {
        let mut cursor = FrameCursor::new(0);
        assert_eq!(cursor.current(), None);
        assert_eq!(cursor.advance(), None);
    }
}
