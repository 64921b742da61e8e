use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    model::Track,
    segment::{Segment, Value},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueStats {
    pub count: u64,
    pub duration: u64,
}

pub fn basic_statistics<I>(inner: I) -> BTreeMap<Vec<Value>, ValueStats>
where
    I: Iterator<Item = Segment>,
{
    let mut stats: BTreeMap<Vec<Value>, ValueStats> = BTreeMap::new();
    for segment in inner {
        let entry = stats.entry(segment.values).or_default();
        entry.count += 1;
        entry.duration += segment.duration;
    }
    stats
}

/// A mode of interest: the value tuple that represents it, a display label and
/// the weight applied to its share of time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeSpec {
    pub values: Vec<Value>,
    pub label: String,
    pub weight: f64,
}

impl ModeSpec {
    #[must_use]
    pub fn new(values: Vec<Value>, label: impl Into<String>, weight: f64) -> Self {
        Self {
            values,
            label: label.into(),
            weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeRow {
    pub label: String,
    pub values: Vec<Value>,
    pub time_share: f64,
    pub occurrences_per_second: f64,
    pub score: f64,
    pub score_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeReport {
    pub rows: Vec<ModeRow>,
    pub total_score: f64,
    pub duration_seconds: f64,
}

/// Scores how a track spends its time across `modes`.
///
/// Modes whose values never occur are left out of the report.
pub fn mode_report<T: Track + ?Sized>(track: &T, modes: &[ModeSpec]) -> ModeReport {
    let stats = basic_statistics(track.segments());
    let duration_seconds = track.duration_seconds();
    let duration_samples = track.duration();

    let mut rows: Vec<ModeRow> = modes
        .iter()
        .filter_map(|mode| {
            let value_stats = stats.get(&mode.values)?;
            let time_share = if duration_samples == 0 {
                0.0
            } else {
                value_stats.duration as f64 / duration_samples as f64
            };
            let occurrences_per_second = if duration_seconds > 0.0 {
                value_stats.count as f64 / duration_seconds
            } else {
                0.0
            };
            Some(ModeRow {
                label: mode.label.clone(),
                values: mode.values.clone(),
                time_share,
                occurrences_per_second,
                score: time_share * mode.weight,
                score_share: 0.0,
            })
        })
        .collect();

    let total_score: f64 = rows.iter().map(|row| row.score).sum();
    if total_score > 0.0 {
        for row in &mut rows {
            row.score_share = row.score / total_score;
        }
    }

    debug!(track = track.name(), rows = rows.len(), total_score, "mode report computed");
    ModeReport {
        rows,
        total_score,
        duration_seconds,
    }
}
