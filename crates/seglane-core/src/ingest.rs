use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{
    model::{BinaryTrack, UnsignedTrack},
    segment::{Segment, SegmentError, SegmentIterExt, Value},
};

/// Capture channel: the column index in the value changes and the name given
/// to its track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub id: u32,
    pub name: String,
}

impl ChannelSpec {
    #[must_use]
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// # Errors
///
/// Rejects duplicate ids, duplicate names and ids above `max_channel_id`.
pub fn validate_channels(channels: &[ChannelSpec], max_channel_id: u32) -> Result<(), SegmentError> {
    let mut ids = HashSet::new();
    let mut names = HashSet::new();
    for channel in channels {
        if channel.id > max_channel_id {
            return Err(SegmentError::ChannelIdOutOfRange {
                id: channel.id,
                max: max_channel_id,
            });
        }
        if !ids.insert(channel.id) {
            return Err(SegmentError::DuplicateChannelId(channel.id));
        }
        if !names.insert(channel.name.as_str()) {
            return Err(SegmentError::DuplicateChannelName(channel.name.clone()));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueChange {
    pub timestamp: u64,
    pub values: Vec<Value>,
}

impl ValueChange {
    #[must_use]
    pub fn new(timestamp: u64, values: Vec<Value>) -> Self {
        Self { timestamp, values }
    }
}

/// Converts absolute-timestamp changes into segments; the final change is
/// held for one sample.
pub struct ValueChangeSegments<I> {
    changes: I,
    pending: Option<ValueChange>,
    failed: bool,
}

pub fn segments_from_value_changes<I>(changes: I) -> ValueChangeSegments<I::IntoIter>
where
    I: IntoIterator<Item = ValueChange>,
{
    let mut changes = changes.into_iter();
    let pending = changes.next();
    ValueChangeSegments {
        changes,
        pending,
        failed: false,
    }
}

impl<I: Iterator<Item = ValueChange>> Iterator for ValueChangeSegments<I> {
    type Item = Result<Segment, SegmentError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let current = self.pending.take()?;
        let Some(next) = self.changes.next() else {
            return Some(Ok(Segment::new(1, current.values)));
        };

        if next.timestamp < current.timestamp {
            self.failed = true;
            return Some(Err(SegmentError::NonMonotonicTimestamp {
                previous: current.timestamp,
                found: next.timestamp,
            }));
        }

        let duration = next.timestamp - current.timestamp;
        self.pending = Some(next);
        Some(Ok(Segment::new(duration, current.values)))
    }
}

impl UnsignedTrack {
    /// Builds a track from single-valued changes; repeated values are merged.
    ///
    /// # Errors
    ///
    /// Fails on decreasing timestamps or values that do not fit the track.
    pub fn from_value_changes<I>(
        name: impl Into<String>,
        timebase: u64,
        width: u32,
        changes: I,
    ) -> Result<Self, SegmentError>
    where
        I: IntoIterator<Item = ValueChange>,
    {
        let segments = segments_from_value_changes(changes).collect::<Result<Vec<_>, _>>()?;
        Self::from_segments(name, timebase, width, segments.into_iter().cleaned())
    }
}

fn binary_sample(value: Value) -> Result<u8, SegmentError> {
    match value {
        Value::Unsigned(0) => Ok(0),
        Value::Unsigned(1) => Ok(1),
        value => Err(SegmentError::NonBinaryValue(value)),
    }
}

struct ChannelState {
    initial: u8,
    value: u8,
    changed_at: u64,
    deltas: Vec<u64>,
}

impl ChannelState {
    /// A flip at the timestamp of the previous flip undoes it, so stored
    /// deltas stay positive.
    fn flip(&mut self, value: u8, timestamp: u64) {
        let interval = timestamp - self.changed_at;
        if interval > 0 {
            self.deltas.push(interval);
            self.changed_at = timestamp;
        } else if let Some(undone) = self.deltas.pop() {
            self.changed_at -= undone;
        } else {
            self.initial = value;
        }
        self.value = value;
    }
}

/// Splits multi-channel binary changes into one [`BinaryTrack`] per channel
/// in a single pass.
///
/// Each change carries the value of every channel, indexed by channel id. The
/// tracks start at the first timestamp and last until one sample past the
/// final timestamp.
///
/// # Errors
///
/// Fails on an empty change list, decreasing timestamps, changes missing a
/// channel column, or values other than 0 and 1.
#[instrument(skip(changes, channels), fields(channels = channels.len()))]
pub fn binary_tracks_from_value_changes<I>(
    changes: I,
    channels: &[ChannelSpec],
    timebase: u64,
) -> Result<Vec<BinaryTrack>, SegmentError>
where
    I: IntoIterator<Item = ValueChange>,
{
    let mut changes = changes.into_iter();
    let first = changes.next().ok_or(SegmentError::EmptyStream)?;
    let columns = channels
        .iter()
        .map(|channel| usize::try_from(channel.id).unwrap_or(usize::MAX))
        .collect::<Vec<_>>();
    let width = columns.iter().max().map_or(0, |max| max.saturating_add(1));

    let column_value = |change: &ValueChange, column: usize| {
        change
            .values
            .get(column)
            .copied()
            .ok_or(SegmentError::ArityMismatch {
                expected: width,
                found: change.values.len(),
            })
            .and_then(binary_sample)
    };

    let mut states = columns
        .iter()
        .map(|&column| -> Result<ChannelState, SegmentError> {
            let value = column_value(&first, column)?;
            Ok(ChannelState {
                initial: value,
                value,
                changed_at: first.timestamp,
                deltas: Vec::new(),
            })
        })
        .collect::<Result<Vec<_>, SegmentError>>()?;

    let mut last_timestamp = first.timestamp;
    let mut change_count = 1_usize;
    for change in changes {
        if change.timestamp < last_timestamp {
            return Err(SegmentError::NonMonotonicTimestamp {
                previous: last_timestamp,
                found: change.timestamp,
            });
        }
        for (state, &column) in states.iter_mut().zip(&columns) {
            let value = column_value(&change, column)?;
            if value != state.value {
                state.flip(value, change.timestamp);
            }
        }
        last_timestamp = change.timestamp;
        change_count += 1;
    }

    let duration = last_timestamp + 1 - first.timestamp;
    let tracks = channels
        .iter()
        .zip(states)
        .map(|(channel, state)| {
            BinaryTrack::from_deltas(
                channel.name.clone(),
                timebase,
                state.initial,
                state.deltas,
                Some(duration),
            )
        })
        .collect::<Vec<_>>();

    info!(changes = change_count, duration, "value changes ingested");
    Ok(tracks)
}
