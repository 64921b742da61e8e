use serde::{Deserialize, Serialize};

use crate::segment::{Segment, SegmentIterExt, Value};

/// Occurrence of a matched value tuple.
///
/// `delta` is measured from the start of the previous event, or from the
/// stream start for the first one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub delta: u64,
    pub duration: u64,
}

pub fn as_events<I>(inner: I, values: Vec<Value>) -> impl Iterator<Item = Event>
where
    I: Iterator<Item = Segment>,
{
    let mut position = 0_u64;
    let mut last_start = 0_u64;
    inner.filter_map(move |segment| {
        let start = position;
        position += segment.duration;
        if segment.values != values {
            return None;
        }

        let delta = start - last_start;
        last_start = start;
        Some(Event {
            delta,
            duration: segment.duration,
        })
    })
}

/// Run-length encodes dense per-sample values; every run length is multiplied
/// by `time_scaler`.
pub fn segments_from_samples<S>(samples: S, time_scaler: u64) -> impl Iterator<Item = Segment>
where
    S: IntoIterator,
    S::Item: Into<Value>,
{
    samples
        .into_iter()
        .map(|sample| Segment::new(1, vec![sample.into()]))
        .cleaned()
        .map(move |segment| {
            let duration = segment.duration.saturating_mul(time_scaler);
            segment.with_duration(duration)
        })
}
