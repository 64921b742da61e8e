use tracing::debug;

use crate::{
    model::Track,
    segment::{Segment, SegmentError, SegmentStream, Value},
};

struct MergeInput<'a> {
    stream: SegmentStream<'a>,
    arity: usize,
    values: Vec<Value>,
    hold_until: u64,
    active: bool,
}

fn next_nonempty(stream: &mut SegmentStream<'_>) -> Option<Segment> {
    stream.find(|segment| segment.duration > 0)
}

/// Merges several streams sharing one timebase into a stream of combined
/// value tuples.
///
/// A new segment starts wherever any input changes. Inputs that run out keep
/// contributing their last value until every input is exhausted; the output
/// then ends at the latest input end. Values of multi-valued inputs are
/// flattened into the output tuple in input order. Zero-length input segments
/// are skipped. Output may contain consecutive equal tuples.
///
/// Each input keeps the arity of its first segment. [`Combiner::try_next`]
/// reports a later change of arity as [`SegmentError::ArityMismatch`] and
/// ends the stream.
///
/// # Panics
///
/// Iterating with [`Iterator::next`] panics where `try_next` would return an
/// arity error.
pub struct Combiner<'a> {
    inputs: Vec<MergeInput<'a>>,
    last_emit_at: u64,
    started: bool,
    failed: bool,
}

impl<'a> Combiner<'a> {
    /// Pulls the first segment of every input.
    ///
    /// # Errors
    ///
    /// Fails when there are no inputs or when an input yields no segments.
    pub fn new<S>(streams: S) -> Result<Self, SegmentError>
    where
        S: IntoIterator<Item = SegmentStream<'a>>,
    {
        let mut inputs = Vec::new();
        for (index, mut stream) in streams.into_iter().enumerate() {
            let first = next_nonempty(&mut stream).ok_or(SegmentError::EmptyInput { index })?;
            inputs.push(MergeInput {
                stream,
                arity: first.arity(),
                values: first.values,
                hold_until: first.duration,
                active: true,
            });
        }

        if inputs.is_empty() {
            return Err(SegmentError::NoInputs);
        }

        debug!(inputs = inputs.len(), "combiner primed");
        Ok(Self {
            inputs,
            last_emit_at: 0,
            started: false,
            failed: false,
        })
    }

    /// Value count of every input, in input order.
    #[must_use]
    pub fn arities(&self) -> Vec<usize> {
        self.inputs.iter().map(|input| input.arity).collect()
    }

    /// Next combined segment, or the arity error of an input whose tuple
    /// length changed. Returns `None` after an error.
    pub fn try_next(&mut self) -> Option<Result<Segment, SegmentError>> {
        if self.failed {
            return None;
        }

        if !self.started {
            self.started = true;
            let until = self.next_boundary()?;
            return Some(Ok(self.emit_until(until)));
        }

        let time_at = self.last_emit_at;
        for input in self
            .inputs
            .iter_mut()
            .filter(|input| input.active && input.hold_until == time_at)
        {
            match next_nonempty(&mut input.stream) {
                Some(segment) if segment.arity() != input.arity => {
                    self.failed = true;
                    return Some(Err(SegmentError::ArityMismatch {
                        expected: input.arity,
                        found: segment.arity(),
                    }));
                }
                Some(segment) => {
                    input.hold_until = time_at + segment.duration;
                    input.values = segment.values;
                }
                None => input.active = false,
            }
        }

        let until = self.next_boundary()?;
        Some(Ok(self.emit_until(until)))
    }

    fn emit_until(&mut self, until: u64) -> Segment {
        let values = self
            .inputs
            .iter()
            .flat_map(|input| input.values.iter().copied())
            .collect();
        let segment = Segment::new(until - self.last_emit_at, values);
        self.last_emit_at = until;
        segment
    }

    fn next_boundary(&self) -> Option<u64> {
        self.inputs
            .iter()
            .filter(|input| input.active)
            .map(|input| input.hold_until)
            .min()
    }
}

impl Iterator for Combiner<'_> {
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        match self.try_next()? {
            Ok(segment) => Some(segment),
            Err(error) => panic!("combiner input changed shape: {error}"),
        }
    }
}

/// Combines the segment streams of several tracks.
///
/// # Errors
///
/// Fails with [`SegmentError::TimebaseMismatch`] when the tracks do not share
/// the first track's timebase, and as [`Combiner::new`] otherwise.
pub fn combine_tracks<'a, T>(tracks: &[&'a T]) -> Result<Combiner<'a>, SegmentError>
where
    T: Track + ?Sized,
{
    let Some(first) = tracks.first() else {
        return Err(SegmentError::NoInputs);
    };

    let expected = first.timebase();
    for (index, track) in tracks.iter().enumerate() {
        if track.timebase() != expected {
            return Err(SegmentError::TimebaseMismatch {
                index,
                expected,
                found: track.timebase(),
            });
        }
    }

    Combiner::new(tracks.iter().map(|&track| track.segments()))
}

/// Interprets each value tuple as the bits of one number, first value most
/// significant.
///
/// The result stays unsigned when every input value is unsigned and becomes a
/// float otherwise.
pub fn binary_decode<I>(inner: I) -> impl Iterator<Item = Segment>
where
    I: Iterator<Item = Segment>,
{
    inner.map(|segment| {
        let width = segment.values.len();
        let value = segment
            .values
            .iter()
            .enumerate()
            .fold(Value::Unsigned(0), |acc, (index, bit)| {
                let shift = u32::try_from(width - 1 - index).unwrap_or(u32::MAX);
                acc.weighted_add(*bit, 1_u64.checked_shl(shift).unwrap_or(0))
            });
        Segment::new(segment.duration, vec![value])
    })
}

/// Splits each single value into `width` bit values, most significant first.
///
/// Floats are truncated before splitting.
pub fn binary_encode<I>(inner: I, width: u32) -> impl Iterator<Item = Segment>
where
    I: Iterator<Item = Segment>,
{
    inner.map(move |segment| {
        let word = segment.value().map_or(0, Value::to_unsigned_lossy);
        let bits = (0..width)
            .rev()
            .map(|bit| Value::Unsigned(word.checked_shr(bit).unwrap_or(0) & 1))
            .collect();
        Segment::new(segment.duration, bits)
    })
}
