use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    events::{Event, as_events},
    segment::{Segment, SegmentError, SegmentIterExt, SegmentStream, Substitute, Value},
    time::{ScaleFactor, samples_to_seconds, seconds_to_samples},
};

pub const DEFAULT_UNSIGNED_WIDTH: u32 = 8;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackInfo {
    pub name: String,
    /// Samples per second.
    pub timebase: u64,
    /// Length in samples.
    pub duration: u64,
}

impl TrackInfo {
    #[must_use]
    pub fn new(name: impl Into<String>, timebase: u64, duration: u64) -> Self {
        Self {
            name: name.into(),
            timebase,
            duration,
        }
    }
}

/// Named, timebased storage of one single-valued segment stream.
///
/// `segments` may be iterated any number of times. `set_segments` replaces
/// the stored data and recomputes the duration; on error the track is left
/// unchanged.
pub trait Track {
    fn info(&self) -> &TrackInfo;

    fn info_mut(&mut self) -> &mut TrackInfo;

    fn segments(&self) -> SegmentStream<'_>;

    /// # Errors
    ///
    /// Fails when the stream does not fit the storage of the track kind.
    fn set_segments(&mut self, segments: SegmentStream<'_>) -> Result<(), SegmentError>;

    fn name(&self) -> &str {
        &self.info().name
    }

    fn timebase(&self) -> u64 {
        self.info().timebase
    }

    fn duration(&self) -> u64 {
        self.info().duration
    }

    fn duration_seconds(&self) -> f64 {
        samples_to_seconds(self.duration(), self.timebase())
    }

    fn seconds_to_samples(&self, seconds: f64) -> u64 {
        seconds_to_samples(seconds, self.timebase())
    }

    /// Resolves a requested region into absolute sample positions.
    ///
    /// `end_at` defaults to the track duration; negative values count back
    /// from the end. Returns `None` unless `start_at < end_at <= duration`.
    fn absolute_clip_region(&self, start_at: u64, end_at: Option<i64>) -> Option<(u64, u64)> {
        let duration = self.duration();
        let end_at = match end_at {
            None => duration,
            Some(end_at) if end_at < 0 => duration.checked_sub(end_at.unsigned_abs())?,
            Some(end_at) => u64::try_from(end_at).ok()?,
        };

        (start_at < end_at && end_at <= duration).then_some((start_at, end_at))
    }

    /// Keeps only the given region. Returns `Ok(false)` and leaves the track
    /// untouched when the region is invalid.
    ///
    /// # Errors
    ///
    /// Propagates [`Track::set_segments`] failures.
    fn crop(&mut self, start_at: u64, end_at: Option<i64>) -> Result<bool, SegmentError> {
        let Some((start_at, end_at)) = self.absolute_clip_region(start_at, end_at) else {
            return Ok(false);
        };

        let cropped: Vec<Segment> = self.segments().region(start_at, end_at).collect();
        self.set_segments(cropped.into_iter().boxed())?;
        debug!(track = self.name(), start_at, end_at, "track cropped");
        Ok(true)
    }

    /// Rescales all durations to `new_timebase`, rounded to whole samples per
    /// second.
    ///
    /// # Errors
    ///
    /// Fails on a zero timebase or when the rescaled data no longer fits the
    /// track.
    fn set_timebase(&mut self, new_timebase: f64) -> Result<(), SegmentError> {
        let new_timebase = seconds_to_samples(new_timebase, 1);
        let factor = ScaleFactor::from_timebases(self.timebase(), new_timebase)?;
        let scaled: Vec<Segment> = self.segments().scaled(factor).collect();
        self.set_segments(scaled.into_iter().boxed())?;
        self.info_mut().timebase = new_timebase;
        debug!(track = self.name(), new_timebase, %factor, "track timebase changed");
        Ok(())
    }

    fn as_events(&self, values: Vec<Value>) -> Vec<Event> {
        as_events(self.segments(), values).collect()
    }
}

fn binary_value(segment: &Segment) -> Result<u8, SegmentError> {
    match segment.single_value()? {
        Value::Unsigned(0) => Ok(0),
        Value::Unsigned(1) => Ok(1),
        value => Err(SegmentError::NonBinaryValue(value)),
    }
}

/// Two-state track stored as an initial value plus the durations between
/// flips.
///
/// When `duration` exceeds the sum of the flip deltas, the final value is held
/// up to `duration`; a shorter duration cuts the stream off.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BinaryTrack {
    info: TrackInfo,
    initial: u8,
    deltas: Vec<u64>,
}

impl BinaryTrack {
    #[must_use]
    pub fn new(name: impl Into<String>, timebase: u64) -> Self {
        Self::from_deltas(name, timebase, 0, Vec::new(), None)
    }

    /// `duration` defaults to the delta sum plus one so that the final flip is
    /// visible for one sample. Non-zero `initial` values are treated as 1.
    #[must_use]
    pub fn from_deltas(
        name: impl Into<String>,
        timebase: u64,
        initial: u8,
        deltas: Vec<u64>,
        duration: Option<u64>,
    ) -> Self {
        let duration = duration.unwrap_or_else(|| deltas.iter().sum::<u64>() + 1);
        Self {
            info: TrackInfo::new(name, timebase, duration),
            initial: u8::from(initial != 0),
            deltas,
        }
    }

    /// # Errors
    ///
    /// Fails as [`Track::set_segments`] does.
    pub fn from_segments<I>(
        name: impl Into<String>,
        timebase: u64,
        segments: I,
    ) -> Result<Self, SegmentError>
    where
        I: IntoIterator<Item = Segment>,
    {
        let mut track = Self::new(name, timebase);
        track.set_segments(segments.into_iter().boxed())?;
        Ok(track)
    }

    #[must_use]
    pub fn initial(&self) -> u8 {
        self.initial
    }

    #[must_use]
    pub fn deltas(&self) -> &[u64] {
        &self.deltas
    }

    #[must_use]
    pub fn transitions(&self) -> usize {
        self.deltas.len()
    }

    /// Segments are held or clipped to end at `duration`.
    pub fn set_duration(&mut self, duration: u64) {
        self.info.duration = duration;
    }

    #[must_use]
    pub fn value_after(&self, flips: usize) -> u8 {
        self.initial ^ u8::from(flips % 2 == 1)
    }

    /// Copy with the opposite initial value, named with an `n` prefix.
    #[must_use]
    pub fn inverted(&self) -> Self {
        Self {
            info: TrackInfo::new(
                format!("n{}", self.info.name),
                self.info.timebase,
                self.info.duration,
            ),
            initial: self.initial ^ 1,
            deltas: self.deltas.clone(),
        }
    }
}

impl Track for BinaryTrack {
    fn info(&self) -> &TrackInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut TrackInfo {
        &mut self.info
    }

    fn segments(&self) -> SegmentStream<'_> {
        let covered: u64 = self.deltas.iter().sum();
        let tail = (self.info.duration > covered).then(|| {
            Segment::unsigned(
                self.info.duration - covered,
                u64::from(self.value_after(self.deltas.len())),
            )
        });

        self.deltas
            .iter()
            .enumerate()
            .map(|(flips, &delta)| Segment::unsigned(delta, u64::from(self.value_after(flips))))
            .chain(tail)
            .region(0, self.info.duration)
            .boxed()
    }

    #[instrument(skip(self, segments), fields(track = %self.info.name))]
    fn set_segments(&mut self, segments: SegmentStream<'_>) -> Result<(), SegmentError> {
        let mut runs = segments.filter(|segment| segment.duration > 0).cleaned();
        let first = runs.next().ok_or(SegmentError::EmptyStream)?;
        let initial = binary_value(&first)?;

        let mut deltas = Vec::new();
        let mut pending = first.duration;
        let mut duration = first.duration;
        for run in runs {
            binary_value(&run)?;
            deltas.push(pending);
            pending = run.duration;
            duration += run.duration;
        }

        self.initial = initial;
        self.deltas = deltas;
        self.info.duration = duration;
        debug!(transitions = self.deltas.len(), duration, "binary track replaced");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum UnsignedVcdRepr {
    #[default]
    BitVector,
    Real,
}

/// Track of unsigned values of a fixed bit width, stored as parallel
/// duration and value lists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnsignedTrack {
    info: TrackInfo,
    width: u32,
    deltas: Vec<u64>,
    values: Vec<u64>,
    hi_z: Option<u64>,
    vcd_repr: UnsignedVcdRepr,
}

impl UnsignedTrack {
    #[must_use]
    pub fn new(name: impl Into<String>, timebase: u64, width: u32) -> Self {
        Self {
            info: TrackInfo::new(name, timebase, 0),
            width,
            deltas: Vec::new(),
            values: Vec::new(),
            hi_z: None,
            vcd_repr: UnsignedVcdRepr::default(),
        }
    }

    /// # Errors
    ///
    /// Fails as [`Track::set_segments`] does.
    pub fn from_segments<I>(
        name: impl Into<String>,
        timebase: u64,
        width: u32,
        segments: I,
    ) -> Result<Self, SegmentError>
    where
        I: IntoIterator<Item = Segment>,
    {
        let mut track = Self::new(name, timebase, width);
        track.set_segments(segments.into_iter().boxed())?;
        Ok(track)
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn transitions(&self) -> usize {
        self.values.len()
    }

    /// Value rendered as high impedance in VCD output.
    #[must_use]
    pub fn hi_z(&self) -> Option<u64> {
        self.hi_z
    }

    pub fn set_hi_z(&mut self, hi_z: Option<u64>) {
        self.hi_z = hi_z;
    }

    #[must_use]
    pub fn vcd_repr(&self) -> UnsignedVcdRepr {
        self.vcd_repr
    }

    pub fn set_vcd_repr(&mut self, vcd_repr: UnsignedVcdRepr) {
        self.vcd_repr = vcd_repr;
    }

    /// Segments are held or clipped to end at `duration`.
    pub fn set_duration(&mut self, duration: u64) {
        self.info.duration = duration;
    }

    fn check_width(&self, value: u64) -> Result<u64, SegmentError> {
        if self.width < u64::BITS && value >> self.width != 0 {
            return Err(SegmentError::ValueTooWide {
                value,
                width: self.width,
            });
        }
        Ok(value)
    }
}

impl Track for UnsignedTrack {
    fn info(&self) -> &TrackInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut TrackInfo {
        &mut self.info
    }

    fn segments(&self) -> SegmentStream<'_> {
        let covered: u64 = self.deltas.iter().sum();
        let held = self.values.last().copied().or(self.hi_z).unwrap_or(0);
        let tail = (self.info.duration > covered)
            .then(|| Segment::unsigned(self.info.duration - covered, held));

        self.deltas
            .iter()
            .zip(&self.values)
            .map(|(&delta, &value)| Segment::unsigned(delta, value))
            .chain(tail)
            .region(0, self.info.duration)
            .boxed()
    }

    #[instrument(skip(self, segments), fields(track = %self.info.name, width = self.width))]
    fn set_segments(&mut self, segments: SegmentStream<'_>) -> Result<(), SegmentError> {
        let mut deltas = Vec::new();
        let mut values = Vec::new();
        for segment in segments {
            let value = match segment.single_value()? {
                Value::Unsigned(value) => self.check_width(value)?,
                value => return Err(SegmentError::NonUnsignedValue(value)),
            };
            deltas.push(segment.duration);
            values.push(value);
        }

        self.info.duration = deltas.iter().sum();
        self.deltas = deltas;
        self.values = values;
        debug!(
            transitions = self.values.len(),
            duration = self.info.duration,
            "unsigned track replaced"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContinuousTrack {
    info: TrackInfo,
    samples: Vec<Value>,
}

pub type FloatTrack = ContinuousTrack;

impl ContinuousTrack {
    #[must_use]
    pub fn new(name: impl Into<String>, timebase: u64, samples: Vec<Value>) -> Self {
        let duration = samples.len() as u64;
        Self {
            info: TrackInfo::new(name, timebase, duration),
            samples,
        }
    }

    #[must_use]
    pub fn from_floats(
        name: impl Into<String>,
        timebase: u64,
        samples: impl IntoIterator<Item = f64>,
    ) -> Self {
        Self::new(name, timebase, samples.into_iter().map(Value::Float).collect())
    }

    #[must_use]
    pub fn samples(&self) -> &[Value] {
        &self.samples
    }

    pub fn raw_segments(&self) -> impl Iterator<Item = Segment> + '_ {
        self.samples
            .iter()
            .map(|&sample| Segment::new(1, vec![sample]))
    }
}

impl Track for ContinuousTrack {
    fn info(&self) -> &TrackInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut TrackInfo {
        &mut self.info
    }

    fn segments(&self) -> SegmentStream<'_> {
        self.raw_segments().cleaned().boxed()
    }

    /// Expands every segment back into per-sample storage.
    #[instrument(skip(self, segments), fields(track = %self.info.name))]
    fn set_segments(&mut self, segments: SegmentStream<'_>) -> Result<(), SegmentError> {
        let mut samples = Vec::new();
        for segment in segments {
            let value = segment.single_value()?;
            let run = usize::try_from(segment.duration).unwrap_or(usize::MAX);
            samples.extend(std::iter::repeat_n(value, run));
        }

        self.info.duration = samples.len() as u64;
        self.samples = samples;
        Ok(())
    }

    fn crop(&mut self, start_at: u64, end_at: Option<i64>) -> Result<bool, SegmentError> {
        let Some((start_at, end_at)) = self.absolute_clip_region(start_at, end_at) else {
            return Ok(false);
        };
        let (Ok(start), Ok(end)) = (usize::try_from(start_at), usize::try_from(end_at)) else {
            return Ok(false);
        };

        self.samples = self.samples[start..end].to_vec();
        self.info.duration = self.samples.len() as u64;
        debug!(track = %self.info.name, start_at, end_at, "continuous track cropped");
        Ok(true)
    }
}

/// Builds a binary track that is 1 wherever `input` holds a value for no
/// longer than `threshold_seconds`, and 0 elsewhere.
///
/// # Errors
///
/// Fails when `input` has no segments.
#[instrument(skip(name, input), fields(input = input.name()))]
pub fn make_activity_track<T: Track + ?Sized>(
    name: impl Into<String>,
    input: &T,
    threshold_seconds: f64,
) -> Result<BinaryTrack, SegmentError> {
    let threshold = input.seconds_to_samples(threshold_seconds);
    let activity = input
        .segments()
        .tested(
            move |segment| segment.duration <= threshold,
            Substitute::unsigned(1),
            Substitute::unsigned(0),
        )
        .cleaned();

    let mut track = BinaryTrack::new(name, input.timebase());
    track.set_segments(activity.boxed())?;
    Ok(track)
}
