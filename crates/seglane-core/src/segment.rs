use std::{
    cmp::Ordering,
    collections::HashMap,
    fmt,
    hash::{Hash, Hasher},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    clean::{Cleaner, Deglitcher},
    combine::binary_decode,
    region::RegionSelect,
    scale::DurationScaler,
    select::{Replacement, Replacer, tester, value_remap},
    time::ScaleFactor,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SegmentError {
    #[error("timebase mismatch on input {index}: expected {expected}, found {found}")]
    TimebaseMismatch {
        index: usize,
        expected: u64,
        found: u64,
    },
    #[error("combiner requires at least one input")]
    NoInputs,
    #[error("merge input {index} produced no segments")]
    EmptyInput { index: usize },
    #[error("segment stream is empty")]
    EmptyStream,
    #[error("expected {expected} value(s) per segment, found {found}")]
    ArityMismatch { expected: usize, found: usize },
    #[error("binary value must be 0 or 1, found {0}")]
    NonBinaryValue(Value),
    #[error("expected an unsigned value, found {0}")]
    NonUnsignedValue(Value),
    #[error("value {value} does not fit in {width} bits")]
    ValueTooWide { value: u64, width: u32 },
    #[error("invalid duration scale factor: {0}")]
    InvalidScaleFactor(String),
    #[error("invalid timebase: {0}")]
    InvalidTimebase(u64),
    #[error("pre and post transition durations must not both be zero")]
    InvalidTransitionDurations,
    #[error("channel id {0} specified multiple times")]
    DuplicateChannelId(u32),
    #[error("channel name {0} specified multiple times")]
    DuplicateChannelName(String),
    #[error("channel id {id} exceeds maximum channel id {max}")]
    ChannelIdOutOfRange { id: u32, max: u32 },
    #[error("timestamp {found} precedes previous timestamp {previous}")]
    NonMonotonicTimestamp { previous: u64, found: u64 },
    #[error("no VCD timescale matches timebase {0}")]
    UnsupportedTimescale(u64),
}

/// A single sample value carried by a segment.
///
/// Floats compare, order and hash by bit pattern so that values can key
/// statistics maps; `0.0` and `-0.0` are distinct values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Unsigned(u64),
    Float(f64),
}

impl Value {
    #[must_use]
    pub fn as_unsigned(self) -> Option<u64> {
        match self {
            Self::Unsigned(value) => Some(value),
            Self::Float(_) => None,
        }
    }

    #[must_use]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Unsigned(value) => value as f64,
            Self::Float(value) => value,
        }
    }

    /// Floats are truncated toward zero and saturate at the `u64` range.
    #[must_use]
    pub fn to_unsigned_lossy(self) -> u64 {
        match self {
            Self::Unsigned(value) => value,
            Self::Float(value) => value as u64,
        }
    }

    #[must_use]
    pub fn is_truthy(self) -> bool {
        match self {
            Self::Unsigned(value) => value != 0,
            Self::Float(value) => value != 0.0,
        }
    }

    /// `self + value * weight`, staying unsigned when both operands are.
    #[must_use]
    pub fn weighted_add(self, value: Self, weight: u64) -> Self {
        match (self, value) {
            (Self::Unsigned(acc), Self::Unsigned(value)) => {
                Self::Unsigned(acc.wrapping_add(value.wrapping_mul(weight)))
            }
            (acc, value) => Self::Float(acc.as_f64() + value.as_f64() * weight as f64),
        }
    }

    const fn rank(self) -> u8 {
        match self {
            Self::Unsigned(_) => 0,
            Self::Float(_) => 1,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Unsigned(left), Self::Unsigned(right)) => left.cmp(right),
            (Self::Float(left), Self::Float(right)) => left.total_cmp(right),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Self::Unsigned(value) => value.hash(state),
            Self::Float(value) => value.to_bits().hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsigned(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
        }
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::Unsigned(value)
    }
}

impl From<u8> for Value {
    fn from(value: u8) -> Self {
        Self::Unsigned(u64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Unsigned(u64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

/// One run of the run-length encoded stream: `values` held for `duration`
/// samples.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    pub duration: u64,
    pub values: Vec<Value>,
}

impl Segment {
    #[must_use]
    pub fn new(duration: u64, values: Vec<Value>) -> Self {
        Self { duration, values }
    }

    #[must_use]
    pub fn unsigned(duration: u64, value: u64) -> Self {
        Self::new(duration, vec![Value::Unsigned(value)])
    }

    #[must_use]
    pub fn float(duration: u64, value: f64) -> Self {
        Self::new(duration, vec![Value::Float(value)])
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn value(&self) -> Option<Value> {
        self.values.first().copied()
    }

    #[must_use]
    pub fn with_duration(self, duration: u64) -> Self {
        Self { duration, ..self }
    }

    pub fn single_value(&self) -> Result<Value, SegmentError> {
        match self.values.as_slice() {
            [value] => Ok(*value),
            values => Err(SegmentError::ArityMismatch {
                expected: 1,
                found: values.len(),
            }),
        }
    }
}

pub type SegmentStream<'a> = Box<dyn Iterator<Item = Segment> + 'a>;

/// Value choice for combinators that may keep the original segment values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Substitute {
    Values(Vec<Value>),
    PassThrough,
}

impl Substitute {
    #[must_use]
    pub fn unsigned(value: u64) -> Self {
        Self::Values(vec![Value::Unsigned(value)])
    }

    #[must_use]
    pub fn apply(&self, segment: Segment) -> Segment {
        match self {
            Self::Values(values) => Segment::new(segment.duration, values.clone()),
            Self::PassThrough => segment,
        }
    }
}

pub trait SegmentIterExt: Iterator<Item = Segment> + Sized {
    fn cleaned(self) -> Cleaner<Self> {
        Cleaner::new(self)
    }

    fn deglitched(self, threshold: u64) -> Deglitcher<Self> {
        Deglitcher::new(self, threshold)
    }

    fn region(self, start_at: u64, end_at: u64) -> RegionSelect<Self> {
        RegionSelect::new(self, start_at, end_at)
    }

    fn scaled(self, factor: ScaleFactor) -> DurationScaler<Self> {
        DurationScaler::new(self, factor)
    }

    fn replaced<F, R>(self, filter: F, replace: R) -> Replacer<Self, F, R>
    where
        F: FnMut(&Segment) -> bool,
        R: FnMut(&Segment) -> Replacement,
    {
        Replacer::new(self, filter, replace)
    }

    fn tested<F>(
        self,
        filter: F,
        when_true: Substitute,
        when_false: Substitute,
    ) -> impl Iterator<Item = Segment>
    where
        F: FnMut(&Segment) -> bool,
    {
        tester(self, filter, when_true, when_false)
    }

    fn remapped(self, mapping: HashMap<Vec<Value>, Vec<Value>>) -> impl Iterator<Item = Segment> {
        value_remap(self, mapping)
    }

    fn binary_decoded(self) -> impl Iterator<Item = Segment> {
        binary_decode(self)
    }

    fn total_duration(self) -> u64 {
        self.map(|segment| segment.duration).sum()
    }

    fn boxed<'a>(self) -> SegmentStream<'a>
    where
        Self: 'a,
    {
        Box::new(self)
    }
}

impl<I: Iterator<Item = Segment>> SegmentIterExt for I {}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn float_values_key_maps_by_bit_pattern() {
        let mut counts = BTreeMap::new();
        *counts.entry(Value::Float(0.5)).or_insert(0) += 1;
        *counts.entry(Value::Float(0.5)).or_insert(0) += 1;
        *counts.entry(Value::Unsigned(0)).or_insert(0) += 1;
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[&Value::Float(0.5)], 2);
        assert_ne!(Value::Float(0.0), Value::Float(-0.0));
        assert_ne!(Value::Unsigned(1), Value::Float(1.0));
    }

    #[test]
    fn weighted_add_promotes_to_float_only_when_needed() {
        let acc = Value::Unsigned(1).weighted_add(Value::Unsigned(1), 4);
        assert_eq!(acc, Value::Unsigned(5));
        let mixed = acc.weighted_add(Value::Float(0.5), 2);
        assert_eq!(mixed, Value::Float(6.0));
    }

    #[test]
    fn single_value_rejects_tuples() {
        let segment = Segment::new(3, vec![Value::Unsigned(1), Value::Unsigned(0)]);
        assert_eq!(
            segment.single_value(),
            Err(SegmentError::ArityMismatch {
                expected: 1,
                found: 2
            })
        );
    }
}
