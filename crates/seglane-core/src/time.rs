use std::fmt;

use crate::segment::SegmentError;

#[must_use]
pub fn samples_to_seconds(samples: u64, timebase: u64) -> f64 {
    if timebase == 0 {
        return 0.0;
    }

    samples as f64 / timebase as f64
}

/// Rounds half up; negative times clamp to zero.
#[must_use]
pub fn seconds_to_samples(seconds: f64, timebase: u64) -> u64 {
    if seconds <= 0.0 || timebase == 0 {
        return 0;
    }

    (seconds * timebase as f64 + 0.5).floor() as u64
}

/// Multiplier applied to segment durations when changing timebase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScaleFactor {
    Integer(u64),
    Fractional(f64),
}

impl ScaleFactor {
    /// Whole factors become [`ScaleFactor::Integer`] so they scale exactly.
    pub fn from_f64(factor: f64) -> Result<Self, SegmentError> {
        if !factor.is_finite() || factor < 0.0 {
            return Err(SegmentError::InvalidScaleFactor(factor.to_string()));
        }

        if factor.fract() == 0.0 && factor <= u64::MAX as f64 {
            Ok(Self::Integer(factor as u64))
        } else {
            Ok(Self::Fractional(factor))
        }
    }

    pub fn from_timebases(old_timebase: u64, new_timebase: u64) -> Result<Self, SegmentError> {
        if old_timebase == 0 {
            return Err(SegmentError::InvalidTimebase(old_timebase));
        }
        if new_timebase == 0 {
            return Err(SegmentError::InvalidTimebase(new_timebase));
        }

        if new_timebase % old_timebase == 0 {
            Ok(Self::Integer(new_timebase / old_timebase))
        } else {
            Ok(Self::Fractional(new_timebase as f64 / old_timebase as f64))
        }
    }
}

impl fmt::Display for ScaleFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(factor) => write!(f, "x{factor}"),
            Self::Fractional(factor) => write!(f, "x{factor}"),
        }
    }
}

const VCD_TIMESCALES: [(u64, u64, &str); 10] = [
    (1, 1, "s"),
    (10, 100, "ms"),
    (100, 10, "ms"),
    (1_000, 1, "ms"),
    (10_000, 100, "us"),
    (100_000, 10, "us"),
    (1_000_000, 1, "us"),
    (10_000_000, 100, "ns"),
    (100_000_000, 10, "ns"),
    (1_000_000_000, 1, "ns"),
];

/// VCD `$timescale` chosen for a track timebase, plus the multiplier that
/// converts sample positions into timescale units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VcdTimescale {
    pub magnitude: u64,
    pub unit: &'static str,
    pub factor: u64,
}

impl fmt::Display for VcdTimescale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.magnitude, self.unit)
    }
}

pub fn vcd_timescale(timebase: u64) -> Result<VcdTimescale, SegmentError> {
    if timebase == 0 {
        return Err(SegmentError::InvalidTimebase(timebase));
    }

    VCD_TIMESCALES
        .iter()
        .find(|(dividend, _, _)| dividend % timebase == 0)
        .map(|&(dividend, magnitude, unit)| VcdTimescale {
            magnitude,
            unit,
            factor: dividend / timebase,
        })
        .ok_or(SegmentError::UnsupportedTimescale(timebase))
}
