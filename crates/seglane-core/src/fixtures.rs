use chrono::{DateTime, Utc};

use crate::{
    combine::Combiner,
    export::{VcdOptions, VcdTrack},
    model::{BinaryTrack, ContinuousTrack, DEFAULT_UNSIGNED_WIDTH, Track, UnsignedTrack},
    segment::{Segment, SegmentIterExt, Value},
    stats::ModeSpec,
};

pub const DEMO_TIMEBASE: u64 = 1_000_000;
const DEMO_STRETCH: u64 = 10;

/// Parses the compact test notation for single-valued streams.
///
/// `0` and `1` are the values 0 and 1, any other character stands for its
/// code point, and `.` extends the previous segment. Every character is worth
/// `duration_factor` samples.
///
/// # Panics
///
/// Panics when the code starts with `.`.
#[must_use]
pub fn segments_from_shortcode(code: &str, duration_factor: u64) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::new();
    for symbol in code.chars() {
        let value = match symbol {
            '.' => {
                segments
                    .last_mut()
                    .expect("shortcode must not start with '.'")
                    .duration += duration_factor;
                continue;
            }
            '0' => 0,
            '1' => 1,
            other => u64::from(u32::from(other)),
        };
        segments.push(Segment::unsigned(duration_factor, value));
    }
    segments
}

fn shortcode_symbol(value: Value) -> char {
    match value {
        Value::Unsigned(0) => '0',
        Value::Unsigned(1) => '1',
        Value::Unsigned(code) => u32::try_from(code)
            .ok()
            .and_then(char::from_u32)
            .unwrap_or('?'),
        Value::Float(_) => '~',
    }
}

/// Renders segments in the notation accepted by [`segments_from_shortcode`];
/// multi-valued segments are written as `[..]`.
#[must_use]
pub fn shortcode_from_segments<I>(segments: I) -> String
where
    I: IntoIterator<Item = Segment>,
{
    let mut code = String::new();
    for segment in segments {
        match segment.values.as_slice() {
            [value] => code.push(shortcode_symbol(*value)),
            values => {
                code.push('[');
                code.extend(values.iter().copied().map(shortcode_symbol));
                code.push(']');
            }
        }
        for _ in 1..segment.duration {
            code.push('.');
        }
    }
    code
}

/// 8-bit unsigned track at timebase 1 holding the given shortcode.
#[must_use]
pub fn simple_track(name: &str, code: &str) -> UnsignedTrack {
    UnsignedTrack::from_segments(
        name,
        1,
        DEFAULT_UNSIGNED_WIDTH,
        segments_from_shortcode(code, 1),
    )
    .expect("fixture shortcode should fit an 8-bit track")
}

/// Small capture: three binary lines, the bus they encode and a supply
/// voltage sampled at every sample.
#[derive(Debug, Clone)]
pub struct DemoCapture {
    pub bits: Vec<BinaryTrack>,
    pub bus: UnsignedTrack,
    pub supply: ContinuousTrack,
}

impl DemoCapture {
    #[must_use]
    pub fn vcd_tracks(&self) -> Vec<&dyn VcdTrack> {
        let mut tracks: Vec<&dyn VcdTrack> = self
            .bits
            .iter()
            .map(|track| track as &dyn VcdTrack)
            .collect();
        tracks.push(&self.bus);
        tracks.push(&self.supply);
        tracks
    }
}

#[must_use]
pub fn demo_capture() -> DemoCapture {
    let codes = [("b2", "0...1...001."), ("b1", "0.1.0.1.001."), ("b0", "01010101001.")];
    let bits: Vec<BinaryTrack> = codes
        .iter()
        .map(|(name, code)| {
            BinaryTrack::from_segments(*name, DEMO_TIMEBASE, segments_from_shortcode(code, DEMO_STRETCH))
                .expect("fixture bit line should be binary")
        })
        .collect();

    let decoded: Vec<Segment> = Combiner::new(bits.iter().map(|track| track.segments()))
        .expect("fixture bit lines should not be empty")
        .binary_decoded()
        .cleaned()
        .collect();
    let mut bus = UnsignedTrack::from_segments("bus", DEMO_TIMEBASE, 3, decoded)
        .expect("fixture bus should fit three bits");
    bus.set_hi_z(Some(7));

    let supply_samples = (0..bus.duration()).map(|sample| {
        if sample % 40 < 10 { 3.3 } else { 3.25 }
    });
    let supply = ContinuousTrack::from_floats("vdd", DEMO_TIMEBASE, supply_samples);

    DemoCapture { bits, bus, supply }
}

#[must_use]
pub fn demo_modes() -> Vec<ModeSpec> {
    vec![
        ModeSpec::new(vec![Value::Unsigned(0)], "off", 0.0),
        ModeSpec::new(vec![Value::Unsigned(1)], "sleep", 0.1),
        ModeSpec::new(vec![Value::Unsigned(3)], "idle", 0.4),
        ModeSpec::new(vec![Value::Unsigned(5)], "run", 1.0),
        ModeSpec::new(vec![Value::Unsigned(7)], "fault", 10.0),
    ]
}

#[must_use]
pub fn demo_vcd_options() -> VcdOptions {
    let fixed_timestamp = DateTime::parse_from_rfc3339("2026-02-23T00:00:00Z")
        .expect("fixture timestamp should be valid")
        .with_timezone(&Utc);
    VcdOptions {
        date: Some(fixed_timestamp),
        ..VcdOptions::default()
    }
}
