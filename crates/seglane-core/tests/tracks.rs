use seglane_core::{
    BinaryTrack, ContinuousTrack, Segment, SegmentError, SegmentIterExt, Track, UnsignedTrack,
    Value, make_activity_track,
    fixtures::{segments_from_shortcode, shortcode_from_segments, simple_track},
};

fn code_of(track: &dyn Track) -> String {
    shortcode_from_segments(track.segments())
}

#[test]
fn binary_track_round_trips_segments() {
    let track = BinaryTrack::from_segments("clk", 1, segments_from_shortcode("0..1.0", 1))
        .expect("binary segments should load");
    assert_eq!(track.initial(), 0);
    assert_eq!(track.deltas(), &[3, 2]);
    assert_eq!(track.duration(), 6);
    assert_eq!(code_of(&track), "0..1.0");
}

#[test]
fn binary_track_coalesces_repeated_values() {
    let track = BinaryTrack::from_segments("en", 1, segments_from_shortcode("0011", 1))
        .expect("binary segments should load");
    assert_eq!(track.deltas(), &[2]);
    assert_eq!(code_of(&track), "0.1.");
}

#[test]
fn binary_track_rejects_bad_input() {
    let error = BinaryTrack::from_segments("bad", 1, segments_from_shortcode("0A", 1))
        .expect_err("non-binary values should fail");
    assert_eq!(error, SegmentError::NonBinaryValue(Value::Unsigned(65)));

    let error = BinaryTrack::from_segments("empty", 1, Vec::<Segment>::new())
        .expect_err("empty input should fail");
    assert_eq!(error, SegmentError::EmptyStream);
}

#[test]
fn binary_track_holds_last_value_until_duration() {
    let track = BinaryTrack::from_deltas("clk", 1, 0, vec![2, 3], None);
    assert_eq!(track.duration(), 6);
    let segments: Vec<Segment> = track.segments().collect();
    assert_eq!(
        segments,
        vec![
            Segment::unsigned(2, 0),
            Segment::unsigned(3, 1),
            Segment::unsigned(1, 0)
        ]
    );
}

#[test]
fn short_duration_cuts_off_stored_flips() {
    let track = BinaryTrack::from_deltas("x", 1, 0, vec![4, 4], Some(3));
    let segments: Vec<Segment> = track.segments().collect();
    assert_eq!(segments, vec![Segment::unsigned(3, 0)]);

    let track = BinaryTrack::from_deltas("y", 1, 0, vec![4, 4], Some(6));
    assert_eq!(code_of(&track), "0...1.");
    assert_eq!(track.segments().total_duration(), track.duration());
}

#[test]
fn inverted_binary_track_flips_every_value() {
    let track = BinaryTrack::from_deltas("rst", 1, 1, vec![2], Some(4));
    let inverted = track.inverted();
    assert_eq!(inverted.name(), "nrst");
    assert_eq!(code_of(&inverted), "0.1.");
    assert_eq!(code_of(&track), "1.0.");
}

#[test]
fn crop_keeps_only_the_requested_region() {
    let mut track = simple_track("t", "ABCD.E.F.G..H..I..");
    assert!(track.crop(4, Some(6)).expect("crop should succeed"));
    assert_eq!(code_of(&track), "DE");
    assert_eq!(track.duration(), 2);

    let mut track = simple_track("t", "ABCD.E.F.G..H..I..");
    assert!(track.crop(0, Some(-3)).expect("crop should succeed"));
    assert_eq!(code_of(&track), "ABCD.E.F.G..H..");
}

#[test]
fn invalid_crop_leaves_track_untouched() {
    let mut track = simple_track("t", "AB.C");
    assert!(!track.crop(3, Some(2)).expect("invalid crop is not an error"));
    assert!(!track.crop(0, Some(5)).expect("invalid crop is not an error"));
    assert_eq!(code_of(&track), "AB.C");
}

#[test]
fn set_timebase_rescales_durations() {
    let mut track = simple_track("t", "A...B...");
    track.set_timebase(2.0).expect("integer rescale should work");
    assert_eq!(track.timebase(), 2);
    assert_eq!(code_of(&track), "A.......B.......");

    let mut track = UnsignedTrack::from_segments("t", 4, 8, segments_from_shortcode("A...B...", 1))
        .expect("segments should fit");
    track.set_timebase(2.0).expect("fractional rescale should work");
    assert_eq!(track.timebase(), 2);
    assert_eq!(code_of(&track), "A.B.");

    assert_eq!(
        track.set_timebase(0.0),
        Err(SegmentError::InvalidTimebase(0))
    );
}

#[test]
fn unsigned_track_validates_values() {
    let error = UnsignedTrack::from_segments("nibble", 1, 4, vec![Segment::unsigned(1, 16)])
        .expect_err("value wider than track should fail");
    assert_eq!(error, SegmentError::ValueTooWide { value: 16, width: 4 });

    let error = UnsignedTrack::from_segments("nibble", 1, 4, vec![Segment::float(1, 0.5)])
        .expect_err("floats should fail");
    assert_eq!(error, SegmentError::NonUnsignedValue(Value::Float(0.5)));

    let error = UnsignedTrack::from_segments(
        "nibble",
        1,
        4,
        vec![Segment::new(1, vec![Value::Unsigned(1), Value::Unsigned(2)])],
    )
    .expect_err("tuples should fail");
    assert_eq!(error, SegmentError::ArityMismatch { expected: 1, found: 2 });
}

#[test]
fn failed_set_segments_keeps_previous_data() {
    let mut track = simple_track("t", "AB.");
    let result = track.set_segments(vec![Segment::unsigned(1, 1_000)].into_iter().boxed());
    assert!(result.is_err());
    assert_eq!(code_of(&track), "AB.");
}

#[test]
fn unsigned_track_extends_to_duration() {
    let mut track = simple_track("t", "AB");
    track.set_duration(4);
    assert_eq!(code_of(&track), "ABB.");
    assert_eq!(shortcode_from_segments(track.segments().cleaned()), "AB..");

    let mut empty = UnsignedTrack::new("bus", 1, 8);
    empty.set_hi_z(Some(0xff));
    empty.set_duration(3);
    let segments: Vec<Segment> = empty.segments().collect();
    assert_eq!(segments, vec![Segment::unsigned(3, 0xff)]);
}

#[test]
fn unsigned_track_shortened_below_its_data() {
    let mut track = simple_track("t", "A..B..C");
    track.set_duration(5);
    assert_eq!(code_of(&track), "A..B.");
    assert_eq!(track.segments().total_duration(), 5);
}

#[test]
fn continuous_track_cleans_samples_into_segments() {
    let mut track = ContinuousTrack::from_floats("vdd", 1, [1.0, 1.0, 2.0, 2.0, 2.0]);
    let segments: Vec<Segment> = track.segments().collect();
    assert_eq!(segments, vec![Segment::float(2, 1.0), Segment::float(3, 2.0)]);

    assert!(track.crop(1, Some(-1)).expect("crop should succeed"));
    assert_eq!(
        track.samples(),
        &[Value::Float(1.0), Value::Float(2.0), Value::Float(2.0)]
    );
    assert_eq!(track.duration(), 3);
}

#[test]
fn continuous_track_expands_segments() {
    let mut track = ContinuousTrack::from_floats("vdd", 1, [1.0, 2.0]);
    track.set_timebase(3.0).expect("integer rescale should work");
    assert_eq!(track.duration(), 6);
    assert_eq!(track.samples()[2], Value::Float(1.0));
    assert_eq!(track.samples()[3], Value::Float(2.0));
}

#[test]
fn activity_track_marks_short_segments() {
    let input = simple_track("t", "AB.C..D...");
    let activity = make_activity_track("busy", &input, 2.0).expect("activity track should build");
    assert_eq!(activity.name(), "busy");
    assert_eq!(activity.initial(), 1);
    assert_eq!(activity.deltas(), &[3]);
    assert_eq!(activity.duration(), 10);
}

#[test]
fn durations_convert_to_seconds() {
    let track = BinaryTrack::from_deltas("clk", 1_000, 0, vec![250], Some(500));
    assert!((track.duration_seconds() - 0.5).abs() < 1e-12);
    assert_eq!(track.seconds_to_samples(0.25), 250);
}
