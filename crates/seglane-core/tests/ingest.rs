use seglane_core::{
    ChannelSpec, Segment, SegmentError, Track, UnsignedTrack, Value, ValueChange,
    binary_tracks_from_value_changes, segments_from_value_changes, validate_channels,
};

fn change(timestamp: u64, values: &[u64]) -> ValueChange {
    ValueChange::new(timestamp, values.iter().copied().map(Value::Unsigned).collect())
}

#[test]
fn channel_validation_rejects_conflicts() {
    let channels = vec![ChannelSpec::new(0, "clk"), ChannelSpec::new(3, "data")];
    assert_eq!(validate_channels(&channels, 7), Ok(()));
    assert_eq!(
        validate_channels(&channels, 2),
        Err(SegmentError::ChannelIdOutOfRange { id: 3, max: 2 })
    );

    let duplicate_id = vec![ChannelSpec::new(1, "a"), ChannelSpec::new(1, "b")];
    assert_eq!(
        validate_channels(&duplicate_id, 7),
        Err(SegmentError::DuplicateChannelId(1))
    );

    let duplicate_name = vec![ChannelSpec::new(1, "a"), ChannelSpec::new(2, "a")];
    assert_eq!(
        validate_channels(&duplicate_name, 7),
        Err(SegmentError::DuplicateChannelName("a".to_string()))
    );
}

#[test]
fn value_changes_split_into_binary_tracks() {
    let channels = vec![ChannelSpec::new(0, "clk"), ChannelSpec::new(1, "data")];
    let changes = vec![
        change(10, &[0, 1]),
        change(12, &[1, 1]),
        change(15, &[0, 0]),
        change(16, &[0, 0]),
    ];
    let tracks = binary_tracks_from_value_changes(changes, &channels, 1_000)
        .expect("value changes should ingest");

    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[0].name(), "clk");
    assert_eq!(tracks[0].timebase(), 1_000);
    assert_eq!(tracks[0].duration(), 7);
    assert_eq!(
        tracks[0].segments().collect::<Vec<_>>(),
        vec![
            Segment::unsigned(2, 0),
            Segment::unsigned(3, 1),
            Segment::unsigned(2, 0)
        ]
    );
    assert_eq!(
        tracks[1].segments().collect::<Vec<_>>(),
        vec![Segment::unsigned(5, 1), Segment::unsigned(2, 0)]
    );
}

#[test]
fn channels_pick_their_column_by_id() {
    let channels = vec![ChannelSpec::new(2, "late")];
    let changes = vec![change(0, &[1, 1, 0]), change(4, &[0, 0, 1])];
    let tracks = binary_tracks_from_value_changes(changes, &channels, 1)
        .expect("value changes should ingest");
    assert_eq!(tracks[0].initial(), 0);
    assert_eq!(tracks[0].deltas(), &[4]);
    assert_eq!(tracks[0].duration(), 5);
}

#[test]
fn ingestion_rejects_malformed_changes() {
    let channels = vec![ChannelSpec::new(0, "clk")];

    let result = binary_tracks_from_value_changes(Vec::<ValueChange>::new(), &channels, 1);
    assert_eq!(result, Err(SegmentError::EmptyStream));

    let result =
        binary_tracks_from_value_changes(vec![change(5, &[0]), change(3, &[1])], &channels, 1);
    assert_eq!(
        result,
        Err(SegmentError::NonMonotonicTimestamp {
            previous: 5,
            found: 3
        })
    );

    let result = binary_tracks_from_value_changes(vec![change(0, &[2])], &channels, 1);
    assert_eq!(
        result,
        Err(SegmentError::NonBinaryValue(Value::Unsigned(2)))
    );
}

#[test]
fn value_changes_become_segments() {
    let segments = segments_from_value_changes(vec![change(3, &[1, 2]), change(7, &[3, 4])])
        .collect::<Result<Vec<_>, _>>()
        .expect("timestamps are increasing");
    assert_eq!(
        segments,
        vec![
            Segment::new(4, vec![Value::Unsigned(1), Value::Unsigned(2)]),
            Segment::new(1, vec![Value::Unsigned(3), Value::Unsigned(4)]),
        ]
    );

    let mut failing = segments_from_value_changes(vec![change(3, &[1]), change(2, &[1])]);
    assert!(matches!(
        failing.next(),
        Some(Err(SegmentError::NonMonotonicTimestamp { .. }))
    ));
    assert!(failing.next().is_none());
}

#[test]
fn unsigned_track_from_value_changes_merges_repeats() {
    let track = UnsignedTrack::from_value_changes(
        "bus",
        1,
        4,
        vec![change(0, &[3]), change(2, &[3]), change(5, &[9])],
    )
    .expect("changes should fit the bus");
    assert_eq!(track.transitions(), 2);
    assert_eq!(track.duration(), 6);
    assert_eq!(
        track.segments().collect::<Vec<_>>(),
        vec![Segment::unsigned(5, 3), Segment::unsigned(1, 9)]
    );
}

#[test]
fn flips_sharing_a_timestamp_cancel_out() {
    let channels = vec![ChannelSpec::new(0, "clk")];

    let tracks = binary_tracks_from_value_changes(
        vec![change(0, &[0]), change(5, &[1]), change(5, &[0])],
        &channels,
        1,
    )
    .expect("value changes should ingest");
    assert!(tracks[0].deltas().is_empty());
    assert_eq!(
        tracks[0].segments().collect::<Vec<_>>(),
        vec![Segment::unsigned(6, 0)]
    );

    let tracks = binary_tracks_from_value_changes(
        vec![change(0, &[0]), change(0, &[1]), change(3, &[0])],
        &channels,
        1,
    )
    .expect("value changes should ingest");
    assert_eq!(tracks[0].initial(), 1);
    assert_eq!(tracks[0].deltas(), &[3]);
    assert_eq!(
        tracks[0].segments().collect::<Vec<_>>(),
        vec![Segment::unsigned(3, 1), Segment::unsigned(1, 0)]
    );
}
