use seglane_core::{
    Picker, Segment, SegmentError, Substitute, Transition, Value, transition_split,
    fixtures::{segments_from_shortcode, shortcode_from_segments},
};

fn ch(symbol: char) -> Value {
    Value::Unsigned(u64::from(symbol))
}

fn picked(changes: &str) -> Vec<Segment> {
    Picker::new(
        segments_from_shortcode("A..B..C..D..", 1).into_iter(),
        segments_from_shortcode(changes, 1).into_iter(),
    )
    .collect()
}

#[test]
fn picker_selects_segments_containing_changes() {
    assert_eq!(
        picked("0.1...0....."),
        vec![
            Segment::unsigned(3, 1),
            Segment::unsigned(3, 0),
            Segment::unsigned(3, 1),
            Segment::unsigned(3, 0),
        ]
    );
    assert_eq!(
        picked("0..1.0.1...."),
        vec![
            Segment::unsigned(3, 0),
            Segment::unsigned(3, 1),
            Segment::unsigned(3, 1),
            Segment::unsigned(3, 0),
        ]
    );
}

#[test]
fn inverted_picker_substitutes_unselected_segments() {
    let picker = Picker::new(
        segments_from_shortcode("A..B..C..D..", 1).into_iter(),
        segments_from_shortcode("0..1.0.1....", 1).into_iter(),
    )
    .with_substitutes(Substitute::PassThrough, Substitute::Values(vec![ch('n')]))
    .inverted();
    assert_eq!(shortcode_from_segments(picker), "A..n..n..D..");
}

fn transition(pre_duration: u64, post_duration: u64) -> Transition {
    Transition {
        anchor: vec![Value::Unsigned(0)],
        pre: vec![ch('d')],
        post: vec![ch('u')],
        pre_duration,
        post_duration,
    }
}

fn split(code: &str, pre_duration: u64, post_duration: u64) -> String {
    let stream = transition_split(
        segments_from_shortcode(code, 1).into_iter(),
        transition(pre_duration, post_duration),
    )
    .expect("transition durations should be valid");
    shortcode_from_segments(stream)
}

#[test]
fn transitions_surround_long_anchor_segments() {
    let input = "0.R0R0.R0..R0...R0....";
    assert_eq!(split(input, 1, 1), "duR0RduRd0uRd0.uRd0..u");
    assert_eq!(split(input, 1, 2), "duR0RduRdu.Rd0u.Rd0.u.");
    assert_eq!(split(input, 2, 2), "duR0RduRdu.Rd.u.Rd.0u.");
}

#[test]
fn transitions_on_single_segments() {
    let five: Vec<Segment> = transition_split(
        vec![Segment::unsigned(5, 0)].into_iter(),
        transition(2, 2),
    )
    .expect("transition durations should be valid")
    .collect();
    assert_eq!(
        five,
        vec![
            Segment::new(2, vec![ch('d')]),
            Segment::unsigned(1, 0),
            Segment::new(2, vec![ch('u')]),
        ]
    );

    let three: Vec<Segment> = transition_split(
        vec![Segment::unsigned(3, 0)].into_iter(),
        transition(2, 2),
    )
    .expect("transition durations should be valid")
    .collect();
    assert_eq!(
        three,
        vec![Segment::new(1, vec![ch('d')]), Segment::new(2, vec![ch('u')])]
    );

    assert_eq!(split("0", 1, 1), "0");
    assert_eq!(split("0.....................", 1, 1), "d0...................u");
}

#[test]
fn transition_requires_non_zero_edges() {
    let result = transition_split(std::iter::empty::<Segment>(), transition(0, 0));
    assert!(matches!(result, Err(SegmentError::InvalidTransitionDurations)));

    let result = transition_split(std::iter::empty::<Segment>(), transition(u64::MAX, 1));
    assert!(matches!(result, Err(SegmentError::InvalidTransitionDurations)));
}

#[test]
fn oversized_edges_split_without_overflow() {
    let parts = transition(u64::MAX, u64::MAX).split(4);
    assert_eq!(parts, vec![Segment::new(4, vec![ch('d')])]);
}
