use std::{collections::HashMap, iter::Fuse};

use crate::{
    combine::Combiner,
    segment::{Segment, SegmentError, SegmentIterExt, SegmentStream, Substitute, Value},
};

/// What a replacer emits in place of a matched segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacement {
    PassThrough,
    Segments(Vec<Segment>),
}

#[must_use]
pub fn always(_: &Segment) -> bool {
    true
}

#[must_use]
pub fn never(_: &Segment) -> bool {
    false
}

/// Generic segment rewriter: every segment accepted by `filter` is handed to
/// `replace`, whose output is spliced into the stream in its place.
///
/// Both closures may carry state across calls. An empty
/// [`Replacement::Segments`] removes the segment.
pub struct Replacer<I, F, R> {
    inner: I,
    filter: F,
    replace: R,
    queued: std::vec::IntoIter<Segment>,
}

impl<I, F, R> Replacer<I, F, R>
where
    I: Iterator<Item = Segment>,
    F: FnMut(&Segment) -> bool,
    R: FnMut(&Segment) -> Replacement,
{
    pub fn new(inner: I, filter: F, replace: R) -> Self {
        Self {
            inner,
            filter,
            replace,
            queued: Vec::new().into_iter(),
        }
    }
}

impl<I, F, R> Iterator for Replacer<I, F, R>
where
    I: Iterator<Item = Segment>,
    F: FnMut(&Segment) -> bool,
    R: FnMut(&Segment) -> Replacement,
{
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        loop {
            if let Some(segment) = self.queued.next() {
                return Some(segment);
            }

            let segment = self.inner.next()?;
            if !(self.filter)(&segment) {
                return Some(segment);
            }

            match (self.replace)(&segment) {
                Replacement::PassThrough => return Some(segment),
                Replacement::Segments(segments) => self.queued = segments.into_iter(),
            }
        }
    }
}

/// Maps each segment to `when_true` or `when_false` depending on `filter`,
/// keeping durations.
pub fn tester<I, F>(
    inner: I,
    mut filter: F,
    when_true: Substitute,
    when_false: Substitute,
) -> impl Iterator<Item = Segment>
where
    I: Iterator<Item = Segment>,
    F: FnMut(&Segment) -> bool,
{
    inner.replaced(always, move |segment| {
        let substitute = if filter(segment) {
            &when_true
        } else {
            &when_false
        };
        Replacement::Segments(vec![substitute.apply(segment.clone())])
    })
}

/// Replaces value tuples found in `mapping`; other segments pass unchanged.
pub fn value_remap<I>(
    inner: I,
    mapping: HashMap<Vec<Value>, Vec<Value>>,
) -> impl Iterator<Item = Segment>
where
    I: Iterator<Item = Segment>,
{
    inner.replaced(always, move |segment| match mapping.get(&segment.values) {
        Some(values) => Replacement::Segments(vec![Segment::new(segment.duration, values.clone())]),
        None => Replacement::PassThrough,
    })
}

/// Overwrites `data` with `replacement` wherever `mask` is non-zero.
///
/// The result is not cleaned.
///
/// # Errors
///
/// Fails as [`Combiner::new`] does, and with [`SegmentError::ArityMismatch`]
/// when the mask is not single-valued.
pub fn mask_apply<'a>(
    data: SegmentStream<'a>,
    mask: SegmentStream<'a>,
    replacement: Vec<Value>,
) -> Result<impl Iterator<Item = Segment> + 'a, SegmentError> {
    let combined = Combiner::new(vec![data, mask])?;
    let mask_arity = combined.arities().last().copied().unwrap_or(1);
    if mask_arity != 1 {
        return Err(SegmentError::ArityMismatch {
            expected: 1,
            found: mask_arity,
        });
    }
    Ok(combined
        .replaced(
            |segment| segment.values.last().is_some_and(|mask| mask.is_truthy()),
            move |segment| {
                let mut values = replacement.clone();
                values.extend(segment.values.last().copied());
                Replacement::Segments(vec![Segment::new(segment.duration, values)])
            },
        )
        .map(|mut segment| {
            segment.values.pop();
            segment
        }))
}

/// Selects input segments by the positions of changes in a second stream.
///
/// A segment is selected when at least one change of the change stream falls
/// inside it, counting a change exactly at its start. Once the change stream is
/// exhausted no further segments are selected.
pub struct Picker<I, C> {
    inner: I,
    changes: Fuse<C>,
    until_change: Option<u64>,
    when_selected: Substitute,
    when_unselected: Substitute,
    invert: bool,
}

impl<I, C> Picker<I, C>
where
    I: Iterator<Item = Segment>,
    C: Iterator<Item = Segment>,
{
    pub fn new(inner: I, changes: C) -> Self {
        let mut changes = changes.fuse();
        let until_change = changes.next().map(|change| change.duration);
        Self {
            inner,
            changes,
            until_change,
            when_selected: Substitute::unsigned(1),
            when_unselected: Substitute::unsigned(0),
            invert: false,
        }
    }

    #[must_use]
    pub fn with_substitutes(mut self, when_selected: Substitute, when_unselected: Substitute) -> Self {
        self.when_selected = when_selected;
        self.when_unselected = when_unselected;
        self
    }

    #[must_use]
    pub fn inverted(mut self) -> Self {
        self.invert = !self.invert;
        self
    }

    fn advance(&mut self, duration: u64) -> bool {
        let Some(remaining) = self.until_change else {
            return false;
        };

        if duration <= remaining {
            self.until_change = Some(remaining - duration);
            return false;
        }

        let mut deficit = duration - remaining;
        loop {
            match self.changes.next() {
                Some(change) if change.duration >= deficit => {
                    self.until_change = Some(change.duration - deficit);
                    return true;
                }
                Some(change) => deficit -= change.duration,
                None => {
                    self.until_change = None;
                    return true;
                }
            }
        }
    }
}

impl<I, C> Iterator for Picker<I, C>
where
    I: Iterator<Item = Segment>,
    C: Iterator<Item = Segment>,
{
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        let segment = self.inner.next()?;
        let selected = self.advance(segment.duration) != self.invert;
        Some(if selected {
            self.when_selected.apply(segment)
        } else {
            self.when_unselected.apply(segment)
        })
    }
}

/// Splits long anchor segments so that a `pre` value leads into them and a
/// `post` value trails out of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub anchor: Vec<Value>,
    pub pre: Vec<Value>,
    pub post: Vec<Value>,
    pub pre_duration: u64,
    pub post_duration: u64,
}

impl Transition {
    /// Splits one anchor segment. Parts that would last zero samples are
    /// omitted.
    #[must_use]
    pub fn split(&self, duration: u64) -> Vec<Segment> {
        let edges = self.pre_duration.saturating_add(self.post_duration);
        let mut parts = if duration <= edges {
            let pre_share = self.pre_duration as f64 / edges as f64;
            let pre_len = ((0.4999 + pre_share * duration as f64) as u64).min(duration);
            vec![
                Segment::new(pre_len, self.pre.clone()),
                Segment::new(duration - pre_len, self.post.clone()),
            ]
        } else {
            vec![
                Segment::new(self.pre_duration, self.pre.clone()),
                Segment::new(duration - edges, self.anchor.clone()),
                Segment::new(self.post_duration, self.post.clone()),
            ]
        };
        parts.retain(|part| part.duration > 0);
        parts
    }
}

/// Applies [`Transition::split`] to every anchor segment lasting at least two
/// samples.
pub fn transition_split<I>(
    inner: I,
    transition: Transition,
) -> Result<impl Iterator<Item = Segment>, SegmentError>
where
    I: Iterator<Item = Segment>,
{
    match transition.pre_duration.checked_add(transition.post_duration) {
        None | Some(0) => return Err(SegmentError::InvalidTransitionDurations),
        Some(_) => {}
    }

    let anchor = transition.anchor.clone();
    Ok(inner.replaced(
        move |segment| segment.duration >= 2 && segment.values == anchor,
        move |segment| Replacement::Segments(transition.split(segment.duration)),
    ))
}
