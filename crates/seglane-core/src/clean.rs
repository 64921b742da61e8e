use std::iter::Fuse;

use crate::segment::Segment;

/// Merges consecutive segments that carry equal value tuples.
#[derive(Debug, Clone)]
pub struct Cleaner<I> {
    inner: Fuse<I>,
    pending: Option<Segment>,
}

impl<I: Iterator<Item = Segment>> Cleaner<I> {
    pub fn new(inner: I) -> Self {
        Self {
            inner: inner.fuse(),
            pending: None,
        }
    }
}

impl<I: Iterator<Item = Segment>> Iterator for Cleaner<I> {
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        loop {
            let Some(segment) = self.inner.next() else {
                return self.pending.take();
            };

            match self.pending.as_mut() {
                Some(pending) if pending.values == segment.values => {
                    pending.duration += segment.duration;
                }
                _ => {
                    if let Some(done) = self.pending.replace(segment) {
                        return Some(done);
                    }
                }
            }
        }
    }
}

/// Folds segments no longer than `threshold` into the next longer segment.
///
/// Trailing short segments are flushed as one segment carrying the value of
/// the last of them, so total duration is preserved.
#[derive(Debug, Clone)]
pub struct Deglitcher<I> {
    inner: Fuse<I>,
    threshold: u64,
    carry: u64,
    last_glitch: Option<Segment>,
}

impl<I: Iterator<Item = Segment>> Deglitcher<I> {
    pub fn new(inner: I, threshold: u64) -> Self {
        Self {
            inner: inner.fuse(),
            threshold,
            carry: 0,
            last_glitch: None,
        }
    }
}

impl<I: Iterator<Item = Segment>> Iterator for Deglitcher<I> {
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        while let Some(mut segment) = self.inner.next() {
            if segment.duration <= self.threshold {
                self.carry += segment.duration;
                self.last_glitch = Some(segment);
                continue;
            }

            segment.duration += std::mem::take(&mut self.carry);
            self.last_glitch = None;
            return Some(segment);
        }

        let carry = std::mem::take(&mut self.carry);
        let glitch = self.last_glitch.take()?;
        (carry > 0).then(|| glitch.with_duration(carry))
    }
}
