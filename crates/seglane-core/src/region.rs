use std::iter::Fuse;

use crate::segment::Segment;

/// How a segment `[start, end)` sits relative to the selected region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Overlap {
    Before,
    Leading,
    Spanning,
    Contained,
    Trailing,
    After,
}

fn classify(seg_start: u64, seg_end: u64, start_at: u64, end_at: u64) -> Overlap {
    if seg_end <= start_at {
        Overlap::Before
    } else if seg_start >= end_at {
        Overlap::After
    } else if seg_start < start_at {
        if seg_end <= end_at {
            Overlap::Leading
        } else {
            Overlap::Spanning
        }
    } else if seg_end <= end_at {
        Overlap::Contained
    } else {
        Overlap::Trailing
    }
}

/// Restricts a stream to the half-open sample range `[start_at, end_at)`,
/// clipping the boundary segments.
///
/// Iteration stops once the region end is reached, so the remainder of the
/// input is never pulled.
#[derive(Debug, Clone)]
pub struct RegionSelect<I> {
    inner: Fuse<I>,
    start_at: u64,
    end_at: u64,
    position: u64,
    done: bool,
}

impl<I: Iterator<Item = Segment>> RegionSelect<I> {
    pub fn new(inner: I, start_at: u64, end_at: u64) -> Self {
        Self {
            inner: inner.fuse(),
            start_at,
            end_at,
            position: 0,
            done: start_at >= end_at,
        }
    }
}

impl<I: Iterator<Item = Segment>> Iterator for RegionSelect<I> {
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        while !self.done {
            let Some(segment) = self.inner.next() else {
                self.done = true;
                break;
            };

            let seg_start = self.position;
            let seg_end = seg_start + segment.duration;
            self.position = seg_end;

            let duration = match classify(seg_start, seg_end, self.start_at, self.end_at) {
                Overlap::Before => continue,
                Overlap::After => {
                    self.done = true;
                    break;
                }
                Overlap::Leading => seg_end - self.start_at,
                Overlap::Spanning => self.end_at - self.start_at,
                Overlap::Contained => segment.duration,
                Overlap::Trailing => self.end_at - seg_start,
            };

            if seg_end >= self.end_at {
                self.done = true;
            }
            return Some(segment.with_duration(duration));
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_covers_every_overlap() {
        assert_eq!(classify(0, 2, 2, 4), Overlap::Before);
        assert_eq!(classify(1, 3, 2, 4), Overlap::Leading);
        assert_eq!(classify(1, 5, 2, 4), Overlap::Spanning);
        assert_eq!(classify(2, 4, 2, 4), Overlap::Contained);
        assert_eq!(classify(3, 5, 2, 4), Overlap::Trailing);
        assert_eq!(classify(4, 5, 2, 4), Overlap::After);
    }

    #[test]
    fn region_stops_pulling_after_end() {
        let mut pulled = 0;
        let source = (0..100).map(|value| {
            pulled += 1;
            Segment::unsigned(1, value)
        });
        let selected: Vec<_> = RegionSelect::new(source, 2, 4).collect();
        assert_eq!(
            selected,
            vec![Segment::unsigned(1, 2), Segment::unsigned(1, 3)]
        );
        assert_eq!(pulled, 4);
    }
}
