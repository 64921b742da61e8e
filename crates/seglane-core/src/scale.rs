use crate::{segment::Segment, time::ScaleFactor};

/// Multiplies segment durations by a constant factor.
///
/// Integer factors scale exactly. Fractional factors truncate each scaled
/// duration and carry the remainder forward; segments that scale to zero are
/// dropped and their time lands in the carry.
#[derive(Debug, Clone)]
pub struct DurationScaler<I> {
    inner: I,
    factor: ScaleFactor,
    carry: f64,
}

impl<I: Iterator<Item = Segment>> DurationScaler<I> {
    pub fn new(inner: I, factor: ScaleFactor) -> Self {
        Self {
            inner,
            factor,
            carry: 0.0,
        }
    }
}

impl<I: Iterator<Item = Segment>> Iterator for DurationScaler<I> {
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        loop {
            let segment = self.inner.next()?;
            match self.factor {
                ScaleFactor::Integer(factor) => {
                    let duration = segment.duration.saturating_mul(factor);
                    return Some(segment.with_duration(duration));
                }
                ScaleFactor::Fractional(factor) => {
                    let scaled = segment.duration as f64 * factor + self.carry;
                    let whole = scaled.trunc();
                    if whole == 0.0 {
                        self.carry = scaled;
                        continue;
                    }
                    self.carry = scaled - whole;
                    return Some(segment.with_duration(whole as u64));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::SegmentIterExt;

    #[test]
    fn fractional_scaling_carries_remainders() {
        let segments = vec![
            Segment::unsigned(1, 65),
            Segment::unsigned(2, 66),
            Segment::unsigned(3, 67),
        ];
        let scaled: Vec<_> = segments
            .into_iter()
            .scaled(ScaleFactor::Fractional(0.4))
            .collect();
        assert_eq!(
            scaled,
            vec![Segment::unsigned(1, 66), Segment::unsigned(1, 67)]
        );
    }

    #[test]
    fn integer_scaling_is_exact() {
        let scaled: Vec<_> = vec![Segment::unsigned(3, 1)]
            .into_iter()
            .scaled(ScaleFactor::Integer(4))
            .collect();
        assert_eq!(scaled, vec![Segment::unsigned(12, 1)]);
    }
}
