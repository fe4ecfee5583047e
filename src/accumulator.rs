//! Partial reduction values carried through a backend's reduction mechanism.

/// A partial reduction: a value of the caller's type `U` plus the caller's
/// `combine` function.
///
/// Native parallel reductions (a per-worker private copy merged at a join
/// point, or a leaf result joined with its sibling) only ever need one
/// operation on their payload: [`Accumulator::merge`]. Wrapping the value
/// this way lets any `U`, arithmetic or not, ride on them.
///
/// An accumulator lives for one `transform_reduce` call and is consumed when
/// merged.
#[derive(Debug)]
pub struct Accumulator<'c, U, C> {
    value: U,
    combine: &'c C,
}

impl<'c, U, C> Accumulator<'c, U, C>
where
    C: Fn(U, U) -> U,
{
    /// Start from `value`, typically a clone of the reduction's `init`.
    #[inline]
    pub fn new(value: U, combine: &'c C) -> Self {
        Self { value, combine }
    }

    /// Fold one transformed element into the accumulator.
    #[inline]
    pub fn fold(self, item: U) -> Self {
        Self {
            value: (self.combine)(self.value, item),
            combine: self.combine,
        }
    }

    /// Merge `other` into `self`; `self` is the left operand of `combine`.
    #[inline]
    pub fn merge(self, other: Self) -> Self {
        self.fold(other.value)
    }

    /// Merge a sequence of accumulators pairwise, neighbours first, keeping
    /// their relative order.
    ///
    /// Returns `None` for an empty sequence.
    pub fn merge_pairwise(parts: Vec<Self>) -> Option<Self> {
        let mut level = parts;
        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len().div_ceil(2));
            let mut it = level.into_iter();
            while let Some(left) = it.next() {
                next.push(match it.next() {
                    Some(right) => left.merge(right),
                    None => left,
                });
            }
            level = next;
        }
        level.pop()
    }

    /// Borrow the current value.
    #[inline]
    pub fn value(&self) -> &U {
        &self.value
    }

    /// Consume the accumulator, returning its value.
    #[inline]
    pub fn into_inner(self) -> U {
        self.value
    }
}
