//! N-dimensional half-open integer ranges.
//!
//! A [`Range<T, N>`] is the Cartesian product of `N` intervals
//! `[begin[d], end[d])`. Dimension 0 is innermost: ordered traversals advance
//! it first and carry into dimension 1, and so on up to dimension `N - 1`.
//!
//! No ordering is enforced between `begin[d]` and `end[d]`; a dimension with
//! `begin[d] >= end[d]` makes the whole range empty.

use std::fmt::Debug;
use std::hash::Hash;

use num_traits::{NumCast, PrimInt};

use crate::{ParError, Result};

/// Integer element type of a [`Range`].
///
/// Blanket-implemented for every primitive integer type, signed or unsigned.
pub trait RangeIndex: PrimInt + Hash + Debug + Send + Sync + 'static {
    /// Number of indices in `[self, end)`, zero if `self >= end`.
    ///
    /// Saturates at `usize::MAX` when the count does not fit in `usize`.
    #[inline]
    fn distance(self, end: Self) -> usize {
        if self >= end {
            return 0;
        }
        match end.checked_sub(&self).and_then(|d| d.to_usize()) {
            Some(d) => d,
            None => {
                let wide = end.to_i128().zip(self.to_i128()).map(|(e, b)| e - b);
                wide.and_then(|d| usize::try_from(d).ok()).unwrap_or(usize::MAX)
            }
        }
    }

    /// The index `n` steps after `self`.
    ///
    /// The caller guarantees the result lies within an interval starting at
    /// `self`, so it is representable.
    #[inline]
    fn advance(self, n: usize) -> Self {
        if let Some(v) = <Self as NumCast>::from(n).and_then(|d| self.checked_add(&d)) {
            return v;
        }
        let wide = self
            .to_i128()
            .zip(i128::try_from(n).ok())
            .and_then(|(b, d)| b.checked_add(d))
            .and_then(<Self as NumCast>::from);
        match wide {
            Some(v) => v,
            None => unreachable!("{:?} + {} leaves the index type", self, n),
        }
    }
}

impl<T> RangeIndex for T where T: PrimInt + Hash + Debug + Send + Sync + 'static {}

/// A rectangular box of integer index tuples.
///
/// # Type Parameters
/// - `T`: Integer element type
/// - `N`: Number of dimensions (const generic, at least 1)
///
/// # Example
/// ```rust
/// use strided_par::Range;
///
/// let r = Range::new([0u32, 10], [4, 12]);
/// assert_eq!(r.extents(), [4, 2]);
/// assert_eq!(r.len(), 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range<T, const N: usize> {
    begin: [T; N],
    end: [T; N],
}

/// One-dimensional range `[b0, e0)`.
#[inline]
pub fn range1<T: RangeIndex>(b0: T, e0: T) -> Range<T, 1> {
    Range::new([b0], [e0])
}

/// Two-dimensional range; `(b0, e0)` bounds the innermost dimension.
#[inline]
pub fn range2<T: RangeIndex>(b0: T, e0: T, b1: T, e1: T) -> Range<T, 2> {
    Range::new([b0, b1], [e0, e1])
}

/// Three-dimensional range; `(b0, e0)` bounds the innermost dimension.
#[inline]
pub fn range3<T: RangeIndex>(b0: T, e0: T, b1: T, e1: T, b2: T, e2: T) -> Range<T, 3> {
    Range::new([b0, b1, b2], [e0, e1, e2])
}

impl<T: RangeIndex, const N: usize> Range<T, N> {
    /// Create a range from per-dimension bounds.
    #[inline]
    pub fn new(begin: [T; N], end: [T; N]) -> Self {
        const { assert!(N >= 1, "a range needs at least one dimension") };
        Self { begin, end }
    }

    /// Zero-based range `[0, extents[d])` in every dimension.
    pub fn from_extents(extents: [T; N]) -> Self {
        Self::new([T::zero(); N], extents)
    }

    /// Lower bounds, one per dimension.
    #[inline]
    pub fn begin(&self) -> &[T; N] {
        &self.begin
    }

    /// Exclusive upper bounds, one per dimension.
    #[inline]
    pub fn end(&self) -> &[T; N] {
        &self.end
    }

    /// Number of dimensions.
    #[inline]
    pub fn ndim(&self) -> usize {
        N
    }

    /// `(begin, end)` of dimension `d`.
    #[inline]
    pub fn bounds(&self, d: usize) -> (T, T) {
        (self.begin[d], self.end[d])
    }

    /// Number of indices along dimension `d`.
    #[inline]
    pub fn extent(&self, d: usize) -> usize {
        self.begin[d].distance(self.end[d])
    }

    /// Number of indices along every dimension.
    pub fn extents(&self) -> [usize; N] {
        std::array::from_fn(|d| self.extent(d))
    }

    /// True if some dimension has `begin >= end`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.begin.iter().zip(self.end.iter()).any(|(b, e)| b >= e)
    }

    /// Total number of index tuples, or [`ParError::VolumeOverflow`].
    pub fn checked_len(&self) -> Result<usize> {
        if self.is_empty() {
            return Ok(0);
        }
        (0..N).try_fold(1usize, |acc, d| {
            acc.checked_mul(self.extent(d)).ok_or(ParError::VolumeOverflow)
        })
    }

    /// Total number of index tuples.
    ///
    /// # Panics
    /// Panics if the count does not fit in `usize`.
    pub fn len(&self) -> usize {
        match self.checked_len() {
            Ok(n) => n,
            Err(e) => panic!("{}: {:?}", e, self),
        }
    }

    /// True if `idx` lies inside the range.
    pub fn contains(&self, idx: &[T; N]) -> bool {
        (0..N).all(|d| self.begin[d] <= idx[d] && idx[d] < self.end[d])
    }

    /// The indices of dimension `d` in increasing order.
    pub fn axis(&self, d: usize) -> impl Iterator<Item = T> {
        let begin = self.begin[d];
        (0..self.extent(d)).map(move |k| begin.advance(k))
    }

    /// Remove dimension `d`, returning an `N - 1`-dimensional range.
    ///
    /// `M` must equal `N - 1`; this is checked at compile time.
    ///
    /// `d` must be less than `N`. Violations are asserted in debug builds
    /// only; use [`Range::try_remove_dim`] for a checked variant.
    ///
    /// # Example
    /// ```rust
    /// use strided_par::{range3, Range};
    ///
    /// let r = range3(0u8, 2, 5, 7, 1, 9);
    /// let sub: Range<u8, 2> = r.remove_dim(1);
    /// assert_eq!(sub, Range::new([0, 1], [2, 9]));
    /// ```
    pub fn remove_dim<const M: usize>(&self, d: usize) -> Range<T, M> {
        const { assert!(M + 1 == N, "remove_dim must drop exactly one dimension") };
        debug_assert!(d < N, "invalid dimension {} for rank {}", d, N);
        let mut begin = [T::zero(); M];
        let mut end = [T::zero(); M];
        let kept = (0..N).filter(|&k| k != d);
        for (slot, k) in kept.take(M).enumerate() {
            begin[slot] = self.begin[k];
            end[slot] = self.end[k];
        }
        Range::new(begin, end)
    }

    /// Checked [`Range::remove_dim`].
    pub fn try_remove_dim<const M: usize>(&self, d: usize) -> Result<Range<T, M>> {
        if d >= N {
            return Err(ParError::InvalidDim { dim: d, rank: N });
        }
        Ok(self.remove_dim(d))
    }

    /// Concatenate `self` and `other` into an `N + M`-dimensional range.
    ///
    /// `other`'s dimensions follow `self`'s, so they become the outer ones.
    /// `K` must equal `N + M`; this is checked at compile time.
    ///
    /// # Example
    /// ```rust
    /// use strided_par::{range1, range2, Range};
    ///
    /// let r: Range<i32, 3> = range2(0, 4, -2, 2).product(&range1(7, 8));
    /// assert_eq!(r, Range::new([0, -2, 7], [4, 2, 8]));
    /// ```
    pub fn product<const M: usize, const K: usize>(&self, other: &Range<T, M>) -> Range<T, K> {
        const { assert!(K == N + M, "product rank must be the sum of both ranks") };
        let begin = std::array::from_fn(|k| {
            if k < N {
                self.begin[k]
            } else {
                other.begin[k - N]
            }
        });
        let end = std::array::from_fn(|k| {
            if k < N {
                self.end[k]
            } else {
                other.end[k - N]
            }
        });
        Range::new(begin, end)
    }

    /// The leading `K` dimensions, `K <= N`.
    ///
    /// Used by the dispatch layer on the arity branch where `K == N`, and to
    /// cut the innermost block out of a higher-dimensional range.
    pub(crate) fn leading<const K: usize>(&self) -> Range<T, K> {
        debug_assert!(K <= N, "leading({}) of a rank-{} range", K, N);
        Range::new(
            std::array::from_fn(|k| self.begin[k]),
            std::array::from_fn(|k| self.end[k]),
        )
    }

    /// Replace the bounds of dimension `d`.
    pub(crate) fn with_bounds(mut self, d: usize, begin: T, end: T) -> Self {
        self.begin[d] = begin;
        self.end[d] = end;
        self
    }

    /// Every index tuple in canonical order (dimension 0 fastest).
    pub fn iter(&self) -> RangeIter<T, N> {
        RangeIter::new(*self, 0, self.len())
    }

    /// `len` consecutive tuples of the canonical order, starting at the
    /// tuple with flattened position `start`.
    pub(crate) fn iter_span(&self, start: usize, len: usize) -> RangeIter<T, N> {
        RangeIter::new(*self, start, len)
    }
}

impl<T: RangeIndex, const N: usize> IntoIterator for &Range<T, N> {
    type Item = [T; N];
    type IntoIter = RangeIter<T, N>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Odometer over a [`Range`] in canonical order.
///
/// Created by [`Range::iter`].
#[derive(Debug, Clone)]
pub struct RangeIter<T, const N: usize> {
    range: Range<T, N>,
    current: [T; N],
    remaining: usize,
}

impl<T: RangeIndex, const N: usize> RangeIter<T, N> {
    fn new(range: Range<T, N>, start: usize, len: usize) -> Self {
        let mut current = range.begin;
        if len > 0 {
            // Unravel the flattened start position, dimension 0 fastest.
            let mut rest = start;
            for (d, slot) in current.iter_mut().enumerate() {
                let ext = range.extent(d);
                *slot = range.begin[d].advance(rest % ext);
                rest /= ext;
            }
        }
        Self {
            range,
            current,
            remaining: len,
        }
    }
}

impl<T: RangeIndex, const N: usize> Iterator for RangeIter<T, N> {
    type Item = [T; N];

    #[inline]
    fn next(&mut self) -> Option<[T; N]> {
        if self.remaining == 0 {
            return None;
        }
        let out = self.current;
        self.remaining -= 1;
        if self.remaining > 0 {
            for d in 0..N {
                let next = self.current[d] + T::one();
                if next < self.range.end[d] {
                    self.current[d] = next;
                    break;
                }
                self.current[d] = self.range.begin[d];
            }
        }
        Some(out)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T: RangeIndex, const N: usize> ExactSizeIterator for RangeIter<T, N> {}
