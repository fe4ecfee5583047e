//! Work-stealing task backend over recursively split blocked ranges.
//!
//! The range is wrapped in a [`BlockedRange`] and handed to rayon's adaptive
//! splitter. rayon decides how deep to split: it starts with about one piece
//! per thread and splits further whenever a piece is stolen. Each leaf is
//! walked sequentially in canonical order; reductions fold a leaf into a
//! partial value seeded with `init` and join sibling partials with
//! `combine` up rayon's join tree.

use crate::accumulator::Accumulator;
use crate::executor::Executor;
use crate::maybe_sync::{MaybeSendSync, MaybeSync};
use crate::range::{Range, RangeIndex};
use crate::threading::{split_for_each, split_reduce};

/// A [`Range`] that can be halved along its largest dimension.
///
/// A blocked range is divisible while some dimension spans more than `grain`
/// indices. Splitting cuts the largest such dimension in half; on ties the
/// outermost dimension is cut, which keeps leaves contiguous along the
/// innermost dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockedRange<T, const N: usize> {
    range: Range<T, N>,
    grain: usize,
}

impl<T: RangeIndex, const N: usize> BlockedRange<T, N> {
    /// Wrap `range` with a minimum per-dimension extent of `grain` (at least 1).
    pub fn new(range: Range<T, N>, grain: usize) -> Self {
        Self {
            range,
            grain: grain.max(1),
        }
    }

    /// The wrapped range.
    #[inline]
    pub fn range(&self) -> &Range<T, N> {
        &self.range
    }

    /// The minimum extent below which a dimension is not cut.
    #[inline]
    pub fn grain(&self) -> usize {
        self.grain
    }

    /// The dimension a split would cut, or `None` if the range is a leaf.
    pub fn split_dim(&self) -> Option<usize> {
        let (dim, extent) = (0..N)
            .map(|d| (d, self.range.extent(d)))
            .fold((0, 0), |best, cur| if cur.1 >= best.1 { cur } else { best });
        (extent > self.grain).then_some(dim)
    }

    /// True if [`BlockedRange::split`] would produce two pieces.
    #[inline]
    pub fn is_divisible(&self) -> bool {
        self.split_dim().is_some()
    }

    /// Halve the range, or return it unchanged with `None` if it is a leaf.
    ///
    /// The first piece keeps the lower half of the cut dimension.
    pub fn split(self) -> (Self, Option<Self>) {
        let Some(d) = self.split_dim() else {
            return (self, None);
        };
        let (begin, end) = self.range.bounds(d);
        let mid = begin.advance(self.range.extent(d) / 2);
        let lower = Self {
            range: self.range.with_bounds(d, begin, mid),
            grain: self.grain,
        };
        let upper = Self {
            range: self.range.with_bounds(d, mid, end),
            grain: self.grain,
        };
        (lower, Some(upper))
    }
}

/// Recursive splitting with work stealing, grain size left to rayon.
///
/// Every tuple is visited exactly once. Leaves run in canonical order;
/// the order between leaves is unspecified.
///
/// # Example
/// ```rust
/// use strided_par::{for_each, range2, WorkStealingExecutor};
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// let sum = AtomicU64::new(0);
/// for_each(&WorkStealingExecutor::new(), &range2(0u64, 100, 0, 100), |[i, j]| {
///     sum.fetch_add(i * j, Ordering::Relaxed);
/// });
/// assert_eq!(sum.into_inner(), 4950 * 4950);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkStealingExecutor {
    grain: usize,
}

impl Default for WorkStealingExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkStealingExecutor {
    /// Executor that may split down to single indices.
    pub const fn new() -> Self {
        Self { grain: 1 }
    }

    /// Stop splitting a dimension once it spans `grain` indices or fewer.
    pub const fn with_grain(mut self, grain: usize) -> Self {
        self.grain = grain;
        self
    }

    /// The configured grain.
    pub fn grain(&self) -> usize {
        self.grain
    }

    fn run<T, F, const N: usize>(&self, range: &Range<T, N>, f: &F)
    where
        T: RangeIndex,
        F: Fn([T; N]) + MaybeSync,
    {
        if range.is_empty() {
            return;
        }
        tracing::trace!(ndim = N, grain = self.grain, "work-stealing for_each");
        split_for_each(
            BlockedRange::new(*range, self.grain),
            BlockedRange::split,
            |leaf| leaf.range().iter().for_each(f),
        );
    }

    fn run_reduce<T, U, C, F, const N: usize>(
        &self,
        range: &Range<T, N>,
        init: U,
        combine: &C,
        transform: &F,
    ) -> U
    where
        T: RangeIndex,
        U: Clone + MaybeSendSync,
        C: Fn(U, U) -> U + MaybeSync,
        F: Fn([T; N]) -> U + MaybeSync,
    {
        if range.is_empty() {
            return init;
        }
        tracing::trace!(ndim = N, grain = self.grain, "work-stealing transform_reduce");
        split_reduce(
            BlockedRange::new(*range, self.grain),
            BlockedRange::split,
            |leaf| {
                let seed = Accumulator::new(init.clone(), combine);
                leaf.range()
                    .iter()
                    .fold(seed, |acc, idx| acc.fold(transform(idx)))
            },
            Accumulator::merge,
        )
        .map_or(init, Accumulator::into_inner)
    }
}

impl Executor for WorkStealingExecutor {
    fn for_each_1d<T, F>(&self, range: &Range<T, 1>, f: &F)
    where
        T: RangeIndex,
        F: Fn([T; 1]) + MaybeSync,
    {
        self.run(range, f)
    }

    fn for_each_2d<T, F>(&self, range: &Range<T, 2>, f: &F)
    where
        T: RangeIndex,
        F: Fn([T; 2]) + MaybeSync,
    {
        self.run(range, f)
    }

    fn for_each_3d<T, F>(&self, range: &Range<T, 3>, f: &F)
    where
        T: RangeIndex,
        F: Fn([T; 3]) + MaybeSync,
    {
        self.run(range, f)
    }

    fn transform_reduce_1d<T, U, C, F>(
        &self,
        range: &Range<T, 1>,
        init: U,
        combine: &C,
        transform: &F,
    ) -> U
    where
        T: RangeIndex,
        U: Clone + MaybeSendSync,
        C: Fn(U, U) -> U + MaybeSync,
        F: Fn([T; 1]) -> U + MaybeSync,
    {
        self.run_reduce(range, init, combine, transform)
    }

    fn transform_reduce_2d<T, U, C, F>(
        &self,
        range: &Range<T, 2>,
        init: U,
        combine: &C,
        transform: &F,
    ) -> U
    where
        T: RangeIndex,
        U: Clone + MaybeSendSync,
        C: Fn(U, U) -> U + MaybeSync,
        F: Fn([T; 2]) -> U + MaybeSync,
    {
        self.run_reduce(range, init, combine, transform)
    }

    fn transform_reduce_3d<T, U, C, F>(
        &self,
        range: &Range<T, 3>,
        init: U,
        combine: &C,
        transform: &F,
    ) -> U
    where
        T: RangeIndex,
        U: Clone + MaybeSendSync,
        C: Fn(U, U) -> U + MaybeSync,
        F: Fn([T; 3]) -> U + MaybeSync,
    {
        self.run_reduce(range, init, combine, transform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::{range1, range2, range3};
    use crate::threading::on_pool;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[test]
    fn test_split_picks_largest_dim() {
        let b = BlockedRange::new(range2(0u32, 10, 0, 4), 1);
        assert_eq!(b.split_dim(), Some(0));
        let (lo, hi) = b.split();
        assert_eq!(*lo.range(), range2(0, 5, 0, 4));
        assert_eq!(*hi.unwrap().range(), range2(5, 10, 0, 4));
    }

    #[test]
    fn test_split_ties_cut_outermost() {
        let b = BlockedRange::new(range3(0u32, 6, 0, 6, 0, 6), 1);
        assert_eq!(b.split_dim(), Some(2));
    }

    #[test]
    fn test_split_odd_extent_signed() {
        let (lo, hi) = BlockedRange::new(range1(-3i64, 4), 1).split();
        assert_eq!(*lo.range(), range1(-3, 0));
        assert_eq!(*hi.unwrap().range(), range1(0, 4));
    }

    #[test]
    fn test_grain_stops_splitting() {
        let b = BlockedRange::new(range2(0u8, 8, 0, 8), 8);
        assert!(!b.is_divisible());
        let (same, none) = b.split();
        assert_eq!(same, b);
        assert!(none.is_none());
        assert_eq!(BlockedRange::new(range1(0u8, 1), 0).grain(), 1);
    }

    #[test]
    fn test_recursive_split_tiles_range() {
        fn collect(b: BlockedRange<u32, 2>, out: &mut Vec<Range<u32, 2>>) {
            match b.split() {
                (lo, Some(hi)) => {
                    collect(lo, out);
                    collect(hi, out);
                }
                (leaf, None) => out.push(*leaf.range()),
            }
        }
        let mut leaves = Vec::new();
        collect(BlockedRange::new(range2(0, 13, 2, 9), 3), &mut leaves);
        let mut seen = HashSet::new();
        for leaf in &leaves {
            assert!(leaf.extents().iter().all(|&e| (1..=3).contains(&e)));
            for idx in leaf {
                assert!(seen.insert(idx), "{idx:?} visited twice");
            }
        }
        assert_eq!(seen.len(), 13 * 7);
    }

    #[test]
    fn test_for_each_visits_all() {
        let r = range3(0u16, 9, 0, 4, 0, 5);
        let seen = Mutex::new(Vec::new());
        on_pool(4, || {
            WorkStealingExecutor::new().for_each_3d(&r, &|idx| seen.lock().unwrap().push(idx))
        });
        let mut seen = seen.into_inner().unwrap();
        seen.sort_by_key(|&[i, j, k]| (k, j, i));
        let expected: Vec<[u16; 3]> = r.iter().collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_reduce_with_grain() {
        let r = range2(0u64, 300, 0, 7);
        for grain in [1, 16, 1000] {
            let exec = WorkStealingExecutor::new().with_grain(grain);
            let sum = on_pool(4, || {
                exec.transform_reduce_2d(&r, 0u64, &|a, b| a + b, &|[i, j]| i + 1000 * j)
            });
            assert_eq!(sum, 7 * (299 * 300 / 2) + 300 * 1000 * 21);
        }
    }

    #[test]
    fn test_reduce_joins_leaves_in_order() {
        // Sibling leaves are joined left before right, so concatenation
        // comes back in canonical order along the split dimension.
        let r = range1(0u32, 64);
        let expected: String = r.iter().map(|[i]| format!("{i},")).collect();
        let s = on_pool(4, || {
            WorkStealingExecutor::new().transform_reduce_1d(
                &r,
                String::new(),
                &|a: String, b: String| a + &b,
                &|[i]| format!("{i},"),
            )
        });
        assert_eq!(s, expected);
    }

    #[test]
    fn test_reduce_vec_accumulator() {
        // Histogram of i % 4 as a non-arithmetic accumulator.
        let exec = WorkStealingExecutor::new();
        let hist = exec.transform_reduce_1d(
            &range1(0usize, 1001),
            vec![0usize; 4],
            &|mut a: Vec<usize>, b: Vec<usize>| {
                a.iter_mut().zip(b).for_each(|(x, y)| *x += y);
                a
            },
            &|[i]| {
                let mut h = vec![0usize; 4];
                h[i % 4] = 1;
                h
            },
        );
        assert_eq!(hist, vec![251, 250, 250, 250]);
    }
}
