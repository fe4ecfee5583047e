//! Single-threaded reference backend.

use crate::executor::Executor;
use crate::maybe_sync::{MaybeSendSync, MaybeSync};
use crate::range::{Range, RangeIndex};

/// Nested loops on the calling thread.
///
/// Dimension `N - 1` is the outermost loop and dimension 0 the innermost, so
/// tuples are visited in lexicographic order with dimension 0 fastest.
/// Reductions keep one running accumulator and apply
/// `acc = combine(acc, transform(idx))` once per tuple in that order.
///
/// Every other backend is checked against this one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequentialExecutor;

impl Executor for SequentialExecutor {
    fn for_each_1d<T, F>(&self, range: &Range<T, 1>, f: &F)
    where
        T: RangeIndex,
        F: Fn([T; 1]) + MaybeSync,
    {
        for i0 in range.axis(0) {
            f([i0]);
        }
    }

    fn for_each_2d<T, F>(&self, range: &Range<T, 2>, f: &F)
    where
        T: RangeIndex,
        F: Fn([T; 2]) + MaybeSync,
    {
        if range.is_empty() {
            return;
        }
        for i1 in range.axis(1) {
            for i0 in range.axis(0) {
                f([i0, i1]);
            }
        }
    }

    fn for_each_3d<T, F>(&self, range: &Range<T, 3>, f: &F)
    where
        T: RangeIndex,
        F: Fn([T; 3]) + MaybeSync,
    {
        if range.is_empty() {
            return;
        }
        for i2 in range.axis(2) {
            for i1 in range.axis(1) {
                for i0 in range.axis(0) {
                    f([i0, i1, i2]);
                }
            }
        }
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
        let mut acc = init;
        for i0 in range.axis(0) {
            acc = combine(acc, transform([i0]));
        }
        acc
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
        let mut acc = init;
        if range.is_empty() {
            return acc;
        }
        for i1 in range.axis(1) {
            for i0 in range.axis(0) {
                acc = combine(acc, transform([i0, i1]));
            }
        }
        acc
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
        let mut acc = init;
        if range.is_empty() {
            return acc;
        }
        for i2 in range.axis(2) {
            for i1 in range.axis(1) {
                for i0 in range.axis(0) {
                    acc = combine(acc, transform([i0, i1, i2]));
                }
            }
        }
        acc
    }
}
