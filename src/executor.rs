//! The capability contract every backend implements.

use crate::maybe_sync::{MaybeSendSync, MaybeSync};
use crate::range::{Range, RangeIndex};

/// A backend able to run for-each and transform-reduce over 1-, 2- and
/// 3-dimensional ranges.
///
/// Higher dimensions never reach an executor: [`crate::for_each`] and
/// [`crate::transform_reduce`] decompose them into 3-dimensional calls.
///
/// Only the 1-dimensional primitives are required. The 2- and
/// 3-dimensional defaults peel their outermost dimension sequentially and
/// call the primitive one arity lower, so a backend without a native
/// multi-dimensional loop parallelizes dimension 0 only.
///
/// Implementations hold configuration only; every call is self-contained.
///
/// # Contract
/// - every index tuple of a non-empty range is passed to the body exactly once
/// - an empty range performs no calls and reductions return `init` unchanged
/// - reductions may seed several partial results with clones of `init` and
///   merge them with `combine` in any grouping that preserves associativity
pub trait Executor {
    /// Apply `f` to every index of a 1-dimensional range.
    fn for_each_1d<T, F>(&self, range: &Range<T, 1>, f: &F)
    where
        T: RangeIndex,
        F: Fn([T; 1]) + MaybeSync;

    /// Apply `f` to every index tuple of a 2-dimensional range.
    fn for_each_2d<T, F>(&self, range: &Range<T, 2>, f: &F)
    where
        T: RangeIndex,
        F: Fn([T; 2]) + MaybeSync,
    {
        let inner: Range<T, 1> = range.remove_dim(1);
        for i1 in range.axis(1) {
            self.for_each_1d(&inner, &|[i0]: [T; 1]| f([i0, i1]));
        }
    }

    /// Apply `f` to every index tuple of a 3-dimensional range.
    fn for_each_3d<T, F>(&self, range: &Range<T, 3>, f: &F)
    where
        T: RangeIndex,
        F: Fn([T; 3]) + MaybeSync,
    {
        let inner: Range<T, 2> = range.remove_dim(2);
        for i2 in range.axis(2) {
            self.for_each_2d(&inner, &|[i0, i1]: [T; 2]| f([i0, i1, i2]));
        }
    }

    /// Combine `transform` over every index of a 1-dimensional range.
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
        F: Fn([T; 1]) -> U + MaybeSync;

    /// Combine `transform` over every index tuple of a 2-dimensional range.
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
        if range.is_empty() {
            return init;
        }
        let inner: Range<T, 1> = range.remove_dim(1);
        let mut acc = init.clone();
        for i1 in range.axis(1) {
            let part = self.transform_reduce_1d(&inner, init.clone(), combine, &|[i0]: [T; 1]| {
                transform([i0, i1])
            });
            acc = combine(acc, part);
        }
        acc
    }

    /// Combine `transform` over every index tuple of a 3-dimensional range.
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
        if range.is_empty() {
            return init;
        }
        let inner: Range<T, 2> = range.remove_dim(2);
        let mut acc = init.clone();
        for i2 in range.axis(2) {
            let part = self.transform_reduce_2d(
                &inner,
                init.clone(),
                combine,
                &|[i0, i1]: [T; 2]| transform([i0, i1, i2]),
            );
            acc = combine(acc, part);
        }
        acc
    }
}
