//! Arity dispatch and generic N-dimensional decomposition.
//!
//! `N` is a const generic, so the `match N` arms below are resolved at
//! monomorphization: a rank-2 call compiles down to a direct
//! `for_each_2d` call.
//!
//! For `N > 3` the outer dimensions `3..N` are peeled one index at a time, in
//! increasing order, on the calling thread. Each peel fixes one slot of an
//! index array; once only dimensions 0, 1 and 2 are left the executor's
//! 3-dimensional primitive runs over them with the fixed outer slots copied
//! into every tuple. Only dimensions 0, 1 and 2 are therefore parallelized.

use crate::executor::Executor;
use crate::maybe_sync::{MaybeSendSync, MaybeSync};
use crate::range::{Range, RangeIndex};

/// Apply `body` to every index tuple of `range` using `executor`.
///
/// Tuples are passed as `[i0, i1, ..., iN-1]`. `body` may run concurrently on
/// several threads; whatever it mutates must be synchronized by the caller.
///
/// An empty range performs no calls.
///
/// # Example
/// ```rust
/// use strided_par::{for_each, Range, ForkJoinExecutor};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// let r = Range::from_extents([3u32, 3, 3, 3, 3]);
/// let hits = AtomicUsize::new(0);
/// for_each(&ForkJoinExecutor::static_schedule(), &r, |[_, _, _, _, i4]| {
///     if i4 == 2 {
///         hits.fetch_add(1, Ordering::Relaxed);
///     }
/// });
/// assert_eq!(hits.into_inner(), 81);
/// ```
pub fn for_each<E, T, F, const N: usize>(executor: &E, range: &Range<T, N>, body: F)
where
    E: Executor,
    T: RangeIndex,
    F: Fn([T; N]) + MaybeSync,
{
    if range.is_empty() {
        tracing::trace!(ndim = N, "for_each over empty range");
        return;
    }
    match N {
        1 => executor.for_each_1d(&range.leading::<1>(), &|idx: [T; 1]| body(widen(idx))),
        2 => executor.for_each_2d(&range.leading::<2>(), &|idx: [T; 2]| body(widen(idx))),
        3 => executor.for_each_3d(&range.leading::<3>(), &|idx: [T; 3]| body(widen(idx))),
        _ => {
            let _span = tracing::debug_span!("for_each_nd", ndim = N).entered();
            let inner = range.leading::<3>();
            let mut outer = *range.begin();
            peel_for_each(executor, range, &inner, N - 1, &mut outer, &body);
        }
    }
}

/// Combine `transform(idx)` over every index tuple of `range` with
/// `combine`, starting from `init`.
///
/// `combine` must be associative and `init` an identity of it: parallel
/// executors seed every partial result with a clone of `init` and merge the
/// partials in an unspecified grouping. The result is reproducible across
/// runs only if `combine` is also commutative.
///
/// An empty range returns `init` unchanged.
///
/// For `N > 3` the running result is threaded through the peeled outer
/// dimensions as `acc = combine(acc, reduce(inner, init))`, one inner
/// reduction per outer index tuple.
///
/// # Example
/// ```rust
/// use strided_par::{range1, transform_reduce, WorkStealingExecutor};
///
/// let dot = transform_reduce(
///     &WorkStealingExecutor::new(),
///     &range1(0usize, 1000),
///     0.0f64,
///     |a, b| a + b,
///     |[i]| (i as f64) * 0.5,
/// );
/// assert!((dot - 249_750.0).abs() < 1e-9);
/// ```
pub fn transform_reduce<E, T, U, C, F, const N: usize>(
    executor: &E,
    range: &Range<T, N>,
    init: U,
    combine: C,
    transform: F,
) -> U
where
    E: Executor,
    T: RangeIndex,
    U: Clone + MaybeSendSync,
    C: Fn(U, U) -> U + MaybeSync,
    F: Fn([T; N]) -> U + MaybeSync,
{
    if range.is_empty() {
        tracing::trace!(ndim = N, "transform_reduce over empty range");
        return init;
    }
    match N {
        1 => executor.transform_reduce_1d(
            &range.leading::<1>(),
            init,
            &combine,
            &|idx: [T; 1]| transform(widen(idx)),
        ),
        2 => executor.transform_reduce_2d(
            &range.leading::<2>(),
            init,
            &combine,
            &|idx: [T; 2]| transform(widen(idx)),
        ),
        3 => executor.transform_reduce_3d(
            &range.leading::<3>(),
            init,
            &combine,
            &|idx: [T; 3]| transform(widen(idx)),
        ),
        _ => {
            let _span = tracing::debug_span!("transform_reduce_nd", ndim = N).entered();
            let inner = range.leading::<3>();
            let mut outer = *range.begin();
            let seed = init.clone();
            peel_reduce(
                executor,
                range,
                &inner,
                N - 1,
                &mut outer,
                &Reduction {
                    init: &init,
                    combine: &combine,
                    transform: &transform,
                },
                seed,
            )
        }
    }
}

/// Copy a `K`-element index into the leading slots of an `N`-element one.
///
/// Only called on the arity branch where `K == N`.
#[inline(always)]
fn widen<T: RangeIndex, const K: usize, const N: usize>(idx: [T; K]) -> [T; N] {
    debug_assert_eq!(K, N);
    let mut out = [T::zero(); N];
    out[..K].copy_from_slice(&idx);
    out
}

/// Run `body` over dimensions `0..=dim` of `range` with the slots above
/// `dim` already fixed in `outer`.
fn peel_for_each<E, T, F, const N: usize>(
    executor: &E,
    range: &Range<T, N>,
    inner: &Range<T, 3>,
    dim: usize,
    outer: &mut [T; N],
    body: &F,
) where
    E: Executor,
    T: RangeIndex,
    F: Fn([T; N]) + MaybeSync,
{
    for i in range.axis(dim) {
        outer[dim] = i;
        if dim == 3 {
            let fixed = *outer;
            executor.for_each_3d(inner, &|[i0, i1, i2]: [T; 3]| {
                let mut idx = fixed;
                idx[0] = i0;
                idx[1] = i1;
                idx[2] = i2;
                body(idx)
            });
        } else {
            peel_for_each(executor, range, inner, dim - 1, outer, body);
        }
    }
}

/// The caller's reduction, borrowed once for the whole decomposition.
struct Reduction<'a, U, C, F> {
    init: &'a U,
    combine: &'a C,
    transform: &'a F,
}

/// Reduce dimensions `0..=dim` of `range` into `acc`, with the slots above
/// `dim` already fixed in `outer`.
fn peel_reduce<E, T, U, C, F, const N: usize>(
    executor: &E,
    range: &Range<T, N>,
    inner: &Range<T, 3>,
    dim: usize,
    outer: &mut [T; N],
    red: &Reduction<'_, U, C, F>,
    acc: U,
) -> U
where
    E: Executor,
    T: RangeIndex,
    U: Clone + MaybeSendSync,
    C: Fn(U, U) -> U + MaybeSync,
    F: Fn([T; N]) -> U + MaybeSync,
{
    let mut acc = acc;
    for i in range.axis(dim) {
        outer[dim] = i;
        let part = if dim == 3 {
            let fixed = *outer;
            let transform = red.transform;
            executor.transform_reduce_3d(
                inner,
                red.init.clone(),
                red.combine,
                &|[i0, i1, i2]: [T; 3]| {
                    let mut idx = fixed;
                    idx[0] = i0;
                    idx[1] = i1;
                    idx[2] = i2;
                    transform(idx)
                },
            )
        } else {
            peel_reduce(
                executor,
                range,
                inner,
                dim - 1,
                outer,
                red,
                red.init.clone(),
            )
        };
        acc = (red.combine)(acc, part);
    }
    acc
}
