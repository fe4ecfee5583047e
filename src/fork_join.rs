//! Fork-join loop backend with static or dynamic scheduling.
//!
//! The range is collapsed into one flat iteration space `[0, len)` in
//! canonical order (dimension 0 fastest). A parallel region starts one worker
//! per pool thread; the [`Schedule`] decides which flat positions each worker
//! executes. Consecutive flat positions are walked with an odometer, so a
//! worker unravels its starting tuple once per block or chunk.
//!
//! Reductions give each worker a private [`Accumulator`] seeded with a clone
//! of `init`. After the region joins, the private accumulators are merged
//! pairwise in worker order.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::accumulator::Accumulator;
use crate::executor::Executor;
use crate::maybe_sync::{MaybeSendSync, MaybeSync};
use crate::range::{Range, RangeIndex};
use crate::threading::{parallel_region, region_width, WorkerCtx};

/// How the collapsed iteration space is distributed over workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Schedule {
    /// One contiguous block per worker, sized evenly when the region starts.
    /// The first `len % workers` workers take one extra iteration.
    #[default]
    Static,
    /// Workers repeatedly claim `chunk` consecutive iterations from a shared
    /// cursor until the space is exhausted. A chunk of at least `len` hands
    /// the whole space to the first claimant.
    Dynamic { chunk: usize },
}

impl Schedule {
    /// Dynamic scheduling with one iteration per claim.
    pub const fn dynamic() -> Self {
        Schedule::Dynamic { chunk: 1 }
    }
}

/// Parallel loop over the collapsed iteration space of a 1-, 2- or
/// 3-dimensional range.
///
/// Every tuple is visited exactly once, by exactly one worker. The order in
/// which workers run is unspecified; inside one block or chunk tuples follow
/// the canonical order.
///
/// # Example
/// ```rust
/// use strided_par::{transform_reduce, range3, ForkJoinExecutor};
///
/// let exec = ForkJoinExecutor::dynamic_chunked(16);
/// let r = range3(0u32, 8, 0, 8, 0, 8);
/// let max = transform_reduce(&exec, &r, 0u32, |a, b| a.max(b), |[i, j, k]| i + j + k);
/// assert_eq!(max, 21);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForkJoinExecutor {
    schedule: Schedule,
    max_workers: Option<usize>,
}

impl ForkJoinExecutor {
    /// Executor using `schedule` on every pool thread.
    pub const fn new(schedule: Schedule) -> Self {
        Self {
            schedule,
            max_workers: None,
        }
    }

    /// Static scheduling.
    pub const fn static_schedule() -> Self {
        Self::new(Schedule::Static)
    }

    /// Dynamic scheduling with a chunk of one iteration.
    pub const fn dynamic() -> Self {
        Self::new(Schedule::dynamic())
    }

    /// Dynamic scheduling with `chunk` iterations per claim (0 is treated as 1).
    pub const fn dynamic_chunked(chunk: usize) -> Self {
        Self::new(Schedule::Dynamic { chunk })
    }

    /// Use at most `max_workers` pool threads (at least one).
    pub const fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = Some(max_workers);
        self
    }

    /// The configured schedule.
    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    /// Number of workers a region would use right now.
    pub fn num_workers(&self) -> usize {
        region_width(self.max_workers)
    }

    fn run<T, F, const N: usize>(&self, range: &Range<T, N>, f: &F)
    where
        T: RangeIndex,
        F: Fn([T; N]) + MaybeSync,
    {
        if range.is_empty() {
            return;
        }
        let len = range.len();
        tracing::trace!(ndim = N, len, schedule = ?self.schedule, "fork-join for_each");
        let cursor = AtomicUsize::new(0);
        parallel_region(self.max_workers, |ctx| {
            self.fold_assigned(ctx, len, &cursor, (), |(), start, count| {
                range.iter_span(start, count).for_each(f);
            });
        });
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
        let len = range.len();
        tracing::trace!(ndim = N, len, schedule = ?self.schedule, "fork-join transform_reduce");
        let cursor = AtomicUsize::new(0);
        let privates = parallel_region(self.max_workers, |ctx| {
            let private = Accumulator::new(init.clone(), combine);
            self.fold_assigned(ctx, len, &cursor, private, |acc, start, count| {
                range
                    .iter_span(start, count)
                    .fold(acc, |acc, idx| acc.fold(transform(idx)))
            })
        });
        Accumulator::merge_pairwise(privates).map_or(init, Accumulator::into_inner)
    }

    /// Fold `body(acc, start, count)` over every span of flat positions the
    /// schedule assigns to worker `ctx`.
    fn fold_assigned<A, B>(
        &self,
        ctx: WorkerCtx,
        len: usize,
        cursor: &AtomicUsize,
        init: A,
        mut body: B,
    ) -> A
    where
        B: FnMut(A, usize, usize) -> A,
    {
        match self.schedule {
            Schedule::Static => {
                let (start, count) = static_block(len, ctx.index, ctx.num_workers);
                if count == 0 {
                    return init;
                }
                body(init, start, count)
            }
            Schedule::Dynamic { chunk } => {
                let chunk = chunk.max(1);
                let mut acc = init;
                // Claims stop at `len` and never wrap.
                let claim = |c: usize| (c < len).then(|| c.saturating_add(chunk));
                while let Ok(start) =
                    cursor.fetch_update(Ordering::Relaxed, Ordering::Relaxed, claim)
                {
                    acc = body(acc, start, chunk.min(len - start));
                }
                acc
            }
        }
    }
}

/// The contiguous block of `[0, len)` owned by `worker` out of `workers`.
fn static_block(len: usize, worker: usize, workers: usize) -> (usize, usize) {
    let base = len / workers;
    let extra = len % workers;
    let count = base + usize::from(worker < extra);
    let start = worker * base + worker.min(extra);
    (start, count)
}

impl Executor for ForkJoinExecutor {
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
