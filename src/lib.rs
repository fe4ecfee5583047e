//! Data-parallel for-each and transform-reduce over N-dimensional integer ranges.
//!
//! A [`Range`] describes a rectangular box of integer index tuples. The two
//! entry points, [`for_each`] and [`transform_reduce`], apply a closure to every
//! tuple of the box and hand the work to an [`Executor`] backend chosen by the
//! caller at compile time.
//!
//! Backends only implement 1-, 2- and 3-dimensional primitives. Ranges of
//! higher dimension are decomposed by the dispatch layer: dimensions `3..N`
//! are peeled sequentially on the calling thread and only the innermost
//! three dimensions reach the backend.
//!
//! # Backends
//!
//! - [`SequentialExecutor`]: single-threaded nested loops; the reference oracle
//! - [`ForkJoinExecutor`]: a parallel region over the collapsed iteration space,
//!   with a [`Schedule::Static`] or [`Schedule::Dynamic`] distribution
//! - [`WorkStealingExecutor`]: recursive splitting of a [`BlockedRange`] driven
//!   by rayon's work-stealing scheduler
//!
//! # Conventions
//!
//! Dimension 0 is innermost: it varies fastest in every ordered traversal, and
//! index tuples are passed to closures as `[i0, i1, ..., iN-1]`.
//!
//! Parallel reductions seed every worker (or leaf) with a clone of `init`, so
//! `init` must be an identity of `combine`, and `combine` must be associative.
//! Results are bitwise reproducible across runs only when `combine` is also
//! commutative.
//!
//! # Example
//!
//! ```rust
//! use strided_par::{for_each, range2, transform_reduce, ForkJoinExecutor, SequentialExecutor};
//!
//! let r = range2(0u32, 4, 0, 3);
//!
//! let total = transform_reduce(&ForkJoinExecutor::dynamic(), &r, 0u64, |a, b| a + b, |[i, j]| {
//!     (i * 10 + j) as u64
//! });
//! let oracle = transform_reduce(&SequentialExecutor, &r, 0u64, |a, b| a + b, |[i, j]| {
//!     (i * 10 + j) as u64
//! });
//! assert_eq!(total, oracle);
//!
//! let visited = std::sync::atomic::AtomicUsize::new(0);
//! for_each(&SequentialExecutor, &r, |_| {
//!     visited.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
//! });
//! assert_eq!(visited.into_inner(), 12);
//! ```
//!
//! # Features
//!
//! - `parallel` (default): links rayon. Without it the parallel executors keep
//!   their partition and merge protocol but run every worker on the calling
//!   thread, and the [`MaybeSend`]/[`MaybeSync`] bounds accept any type.

mod accumulator;
mod dispatch;
mod executor;
mod fork_join;
mod maybe_sync;
mod range;
mod sequential;
mod threading;
mod work_stealing;

// ============================================================================
// Range model
// ============================================================================
pub use range::{range1, range2, range3, Range, RangeIndex, RangeIter};

// ============================================================================
// Entry points
// ============================================================================
pub use dispatch::{for_each, transform_reduce};

// ============================================================================
// Executors
// ============================================================================
pub use accumulator::Accumulator;
pub use executor::Executor;
pub use fork_join::{ForkJoinExecutor, Schedule};
pub use sequential::SequentialExecutor;
pub use work_stealing::{BlockedRange, WorkStealingExecutor};

// ============================================================================
// Threading
// ============================================================================
pub use maybe_sync::{MaybeSend, MaybeSendSync, MaybeSync};
#[cfg(feature = "parallel")]
pub use threading::configure_global_pool;
pub use threading::current_num_threads;

// ============================================================================
// Error types
// ============================================================================

/// Errors reported by the fallible range and pool operations.
#[derive(Debug, thiserror::Error)]
pub enum ParError {
    /// Dimension index out of range for the given rank.
    #[error("invalid dimension {dim} for rank {rank}")]
    InvalidDim { dim: usize, rank: usize },

    /// The number of index tuples in a range does not fit in `usize`.
    #[error("range volume overflows usize")]
    VolumeOverflow,

    /// The global rayon pool could not be configured.
    #[cfg(feature = "parallel")]
    #[error("failed to build thread pool: {0}")]
    ThreadPoolBuild(#[from] rayon::ThreadPoolBuildError),
}

/// Result type for fallible range and pool operations.
pub type Result<T> = std::result::Result<T, ParError>;
