use approx::assert_relative_eq;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use strided_par::{
    for_each, range1, range2, range3, transform_reduce, Executor, ForkJoinExecutor, Range,
    Schedule, SequentialExecutor, WorkStealingExecutor,
};

/// Run `f` on a dedicated four-thread pool so the parallel backends always
/// spread work over several workers.
fn on_four_threads<R: Send>(f: impl FnOnce() -> R + Send) -> R {
    #[cfg(feature = "parallel")]
    {
        rayon::ThreadPoolBuilder::new()
            .num_threads(4)
            .build()
            .unwrap()
            .install(f)
    }
    #[cfg(not(feature = "parallel"))]
    {
        f()
    }
}

/// Visit counts for `[0, n)^N`, indexed by the flattened tuple (dimension 0 fastest).
fn visit_counts<E: Executor, const N: usize>(exec: &E, n: u32) -> Vec<u32> {
    let r = Range::<u32, N>::from_extents([n; N]);
    let counts: Vec<AtomicU32> = (0..(n as usize).pow(N as u32))
        .map(|_| AtomicU32::new(0))
        .collect();
    for_each(exec, &r, |idx| {
        let flat = idx.iter().rev().fold(0usize, |acc, &i| acc * n as usize + i as usize);
        counts[flat].fetch_add(1, Ordering::Relaxed);
    });
    counts.into_iter().map(AtomicU32::into_inner).collect()
}

fn assert_visits_once<E: Executor>(exec: &E, name: &str) {
    let all_once = |counts: Vec<u32>| counts.iter().all(|&c| c == 1);
    assert!(all_once(visit_counts::<E, 1>(exec, 37)), "{name} N=1");
    assert!(all_once(visit_counts::<E, 2>(exec, 13)), "{name} N=2");
    assert!(all_once(visit_counts::<E, 3>(exec, 7)), "{name} N=3");
    assert!(all_once(visit_counts::<E, 4>(exec, 5)), "{name} N=4");
    assert!(all_once(visit_counts::<E, 5>(exec, 4)), "{name} N=5");
}

#[test]
fn test_sequential_visits_each_tuple_once() {
    assert_visits_once(&SequentialExecutor, "sequential");
}

#[test]
fn test_fork_join_static_visits_each_tuple_once() {
    on_four_threads(|| {
        assert_visits_once(&ForkJoinExecutor::static_schedule(), "static");
    });
}

#[test]
fn test_fork_join_dynamic_visits_each_tuple_once() {
    on_four_threads(|| {
        assert_visits_once(&ForkJoinExecutor::dynamic(), "dynamic");
        assert_visits_once(&ForkJoinExecutor::dynamic_chunked(8), "dynamic(8)");
    });
}

#[test]
fn test_dynamic_chunk_larger_than_space() {
    on_four_threads(|| {
        for chunk in [usize::MAX, 1 << (usize::BITS - 1)] {
            let exec = ForkJoinExecutor::dynamic_chunked(chunk);
            assert_visits_once(&exec, "dynamic(huge)");
            assert_eq!(integer_sum(&exec, 100), integer_sum(&SequentialExecutor, 100));
        }
    });
}

#[test]
fn test_work_stealing_visits_each_tuple_once() {
    on_four_threads(|| {
        assert_visits_once(&WorkStealingExecutor::new(), "work-stealing");
        assert_visits_once(&WorkStealingExecutor::new().with_grain(3), "work-stealing(3)");
    });
}

fn integer_sum<E: Executor>(exec: &E, n: u64) -> u64 {
    transform_reduce(exec, &range1(0, n), 0u64, |a, b| a + b, |[i]| i * i + 1)
}

fn float_sum<E: Executor>(exec: &E, n: u64) -> f64 {
    transform_reduce(exec, &range1(0, n), 0.0f64, |a, b| a + b, |[i]| 1.0 / (i as f64 + 1.0))
}

#[test]
fn test_reductions_match_sequential() {
    on_four_threads(|| {
        for n in [0u64, 1, 1000] {
            let int_ref = integer_sum(&SequentialExecutor, n);
            let float_ref = float_sum(&SequentialExecutor, n);

            assert_eq!(integer_sum(&ForkJoinExecutor::static_schedule(), n), int_ref);
            assert_eq!(integer_sum(&ForkJoinExecutor::dynamic(), n), int_ref);
            assert_eq!(integer_sum(&WorkStealingExecutor::new(), n), int_ref);

            assert_relative_eq!(
                float_sum(&ForkJoinExecutor::static_schedule(), n),
                float_ref,
                epsilon = 1e-10
            );
            assert_relative_eq!(float_sum(&ForkJoinExecutor::dynamic(), n), float_ref, epsilon = 1e-10);
            assert_relative_eq!(float_sum(&WorkStealingExecutor::new(), n), float_ref, epsilon = 1e-10);
        }
    });
}

#[test]
fn test_reductions_match_sequential_all_ranks() {
    on_four_threads(|| {
        fn check<E: Executor>(exec: &E) {
            let r4 = Range::new([0i32, -2, 1, 0], [6, 3, 4, 3]);
            let f4 = |[a, b, c, d]: [i32; 4]| (a * 7 + b * 5 + c * 3 + d) as i64;
            let seq = transform_reduce(&SequentialExecutor, &r4, 0i64, |x, y| x + y, f4);
            assert_eq!(transform_reduce(exec, &r4, 0i64, |x, y| x + y, f4), seq);

            let r3 = range3(0u16, 9, 0, 4, 2, 7);
            let f3 = |[a, b, c]: [u16; 3]| (a as u64) << (b + c);
            let seq = transform_reduce(&SequentialExecutor, &r3, 0u64, |x, y| x ^ y, f3);
            assert_eq!(transform_reduce(exec, &r3, 0u64, |x, y| x ^ y, f3), seq);

            let r2 = range2(-5i64, 5, -5, 5);
            let seq = transform_reduce(&SequentialExecutor, &r2, i64::MIN, i64::max, |[a, b]| a * b);
            assert_eq!(transform_reduce(exec, &r2, i64::MIN, i64::max, |[a, b]| a * b), seq);
        }
        check(&ForkJoinExecutor::static_schedule());
        check(&ForkJoinExecutor::dynamic_chunked(5));
        check(&WorkStealingExecutor::new());
    });
}

#[test]
fn test_empty_range_every_backend() {
    on_four_threads(|| {
        fn check<E: Executor>(exec: &E) {
            let empties = [
                Range::new([0u32, 0, 0], [4, 0, 4]),
                Range::new([5u32, 0, 0], [5, 4, 4]),
                Range::new([0u32, 0, 9], [4, 4, 3]),
            ];
            for r in empties {
                let calls = AtomicU32::new(0);
                for_each(exec, &r, |_| {
                    calls.fetch_add(1, Ordering::Relaxed);
                });
                assert_eq!(calls.into_inner(), 0);
                // A non-identity init must come back untouched.
                assert_eq!(transform_reduce(exec, &r, 17u32, |a, b| a + b, |_| 1), 17);
            }
            let r5 = Range::new([0u8; 5], [3, 3, 3, 0, 3]);
            assert_eq!(transform_reduce(exec, &r5, 17u32, |a, b| a + b, |_| 1), 17);
        }
        check(&SequentialExecutor);
        check(&ForkJoinExecutor::static_schedule());
        check(&ForkJoinExecutor::dynamic());
        check(&WorkStealingExecutor::new());
    });
}

#[test]
fn test_non_arithmetic_accumulator() {
    on_four_threads(|| {
        // Sorted list of tuples whose coordinate sum is divisible by 11.
        fn collect<E: Executor>(exec: &E) -> Vec<[u32; 3]> {
            let r = range3(0u32, 12, 0, 10, 0, 8);
            let mut out = transform_reduce(
                exec,
                &r,
                Vec::new(),
                |mut a: Vec<[u32; 3]>, b: Vec<[u32; 3]>| {
                    a.extend(b);
                    a
                },
                |idx| {
                    if idx.iter().sum::<u32>() % 11 == 0 {
                        vec![idx]
                    } else {
                        Vec::new()
                    }
                },
            );
            out.sort();
            out
        }
        let reference = collect(&SequentialExecutor);
        assert!(!reference.is_empty());
        assert_eq!(collect(&ForkJoinExecutor::static_schedule()), reference);
        assert_eq!(collect(&ForkJoinExecutor::dynamic()), reference);
        assert_eq!(collect(&WorkStealingExecutor::new()), reference);
    });
}

#[test]
fn test_random_bounds_match_sequential() {
    on_four_threads(|| {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..20 {
            let begin: [i32; 3] = std::array::from_fn(|_| rng.gen_range(-10..10));
            let end: [i32; 3] = std::array::from_fn(|_| rng.gen_range(-10..20));
            let r = Range::new(begin, end);
            let f = |[a, b, c]: [i32; 3]| (a as i64) * 1_000_000 + (b as i64) * 1000 + c as i64;
            let reference = transform_reduce(&SequentialExecutor, &r, 0i64, |x, y| x + y, f);

            for schedule in [Schedule::Static, Schedule::dynamic(), Schedule::Dynamic { chunk: 7 }] {
                let exec = ForkJoinExecutor::new(schedule);
                assert_eq!(transform_reduce(&exec, &r, 0i64, |x, y| x + y, f), reference);
            }
            let exec = WorkStealingExecutor::new();
            assert_eq!(transform_reduce(&exec, &r, 0i64, |x, y| x + y, f), reference);
        }
    });
}

#[test]
fn test_sequential_order_is_lexicographic() {
    let r = range3(0u8, 2, 0, 2, 0, 2);
    let seen = Mutex::new(Vec::new());
    for_each(&SequentialExecutor, &r, |idx| seen.lock().unwrap().push(idx));
    assert_eq!(
        seen.into_inner().unwrap(),
        vec![
            [0, 0, 0],
            [1, 0, 0],
            [0, 1, 0],
            [1, 1, 0],
            [0, 0, 1],
            [1, 0, 1],
            [0, 1, 1],
            [1, 1, 1],
        ]
    );
}

#[test]
fn test_capped_workers() {
    on_four_threads(|| {
        let exec = ForkJoinExecutor::dynamic().with_max_workers(2);
        assert!(exec.num_workers() <= 2);
        assert_eq!(integer_sum(&exec, 1000), integer_sum(&SequentialExecutor, 1000));
    });
}
