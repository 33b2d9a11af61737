//! Rank-Pairing Heap Benchmarks
//!
//! Measures the core operations with the plain and the pooled node provider,
//! and a std `BinaryHeap` baseline where the operation exists there.
//!
//! ## Running
//!
//! ```sh
//! cargo bench --bench rp_heap_bench
//! cargo bench --bench rp_heap_bench -- decrease_key
//! ```
//!
//! ## Workloads
//!
//! - **push**: n pushes of random values
//! - **pop_all**: n pushes, then pop until empty
//! - **push_pop**: n pushes, then n rounds of push + pop
//! - **decrease_key**: n pushes, then one decrease per element
//! - **astar_grid**: A* across a random 200x200 grid

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use rp_heap::grid::{Grid, Point};
use rp_heap::pathfinding::{astar_in, Heuristic, OpenEntry};
use rp_heap::{Global, Node, NodeAlloc, PoolAlloc, RpHeap, Type2};
use std::collections::BinaryHeap;

const SIZES: [usize; 3] = [1_000, 10_000, 100_000];

fn random_values(n: usize, seed: u64) -> Vec<i32> {
    let mut rng = XorShiftRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen()).collect()
}

fn pool() -> PoolAlloc<Node<i32>> {
    PoolAlloc::new()
}

fn push_all<A: NodeAlloc<Node<i32>>>(alloc: A, data: &[i32]) -> RpHeap<i32, rp_heap::Less, A> {
    let mut heap = RpHeap::new_in(alloc);
    heap.extend(data.iter().copied());
    heap
}

fn bench_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("push");
    for n in SIZES {
        let data = random_values(n, 42);
        group.bench_with_input(BenchmarkId::new("rp_heap", n), &data, |b, data| {
            b.iter(|| black_box(*push_all(Global, data).top()))
        });
        group.bench_with_input(BenchmarkId::new("rp_heap_pool", n), &data, |b, data| {
            b.iter(|| black_box(*push_all(pool(), data).top()))
        });
        group.bench_with_input(BenchmarkId::new("binary_heap", n), &data, |b, data| {
            b.iter(|| {
                let heap: BinaryHeap<_> = data.iter().map(|&v| std::cmp::Reverse(v)).collect();
                black_box(heap.peek().copied())
            })
        });
    }
    group.finish();
}

fn bench_pop_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("pop_all");
    for n in SIZES {
        let data = random_values(n, 42);
        group.bench_with_input(BenchmarkId::new("rp_heap", n), &data, |b, data| {
            b.iter(|| {
                let mut heap = push_all(Global, data);
                while heap.pop().is_ok() {}
            })
        });
        group.bench_with_input(BenchmarkId::new("rp_heap_pool", n), &data, |b, data| {
            b.iter(|| {
                let mut heap = push_all(pool(), data);
                while heap.pop().is_ok() {}
            })
        });
    }
    group.finish();
}

fn bench_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("push_pop");
    for n in SIZES {
        let data = random_values(2 * n, 42);
        let (initial, rounds) = data.split_at(n);
        group.bench_with_input(BenchmarkId::new("rp_heap", n), &n, |b, _| {
            b.iter(|| {
                let mut heap = push_all(Global, initial);
                for &v in rounds {
                    heap.push(v);
                    let _ = heap.pop();
                }
                black_box(heap.len())
            })
        });
        group.bench_with_input(BenchmarkId::new("rp_heap_pool", n), &n, |b, _| {
            b.iter(|| {
                let mut heap = push_all(pool(), initial);
                for &v in rounds {
                    heap.push(v);
                    let _ = heap.pop();
                }
                black_box(heap.len())
            })
        });
    }
    group.finish();
}

fn decrease_all<A: NodeAlloc<Node<i32>>>(alloc: A, data: &[i32], decrements: &[i32]) -> i32 {
    let mut heap = RpHeap::new_in(alloc);
    let handles: Vec<_> = data.iter().map(|&v| heap.push(v)).collect();
    for (handle, &d) in handles.iter().zip(decrements) {
        let _ = heap.decrease_with(handle, |v| v.saturating_sub(d));
    }
    *heap.top()
}

fn bench_decrease_key(c: &mut Criterion) {
    let mut group = c.benchmark_group("decrease_key");
    for n in SIZES {
        let data = random_values(n, 42);
        let mut rng = XorShiftRng::seed_from_u64(123);
        let decrements: Vec<i32> = (0..n).map(|_| rng.gen_range(1..=1000)).collect();
        group.bench_with_input(BenchmarkId::new("rp_heap", n), &n, |b, _| {
            b.iter(|| black_box(decrease_all(Global, &data, &decrements)))
        });
        group.bench_with_input(BenchmarkId::new("rp_heap_pool", n), &n, |b, _| {
            b.iter(|| black_box(decrease_all(pool(), &data, &decrements)))
        });
    }
    group.finish();
}

fn bench_astar_grid(c: &mut Criterion) {
    let mut rng = XorShiftRng::seed_from_u64(7);
    let mut grid = Grid::new(200, 200);
    for y in 0..200 {
        for x in 0..200 {
            if rng.gen_bool(0.2) {
                grid.set_blocked(Point::new(x, y), true);
            }
        }
    }
    let (start, goal) = (Point::new(0, 0), Point::new(199, 199));
    grid.set_blocked(start, false);
    grid.set_blocked(goal, false);

    let mut group = c.benchmark_group("astar_grid");
    group.sample_size(20);
    group.bench_function("global", |b| {
        b.iter(|| black_box(astar_in::<_, Type2>(&grid, start, goal, Heuristic::Octile, Global)))
    });
    group.bench_function("pool", |b| {
        b.iter(|| {
            black_box(astar_in::<_, Type2>(
                &grid,
                start,
                goal,
                Heuristic::Octile,
                PoolAlloc::<Node<OpenEntry>>::new(),
            ))
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_push,
    bench_pop_all,
    bench_push_pop,
    bench_decrease_key,
    bench_astar_grid
);
criterion_main!(benches);
