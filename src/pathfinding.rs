//! Grid A* and BFS built on the rank-pairing heap
//!
//! A* is the workload the heap was designed for: every improved path to an
//! open cell is a `decrease`, and every expansion is a `pop`.
//!
//! # Design
//!
//! Only lightweight `(f, index)` entries live in the heap. Search state for
//! each discovered cell sits in a plain arena and carries a predecessor link
//! for path reconstruction. A fast hash map (FxHash) maps open cells to their
//! heap handles; closed cells go into an FxHash set.
//!
//! Movement is 8-connected with step costs 1 (straight) and sqrt(2)
//! (diagonal). A diagonal step is refused when either cell it squeezes past
//! is an obstacle. BFS is the 4-connected unit-cost baseline.
//!
//! # Example
//!
//! ```rust
//! use rp_heap::grid::{Grid, Point};
//! use rp_heap::pathfinding::{astar, Heuristic};
//!
//! let grid = Grid::from_ascii(
//!     "
//!     ....
//!     .##.
//!     ....
//!     ",
//! )
//! .unwrap();
//!
//! let path = astar(&grid, Point::new(0, 0), Point::new(3, 2), Heuristic::Octile)
//!     .unwrap()
//!     .expect("goal is reachable");
//! assert_eq!(path.points.first(), Some(&Point::new(0, 0)));
//! assert_eq!(path.points.last(), Some(&Point::new(3, 2)));
//! // The wall forbids both diagonals around it
//! assert_eq!(path.cost, 5.0);
//! ```

use crate::grid::{Grid, MapError, Point};
use crate::rank::{RankReduction, Type2};
use crate::rank_pairing::{Handle, Node, RpHeap};
use crate::storage::{Global, NodeAlloc};
use crate::traits::Compare;
use rustc_hash::{FxHashMap, FxHashSet};
use std::f64::consts::SQRT_2;

/// 8-connected moves: straight first, then diagonals
const MOVES: [(isize, isize); 8] = [
    (0, -1),
    (1, 0),
    (0, 1),
    (-1, 0),
    (-1, -1),
    (1, -1),
    (1, 1),
    (-1, 1),
];

/// 4-connected moves used by BFS
const MOVES4: [(isize, isize); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];

/// Estimate of the remaining cost to the goal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Heuristic {
    /// `|dx| + |dy|`. Fast, but overestimates diagonal moves, so paths are
    /// not guaranteed shortest.
    #[default]
    Manhattan,
    /// Exact cost on an empty 8-connected grid; admissible
    Octile,
    /// Always 0; the search degrades to Dijkstra
    Zero,
}

impl Heuristic {
    /// Estimated cost from `from` to `to`
    pub fn estimate(self, from: Point, to: Point) -> f64 {
        let dx = from.x.abs_diff(to.x) as f64;
        let dy = from.y.abs_diff(to.y) as f64;
        match self {
            Heuristic::Manhattan => dx + dy,
            Heuristic::Octile => dx.max(dy) + (SQRT_2 - 1.0) * dx.min(dy),
            Heuristic::Zero => 0.0,
        }
    }
}

/// A route from start to goal
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    /// Cells from start to goal, both included
    pub points: Vec<Point>,
    /// Sum of step costs
    pub cost: f64,
}

/// Heap entry for A*: priority `f = g + h` and the arena index of the cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenEntry {
    /// Cost so far plus the heuristic estimate
    pub f: f64,
    node: usize,
}

/// Orders [`OpenEntry`] by ascending `f`
#[derive(Debug, Clone, Copy, Default)]
pub struct ByEstimate;

impl Compare<OpenEntry> for ByEstimate {
    #[inline]
    fn less(&self, a: &OpenEntry, b: &OpenEntry) -> bool {
        a.f < b.f
    }
}

/// Per-cell search state
struct SearchNode {
    point: Point,
    /// Cost from start
    g: f64,
    /// Heuristic to goal
    h: f64,
    prev: Option<usize>,
}

#[derive(Debug, Default)]
struct SearchStats {
    expanded: usize,
    pushed: usize,
    decreased: usize,
}

/// Follows predecessor links from `index` back to the start
fn reconstruct<T>(
    arena: &[T],
    mut index: usize,
    step: impl Fn(&T) -> (Point, Option<usize>),
) -> Vec<Point> {
    let mut points = Vec::new();
    loop {
        let (point, prev) = step(&arena[index]);
        points.push(point);
        match prev {
            Some(p) => index = p,
            None => break,
        }
    }
    points.reverse();
    points
}

/// A* with the default provider and rank policy
///
/// Returns `Ok(None)` if the goal is unreachable.
///
/// # Errors
///
/// [`MapError::OutOfBounds`] if `start` or `goal` is off the map.
pub fn astar(
    grid: &Grid,
    start: Point,
    goal: Point,
    heuristic: Heuristic,
) -> Result<Option<Path>, MapError> {
    astar_in::<Global, Type2>(grid, start, goal, heuristic, Global)
}

/// A* drawing heap nodes from `alloc` and reducing ranks with policy `R`
///
/// # Errors
///
/// [`MapError::OutOfBounds`] if `start` or `goal` is off the map.
pub fn astar_in<A, R>(
    grid: &Grid,
    start: Point,
    goal: Point,
    heuristic: Heuristic,
    alloc: A,
) -> Result<Option<Path>, MapError>
where
    A: NodeAlloc<Node<OpenEntry>>,
    R: RankReduction,
{
    grid.check(start)?;
    grid.check(goal)?;
    if grid.is_blocked(start) || grid.is_blocked(goal) {
        return Ok(None);
    }

    let mut heap: RpHeap<OpenEntry, ByEstimate, A, R> =
        RpHeap::with_compare_in(ByEstimate, alloc);
    let mut arena: Vec<SearchNode> = Vec::new();
    let mut open: FxHashMap<Point, Handle> = FxHashMap::default();
    let mut closed: FxHashSet<Point> = FxHashSet::default();
    let mut stats = SearchStats::default();

    let h = heuristic.estimate(start, goal);
    arena.push(SearchNode {
        point: start,
        g: 0.0,
        h,
        prev: None,
    });
    open.insert(start, heap.push(OpenEntry { f: h, node: 0 }));
    stats.pushed += 1;

    while let Ok(OpenEntry { node: current, .. }) = heap.pop_value() {
        stats.expanded += 1;
        let point = arena[current].point;

        if point == goal {
            let cost = arena[current].g;
            let points = reconstruct(&arena, current, |n| (n.point, n.prev));
            heap.clear();
            tracing::debug!(
                expanded = stats.expanded,
                pushed = stats.pushed,
                decreased = stats.decreased,
                cost,
                steps = points.len(),
                "a* reached goal"
            );
            return Ok(Some(Path { points, cost }));
        }

        open.remove(&point);
        closed.insert(point);

        for (dx, dy) in MOVES {
            let Some(next) = point.offset(dx, dy) else {
                continue;
            };
            if !grid.is_open(next) {
                continue;
            }
            let diagonal = dx != 0 && dy != 0;
            if diagonal
                && (grid.is_blocked(Point::new(point.x, next.y))
                    || grid.is_blocked(Point::new(next.x, point.y)))
            {
                continue;
            }
            if closed.contains(&next) {
                continue;
            }

            let g = arena[current].g + if diagonal { SQRT_2 } else { 1.0 };
            match open.get(&next) {
                Some(handle) => {
                    let Some(&OpenEntry { node, .. }) = heap.get(handle) else {
                        continue;
                    };
                    if g < arena[node].g {
                        let entry = &mut arena[node];
                        entry.g = g;
                        entry.prev = Some(current);
                        let f = g + entry.h;
                        // Refused only when g shrank by less than f's rounding step
                        if heap.decrease(handle, OpenEntry { f, node }).is_ok() {
                            stats.decreased += 1;
                        }
                    }
                }
                None => {
                    let h = heuristic.estimate(next, goal);
                    let node = arena.len();
                    arena.push(SearchNode {
                        point: next,
                        g,
                        h,
                        prev: Some(current),
                    });
                    open.insert(next, heap.push(OpenEntry { f: g + h, node }));
                    stats.pushed += 1;
                }
            }
        }
    }

    tracing::debug!(
        expanded = stats.expanded,
        pushed = stats.pushed,
        decreased = stats.decreased,
        "a* exhausted open set"
    );
    Ok(None)
}

/// Breadth-first search over 4-connected open cells
///
/// Every step costs 1, so the result is a shortest 4-connected path.
/// Returns `Ok(None)` if the goal is unreachable.
///
/// # Errors
///
/// [`MapError::OutOfBounds`] if `start` or `goal` is off the map.
pub fn bfs(grid: &Grid, start: Point, goal: Point) -> Result<Option<Path>, MapError> {
    grid.check(start)?;
    grid.check(goal)?;
    if grid.is_blocked(start) || grid.is_blocked(goal) {
        return Ok(None);
    }
    if start == goal {
        return Ok(Some(Path {
            points: vec![start],
            cost: 0.0,
        }));
    }

    let mut visited = vec![false; grid.length() * grid.width()];
    // Doubles as the FIFO queue: entries before `head` are done
    let mut queue: Vec<(Point, Option<usize>)> = vec![(start, None)];
    visited[grid.index(start)] = true;

    let mut head = 0;
    while head < queue.len() {
        let (point, _) = queue[head];
        for (dx, dy) in MOVES4 {
            let Some(next) = point.offset(dx, dy) else {
                continue;
            };
            if !grid.is_open(next) || visited[grid.index(next)] {
                continue;
            }
            visited[grid.index(next)] = true;
            queue.push((next, Some(head)));

            if next == goal {
                let points = reconstruct(&queue, queue.len() - 1, |&entry| entry);
                tracing::debug!(visited = queue.len(), steps = points.len(), "bfs reached goal");
                let cost = (points.len() - 1) as f64;
                return Ok(Some(Path { points, cost }));
            }
        }
        head += 1;
    }

    tracing::debug!(visited = queue.len(), "bfs exhausted frontier");
    Ok(None)
}
