//! Tests for grid loading and the A* / BFS searches

use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use rp_heap::grid::{Grid, MapError, Point};
use rp_heap::pathfinding::{astar, astar_in, bfs, Heuristic, OpenEntry, Path};
use rp_heap::{Node, PoolAlloc, Type1};
use std::f64::consts::SQRT_2;

const EPS: f64 = 1e-9;

/// Checks that `path` is a legal 8-connected walk with the claimed cost
fn assert_valid_path(grid: &Grid, path: &Path, start: Point, goal: Point) {
    assert_eq!(path.points.first(), Some(&start));
    assert_eq!(path.points.last(), Some(&goal));

    let mut cost = 0.0;
    for pair in path.points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let (dx, dy) = (a.x.abs_diff(b.x), a.y.abs_diff(b.y));
        assert!(dx <= 1 && dy <= 1 && dx + dy > 0, "{a} -> {b} is not a step");
        assert!(grid.is_open(b), "{b} is blocked");
        if dx == 1 && dy == 1 {
            assert!(
                grid.is_open(Point::new(a.x, b.y)) && grid.is_open(Point::new(b.x, a.y)),
                "{a} -> {b} cuts a corner"
            );
            cost += SQRT_2;
        } else {
            cost += 1.0;
        }
    }
    assert!((cost - path.cost).abs() < EPS, "cost {cost} != {}", path.cost);
}

fn random_grid(rng: &mut XorShiftRng, length: usize, width: usize, density: f64) -> Grid {
    let mut grid = Grid::new(length, width);
    for y in 0..width {
        for x in 0..length {
            if rng.gen_bool(density) {
                grid.set_blocked(Point::new(x, y), true);
            }
        }
    }
    grid
}

fn map_bytes(length: u8, width: u8, cells: &[u8]) -> Vec<u8> {
    let mut bytes = vec![length, width];
    bytes.extend_from_slice(cells);
    bytes
}

#[test]
fn test_load_map_file() {
    let path = std::env::temp_dir().join(format!("rp-heap-map-{}.bin", std::process::id()));
    #[rustfmt::skip]
    let cells = [
        0, 0, 0, 0,
        1, 1, 1, 0,
        0, 0, 0, 0,
    ];
    std::fs::write(&path, map_bytes(4, 3, &cells)).unwrap();

    let grid = Grid::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!((grid.length(), grid.width()), (4, 3));
    let found = astar(&grid, Point::new(0, 0), Point::new(0, 2), Heuristic::Octile)
        .unwrap()
        .unwrap();
    assert_valid_path(&grid, &found, Point::new(0, 0), Point::new(0, 2));
    // Around the wall; both diagonals next to its end are forbidden
    assert_eq!(found.cost, 8.0);
    assert_eq!(grid.render(&found.points), "S***\n###*\nG***\n");
}

#[test]
fn test_load_errors() {
    let missing = std::env::temp_dir().join("rp-heap-no-such-map.bin");
    let err = Grid::load(&missing).unwrap_err();
    assert!(matches!(err, MapError::Io { .. }));
    assert!(err.to_string().contains("rp-heap-no-such-map.bin"));

    assert!(matches!(
        Grid::from_bytes(&map_bytes(3, 3, &[0; 8])),
        Err(MapError::Truncated { expected: 11, found: 10 })
    ));
    assert!(matches!(
        Grid::from_bytes(&map_bytes(2, 1, &[0, 2])),
        Err(MapError::InvalidCell { x: 1, y: 0, value: 2 })
    ));
}

#[test]
fn test_astar_snake_maze() {
    let grid = Grid::from_ascii(
        "
        .#.....
        .#.###.
        .#.#...
        .#.#.##
        ...#...
        ",
    )
    .unwrap();
    let (start, goal) = (Point::new(0, 0), Point::new(6, 4));

    let best = astar(&grid, start, goal, Heuristic::Zero).unwrap().unwrap();
    assert_valid_path(&grid, &best, start, goal);

    let octile = astar(&grid, start, goal, Heuristic::Octile).unwrap().unwrap();
    assert_valid_path(&grid, &octile, start, goal);
    assert!((octile.cost - best.cost).abs() < EPS);

    let manhattan = astar(&grid, start, goal, Heuristic::Manhattan).unwrap().unwrap();
    assert_valid_path(&grid, &manhattan, start, goal);
    assert!(manhattan.cost >= best.cost - EPS);
}

#[test]
fn test_random_grids_octile_is_optimal() {
    let mut rng = XorShiftRng::seed_from_u64(0xa57a);
    for _ in 0..40 {
        let grid = random_grid(&mut rng, 40, 30, 0.25);
        let start = Point::new(rng.gen_range(0..40), rng.gen_range(0..30));
        let goal = Point::new(rng.gen_range(0..40), rng.gen_range(0..30));
        if !grid.is_open(start) || !grid.is_open(goal) {
            continue;
        }

        let dijkstra = astar(&grid, start, goal, Heuristic::Zero).unwrap();
        let octile = astar_in::<_, Type1>(
            &grid,
            start,
            goal,
            Heuristic::Octile,
            PoolAlloc::<Node<OpenEntry>>::new(),
        )
        .unwrap();

        match (dijkstra, octile) {
            (Some(d), Some(o)) => {
                assert_valid_path(&grid, &o, start, goal);
                assert!((d.cost - o.cost).abs() < EPS, "{} vs {}", d.cost, o.cost);
            }
            (None, None) => {}
            (d, o) => panic!("reachability disagrees: {d:?} vs {o:?}"),
        }
    }
}

#[test]
fn test_bfs_matches_manhattan_on_open_grid() {
    let grid = Grid::new(20, 10);
    let (start, goal) = (Point::new(2, 3), Point::new(17, 8));
    let path = bfs(&grid, start, goal).unwrap().unwrap();
    assert_eq!(path.points.len(), 15 + 5 + 1);
    assert_eq!(path.cost, 20.0);
}

#[test]
fn test_bfs_and_astar_agree_on_reachability() {
    let mut rng = XorShiftRng::seed_from_u64(99);
    for _ in 0..40 {
        let grid = random_grid(&mut rng, 25, 25, 0.35);
        let (start, goal) = (Point::new(0, 0), Point::new(24, 24));
        if !grid.is_open(start) || !grid.is_open(goal) {
            continue;
        }
        let by_bfs = bfs(&grid, start, goal).unwrap();
        let by_astar = astar(&grid, start, goal, Heuristic::Manhattan).unwrap();
        // 4-connected reachability implies 8-connected reachability
        if let Some(path) = &by_bfs {
            assert!(by_astar.is_some());
            for pair in path.points.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                assert_eq!(a.x.abs_diff(b.x) + a.y.abs_diff(b.y), 1);
            }
            // The diagonal search is never longer than the 4-connected one
            let astar_cost = by_astar.as_ref().map(|p| p.cost).unwrap_or(f64::MAX);
            let optimal = astar(&grid, start, goal, Heuristic::Zero).unwrap().unwrap();
            assert!(optimal.cost <= path.cost + EPS);
            assert!(astar_cost >= optimal.cost - EPS);
        }
    }
}

#[test]
fn test_blocked_goal_is_unreachable() {
    let mut grid = Grid::new(5, 5);
    grid.set_blocked(Point::new(4, 4), true);
    assert_eq!(
        astar(&grid, Point::new(0, 0), Point::new(4, 4), Heuristic::Octile).unwrap(),
        None
    );
    assert_eq!(bfs(&grid, Point::new(0, 0), Point::new(4, 4)).unwrap(), None);

    // A blocked start goes nowhere, even to itself
    grid.set_blocked(Point::new(1, 1), true);
    assert_eq!(
        astar(&grid, Point::new(1, 1), Point::new(3, 3), Heuristic::Zero).unwrap(),
        None
    );
    assert_eq!(bfs(&grid, Point::new(1, 1), Point::new(1, 1)).unwrap(), None);
}
