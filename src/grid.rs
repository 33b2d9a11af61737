//! 2-D occupancy grids for the search algorithms in [`pathfinding`](crate::pathfinding)
//!
//! # Binary map format
//!
//! ```text
//! byte 0        length (x extent)
//! byte 1        width  (y extent)
//! bytes 2..     `width` rows of `length` cells, row-major
//! ```
//!
//! A cell is `0` (open) or `1` (obstacle); anything else is rejected. Bytes
//! past the last row are ignored.
//!
//! # Example
//!
//! ```rust
//! use rp_heap::grid::{Grid, Point};
//!
//! let grid = Grid::from_bytes(&[3, 2, 0, 1, 0, 0, 0, 0]).unwrap();
//! assert_eq!((grid.length(), grid.width()), (3, 2));
//! assert!(grid.is_blocked(Point::new(1, 0)));
//! assert_eq!(grid.render(&[]), ".#.\n...\n");
//! ```

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

const OPEN: u8 = 0;
const OBSTACLE: u8 = 1;

/// A cell coordinate; `x` runs along the length, `y` along the width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Point {
    /// Column, `0..length`
    pub x: usize,
    /// Row, `0..width`
    pub y: usize,
}

impl Point {
    /// Creates the point `(x, y)`
    pub const fn new(x: usize, y: usize) -> Self {
        Point { x, y }
    }

    /// Moves by `(dx, dy)`, or `None` if that leaves the non-negative quadrant
    pub fn offset(self, dx: isize, dy: isize) -> Option<Point> {
        Some(Point {
            x: self.x.checked_add_signed(dx)?,
            y: self.y.checked_add_signed(dy)?,
        })
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Error parsing a [`Point`] from `x,y`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid point `{0}`: expected `x,y` with non-negative integers")]
pub struct ParsePointError(String);

impl FromStr for Point {
    type Err = ParsePointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParsePointError(s.to_string());
        let (x, y) = s.split_once(',').ok_or_else(invalid)?;
        let x = x.trim().parse().map_err(|_| invalid())?;
        let y = y.trim().parse().map_err(|_| invalid())?;
        Ok(Point { x, y })
    }
}

/// Errors from loading a map or addressing a point in it
#[derive(Debug, Error)]
pub enum MapError {
    #[error("failed to read map {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("map data truncated: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },

    #[error("invalid cell value {value} at ({x}, {y})")]
    InvalidCell { x: usize, y: usize, value: u8 },

    #[error("row {y} has {found} cells, expected {expected}")]
    RaggedRow {
        y: usize,
        expected: usize,
        found: usize,
    },

    #[error("point {point} is outside the map")]
    OutOfBounds { point: Point },
}

/// Rectangular occupancy grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    length: usize,
    width: usize,
    cells: Vec<u8>,
}

impl Grid {
    /// Creates a grid with every cell open
    pub fn new(length: usize, width: usize) -> Self {
        Grid {
            length,
            width,
            cells: vec![OPEN; length * width],
        }
    }

    /// Parses the binary map format
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MapError> {
        let [length, width, data @ ..] = bytes else {
            return Err(MapError::Truncated {
                expected: 2,
                found: bytes.len(),
            });
        };
        let (length, width) = (usize::from(*length), usize::from(*width));
        let cell_count = length * width;
        if data.len() < cell_count {
            return Err(MapError::Truncated {
                expected: 2 + cell_count,
                found: bytes.len(),
            });
        }

        let cells = data[..cell_count].to_vec();
        if let Some(index) = cells.iter().position(|&c| c != OPEN && c != OBSTACLE) {
            return Err(MapError::InvalidCell {
                x: index % length,
                y: index / length,
                value: cells[index],
            });
        }
        Ok(Grid {
            length,
            width,
            cells,
        })
    }

    /// Reads and parses a binary map file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| MapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let grid = Self::from_bytes(&bytes)?;
        tracing::debug!(
            path = %path.display(),
            length = grid.length,
            width = grid.width,
            "loaded map"
        );
        Ok(grid)
    }

    /// Parses a text picture of a map: one line per row, `#` for obstacles
    /// and `.` for open cells. Leading and trailing blank lines are ignored.
    pub fn from_ascii(text: &str) -> Result<Self, MapError> {
        let rows: Vec<&str> = text.trim().lines().map(str::trim).collect();
        let length = rows.first().map_or(0, |row| row.len());
        let mut cells = Vec::with_capacity(length * rows.len());

        for (y, row) in rows.iter().enumerate() {
            if row.len() != length {
                return Err(MapError::RaggedRow {
                    y,
                    expected: length,
                    found: row.len(),
                });
            }
            for (x, byte) in row.bytes().enumerate() {
                cells.push(match byte {
                    b'.' => OPEN,
                    b'#' => OBSTACLE,
                    value => return Err(MapError::InvalidCell { x, y, value }),
                });
            }
        }
        Ok(Grid {
            length,
            width: rows.len(),
            cells,
        })
    }

    /// Extent along x
    pub fn length(&self) -> usize {
        self.length
    }

    /// Extent along y
    pub fn width(&self) -> usize {
        self.width
    }

    /// True if `point` lies on the map
    pub fn contains(&self, point: Point) -> bool {
        point.x < self.length && point.y < self.width
    }

    /// Fails with [`MapError::OutOfBounds`] unless `point` is on the map
    pub fn check(&self, point: Point) -> Result<(), MapError> {
        if self.contains(point) {
            Ok(())
        } else {
            Err(MapError::OutOfBounds { point })
        }
    }

    /// True for in-bounds obstacle cells
    pub fn is_blocked(&self, point: Point) -> bool {
        self.contains(point) && self.cells[self.index(point)] == OBSTACLE
    }

    /// True for in-bounds open cells
    pub fn is_open(&self, point: Point) -> bool {
        self.contains(point) && self.cells[self.index(point)] == OPEN
    }

    /// Marks a cell as obstacle or open
    ///
    /// # Panics
    ///
    /// Panics if `point` is outside the grid.
    pub fn set_blocked(&mut self, point: Point, blocked: bool) {
        assert!(self.contains(point), "point {point} is outside the map");
        let index = self.index(point);
        self.cells[index] = if blocked { OBSTACLE } else { OPEN };
    }

    /// Row-major cell index; `point` must be in bounds
    pub(crate) fn index(&self, point: Point) -> usize {
        point.y * self.length + point.x
    }

    /// Draws the grid one row per line: `.` open, `#` obstacle, `*` path,
    /// `S` and `G` for the first and last path points.
    pub fn render(&self, path: &[Point]) -> String {
        let mut canvas: Vec<u8> = self
            .cells
            .iter()
            .map(|&c| if c == OBSTACLE { b'#' } else { b'.' })
            .collect();

        for point in path.iter().filter(|p| self.contains(**p)) {
            canvas[self.index(*point)] = b'*';
        }
        if let (Some(first), Some(last)) = (path.first(), path.last()) {
            if self.contains(*first) {
                canvas[self.index(*first)] = b'S';
            }
            if self.contains(*last) && path.len() > 1 {
                canvas[self.index(*last)] = b'G';
            }
        }

        let mut out = String::with_capacity((self.length + 1) * self.width);
        for row in canvas.chunks(self.length.max(1)).take(self.width) {
            out.extend(row.iter().map(|&b| char::from(b)));
            out.push('\n');
        }
        out
    }
}
