//! Line geometry shared by win detection, pattern detection and evaluation
//!
//! Everything here is a pure function of the board dimensions; no cell
//! contents are read.

use crate::packed_board::Position;

/// The four line directions, each scanned both ways from a cell
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Direction {
    Horizontal,
    Vertical,
    /// Top-left to bottom-right
    Diagonal,
    /// Bottom-left to top-right
    AntiDiagonal,
}

pub const DIRECTIONS: [Direction; 4] = [
    Direction::Horizontal,
    Direction::Vertical,
    Direction::Diagonal,
    Direction::AntiDiagonal,
];

impl Direction {
    /// (row, col) step of one cell in the forward sense
    #[inline]
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Horizontal => (0, 1),
            Direction::Vertical => (1, 0),
            Direction::Diagonal => (1, 1),
            Direction::AntiDiagonal => (-1, 1),
        }
    }
}

/// Maps coordinates and directions to in-bounds cells of a `rows` x `cols` grid
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Geometry {
    rows: u16,
    cols: u16,
}

/// A straight run of `len` cells starting at `start`
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Window {
    pub start: Position,
    pub direction: Direction,
    pub len: u16,
}

impl Window {
    pub fn cells(self) -> impl Iterator<Item = Position> {
        let (dr, dc) = self.direction.delta();
        let Window { start, len, .. } = self;
        (0..len as i32).map(move |i| {
            Position::new(
                (start.row as i32 + dr * i) as u16,
                (start.col as i32 + dc * i) as u16,
            )
        })
    }
}

impl Geometry {
    pub fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }

    #[inline]
    pub fn contains(&self, row: i32, col: i32) -> bool {
        row >= 0 && row < self.rows as i32 && col >= 0 && col < self.cols as i32
    }

    /// The cell `n` steps from `pos` along `direction` (negative `n` walks backwards)
    #[inline]
    pub fn step(&self, pos: Position, direction: Direction, n: i32) -> Option<Position> {
        let (dr, dc) = direction.delta();
        let row = pos.row as i32 + dr * n;
        let col = pos.col as i32 + dc * n;
        if self.contains(row, col) {
            Some(Position::new(row as u16, col as u16))
        } else {
            None
        }
    }

    /// In-bounds cells leaving `pos` along `direction`, excluding `pos` itself
    pub fn ray(
        &self,
        pos: Position,
        direction: Direction,
        forward: bool,
    ) -> impl Iterator<Item = Position> {
        let geometry = *self;
        let sign = if forward { 1 } else { -1 };
        (1..)
            .map(move |n| geometry.step(pos, direction, n * sign))
            .take_while(Option::is_some)
            .flatten()
    }

    fn window_fits(&self, start: Position, direction: Direction, len: u16) -> bool {
        len > 0 && self.step(start, direction, len as i32 - 1).is_some()
    }

    /// Every in-bounds window of `len` cells in all four directions
    pub fn windows(&self, len: u16) -> impl Iterator<Item = Window> {
        let geometry = *self;
        (0..self.rows)
            .flat_map(move |row| (0..geometry.cols).map(move |col| Position::new(row, col)))
            .flat_map(|start| DIRECTIONS.into_iter().map(move |direction| (start, direction)))
            .filter(move |&(start, direction)| geometry.window_fits(start, direction, len))
            .map(move |(start, direction)| Window {
                start,
                direction,
                len,
            })
    }

    /// Every in-bounds window of `len` cells containing `pos`
    pub fn windows_through(&self, pos: Position, len: u16) -> Vec<Window> {
        let mut windows = Vec::new();
        for &direction in DIRECTIONS.iter() {
            for offset in 0..len as i32 {
                if let Some(start) = self.step(pos, direction, -offset) {
                    if self.window_fits(start, direction, len) {
                        windows.push(Window {
                            start,
                            direction,
                            len,
                        });
                    }
                }
            }
        }
        windows
    }

    /// Manhattan distance to the board centre, doubled so even sizes stay integral
    #[inline]
    pub fn center_distance(&self, pos: Position) -> u32 {
        let dr = (2 * pos.row as i32 - (self.rows as i32 - 1)).unsigned_abs();
        let dc = (2 * pos.col as i32 - (self.cols as i32 - 1)).unsigned_abs();
        dr + dc
    }

    pub fn max_center_distance(&self) -> u32 {
        self.center_distance(Position::new(0, 0))
    }

    /// The cell closest to the centre, preferring the lower-right one on even sizes
    pub fn center(&self) -> Position {
        Position::new(self.rows / 2, self.cols / 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_stays_in_bounds() {
        let geometry = Geometry::new(6, 7);
        let origin = Position::new(0, 0);
        assert_eq!(
            geometry.step(origin, Direction::Diagonal, 2),
            Some(Position::new(2, 2))
        );
        assert_eq!(geometry.step(origin, Direction::AntiDiagonal, 1), None);
        assert_eq!(geometry.step(origin, Direction::Horizontal, -1), None);
    }

    #[test]
    fn test_ray_stops_at_edge() {
        let geometry = Geometry::new(6, 7);
        let cells: Vec<_> = geometry
            .ray(Position::new(5, 4), Direction::Horizontal, true)
            .collect();
        assert_eq!(cells, vec![Position::new(5, 5), Position::new(5, 6)]);
        let up_right: Vec<_> = geometry
            .ray(Position::new(2, 0), Direction::AntiDiagonal, true)
            .collect();
        assert_eq!(up_right, vec![Position::new(1, 1), Position::new(0, 2)]);
    }

    #[test]
    fn test_connect_four_window_count() {
        // 24 horizontal, 21 vertical, 12 + 12 diagonal
        let geometry = Geometry::new(6, 7);
        assert_eq!(geometry.windows(4).count(), 69);
    }

    #[test]
    fn test_windows_through_corner_and_center() {
        let geometry = Geometry::new(6, 7);
        // bottom-left corner: 1 horizontal, 1 vertical, 1 diagonal
        assert_eq!(geometry.windows_through(Position::new(5, 0), 4).len(), 3);
        for window in geometry.windows_through(Position::new(3, 3), 4) {
            assert!(window.cells().any(|p| p == Position::new(3, 3)));
        }
    }

    #[test]
    fn test_center_distance() {
        let geometry = Geometry::new(15, 15);
        assert_eq!(geometry.center_distance(Position::new(7, 7)), 0);
        assert_eq!(geometry.max_center_distance(), 28);
        let connect_four = Geometry::new(6, 7);
        assert!(
            connect_four.center_distance(Position::new(5, 3))
                < connect_four.center_distance(Position::new(5, 0))
        );
    }
}
