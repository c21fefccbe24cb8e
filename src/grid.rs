//! Grid: fixed matrix of cells. y=0 is the top row; gravity pulls towards larger y.

use crate::node::NodeId;
use crate::obstacle::CellObstacle;
use std::fmt;

/// Board coordinate. Signed so neighbour offsets and spawn rows above the board are representable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.offset();
        Self::new(self.x + dx, self.y + dy)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Unit direction on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Self; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// (dx, dy) for this direction.
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }
}

/// Static cell kind from the level layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellType {
    #[default]
    Normal,
    /// Hole in the board: never holds anything, occupants fall through it.
    Empty,
}

/// One board slot. Holds a node or a cell obstacle, never both.
#[derive(Debug, Clone)]
pub struct Cell {
    pub coord: Coord,
    pub cell_type: CellType,
    pub node: Option<NodeId>,
    pub obstacle: Option<CellObstacle>,
}

impl Cell {
    fn new(coord: Coord, cell_type: CellType) -> Self {
        Self {
            coord,
            cell_type,
            node: None,
            obstacle: None,
        }
    }

    #[inline]
    pub fn is_normal(&self) -> bool {
        self.cell_type == CellType::Normal
    }

    #[inline]
    pub fn is_occupied(&self) -> bool {
        self.node.is_some() || self.obstacle.is_some()
    }

    /// Normal cell with nothing in it.
    #[inline]
    pub fn is_vacant(&self) -> bool {
        self.is_normal() && !self.is_occupied()
    }
}

/// Dense `width x height` matrix of cells.
#[derive(Debug, Clone)]
pub struct Grid {
    pub width: usize,
    pub height: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// All cells Normal.
    pub fn new(width: usize, height: usize) -> Self {
        Self::from_types(width, height, |_| CellType::Normal)
    }

    pub fn from_types(width: usize, height: usize, cell_type: impl Fn(Coord) -> CellType) -> Self {
        let mut cells = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let coord = Coord::new(x as i32, y as i32);
                cells.push(Cell::new(coord, cell_type(coord)));
            }
        }
        Self {
            width,
            height,
            cells,
        }
    }

    #[inline]
    pub fn in_bounds(&self, coord: Coord) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && (coord.x as usize) < self.width
            && (coord.y as usize) < self.height
    }

    #[inline]
    fn idx(&self, coord: Coord) -> usize {
        assert!(
            self.in_bounds(coord),
            "coordinate {coord} outside {}x{} grid",
            self.width,
            self.height
        );
        coord.y as usize * self.width + coord.x as usize
    }

    /// Cell at `coord`. Panics when out of bounds.
    #[inline]
    pub fn cell(&self, coord: Coord) -> &Cell {
        &self.cells[self.idx(coord)]
    }

    #[inline]
    pub fn cell_mut(&mut self, coord: Coord) -> &mut Cell {
        let i = self.idx(coord);
        &mut self.cells[i]
    }

    /// Cell at `coord`, or None when out of bounds.
    #[inline]
    pub fn get(&self, coord: Coord) -> Option<&Cell> {
        self.in_bounds(coord).then(|| self.cell(coord))
    }

    /// Directions whose neighbour lies inside the grid.
    pub fn neighbor_directions(&self, coord: Coord) -> Vec<Direction> {
        Direction::ALL
            .into_iter()
            .filter(|&d| self.in_bounds(coord.step(d)))
            .collect()
    }

    /// Row-major iteration.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut Cell> {
        self.cells.iter_mut()
    }

    /// Coordinates of one column, top to bottom.
    pub fn column(&self, x: usize) -> impl DoubleEndedIterator<Item = Coord> + use<> {
        let x = x as i32;
        (0..self.height as i32).map(move |y| Coord::new(x, y))
    }

    pub fn node_at(&self, coord: Coord) -> Option<NodeId> {
        self.get(coord).and_then(|c| c.node)
    }
}
