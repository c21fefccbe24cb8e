//! Tiles: the coloured sub-units of a node.

use std::collections::BTreeSet;
use std::fmt;

/// Number of sub-tiles along each side of a node.
pub const NODE_SIZE: usize = 2;

/// Tile colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TileType {
    Blue,
    Green,
    Orange,
    Pink,
    Purple,
    Red,
    Yellow,
}

impl TileType {
    pub const ALL: [Self; 7] = [
        Self::Blue,
        Self::Green,
        Self::Orange,
        Self::Pink,
        Self::Purple,
        Self::Red,
        Self::Yellow,
    ];

    /// Single-letter code used by level files.
    pub fn letter(self) -> char {
        match self {
            Self::Blue => 'B',
            Self::Green => 'G',
            Self::Orange => 'O',
            Self::Pink => 'P',
            Self::Purple => 'U',
            Self::Red => 'R',
            Self::Yellow => 'Y',
        }
    }

    /// Parse a level-file letter (case-insensitive).
    pub fn from_letter(c: char) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.letter() == c.to_ascii_uppercase())
    }

    /// Parse a colour name such as `red` or a single letter.
    pub fn from_name(s: &str) -> Option<Self> {
        let lower = s.to_ascii_lowercase();
        let by_name = match lower.as_str() {
            "blue" => Some(Self::Blue),
            "green" => Some(Self::Green),
            "orange" => Some(Self::Orange),
            "pink" => Some(Self::Pink),
            "purple" => Some(Self::Purple),
            "red" => Some(Self::Red),
            "yellow" => Some(Self::Yellow),
            _ => None,
        };
        by_name.or_else(|| {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Self::from_letter(c),
                _ => None,
            }
        })
    }

    /// Index 0..7, used for theme colour lookup.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for TileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Orange => "orange",
            Self::Pink => "pink",
            Self::Purple => "purple",
            Self::Red => "red",
            Self::Yellow => "yellow",
        };
        f.write_str(name)
    }
}

/// Position of a sub-tile inside its node. `y = 0` is the top row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubCoord {
    pub x: usize,
    pub y: usize,
}

impl SubCoord {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// All sub-coordinates in row-major order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..NODE_SIZE).flat_map(|y| (0..NODE_SIZE).map(move |x| Self::new(x, y)))
    }
}

/// Handle into a node's tile arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileId(pub usize);

/// A logical tile. Coalesced tiles own several sub-coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub tile_type: TileType,
    pub subs: BTreeSet<SubCoord>,
    /// Set once a blast has been requested; never cleared.
    pub blasted: bool,
}

impl Tile {
    pub fn new(tile_type: TileType, sub: SubCoord) -> Self {
        Self {
            tile_type,
            subs: BTreeSet::from([sub]),
            blasted: false,
        }
    }

    /// Marks the tile blasted. Returns false if it already was.
    pub fn mark_blasted(&mut self) -> bool {
        !std::mem::replace(&mut self.blasted, true)
    }

    /// True when `subs` plus `extra` covers a full rectangle.
    pub fn is_rect_with(&self, extra: &[SubCoord]) -> bool {
        is_rect(self.subs.iter().chain(extra.iter()).copied())
    }
}

/// True when the given sub-coordinates exactly fill their bounding box.
pub fn is_rect(subs: impl Iterator<Item = SubCoord>) -> bool {
    let set: BTreeSet<SubCoord> = subs.collect();
    let Some(first) = set.first() else {
        return false;
    };
    let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
    for s in &set {
        min_x = min_x.min(s.x);
        max_x = max_x.max(s.x);
        min_y = min_y.min(s.y);
        max_y = max_y.max(s.y);
    }
    (max_x - min_x + 1) * (max_y - min_y + 1) == set.len()
}
