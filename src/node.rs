//! Nodes: 2x2 pieces made of coloured tiles.
//!
//! Tiles live in a per-node arena. Each sub-coordinate slot holds a [`TileId`] handle; a
//! coalesced tile is referenced by several slots. The colour index is derived from the slots and
//! rebuilt after every mutation.

use crate::grid::{Coord, Direction};
use crate::obstacle::NodeObstacle;
use crate::tile::{NODE_SIZE, SubCoord, Tile, TileId, TileType};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Stable node identity; survives moves between cells and the deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outward sides of each sub-coordinate, indexed `[y][x]`. Only these sides may continue a
/// match into the neighbouring node.
const OUTWARD: [[[Direction; 2]; NODE_SIZE]; NODE_SIZE] = [
    [
        [Direction::Left, Direction::Up],
        [Direction::Right, Direction::Up],
    ],
    [
        [Direction::Left, Direction::Down],
        [Direction::Right, Direction::Down],
    ],
];

/// Sides of the node that `sub` touches.
#[inline]
pub fn outward_directions(sub: SubCoord) -> [Direction; 2] {
    OUTWARD[sub.y][sub.x]
}

/// Sub-coordinate met in the neighbouring node after crossing `dir` from `sub`.
#[inline]
pub fn mirror(sub: SubCoord, dir: Direction) -> SubCoord {
    match dir {
        Direction::Left | Direction::Right => SubCoord::new(NODE_SIZE - 1 - sub.x, sub.y),
        Direction::Up | Direction::Down => SubCoord::new(sub.x, NODE_SIZE - 1 - sub.y),
    }
}

/// Neighbour of `sub` inside the same node.
fn inner_neighbor(sub: SubCoord, dir: Direction) -> Option<SubCoord> {
    let (dx, dy) = dir.offset();
    let x = sub.x as i32 + dx;
    let y = sub.y as i32 + dy;
    let range = 0..NODE_SIZE as i32;
    (range.contains(&x) && range.contains(&y)).then(|| SubCoord::new(x as usize, y as usize))
}

/// Colour layout used to build nodes. Row-major: (0,0) (1,0) (0,1) (1,1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeTemplate(pub [TileType; NODE_SIZE * NODE_SIZE]);

impl NodeTemplate {
    pub const fn solid(t: TileType) -> Self {
        Self([t; NODE_SIZE * NODE_SIZE])
    }

    #[inline]
    pub fn get(&self, sub: SubCoord) -> TileType {
        self.0[sub.y * NODE_SIZE + sub.x]
    }

    /// Parse four tile letters, e.g. `RRGB`.
    pub fn parse(s: &str) -> Option<Self> {
        let mut types = [TileType::Red; NODE_SIZE * NODE_SIZE];
        let mut chars = s.chars();
        for slot in &mut types {
            *slot = TileType::from_letter(chars.next()?)?;
        }
        chars.next().is_none().then_some(Self(types))
    }
}

impl fmt::Display for NodeTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for t in self.0 {
            write!(f, "{}", t.letter())?;
        }
        Ok(())
    }
}

/// In-flight fall. `remaining` is the visual distance (in rows) still above the target cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallMotion {
    pub remaining: f32,
    pub velocity: f32,
}

impl FallMotion {
    pub fn new(rows: i32) -> Self {
        Self {
            remaining: rows as f32,
            velocity: 0.0,
        }
    }

    /// Advance one frame. Returns true once landed.
    pub fn step(&mut self, acceleration: f32, max_speed: f32) -> bool {
        self.velocity = (self.velocity + acceleration).min(max_speed);
        self.remaining -= self.velocity;
        if self.remaining <= 0.0 {
            self.remaining = 0.0;
            self.velocity = 0.0;
            return true;
        }
        false
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    /// Back-reference to the owning cell; None while the node sits in the deck.
    pub cell: Option<Coord>,
    pub obstacle: Option<NodeObstacle>,
    tiles: Vec<Option<Tile>>,
    slots: [[Option<TileId>; NODE_SIZE]; NODE_SIZE],
    index: BTreeMap<TileType, BTreeSet<SubCoord>>,
    pub fall: Option<FallMotion>,
    /// Frames left in the grow animation; Some while rearranging.
    pub rearrange_ticks: Option<u32>,
    pub rearrange_pending: bool,
}

impl Node {
    /// Build from a template, coalescing a sub-tile into its left neighbour, else its upper
    /// neighbour, when the colours match.
    pub fn from_template(id: NodeId, template: &NodeTemplate) -> Self {
        let mut node = Self {
            id,
            cell: None,
            obstacle: None,
            tiles: Vec::with_capacity(NODE_SIZE * NODE_SIZE),
            slots: [[None; NODE_SIZE]; NODE_SIZE],
            index: BTreeMap::new(),
            fall: None,
            rearrange_ticks: None,
            rearrange_pending: false,
        };
        for x in 0..NODE_SIZE {
            for y in 0..NODE_SIZE {
                let sub = SubCoord::new(x, y);
                let tile_type = template.get(sub);
                let left = (x > 0).then(|| SubCoord::new(x - 1, y));
                let up = (y > 0).then(|| SubCoord::new(x, y - 1));
                let shared = [left, up]
                    .into_iter()
                    .flatten()
                    .find(|&n| node.tile_type_at(n) == Some(tile_type))
                    .and_then(|n| node.tile_id_at(n));
                let id = match shared {
                    Some(id) => {
                        if let Some(tile) = node.tile_mut(id) {
                            tile.subs.insert(sub);
                        }
                        id
                    }
                    None => {
                        node.tiles.push(Some(Tile::new(tile_type, sub)));
                        TileId(node.tiles.len() - 1)
                    }
                };
                node.slots[y][x] = Some(id);
            }
        }
        node.rebuild_index();
        node
    }

    pub fn with_obstacle(mut self, obstacle: NodeObstacle) -> Self {
        self.obstacle = Some(obstacle);
        self
    }

    #[inline]
    pub fn is_falling(&self) -> bool {
        self.fall.is_some()
    }

    #[inline]
    pub fn is_rearranging(&self) -> bool {
        self.rearrange_ticks.is_some()
    }

    #[inline]
    pub fn tile_id_at(&self, sub: SubCoord) -> Option<TileId> {
        self.slots[sub.y][sub.x]
    }

    pub fn tile_at(&self, sub: SubCoord) -> Option<&Tile> {
        self.tile_id_at(sub).and_then(|id| self.tile(id))
    }

    pub fn tile_type_at(&self, sub: SubCoord) -> Option<TileType> {
        self.tile_at(sub).map(|t| t.tile_type)
    }

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(id.0).and_then(Option::as_ref)
    }

    pub fn tile_mut(&mut self, id: TileId) -> Option<&mut Tile> {
        self.tiles.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Live tiles in arena order.
    pub fn tiles(&self) -> impl Iterator<Item = (TileId, &Tile)> {
        self.tiles
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.as_ref().map(|t| (TileId(i), t)))
    }

    pub fn tile_count(&self) -> usize {
        self.tiles().count()
    }

    pub fn is_empty(&self) -> bool {
        self.tile_count() == 0
    }

    /// Colours present, in `TileType` order.
    pub fn tile_types(&self) -> impl Iterator<Item = TileType> + '_ {
        self.index.keys().copied()
    }

    /// Sub-coordinates currently holding `tile_type`.
    pub fn subs_of(&self, tile_type: TileType) -> impl Iterator<Item = SubCoord> + '_ {
        self.index.get(&tile_type).into_iter().flatten().copied()
    }

    pub fn empty_subs(&self) -> Vec<SubCoord> {
        SubCoord::all()
            .filter(|&s| self.tile_id_at(s).is_none())
            .collect()
    }

    fn rebuild_index(&mut self) {
        let mut index: BTreeMap<TileType, BTreeSet<SubCoord>> = BTreeMap::new();
        for sub in SubCoord::all() {
            if let Some(t) = self.tile_type_at(sub) {
                index.entry(t).or_default().insert(sub);
            }
        }
        self.index = index;
    }

    /// Detach a tile from the node. Returns the removed tile.
    pub fn remove_tile(&mut self, id: TileId) -> Option<Tile> {
        let tile = self.tiles.get_mut(id.0)?.take()?;
        for row in &mut self.slots {
            for slot in row.iter_mut() {
                if *slot == Some(id) {
                    *slot = None;
                }
            }
        }
        self.rebuild_index();
        Some(tile)
    }

    /// Grow the remaining tiles into vacated sub-coordinates. Returns true if the layout changed.
    ///
    /// A single remaining colour takes the whole node. With several colours, each pass lets a
    /// tile claim adjacent empty sub-coordinates as long as its footprint stays a rectangle;
    /// passes repeat until nothing grows.
    pub fn regrow(&mut self) -> bool {
        if self.is_empty() || self.empty_subs().is_empty() {
            return false;
        }

        if self.index.len() == 1 {
            let mut live = self.tiles().map(|(id, _)| id);
            let Some(keep) = live.next() else {
                return false;
            };
            let merged: Vec<TileId> = live.collect();
            for id in merged {
                self.tiles[id.0] = None;
            }
            if let Some(tile) = self.tile_mut(keep) {
                tile.subs = SubCoord::all().collect();
            }
            self.slots = [[Some(keep); NODE_SIZE]; NODE_SIZE];
            self.rebuild_index();
            return true;
        }

        let mut changed = false;
        loop {
            let mut claims: BTreeMap<TileId, Vec<SubCoord>> = BTreeMap::new();
            for sub in self.empty_subs() {
                for dir in Direction::ALL {
                    let Some(from) = inner_neighbor(sub, dir) else {
                        continue;
                    };
                    let Some(id) = self.tile_id_at(from) else {
                        continue;
                    };
                    let Some(tile) = self.tile(id) else {
                        continue;
                    };
                    let claimed = claims.entry(id).or_default();
                    let mut extra = claimed.clone();
                    extra.push(sub);
                    if tile.is_rect_with(&extra) {
                        claimed.push(sub);
                        break;
                    }
                }
            }
            if claims.values().all(Vec::is_empty) {
                break;
            }
            for (id, subs) in claims {
                for sub in subs {
                    self.slots[sub.y][sub.x] = Some(id);
                    if let Some(tile) = self.tile_mut(id) {
                        tile.subs.insert(sub);
                    }
                }
            }
            changed = true;
        }
        self.rebuild_index();
        changed
    }

    /// Colours as a template, if every slot is filled.
    pub fn template(&self) -> Option<NodeTemplate> {
        let mut types = [TileType::Red; NODE_SIZE * NODE_SIZE];
        for sub in SubCoord::all() {
            types[sub.y * NODE_SIZE + sub.x] = self.tile_type_at(sub)?;
        }
        Some(NodeTemplate(types))
    }
}
