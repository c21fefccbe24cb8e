//! Match engine: flood fill of one colour across node boundaries.

use crate::grid::Grid;
use crate::node::{Node, NodeId, mirror, outward_directions};
use crate::tile::{TileId, TileType};
use std::collections::{BTreeMap, BTreeSet};

/// A region blasts only when it holds at least this many distinct tiles.
pub const MIN_MATCH_TILES: usize = 3;

/// Global handle to a tile: owning node plus arena slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileRef {
    pub node: NodeId,
    pub tile: TileId,
}

/// Connected same-colour region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchGroup {
    pub tile_type: TileType,
    pub nodes: BTreeSet<NodeId>,
    pub tiles: BTreeSet<TileRef>,
}

impl MatchGroup {
    /// Coalesced tiles count once.
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn qualifies(&self) -> bool {
        self.tile_count() >= MIN_MATCH_TILES
    }
}

/// Flood fill from `seed` over tiles of `tile_type`.
///
/// Every sub-coordinate of the colour inside a visited node joins the region. A match crosses into
/// a neighbouring node only through a sub-coordinate's outward sides, and only when the mirrored
/// sub-coordinate across the edge has the same colour. Nodes carrying an obstacle are never
/// entered.
pub fn find_matches(
    grid: &Grid,
    nodes: &BTreeMap<NodeId, Node>,
    seed: NodeId,
    tile_type: TileType,
) -> MatchGroup {
    let mut group = MatchGroup {
        tile_type,
        nodes: BTreeSet::new(),
        tiles: BTreeSet::new(),
    };
    let Some(seed_node) = nodes.get(&seed) else {
        return group;
    };
    if seed_node.subs_of(tile_type).next().is_none() {
        return group;
    }

    let mut visited = BTreeSet::from([seed]);
    let mut stack = vec![seed];
    while let Some(id) = stack.pop() {
        let Some(node) = nodes.get(&id) else {
            continue;
        };
        group.nodes.insert(id);
        for sub in node.subs_of(tile_type) {
            if let Some(tile) = node.tile_id_at(sub) {
                group.tiles.insert(TileRef { node: id, tile });
            }
            let Some(cell) = node.cell else {
                continue;
            };
            for dir in outward_directions(sub) {
                let Some(next_id) = grid.node_at(cell.step(dir)) else {
                    continue;
                };
                if visited.contains(&next_id) {
                    continue;
                }
                let Some(next) = nodes.get(&next_id) else {
                    continue;
                };
                if next.obstacle.is_some() {
                    continue;
                }
                if next.tile_type_at(mirror(sub, dir)) == Some(tile_type) {
                    visited.insert(next_id);
                    stack.push(next_id);
                }
            }
        }
    }
    group
}

/// Every qualifying region that contains `seed`, one per colour of the seed.
pub fn qualifying_matches(
    grid: &Grid,
    nodes: &BTreeMap<NodeId, Node>,
    seed: NodeId,
) -> Vec<MatchGroup> {
    let Some(node) = nodes.get(&seed) else {
        return Vec::new();
    };
    node.tile_types()
        .map(|t| find_matches(grid, nodes, seed, t))
        .filter(MatchGroup::qualifies)
        .collect()
}
