//! Board: grid, node arena and the resolution pipeline.
//!
//! One call to [`Board::tick`] is one frame. A tick first advances every in-flight fall and
//! grow animation, then evaluates the current [`Phase`]. While the phase is anything but
//! [`Phase::Idle`] the board is busy and rejects player input, so a cascade of
//! blast, fall, fill and recheck always runs to completion before the next move.

use crate::events::BoardEvent;
use crate::grid::{Coord, Grid};
use crate::matching::{TileRef, qualifying_matches};
use crate::node::{FallMotion, Node, NodeId, NodeTemplate, outward_directions};
use crate::obstacle::{CellObstacle, Obstacle};
use crate::spawner::Spawner;
use crate::tile::SubCoord;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use thiserror::Error;
use tracing::{debug, trace};

/// Animation lengths, in frames, and fall physics in rows per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timings {
    pub swap_ticks: u32,
    pub blast_ticks: u32,
    pub rearrange_ticks: u32,
    pub fall_acceleration: f32,
    pub fall_max_speed: f32,
}

impl Default for Timings {
    /// Tuned for roughly 60 frames per second.
    fn default() -> Self {
        Self {
            swap_ticks: 30,
            blast_ticks: 9,
            rearrange_ticks: 15,
            fall_acceleration: 0.02,
            fall_max_speed: 0.5,
        }
    }
}

impl Timings {
    /// Every animation finishes on the frame after it starts.
    pub const fn instant() -> Self {
        Self {
            swap_ticks: 0,
            blast_ticks: 0,
            rearrange_ticks: 0,
            fall_acceleration: 1000.0,
            fall_max_speed: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Swapping,
    Matching,
    Blasting,
    Falling,
    Filling,
    RecheckMatching,
    /// Torn down; ticks do nothing.
    Cancelled,
}

/// Rejected player request.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    #[error("board is busy resolving a move")]
    Busy,
    #[error("the game is over")]
    GameOver,
    #[error("no node at {0}")]
    NoNode(Coord),
    #[error("node at {0} is locked by an obstacle")]
    Obstacle(Coord),
    #[error("cannot swap a cell with itself")]
    SameCell,
    #[error("the deck is empty")]
    DeckEmpty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlastStage {
    /// Host is still falling or growing.
    Waiting,
    Animating(u32),
    Done,
}

#[derive(Debug, Clone, Copy)]
struct BlastTask {
    tile: TileRef,
    stage: BlastStage,
}

#[derive(Debug, Clone)]
pub struct Board {
    grid: Grid,
    nodes: BTreeMap<NodeId, Node>,
    next_id: u32,
    spawner: Spawner,
    timings: Timings,
    phase: Phase,
    swap_ticks: u32,
    /// Cells of the swap in flight.
    swap_cells: Option<(Coord, Option<Coord>)>,
    blasts: Vec<BlastTask>,
    /// Nodes to match at the next (re)check.
    candidates: BTreeSet<NodeId>,
    events: VecDeque<BoardEvent>,
    cascade: u32,
}

impl Board {
    pub fn new(grid: Grid, spawner: Spawner, timings: Timings) -> Self {
        Self {
            grid,
            nodes: BTreeMap::new(),
            next_id: 0,
            spawner,
            timings,
            phase: Phase::Idle,
            swap_ticks: 0,
            swap_cells: None,
            blasts: Vec::new(),
            candidates: BTreeSet::new(),
            events: VecDeque::new(),
            cascade: 0,
        }
    }

    // --- ACCESSORS ---

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn timings(&self) -> Timings {
        self.timings
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The busy gate: true for the whole swap and cascade.
    #[inline]
    pub fn is_busy(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Matching steps run since the last move.
    pub fn cascade(&self) -> u32 {
        self.cascade
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Node at `coord`; None when out of bounds or unoccupied.
    pub fn node_at(&self, coord: Coord) -> Option<&Node> {
        self.grid.node_at(coord).and_then(|id| self.nodes.get(&id))
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = BoardEvent> + '_ {
        self.events.drain(..)
    }

    // --- SETUP ---

    /// New node that is not on the board yet, e.g. for the deck.
    pub fn create_node(&mut self, template: &NodeTemplate) -> Node {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        Node::from_template(id, template)
    }

    /// Put a detached node into a vacant Normal cell.
    pub fn place_node(&mut self, coord: Coord, mut node: Node) -> NodeId {
        let cell = self.grid.cell_mut(coord);
        assert!(cell.is_vacant(), "cell {coord} cannot take a node");
        let id = node.id;
        cell.node = Some(id);
        node.cell = Some(coord);
        self.nodes.insert(id, node);
        id
    }

    pub fn place_obstacle(&mut self, coord: Coord, obstacle: CellObstacle) {
        let cell = self.grid.cell_mut(coord);
        assert!(cell.is_vacant(), "cell {coord} cannot take an obstacle");
        cell.obstacle = Some(obstacle);
    }

    /// Settle the initial layout: drop occupants into gaps, then fill.
    pub fn start(&mut self) {
        if self.phase == Phase::Idle {
            debug!("board start");
            self.phase = Phase::Falling;
        }
    }

    // --- INPUT ---

    /// Node id at `coord` if it may take part in a swap right now.
    pub fn check_swap_target(&self, coord: Coord) -> Result<NodeId, InputError> {
        if self.is_busy() {
            return Err(InputError::Busy);
        }
        let node = self.node_at(coord).ok_or(InputError::NoNode(coord))?;
        if node.obstacle.is_some() {
            return Err(InputError::Obstacle(coord));
        }
        Ok(node.id)
    }

    /// Swap the nodes of two cells. Both nodes seed the next match.
    pub fn swap(&mut self, a: Coord, b: Coord) -> Result<(), InputError> {
        if a == b {
            return Err(InputError::SameCell);
        }
        let id_a = self.check_swap_target(a)?;
        let id_b = self.check_swap_target(b)?;
        self.grid.cell_mut(a).node = Some(id_b);
        self.grid.cell_mut(b).node = Some(id_a);
        if let Some(node) = self.nodes.get_mut(&id_a) {
            node.cell = Some(b);
        }
        if let Some(node) = self.nodes.get_mut(&id_b) {
            node.cell = Some(a);
        }
        self.begin_swap(a, Some(b), &[id_a, id_b]);
        Ok(())
    }

    /// Replace the node at `coord` with `incoming` and return the node taken off the board.
    ///
    /// Panics when `coord` holds no node; validate with [`Board::check_swap_target`] first.
    pub fn swap_in(&mut self, coord: Coord, mut incoming: Node) -> Node {
        let Some(mut outgoing) = self
            .grid
            .cell(coord)
            .node
            .and_then(|id| self.nodes.remove(&id))
        else {
            panic!("no node at {coord} to swap out");
        };
        outgoing.cell = None;
        outgoing.fall = None;
        outgoing.rearrange_ticks = None;

        let id = incoming.id;
        incoming.cell = Some(coord);
        self.grid.cell_mut(coord).node = Some(id);
        self.nodes.insert(id, incoming);
        self.begin_swap(coord, None, &[id]);
        outgoing
    }

    /// Tiles that would blast if `incoming` replaced the node at `coord`.
    pub fn preview_swap_in(&self, coord: Coord, incoming: &Node) -> usize {
        let Some(old) = self.grid.node_at(coord) else {
            return 0;
        };
        let mut grid = self.grid.clone();
        let mut nodes = self.nodes.clone();
        nodes.remove(&old);
        let mut node = incoming.clone();
        node.cell = Some(coord);
        grid.cell_mut(coord).node = Some(node.id);
        let id = node.id;
        nodes.insert(id, node);
        qualifying_matches(&grid, &nodes, id)
            .iter()
            .map(|g| g.tile_count())
            .sum()
    }

    fn begin_swap(&mut self, a: Coord, b: Option<Coord>, seeds: &[NodeId]) {
        debug!(%a, ?b, "swap");
        self.candidates.extend(seeds.iter().copied());
        self.events.push_back(BoardEvent::SwapStart { a, b });
        self.swap_cells = Some((a, b));
        self.cascade = 0;
        self.swap_ticks = self.timings.swap_ticks;
        self.phase = Phase::Swapping;
    }

    // --- PIPELINE ---

    /// Advance one frame.
    pub fn tick(&mut self) {
        if self.phase == Phase::Cancelled {
            return;
        }
        self.advance_motion();
        match self.phase {
            Phase::Idle | Phase::Cancelled => {}
            Phase::Swapping => {
                self.swap_ticks = self.swap_ticks.saturating_sub(1);
                if self.swap_ticks == 0 {
                    if let Some((a, b)) = self.swap_cells.take() {
                        self.events.push_back(BoardEvent::SwapEnd { a, b });
                    }
                    self.set_phase(Phase::Matching);
                }
            }
            Phase::Matching | Phase::RecheckMatching => {
                if self.is_settled() {
                    self.run_matches();
                }
            }
            Phase::Blasting => self.step_blasts(),
            Phase::Falling => {
                self.apply_gravity();
                self.set_phase(Phase::Filling);
            }
            Phase::Filling => {
                self.fill();
                self.set_phase(Phase::RecheckMatching);
            }
        }
    }

    /// Tick until idle. Returns false if still busy after `max_ticks`.
    pub fn settle(&mut self, max_ticks: u32) -> bool {
        for _ in 0..max_ticks {
            if !self.is_busy() {
                return true;
            }
            self.tick();
        }
        !self.is_busy()
    }

    /// Cancel in-flight work. Pending rearranges are applied at once so every node stays
    /// well formed; animations are dropped.
    pub fn teardown(&mut self) {
        if self.phase == Phase::Cancelled {
            return;
        }
        debug!(phase = ?self.phase, "teardown");
        for task in std::mem::take(&mut self.blasts) {
            if matches!(task.stage, BlastStage::Animating(_)) {
                if let Some(node) = self.nodes.get_mut(&task.tile.node) {
                    node.rearrange_pending = true;
                }
            }
        }
        let pending: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|n| n.rearrange_pending)
            .map(|n| n.id)
            .collect();
        for id in pending {
            self.rearrange(id);
        }
        for node in self.nodes.values_mut() {
            node.fall = None;
            node.rearrange_ticks = None;
        }
        for cell in self.grid.cells_mut() {
            if let Some(obstacle) = cell.obstacle.as_mut() {
                obstacle.fall = None;
            }
        }
        self.candidates.clear();
        self.phase = Phase::Cancelled;
    }

    fn set_phase(&mut self, phase: Phase) {
        trace!(from = ?self.phase, to = ?phase, "phase");
        self.phase = phase;
    }

    /// Nothing falling or growing.
    pub fn is_settled(&self) -> bool {
        self.nodes
            .values()
            .all(|n| !n.is_falling() && !n.is_rearranging())
            && self
                .grid
                .cells()
                .all(|c| c.obstacle.as_ref().is_none_or(|o| !o.is_falling()))
    }

    fn advance_motion(&mut self) {
        let Timings {
            fall_acceleration: accel,
            fall_max_speed: max_speed,
            ..
        } = self.timings;
        for node in self.nodes.values_mut() {
            if let Some(motion) = node.fall.as_mut() {
                if motion.step(accel, max_speed) {
                    node.fall = None;
                    self.candidates.insert(node.id);
                }
            }
            match node.rearrange_ticks {
                Some(0) => {
                    node.rearrange_ticks = None;
                    self.candidates.insert(node.id);
                }
                Some(n) => node.rearrange_ticks = Some(n - 1),
                None => {}
            }
        }
        for cell in self.grid.cells_mut() {
            if let Some(obstacle) = cell.obstacle.as_mut() {
                if let Some(motion) = obstacle.fall.as_mut() {
                    if motion.step(accel, max_speed) {
                        obstacle.fall = None;
                    }
                }
            }
        }
    }

    fn run_matches(&mut self) {
        let seeds = std::mem::take(&mut self.candidates);
        let mut tiles = BTreeSet::new();
        for seed in seeds {
            let Some(node) = self.nodes.get(&seed) else {
                continue;
            };
            if node.obstacle.is_some() || node.cell.is_none() {
                continue;
            }
            for group in qualifying_matches(&self.grid, &self.nodes, seed) {
                debug!(
                    seed = %seed,
                    colour = %group.tile_type,
                    nodes = group.nodes.len(),
                    tiles = group.tile_count(),
                    "match"
                );
                tiles.extend(group.tiles);
            }
        }

        let mut queued = 0;
        for tile in tiles {
            let fresh = self
                .nodes
                .get_mut(&tile.node)
                .and_then(|n| n.tile_mut(tile.tile))
                .is_some_and(|t| t.mark_blasted());
            if fresh {
                self.blasts.push(BlastTask {
                    tile,
                    stage: BlastStage::Waiting,
                });
                queued += 1;
            }
        }

        if queued == 0 {
            debug!(cascade = self.cascade, "board settled");
            self.events.push_back(BoardEvent::Settled);
            self.set_phase(Phase::Idle);
        } else {
            self.cascade += 1;
            debug!(cascade = self.cascade, tiles = queued, "blast");
            self.events.push_back(BoardEvent::Blast { tiles: queued });
            self.set_phase(Phase::Blasting);
        }
    }

    fn step_blasts(&mut self) {
        let blast_ticks = self.timings.blast_ticks;
        let mut tasks = std::mem::take(&mut self.blasts);
        for task in &mut tasks {
            match task.stage {
                BlastStage::Waiting => {
                    let ready = self
                        .nodes
                        .get(&task.tile.node)
                        .is_some_and(|n| !n.is_rearranging() && !n.is_falling());
                    if ready {
                        self.execute_blast(task.tile);
                        task.stage = BlastStage::Animating(blast_ticks);
                    }
                }
                BlastStage::Animating(0) => {
                    if let Some(node) = self.nodes.get_mut(&task.tile.node) {
                        node.rearrange_pending = true;
                    }
                    task.stage = BlastStage::Done;
                }
                BlastStage::Animating(n) => task.stage = BlastStage::Animating(n - 1),
                BlastStage::Done => {}
            }
        }
        tasks.retain(|t| t.stage != BlastStage::Done && self.nodes.contains_key(&t.tile.node));

        let blasting: BTreeSet<NodeId> = tasks.iter().map(|t| t.tile.node).collect();
        self.blasts = tasks;
        let ready: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|n| n.rearrange_pending && !n.is_rearranging() && !blasting.contains(&n.id))
            .map(|n| n.id)
            .collect();
        for id in ready {
            self.rearrange(id);
        }

        let done = self.blasts.is_empty()
            && self
                .nodes
                .values()
                .all(|n| !n.rearrange_pending && !n.is_rearranging());
        if done {
            self.events.push_back(BoardEvent::AfterBlast);
            self.set_phase(Phase::Falling);
        }
    }

    /// Remove one tile and hit the obstacles next to it.
    fn execute_blast(&mut self, tile_ref: TileRef) {
        let Some(node) = self.nodes.get_mut(&tile_ref.node) else {
            return;
        };
        let Some(cell) = node.cell else {
            return;
        };
        let Some(tile) = node.remove_tile(tile_ref.tile) else {
            return;
        };
        let subs: Vec<SubCoord> = tile.subs.iter().copied().collect();
        trace!(node = %tile_ref.node, %cell, colour = %tile.tile_type, "tile blast");

        let sides: BTreeSet<_> = subs.iter().flat_map(|&s| outward_directions(s)).collect();
        self.events.push_back(BoardEvent::TileBlast {
            tile_type: tile.tile_type,
            cell,
            subs,
        });
        for dir in sides {
            self.hit_obstacle(cell.step(dir));
        }
    }

    fn hit_obstacle(&mut self, coord: Coord) {
        if !self.grid.in_bounds(coord) {
            return;
        }
        let cell = self.grid.cell_mut(coord);
        if let Some(obstacle) = cell.obstacle.as_mut() {
            if obstacle.on_blast_near() {
                let kind = obstacle.kind();
                cell.obstacle = None;
                debug!(%coord, kind = kind.name(), "obstacle destroyed");
                self.events
                    .push_back(BoardEvent::ObstacleDestroyed { kind, cell: coord });
            }
            return;
        }
        let Some(id) = cell.node else {
            return;
        };
        let Some(host) = self.nodes.get_mut(&id) else {
            return;
        };
        let Some(obstacle) = host.obstacle.as_mut() else {
            return;
        };
        if obstacle.on_blast_near() {
            let kind = obstacle.kind();
            host.obstacle = None;
            self.candidates.insert(id);
            debug!(%coord, kind = kind.name(), "obstacle destroyed");
            self.events
                .push_back(BoardEvent::ObstacleDestroyed { kind, cell: coord });
        }
    }

    /// Destroy an empty node, or regrow and start the grow animation.
    fn rearrange(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        node.rearrange_pending = false;
        if node.is_empty() {
            self.destroy_node(id);
            return;
        }
        node.regrow();
        node.rearrange_ticks = Some(self.timings.rearrange_ticks);
    }

    fn destroy_node(&mut self, id: NodeId) {
        let Some(node) = self.nodes.remove(&id) else {
            return;
        };
        self.candidates.remove(&id);
        if let Some(cell) = node.cell {
            self.grid.cell_mut(cell).node = None;
            trace!(node = %id, %cell, "node destroyed");
            self.events
                .push_back(BoardEvent::NodeDestroyed { node: id, cell });
        }
    }

    /// Per column, bottom to top: drop each occupant to the lowest vacant Normal cell below it.
    /// Empty cells are passed through. Iced hosts stay put and act as a floor.
    fn apply_gravity(&mut self) {
        let width = self.grid.width;
        let height = self.grid.height as i32;
        for x in 0..width {
            for from in self.grid.column(x).rev() {
                let cell = self.grid.cell(from);
                if !cell.is_normal() || !cell.is_occupied() || self.is_pinned(from) {
                    continue;
                }
                let mut target = None;
                for y in from.y + 1..height {
                    let below = self.grid.cell(Coord::new(from.x, y));
                    if below.is_vacant() {
                        target = Some(below.coord);
                    } else if below.is_normal() {
                        break;
                    }
                }
                if let Some(to) = target {
                    self.move_occupant(from, to);
                }
            }
        }
    }

    /// Node held in place by its obstacle.
    fn is_pinned(&self, coord: Coord) -> bool {
        self.node_at(coord).is_some_and(|n| n.obstacle.is_some())
    }

    fn move_occupant(&mut self, from: Coord, to: Coord) {
        let rows = to.y - from.y;
        let cell = self.grid.cell_mut(from);
        let node = cell.node.take();
        let obstacle = cell.obstacle.take();
        if let Some(id) = node {
            self.grid.cell_mut(to).node = Some(id);
            if let Some(n) = self.nodes.get_mut(&id) {
                n.cell = Some(to);
                n.fall = Some(FallMotion::new(rows));
            }
        }
        if let Some(mut obstacle) = obstacle {
            obstacle.fall = Some(FallMotion::new(rows));
            self.grid.cell_mut(to).obstacle = Some(obstacle);
        }
        trace!(%from, %to, "fall");
    }

    /// Per column left to right, per vacant cell bottom to top: spawn a node above the column
    /// and let it fall into place. The n-th spawn of a column starts n rows above the top.
    fn fill(&mut self) {
        let mut spawned_total = 0;
        for x in 0..self.grid.width {
            let mut spawned = 0;
            for coord in self.grid.column(x).rev() {
                if !self.grid.cell(coord).is_vacant() {
                    continue;
                }
                let template = self.spawner.next_template();
                let mut node = self.create_node(&template);
                node.fall = Some(FallMotion::new(coord.y + 1 + spawned));
                trace!(node = %node.id, %coord, %template, "spawn");
                self.place_node(coord, node);
                spawned += 1;
            }
            spawned_total += spawned;
        }
        if spawned_total > 0 {
            debug!(nodes = spawned_total, "fill");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obstacle::{NodeObstacle, ObstacleKind};
    use crate::spawner::SpawnEntry;
    use crate::tile::TileType::{self, Blue as B, Green as G, Purple as U, Red as R, Yellow as Y};

    fn spawner() -> Spawner {
        let entry = SpawnEntry {
            template: NodeTemplate::parse("BGOP").unwrap(),
            weight: 1,
        };
        Spawner::new(vec![entry], 1).unwrap()
    }

    fn board(w: usize, h: usize) -> Board {
        Board::new(Grid::new(w, h), spawner(), Timings::instant())
    }

    fn put(board: &mut Board, x: i32, y: i32, types: [TileType; 4]) -> NodeId {
        let node = board.create_node(&NodeTemplate(types));
        board.place_node(Coord::new(x, y), node)
    }

    fn assert_consistent(board: &Board) {
        for cell in board.grid().cells() {
            assert!(!(cell.node.is_some() && cell.obstacle.is_some()));
            if let Some(id) = cell.node {
                assert_eq!(board.node(id).and_then(|n| n.cell), Some(cell.coord));
            }
        }
        for node in board.nodes() {
            let cell = node.cell.expect("board node without cell");
            assert_eq!(board.grid().node_at(cell), Some(node.id));
        }
    }

    fn events(board: &mut Board) -> Vec<BoardEvent> {
        board.drain_events().collect()
    }

    #[test]
    fn test_start_drops_and_fills() {
        let mut b = board(2, 3);
        let a = put(&mut b, 0, 0, [R; 4]);
        b.start();
        assert!(b.is_busy());
        assert!(b.settle(100));
        assert_eq!(b.node(a).and_then(|n| n.cell), Some(Coord::new(0, 2)));
        assert_eq!(b.node(a).map(Node::tile_count), Some(1));
        assert!(b.grid().cells().all(|c| c.is_occupied()));
        assert_eq!(b.nodes().count(), 6);
        assert_consistent(&b);
    }

    #[test]
    fn test_fall_passes_through_empty_cells() {
        let grid = Grid::from_types(1, 3, |c| {
            if c.y == 1 {
                crate::grid::CellType::Empty
            } else {
                crate::grid::CellType::Normal
            }
        });
        let mut b = Board::new(grid, spawner(), Timings::instant());
        let a = put(&mut b, 0, 0, [R; 4]);
        b.start();
        assert!(b.settle(100));
        assert_eq!(b.node(a).and_then(|n| n.cell), Some(Coord::new(0, 2)));
        assert!(b.grid().cell(Coord::new(0, 1)).node.is_none());
        assert!(b.grid().cell(Coord::new(0, 0)).node.is_some());
    }

    #[test]
    fn test_two_tiles_never_blast() {
        let mut b = board(2, 1);
        put(&mut b, 0, 0, [R; 4]);
        put(&mut b, 1, 0, [R; 4]);
        b.swap(Coord::new(0, 0), Coord::new(1, 0)).unwrap();
        assert!(b.settle(100));
        let ev = events(&mut b);
        assert!(!ev.iter().any(|e| matches!(e, BoardEvent::Blast { .. })));
        assert_eq!(ev.last(), Some(&BoardEvent::Settled));
        assert_eq!(b.nodes().count(), 2);
    }

    #[test]
    fn test_three_tiles_blast_and_refill() {
        let mut b = board(3, 1);
        let old: Vec<_> = (0..3).map(|x| put(&mut b, x, 0, [R; 4])).collect();
        b.swap(Coord::new(0, 0), Coord::new(1, 0)).unwrap();
        assert!(b.settle(100));
        let ev = events(&mut b);
        assert_eq!(ev[0], BoardEvent::SwapStart {
            a: Coord::new(0, 0),
            b: Some(Coord::new(1, 0))
        });
        assert_eq!(ev[1], BoardEvent::SwapEnd {
            a: Coord::new(0, 0),
            b: Some(Coord::new(1, 0))
        });
        assert!(ev.contains(&BoardEvent::Blast { tiles: 3 }));
        let blasts = ev
            .iter()
            .filter(|e| matches!(e, BoardEvent::TileBlast { .. }))
            .count();
        assert_eq!(blasts, 3);
        let destroyed = ev
            .iter()
            .filter(|e| matches!(e, BoardEvent::NodeDestroyed { .. }))
            .count();
        assert_eq!(destroyed, 3);
        assert!(ev.contains(&BoardEvent::AfterBlast));
        for id in old {
            assert!(b.node(id).is_none());
        }
        assert_eq!(b.nodes().count(), 3);
        assert!(!b.is_busy());
        assert_consistent(&b);
    }

    #[test]
    fn test_two_colours_blast_in_one_step() {
        // U U S U U        U U Y U U
        // R R Y B B  swap  R R S B B, S = red left column, blue right column
        let mut b = board(5, 2);
        for x in [0, 1, 3, 4] {
            put(&mut b, x, 0, [U; 4]);
        }
        put(&mut b, 2, 0, [R, B, R, B]);
        put(&mut b, 0, 1, [R; 4]);
        put(&mut b, 1, 1, [R; 4]);
        put(&mut b, 2, 1, [Y; 4]);
        put(&mut b, 3, 1, [B; 4]);
        put(&mut b, 4, 1, [B; 4]);
        b.swap(Coord::new(2, 0), Coord::new(2, 1)).unwrap();
        assert!(b.settle(200));
        let ev = events(&mut b);
        let blasts: Vec<_> = ev
            .iter()
            .filter(|e| matches!(e, BoardEvent::Blast { .. }))
            .collect();
        assert_eq!(blasts, vec![&BoardEvent::Blast { tiles: 6 }]);
        let colours: BTreeSet<_> = ev
            .iter()
            .filter_map(|e| match e {
                BoardEvent::TileBlast { tile_type, .. } => Some(*tile_type),
                _ => None,
            })
            .collect();
        assert_eq!(colours, BTreeSet::from([TileType::Blue, TileType::Red]));
        assert_consistent(&b);
    }

    #[test]
    fn test_partial_blast_regrows_survivor() {
        let mut b = board(3, 1);
        let a = put(&mut b, 0, 0, [R, R, Y, Y]);
        put(&mut b, 1, 0, [R; 4]);
        put(&mut b, 2, 0, [R; 4]);
        b.swap(Coord::new(1, 0), Coord::new(2, 0)).unwrap();
        assert!(b.settle(100));
        let node = b.node(a).unwrap();
        assert_eq!(node.template(), Some(NodeTemplate::solid(Y)));
        assert_eq!(node.tile_count(), 1);
        assert_consistent(&b);
    }

    #[test]
    fn test_blast_breaks_adjacent_ice() {
        let mut b = board(4, 1);
        for x in 0..3 {
            put(&mut b, x, 0, [R; 4]);
        }
        let iced = b
            .create_node(&NodeTemplate::solid(R))
            .with_obstacle(NodeObstacle::ice());
        let iced = b.place_node(Coord::new(3, 0), iced);
        b.swap(Coord::new(0, 0), Coord::new(1, 0)).unwrap();
        assert!(b.settle(100));
        let ev = events(&mut b);
        assert!(ev.contains(&BoardEvent::Blast { tiles: 3 }));
        assert!(ev.contains(&BoardEvent::ObstacleDestroyed {
            kind: ObstacleKind::Ice,
            cell: Coord::new(3, 0)
        }));
        let node = b.node(iced).unwrap();
        assert!(node.obstacle.is_none());
        assert_eq!(node.tile_count(), 1);
    }

    #[test]
    fn test_iced_node_does_not_fall() {
        let mut b = board(1, 3);
        let iced = b
            .create_node(&NodeTemplate::solid(R))
            .with_obstacle(NodeObstacle::ice());
        let iced = b.place_node(Coord::new(0, 0), iced);
        b.start();
        assert!(b.settle(100));
        let node = b.node(iced).unwrap();
        assert_eq!(node.cell, Some(Coord::new(0, 0)));
        assert!(node.obstacle.is_some());
        assert!(b.grid().cells().all(|c| c.is_occupied()));
        assert_consistent(&b);
    }

    #[test]
    fn test_released_host_falls() {
        // Y+ice U G
        // R     R R   <- swapped in from (2,0)
        let mut b = board(3, 2);
        let iced = b
            .create_node(&NodeTemplate::solid(Y))
            .with_obstacle(NodeObstacle::ice());
        let iced = b.place_node(Coord::new(0, 0), iced);
        put(&mut b, 1, 0, [U; 4]);
        put(&mut b, 2, 0, [R; 4]);
        put(&mut b, 0, 1, [R; 4]);
        put(&mut b, 1, 1, [R; 4]);
        put(&mut b, 2, 1, [G; 4]);
        b.swap(Coord::new(2, 0), Coord::new(2, 1)).unwrap();
        assert!(b.settle(200));
        let ev = events(&mut b);
        assert!(ev.contains(&BoardEvent::ObstacleDestroyed {
            kind: ObstacleKind::Ice,
            cell: Coord::new(0, 0)
        }));
        let node = b.node(iced).unwrap();
        assert!(node.obstacle.is_none());
        assert_eq!(node.cell, Some(Coord::new(0, 1)));
        assert_consistent(&b);
    }

    #[test]
    fn test_wood_is_destroyed_and_wood_falls() {
        // G  wood Y
        // U  Y    G
        // R  R    R
        let mut b = board(3, 3);
        put(&mut b, 0, 0, [G; 4]);
        put(&mut b, 0, 1, [U; 4]);
        b.place_obstacle(Coord::new(1, 0), CellObstacle::wood());
        put(&mut b, 1, 1, [Y; 4]);
        put(&mut b, 2, 0, [Y; 4]);
        put(&mut b, 2, 1, [G; 4]);
        for x in 0..3 {
            put(&mut b, x, 2, [R; 4]);
        }
        b.swap(Coord::new(0, 2), Coord::new(2, 2)).unwrap();
        assert!(b.settle(200));
        let wood = b.grid().cell(Coord::new(1, 1));
        assert_eq!(wood.obstacle.as_ref().map(|o| o.kind), Some(ObstacleKind::Wood));
        assert!(b.grid().cell(Coord::new(1, 0)).node.is_some());
        assert_consistent(&b);

        let mut c = board(3, 2);
        c.place_obstacle(Coord::new(0, 0), CellObstacle::wood());
        put(&mut c, 1, 0, [U; 4]);
        put(&mut c, 2, 0, [Y; 4]);
        for x in 0..3 {
            put(&mut c, x, 1, [R; 4]);
        }
        c.swap(Coord::new(0, 1), Coord::new(1, 1)).unwrap();
        assert!(c.settle(200));
        let ev = events(&mut c);
        assert!(ev.contains(&BoardEvent::ObstacleDestroyed {
            kind: ObstacleKind::Wood,
            cell: Coord::new(0, 0)
        }));
        assert!(c.grid().cells().all(|cell| cell.obstacle.is_none()));
    }

    #[test]
    fn test_swap_rejections() {
        let mut b = board(3, 1);
        put(&mut b, 0, 0, [R; 4]);
        let iced = b
            .create_node(&NodeTemplate::solid(G))
            .with_obstacle(NodeObstacle::ice());
        b.place_node(Coord::new(1, 0), iced);
        let a = Coord::new(0, 0);
        assert_eq!(b.swap(a, a), Err(InputError::SameCell));
        assert_eq!(
            b.swap(a, Coord::new(1, 0)),
            Err(InputError::Obstacle(Coord::new(1, 0)))
        );
        assert_eq!(
            b.swap(a, Coord::new(2, 0)),
            Err(InputError::NoNode(Coord::new(2, 0)))
        );
        assert_eq!(
            b.swap(a, Coord::new(9, 9)),
            Err(InputError::NoNode(Coord::new(9, 9)))
        );
        put(&mut b, 2, 0, [Y; 4]);
        b.swap(a, Coord::new(2, 0)).unwrap();
        assert_eq!(b.swap(a, Coord::new(2, 0)), Err(InputError::Busy));
    }

    #[test]
    fn test_swap_holds_busy_gate_for_animation() {
        let mut b = Board::new(Grid::new(2, 1), spawner(), Timings::default());
        put(&mut b, 0, 0, [R; 4]);
        put(&mut b, 1, 0, [Y; 4]);
        b.swap(Coord::new(0, 0), Coord::new(1, 0)).unwrap();
        for _ in 1..Timings::default().swap_ticks {
            b.tick();
            assert_eq!(b.phase(), Phase::Swapping);
        }
        b.tick();
        assert_eq!(b.phase(), Phase::Matching);
        assert!(b.settle(100));
    }

    #[test]
    fn test_teardown_cancels_mid_cascade() {
        let mut b = Board::new(Grid::new(3, 2), spawner(), Timings::default());
        for x in 0..3 {
            put(&mut b, x, 0, [Y; 4]);
            put(&mut b, x, 1, [R; 4]);
        }
        b.swap(Coord::new(0, 1), Coord::new(1, 1)).unwrap();
        for _ in 0..40 {
            b.tick();
        }
        assert!(b.is_busy());
        b.teardown();
        assert_eq!(b.phase(), Phase::Cancelled);
        b.tick();
        assert_eq!(b.phase(), Phase::Cancelled);
        assert!(b.nodes().all(|n| !n.is_falling() && !n.is_rearranging()));
        assert!(b.nodes().all(|n| !n.is_empty()));
        assert_consistent(&b);
        assert!(!b.settle(10));
    }

    #[test]
    fn test_preview_swap_in() {
        let mut b = board(3, 1);
        put(&mut b, 0, 0, [R; 4]);
        put(&mut b, 1, 0, [G; 4]);
        put(&mut b, 2, 0, [R; 4]);
        let red = b.create_node(&NodeTemplate::solid(R));
        assert_eq!(b.preview_swap_in(Coord::new(1, 0), &red), 3);
        assert_eq!(b.preview_swap_in(Coord::new(0, 0), &red), 0);
    }
}
