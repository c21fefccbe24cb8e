//! Game session: board, goals and deck, plus the win/lose status.

use crate::board::{Board, InputError, Timings};
use crate::deck::Deck;
use crate::events::BoardEvent;
use crate::goals::GoalTracker;
use crate::grid::Coord;
use crate::level::{Level, LevelCell};
use crate::node::Node;
use crate::obstacle::{CellObstacle, NodeObstacle};
use crate::spawner::{Spawner, SpawnerError};
use std::collections::VecDeque;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Playing,
    Won,
    Lost,
}

/// One play-through of a level.
#[derive(Debug, Clone)]
pub struct Game {
    board: Board,
    goals: GoalTracker,
    deck: Deck,
    status: GameStatus,
    moves: u32,
    /// Board and goal events for the front end.
    events: VecDeque<BoardEvent>,
}

impl Game {
    /// Build the board from `level` and start settling it.
    pub fn new(level: &Level, seed: u64, timings: Timings) -> Result<Self, SpawnerError> {
        let spawner = Spawner::new(level.spawn.clone(), seed)?;
        let mut board = Board::new(level.grid(), spawner, timings);
        for y in 0..level.height {
            for x in 0..level.width {
                let coord = Coord::new(x as i32, y as i32);
                match level.cell(coord) {
                    LevelCell::Node { template, ice } => {
                        let mut node = board.create_node(&template);
                        if ice {
                            node = node.with_obstacle(NodeObstacle::ice());
                        }
                        board.place_node(coord, node);
                    }
                    LevelCell::Wood => board.place_obstacle(coord, CellObstacle::wood()),
                    LevelCell::Empty | LevelCell::Vacant => {}
                }
            }
        }
        let deck_nodes: Vec<Node> = level.deck.iter().map(|t| board.create_node(t)).collect();
        let deck = Deck::new(deck_nodes, level.visible);
        board.start();
        info!(
            width = level.width,
            height = level.height,
            goals = level.goals.len(),
            deck = level.deck.len(),
            seed,
            "level loaded"
        );
        Ok(Self {
            board,
            goals: GoalTracker::new(level.goals.iter().copied()),
            deck,
            status: GameStatus::Playing,
            moves: 0,
            events: VecDeque::new(),
        })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn goals(&self) -> &GoalTracker {
        &self.goals
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn is_over(&self) -> bool {
        self.status != GameStatus::Playing
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = BoardEvent> + '_ {
        self.events.drain(..)
    }

    pub fn tick(&mut self) {
        self.board.tick();
        self.route_events();
    }

    /// Tick until the board is idle. Returns false if still busy after `max_ticks`.
    pub fn settle(&mut self, max_ticks: u32) -> bool {
        for _ in 0..max_ticks {
            if !self.board.is_busy() {
                return true;
            }
            self.tick();
        }
        !self.board.is_busy()
    }

    pub fn teardown(&mut self) {
        self.board.teardown();
        self.route_events();
    }

    fn check_input(&self) -> Result<(), InputError> {
        if self.is_over() {
            return Err(InputError::GameOver);
        }
        if self.board.is_busy() {
            return Err(InputError::Busy);
        }
        Ok(())
    }

    /// Swap the nodes of two board cells.
    pub fn swap(&mut self, a: Coord, b: Coord) -> Result<(), InputError> {
        self.check_input()?;
        self.board.swap(a, b)?;
        self.moves += 1;
        self.route_events();
        Ok(())
    }

    /// Swap the deck's current node with the node at `coord`.
    pub fn deck_swap(&mut self, coord: Coord) -> Result<(), InputError> {
        self.check_input()?;
        self.board.check_swap_target(coord)?;
        let incoming = self.deck.take_current().ok_or(InputError::DeckEmpty)?;
        let outgoing = self.board.swap_in(coord, incoming);
        self.deck.replace_current(outgoing);
        self.moves += 1;
        self.route_events();
        Ok(())
    }

    /// Discard the current deck node. Losing the last one loses the level.
    pub fn next_node(&mut self) -> Result<(), InputError> {
        self.check_input()?;
        if !self.deck.next_node() && self.finish(GameStatus::Lost) {
            self.events.push_back(BoardEvent::LevelLost);
        }
        Ok(())
    }

    /// Board cell whose deck swap would blast the most tiles right now.
    pub fn best_deck_swap(&self) -> Option<(Coord, usize)> {
        let current = self.deck.current()?;
        let mut best: Option<(Coord, usize)> = None;
        for cell in self.board.grid().cells() {
            if self.board.check_swap_target(cell.coord).is_err() {
                continue;
            }
            let tiles = self.board.preview_swap_in(cell.coord, current);
            if tiles > best.map_or(0, |(_, t)| t) {
                best = Some((cell.coord, tiles));
            }
        }
        best
    }

    fn finish(&mut self, status: GameStatus) -> bool {
        if self.status != GameStatus::Playing {
            return false;
        }
        self.status = status;
        info!(?status, moves = self.moves, "level finished");
        true
    }

    fn route_events(&mut self) {
        let drained: Vec<BoardEvent> = self.board.drain_events().collect();
        for event in drained {
            let tile_type = match &event {
                BoardEvent::TileBlast { tile_type, .. } => Some(*tile_type),
                _ => None,
            };
            self.events.push_back(event);
            let Some(tile_type) = tile_type else {
                continue;
            };
            for goal_event in self.goals.on_tile_blast(tile_type) {
                if goal_event == BoardEvent::LevelWon && !self.finish(GameStatus::Won) {
                    continue;
                }
                self.events.push_back(goal_event);
            }
        }
    }
}
