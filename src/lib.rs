//! Nodeblast: a match-3 board simulation with multi-tile nodes.
//!
//! Each board cell holds a node made of 2x2 coloured sub-tiles. Same-coloured tiles that touch
//! across node edges form a region; regions of three or more tiles blast, nodes regrow or
//! vanish, the board falls and refills, and the cascade repeats until nothing matches.

pub mod board;
pub mod deck;
pub mod events;
pub mod game;
pub mod goals;
pub mod grid;
pub mod level;
pub mod matching;
pub mod node;
pub mod obstacle;
pub mod spawner;
pub mod tile;

pub use board::{Board, InputError, Phase, Timings};
pub use events::BoardEvent;
pub use game::{Game, GameStatus};
pub use grid::{Coord, Direction};
pub use level::{Level, LevelError};
pub use tile::{SubCoord, TileType};
