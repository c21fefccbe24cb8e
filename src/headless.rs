//! Headless play: a greedy automatic session, reported as a text summary.

use crate::GameConfig;
use anyhow::{Result, bail};
use nodeblast::{BoardEvent, Game, GameStatus, Level};
use std::fmt;
use tracing::debug;

/// Frames allowed for one cascade to settle.
const SETTLE_LIMIT: u32 = 100_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub seed: u64,
    pub status: GameStatus,
    pub turns: u32,
    pub moves: u32,
    pub tiles_blasted: u32,
    pub longest_cascade: u32,
    pub goals_left: usize,
    pub deck_left: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self.status {
            GameStatus::Playing => "unfinished",
            GameStatus::Won => "won",
            GameStatus::Lost => "lost",
        };
        writeln!(f, "seed:            {}", self.seed)?;
        writeln!(f, "result:          {status}")?;
        writeln!(f, "turns:           {}", self.turns)?;
        writeln!(f, "moves:           {}", self.moves)?;
        writeln!(f, "tiles blasted:   {}", self.tiles_blasted)?;
        writeln!(f, "longest cascade: {}", self.longest_cascade)?;
        writeln!(f, "goals left:      {}", self.goals_left)?;
        write!(f, "deck left:       {}", self.deck_left)
    }
}

/// Each turn swaps the deck node onto the cell that blasts the most tiles, or discards it when
/// no cell would blast anything.
pub fn run(level: &Level, config: &GameConfig, max_turns: u32) -> Result<Summary> {
    let mut game = Game::new(level, config.seed, config.timings)?;
    let mut summary = Summary {
        seed: config.seed,
        status: GameStatus::Playing,
        turns: 0,
        moves: 0,
        tiles_blasted: 0,
        longest_cascade: 0,
        goals_left: 0,
        deck_left: 0,
    };
    settle(&mut game, &mut summary)?;

    while !game.is_over() && summary.turns < max_turns {
        summary.turns += 1;
        match game.best_deck_swap() {
            Some((coord, tiles)) => {
                debug!(%coord, tiles, "auto swap");
                game.deck_swap(coord)?;
            }
            None => game.next_node()?,
        }
        settle(&mut game, &mut summary)?;
    }

    summary.status = game.status();
    summary.moves = game.moves();
    summary.goals_left = game.goals().goals().len();
    summary.deck_left = game.deck().node_count() + usize::from(game.deck().current().is_some());
    Ok(summary)
}

fn settle(game: &mut Game, summary: &mut Summary) -> Result<()> {
    if !game.settle(SETTLE_LIMIT) {
        bail!("board did not settle within {SETTLE_LIMIT} frames");
    }
    for event in game.drain_events() {
        if let BoardEvent::TileBlast { .. } = event {
            summary.tiles_blasted += 1;
        }
    }
    summary.longest_cascade = summary.longest_cascade.max(game.board().cascade());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodeblast::Timings;

    fn config(seed: u64) -> GameConfig {
        GameConfig {
            seed,
            timings: Timings::instant(),
            tick_rate: 60.0,
            no_animation: true,
        }
    }

    #[test]
    fn test_same_seed_same_summary() {
        let level = Level::builtin().unwrap();
        let a = run(&level, &config(11), 40).unwrap();
        let b = run(&level, &config(11), 40).unwrap();
        assert_eq!(a, b);
        assert!(a.turns <= 40);
    }

    #[test]
    fn test_small_level_is_won() {
        let level = Level::parse(
            "size 3 1\nrow RRRR GGGG RRRR\ngoal red 3\ndeck RRRR\nspawn 1 BGOP\n",
        )
        .unwrap();
        let summary = run(&level, &config(0), 10).unwrap();
        assert_eq!(summary.status, GameStatus::Won);
        assert_eq!(summary.moves, 1);
        assert_eq!(summary.tiles_blasted, 3);
        assert!(summary.to_string().contains("won"));
    }
}
