//! Level goals: blast counts per colour, or of any colour.

use crate::events::BoardEvent;
use crate::tile::TileType;
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GoalTarget {
    Tile(TileType),
    Any,
}

impl GoalTarget {
    pub fn accepts(self, tile_type: TileType) -> bool {
        match self {
            Self::Tile(t) => t == tile_type,
            Self::Any => true,
        }
    }

    /// `any` or a colour name.
    pub fn from_name(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("any") {
            Some(Self::Any)
        } else {
            TileType::from_name(s).map(Self::Tile)
        }
    }
}

impl fmt::Display for GoalTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tile(t) => write!(f, "{t}"),
            Self::Any => f.write_str("any"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Goal {
    pub target: GoalTarget,
    pub count: u32,
    pub current: u32,
}

impl Goal {
    pub fn new(target: GoalTarget, count: u32) -> Self {
        Self {
            target,
            count,
            current: 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.current >= self.count
    }
}

/// Open goals of a level. Completed goals are removed; the level is won when the last one goes.
#[derive(Debug, Clone, Default)]
pub struct GoalTracker {
    goals: Vec<Goal>,
    won: bool,
}

impl GoalTracker {
    pub fn new(goals: impl IntoIterator<Item = Goal>) -> Self {
        Self {
            goals: goals.into_iter().collect(),
            won: false,
        }
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn is_won(&self) -> bool {
        self.won
    }

    /// Count one blasted tile against every open goal it satisfies.
    ///
    /// Returns the goal events it caused, ending with `LevelWon` the one time the list empties.
    pub fn on_tile_blast(&mut self, tile_type: TileType) -> Vec<BoardEvent> {
        let mut events = Vec::new();
        if self.won {
            return events;
        }
        for goal in &mut self.goals {
            if !goal.target.accepts(tile_type) {
                continue;
            }
            goal.current += 1;
            events.push(BoardEvent::GoalUpdate {
                target: goal.target,
                current: goal.current,
                count: goal.count,
            });
            if goal.is_complete() {
                debug!(target = %goal.target, "goal complete");
                events.push(BoardEvent::GoalComplete {
                    target: goal.target,
                });
            }
        }
        let before = self.goals.len();
        self.goals.retain(|g| !g.is_complete());
        if before > 0 && self.goals.is_empty() {
            self.won = true;
            info!("all goals complete");
            events.push(BoardEvent::LevelWon);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_counts_only_its_colour() {
        let mut goals = GoalTracker::new([Goal::new(GoalTarget::Tile(TileType::Red), 2)]);
        assert!(goals.on_tile_blast(TileType::Blue).is_empty());
        let events = goals.on_tile_blast(TileType::Red);
        assert_eq!(
            events,
            vec![BoardEvent::GoalUpdate {
                target: GoalTarget::Tile(TileType::Red),
                current: 1,
                count: 2
            }]
        );
        assert_eq!(goals.goals()[0].current, 1);
    }

    #[test]
    fn test_win_fires_exactly_once() {
        let mut goals = GoalTracker::new([
            Goal::new(GoalTarget::Tile(TileType::Red), 1),
            Goal::new(GoalTarget::Any, 2),
        ]);
        let first = goals.on_tile_blast(TileType::Red);
        assert!(first.contains(&BoardEvent::GoalComplete {
            target: GoalTarget::Tile(TileType::Red)
        }));
        assert!(!first.contains(&BoardEvent::LevelWon));
        assert_eq!(goals.goals().len(), 1);

        let second = goals.on_tile_blast(TileType::Green);
        assert_eq!(second.last(), Some(&BoardEvent::LevelWon));
        assert!(goals.is_won());
        assert!(goals.on_tile_blast(TileType::Green).is_empty());
    }

    #[test]
    fn test_any_interleaving_wins_once() {
        use TileType::{Blue as B, Red as R};
        for order in [[R, R, R, B, B], [B, R, B, R, R], [R, B, R, B, R]] {
            let mut goals = GoalTracker::new([
                Goal::new(GoalTarget::Tile(R), 3),
                Goal::new(GoalTarget::Tile(B), 2),
            ]);
            let wins = order
                .into_iter()
                .flat_map(|t| goals.on_tile_blast(t))
                .filter(|e| *e == BoardEvent::LevelWon)
                .count();
            assert_eq!(wins, 1);
            assert!(goals.goals().is_empty());
        }
    }

    #[test]
    fn test_empty_goal_list_never_wins() {
        let mut goals = GoalTracker::new([]);
        assert!(goals.on_tile_blast(TileType::Red).is_empty());
        assert!(!goals.is_won());
    }

    #[test]
    fn test_target_names() {
        assert_eq!(GoalTarget::from_name("ANY"), Some(GoalTarget::Any));
        assert_eq!(
            GoalTarget::from_name("pink"),
            Some(GoalTarget::Tile(TileType::Pink))
        );
        assert_eq!(GoalTarget::from_name("teal"), None);
    }
}
