//! Events raised by the board and the game session. Collected in a queue and drained at tick
//! checkpoints.

use crate::grid::Coord;
use crate::goals::GoalTarget;
use crate::node::NodeId;
use crate::obstacle::ObstacleKind;
use crate::tile::{SubCoord, TileType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    /// A swap started; input stays blocked until the cascade settles.
    SwapStart { a: Coord, b: Option<Coord> },
    /// The swap animation finished; matching starts from the swapped cells.
    SwapEnd { a: Coord, b: Option<Coord> },
    /// A cascade step found matches; `tiles` is the number of tiles about to blast.
    Blast { tiles: usize },
    /// Every blast of the step finished and every touched node rearranged.
    AfterBlast,
    TileBlast {
        tile_type: TileType,
        cell: Coord,
        subs: Vec<SubCoord>,
    },
    ObstacleDestroyed { kind: ObstacleKind, cell: Coord },
    NodeDestroyed { node: NodeId, cell: Coord },
    /// Cascade finished; input is accepted again.
    Settled,
    GoalUpdate {
        target: GoalTarget,
        current: u32,
        count: u32,
    },
    GoalComplete { target: GoalTarget },
    LevelWon,
    LevelLost,
}
