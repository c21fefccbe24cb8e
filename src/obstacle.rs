//! Obstacles: blockers removed by blasts next to them.
//!
//! Cell obstacles take a whole cell and fall like nodes. Node obstacles ride on a host node and
//! keep it out of matching and swapping until they break.

use crate::node::FallMotion;

/// Capabilities shared by every obstacle.
pub trait Obstacle {
    fn kind(&self) -> ObstacleKind;

    /// A tile next to the obstacle was blasted. Returns true when the obstacle is destroyed.
    fn on_blast_near(&mut self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObstacleKind {
    /// Cell-bound crate.
    Wood,
    /// Node-bound shell.
    Ice,
}

impl ObstacleKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Wood => "wood",
            Self::Ice => "ice",
        }
    }
}

/// Obstacle occupying a cell in place of a node.
#[derive(Debug, Clone, PartialEq)]
pub struct CellObstacle {
    pub kind: ObstacleKind,
    hits_left: u8,
    pub fall: Option<FallMotion>,
}

impl CellObstacle {
    pub fn wood() -> Self {
        Self {
            kind: ObstacleKind::Wood,
            hits_left: 1,
            fall: None,
        }
    }

    #[inline]
    pub fn is_falling(&self) -> bool {
        self.fall.is_some()
    }
}

impl Obstacle for CellObstacle {
    fn kind(&self) -> ObstacleKind {
        self.kind
    }

    fn on_blast_near(&mut self) -> bool {
        self.hits_left = self.hits_left.saturating_sub(1);
        self.hits_left == 0
    }
}

/// Obstacle attached to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeObstacle {
    pub kind: ObstacleKind,
    hits_left: u8,
}

impl NodeObstacle {
    pub fn ice() -> Self {
        Self {
            kind: ObstacleKind::Ice,
            hits_left: 1,
        }
    }
}

impl Obstacle for NodeObstacle {
    fn kind(&self) -> ObstacleKind {
        self.kind
    }

    fn on_blast_near(&mut self) -> bool {
        self.hits_left = self.hits_left.saturating_sub(1);
        self.hits_left == 0
    }
}
