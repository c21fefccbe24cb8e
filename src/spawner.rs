//! Spawn pool: templates drawn without replacement, replenished when empty.
//!
//! Generation 0 hands out templates in array order so the opening board is fixed. Every later
//! generation draws with probability proportional to weight using a seeded ChaCha RNG.

use crate::node::NodeTemplate;
use rand::SeedableRng;
use rand::distributions::{Distribution, WeightedIndex};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnEntry {
    pub template: NodeTemplate,
    pub weight: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnMode {
    Sequential,
    WeightedRandom,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpawnerError {
    #[error("spawn pool needs at least one template")]
    Empty,
    #[error("every spawn template has zero weight")]
    NoWeight,
}

#[derive(Debug, Clone)]
pub struct Spawner {
    entries: Vec<SpawnEntry>,
    pool: Vec<SpawnEntry>,
    generation: u32,
    rng: ChaCha8Rng,
}

impl Spawner {
    pub fn new(entries: Vec<SpawnEntry>, seed: u64) -> Result<Self, SpawnerError> {
        if entries.is_empty() {
            return Err(SpawnerError::Empty);
        }
        if entries.iter().all(|e| e.weight == 0) {
            return Err(SpawnerError::NoWeight);
        }
        Ok(Self {
            pool: entries.clone(),
            entries,
            generation: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn mode(&self) -> SpawnMode {
        if self.generation == 0 {
            SpawnMode::Sequential
        } else {
            SpawnMode::WeightedRandom
        }
    }

    /// Templates left before the next replenish.
    pub fn remaining(&self) -> usize {
        self.pool.len()
    }

    fn replenish(&mut self) {
        self.generation += 1;
        self.pool = self
            .entries
            .iter()
            .copied()
            .filter(|e| e.weight > 0)
            .collect();
        trace!(generation = self.generation, size = self.pool.len(), "spawn pool replenished");
    }

    /// Next template to spawn.
    pub fn next_template(&mut self) -> NodeTemplate {
        if self.pool.is_empty() {
            self.replenish();
        }
        let index = match self.mode() {
            SpawnMode::Sequential => 0,
            SpawnMode::WeightedRandom => {
                let weights = self.pool.iter().map(|e| u64::from(e.weight));
                match WeightedIndex::new(weights) {
                    Ok(dist) => dist.sample(&mut self.rng),
                    // Replenished pools hold only positive weights.
                    Err(_) => 0,
                }
            }
        };
        self.pool.remove(index).template
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::TileType;

    fn entries() -> Vec<SpawnEntry> {
        vec![
            SpawnEntry { template: NodeTemplate::solid(TileType::Red), weight: 5 },
            SpawnEntry { template: NodeTemplate::solid(TileType::Blue), weight: 1 },
            SpawnEntry { template: NodeTemplate::solid(TileType::Green), weight: 0 },
        ]
    }

    #[test]
    fn test_first_generation_is_sequential() {
        let mut s = Spawner::new(entries(), 7).unwrap();
        assert_eq!(s.mode(), SpawnMode::Sequential);
        assert_eq!(s.next_template(), NodeTemplate::solid(TileType::Red));
        assert_eq!(s.next_template(), NodeTemplate::solid(TileType::Blue));
        assert_eq!(s.next_template(), NodeTemplate::solid(TileType::Green));
        assert_eq!(s.remaining(), 0);
        s.next_template();
        assert_eq!(s.mode(), SpawnMode::WeightedRandom);
        assert_eq!(s.generation(), 1);
    }

    #[test]
    fn test_weighted_pool_is_without_replacement() {
        let mut s = Spawner::new(entries(), 99).unwrap();
        for _ in 0..3 {
            s.next_template();
        }
        // Generation 1 holds red and blue once each; zero weight never drawn.
        let mut drawn = vec![s.next_template(), s.next_template()];
        drawn.sort_by_key(|t| t.0[0]);
        assert_eq!(
            drawn,
            vec![NodeTemplate::solid(TileType::Blue), NodeTemplate::solid(TileType::Red)]
        );
        assert_eq!(s.remaining(), 0);
        s.next_template();
        assert_eq!(s.generation(), 2);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = Spawner::new(entries(), 42).unwrap();
        let mut b = Spawner::new(entries(), 42).unwrap();
        let seq_a: Vec<_> = (0..30).map(|_| a.next_template()).collect();
        let seq_b: Vec<_> = (0..30).map(|_| b.next_template()).collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn test_weights_near_u32_max() {
        let heavy = vec![
            SpawnEntry { template: NodeTemplate::solid(TileType::Red), weight: u32::MAX },
            SpawnEntry { template: NodeTemplate::solid(TileType::Blue), weight: u32::MAX },
            SpawnEntry { template: NodeTemplate::solid(TileType::Green), weight: 1 },
        ];
        let mut s = Spawner::new(heavy, 3).unwrap();
        for _ in 0..3 {
            s.next_template();
        }
        for _ in 0..10 {
            let mut generation: Vec<_> = (0..3).map(|_| s.next_template()).collect();
            generation.sort_by_key(|t| t.0[0]);
            assert_eq!(
                generation,
                vec![
                    NodeTemplate::solid(TileType::Blue),
                    NodeTemplate::solid(TileType::Green),
                    NodeTemplate::solid(TileType::Red),
                ]
            );
        }
    }

    #[test]
    fn test_rejects_empty_and_weightless() {
        assert_eq!(Spawner::new(Vec::new(), 0).unwrap_err(), SpawnerError::Empty);
        let zero = vec![SpawnEntry { template: NodeTemplate::solid(TileType::Red), weight: 0 }];
        assert_eq!(Spawner::new(zero, 0).unwrap_err(), SpawnerError::NoWeight);
    }
}
