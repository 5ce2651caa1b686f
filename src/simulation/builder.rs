use std::collections::HashMap;

use rand::{rngs::StdRng, SeedableRng};

use crate::{
    blocktree::BlockTree,
    miner::{Miner, MinerId},
};

use super::Simulation;

/// Builds a [Simulation].
#[derive(Debug, Default)]
pub struct SimulationBuilder {
    blocktree: Option<BlockTree>,
    start_time: f64,
    seed: Option<u64>,
    miners: Vec<Box<dyn Miner>>,
    last_miner_id: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum SimulationBuildError {
    #[error("no miners were added")]
    NoMinersGiven,
    #[error("no block tree was given")]
    NoBlockTreeGiven,
}

impl SimulationBuilder {
    /// Creates a new [SimulationBuilder].
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the block tree the simulation mines on. Required.
    pub fn blocktree(mut self, tree: BlockTree) -> Self {
        self.blocktree = Some(tree);

        self
    }

    /// Sets the simulated time the first `run` call starts from
    /// (default 0).
    pub fn start_time(mut self, time: f64) -> Self {
        self.start_time = time;

        self
    }

    /// Fixes the random seed, making the produced block sequence
    /// reproducible. Unseeded simulations draw their generator from OS
    /// entropy.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);

        self
    }

    /// Adds `miner` to the simulation, assigning it the next [MinerId]
    /// (starting from 1, in order of addition).
    pub fn add_miner<M: Miner + 'static>(mut self, mut miner: M) -> Self {
        self.last_miner_id += 1;
        miner.set_id(MinerId::from(self.last_miner_id));
        self.miners.push(Box::new(miner));

        self
    }

    /// Creates a [Simulation] from the specified parameters.
    pub fn build(self) -> Result<Simulation, SimulationBuildError> {
        use SimulationBuildError::*;

        let SimulationBuilder {
            blocktree,
            start_time,
            seed,
            miners,
            last_miner_id,
        } = self;

        if miners.is_empty() {
            return Err(NoMinersGiven);
        }
        let tree = blocktree.ok_or(NoBlockTreeGiven)?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Simulation {
            tree,
            miners,
            time: start_time,
            stopping: false,
            rng,
            next_miner_id: last_miner_id + 1,
            blocks_by_miner: HashMap::new(),
            block_hook: None,
        })
    }
}
