//! The discrete-event loop racing miners' block-finding processes.

use std::collections::HashMap;

use rand::{
    distributions::{WeightedError, WeightedIndex},
    prelude::Distribution,
    rngs::StdRng,
    SeedableRng,
};
use rand_distr::Exp;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::{
    block::BlockId,
    blocktree::BlockTree,
    miner::{Miner, MinerId, Offer},
    results::{GroupResults, RunSummary},
    tip::Tip,
    utils::Hook,
};

pub mod builder;

pub use builder::{SimulationBuildError, SimulationBuilder};

/// Snapshot of a committed block, handed to the observability hook
/// installed with [Simulation::set_block_hook].
#[derive(Debug, Clone)]
pub struct BlockEvent {
    /// Simulated time the block was found at.
    pub time: f64,
    /// The miner that found it.
    pub miner: MinerId,
    /// Height of the new block.
    pub height: u64,
    /// Difficulty the block was mined at.
    pub difficulty: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// Every live miner offered zero hashrate, so no block can ever be
    /// found. Surfaced instead of sampling an unbounded wait.
    #[error("no progress possible: total block-finding rate is zero")]
    NoProgress,
    #[error("could not create rand::distributions::WeightedIndex")]
    WeightedIndex(#[from] WeightedError),
}

/// Time simulation of mining.
///
/// Each loop iteration of [Simulation::run] is one candidate block event:
/// every miner's block finding is a Poisson process with rate
/// `hashrate / next_difficulty`, the union of those processes decides when
/// the next block is found, and a categorical draw over the individual
/// rates decides who found it.
///
/// Miner membership may be changed and the clock advanced between `run`
/// calls, modeling hashpower shocks and dead gaps. With a fixed seed and a
/// fixed configuration the produced block sequence is bit-identical across
/// replays; the engine draws the inter-arrival time first and the winner
/// second on every iteration, and nothing else touches the generator.
#[derive(Debug, Clone)]
pub struct Simulation {
    tree: BlockTree,
    miners: Vec<Box<dyn Miner>>,
    time: f64,
    stopping: bool,
    rng: StdRng,
    next_miner_id: u64,
    blocks_by_miner: HashMap<MinerId, Vec<BlockId>>,
    block_hook: Option<Hook<BlockEvent>>,
}

impl Simulation {
    /// Creates a [SimulationBuilder].
    pub fn builder() -> SimulationBuilder {
        SimulationBuilder::new()
    }

    /// Runs until the next candidate event would land past `until`.
    ///
    /// The event that crosses the horizon is discarded and the clock is set
    /// to exactly `until`; by memorylessness of the exponential this costs
    /// nothing statistically, though the discarded draw is not replayed on
    /// resumption. Also returns early if [Simulation::stop] was called; the
    /// stop flag is rearmed on every `run` call.
    pub fn run(&mut self, until: f64) -> Result<(), SimulationError> {
        self.stopping = false;
        while !self.stopping {
            let (delta, winner, tip) = self.next_event()?;
            let at = self.time + delta;
            if at > until {
                self.time = until;
                return Ok(());
            }
            self.time = at;

            // Timestamps are whole seconds.
            let id = self.tree.new_block(
                tip.block(),
                at as u64,
                tip.next_difficulty(),
            );
            let new_tip = Tip::from_parent(&self.tree, id, &tip);

            let miner = self.miners[winner].id();
            self.blocks_by_miner.entry(miner).or_default().push(id);

            let (height, difficulty) = {
                let b = &self.tree[id];
                (b.height, b.difficulty)
            };
            log::debug!(
                "{:15.3}: block found by {} (miner {}), height {}, difficulty {:.4e}",
                at,
                self.miners[winner].name(),
                miner,
                height,
                difficulty,
            );
            if let Some(hook) = &self.block_hook {
                hook.call(&BlockEvent { time: at, miner, height, difficulty });
            }

            let withheld = self.miners[winner].on_own_block(&new_tip, at);
            if !withheld {
                for m in self.miners.iter_mut() {
                    m.on_broadcast(&new_tip, at);
                }
            }
        }

        Ok(())
    }

    /// Samples the next candidate block event from the current offers:
    /// the time until anyone finds a block, and who found it.
    fn next_event(&mut self) -> Result<(f64, usize, Tip), SimulationError> {
        let mut offers: Vec<Offer> =
            self.miners.iter().map(|m| m.offer()).collect();

        // The union of independent Poisson processes is Poisson with the
        // summed rate.
        let rates: Vec<f64> = offers
            .iter()
            .map(|o| o.hashrate / o.tip.next_difficulty())
            .collect();
        let total: f64 = rates.iter().sum();
        if total <= 0.0 {
            return Err(SimulationError::NoProgress);
        }

        let delta = Exp::new(total)
            .expect("total rate is positive")
            .sample(&mut self.rng);
        // Inverse-CDF categorical draw over the prefix sums of the rates;
        // a miner offering zero hashrate can never win.
        let winner = WeightedIndex::new(&rates)?.sample(&mut self.rng);

        Ok((delta, winner, offers.swap_remove(winner).tip))
    }

    /// Current simulated time, in seconds.
    #[inline]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Jumps the clock forward without mining, modeling a gap between
    /// `run` calls.
    ///
    /// ## Panics
    /// Panics if `seconds` is negative or not finite.
    pub fn advance_time(&mut self, seconds: f64) {
        assert!(
            seconds.is_finite() && seconds >= 0.0,
            "time can only advance by a finite, non-negative amount"
        );
        self.time += seconds;
    }

    /// Requests that the run loop stop before its next iteration.
    pub fn stop(&mut self) {
        self.stopping = true;
    }

    /// The block tree mined so far.
    #[inline]
    pub fn blocktree(&self) -> &BlockTree {
        &self.tree
    }

    /// The currently live miners.
    #[inline]
    pub fn miners(&self) -> &[Box<dyn Miner>] {
        &self.miners
    }

    /// Adds a miner mid-lifetime, assigning it the next free [MinerId].
    /// Models hashpower arriving between `run` calls.
    pub fn add_miner<M: Miner + 'static>(&mut self, mut miner: M) -> MinerId {
        let id = MinerId::from(self.next_miner_id);
        self.next_miner_id += 1;
        miner.set_id(id);
        self.miners.push(Box::new(miner));
        id
    }

    /// Removes and returns the miner with the given id, if live. Models
    /// hashpower leaving. Ids are never reused.
    pub fn remove_miner(&mut self, id: MinerId) -> Option<Box<dyn Miner>> {
        let at = self.miners.iter().position(|m| m.id() == id)?;
        Some(self.miners.remove(at))
    }

    /// Blocks credited to the given miner, in mining order.
    pub fn blocks_by(&self, miner: MinerId) -> &[BlockId] {
        self.blocks_by_miner.get(&miner).map_or(&[], Vec::as_slice)
    }

    /// Installs a hook invoked once per committed block. Replaces any
    /// previously installed hook.
    pub fn set_block_hook<N, F>(&mut self, name: N, hook: F)
    where
        N: Into<String>,
        F: Fn(&BlockEvent) + Send + Sync + 'static,
    {
        self.block_hook = Some(Hook::new(name, hook));
    }

    /// Removes the per-block hook.
    pub fn clear_block_hook(&mut self) {
        self.block_hook = None;
    }

    /// Summarizes the run so far.
    pub fn summary(&self) -> RunSummary {
        let best = self.tree.best_block();
        RunSummary {
            time: self.time,
            blocks: self.tree.len() - 1,
            best_height: best.height,
            best_chainwork: best.chainwork,
            next_difficulty: Tip::from_block(&self.tree, best.id)
                .next_difficulty(),
            blocks_by_miner: self
                .miners
                .iter()
                .map(|m| (m.id(), self.blocks_by(m.id()).len()))
                .collect(),
        }
    }

    fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }
}

/// Container for a batch of independent replays of one configured
/// [Simulation], one per seed. Replicas share the starting chain and miner
/// lineup and run in parallel when the `rayon` feature is enabled.
#[derive(Debug, Clone)]
pub struct SimulationGroup {
    base: Simulation,
    seeds: Vec<u64>,
}

impl SimulationGroup {
    /// Creates a group replaying `base`. The base keeps its state as
    /// configured, the time it has already simulated included.
    pub fn new(base: Simulation) -> Self {
        SimulationGroup { base, seeds: vec![] }
    }

    /// Adds one replica per seed.
    pub fn seeds<I>(mut self, seeds: I) -> Self
    where
        I: IntoIterator<Item = u64>,
    {
        self.seeds.extend(seeds);
        self
    }

    /// Runs every replica until `until`, returning one summary per seed in
    /// seed order.
    pub fn run_all(self, until: f64) -> Result<GroupResults, SimulationError> {
        let SimulationGroup { base, seeds } = self;

        let runs: Vec<Simulation> = seeds
            .into_iter()
            .map(|seed| {
                let mut sim = base.clone();
                sim.reseed(seed);
                sim
            })
            .collect();

        let run_one =
            move |mut sim: Simulation| -> Result<RunSummary, SimulationError> {
                sim.run(until)?;
                Ok(sim.summary())
            };

        #[cfg(feature = "rayon")]
        let summaries: Result<Vec<_>, SimulationError> =
            runs.into_par_iter().map(run_one).collect();
        #[cfg(not(feature = "rayon"))]
        let summaries: Result<Vec<_>, SimulationError> =
            runs.into_iter().map(run_one).collect();

        Ok(GroupResults::new(summaries?))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use crate::{
        block::BlockId,
        blocktree::BlockTree,
        miner::{Honest, Miner, MinerId, Noop, Offer},
        tip::Tip,
    };

    use super::{BlockEvent, Simulation, SimulationError, SimulationGroup};

    const DAY: f64 = 86400.0;

    /// Two steady miners over a chain whose difficulty targets their
    /// combined hashrate.
    fn two_miner_sim(seed: u64) -> Simulation {
        let tree = BlockTree::new(600.0 * 6.0);
        let start = Tip::from_block(&tree, tree.genesis());

        Simulation::builder()
            .blocktree(tree)
            .seed(seed)
            .add_miner(Honest::new(5.0, start.clone()))
            .add_miner(Honest::new(1.0, start))
            .build()
            .expect("valid simulation build")
    }

    #[test]
    fn identical_seeds_replay_identically() {
        let mut a = two_miner_sim(42);
        let mut b = two_miner_sim(42);

        for horizon in [10.0 * DAY, 20.0 * DAY] {
            a.run(horizon).unwrap();
            b.run(horizon).unwrap();
        }

        assert_eq!(a.time(), b.time());
        assert_eq!(a.blocktree().len(), b.blocktree().len());
        assert!(a.blocktree().len() > 1);
        for (x, y) in a.blocktree().blocks().zip(b.blocktree().blocks()) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.parent, y.parent);
            assert_eq!(x.timestamp, y.timestamp);
            assert_eq!(x.difficulty, y.difficulty);
            assert_eq!(x.chainwork, y.chainwork);
        }
        for m in a.miners() {
            assert_eq!(a.blocks_by(m.id()), b.blocks_by(m.id()));
        }
    }

    #[test]
    fn run_never_mines_past_the_horizon() {
        let mut sim = two_miner_sim(3);
        sim.run(10.0 * DAY).unwrap();

        assert_eq!(sim.time(), 10.0 * DAY);
        assert!(sim.blocktree().len() > 1);
        for block in sim.blocktree().blocks() {
            assert!(block.timestamp as f64 <= 10.0 * DAY);
        }

        // Resuming from the clamped clock keeps mining.
        let before = sim.blocktree().len();
        sim.run(20.0 * DAY).unwrap();
        assert_eq!(sim.time(), 20.0 * DAY);
        assert!(sim.blocktree().len() > before);
    }

    #[test]
    fn all_idle_miners_is_an_error() {
        let tree = BlockTree::new(1000.0);
        let start = Tip::from_block(&tree, tree.genesis());
        let mut sim = Simulation::builder()
            .blocktree(tree)
            .seed(0)
            .add_miner(Noop::new(start))
            .build()
            .unwrap();

        assert!(matches!(
            sim.run(DAY),
            Err(SimulationError::NoProgress)
        ));
        assert_eq!(sim.time(), 0.0);
        assert_eq!(sim.blocktree().len(), 1);
    }

    #[test]
    fn membership_and_clock_shocks_between_runs() {
        let mut sim = two_miner_sim(9);
        sim.run(2.0 * DAY).unwrap();

        let strong = sim.remove_miner(MinerId::from(1)).unwrap();
        assert_eq!(strong.id(), MinerId::from(1));
        assert_eq!(sim.miners().len(), 1);
        assert!(sim.remove_miner(MinerId::from(1)).is_none());

        sim.advance_time(10.0 * DAY);
        assert_eq!(sim.time(), 12.0 * DAY);

        let before = sim.blocktree().len();
        sim.run(30.0 * DAY).unwrap();
        assert_eq!(sim.time(), 30.0 * DAY);
        assert!(sim.blocktree().len() > before);
    }

    #[test]
    fn block_hook_sees_every_commit() {
        let events: Arc<Mutex<Vec<BlockEvent>>> = Arc::default();
        let sink = Arc::clone(&events);

        let mut sim = two_miner_sim(5);
        sim.set_block_hook("collect", move |e: &BlockEvent| {
            sink.lock().unwrap().push(e.clone());
        });
        sim.run(5.0 * DAY).unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), sim.blocktree().len() - 1);
        for (event, block) in
            events.iter().zip(sim.blocktree().blocks().skip(1))
        {
            assert_eq!(event.height, block.height);
            assert_eq!(event.difficulty, block.difficulty);
            assert_eq!(event.time as u64, block.timestamp);
        }
    }

    /// Finds blocks but never broadcasts them.
    #[derive(Debug, Clone)]
    struct Withholder {
        id: Option<MinerId>,
        hashrate: f64,
        start: Tip,
    }

    impl Miner for Withholder {
        fn id(&self) -> MinerId {
            self.id.expect("miner id to be set")
        }

        fn set_id(&mut self, id: MinerId) {
            self.id = Some(id);
        }

        fn offer(&self) -> Offer {
            Offer { hashrate: self.hashrate, tip: self.start.clone() }
        }

        fn on_broadcast(&mut self, _tip: &Tip, _time: f64) {}

        fn on_own_block(&mut self, _tip: &Tip, _time: f64) -> bool {
            true
        }
    }

    #[test]
    fn withheld_blocks_are_never_delivered() {
        let tree = BlockTree::new(600.0);
        let start = Tip::from_block(&tree, tree.genesis());
        let mut sim = Simulation::builder()
            .blocktree(tree)
            .seed(77)
            .add_miner(Withholder { id: None, hashrate: 1.0, start: start.clone() })
            .add_miner(Honest::new(0.0, start))
            .build()
            .unwrap();

        sim.run(10.0 * DAY).unwrap();
        let tree = sim.blocktree();
        assert!(tree.len() > 2);

        // Nobody hears of any block, the withholder included, so every
        // block attaches straight to genesis.
        for block in tree.blocks().skip(1) {
            assert_eq!(block.parent, Some(tree.genesis()));
        }
        // All siblings carry equal chainwork: the first one mined stays
        // best.
        assert_eq!(tree.best_block().id, BlockId::from(1));
        // The honest observer still sits on genesis.
        assert_eq!(sim.miners()[1].offer().tip.block(), tree.genesis());
    }

    #[test]
    fn group_replays_match_single_runs() {
        let group = SimulationGroup::new(two_miner_sim(0)).seeds([42, 43]);
        let results = group.run_all(10.0 * DAY).unwrap();
        let runs = results.runs();
        assert_eq!(runs.len(), 2);

        let mut single = two_miner_sim(42);
        single.run(10.0 * DAY).unwrap();
        let expected = single.summary();

        assert_eq!(runs[0].blocks, expected.blocks);
        assert_eq!(runs[0].best_chainwork, expected.best_chainwork);
        assert_eq!(runs[0].blocks_by_miner, expected.blocks_by_miner);
    }
}
