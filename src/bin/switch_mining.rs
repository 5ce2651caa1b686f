//! Profit-switch mining: difficulty starts high, then settles at the
//! switcher's break-even point once the window catches up.

use std::error::Error;

use daa_sim::prelude::*;

const DAY: f64 = 86400.0;

fn scenario() -> Result<Simulation, SimulationBuildError> {
    let tree = BlockTree::new(600.0 * 5e18);
    let start = Tip::from_block(&tree, tree.genesis());

    Simulation::builder()
        .blocktree(tree)
        .add_miner(Honest::new(0.1e18, start.clone()))
        .add_miner(Honest::new(0.5e18, start.clone()))
        .add_miner(Switcher::new(5e18, 600.0 * 3e18, start))
        .build()
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut sim = scenario()?;
    sim.run(10.0 * DAY)?;
    println!("day 10:\n{}\n", sim.summary());

    // Spread across independent replays of the same lineup.
    let results = SimulationGroup::new(scenario()?)
        .seeds(0..8)
        .run_all(10.0 * DAY)?;
    println!("{}", results.format(Format::PrettyPrint));

    Ok(())
}
