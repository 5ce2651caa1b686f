//! Mining under a hashrate collapse: difficulty is tuned to a strong
//! miner, then mining stops for days and returns at a far lower level.

use std::error::Error;

use daa_sim::prelude::*;

const DAY: f64 = 86400.0;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let tree = BlockTree::new(600.0 * 5e18);
    let start = Tip::from_block(&tree, tree.genesis());

    let mut sim = Simulation::builder()
        .blocktree(tree)
        .add_miner(Honest::new(5e18, start.clone()))
        .add_miner(Honest::new(0.1e18, start))
        .build()?;

    sim.run(2.0 * DAY)?;
    println!("day 2, strong miner about to leave:\n{}\n", sim.summary());

    // The strong miner disappears and the chain sits dead for ten days
    // before the weak miner picks it back up.
    sim.remove_miner(MinerId::from(1));
    sim.advance_time(10.0 * DAY);

    sim.run(30.0 * DAY)?;
    println!("day 30:\n{}", sim.summary());

    Ok(())
}
