/*!
Re-export of common values and datatypes used for building and running
simulations. Must be imported manually.

```
use daa_sim::prelude::*;
```
*/

use crate::{block, blocktree, miner, results, simulation, tip};

pub use block::{Block, BlockId};

pub use blocktree::BlockTree;

pub use miner::{Honest, Miner, MinerId, Noop, Offer, Switcher};

pub use results::{Format, GroupResults, RunSummary};

pub use simulation::{
    BlockEvent, Simulation, SimulationBuildError, SimulationBuilder,
    SimulationError, SimulationGroup,
};

pub use tip::{Tip, TARGET_SPACING};
