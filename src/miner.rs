//! Definitions for representations of mining strategies.

pub mod honest;
pub mod noop;
pub mod switcher;

pub use honest::Honest;
pub use noop::Noop;
pub use switcher::Switcher;

use std::fmt::Debug;

use dyn_clone::DynClone;

use crate::tip::Tip;

/// A unique identifier assigned to each [Miner].
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct MinerId(u64);

impl From<u64> for MinerId {
    fn from(value: u64) -> Self {
        MinerId(value)
    }
}

impl std::fmt::Display for MinerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A miner's standing bid in the block-finding race: the hashrate it is
/// currently willing to spend and the tip it would extend.
#[derive(Debug, Clone)]
pub struct Offer {
    /// Hashrate contributed this instant. Zero withdraws the miner from the
    /// race without removing it from the simulation.
    pub hashrate: f64,
    /// The tip the miner is mining on.
    pub tip: Tip,
}

/// A mining strategy reacting to chain state. Strategies are polled for
/// their current [Offer] before every candidate block event and notified of
/// every broadcast block.
pub trait Miner: Debug + DynClone + Send + Sync {
    /// Returns the name of this miner's strategy.
    fn name(&self) -> String {
        "Name not set".into()
    }

    /// Get this miner's [MinerId].
    ///
    /// ## Panics
    /// Panics if this miner's ID has not been set using [Miner::set_id].
    fn id(&self) -> MinerId;

    /// Set this miner's [MinerId]. Called once when the miner joins a
    /// simulation, before any other trait method.
    fn set_id(&mut self, id: MinerId);

    /// Returns the hashrate this miner currently contributes and the tip it
    /// is mining on.
    fn offer(&self) -> Offer;

    /// Called when a block is broadcast to the network, the miner's own
    /// blocks included.
    fn on_broadcast(&mut self, tip: &Tip, time: f64);

    /// Called when this miner finds a block, before anyone else hears of
    /// it. Return `true` to withhold the block from broadcast; the default
    /// publishes immediately.
    fn on_own_block(&mut self, tip: &Tip, time: f64) -> bool {
        let _ = (tip, time);
        false
    }
}

dyn_clone::clone_trait_object!(Miner);
