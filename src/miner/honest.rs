//! The greedy-chain strategy: mine the heaviest known tip, always.

use crate::tip::Tip;

use super::{Miner, MinerId, Offer};

/// Offers a fixed hashrate at the heaviest tip it has observed.
#[derive(Debug, Clone)]
pub struct Honest {
    id: Option<MinerId>,
    hashrate: f64,
    best: Tip,
}

impl Honest {
    /// Creates a miner contributing `hashrate` on top of `start`.
    pub fn new(hashrate: f64, start: Tip) -> Self {
        Honest { id: None, hashrate, best: start }
    }
}

impl Miner for Honest {
    fn name(&self) -> String {
        "Honest".into()
    }

    #[inline]
    fn id(&self) -> MinerId {
        self.id.expect("miner id to be set")
    }

    fn set_id(&mut self, id: MinerId) {
        self.id = Some(id);
    }

    fn offer(&self) -> Offer {
        Offer { hashrate: self.hashrate, tip: self.best.clone() }
    }

    fn on_broadcast(&mut self, tip: &Tip, _time: f64) {
        // Strictly heavier replaces; an equal-work rival never displaces the
        // tip already held.
        if tip.chainwork() > self.best.chainwork() {
            self.best = tip.clone();
        }
    }
}
