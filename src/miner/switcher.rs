//! Profitability switching: hashpower that leaves for greener pastures
//! whenever the local difficulty climbs too high.

use crate::tip::Tip;

use super::{Miner, MinerId, Offer};

/// Like [Honest](super::Honest), but offers zero hashrate whenever the best
/// tip's next difficulty reaches `threshold`.
///
/// Models miners who mine whichever chain is currently more profitable: the
/// threshold stands in for the break-even difficulty against the competing
/// chain. The comparison is strict, so a tip sitting exactly on the
/// threshold attracts no hashrate.
#[derive(Debug, Clone)]
pub struct Switcher {
    id: Option<MinerId>,
    hashrate: f64,
    threshold: f64,
    best: Tip,
}

impl Switcher {
    /// Creates a miner contributing `hashrate` on top of `start` while the
    /// next difficulty stays below `threshold`.
    pub fn new(hashrate: f64, threshold: f64, start: Tip) -> Self {
        Switcher { id: None, hashrate, threshold, best: start }
    }
}

impl Miner for Switcher {
    fn name(&self) -> String {
        "Switcher".into()
    }

    #[inline]
    fn id(&self) -> MinerId {
        self.id.expect("miner id to be set")
    }

    fn set_id(&mut self, id: MinerId) {
        self.id = Some(id);
    }

    fn offer(&self) -> Offer {
        let hashrate = if self.best.next_difficulty() < self.threshold {
            self.hashrate
        } else {
            0.0
        };
        Offer { hashrate, tip: self.best.clone() }
    }

    fn on_broadcast(&mut self, tip: &Tip, _time: f64) {
        if tip.chainwork() > self.best.chainwork() {
            self.best = tip.clone();
        }
    }
}
