//! Mining strategy that never contributes hashrate.

use crate::tip::Tip;

use super::{Miner, MinerId, Offer};

/// Always offers zero hashrate. Stands in for hashpower that is present but
/// switched off.
#[derive(Debug, Clone)]
pub struct Noop {
    id: Option<MinerId>,
    best: Tip,
}

impl Noop {
    pub fn new(start: Tip) -> Self {
        Noop { id: None, best: start }
    }
}

impl Miner for Noop {
    fn name(&self) -> String {
        "No-op".into()
    }

    fn id(&self) -> MinerId {
        self.id.expect("miner id to be set")
    }

    fn set_id(&mut self, id: MinerId) {
        self.id = Some(id);
    }

    fn offer(&self) -> Offer {
        Offer { hashrate: 0.0, tip: self.best.clone() }
    }

    fn on_broadcast(&mut self, tip: &Tip, _time: f64) {
        if tip.chainwork() > self.best.chainwork() {
            self.best = tip.clone();
        }
    }
}
