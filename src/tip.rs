//! Branch cursors carrying the rolling history needed by the difficulty
//! adjustment algorithm.

use std::sync::Arc;

use crate::{
    block::{Block, BlockId},
    blocktree::BlockTree,
};

/// Target spacing between blocks, in seconds.
pub const TARGET_SPACING: f64 = 600.0;

/// Most history entries a tip keeps: 146 ancestors plus the tip block. The
/// adjustment window spans the 144 block intervals inside this history.
const HISTORY_LEN: usize = 147;

/// Clamp bounds on the elapsed time over the adjustment window, bounding
/// both runaway-easy and runaway-hard adjustment.
const MIN_WINDOW_SECS: f64 = 72.0 * TARGET_SPACING;
const MAX_WINDOW_SECS: f64 = 288.0 * TARGET_SPACING;

/// Cursor on one branch of a [BlockTree].
///
/// A tip pins a block together with a bounded window of its most recent
/// ancestors, enough to evaluate the difficulty adjustment without
/// re-walking the whole chain. Tips are immutable value-like snapshots:
/// advancing a branch produces a new tip, and sibling tips that share a
/// divergent ancestor window never observe each other's growth.
#[derive(Debug, Clone)]
pub struct Tip {
    block: BlockId,
    height: u64,
    chainwork: f64,
    next_difficulty: f64,
    /// This tip's own ancestor chain, oldest first, ending at `block`.
    window: Arc<[BlockId]>,
}

impl Tip {
    /// Extends `parent` by one block: copies the parent's window, appends
    /// the new block, and drops the oldest surplus entry.
    ///
    /// This is the fast path used for every block the simulation commits.
    pub fn from_parent(tree: &BlockTree, block: BlockId, parent: &Tip) -> Self {
        debug_assert_eq!(tree[block].parent, Some(parent.block));

        let skip = parent.window.len().saturating_sub(HISTORY_LEN - 1);
        let mut window = parent.window[skip..].to_vec();
        window.push(block);

        Self::with_window(tree, window)
    }

    /// Builds a tip for an arbitrary block by walking up to 146 ancestors.
    ///
    /// O(146); used to bootstrap miners from genesis or to reattach history
    /// on a branch no live tip covers.
    pub fn from_block(tree: &BlockTree, block: BlockId) -> Self {
        let mut window: Vec<BlockId> =
            tree.ancestors(block).take(HISTORY_LEN).map(|b| b.id).collect();
        window.reverse();

        Self::with_window(tree, window)
    }

    fn with_window(tree: &BlockTree, window: Vec<BlockId>) -> Self {
        let block = &tree[*window.last().expect("window holds the tip block")];
        Tip {
            block: block.id,
            height: block.height,
            chainwork: block.chainwork,
            next_difficulty: next_difficulty(tree, &window, block),
            window: window.into(),
        }
    }

    /// The block this tip points at.
    #[inline]
    pub fn block(&self) -> BlockId {
        self.block
    }

    /// Height of the pinned block.
    #[inline]
    pub fn height(&self) -> u64 {
        self.height
    }

    /// Cumulative work of the branch ending at this tip. The basis on which
    /// miners compare competing tips.
    #[inline]
    pub fn chainwork(&self) -> f64 {
        self.chainwork
    }

    /// Difficulty required of the next block mined on this tip.
    #[inline]
    pub fn next_difficulty(&self) -> f64 {
        self.next_difficulty
    }

    /// Number of blocks in the rolling history, the tip block included.
    #[inline]
    pub fn history_len(&self) -> usize {
        self.window.len()
    }
}

/// The BCH difficulty adjustment in force since November 2017: a 144-block
/// work-over-time average targeting [TARGET_SPACING]-second intervals.
///
/// The window endpoints skip the newest block (`window[len-2]`) and drop the
/// oldest entry (`window[len-146]`); no median filtering is needed because
/// timestamps are monotonic by construction here.
fn next_difficulty(tree: &BlockTree, window: &[BlockId], block: &Block) -> f64 {
    if window.len() < HISTORY_LEN {
        // Early chain history copies the difficulty forward.
        return block.difficulty;
    }

    let last = &tree[window[window.len() - 2]];
    let first = &tree[window[window.len() - 146]];

    let elapsed = last.timestamp.saturating_sub(first.timestamp) as f64;
    let elapsed = elapsed.clamp(MIN_WINDOW_SECS, MAX_WINDOW_SECS);
    let work = last.chainwork - first.chainwork;

    work * TARGET_SPACING / elapsed
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::{Tip, HISTORY_LEN};
    use crate::blocktree::BlockTree;

    /// Straight chain of `count` blocks above genesis, `spacing` seconds
    /// apart, all at the tree's initial difficulty.
    fn straight_chain(count: u64, spacing: u64, difficulty: f64) -> BlockTree {
        let mut tree = BlockTree::new(difficulty);
        let mut parent = tree.genesis();
        for i in 1..=count {
            parent = tree.new_block(parent, i * spacing, difficulty);
        }
        tree
    }

    #[test]
    fn window_length_tracks_depth() {
        let tree = straight_chain(300, 600, 2.0);
        for block in tree.blocks() {
            let tip = Tip::from_block(&tree, block.id);
            let expected = usize::min(HISTORY_LEN, block.height as usize + 1);
            assert_eq!(tip.history_len(), expected);
        }
    }

    #[test]
    fn short_history_copies_difficulty() {
        let tree = straight_chain(145, 600, 3.5);
        // Height 145 has 146 window entries: one short of a full window.
        let tip = Tip::from_block(&tree, tree.best_block().id);
        assert_eq!(tip.history_len(), HISTORY_LEN - 1);
        assert_eq!(tip.next_difficulty(), 3.5);
    }

    #[test]
    fn full_window_on_target_holds_difficulty() {
        // 600-second spacing over a full window: elapsed = 144 * 600, work =
        // 144 * d, so the formula reproduces d exactly.
        let tree = straight_chain(200, 600, 2.0);
        let tip = Tip::from_block(&tree, tree.best_block().id);
        assert_eq!(tip.history_len(), HISTORY_LEN);
        assert_eq!(tip.next_difficulty(), 2.0);
    }

    #[test]
    fn compressed_window_clamps_low() {
        // 146 blocks above genesis mined 10 seconds apart: the elapsed span
        // clamps up to 72 * 600 = 43200 seconds.
        let tree = straight_chain(146, 10, 1.0);
        let tip = Tip::from_block(&tree, tree.best_block().id);
        assert_eq!(tip.history_len(), HISTORY_LEN);
        // work = 144 * 1.0 over 43200s -> 144 * 600 / 43200 = 2.0
        assert_eq!(tip.next_difficulty(), 2.0);
    }

    #[test]
    fn stretched_window_clamps_high() {
        // Blocks a week apart: the elapsed span clamps down to 288 * 600 =
        // 172800 seconds.
        let tree = straight_chain(146, 604800, 1.0);
        let tip = Tip::from_block(&tree, tree.best_block().id);
        // work = 144 * 1.0 over 172800s -> 0.5
        assert_eq!(tip.next_difficulty(), 0.5);
    }

    #[test]
    fn incremental_and_walked_tips_agree() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut tree = BlockTree::new(1.0);
        let mut incremental = Tip::from_block(&tree, tree.genesis());
        let mut time = 0u64;

        for _ in 0..400 {
            time += rng.gen_range(1..1200);
            let id = tree.new_block(
                incremental.block(),
                time,
                incremental.next_difficulty(),
            );
            incremental = Tip::from_parent(&tree, id, &incremental);

            let walked = Tip::from_block(&tree, id);
            assert_eq!(walked.history_len(), incremental.history_len());
            assert_eq!(walked.next_difficulty(), incremental.next_difficulty());
            assert_eq!(walked.chainwork(), incremental.chainwork());
        }
    }

    #[test]
    fn sibling_tips_do_not_share_growth() {
        let mut tree = BlockTree::new(1.0);
        let junction = tree.new_block(tree.genesis(), 600, 1.0);
        let junction_tip = Tip::from_block(&tree, junction);

        let left = tree.new_block(junction, 1200, 1.0);
        let left_tip = Tip::from_parent(&tree, left, &junction_tip);
        let right = tree.new_block(junction, 1300, 1.0);
        let right_tip = Tip::from_parent(&tree, right, &junction_tip);

        // Grow the left branch; the right tip's history must be unaffected.
        let mut head = left_tip;
        for i in 0..10u64 {
            let id =
                tree.new_block(head.block(), 1800 + i * 600, 1.0);
            head = Tip::from_parent(&tree, id, &head);
        }

        assert_eq!(right_tip.block(), right);
        assert_eq!(right_tip.history_len(), 3);
        let walked = Tip::from_block(&tree, right);
        assert_eq!(walked.history_len(), 3);
        assert_eq!(walked.next_difficulty(), right_tip.next_difficulty());
    }
}
