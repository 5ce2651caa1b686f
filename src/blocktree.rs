//! Fork-aware tree of [Blocks](Block) with cumulative chain weight.

use std::ops::Index;

use crate::block::{Block, BlockId};

/// Index of a [BlockPoint] in its tree's marker arena.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
struct PointId(usize);

/// Marker for the distinguished blocks of the tree: fork junctions and
/// branch tips. Straight-line interior segments are not materialized.
///
/// Markers form their own tree, threaded through the block tree: `parent`
/// links upstream toward genesis, `forks` owns the downstream branches.
/// Markers are never deleted, so stale branches remain addressable.
#[derive(Debug, Clone)]
struct BlockPoint {
    /// The block currently sitting at this marker. For a tip marker this is
    /// the branch head and advances in place; for a fork marker it is the
    /// junction block and never moves again.
    block: BlockId,
    /// Single upstream marker, `None` for the genesis marker.
    parent: Option<PointId>,
    /// Downstream markers, one per branch leaving this junction. Empty for
    /// tip markers.
    forks: Vec<PointId>,
}

/// Holds every [Block] mined since genesis and tracks the tree structure
/// with sparse [BlockPoint] markers, so that extending a tip stays
/// O(1)-amortized no matter how long the chain grows.
///
/// Blocks and markers live in arenas addressed by stable indices; parent
/// links are non-owning indices and child collections are owned index lists.
#[derive(Debug, Clone)]
pub struct BlockTree {
    /// Block arena. A [BlockId] is an index into this vector.
    blocks: Vec<Block>,
    /// Marker arena.
    points: Vec<BlockPoint>,
    /// Governing marker of each block: the nearest marker at or downstream
    /// of the block on its own branch. Parallel to `blocks`.
    point_of: Vec<PointId>,
    /// Block with the greatest chainwork seen so far. Ties keep the
    /// incumbent.
    best: BlockId,
}

impl BlockTree {
    /// Creates a tree containing a genesis block with id 0, height 0,
    /// timestamp 0, zero chainwork, and the given difficulty.
    ///
    /// ## Panics
    /// Panics unless `initial_difficulty` is finite and positive.
    pub fn new(initial_difficulty: f64) -> Self {
        assert!(
            initial_difficulty.is_finite() && initial_difficulty > 0.0,
            "initial difficulty must be finite and positive, got {}",
            initial_difficulty
        );

        let genesis = Block {
            parent: None,
            id: BlockId::GENESIS,
            height: 0,
            timestamp: 0,
            difficulty: initial_difficulty,
            chainwork: 0.0,
        };
        let genesis_point =
            BlockPoint { block: genesis.id, parent: None, forks: vec![] };

        BlockTree {
            blocks: vec![genesis],
            points: vec![genesis_point],
            point_of: vec![PointId(0)],
            best: BlockId::GENESIS,
        }
    }

    /// Creates a block on `parent` with the next free id, computing its
    /// height and chainwork, and adds it to the tree.
    ///
    /// ## Panics
    /// Panics if `parent` is not in the tree.
    pub fn new_block(
        &mut self,
        parent: BlockId,
        timestamp: u64,
        difficulty: f64,
    ) -> BlockId {
        assert!(
            self.contains(parent),
            "parent {:?} not present in this tree",
            parent
        );

        let p = &self[parent];
        let block = Block {
            parent: Some(parent),
            id: BlockId::from(self.blocks.len() as u64),
            height: p.height + 1,
            timestamp,
            difficulty,
            chainwork: p.chainwork + difficulty,
        };

        let id = block.id;
        self.add_block(block);
        id
    }

    /// Adds `block` to the tree, updating the marker structure and the
    /// best-known block.
    ///
    /// ## Panics
    /// Panics if the block's id is already present (or skips ahead of the
    /// arena), or if its parent is missing. Both indicate a caller bug, not
    /// a runtime condition.
    pub fn add_block(&mut self, block: Block) {
        assert!(
            block.id.index() == self.blocks.len(),
            "block id {:?} already present or out of order",
            block.id
        );
        let parent = block
            .parent
            .expect("only the genesis block may lack a parent");
        assert!(
            parent.index() < self.blocks.len(),
            "parent {:?} not present in this tree",
            parent
        );

        let pid = self.point_of[parent.index()];
        let at_marker = self.points[pid.0].block == parent;

        if at_marker && self.points[pid.0].forks.is_empty() {
            // Tip marker sitting on the parent: the branch head advances in
            // place.
            self.points[pid.0].block = block.id;
            self.point_of.push(pid);
        } else if at_marker {
            // Fork marker sitting on the parent: one more branch leaves the
            // junction.
            let tip = self.alloc_point(BlockPoint {
                block: block.id,
                parent: Some(pid),
                forks: vec![],
            });
            self.points[pid.0].forks.push(tip);
            self.point_of.push(tip);
        } else {
            // The parent lies strictly inside the segment governed by `pid`:
            // a late-arriving competitor. Materialize a fork marker at the
            // parent and splice it upstream of `pid`.
            let upstream = self.points[pid.0].parent;
            let fork = self.alloc_point(BlockPoint {
                block: parent,
                parent: upstream,
                forks: vec![pid],
            });
            self.points[pid.0].parent = Some(fork);
            let tip = self.alloc_point(BlockPoint {
                block: block.id,
                parent: Some(fork),
                forks: vec![],
            });
            self.points[fork.0].forks.push(tip);
            self.point_of.push(tip);

            // Blocks from the parent back to the nearest pre-existing marker
            // are now governed by the fork. O(k) in that distance, which is
            // only paid on non-tip attachments.
            let mut cursor = Some(parent);
            while let Some(b) = cursor {
                if self.point_of[b.index()] != pid {
                    break;
                }
                self.point_of[b.index()] = fork;
                cursor = self.blocks[b.index()].parent;
            }
        }

        if self.blocks[self.best.index()].chainwork < block.chainwork {
            self.best = block.id;
        }
        self.blocks.push(block);
    }

    /// Returns the id of the genesis block.
    #[inline]
    pub fn genesis(&self) -> BlockId {
        BlockId::GENESIS
    }

    /// Returns the block with the greatest chainwork added so far. When two
    /// blocks tie, the earlier one is kept.
    #[inline]
    pub fn best_block(&self) -> &Block {
        &self.blocks[self.best.index()]
    }

    /// Returns true iff the given id refers to a block in this tree.
    #[inline]
    pub fn contains(&self, id: BlockId) -> bool {
        id.index() < self.blocks.len()
    }

    /// Returns the block with the given id, if present.
    #[inline]
    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.index())
    }

    /// Returns the parent of the block with the given id.
    #[inline]
    pub fn parent_of(&self, id: BlockId) -> Option<BlockId> {
        self.blocks.get(id.index()).and_then(|b| b.parent)
    }

    /// Number of blocks in the tree, including genesis.
    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false: a tree holds at least its genesis block.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Iterates over every block in the tree in insertion order.
    #[inline]
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    /// Walks from the given block up toward genesis, yielding the block
    /// itself first.
    ///
    /// ## Panics
    /// Panics if `id` is not present in this tree.
    pub fn ancestors(&self, id: BlockId) -> Ancestors<'_> {
        assert!(
            self.contains(id),
            "tree does not contain a block with id {:?}",
            id
        );
        Ancestors { tree: self, next: Some(id) }
    }

    fn alloc_point(&mut self, point: BlockPoint) -> PointId {
        let id = PointId(self.points.len());
        self.points.push(point);
        id
    }
}

impl Index<BlockId> for BlockTree {
    type Output = Block;

    fn index(&self, index: BlockId) -> &Self::Output {
        &self.blocks[index.index()]
    }
}

/// Iterator over a block and its ancestors, newest first. Created by
/// [BlockTree::ancestors].
#[derive(Debug, Clone)]
pub struct Ancestors<'a> {
    tree: &'a BlockTree,
    next: Option<BlockId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Block;

    fn next(&mut self) -> Option<Self::Item> {
        let block = &self.tree[self.next?];
        self.next = block.parent;
        Some(block)
    }
}
