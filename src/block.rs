use std::cmp::Ordering;

/// Representation of a mined block.
///
/// Blocks are immutable once created: the [`BlockTree`](crate::blocktree::BlockTree)
/// they live in retains the full history of every branch indefinitely.
#[derive(Debug, Clone)]
pub struct Block {
    /// The parent this block was mined on, or `None` for the genesis block.
    pub parent: Option<BlockId>,
    /// Unique, increasing identifier assigned by the tree.
    pub id: BlockId,
    /// Length of the path from this block to genesis.
    pub height: u64,
    /// Time this block was mined, in whole seconds.
    pub timestamp: u64,
    /// Difficulty this block was mined at. Always positive.
    pub difficulty: f64,
    /// Cumulative difficulty from genesis up to and including this block.
    pub chainwork: f64,
}

/// A unique identifier assigned to each [Block], doubling as the block's
/// index into its tree's arena.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct BlockId(u64);

impl BlockId {
    /// The identifier of every tree's genesis block.
    pub const GENESIS: BlockId = BlockId(0);

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u64> for BlockId {
    fn from(value: u64) -> Self {
        BlockId(value)
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Block {}

impl PartialOrd for Block {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.id.cmp(&other.id))
    }
}

impl Ord for Block {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}
