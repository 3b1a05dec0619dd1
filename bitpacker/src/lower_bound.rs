use crate::bitpacker::BlockScan;
use crate::blocked_bitpacker::PackedBlocks;
use crate::{LowerBound, BLOCK_LEN};

/// State of a lower bound search over packed blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    /// Block `block_ord` is being scanned. `accumulator` is the value preceding
    /// its first element.
    ScanningBlock { block_ord: usize, accumulator: u32 },
    /// Every value of block `block_ord` is lower than the target, the last one
    /// being `last_value`.
    AdvancingBlock { block_ord: usize, last_value: u32 },
    /// The search is over.
    Done(LowerBound),
}

/// Transition from an exhausted block to the next one.
///
/// The delta base of the next block is the last value of the exhausted block.
pub fn advance_accumulator(block_ord: usize, last_value: u32) -> SearchState {
    SearchState::ScanningBlock {
        block_ord: block_ord + 1,
        accumulator: last_value,
    }
}

/// Lower bound search walking the packed blocks one at a time.
///
/// Blocks are never unpacked: deltas are read in place and added to a
/// running accumulator. Only the blocks preceding the result are visited.
pub struct BlockSearch<'a> {
    blocks: PackedBlocks<'a>,
    target: u32,
    state: SearchState,
}

impl<'a> BlockSearch<'a> {
    pub fn new(blocks: PackedBlocks<'a>, target: u32) -> BlockSearch<'a> {
        BlockSearch {
            blocks,
            target,
            state: SearchState::ScanningBlock {
                block_ord: 0,
                accumulator: 0u32,
            },
        }
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    /// Performs a single transition and returns the new state.
    ///
    /// Stepping a finished search is a no-op.
    pub fn step(&mut self) -> SearchState {
        self.state = match self.state {
            SearchState::ScanningBlock {
                block_ord,
                accumulator,
            } => self.scan_block(block_ord, accumulator),
            SearchState::AdvancingBlock {
                block_ord,
                last_value,
            } => advance_accumulator(block_ord, last_value),
            done @ SearchState::Done(_) => done,
        };
        self.state
    }

    fn scan_block(&self, block_ord: usize, accumulator: u32) -> SearchState {
        let Some(block) = self.blocks.block(block_ord) else {
            // All blocks are exhausted.
            return SearchState::Done(LowerBound {
                position: self.blocks.num_vals(),
                value: accumulator,
            });
        };
        match block.search(accumulator, self.target) {
            BlockScan::Hit { position, value } => SearchState::Done(LowerBound {
                position: block_ord * BLOCK_LEN + position,
                value,
            }),
            BlockScan::Exhausted { last_value } => SearchState::AdvancingBlock {
                block_ord,
                last_value,
            },
        }
    }

    /// Steps until the search is over.
    pub fn run(mut self) -> LowerBound {
        loop {
            if let SearchState::Done(lower_bound) = self.step() {
                return lower_bound;
            }
        }
    }
}

/// Search the first element greater or equal to the target.
///
/// Returns its absolute position and its value, or the number of values as
/// position if every element is lower than the target.
pub fn find_lower_bound(blocks: &PackedBlocks<'_>, target: u32) -> LowerBound {
    BlockSearch::new(*blocks, target).run()
}
