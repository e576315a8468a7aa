use log::{info, warn};
use thiserror::Error;

use super::block::{Block, BlockSummary};
use super::pow::{self, DEFAULT_DIFFICULTY, MAX_DIFFICULTY};
use super::transaction::Transaction;

/// Previous hash carried by the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Timestamp of the genesis block, fixed so every chain of a given
/// difficulty starts from the same block
pub const GENESIS_TIMESTAMP: i64 = 0;

/// Errors that can occur during chain operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("Invalid linkage at block {index}: expected previous hash {expected}, found {found}")]
    InvalidLinkage {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("Invalid proof of work at block {index}: hash lacks {difficulty} leading zeros")]
    InvalidProofOfWork { index: usize, difficulty: u32 },

    #[error("Hash mismatch at block {index}: stored hash differs from recomputed hash")]
    HashMismatch { index: usize },

    #[error("Chain has no blocks")]
    EmptyChain,

    #[error("Difficulty {0} is outside 1..={max}", max = MAX_DIFFICULTY)]
    DifficultyOutOfRange(u32),

    #[error("Tip kept moving while mining, gave up after {attempts} attempts")]
    StaleTip { attempts: usize },
}

/// Represents the chain of blocks
///
/// Blocks are only ever added through [`Chain::append`], which checks the
/// block against the current tip first.
#[derive(Debug, Clone)]
pub struct Chain {
    /// The chain of blocks, genesis first
    blocks: Vec<Block>,

    /// Mining difficulty (number of leading zeros required in hash)
    difficulty: u32,
}

impl Chain {
    /// Creates a chain holding only the genesis block, using the default difficulty
    pub fn genesis() -> Self {
        Self::with_genesis(DEFAULT_DIFFICULTY)
    }

    /// Creates a chain holding only the genesis block
    ///
    /// # Arguments
    ///
    /// * `difficulty` - Leading-zero count every block must satisfy
    ///
    /// # Returns
    ///
    /// The new chain, or `DifficultyOutOfRange` when no hash could satisfy `difficulty`
    pub fn new(difficulty: u32) -> Result<Self, ChainError> {
        if !pow::is_valid_difficulty(difficulty) {
            return Err(ChainError::DifficultyOutOfRange(difficulty));
        }

        Ok(Self::with_genesis(difficulty))
    }

    /// Adopts an existing list of blocks after validating it
    pub fn from_blocks(difficulty: u32, blocks: Vec<Block>) -> Result<Self, ChainError> {
        if !pow::is_valid_difficulty(difficulty) {
            return Err(ChainError::DifficultyOutOfRange(difficulty));
        }
        if blocks.is_empty() {
            return Err(ChainError::EmptyChain);
        }

        let chain = Chain { blocks, difficulty };
        chain.validate()?;
        Ok(chain)
    }

    fn with_genesis(difficulty: u32) -> Self {
        let mut genesis = Block::new(GENESIS_PREVIOUS_HASH.to_string(), GENESIS_TIMESTAMP, Vec::new());
        genesis.mine(difficulty);
        info!("Created genesis block {} at difficulty {}", genesis.hash(), difficulty);

        Chain {
            blocks: vec![genesis],
            difficulty,
        }
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    /// Gets the last block in the chain
    pub fn tip(&self) -> Result<&Block, ChainError> {
        self.blocks.last().ok_or(ChainError::EmptyChain)
    }

    pub fn tip_summary(&self) -> Result<BlockSummary, ChainError> {
        let tip = self.tip()?;
        Ok(tip.summary((self.blocks.len() - 1) as u64))
    }

    /// Appends a mined block on top of the tip
    ///
    /// The chain is left untouched when the block is rejected.
    pub fn append(&mut self, block: Block) -> Result<BlockSummary, ChainError> {
        let index = self.blocks.len();
        let tip = self.tip()?;

        if block.previous_hash() != tip.hash() {
            warn!(
                "Rejected block {}: previous hash {} does not match tip {}",
                index,
                block.previous_hash(),
                tip.hash()
            );
            return Err(ChainError::InvalidLinkage {
                index,
                expected: tip.hash().to_string(),
                found: block.previous_hash().to_string(),
            });
        }

        if !block.meets_difficulty(self.difficulty) {
            warn!("Rejected block {}: hash {} is not mined", index, block.hash());
            return Err(ChainError::InvalidProofOfWork {
                index,
                difficulty: self.difficulty,
            });
        }

        let summary = block.summary(index as u64);
        self.blocks.push(block);
        info!("Appended block {} with hash {}", index, summary.hash);

        Ok(summary)
    }

    /// Validates the chain
    ///
    /// Checks the genesis sentinel, then the stored hash and proof of work
    /// of every block, and the linkage of every block after genesis. Stops
    /// at the first violation and never repairs anything.
    pub fn validate(&self) -> Result<(), ChainError> {
        let genesis = self.blocks.first().ok_or(ChainError::EmptyChain)?;
        if genesis.previous_hash() != GENESIS_PREVIOUS_HASH {
            return Err(ChainError::InvalidLinkage {
                index: 0,
                expected: GENESIS_PREVIOUS_HASH.to_string(),
                found: genesis.previous_hash().to_string(),
            });
        }
        self.check_sealed(0, genesis)?;

        for (index, pair) in self.blocks.windows(2).enumerate() {
            let (previous, current) = (&pair[0], &pair[1]);
            let index = index + 1;

            if current.previous_hash() != previous.hash() {
                return Err(ChainError::InvalidLinkage {
                    index,
                    expected: previous.hash().to_string(),
                    found: current.previous_hash().to_string(),
                });
            }

            self.check_sealed(index, current)?;
        }

        Ok(())
    }

    // Stored hash matches the contents and satisfies the difficulty
    fn check_sealed(&self, index: usize, block: &Block) -> Result<(), ChainError> {
        if block.hash() != block.calculate_hash() {
            return Err(ChainError::HashMismatch { index });
        }

        if !block.meets_difficulty(self.difficulty) {
            return Err(ChainError::InvalidProofOfWork {
                index,
                difficulty: self.difficulty,
            });
        }

        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Every transaction with a non-empty input list, in block then
    /// transaction order
    ///
    /// The iterator is recomputed on every call and borrows the chain.
    pub fn all_transactions_with_inputs(&self) -> impl Iterator<Item = &Transaction> + '_ {
        self.blocks
            .iter()
            .flat_map(|block| block.transactions())
            .filter(|transaction| transaction.has_inputs())
    }

    #[cfg(test)]
    pub(crate) fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.blocks
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::genesis()
    }
}
