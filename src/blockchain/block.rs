use chrono::Utc;
use log::debug;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

use super::pow::{self, MiningOutcome, ABANDON_CHECK_INTERVAL};
use super::transaction::Transaction;

/// Represents a block in the chain
///
/// Only `nonce` and `hash` change after construction, and only inside
/// [`Block::mine_until`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Block {
    /// Milliseconds since the Unix epoch, set at construction
    timestamp: i64,

    /// Transactions included in this block
    transactions: Vec<Transaction>,

    /// Proof of work counter
    nonce: u64,

    /// Hash of the previous block
    previous_hash: String,

    /// Hash of this block as of the last mining step
    hash: String,
}

/// Summary of a block handed to callers that do not need its transactions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BlockSummary {
    /// Position of the block in the chain
    pub index: u64,

    /// Hash of the block
    pub hash: String,

    /// Hash of the block this one extends
    pub previous_hash: String,

    /// Milliseconds since the Unix epoch
    pub timestamp: i64,

    /// Nonce that solved the proof of work
    pub nonce: u64,

    /// Number of transactions in the block
    pub transaction_count: usize,
}

impl Block {
    /// Creates a new, unmined block
    ///
    /// # Arguments
    ///
    /// * `previous_hash` - The hash of the block this one extends
    /// * `timestamp` - Creation time in milliseconds since the epoch
    /// * `transactions` - The transactions to include in the block
    ///
    /// # Returns
    ///
    /// A Block with nonce 0 and its initial hash
    pub fn new(previous_hash: String, timestamp: i64, transactions: Vec<Transaction>) -> Self {
        let hash = calculate_hash(&previous_hash, timestamp, 0, &transactions);

        Block {
            timestamp,
            transactions,
            nonce: 0,
            previous_hash,
            hash,
        }
    }

    /// Creates a new block stamped with the current time
    pub fn now(previous_hash: String, transactions: Vec<Transaction>) -> Self {
        Self::new(previous_hash, Utc::now().timestamp_millis(), transactions)
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    /// The stored hash, which is not recomputed on read
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Recomputes the hash from the block's current contents
    pub fn calculate_hash(&self) -> String {
        calculate_hash(&self.previous_hash, self.timestamp, self.nonce, &self.transactions)
    }

    pub fn meets_difficulty(&self, difficulty: u32) -> bool {
        pow::meets_difficulty(&self.hash, difficulty)
    }

    /// Searches nonces until the hash meets `difficulty`
    pub fn mine(&mut self, difficulty: u32) {
        self.mine_until(difficulty, || false);
    }

    /// Searches nonces until the hash meets `difficulty` or `abandon` returns true
    ///
    /// `abandon` is polled every [`ABANDON_CHECK_INTERVAL`] nonces, so a miner
    /// racing against a moving tip can stop early. On
    /// [`MiningOutcome::Abandoned`] the block holds a partial search state and
    /// must not be appended.
    pub fn mine_until<F>(&mut self, difficulty: u32, mut abandon: F) -> MiningOutcome
    where
        F: FnMut() -> bool,
    {
        let prefix = header_hasher(&self.previous_hash, self.timestamp, &self.transactions);
        let mut attempts: u64 = 0;

        while !pow::meets_difficulty(&self.hash, difficulty) {
            if attempts > 0 && attempts % ABANDON_CHECK_INTERVAL == 0 && abandon() {
                debug!(
                    "Abandoned mining on {} after {} attempts",
                    self.previous_hash, attempts
                );
                return MiningOutcome::Abandoned;
            }

            self.nonce = self.nonce.wrapping_add(1);
            self.hash = finish_hash(prefix.clone(), self.nonce);
            attempts += 1;
        }

        debug!(
            "Mined block with nonce {} after {} attempts: {}",
            self.nonce, attempts, self.hash
        );
        MiningOutcome::Mined
    }

    /// Builds the summary of this block at `index`
    pub fn summary(&self, index: u64) -> BlockSummary {
        BlockSummary {
            index,
            hash: self.hash.clone(),
            previous_hash: self.previous_hash.clone(),
            timestamp: self.timestamp,
            nonce: self.nonce,
            transaction_count: self.transactions.len(),
        }
    }

    #[cfg(test)]
    pub(crate) fn overwrite_hash(&mut self, hash: String) {
        self.hash = hash;
    }
}

/// Hashes the explicit block tuple into a lowercase hex SHA-256 digest
///
/// The result depends only on the arguments.
pub fn calculate_hash(
    previous_hash: &str,
    timestamp: i64,
    nonce: u64,
    transactions: &[Transaction],
) -> String {
    finish_hash(header_hasher(previous_hash, timestamp, transactions), nonce)
}

// The nonce goes last so mining can reuse the hasher state of everything before it.
fn header_hasher(previous_hash: &str, timestamp: i64, transactions: &[Transaction]) -> Sha256 {
    let mut hasher = Sha256::new();
    hasher.update((previous_hash.len() as u64).to_be_bytes());
    hasher.update(previous_hash.as_bytes());
    hasher.update(timestamp.to_be_bytes());
    hasher.update((transactions.len() as u64).to_be_bytes());
    for transaction in transactions {
        transaction.hash_into(&mut hasher);
    }
    hasher
}

fn finish_hash(mut hasher: Sha256, nonce: u64) -> String {
    hasher.update(nonce.to_be_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::transaction::{InputRef, OutputRef};

    fn ballot() -> Vec<Transaction> {
        vec![
            Transaction::coinbase(vec![OutputRef::new("voter", 1)]),
            Transaction::new(
                vec![InputRef::new("a".repeat(64), 0)],
                vec![OutputRef::new("candidate", 1)],
            ),
        ]
    }

    #[test]
    fn test_new_block() {
        let block = Block::new("0".to_string(), 1_600_000_000_000, ballot());

        assert_eq!(block.nonce(), 0);
        assert_eq!(block.previous_hash(), "0");
        assert_eq!(block.timestamp(), 1_600_000_000_000);
        assert_eq!(block.transactions().len(), 2);
        assert_eq!(block.hash(), block.calculate_hash());
    }

    #[test]
    fn test_calculate_hash() {
        let block = Block::new("0".to_string(), 1_600_000_000_000, ballot());

        let hash = block.calculate_hash();
        assert_eq!(hash.len(), 64);
        assert!(hash.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
        assert_eq!(hash, block.calculate_hash());
    }

    #[test]
    fn test_hash_depends_on_every_field() {
        let base = calculate_hash("0", 1, 0, &ballot());

        assert_ne!(base, calculate_hash("1", 1, 0, &ballot()));
        assert_ne!(base, calculate_hash("0", 2, 0, &ballot()));
        assert_ne!(base, calculate_hash("0", 1, 1, &ballot()));
        assert_ne!(base, calculate_hash("0", 1, 0, &ballot()[..1]));
    }

    #[test]
    fn test_mine_block() {
        let mut block = Block::new("0".to_string(), 1_600_000_000_000, ballot());
        block.mine(3);

        assert!(block.hash().starts_with("000"));
        assert!(block.meets_difficulty(3));
        assert_eq!(block.hash(), block.calculate_hash());
    }

    #[test]
    fn test_mine_is_noop_when_already_solved() {
        let mut block = Block::new("0".to_string(), 1_600_000_000_000, vec![]);
        block.mine(2);
        let nonce = block.nonce();

        block.mine(2);
        assert_eq!(block.nonce(), nonce);
    }

    #[test]
    fn test_mine_until_abandons() {
        let mut block = Block::new("0".to_string(), 1_600_000_000_000, ballot());

        // Difficulty 64 is never reached in practice, so only the predicate stops the search
        let outcome = block.mine_until(64, || true);

        assert_eq!(outcome, MiningOutcome::Abandoned);
        assert_eq!(block.nonce(), ABANDON_CHECK_INTERVAL);
        assert_eq!(block.hash(), block.calculate_hash());
    }

    #[test]
    fn test_summary() {
        let mut block = Block::new("0".to_string(), 42, vec![]);
        block.mine(1);
        let summary = block.summary(7);

        assert_eq!(summary.index, 7);
        assert_eq!(summary.hash, block.hash());
        assert_eq!(summary.previous_hash, "0");
        assert_eq!(summary.timestamp, 42);
        assert_eq!(summary.nonce, block.nonce());
        assert_eq!(summary.transaction_count, 0);
    }
}
