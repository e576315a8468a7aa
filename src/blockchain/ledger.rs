use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{info, warn};

use super::block::{Block, BlockSummary};
use super::chain::{Chain, ChainError};
use super::pow::MiningOutcome;
use super::transaction::Transaction;

/// How many times `mine_and_append` re-mines after losing a race for the tip
pub const MAX_MINING_ATTEMPTS: usize = 8;

/// Shared handle to a chain
///
/// Appends take the write lock, reads take the read lock. Mining never holds
/// a lock: it works on a private block built from a snapshot of the tip.
#[derive(Debug, Clone)]
pub struct Ledger {
    chain: Arc<RwLock<Chain>>,
}

impl Ledger {
    /// Creates a ledger around a fresh chain at `difficulty`
    pub fn new(difficulty: u32) -> Result<Self, ChainError> {
        Ok(Self::from_chain(Chain::new(difficulty)?))
    }

    pub fn from_chain(chain: Chain) -> Self {
        Ledger {
            chain: Arc::new(RwLock::new(chain)),
        }
    }

    // A panic can only happen before the single `push` in `Chain::append`,
    // so a poisoned lock still guards a consistent chain.
    fn read(&self) -> RwLockReadGuard<'_, Chain> {
        self.chain.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Chain> {
        self.chain.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn difficulty(&self) -> u32 {
        self.read().difficulty()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Copy of every block, genesis first
    pub fn blocks(&self) -> Vec<Block> {
        self.read().blocks().to_vec()
    }

    /// Copy of the whole chain
    pub fn snapshot(&self) -> Chain {
        self.read().clone()
    }

    /// Copy of the current tip
    pub fn tip_snapshot(&self) -> Result<Block, ChainError> {
        self.read().tip().cloned()
    }

    pub fn tip_summary(&self) -> Result<BlockSummary, ChainError> {
        self.read().tip_summary()
    }

    /// True while `hash` is still the hash of the tip
    pub fn is_tip(&self, hash: &str) -> bool {
        self.read().tip().is_ok_and(|tip| tip.hash() == hash)
    }

    /// Appends a block mined elsewhere
    pub fn append(&self, block: Block) -> Result<BlockSummary, ChainError> {
        self.write().append(block)
    }

    /// Mines a block holding `transactions` on top of the tip and appends it
    ///
    /// If another writer moves the tip first, the search is abandoned and
    /// restarted against the new tip, up to [`MAX_MINING_ATTEMPTS`] times.
    pub fn mine_and_append(&self, transactions: Vec<Transaction>) -> Result<BlockSummary, ChainError> {
        for attempt in 1..=MAX_MINING_ATTEMPTS {
            let (tip_hash, difficulty) = {
                let chain = self.read();
                (chain.tip()?.hash().to_string(), chain.difficulty())
            };

            let mut block = Block::now(tip_hash.clone(), transactions.clone());
            if block.mine_until(difficulty, || !self.is_tip(&tip_hash)) == MiningOutcome::Abandoned {
                warn!("Tip moved away from {} while mining (attempt {})", tip_hash, attempt);
                continue;
            }

            match self.append(block) {
                Ok(summary) => {
                    info!(
                        "Mined block {} with {} transactions in {} attempt(s)",
                        summary.index, summary.transaction_count, attempt
                    );
                    return Ok(summary);
                }
                Err(ChainError::InvalidLinkage { .. }) => {
                    warn!("Lost the race for tip {} (attempt {})", tip_hash, attempt);
                }
                Err(err) => return Err(err),
            }
        }

        Err(ChainError::StaleTip {
            attempts: MAX_MINING_ATTEMPTS,
        })
    }

    /// Transactions with a non-empty input list across all blocks, in chain order
    pub fn transactions_with_inputs(&self) -> Vec<Transaction> {
        self.read().all_transactions_with_inputs().cloned().collect()
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        let result = self.read().validate();
        if let Err(err) = &result {
            warn!("Chain validation failed: {}", err);
        }
        result
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::transaction::{InputRef, OutputRef};

    const TEST_DIFFICULTY: u32 = 2;

    fn vote(voter: &str, candidate: &str) -> Transaction {
        Transaction::new(
            vec![InputRef::new(voter, 0)],
            vec![OutputRef::new(candidate, 1)],
        )
    }

    #[test]
    fn test_mine_and_append() {
        let ledger = Ledger::new(TEST_DIFFICULTY).unwrap();
        let genesis = ledger.tip_snapshot().unwrap();

        let summary = ledger.mine_and_append(vec![vote("v1", "c1")]).unwrap();

        assert_eq!(summary.index, 1);
        assert_eq!(summary.previous_hash, genesis.hash());
        assert_eq!(summary.transaction_count, 1);
        assert!(summary.hash.starts_with("00"));
        assert_eq!(ledger.tip_summary().unwrap(), summary);
        assert!(ledger.is_valid());
    }

    #[test]
    fn test_concurrent_mine_and_append() {
        let ledger = Ledger::new(TEST_DIFFICULTY).unwrap();

        std::thread::scope(|scope| {
            for i in 0..4 {
                let ledger = ledger.clone();
                scope.spawn(move || {
                    let voter = format!("v{i}");
                    ledger.mine_and_append(vec![vote(&voter, "c1")]).unwrap();
                });
            }
        });

        assert_eq!(ledger.len(), 5);
        assert_eq!(ledger.validate(), Ok(()));
        assert_eq!(ledger.transactions_with_inputs().len(), 4);
    }

    #[test]
    fn test_racing_append_on_same_snapshot() {
        let ledger = Ledger::new(TEST_DIFFICULTY).unwrap();
        let tip = ledger.tip_snapshot().unwrap().hash().to_string();

        let mut first = Block::now(tip.clone(), vec![vote("v1", "c1")]);
        let mut second = Block::now(tip, vec![vote("v2", "c1")]);
        first.mine(TEST_DIFFICULTY);
        second.mine(TEST_DIFFICULTY);

        assert!(ledger.append(first).is_ok());
        assert!(matches!(
            ledger.append(second),
            Err(ChainError::InvalidLinkage { .. })
        ));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_mining_abandoned_when_tip_moves() {
        let ledger = Ledger::new(TEST_DIFFICULTY).unwrap();
        let stale = ledger.tip_snapshot().unwrap().hash().to_string();
        ledger.mine_and_append(vec![]).unwrap();

        let mut block = Block::now(stale.clone(), vec![]);
        let outcome = block.mine_until(64, || !ledger.is_tip(&stale));

        assert_eq!(outcome, MiningOutcome::Abandoned);
        assert!(!ledger.is_tip(&stale));
    }

    #[test]
    fn test_transactions_with_inputs() {
        let ledger = Ledger::new(TEST_DIFFICULTY).unwrap();
        ledger
            .mine_and_append(vec![
                vote("v1", "c1"),
                Transaction::coinbase(vec![OutputRef::new("v2", 1)]),
            ])
            .unwrap();
        ledger.mine_and_append(vec![vote("v2", "c2")]).unwrap();

        let transactions = ledger.transactions_with_inputs();

        assert_eq!(transactions, vec![vote("v1", "c1"), vote("v2", "c2")]);
    }

    #[test]
    fn test_clones_share_state() {
        let ledger = Ledger::new(TEST_DIFFICULTY).unwrap();
        let reader = ledger.clone();

        ledger.mine_and_append(vec![]).unwrap();

        assert_eq!(reader.len(), 2);
        assert_eq!(reader.snapshot().len(), 2);
    }
}
