//! Hash puzzle used for proof of work
//!
//! A hash solves the puzzle when its first `difficulty` hex characters are
//! all `'0'`. The comparison is made on the hex string, not on the numeric
//! value of the digest.

/// Difficulty used when none is configured
pub const DEFAULT_DIFFICULTY: u32 = 4;

/// Largest accepted difficulty
///
/// Each extra zero multiplies the expected work by 16. At 6 a block takes
/// about 16.7 million hashes, and genesis is mined synchronously at startup.
pub const MAX_DIFFICULTY: u32 = 6;

/// How many nonces are tried between two checks of the abandon predicate
pub const ABANDON_CHECK_INTERVAL: u64 = 1024;

/// Result of a nonce search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiningOutcome {
    /// The block hash now satisfies the difficulty
    Mined,

    /// The search was stopped by the caller before a solution was found
    Abandoned,
}

/// Checks that `hash` starts with `difficulty` consecutive `'0'` characters
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let difficulty = difficulty as usize;
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}

/// True when a puzzle of this difficulty can be solved at all
pub fn is_valid_difficulty(difficulty: u32) -> bool {
    (1..=MAX_DIFFICULTY).contains(&difficulty)
}
