//! Seed derivation for audit selection.
//!
//! SECURITY: the shipped [`BlockEntropySeedSource`] is NOT a secure random
//! beacon. Every input is public or chosen by the party being audited, so the
//! outcome of a finalization can be computed before it is submitted and can be
//! steered by whoever controls ordering within a block or the result hash.

use aice_types::{Address, Hash, JobId};
use chrono::Utc;
use std::num::NonZeroU64;

/// Probability denominator: 10000 basis points = 100%
pub const BPS_DENOMINATOR: u16 = 10_000;

/// Pseudo-random commitment stored with each audit record
pub type Seed = Hash;

const BPS_MODULUS: NonZeroU64 = match NonZeroU64::new(BPS_DENOMINATOR as u64) {
    Some(modulus) => modulus,
    None => panic!("BPS_DENOMINATOR must be non-zero"),
};

/// Job-specific inputs mixed into a seed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedInput {
    pub job_id: JobId,
    pub agent: Address,
    pub result_hash: Hash,
}

/// Chain-derived inputs observed at the moment of finalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainSnapshot {
    /// Entropy from a recent block (e.g. the previous block hash)
    pub block_entropy: Hash,
    /// Unix seconds
    pub timestamp: i64,
}

/// Source of block entropy and time
pub trait ChainContext: Send + Sync {
    fn snapshot(&self) -> ChainSnapshot;
}

/// Randomness capability used by the scheduler
pub trait SeedSource: Send + Sync {
    fn derive_seed(&self, input: &SeedInput, chain: &ChainSnapshot) -> Seed;
}

/// blake3(job_id ‖ agent ‖ result_hash ‖ block_entropy ‖ timestamp)
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockEntropySeedSource;

impl SeedSource for BlockEntropySeedSource {
    fn derive_seed(&self, input: &SeedInput, chain: &ChainSnapshot) -> Seed {
        let mut timestamp_word = [0u8; 32];
        timestamp_word[24..].copy_from_slice(&chain.timestamp.to_be_bytes());

        let mut hasher = blake3::Hasher::new();
        hasher.update(&input.job_id.to_word());
        hasher.update(input.agent.as_bytes());
        hasher.update(&input.result_hash);
        hasher.update(&chain.block_entropy);
        hasher.update(&timestamp_word);
        *hasher.finalize().as_bytes()
    }
}

/// Chain context pinned to one block; what any observer of the chain sees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedChainContext {
    snapshot: ChainSnapshot,
}

impl FixedChainContext {
    pub fn new(block_entropy: Hash, timestamp: i64) -> Self {
        Self {
            snapshot: ChainSnapshot {
                block_entropy,
                timestamp,
            },
        }
    }
}

impl ChainContext for FixedChainContext {
    fn snapshot(&self) -> ChainSnapshot {
        self.snapshot
    }
}

/// Wall-clock chain: block entropy is a hash of the current block height,
/// where a block spans `block_interval_secs` seconds.
///
/// Both inputs are derivable by anyone with a clock.
#[derive(Debug, Clone, Copy)]
pub struct WallClockChain {
    block_interval_secs: i64,
}

impl WallClockChain {
    pub fn new(block_interval_secs: u64) -> Self {
        Self {
            block_interval_secs: i64::try_from(block_interval_secs)
                .unwrap_or(i64::MAX)
                .max(1),
        }
    }

    pub fn entropy_for_height(height: i64) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"aice-block");
        hasher.update(&height.to_be_bytes());
        *hasher.finalize().as_bytes()
    }
}

impl Default for WallClockChain {
    fn default() -> Self {
        Self::new(12)
    }
}

impl ChainContext for WallClockChain {
    fn snapshot(&self) -> ChainSnapshot {
        let timestamp = Utc::now().timestamp();
        ChainSnapshot {
            block_entropy: Self::entropy_for_height(timestamp / self.block_interval_secs),
            timestamp,
        }
    }
}

/// `seed mod modulus`, treating the seed as a big-endian unsigned integer
pub fn seed_mod(seed: &Seed, modulus: NonZeroU64) -> u64 {
    let modulus = modulus.get() as u128;
    seed.iter()
        .fold(0u128, |acc, byte| (acc * 256 + *byte as u128) % modulus) as u64
}

/// Selection rule: `seed mod 10000 < probability_bps`
pub fn is_selected(seed: &Seed, probability_bps: u16) -> bool {
    probability_bps > 0 && seed_mod(seed, BPS_MODULUS) < probability_bps as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(job: u64) -> SeedInput {
        SeedInput {
            job_id: JobId::new(job),
            agent: Address::from_bytes([2; 32]),
            result_hash: [3; 32],
        }
    }

    #[test]
    fn test_seed_mod_matches_small_integers() {
        let mut seed = [0u8; 32];
        seed[31] = 0x27;
        seed[30] = 0x10; // 0x1027 = 4135
        assert_eq!(seed_mod(&seed, BPS_MODULUS), 4135);

        let mut big = [0u8; 32];
        big[29] = 0x01; // 65536
        assert_eq!(seed_mod(&big, BPS_MODULUS), 5536);
    }

    #[test]
    fn test_seed_mod_unit_modulus() {
        assert_eq!(seed_mod(&[0xFF; 32], NonZeroU64::MIN), 0);
    }

    #[test]
    fn test_seed_mod_all_ones() {
        // 2^256 - 1 mod 10000 = 9935
        assert_eq!(seed_mod(&[0xFF; 32], BPS_MODULUS), 9935);
    }

    #[test]
    fn test_selection_edges() {
        let seed = [0u8; 32];
        assert!(!is_selected(&seed, 0));
        assert!(is_selected(&seed, 1));
        assert!(is_selected(&[0xFF; 32], BPS_DENOMINATOR));
    }

    #[test]
    fn test_seed_is_deterministic_for_observer() {
        let chain = FixedChainContext::new([9; 32], 1_700_000_000).snapshot();
        let source = BlockEntropySeedSource;

        assert_eq!(
            source.derive_seed(&input(1), &chain),
            source.derive_seed(&input(1), &chain)
        );
        assert_ne!(
            source.derive_seed(&input(1), &chain),
            source.derive_seed(&input(2), &chain)
        );
    }

    #[test]
    fn test_timestamp_changes_seed() {
        let source = BlockEntropySeedSource;
        let a = FixedChainContext::new([9; 32], 100).snapshot();
        let b = FixedChainContext::new([9; 32], 101).snapshot();
        assert_ne!(source.derive_seed(&input(1), &a), source.derive_seed(&input(1), &b));
    }

    #[test]
    fn test_wall_clock_entropy_is_public() {
        let chain = WallClockChain::new(12);
        let snap = chain.snapshot();
        // An observer recomputes the block entropy from the time alone
        assert_eq!(
            snap.block_entropy,
            WallClockChain::entropy_for_height(snap.timestamp / 12)
        );
    }

    #[test]
    fn test_oversized_block_interval_saturates() {
        let chain = WallClockChain::new(u64::MAX);
        assert_eq!(chain.block_interval_secs, i64::MAX);

        let snap = chain.snapshot();
        assert!(snap.timestamp >= 0);
        assert_eq!(snap.block_entropy, WallClockChain::entropy_for_height(0));

        assert_eq!(WallClockChain::new(0).block_interval_secs, 1);
    }
}
