use aice_audit::{
    is_selected, seed_mod, BlockEntropySeedSource, ChainContext, FixedChainContext, SeedInput,
    SeedSource, BPS_DENOMINATOR,
};
use aice_types::{Address, JobId};
use proptest::prelude::*;
use std::num::NonZeroU64;

/// Reference big-endian reduction using u128 limbs of the seed
fn reference_mod(seed: &[u8; 32], modulus: u128) -> u128 {
    let hi = u128::from_be_bytes(seed[..16].try_into().unwrap());
    let lo = u128::from_be_bytes(seed[16..].try_into().unwrap());
    // 2^128 mod m computed as ((2^64 mod m)^2) mod m
    let two_64 = (1u128 << 64) % modulus;
    let two_128 = (two_64 * two_64) % modulus;
    ((hi % modulus) * two_128 + lo % modulus) % modulus
}

proptest! {
    /// Property: seed_mod agrees with a wide-integer reduction
    #[test]
    fn prop_seed_mod_matches_reference(seed in any::<[u8; 32]>(), modulus in 1u64..1_000_000) {
        let nonzero = NonZeroU64::new(modulus).unwrap();
        prop_assert_eq!(seed_mod(&seed, nonzero) as u128, reference_mod(&seed, modulus as u128));
    }

    /// Property: raising the probability never deselects a seed
    #[test]
    fn prop_selection_is_monotonic(seed in any::<[u8; 32]>(), low in 0u16..=10_000, high in 0u16..=10_000) {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        if is_selected(&seed, low) {
            prop_assert!(is_selected(&seed, high));
        }
    }

    /// Property: full probability selects every seed, zero selects none
    #[test]
    fn prop_probability_extremes(seed in any::<[u8; 32]>()) {
        prop_assert!(is_selected(&seed, BPS_DENOMINATOR));
        prop_assert!(!is_selected(&seed, 0));
    }

    /// Property: the seed is a pure function of public inputs
    #[test]
    fn prop_seed_reproducible_by_observer(
        job in any::<u64>(),
        agent in any::<[u8; 32]>(),
        result_hash in any::<[u8; 32]>(),
        entropy in any::<[u8; 32]>(),
        timestamp in 0i64..4_000_000_000,
    ) {
        let input = SeedInput {
            job_id: JobId::new(job),
            agent: Address::from_bytes(agent),
            result_hash,
        };
        let chain = FixedChainContext::new(entropy, timestamp).snapshot();
        let scheduler_view = BlockEntropySeedSource.derive_seed(&input, &chain);
        let observer_view = BlockEntropySeedSource.derive_seed(&input, &chain);
        prop_assert_eq!(scheduler_view, observer_view);
    }
}
