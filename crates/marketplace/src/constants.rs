//! Deployments and protocol parameters

use alloy_primitives::{address, Address};
use surety_core::{types::Bps, ChainId};

/// Marketplace contract deployments. Configuration can override per chain.
const DEPLOYMENTS: [(u64, Address); 5] = [
    (137, address!("8d21e6a94f0b35c7d1e80f2b6a9c5d413f7a2b90")),
    (8453, address!("5c3a1f9e7b42d8c06aa34b019e2f5d7a8c416c2e")),
    (11155111, address!("3f8e2c5a9d14b7e6f205c8a3b1d9e4f762a0c158")),
    (84532, address!("94b7c2e1f5a3d8062c49e7b5a1f0d3c8e6b2a472")),
    (80002, address!("6a1d4f8c2e9b50371d6c3a8f0e5b2d947c1e8a53")),
];

/// Built-in marketplace deployment for a chain, if any.
pub fn market_deployment(chain_id: ChainId) -> Option<Address> {
    DEPLOYMENTS
        .iter()
        .find(|(chain, _)| *chain == chain_id.as_u64())
        .map(|(_, address)| *address)
}

/// Loan durations the contract publishes LTV policies for, in days.
pub const DURATION_BUCKETS_DAYS: [u32; 5] = [7, 14, 30, 90, 180];

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Interest is flat for the whole term; anything above 100% is a typo.
pub const MAX_INTEREST_RATE_BPS: Bps = 10_000;

/// The policy bucket a requested duration falls into: the smallest bucket
/// long enough to cover it. `None` for zero or beyond the longest bucket.
pub fn duration_bucket_days(days: u32) -> Option<u32> {
    if days == 0 {
        return None;
    }
    DURATION_BUCKETS_DAYS.iter().copied().find(|b| *b >= days)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deployments_cover_testnets() {
        assert!(market_deployment(ChainId::new(84532)).is_some());
        assert!(market_deployment(ChainId::new(11155111)).is_some());
        assert!(market_deployment(ChainId::new(1)).is_none());
    }

    #[test]
    fn test_duration_buckets_round_up() {
        assert_eq!(duration_bucket_days(1), Some(7));
        assert_eq!(duration_bucket_days(7), Some(7));
        assert_eq!(duration_bucket_days(8), Some(14));
        assert_eq!(duration_bucket_days(45), Some(90));
        assert_eq!(duration_bucket_days(180), Some(180));
        assert_eq!(duration_bucket_days(181), None);
        assert_eq!(duration_bucket_days(0), None);
    }
}
