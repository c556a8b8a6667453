//! Chainlink-style aggregator reads

use alloy_primitives::{Address, U256};
use surety_core::{ChainGateway, ChainId, ContractCall, RpcError};

use crate::abi::{is_negative_int, uint_at, word_at, CallData};

/// One round from an aggregator feed, as reported on chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRound {
    pub round_id: U256,
    /// Raw answer in the feed's own decimals; `None` when the feed reported
    /// a negative value
    pub answer: Option<U256>,
    /// Unix seconds of the round's last update; zero for an unstarted round
    pub updated_at: u64,
}

/// Read `latestRoundData()` from an aggregator.
///
/// Layout: (roundId, answer int256, startedAt, updatedAt, answeredInRound).
pub async fn latest_round(
    gateway: &dyn ChainGateway,
    chain_id: ChainId,
    feed: Address,
) -> Result<FeedRound, RpcError> {
    let data = CallData::new("latestRoundData()").build();
    let call = ContractCall::new(chain_id, Address::ZERO, feed, data);
    let raw = gateway.call(&call).await?;
    parse_round(&raw)
}

fn parse_round(raw: &[u8]) -> Result<FeedRound, RpcError> {
    let round_id = uint_at(raw, 0)?;
    let answer_word = word_at(raw, 1)?;
    let updated_at = uint_at(raw, 3)?;

    let answer = if is_negative_int(&answer_word) {
        None
    } else {
        Some(U256::from_be_bytes(answer_word))
    };

    let updated_at = u64::try_from(updated_at)
        .map_err(|_| RpcError::ParseError("updatedAt exceeds u64".into()))?;

    Ok(FeedRound {
        round_id,
        answer,
        updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_payload(round_id: u64, answer: U256, updated_at: u64) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&U256::from(round_id).to_be_bytes::<32>());
        data.extend_from_slice(&answer.to_be_bytes::<32>());
        data.extend_from_slice(&U256::from(updated_at).to_be_bytes::<32>());
        data.extend_from_slice(&U256::from(updated_at).to_be_bytes::<32>());
        data.extend_from_slice(&U256::from(round_id).to_be_bytes::<32>());
        data
    }

    #[test]
    fn test_parse_round() {
        // ETH at $3,421.50 in 8-decimal feed units
        let raw = round_payload(100, U256::from(342_150_000_000u64), 1_700_000_000);
        let round = parse_round(&raw).unwrap();
        assert_eq!(round.round_id, U256::from(100u64));
        assert_eq!(round.answer, Some(U256::from(342_150_000_000u64)));
        assert_eq!(round.updated_at, 1_700_000_000);
    }

    #[test]
    fn test_negative_answer_is_none() {
        let mut raw = round_payload(5, U256::ZERO, 1_700_000_000);
        // Flip the answer word to a negative int256
        raw[32] = 0xff;
        let round = parse_round(&raw).unwrap();
        assert_eq!(round.answer, None);
    }

    #[test]
    fn test_short_payload_rejected() {
        assert!(parse_round(&[0u8; 64]).is_err());
    }
}
