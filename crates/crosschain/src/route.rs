//! Cross-chain route resolution
//!
//! Decides whether funding a request is a local transaction or needs the
//! relay, and which chain the relay should pull from. Chain ids are always
//! passed in by the caller; nothing here reads ambient wallet state, so the
//! resolver stays correct when the wallet hops networks mid-flow.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use surety_core::ChainId;
use tracing::debug;

use crate::registry::TokenRegistry;

/// Inputs for route resolution, all taken from the request and the wallet
/// at the moment of the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteQuery {
    pub collateral_token: Address,
    pub borrow_token: Address,
    /// Chain the request was recorded on
    pub origin_chain_id: ChainId,
    /// Chain the wallet is connected to right now
    pub connected_chain_id: ChainId,
    /// Overrides the connected chain as execution target when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_target: Option<ChainId>,
}

/// Where a funding transaction executes and, if cross-chain, where the
/// relay sources from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainRoute {
    /// Relay source; `None` for same-chain routes
    pub source_chain_id: Option<ChainId>,
    pub target_chain_id: ChainId,
    pub is_cross_chain: bool,
}

/// Resolve the funding route for a request.
///
/// A request is cross-chain when its recorded origin differs from the
/// target chain, or when either token address is unknown to the target
/// chain's registry. The source chain is picked by priority: the borrow
/// asset's home chain when the borrow asset is foreign to the target, then
/// the collateral asset's home chain, then the recorded origin. A relay may
/// already have re-mapped one of the two addresses onto the target chain,
/// so a single membership check is not conclusive; walking both tokens and
/// then the origin avoids false negatives.
pub fn resolve_route(registry: &TokenRegistry, query: &RouteQuery) -> ChainRoute {
    let target = query.explicit_target.unwrap_or(query.connected_chain_id);

    let borrow_local = registry.contains(target, query.borrow_token);
    let collateral_local = registry.contains(target, query.collateral_token);
    let origin_matches = query.origin_chain_id == target;

    if borrow_local && collateral_local && origin_matches {
        return ChainRoute {
            source_chain_id: None,
            target_chain_id: target,
            is_cross_chain: false,
        };
    }

    let mut source = None;
    if !borrow_local {
        source = home_chain(registry, query.borrow_token, query.origin_chain_id, target);
    }
    if source.is_none() && !collateral_local {
        source = home_chain(registry, query.collateral_token, query.origin_chain_id, target);
    }
    let source = source.unwrap_or(query.origin_chain_id);

    let route = ChainRoute {
        source_chain_id: Some(source),
        target_chain_id: target,
        is_cross_chain: true,
    };
    debug!(
        source = %source,
        target = %target,
        borrow_local,
        collateral_local,
        "resolved cross-chain route"
    );
    route
}

/// The chain a token address belongs to, excluding the target. Prefers the
/// request's origin when the address is registered on several chains.
fn home_chain(
    registry: &TokenRegistry,
    token: Address,
    origin: ChainId,
    target: ChainId,
) -> Option<ChainId> {
    let candidates = registry.chains_with(token);
    if candidates.contains(&origin) && origin != target {
        return Some(origin);
    }
    candidates.into_iter().find(|&c| c != target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TokenIdentity;
    use alloy_primitives::address;

    const POLYGON: ChainId = ChainId::new(137);
    const BASE: ChainId = ChainId::new(8453);
    const ETHEREUM: ChainId = ChainId::new(1);

    const USDC_POLYGON: Address = address!("3c499c542cef5e3811e1192ce70d8cc03d5c3359");
    const USDC_BASE: Address = address!("833589fcd6edb6e08f4c7c32d4f71b54bda02913");
    const WETH_BASE: Address = address!("4200000000000000000000000000000000000006");
    const WETH_ETHEREUM: Address = address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");

    fn query(
        collateral: Address,
        borrow: Address,
        origin: ChainId,
        connected: ChainId,
    ) -> RouteQuery {
        RouteQuery {
            collateral_token: collateral,
            borrow_token: borrow,
            origin_chain_id: origin,
            connected_chain_id: connected,
            explicit_target: None,
        }
    }

    #[test]
    fn test_same_chain_route_has_no_source() {
        let registry = TokenRegistry::builtin();
        let route = resolve_route(&registry, &query(WETH_BASE, USDC_BASE, BASE, BASE));
        assert!(!route.is_cross_chain);
        assert_eq!(route.source_chain_id, None);
        assert_eq!(route.target_chain_id, BASE);
    }

    #[test]
    fn test_foreign_borrow_token_sources_from_its_home() {
        // Request recorded on Polygon, wallet on Base. The collateral has
        // already been re-mapped to a Base address but the borrow token is
        // still the Polygon USDC address.
        let registry = TokenRegistry::builtin();
        let route = resolve_route(&registry, &query(WETH_BASE, USDC_POLYGON, POLYGON, BASE));
        assert!(route.is_cross_chain);
        assert_eq!(route.source_chain_id, Some(POLYGON));
        assert_eq!(route.target_chain_id, BASE);
    }

    #[test]
    fn test_borrow_priority_beats_collateral_and_origin() {
        // Borrow token only exists on Ethereum; collateral is foreign too,
        // with Polygon as its home. The borrow leg decides.
        let registry = TokenRegistry::builtin();
        let route = resolve_route(
            &registry,
            &query(USDC_POLYGON, WETH_ETHEREUM, POLYGON, BASE),
        );
        assert!(route.is_cross_chain);
        assert_eq!(route.source_chain_id, Some(ETHEREUM));
    }

    #[test]
    fn test_collateral_fallback_when_borrow_is_local() {
        let registry = TokenRegistry::builtin();
        let route = resolve_route(&registry, &query(USDC_POLYGON, USDC_BASE, POLYGON, BASE));
        assert!(route.is_cross_chain);
        assert_eq!(route.source_chain_id, Some(POLYGON));
    }

    #[test]
    fn test_origin_mismatch_alone_is_cross_chain() {
        // Both tokens resolve locally on the target; only the recorded
        // origin disagrees. Falls through to the origin chain as source.
        let registry = TokenRegistry::builtin();
        let route = resolve_route(&registry, &query(WETH_BASE, USDC_BASE, POLYGON, BASE));
        assert!(route.is_cross_chain);
        assert_eq!(route.source_chain_id, Some(POLYGON));
    }

    #[test]
    fn test_explicit_target_overrides_connected_chain() {
        let registry = TokenRegistry::builtin();
        let mut q = query(WETH_BASE, USDC_BASE, BASE, POLYGON);
        q.explicit_target = Some(BASE);
        let route = resolve_route(&registry, &q);
        assert!(!route.is_cross_chain);
        assert_eq!(route.target_chain_id, BASE);
    }

    #[test]
    fn test_unknown_everywhere_falls_back_to_origin() {
        let registry = TokenRegistry::builtin();
        let unknown = address!("00000000000000000000000000000000000000aa");
        let route = resolve_route(&registry, &query(unknown, unknown, POLYGON, BASE));
        assert!(route.is_cross_chain);
        assert_eq!(route.source_chain_id, Some(POLYGON));
    }

    #[test]
    fn test_registry_gap_on_same_chain_counts_as_cross() {
        // Wallet and request agree on the chain, but the borrow token is
        // not in that chain's registry. Treated as cross-chain with the
        // token's actual home as source.
        let mut registry = TokenRegistry::empty();
        registry
            .insert(TokenIdentity {
                symbol: "WETH".to_string(),
                chain_id: BASE,
                address: WETH_BASE,
                decimals: 18,
            })
            .unwrap();
        registry
            .insert(TokenIdentity {
                symbol: "USDC".to_string(),
                chain_id: POLYGON,
                address: USDC_POLYGON,
                decimals: 6,
            })
            .unwrap();

        let route = resolve_route(&registry, &query(WETH_BASE, USDC_POLYGON, BASE, BASE));
        assert!(route.is_cross_chain);
        assert_eq!(route.source_chain_id, Some(POLYGON));
    }
}
