//! Token registries and cross-chain route resolution
//!
//! A loan's collateral and funding legs can live on different chains. This
//! crate knows which token addresses exist where and derives, for any
//! request, whether funding it is a local or a cross-chain affair and which
//! chain the relay should treat as the source.

pub mod registry;
pub mod route;

pub use registry::{RegistryError, TokenIdentity, TokenRegistry};
pub use route::{resolve_route, ChainRoute, RouteQuery};
