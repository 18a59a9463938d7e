//! Static-resource caching: a generation-named response cache, the
//! URL-to-strategy router, and the install/activate lifecycle that keeps
//! exactly one generation alive.

pub mod lifecycle;
pub mod response_cache;
pub mod router;

pub use lifecycle::CacheLifecycle;
pub use response_cache::ResponseCache;
pub use router::{AssetRule, Strategy, StrategyRouter};
