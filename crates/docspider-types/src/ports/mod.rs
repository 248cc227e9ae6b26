//! Backend-agnostic traits ("ports", hexagonal-architecture style) that let
//! `docspider-core` depend on an interface rather than a concrete adapter.

pub mod bus;
pub mod rate_limiter;

pub use bus::{BusProducer, PublishError};
pub use rate_limiter::{HostStats, PerHostRateLimiter};
