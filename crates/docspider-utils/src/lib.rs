//! Shared utilities for the docspider crawler core.
//!
//! - **Rate limiting**: per-domain token bucket (`rate_limit`)
//! - **Time**: timestamp conversions (`time`)
//! - **Error**: common error re-exports (`error`)

pub mod error;
pub mod rate_limit;
pub mod time;

pub use error::Result;
pub use rate_limit::{spawn_janitor, DomainRateLimiter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limiter_constructs() {
        let _ = DomainRateLimiter::new(2.0, 5);
    }
}
