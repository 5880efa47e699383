//! Tier trait for provider quota tables.

use crate::RateLimits;

/// Published quota of an API tier.
///
/// Every method returns `None` when the dimension is unlimited.
///
/// # Example
///
/// ```
/// use testscribe_rate_limit::Tier;
///
/// struct Trial;
///
/// impl Tier for Trial {
///     fn rpm(&self) -> Option<u32> { Some(5) }
///     fn tpm(&self) -> Option<u64> { None }
///     fn rpd(&self) -> Option<u32> { Some(100) }
///     fn name(&self) -> &str { "Trial" }
/// }
///
/// assert_eq!(*Trial.limits().requests_per_day(), Some(100));
/// ```
pub trait Tier: Send + Sync {
    /// Requests per minute limit.
    fn rpm(&self) -> Option<u32>;

    /// Tokens per minute limit.
    fn tpm(&self) -> Option<u64>;

    /// Requests per day limit.
    fn rpd(&self) -> Option<u32>;

    /// Tier name for logs.
    fn name(&self) -> &str;

    /// The three dimensions as rate limits.
    fn limits(&self) -> RateLimits {
        RateLimits::new(self.rpm(), self.tpm(), self.rpd())
    }
}
