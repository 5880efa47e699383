//! Built-in quota tables used when configuration names no tier.

use crate::Tier;

/// Gemini API usage tiers.
///
/// Based on [Gemini API pricing](https://ai.google.dev/pricing), Flash models.
#[cfg(feature = "gemini")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeminiTier {
    /// Free tier: 10 RPM, 250K TPM, 250 RPD
    Free,
    /// Pay-as-you-go: 360 RPM, 4M TPM, no daily limit
    PayAsYouGo,
}

#[cfg(feature = "gemini")]
impl GeminiTier {
    /// Tier from a configuration name (`free`, `payasyougo`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "free" => Some(GeminiTier::Free),
            "payasyougo" | "paid" => Some(GeminiTier::PayAsYouGo),
            _ => None,
        }
    }
}

#[cfg(feature = "gemini")]
impl Tier for GeminiTier {
    fn rpm(&self) -> Option<u32> {
        match self {
            GeminiTier::Free => Some(10),
            GeminiTier::PayAsYouGo => Some(360),
        }
    }

    fn tpm(&self) -> Option<u64> {
        match self {
            GeminiTier::Free => Some(250_000),
            GeminiTier::PayAsYouGo => Some(4_000_000),
        }
    }

    fn rpd(&self) -> Option<u32> {
        match self {
            GeminiTier::Free => Some(250),
            GeminiTier::PayAsYouGo => None,
        }
    }

    fn name(&self) -> &str {
        match self {
            GeminiTier::Free => "Free",
            GeminiTier::PayAsYouGo => "Pay-as-you-go",
        }
    }
}
