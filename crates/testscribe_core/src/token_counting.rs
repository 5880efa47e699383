//! Token estimates for admission control and actual usage for reconciliation.

use serde::{Deserialize, Serialize};

/// Rough token count of a prompt: one token per four characters, rounded up.
///
/// Admission control only needs a pessimistic order of magnitude; the real
/// count arrives with the response.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4).max(1)
}

/// Estimated cost of one pending call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_getters::Getters)]
pub struct RequestBudget {
    /// Tokens the call is expected to consume
    estimated_tokens: u64,
}

impl RequestBudget {
    /// Budget with an explicit estimate.
    pub fn new(estimated_tokens: u64) -> Self {
        Self { estimated_tokens }
    }

    /// Budget for a system instruction and user prompt.
    pub fn for_prompt(system: &str, prompt: &str) -> Self {
        Self::new(estimate_tokens(system) + estimate_tokens(prompt))
    }

    /// Tokens to commit once the call returned: the provider's count when it
    /// reported one, the estimate otherwise.
    pub fn reconcile(&self, usage: Option<&TokenUsage>) -> u64 {
        usage
            .map(|usage| usage.total_tokens)
            .filter(|total| *total > 0)
            .unwrap_or(self.estimated_tokens)
    }
}

/// Token usage reported by a provider for one call.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, derive_getters::Getters,
)]
pub struct TokenUsage {
    /// Tokens in the prompt
    prompt_tokens: u64,
    /// Tokens in the completion
    completion_tokens: u64,
    /// Total tokens billed
    total_tokens: u64,
}

impl TokenUsage {
    /// Usage from prompt and completion counts.
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    /// Usage where the provider only reports a total.
    pub fn total(total_tokens: u64) -> Self {
        Self {
            total_tokens,
            ..Self::default()
        }
    }
}
