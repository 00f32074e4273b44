//! Token usage snapshots.

use serde::{Deserialize, Serialize};

/// Token usage reported for one request.
///
/// Usage events within a single stream are snapshots, not deltas: whichever
/// snapshot arrives last wins. Multiple differing snapshots in one stream
/// have not been observed from the supported providers, so last-write-wins is
/// an assumption rather than a guaranteed upstream invariant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt/input side.
    pub prompt_tokens: u64,
    /// Tokens in the completion/output side.
    pub completion_tokens: u64,
    /// Total tokens (prompt + completion).
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Create a usage snapshot, deriving the total.
    #[must_use]
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    /// Whether no tokens were recorded at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_tokens == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_is_derived() {
        let usage = TokenUsage::new(25, 5);
        assert_eq!(usage.total_tokens, 30);
        assert!(!usage.is_empty());
    }

    #[test]
    fn test_default_is_empty() {
        assert!(TokenUsage::default().is_empty());
    }
}
