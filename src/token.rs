//! Rough token estimates for prompt budgeting.
//!
//! Nothing here is exact; the numbers only feed stats and the context-window
//! warning emitted before the model call.

const CHARS_PER_TOKEN: usize = 4;
const WORD_MULTIPLIER: f64 = 1.3;
const SPECIAL_DIVISOR: usize = 10;

/// Heuristic used to estimate prompt tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenizerKind {
    /// About four characters per token
    #[default]
    Simple,
    /// Averages word and character estimates, with a penalty for punctuation
    Enhanced,
}

impl TokenizerKind {
    /// Estimates the number of tokens in `text`.
    #[must_use]
    pub fn estimate(self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }

        let chars = text.chars().count();
        match self {
            Self::Simple => chars.div_ceil(CHARS_PER_TOKEN).max(1),
            Self::Enhanced => {
                let words = text.split_whitespace().count();
                let special = text
                    .chars()
                    .filter(|c| !c.is_alphanumeric() && !c.is_whitespace())
                    .count();

                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
                let word_estimate = (words as f64 * WORD_MULTIPLIER) as usize;
                let base = word_estimate.saturating_add(chars / CHARS_PER_TOKEN) / 2;

                base.saturating_add(special / SPECIAL_DIVISOR).max(1)
            }
        }
    }
}

/// Estimated prompt size compared against a context window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    /// Estimated prompt tokens
    pub prompt_tokens: usize,
    /// Tokens reserved for the model's answer
    pub output_tokens: usize,
    /// Context window of the model
    pub context_window: usize,
}

impl Budget {
    /// Returns true if prompt plus answer may not fit the window.
    #[must_use]
    pub const fn exceeds_window(&self) -> bool {
        self.prompt_tokens.saturating_add(self.output_tokens) > self.context_window
    }
}
