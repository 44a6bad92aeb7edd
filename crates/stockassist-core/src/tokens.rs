//! Token estimation for outgoing chat messages.

/// Messages above this estimate are rejected.
pub const DEFAULT_TOKEN_BUDGET: usize = 500;

/// Estimates above this are shown as a warning.
pub const DEFAULT_TOKEN_WARNING: usize = 400;

/// Estimate tokens as `ceil(len / 4)`, where `len` counts UTF-16 code
/// units as the server does. Characters outside the BMP count twice.
pub fn estimate_tokens(text: &str) -> usize {
    text.encode_utf16().count().div_ceil(4)
}

/// Display level of the token counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenLevel {
    Normal,
    Warning,
    Over,
}

/// Token count with its display level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenGauge {
    pub count: usize,
    pub budget: usize,
    pub level: TokenLevel,
}

impl TokenGauge {
    /// Assess `text` against the default budget.
    pub fn assess(text: &str) -> Self {
        Self::assess_with(text, DEFAULT_TOKEN_BUDGET, DEFAULT_TOKEN_WARNING)
    }

    pub fn assess_with(text: &str, budget: usize, warning: usize) -> Self {
        let count = estimate_tokens(text);
        let level = if count > budget {
            TokenLevel::Over
        } else if count > warning {
            TokenLevel::Warning
        } else {
            TokenLevel::Normal
        };
        Self {
            count,
            budget,
            level,
        }
    }

    pub fn is_over(&self) -> bool {
        self.level == TokenLevel::Over
    }
}
