//! Input validation errors.
//!
//! Only shape violations surface as errors. Numeric degeneracies (zero
//! denominators, empty ledgers) resolve to documented sentinels inside the
//! reports, and resource limits are clamped by the engines that own them.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("invalid trade at index {index}: {reason}")]
    InvalidTrade { index: usize, reason: String },

    #[error("initial capital must be finite and non-negative, got {0}")]
    InvalidCapital(f64),

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

impl CoreError {
    pub fn parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_input() {
        let e = CoreError::InvalidTrade {
            index: 3,
            reason: "exit before entry".into(),
        };
        assert_eq!(e.to_string(), "invalid trade at index 3: exit before entry");

        let e = CoreError::parameter("confidence_level", "must lie in [50, 100]");
        assert!(e.to_string().contains("confidence_level"));
    }
}
