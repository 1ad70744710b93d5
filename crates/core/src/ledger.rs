//! Token budget arithmetic
//!
//! Pure functions over explicit arguments. Admission is the only hard gate and
//! runs before any generation request; the debit happens once the response is
//! known and may take the balance below zero.

use crate::error::GenerationError;

/// Minimum balance required to start a generation cycle.
pub const MIN_BALANCE: i64 = 10;

/// Coarse token estimate: the number of non-empty whitespace-separated words.
pub fn cost(content: &str) -> i64 {
    content.split_whitespace().count() as i64
}

/// Whether a cycle may start with the given balance.
pub fn admit(balance: i64, minimum: i64) -> bool {
    balance >= minimum
}

/// Balance after paying `cost`. Overshoot below zero is allowed.
pub fn debit(balance: i64, cost: i64) -> i64 {
    balance.saturating_sub(cost)
}

/// [`admit`] as a `Result`, carrying the numbers into the error.
pub fn check_admission(balance: i64, minimum: i64) -> Result<(), GenerationError> {
    if admit(balance, minimum) {
        Ok(())
    } else {
        Err(GenerationError::InsufficientBudget { balance, minimum })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_counts_words() {
        assert_eq!(cost("a b  c"), 3);
        assert_eq!(cost("Sure, adding a button now"), 5);
    }

    #[test]
    fn test_cost_empty_and_blank() {
        assert_eq!(cost(""), 0);
        assert_eq!(cost("   \n\t "), 0);
    }

    #[test]
    fn test_cost_ignores_leading_and_trailing_whitespace() {
        assert_eq!(cost("  hello\nworld\t "), 2);
    }

    #[test]
    fn test_admit_threshold() {
        assert!(!admit(9, MIN_BALANCE));
        assert!(admit(10, MIN_BALANCE));
        assert!(admit(100, MIN_BALANCE));
        assert!(!admit(-3, MIN_BALANCE));
    }

    #[test]
    fn test_debit_allows_overshoot() {
        assert_eq!(debit(100, 5), 95);
        assert_eq!(debit(12, 30), -18);
    }

    #[test]
    fn test_check_admission() {
        assert!(check_admission(10, 10).is_ok());
        assert_eq!(
            check_admission(5, 10),
            Err(GenerationError::InsufficientBudget {
                balance: 5,
                minimum: 10
            })
        );
    }
}
