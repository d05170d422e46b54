//! Loan policy settings

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Setting keys consulted by the loan workflow
pub const MAX_BOOKS_PER_MEMBER: &str = "max_books_per_user";
pub const ISSUE_DURATION_DAYS: &str = "issue_duration_days";
pub const FINE_PER_DAY: &str = "fine_per_day";

/// Raw key/value setting row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PolicySetting {
    pub key: String,
    pub value: String,
}

/// Loan policy consulted by the workflow engine.
///
/// Built from the settings store at the moment of each transition so that
/// policy changes apply prospectively only. Unparseable or missing values
/// fall back to the documented defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LoanPolicy {
    /// Maximum simultaneously issued books per member (default 3)
    pub max_books_per_member: i64,
    /// Loan duration in whole days (default 14)
    pub issue_duration_days: i64,
    /// Fine per day overdue (default 2.00)
    pub fine_per_day: Decimal,
}

impl Default for LoanPolicy {
    fn default() -> Self {
        Self {
            max_books_per_member: 3,
            issue_duration_days: 14,
            fine_per_day: Decimal::new(200, 2),
        }
    }
}

impl LoanPolicy {
    /// Build a policy from raw settings rows, falling back to defaults for
    /// missing or unparseable values.
    pub fn from_settings<'a, I>(settings: I) -> Self
    where
        I: IntoIterator<Item = &'a PolicySetting>,
    {
        let mut policy = LoanPolicy::default();
        for setting in settings {
            match setting.key.as_str() {
                MAX_BOOKS_PER_MEMBER => {
                    if let Ok(v) = setting.value.trim().parse::<i64>() {
                        if v >= 0 {
                            policy.max_books_per_member = v;
                        }
                    }
                }
                ISSUE_DURATION_DAYS => {
                    if let Ok(v) = setting.value.trim().parse::<i64>() {
                        if v > 0 {
                            policy.issue_duration_days = v;
                        }
                    }
                }
                FINE_PER_DAY => {
                    if let Ok(v) = setting.value.trim().parse::<Decimal>() {
                        if v >= Decimal::ZERO {
                            policy.fine_per_day = v;
                        }
                    }
                }
                _ => {}
            }
        }
        policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setting(key: &str, value: &str) -> PolicySetting {
        PolicySetting {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn defaults_when_store_is_empty() {
        let policy = LoanPolicy::from_settings([]);
        assert_eq!(policy, LoanPolicy::default());
        assert_eq!(policy.max_books_per_member, 3);
        assert_eq!(policy.issue_duration_days, 14);
        assert_eq!(policy.fine_per_day, Decimal::new(200, 2));
    }

    #[test]
    fn parses_stored_values() {
        let settings = vec![
            setting(MAX_BOOKS_PER_MEMBER, "5"),
            setting(ISSUE_DURATION_DAYS, "21"),
            setting(FINE_PER_DAY, "0.50"),
        ];
        let policy = LoanPolicy::from_settings(&settings);
        assert_eq!(policy.max_books_per_member, 5);
        assert_eq!(policy.issue_duration_days, 21);
        assert_eq!(policy.fine_per_day, "0.50".parse().unwrap());
    }

    #[test]
    fn garbage_values_fall_back_to_defaults() {
        let settings = vec![
            setting(MAX_BOOKS_PER_MEMBER, "many"),
            setting(ISSUE_DURATION_DAYS, "-7"),
            setting(FINE_PER_DAY, "-1.00"),
            setting("unrelated_key", "42"),
        ];
        let policy = LoanPolicy::from_settings(&settings);
        assert_eq!(policy, LoanPolicy::default());
    }
}
