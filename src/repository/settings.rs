//! Settings repository for the policy key/value store

use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::policy::{LoanPolicy, PolicySetting, FINE_PER_DAY, ISSUE_DURATION_DAYS, MAX_BOOKS_PER_MEMBER},
};

#[derive(Clone)]
pub struct SettingsRepository {
    pool: Pool<Postgres>,
}

impl SettingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// All settings rows
    pub async fn all(&self) -> AppResult<Vec<PolicySetting>> {
        let settings = sqlx::query_as::<_, PolicySetting>(
            "SELECT key, value FROM settings ORDER BY key",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(settings)
    }

    /// Insert or replace a setting
    pub async fn upsert(&self, key: &str, value: &str) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Loan policy as currently stored. Read at the moment of each workflow
    /// transition, never cached, so policy changes apply prospectively only.
    pub async fn loan_policy(&self) -> AppResult<LoanPolicy> {
        let settings = sqlx::query_as::<_, PolicySetting>(
            "SELECT key, value FROM settings WHERE key IN ($1, $2, $3)",
        )
        .bind(MAX_BOOKS_PER_MEMBER)
        .bind(ISSUE_DURATION_DAYS)
        .bind(FINE_PER_DAY)
        .fetch_all(&self.pool)
        .await?;

        Ok(LoanPolicy::from_settings(&settings))
    }
}
