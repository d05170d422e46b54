//! Policy settings service

use rust_decimal::Decimal;

use crate::{
    api::settings::{PolicyResponse, UpdatePolicyRequest},
    error::{AppError, AppResult},
    models::policy::{LoanPolicy, FINE_PER_DAY, ISSUE_DURATION_DAYS, MAX_BOOKS_PER_MEMBER},
    repository::Repository,
};

#[derive(Clone)]
pub struct PolicyService {
    repository: Repository,
}

impl PolicyService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Current settings rows plus the effective loan policy
    pub async fn get_settings(&self) -> AppResult<PolicyResponse> {
        let settings = self.repository.settings.all().await?;
        let effective = LoanPolicy::from_settings(&settings);

        Ok(PolicyResponse {
            settings,
            effective,
        })
    }

    /// Update policy values. Changes apply to transitions performed after
    /// the update; loans already issued keep their due dates.
    pub async fn update_settings(&self, request: UpdatePolicyRequest) -> AppResult<PolicyResponse> {
        if let Some(max) = request.max_books_per_user {
            if max < 0 {
                return Err(AppError::Validation(
                    "max_books_per_user must not be negative".to_string(),
                ));
            }
            self.repository
                .settings
                .upsert(MAX_BOOKS_PER_MEMBER, &max.to_string())
                .await?;
        }

        if let Some(days) = request.issue_duration_days {
            if days <= 0 {
                return Err(AppError::Validation(
                    "issue_duration_days must be positive".to_string(),
                ));
            }
            self.repository
                .settings
                .upsert(ISSUE_DURATION_DAYS, &days.to_string())
                .await?;
        }

        if let Some(fine) = request.fine_per_day {
            if fine < Decimal::ZERO {
                return Err(AppError::Validation(
                    "fine_per_day must not be negative".to_string(),
                ));
            }
            self.repository
                .settings
                .upsert(FINE_PER_DAY, &fine.to_string())
                .await?;
        }

        tracing::info!("Loan policy settings updated");
        self.get_settings().await
    }
}
