//! Policy settings endpoints

use axum::{extract::State, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::policy::{LoanPolicy, PolicySetting},
};

use super::AuthenticatedMember;

/// Settings response
#[derive(Serialize, ToSchema)]
pub struct PolicyResponse {
    /// Raw settings rows
    pub settings: Vec<PolicySetting>,
    /// Effective loan policy after defaults
    pub effective: LoanPolicy,
}

/// Update settings request
#[derive(Deserialize, ToSchema)]
pub struct UpdatePolicyRequest {
    /// Maximum simultaneously issued books per member
    pub max_books_per_user: Option<i64>,
    /// Loan duration in days
    pub issue_duration_days: Option<i64>,
    /// Fine per day overdue
    pub fine_per_day: Option<Decimal>,
}

/// Get current policy settings
#[utoipa::path(
    get,
    path = "/settings",
    tag = "settings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current settings", body = PolicyResponse),
        (status = 403, description = "Admin privileges required")
    )
)]
pub async fn get_settings(
    State(state): State<crate::AppState>,
    AuthenticatedMember(claims): AuthenticatedMember,
) -> AppResult<Json<PolicyResponse>> {
    claims.require_admin()?;

    let settings = state.services.policy.get_settings().await?;
    Ok(Json(settings))
}

/// Update policy settings
#[utoipa::path(
    put,
    path = "/settings",
    tag = "settings",
    security(("bearer_auth" = [])),
    request_body = UpdatePolicyRequest,
    responses(
        (status = 200, description = "Settings updated", body = PolicyResponse),
        (status = 400, description = "Invalid value"),
        (status = 403, description = "Admin privileges required")
    )
)]
pub async fn update_settings(
    State(state): State<crate::AppState>,
    AuthenticatedMember(claims): AuthenticatedMember,
    Json(request): Json<UpdatePolicyRequest>,
) -> AppResult<Json<PolicyResponse>> {
    claims.require_admin()?;

    let settings = state.services.policy.update_settings(request).await?;
    Ok(Json(settings))
}
