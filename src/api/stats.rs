//! Statistics endpoints

use axum::{extract::State, Json};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppResult;

use super::AuthenticatedMember;

/// Admin dashboard counters
#[derive(Serialize, ToSchema)]
pub struct DashboardResponse {
    /// Distinct titles in the catalog
    pub total_books: i64,
    /// Total copies across all titles
    pub total_copies: i64,
    /// Copies currently available
    pub available_copies: i64,
    /// Registered members
    pub total_members: i64,
    /// Active members
    pub active_members: i64,
    /// Requests awaiting a decision
    pub pending_requests: i64,
    /// Books currently issued
    pub issued_loans: i64,
    /// Issued loans past their due date
    pub overdue_loans: i64,
    /// Total fines recorded on returned loans
    pub fines_recorded: Decimal,
}

/// Get dashboard statistics
#[utoipa::path(
    get,
    path = "/stats",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard counters", body = DashboardResponse),
        (status = 403, description = "Admin privileges required")
    )
)]
pub async fn dashboard(
    State(state): State<crate::AppState>,
    AuthenticatedMember(claims): AuthenticatedMember,
) -> AppResult<Json<DashboardResponse>> {
    claims.require_admin()?;

    let stats = state.services.stats.dashboard().await?;
    Ok(Json(stats))
}
