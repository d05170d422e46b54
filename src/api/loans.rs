//! Loan workflow endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::loan::{Loan, LoanDetails, LoanQuery},
};

use super::{AuthenticatedMember, PaginatedResponse};

/// Submit request payload
#[derive(Deserialize, ToSchema)]
pub struct SubmitRequest {
    /// Book to request
    pub book_id: i32,
}

/// Approve request payload
#[derive(Deserialize, ToSchema)]
pub struct ApproveRequest {
    /// Optional notes recorded with the approval
    pub notes: Option<String>,
}

/// Reject request payload
#[derive(Deserialize, ToSchema)]
pub struct RejectRequest {
    /// Reason for the rejection (required, non-empty)
    pub reason: String,
}

/// Direct issue payload
#[derive(Deserialize, ToSchema)]
pub struct IssueRequest {
    /// Member receiving the book
    pub member_id: i32,
    /// Book to issue
    pub book_id: i32,
    /// Optional notes recorded with the issuance
    pub notes: Option<String>,
}

/// Return payload
#[derive(Deserialize, ToSchema, Default)]
pub struct ReturnRequest {
    /// Replace the computed fine (waiver or manual adjustment)
    pub fine_override: Option<Decimal>,
}

/// A member requests a book
#[utoipa::path(
    post,
    path = "/loans/requests",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = SubmitRequest,
    responses(
        (status = 201, description = "Request submitted", body = Loan),
        (status = 404, description = "Book not found"),
        (status = 422, description = "Member is not active")
    )
)]
pub async fn submit_request(
    State(state): State<crate::AppState>,
    AuthenticatedMember(claims): AuthenticatedMember,
    Json(request): Json<SubmitRequest>,
) -> AppResult<(StatusCode, Json<Loan>)> {
    let loan = state
        .services
        .workflow
        .submit_request(claims.member_id, request.book_id)
        .await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Approve a pending request and issue the book
#[utoipa::path(
    post,
    path = "/loans/requests/{id}/approve",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body = ApproveRequest,
    responses(
        (status = 200, description = "Request approved, book issued", body = Loan),
        (status = 404, description = "Loan not found"),
        (status = 422, description = "Book unavailable, limit reached, duplicate loan or wrong state")
    )
)]
pub async fn approve_request(
    State(state): State<crate::AppState>,
    AuthenticatedMember(claims): AuthenticatedMember,
    Path(id): Path<i32>,
    Json(request): Json<ApproveRequest>,
) -> AppResult<Json<Loan>> {
    claims.require_admin()?;

    let loan = state
        .services
        .workflow
        .approve_request(id, claims.member_id, request.notes.as_deref())
        .await?;
    Ok(Json(loan))
}

/// Reject a pending request
#[utoipa::path(
    post,
    path = "/loans/requests/{id}/reject",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body = RejectRequest,
    responses(
        (status = 200, description = "Request rejected", body = Loan),
        (status = 400, description = "Empty reason"),
        (status = 404, description = "Loan not found"),
        (status = 422, description = "Loan is not pending")
    )
)]
pub async fn reject_request(
    State(state): State<crate::AppState>,
    AuthenticatedMember(claims): AuthenticatedMember,
    Path(id): Path<i32>,
    Json(request): Json<RejectRequest>,
) -> AppResult<Json<Loan>> {
    claims.require_admin()?;

    let loan = state
        .services
        .workflow
        .reject_request(id, claims.member_id, &request.reason)
        .await?;
    Ok(Json(loan))
}

/// Cancel one's own pending request
#[utoipa::path(
    post,
    path = "/loans/requests/{id}/cancel",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Request cancelled", body = Loan),
        (status = 403, description = "Loan belongs to another member"),
        (status = 404, description = "Loan not found"),
        (status = 422, description = "Loan is not pending")
    )
)]
pub async fn cancel_request(
    State(state): State<crate::AppState>,
    AuthenticatedMember(claims): AuthenticatedMember,
    Path(id): Path<i32>,
) -> AppResult<Json<Loan>> {
    let loan = state
        .services
        .workflow
        .cancel_request(id, claims.member_id)
        .await?;
    Ok(Json(loan))
}

/// Issue a book directly, bypassing the request step
#[utoipa::path(
    post,
    path = "/loans/issue",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = IssueRequest,
    responses(
        (status = 201, description = "Book issued", body = Loan),
        (status = 404, description = "Member or book not found"),
        (status = 422, description = "Book unavailable, limit reached or duplicate loan")
    )
)]
pub async fn issue_book(
    State(state): State<crate::AppState>,
    AuthenticatedMember(claims): AuthenticatedMember,
    Json(request): Json<IssueRequest>,
) -> AppResult<(StatusCode, Json<Loan>)> {
    claims.require_admin()?;

    let loan = state
        .services
        .workflow
        .issue_book(request.member_id, request.book_id, claims.member_id, request.notes.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Return an issued book
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body = ReturnRequest,
    responses(
        (status = 200, description = "Book returned, fine recorded", body = Loan),
        (status = 404, description = "Loan not found"),
        (status = 422, description = "Loan is not issued")
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    AuthenticatedMember(claims): AuthenticatedMember,
    Path(id): Path<i32>,
    Json(request): Json<ReturnRequest>,
) -> AppResult<Json<Loan>> {
    claims.require_admin()?;

    let loan = state
        .services
        .workflow
        .return_book(id, request.fine_override)
        .await?;
    Ok(Json(loan))
}

/// List loans with filters
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("member_id" = Option<i32>, Query, description = "Filter by member"),
        ("book_id" = Option<i32>, Query, description = "Filter by book"),
        ("page" = Option<i64>, Query, description = "Page number"),
        ("per_page" = Option<i64>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "List of loans", body = PaginatedResponse<LoanDetails>),
        (status = 403, description = "Admin privileges required")
    )
)]
pub async fn list_loans(
    State(state): State<crate::AppState>,
    AuthenticatedMember(claims): AuthenticatedMember,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<PaginatedResponse<LoanDetails>>> {
    claims.require_admin()?;

    let (loans, total) = state.services.workflow.list_loans(&query).await?;

    Ok(Json(PaginatedResponse {
        items: loans,
        total,
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    }))
}

/// List overdue loans
#[utoipa::path(
    get,
    path = "/loans/overdue",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Issued loans past their due date", body = Vec<LoanDetails>),
        (status = 403, description = "Admin privileges required")
    )
)]
pub async fn list_overdue(
    State(state): State<crate::AppState>,
    AuthenticatedMember(claims): AuthenticatedMember,
) -> AppResult<Json<Vec<LoanDetails>>> {
    claims.require_admin()?;

    let loans = state.services.workflow.overdue_loans().await?;
    Ok(Json(loans))
}

/// Get loans for a specific member
#[utoipa::path(
    get,
    path = "/members/{id}/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Member ID")
    ),
    responses(
        (status = 200, description = "Member's loans", body = Vec<LoanDetails>),
        (status = 404, description = "Member not found")
    )
)]
pub async fn member_loans(
    State(state): State<crate::AppState>,
    AuthenticatedMember(claims): AuthenticatedMember,
    Path(member_id): Path<i32>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    claims.require_self_or_admin(member_id)?;

    let loans = state.services.workflow.member_loans(member_id).await?;
    Ok(Json(loans))
}
