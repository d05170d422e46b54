//! Member management endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::member::{Member, MemberQuery, MemberShort, MemberStatus, UpdateProfile},
};

use super::{auth::MemberInfo, AuthenticatedMember, PaginatedResponse};

/// Status change request
#[derive(Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// New status (active or inactive)
    pub status: MemberStatus,
}

/// List members with search and pagination
#[utoipa::path(
    get,
    path = "/members",
    tag = "members",
    security(("bearer_auth" = [])),
    params(
        ("name" = Option<String>, Query, description = "Search by name"),
        ("email" = Option<String>, Query, description = "Search by email"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("page" = Option<i64>, Query, description = "Page number"),
        ("per_page" = Option<i64>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "List of members", body = PaginatedResponse<MemberShort>),
        (status = 403, description = "Admin privileges required")
    )
)]
pub async fn list_members(
    State(state): State<crate::AppState>,
    AuthenticatedMember(claims): AuthenticatedMember,
    Query(query): Query<MemberQuery>,
) -> AppResult<Json<PaginatedResponse<MemberShort>>> {
    claims.require_admin()?;

    let (members, total) = state.services.members.search(&query).await?;

    Ok(Json(PaginatedResponse {
        items: members,
        total,
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    }))
}

/// Get member details by ID
#[utoipa::path(
    get,
    path = "/members/{id}",
    tag = "members",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Member ID")
    ),
    responses(
        (status = 200, description = "Member details", body = MemberInfo),
        (status = 404, description = "Member not found")
    )
)]
pub async fn get_member(
    State(state): State<crate::AppState>,
    AuthenticatedMember(claims): AuthenticatedMember,
    Path(id): Path<i32>,
) -> AppResult<Json<MemberInfo>> {
    claims.require_self_or_admin(id)?;

    let member = state.services.members.get_by_id(id).await?;
    Ok(Json(member.into()))
}

/// Update the authenticated member's profile
#[utoipa::path(
    put,
    path = "/members/me",
    tag = "members",
    security(("bearer_auth" = [])),
    request_body = UpdateProfile,
    responses(
        (status = 200, description = "Profile updated", body = MemberInfo),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn update_my_profile(
    State(state): State<crate::AppState>,
    AuthenticatedMember(claims): AuthenticatedMember,
    Json(profile): Json<UpdateProfile>,
) -> AppResult<Json<MemberInfo>> {
    let member: Member = state
        .services
        .members
        .update_profile(claims.member_id, profile)
        .await?;
    Ok(Json(member.into()))
}

/// Activate or deactivate a member
#[utoipa::path(
    put,
    path = "/members/{id}/status",
    tag = "members",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Member ID")
    ),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = MemberInfo),
        (status = 404, description = "Member not found"),
        (status = 422, description = "Member still holds issued books")
    )
)]
pub async fn update_status(
    State(state): State<crate::AppState>,
    AuthenticatedMember(claims): AuthenticatedMember,
    Path(id): Path<i32>,
    Json(request): Json<UpdateStatusRequest>,
) -> AppResult<Json<MemberInfo>> {
    claims.require_admin()?;

    let member = state.services.members.set_status(id, request.status).await?;
    Ok(Json(member.into()))
}
