//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, health, loans, members, settings, stats};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Athenaeum API",
        version = "1.0.0",
        description = "Library Management System REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::me,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Members
        members::list_members,
        members::get_member,
        members::update_my_profile,
        members::update_status,
        // Loans
        loans::submit_request,
        loans::approve_request,
        loans::reject_request,
        loans::cancel_request,
        loans::issue_book,
        loans::return_book,
        loans::list_loans,
        loans::list_overdue,
        loans::member_loans,
        // Stats
        stats::dashboard,
        // Settings
        settings::get_settings,
        settings::update_settings,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            auth::MemberInfo,
            // Books
            crate::models::book::Book,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            // Members
            crate::models::member::MemberShort,
            crate::models::member::RegisterMember,
            crate::models::member::UpdateProfile,
            members::UpdateStatusRequest,
            // Loans
            crate::models::loan::Loan,
            crate::models::loan::LoanDetails,
            crate::models::loan::LoanStatus,
            loans::SubmitRequest,
            loans::ApproveRequest,
            loans::RejectRequest,
            loans::IssueRequest,
            loans::ReturnRequest,
            // Stats
            stats::DashboardResponse,
            // Settings
            crate::models::policy::PolicySetting,
            crate::models::policy::LoanPolicy,
            settings::PolicyResponse,
            settings::UpdatePolicyRequest,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "books", description = "Catalog management"),
        (name = "members", description = "Member management"),
        (name = "loans", description = "Loan workflow"),
        (name = "stats", description = "Statistics"),
        (name = "settings", description = "Loan policy settings")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
