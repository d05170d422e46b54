//! Statistics service for the admin dashboard

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::Row;

use crate::{api::stats::DashboardResponse, error::AppResult, repository::Repository};

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Dashboard counters: catalog size, membership, workflow queue depths
    /// and fines recorded so far. Read-only aggregation.
    pub async fn dashboard(&self) -> AppResult<DashboardResponse> {
        let pool = &self.repository.pool;

        let book_row = sqlx::query(
            "SELECT COUNT(*) AS titles, \
             COALESCE(SUM(quantity), 0)::bigint AS copies, \
             COALESCE(SUM(available), 0)::bigint AS available \
             FROM books",
        )
        .fetch_one(pool)
        .await?;

        let member_row = sqlx::query(
            "SELECT COUNT(*) AS total, \
             COUNT(*) FILTER (WHERE status = 'active') AS active \
             FROM members",
        )
        .fetch_one(pool)
        .await?;

        let loan_row = sqlx::query(
            "SELECT COUNT(*) FILTER (WHERE status = 'pending') AS pending, \
             COUNT(*) FILTER (WHERE status = 'issued') AS issued, \
             COUNT(*) FILTER (WHERE status = 'issued' AND due_at < $1) AS overdue \
             FROM loans",
        )
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;

        let fines: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(fine), 0) FROM loans WHERE status = 'returned'",
        )
        .fetch_one(pool)
        .await?;

        Ok(DashboardResponse {
            total_books: book_row.get("titles"),
            total_copies: book_row.get("copies"),
            available_copies: book_row.get("available"),
            total_members: member_row.get("total"),
            active_members: member_row.get("active"),
            pending_requests: loan_row.get("pending"),
            issued_loans: loan_row.get("issued"),
            overdue_loans: loan_row.get("overdue"),
            fines_recorded: fines,
        })
    }
}
