//! Loans repository: the transactional side of the workflow engine
//!
//! Every transition runs inside a single transaction. The loan row (and the
//! book row whenever stock moves) is locked with `SELECT ... FOR UPDATE`, the
//! preconditions are re-checked against the locked state, then loan and book
//! are mutated together. Concurrent transitions against the same book or loan
//! therefore serialize, and the later one fails its precondition check
//! instead of over-decrementing stock or double-returning.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        loan::{due_date, fine_due, Loan, LoanAction, LoanQuery, LoanStatus},
        policy::LoanPolicy,
    },
};

/// Loan row joined with display names, before overdue/fine derivation
#[derive(Debug, Clone)]
pub struct LoanJoined {
    pub loan: Loan,
    pub book_title: String,
    pub member_name: String,
}

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

const SELECT_LOAN: &str = "SELECT id, member_id, book_id, status, requested_at, decided_by, notes, \
     rejection_reason, issued_at, due_at, returned_at, fine FROM loans";

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(&format!("{} WHERE id = $1", SELECT_LOAN))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::LoanNotFound(id))
    }

    /// Lock a loan row for the duration of the transaction
    async fn lock_loan(conn: &mut PgConnection, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(&format!("{} WHERE id = $1 FOR UPDATE", SELECT_LOAN))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(AppError::LoanNotFound(id))
    }

    /// Lock a book row and return (available, quantity)
    async fn lock_book(conn: &mut PgConnection, book_id: i32) -> AppResult<(i32, i32)> {
        let row = sqlx::query("SELECT available, quantity FROM books WHERE id = $1 FOR UPDATE")
            .bind(book_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(AppError::BookNotFound(book_id))?;
        Ok((row.get("available"), row.get("quantity")))
    }

    /// Issue preconditions, checked against locked state: availability,
    /// per-member limit, no duplicate issued loan for the same pair.
    async fn check_issue_preconditions(
        conn: &mut PgConnection,
        member_id: i32,
        book_id: i32,
        available: i32,
        policy: &LoanPolicy,
    ) -> AppResult<()> {
        if available <= 0 {
            return Err(AppError::BookUnavailable(book_id));
        }

        let issued: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE member_id = $1 AND status = 'issued'",
        )
        .bind(member_id)
        .fetch_one(&mut *conn)
        .await?;

        if issued >= policy.max_books_per_member {
            return Err(AppError::LoanLimitReached {
                member_id,
                current: issued,
                max: policy.max_books_per_member,
            });
        }

        let duplicate: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM loans WHERE member_id = $1 AND book_id = $2 AND status = 'issued')",
        )
        .bind(member_id)
        .bind(book_id)
        .fetch_one(&mut *conn)
        .await?;

        if duplicate {
            return Err(AppError::DuplicateLoan { member_id, book_id });
        }

        Ok(())
    }

    /// Create a pending request. The member/book existence and member
    /// eligibility checks belong to the service layer; the ledger row is
    /// inserted here.
    pub async fn create_pending(&self, member_id: i32, book_id: i32) -> AppResult<Loan> {
        let now = Utc::now();

        let loan = sqlx::query_as::<_, Loan>(&format!(
            "INSERT INTO loans (member_id, book_id, status, requested_at) \
             VALUES ($1, $2, 'pending', $3) \
             RETURNING {}",
            Self::returning_columns()
        ))
        .bind(member_id)
        .bind(book_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(loan)
    }

    /// Approve a pending request: the loan becomes issued and one unit of
    /// book stock is taken, atomically.
    pub async fn approve(
        &self,
        loan_id: i32,
        admin_id: i32,
        notes: Option<&str>,
        policy: &LoanPolicy,
    ) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let loan = Self::lock_loan(&mut tx, loan_id).await?;
        loan.status.apply(LoanAction::Approve)?;

        let (available, _) = Self::lock_book(&mut tx, loan.book_id).await?;
        Self::check_issue_preconditions(&mut tx, loan.member_id, loan.book_id, available, policy)
            .await?;

        let now = Utc::now();
        let due = due_date(now, policy.issue_duration_days);

        let updated = sqlx::query_as::<_, Loan>(&format!(
            "UPDATE loans SET status = 'issued', decided_by = $1, notes = $2, \
             issued_at = $3, due_at = $4 WHERE id = $5 \
             RETURNING {}",
            Self::returning_columns()
        ))
        .bind(admin_id)
        .bind(notes)
        .bind(now)
        .bind(due)
        .bind(loan_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE books SET available = available - 1 WHERE id = $1")
            .bind(loan.book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Reject a pending request. No stock side effect.
    pub async fn reject(&self, loan_id: i32, admin_id: i32, reason: &str) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let loan = Self::lock_loan(&mut tx, loan_id).await?;
        loan.status.apply(LoanAction::Reject)?;

        let updated = sqlx::query_as::<_, Loan>(&format!(
            "UPDATE loans SET status = 'rejected', decided_by = $1, rejection_reason = $2 \
             WHERE id = $3 RETURNING {}",
            Self::returning_columns()
        ))
        .bind(admin_id)
        .bind(reason)
        .bind(loan_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Cancel a pending request (member-initiated). No stock side effect.
    pub async fn cancel(&self, loan_id: i32, member_id: i32) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let loan = Self::lock_loan(&mut tx, loan_id).await?;
        if loan.member_id != member_id {
            return Err(AppError::NotLoanOwner { loan_id, member_id });
        }
        loan.status.apply(LoanAction::Cancel)?;

        let updated = sqlx::query_as::<_, Loan>(&format!(
            "UPDATE loans SET status = 'cancelled' WHERE id = $1 RETURNING {}",
            Self::returning_columns()
        ))
        .bind(loan_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Direct issuance without a prior request: a ledger entry is created
    /// already issued and one unit of stock is taken, atomically. Same
    /// preconditions as approve.
    pub async fn issue_direct(
        &self,
        member_id: i32,
        book_id: i32,
        admin_id: i32,
        notes: Option<&str>,
        policy: &LoanPolicy,
    ) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let (available, _) = Self::lock_book(&mut tx, book_id).await?;
        Self::check_issue_preconditions(&mut tx, member_id, book_id, available, policy).await?;

        let now = Utc::now();
        let due = due_date(now, policy.issue_duration_days);

        let loan = sqlx::query_as::<_, Loan>(&format!(
            "INSERT INTO loans (member_id, book_id, status, requested_at, decided_by, notes, issued_at, due_at) \
             VALUES ($1, $2, 'issued', $3, $4, $5, $3, $6) \
             RETURNING {}",
            Self::returning_columns()
        ))
        .bind(member_id)
        .bind(book_id)
        .bind(now)
        .bind(admin_id)
        .bind(notes)
        .bind(due)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE books SET available = available - 1 WHERE id = $1")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(loan)
    }

    /// Return an issued loan: the fine is computed (or overridden) and
    /// recorded, and one unit of stock comes back, atomically.
    pub async fn return_loan(
        &self,
        loan_id: i32,
        override_fine: Option<Decimal>,
        policy: &LoanPolicy,
    ) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let loan = Self::lock_loan(&mut tx, loan_id).await?;
        loan.status.apply(LoanAction::Return)?;

        // An issued loan always carries a due date; a row without one is
        // corrupt ledger state.
        let due = loan.due_at.ok_or_else(|| {
            AppError::Internal(format!("Issued loan {} has no due date", loan_id))
        })?;

        Self::lock_book(&mut tx, loan.book_id).await?;

        let now = Utc::now();
        let fine = match override_fine {
            Some(f) => f,
            None => fine_due(due, now, policy.fine_per_day),
        };

        let updated = sqlx::query_as::<_, Loan>(&format!(
            "UPDATE loans SET status = 'returned', returned_at = $1, fine = $2 \
             WHERE id = $3 RETURNING {}",
            Self::returning_columns()
        ))
        .bind(now)
        .bind(fine)
        .bind(loan_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE books SET available = available + 1 WHERE id = $1")
            .bind(loan.book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// List loans with filters and pagination, joined with display names
    pub async fn list(&self, query: &LoanQuery) -> AppResult<(Vec<LoanJoined>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let mut conditions = vec!["1 = 1".to_string()];
        if query.status.is_some() {
            conditions.push("l.status = $1".to_string());
        }
        if query.member_id.is_some() {
            conditions.push(format!("l.member_id = ${}", conditions.len()));
        }
        if query.book_id.is_some() {
            conditions.push(format!("l.book_id = ${}", conditions.len()));
        }
        let where_clause = conditions.join(" AND ");

        let sql = format!(
            "SELECT l.id, l.member_id, l.book_id, l.status, l.requested_at, l.decided_by, \
             l.notes, l.rejection_reason, l.issued_at, l.due_at, l.returned_at, l.fine, \
             b.title AS book_title, m.name AS member_name \
             FROM loans l \
             JOIN books b ON l.book_id = b.id \
             JOIN members m ON l.member_id = m.id \
             WHERE {} ORDER BY l.requested_at DESC LIMIT {} OFFSET {}",
            where_clause, per_page, offset
        );

        let mut q = sqlx::query(&sql);
        if let Some(status) = query.status {
            q = q.bind(status);
        }
        if let Some(member_id) = query.member_id {
            q = q.bind(member_id);
        }
        if let Some(book_id) = query.book_id {
            q = q.bind(book_id);
        }

        let rows = q.fetch_all(&self.pool).await?;
        let loans = rows.into_iter().map(Self::joined_from_row).collect();

        let count_sql = format!("SELECT COUNT(*) FROM loans l WHERE {}", where_clause);
        let mut cq = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(status) = query.status {
            cq = cq.bind(status);
        }
        if let Some(member_id) = query.member_id {
            cq = cq.bind(member_id);
        }
        if let Some(book_id) = query.book_id {
            cq = cq.bind(book_id);
        }
        let total = cq.fetch_one(&self.pool).await?;

        Ok((loans, total))
    }

    /// Loans of one member, most recent first
    pub async fn member_loans(&self, member_id: i32) -> AppResult<Vec<LoanJoined>> {
        let rows = sqlx::query(
            "SELECT l.id, l.member_id, l.book_id, l.status, l.requested_at, l.decided_by, \
             l.notes, l.rejection_reason, l.issued_at, l.due_at, l.returned_at, l.fine, \
             b.title AS book_title, m.name AS member_name \
             FROM loans l \
             JOIN books b ON l.book_id = b.id \
             JOIN members m ON l.member_id = m.id \
             WHERE l.member_id = $1 ORDER BY l.requested_at DESC",
        )
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Self::joined_from_row).collect())
    }

    /// Issued loans past their due date
    pub async fn list_overdue(&self, now: DateTime<Utc>) -> AppResult<Vec<LoanJoined>> {
        let rows = sqlx::query(
            "SELECT l.id, l.member_id, l.book_id, l.status, l.requested_at, l.decided_by, \
             l.notes, l.rejection_reason, l.issued_at, l.due_at, l.returned_at, l.fine, \
             b.title AS book_title, m.name AS member_name \
             FROM loans l \
             JOIN books b ON l.book_id = b.id \
             JOIN members m ON l.member_id = m.id \
             WHERE l.status = 'issued' AND l.due_at < $1 ORDER BY l.due_at",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Self::joined_from_row).collect())
    }

    fn returning_columns() -> &'static str {
        "id, member_id, book_id, status, requested_at, decided_by, notes, \
         rejection_reason, issued_at, due_at, returned_at, fine"
    }

    fn joined_from_row(row: sqlx::postgres::PgRow) -> LoanJoined {
        let loan = Loan {
            id: row.get("id"),
            member_id: row.get("member_id"),
            book_id: row.get("book_id"),
            status: row.get("status"),
            requested_at: row.get("requested_at"),
            decided_by: row.get("decided_by"),
            notes: row.get("notes"),
            rejection_reason: row.get("rejection_reason"),
            issued_at: row.get("issued_at"),
            due_at: row.get("due_at"),
            returned_at: row.get("returned_at"),
            fine: row.get("fine"),
        };
        LoanJoined {
            loan,
            book_title: row.get("book_title"),
            member_name: row.get("member_name"),
        }
    }
}
