//! Loan workflow service: the engine driving the request/issue/return cycle
//!
//! Orchestrates each transition: validates the inputs, checks member
//! eligibility, fetches the loan policy as stored right now, and hands the
//! transition to the repository, which applies it atomically.

use chrono::Utc;
use rust_decimal::Decimal;

use crate::{
    error::{AppError, AppResult},
    models::{
        loan::{Loan, LoanDetails, LoanQuery},
        policy::LoanPolicy,
    },
    repository::{loans::LoanJoined, Repository},
};

#[derive(Clone)]
pub struct WorkflowService {
    repository: Repository,
}

impl WorkflowService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// A member submits a request for a book. The ledger entry starts
    /// pending; stock is untouched until approval.
    pub async fn submit_request(&self, member_id: i32, book_id: i32) -> AppResult<Loan> {
        let member = self.repository.members.get_by_id(member_id).await?;
        if !member.is_active() {
            return Err(AppError::MemberInactive(member_id));
        }

        // Book must exist; availability is only checked at approval time
        self.repository.books.get_by_id(book_id).await?;

        let loan = self.repository.loans.create_pending(member_id, book_id).await?;
        tracing::info!(loan_id = loan.id, member_id, book_id, "Loan requested");
        Ok(loan)
    }

    /// An admin approves a pending request, which issues the book
    /// immediately: stock −1, due date set from the current policy.
    pub async fn approve_request(
        &self,
        loan_id: i32,
        admin_id: i32,
        notes: Option<&str>,
    ) -> AppResult<Loan> {
        let loan = self.repository.loans.get_by_id(loan_id).await?;

        let member = self.repository.members.get_by_id(loan.member_id).await?;
        if !member.is_active() {
            return Err(AppError::MemberInactive(loan.member_id));
        }

        let policy = self.repository.settings.loan_policy().await?;
        let issued = self
            .repository
            .loans
            .approve(loan_id, admin_id, notes, &policy)
            .await?;

        tracing::info!(
            loan_id,
            admin_id,
            due_at = %issued.due_at.map(|d| d.to_rfc3339()).unwrap_or_default(),
            "Loan approved and issued"
        );
        Ok(issued)
    }

    /// An admin rejects a pending request. A non-empty reason is required.
    pub async fn reject_request(
        &self,
        loan_id: i32,
        admin_id: i32,
        reason: &str,
    ) -> AppResult<Loan> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation(
                "A rejection reason is required".to_string(),
            ));
        }

        let rejected = self.repository.loans.reject(loan_id, admin_id, reason).await?;
        tracing::info!(loan_id, admin_id, "Loan rejected");
        Ok(rejected)
    }

    /// The requesting member cancels their own pending request.
    pub async fn cancel_request(&self, loan_id: i32, member_id: i32) -> AppResult<Loan> {
        let cancelled = self.repository.loans.cancel(loan_id, member_id).await?;
        tracing::info!(loan_id, member_id, "Loan cancelled");
        Ok(cancelled)
    }

    /// An admin issues a book directly, bypassing the request step. Same
    /// preconditions as approval.
    pub async fn issue_book(
        &self,
        member_id: i32,
        book_id: i32,
        admin_id: i32,
        notes: Option<&str>,
    ) -> AppResult<Loan> {
        let member = self.repository.members.get_by_id(member_id).await?;
        if !member.is_active() {
            return Err(AppError::MemberInactive(member_id));
        }

        let policy = self.repository.settings.loan_policy().await?;
        let loan = self
            .repository
            .loans
            .issue_direct(member_id, book_id, admin_id, notes, &policy)
            .await?;

        tracing::info!(loan_id = loan.id, member_id, book_id, admin_id, "Book issued directly");
        Ok(loan)
    }

    /// An admin takes an issued book back. The fine is computed from the
    /// current policy (or overridden, e.g. a waiver) and recorded; stock +1.
    pub async fn return_book(
        &self,
        loan_id: i32,
        override_fine: Option<Decimal>,
    ) -> AppResult<Loan> {
        if let Some(fine) = override_fine {
            if fine < Decimal::ZERO {
                return Err(AppError::Validation(
                    "Fine override must not be negative".to_string(),
                ));
            }
        }

        let policy = self.repository.settings.loan_policy().await?;
        let returned = self
            .repository
            .loans
            .return_loan(loan_id, override_fine, &policy)
            .await?;

        tracing::info!(
            loan_id,
            fine = %returned.fine.unwrap_or(Decimal::ZERO),
            "Book returned"
        );
        Ok(returned)
    }

    /// List loans with filters; overdue flags and accrued fines are derived
    /// against the current policy.
    pub async fn list_loans(&self, query: &LoanQuery) -> AppResult<(Vec<LoanDetails>, i64)> {
        let policy = self.repository.settings.loan_policy().await?;
        let (loans, total) = self.repository.loans.list(query).await?;
        Ok((self.to_details(loans, &policy), total))
    }

    /// All loans of one member
    pub async fn member_loans(&self, member_id: i32) -> AppResult<Vec<LoanDetails>> {
        self.repository.members.get_by_id(member_id).await?;
        let policy = self.repository.settings.loan_policy().await?;
        let loans = self.repository.loans.member_loans(member_id).await?;
        Ok(self.to_details(loans, &policy))
    }

    /// Issued loans past their due date
    pub async fn overdue_loans(&self) -> AppResult<Vec<LoanDetails>> {
        let policy = self.repository.settings.loan_policy().await?;
        let loans = self.repository.loans.list_overdue(Utc::now()).await?;
        Ok(self.to_details(loans, &policy))
    }

    fn to_details(&self, loans: Vec<LoanJoined>, policy: &LoanPolicy) -> Vec<LoanDetails> {
        let now = Utc::now();
        loans
            .into_iter()
            .map(|joined| LoanDetails {
                is_overdue: joined.loan.is_overdue(now),
                accrued_fine: joined.loan.accrued_fine(now, policy.fine_per_day),
                book_title: joined.book_title,
                member_name: joined.member_name,
                loan: joined.loan,
            })
            .collect()
    }
}
