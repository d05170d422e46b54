//! Loan ledger model, status state machine and fine arithmetic

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, AppResult};

// ---------------------------------------------------------------------------
// LoanStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a loan ledger entry.
///
/// `Approved` exists as a stored value for legacy rows; the approve action
/// moves a pending loan directly to `Issued`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Pending,
    Approved,
    Rejected,
    Issued,
    Returned,
    Cancelled,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Approved => "approved",
            LoanStatus::Rejected => "rejected",
            LoanStatus::Issued => "issued",
            LoanStatus::Returned => "returned",
            LoanStatus::Cancelled => "cancelled",
        }
    }

    /// Whether any further transition is permitted from this status.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LoanStatus::Pending | LoanStatus::Issued)
    }

    /// The loan status transition table.
    ///
    /// Returns the successor status for a legal (status, action) pairing and
    /// an invalid-transition error for every other pairing.
    pub fn apply(self, action: LoanAction) -> AppResult<LoanStatus> {
        match (self, action) {
            (LoanStatus::Pending, LoanAction::Approve) => Ok(LoanStatus::Issued),
            (LoanStatus::Pending, LoanAction::Reject) => Ok(LoanStatus::Rejected),
            (LoanStatus::Pending, LoanAction::Cancel) => Ok(LoanStatus::Cancelled),
            (LoanStatus::Issued, LoanAction::Return) => Ok(LoanStatus::Returned),
            (status, action) => Err(AppError::InvalidTransition { status, action }),
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(LoanStatus::Pending),
            "approved" => Ok(LoanStatus::Approved),
            "rejected" => Ok(LoanStatus::Rejected),
            "issued" => Ok(LoanStatus::Issued),
            "returned" => Ok(LoanStatus::Returned),
            "cancelled" => Ok(LoanStatus::Cancelled),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

// SQLx conversion for LoanStatus (stored as text)
impl sqlx::Type<Postgres> for LoanStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for LoanStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for LoanStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <String as Encode<Postgres>>::encode(self.as_str().to_string(), buf)
    }
}

// ---------------------------------------------------------------------------
// LoanAction
// ---------------------------------------------------------------------------

/// Requested workflow transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanAction {
    Approve,
    Reject,
    Cancel,
    Return,
}

impl std::fmt::Display for LoanAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LoanAction::Approve => "approve",
            LoanAction::Reject => "reject",
            LoanAction::Cancel => "cancel",
            LoanAction::Return => "return",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// Date and fine arithmetic
// ---------------------------------------------------------------------------

/// Due date for a loan issued at `issued_at` under the given duration.
pub fn due_date(issued_at: DateTime<Utc>, issue_duration_days: i64) -> DateTime<Utc> {
    issued_at + Duration::days(issue_duration_days)
}

/// Days late for a return at `returned_at` against `due_at`, zero floored.
///
/// Day counting rule: the calendar-day difference of the two UTC dates. A
/// return later the same calendar day as the due date is not late; partial
/// days are not prorated.
pub fn days_late(due_at: DateTime<Utc>, returned_at: DateTime<Utc>) -> i64 {
    (returned_at.date_naive() - due_at.date_naive()).num_days().max(0)
}

/// Fine owed for a return at `returned_at`: `days_late * fine_per_day`.
pub fn fine_due(due_at: DateTime<Utc>, returned_at: DateTime<Utc>, fine_per_day: Decimal) -> Decimal {
    Decimal::from(days_late(due_at, returned_at)) * fine_per_day
}

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

/// Loan ledger entry from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub member_id: i32,
    pub book_id: i32,
    pub status: LoanStatus,
    pub requested_at: DateTime<Utc>,
    /// Admin who approved, rejected or issued the loan
    pub decided_by: Option<i32>,
    pub notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub due_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub fine: Option<Decimal>,
}

impl Loan {
    /// Overdue is a derived condition, never stored: an issued loan whose
    /// due date has passed.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == LoanStatus::Issued && self.due_at.map(|due| now > due).unwrap_or(false)
    }

    /// Fine accrued to date for an overdue issued loan; recorded into the
    /// ledger only at return time.
    pub fn accrued_fine(&self, now: DateTime<Utc>, fine_per_day: Decimal) -> Decimal {
        match (self.status, self.due_at) {
            (LoanStatus::Issued, Some(due)) => fine_due(due, now, fine_per_day),
            _ => Decimal::ZERO,
        }
    }
}

/// Loan with book and member display fields for listings
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    #[serde(flatten)]
    pub loan: Loan,
    pub book_title: String,
    pub member_name: String,
    pub is_overdue: bool,
    /// For issued loans, the fine that would be owed if returned now
    pub accrued_fine: Decimal,
}

/// Loan listing filter
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct LoanQuery {
    pub status: Option<LoanStatus>,
    pub member_id: Option<i32>,
    pub book_id: Option<i32>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn pending_transitions() {
        assert_eq!(
            LoanStatus::Pending.apply(LoanAction::Approve).unwrap(),
            LoanStatus::Issued
        );
        assert_eq!(
            LoanStatus::Pending.apply(LoanAction::Reject).unwrap(),
            LoanStatus::Rejected
        );
        assert_eq!(
            LoanStatus::Pending.apply(LoanAction::Cancel).unwrap(),
            LoanStatus::Cancelled
        );
    }

    #[test]
    fn issued_can_only_be_returned() {
        assert_eq!(
            LoanStatus::Issued.apply(LoanAction::Return).unwrap(),
            LoanStatus::Returned
        );
        for action in [LoanAction::Approve, LoanAction::Reject, LoanAction::Cancel] {
            assert!(matches!(
                LoanStatus::Issued.apply(action),
                Err(AppError::InvalidTransition { .. })
            ));
        }
    }

    #[test]
    fn terminal_states_reject_everything() {
        let terminals = [
            LoanStatus::Approved,
            LoanStatus::Rejected,
            LoanStatus::Returned,
            LoanStatus::Cancelled,
        ];
        let actions = [
            LoanAction::Approve,
            LoanAction::Reject,
            LoanAction::Cancel,
            LoanAction::Return,
        ];
        for status in terminals {
            assert!(status.is_terminal());
            for action in actions {
                assert!(matches!(
                    status.apply(action),
                    Err(AppError::InvalidTransition { .. })
                ));
            }
        }
    }

    #[test]
    fn pending_cannot_be_returned() {
        assert!(matches!(
            LoanStatus::Pending.apply(LoanAction::Return),
            Err(AppError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn due_date_adds_whole_days() {
        let issued = day(1);
        assert_eq!(due_date(issued, 14), day(15));
    }

    #[test]
    fn on_time_return_owes_nothing() {
        let due = day(15);
        assert_eq!(fine_due(due, day(10), dec("2.00")), Decimal::ZERO);
        // Later the same calendar day is still on time
        let same_day_later = Utc.with_ymd_and_hms(2024, 3, 15, 23, 30, 0).unwrap();
        assert_eq!(fine_due(due, same_day_later, dec("2.00")), Decimal::ZERO);
    }

    #[test]
    fn late_return_owes_days_times_rate() {
        // Issued day 0, due day 14, returned day 20 at 2.00/day -> 12.00
        let issued = day(1);
        let due = due_date(issued, 14);
        let returned = day(21);
        assert_eq!(days_late(due, returned), 6);
        assert_eq!(fine_due(due, returned, dec("2.00")), dec("12.00"));
    }

    #[test]
    fn day_count_ignores_time_of_day() {
        let due = Utc.with_ymd_and_hms(2024, 3, 15, 23, 59, 0).unwrap();
        let returned = Utc.with_ymd_and_hms(2024, 3, 16, 0, 1, 0).unwrap();
        assert_eq!(days_late(due, returned), 1);
    }

    #[test]
    fn overdue_is_derived_from_due_date() {
        let loan = Loan {
            id: 1,
            member_id: 1,
            book_id: 1,
            status: LoanStatus::Issued,
            requested_at: day(1),
            decided_by: Some(2),
            notes: None,
            rejection_reason: None,
            issued_at: Some(day(1)),
            due_at: Some(day(15)),
            returned_at: None,
            fine: None,
        };
        assert!(!loan.is_overdue(day(14)));
        assert!(loan.is_overdue(day(16)));
        assert_eq!(loan.accrued_fine(day(18), dec("1.50")), dec("4.50"));

        let returned = Loan {
            status: LoanStatus::Returned,
            returned_at: Some(day(20)),
            ..loan
        };
        assert!(!returned.is_overdue(day(25)));
        assert_eq!(returned.accrued_fine(day(25), dec("1.50")), Decimal::ZERO);
    }

    #[test]
    fn unknown_status_string_is_rejected() {
        assert!("overdue".parse::<LoanStatus>().is_err());
    }
}
