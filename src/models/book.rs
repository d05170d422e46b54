//! Book (catalog) model and related types

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// ISBN-10 or ISBN-13, digits with optional separators
static ISBN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d[ -]?){9}[\dXx]$|^(?:\d[ -]?){12}\d$").unwrap());

pub fn is_valid_isbn(isbn: &str) -> bool {
    ISBN_RE.is_match(isbn)
}

/// Book model from database
///
/// `available` is the stored source of truth for availability; it is mutated
/// only inside loan transitions and always satisfies
/// `0 <= available <= quantity`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub publisher: Option<String>,
    pub category: Option<String>,
    pub isbn: Option<String>,
    pub quantity: i32,
    pub available: i32,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author must not be empty"))]
    pub author: String,
    pub publisher: Option<String>,
    pub category: Option<String>,
    pub isbn: Option<String>,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub price: Option<Decimal>,
    pub description: Option<String>,
}

/// Update book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Author must not be empty"))]
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub category: Option<String>,
    pub isbn: Option<String>,
    /// New total quantity; available is re-derived keeping the issued count
    #[validate(range(min = 0, message = "Quantity must not be negative"))]
    pub quantity: Option<i32>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
}

/// Book search parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    pub title: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub isbn: Option<String>,
    /// Only list books with at least one available copy
    pub available_only: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isbn_formats() {
        assert!(is_valid_isbn("0306406152"));
        assert!(is_valid_isbn("030640615X"));
        assert!(is_valid_isbn("978-0306406157"));
        assert!(is_valid_isbn("9780306406157"));
        assert!(!is_valid_isbn("not-an-isbn"));
        assert!(!is_valid_isbn("12345"));
    }
}
