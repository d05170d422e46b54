//! Books repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, CreateBook, UpdateBook},
};

const BOOK_COLUMNS: &str = "id, title, author, publisher, category, isbn, quantity, available, \
     price, description, created_at";

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!("SELECT {} FROM books WHERE id = $1", BOOK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::BookNotFound(id))
    }

    /// Search books with pagination
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(ref title) = query.title {
            params.push(format!("%{}%", title.to_lowercase()));
            conditions.push(format!("LOWER(title) LIKE ${}", params.len()));
        }
        if let Some(ref author) = query.author {
            params.push(format!("%{}%", author.to_lowercase()));
            conditions.push(format!("LOWER(author) LIKE ${}", params.len()));
        }
        if let Some(ref category) = query.category {
            params.push(category.to_lowercase());
            conditions.push(format!("LOWER(category) = ${}", params.len()));
        }
        if let Some(ref isbn) = query.isbn {
            params.push(isbn.replace(['-', ' '], ""));
            conditions.push(format!("REPLACE(REPLACE(isbn, '-', ''), ' ', '') = ${}", params.len()));
        }
        if query.available_only.unwrap_or(false) {
            conditions.push("available > 0".to_string());
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT {} FROM books {} ORDER BY title LIMIT {} OFFSET {}",
            BOOK_COLUMNS, where_clause, per_page, offset
        );
        let mut q = sqlx::query_as::<_, Book>(&sql);
        for param in &params {
            q = q.bind(param);
        }
        let books = q.fetch_all(&self.pool).await?;

        let count_sql = format!("SELECT COUNT(*) FROM books {}", where_clause);
        let mut cq = sqlx::query_scalar::<_, i64>(&count_sql);
        for param in &params {
            cq = cq.bind(param);
        }
        let total = cq.fetch_one(&self.pool).await?;

        Ok((books, total))
    }

    /// Create a new book. All copies start available.
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(&format!(
            "INSERT INTO books (title, author, publisher, category, isbn, quantity, available, price, description) \
             VALUES ($1, $2, $3, $4, $5, $6, $6, $7, $8) \
             RETURNING {}",
            BOOK_COLUMNS
        ))
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.publisher)
        .bind(&book.category)
        .bind(&book.isbn)
        .bind(book.quantity)
        .bind(book.price)
        .bind(&book.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Update a book. A quantity change re-derives `available` so the issued
    /// count stays fixed; it fails when the new quantity would not cover the
    /// currently issued copies.
    pub async fn update(&self, id: i32, update: &UpdateBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE id = $1 FOR UPDATE",
            BOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::BookNotFound(id))?;

        let (quantity, available) = match update.quantity {
            Some(new_quantity) => {
                let issued = book.quantity - book.available;
                if new_quantity < issued {
                    return Err(AppError::Validation(format!(
                        "Quantity {} is below the {} currently issued copies",
                        new_quantity, issued
                    )));
                }
                (new_quantity, new_quantity - issued)
            }
            None => (book.quantity, book.available),
        };

        let updated = sqlx::query_as::<_, Book>(&format!(
            "UPDATE books SET title = $1, author = $2, publisher = $3, category = $4, \
             isbn = $5, quantity = $6, available = $7, price = $8, description = $9 \
             WHERE id = $10 RETURNING {}",
            BOOK_COLUMNS
        ))
        .bind(update.title.as_deref().unwrap_or(&book.title))
        .bind(update.author.as_deref().unwrap_or(&book.author))
        .bind(update.publisher.as_deref().or(book.publisher.as_deref()))
        .bind(update.category.as_deref().or(book.category.as_deref()))
        .bind(update.isbn.as_deref().or(book.isbn.as_deref()))
        .bind(quantity)
        .bind(available)
        .bind(update.price.or(book.price))
        .bind(update.description.as_deref().or(book.description.as_deref()))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Delete a book. Refused while any pending or issued loan references it,
    /// and refused outright once the book has ledger history: loan rows are
    /// never deleted, and they keep their book reference (ON DELETE RESTRICT).
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let active: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM loans WHERE book_id = $1 AND status IN ('pending', 'issued'))",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if active {
            return Err(AppError::BookHasActiveLoans(id));
        }

        let has_history: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM loans WHERE book_id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        if has_history {
            return Err(AppError::Conflict(format!(
                "Book {} has loan history and cannot be removed",
                id
            )));
        }

        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::BookNotFound(id));
        }

        Ok(())
    }
}
