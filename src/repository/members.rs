//! Members repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::member::{Member, MemberQuery, MemberShort, MemberStatus},
};

const MEMBER_COLUMNS: &str =
    "id, name, email, password, role, status, phone, address, registered_at";

#[derive(Clone)]
pub struct MembersRepository {
    pool: Pool<Postgres>,
}

impl MembersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get member by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Member> {
        sqlx::query_as::<_, Member>(&format!(
            "SELECT {} FROM members WHERE id = $1",
            MEMBER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::MemberNotFound(id))
    }

    /// Get member by email (authentication lookup)
    pub async fn get_by_email(&self, email: &str) -> AppResult<Option<Member>> {
        let member = sqlx::query_as::<_, Member>(&format!(
            "SELECT {} FROM members WHERE LOWER(email) = LOWER($1)",
            MEMBER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(member)
    }

    /// Check if email already exists
    pub async fn email_exists(&self, email: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM members WHERE LOWER(email) = LOWER($1) AND id != $2)",
            )
            .bind(email)
            .bind(id)
            .fetch_one(&self.pool)
            .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM members WHERE LOWER(email) = LOWER($1))")
                .bind(email)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(exists)
    }

    /// Insert a new member with an already-hashed password
    pub async fn create(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        phone: Option<&str>,
        address: Option<&str>,
    ) -> AppResult<Member> {
        let member = sqlx::query_as::<_, Member>(&format!(
            "INSERT INTO members (name, email, password, role, status, phone, address) \
             VALUES ($1, $2, $3, 'student', 'active', $4, $5) \
             RETURNING {}",
            MEMBER_COLUMNS
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(phone)
        .bind(address)
        .fetch_one(&self.pool)
        .await?;

        Ok(member)
    }

    /// Whether any admin account exists
    pub async fn admin_exists(&self) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM members WHERE role = 'admin')")
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// Insert an admin account with an already-hashed password
    pub async fn create_admin(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> AppResult<Member> {
        let member = sqlx::query_as::<_, Member>(&format!(
            "INSERT INTO members (name, email, password, role, status) \
             VALUES ($1, $2, $3, 'admin', 'active') \
             RETURNING {}",
            MEMBER_COLUMNS
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(member)
    }

    /// Search members with pagination; each row carries its issued-loan count
    pub async fn search(&self, query: &MemberQuery) -> AppResult<(Vec<MemberShort>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(ref name) = query.name {
            params.push(format!("%{}%", name.to_lowercase()));
            conditions.push(format!("LOWER(m.name) LIKE ${}", params.len()));
        }
        if let Some(ref email) = query.email {
            params.push(format!("%{}%", email.to_lowercase()));
            conditions.push(format!("LOWER(m.email) LIKE ${}", params.len()));
        }
        if let Some(status) = query.status {
            params.push(status.as_str().to_string());
            conditions.push(format!("m.status = ${}", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT m.id, m.name, m.email, m.role, m.status, \
             COALESCE(l.nb_issued, 0) AS nb_issued \
             FROM members m \
             LEFT JOIN (SELECT member_id, COUNT(*) AS nb_issued FROM loans \
                        WHERE status = 'issued' GROUP BY member_id) l \
               ON l.member_id = m.id \
             {} ORDER BY m.name LIMIT {} OFFSET {}",
            where_clause, per_page, offset
        );
        let mut q = sqlx::query_as::<_, MemberShort>(&sql);
        for param in &params {
            q = q.bind(param);
        }
        let members = q.fetch_all(&self.pool).await?;

        let count_sql = format!("SELECT COUNT(*) FROM members m {}", where_clause);
        let mut cq = sqlx::query_scalar::<_, i64>(&count_sql);
        for param in &params {
            cq = cq.bind(param);
        }
        let total = cq.fetch_one(&self.pool).await?;

        Ok((members, total))
    }

    /// Update profile fields (name, email, phone, address)
    pub async fn update_profile(
        &self,
        id: i32,
        name: Option<&str>,
        email: Option<&str>,
        phone: Option<&str>,
        address: Option<&str>,
    ) -> AppResult<Member> {
        let member = sqlx::query_as::<_, Member>(&format!(
            "UPDATE members SET \
             name = COALESCE($1, name), \
             email = COALESCE($2, email), \
             phone = COALESCE($3, phone), \
             address = COALESCE($4, address) \
             WHERE id = $5 RETURNING {}",
            MEMBER_COLUMNS
        ))
        .bind(name)
        .bind(email)
        .bind(phone)
        .bind(address)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::MemberNotFound(id))?;

        Ok(member)
    }

    /// Replace the stored password hash
    pub async fn update_password(&self, id: i32, password_hash: &str) -> AppResult<()> {
        let result = sqlx::query("UPDATE members SET password = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::MemberNotFound(id));
        }
        Ok(())
    }

    /// Change member status. Deactivation is refused while the member still
    /// holds issued books; the check and the update share one transaction.
    pub async fn set_status(&self, id: i32, status: MemberStatus) -> AppResult<Member> {
        let mut tx = self.pool.begin().await?;

        let member = sqlx::query_as::<_, Member>(&format!(
            "SELECT {} FROM members WHERE id = $1 FOR UPDATE",
            MEMBER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::MemberNotFound(id))?;

        if status == MemberStatus::Inactive {
            let issued: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM loans WHERE member_id = $1 AND status = 'issued'",
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

            if issued > 0 {
                return Err(AppError::MemberHoldsBooks(id));
            }
        }

        let updated = sqlx::query_as::<_, Member>(&format!(
            "UPDATE members SET status = $1 WHERE id = $2 RETURNING {}",
            MEMBER_COLUMNS
        ))
        .bind(status)
        .bind(member.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }
}
