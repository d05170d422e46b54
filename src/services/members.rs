//! Membership service: registration, authentication, profile and status

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::member::{
        Member, MemberClaims, MemberQuery, MemberShort, MemberStatus, RegisterMember,
        UpdateProfile,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct MembersService {
    repository: Repository,
    config: AuthConfig,
}

impl MembersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a new student account
    pub async fn register(&self, request: RegisterMember) -> AppResult<Member> {
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if self.repository.members.email_exists(&request.email, None).await? {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let hash = self.hash_password(&request.password)?;
        let member = self
            .repository
            .members
            .create(
                &request.name,
                &request.email,
                &hash,
                request.phone.as_deref(),
                request.address.as_deref(),
            )
            .await?;

        tracing::info!(member_id = member.id, "Member registered");
        Ok(member)
    }

    /// Create the initial admin account if no admin exists yet
    pub async fn ensure_default_admin(&self, email: &str, password: &str) -> AppResult<()> {
        if self.repository.members.admin_exists().await? {
            return Ok(());
        }

        let hash = self.hash_password(password)?;
        let admin = self
            .repository
            .members
            .create_admin("Administrator", email, &hash)
            .await?;

        tracing::warn!(
            member_id = admin.id,
            email,
            "Created default admin account; change its password"
        );
        Ok(())
    }

    /// Authenticate by email and password, returning a bearer token
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<(String, Member)> {
        let member = self
            .repository
            .members
            .get_by_email(email)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if member.status == MemberStatus::Inactive {
            return Err(AppError::Authentication("Account is inactive".to_string()));
        }

        if !self.verify_password(&member, password)? {
            return Err(AppError::Authentication("Invalid email or password".to_string()));
        }

        let token = self.create_token(&member)?;
        Ok((token, member))
    }

    /// Create a JWT token for a member
    fn create_token(&self, member: &Member) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = MemberClaims {
            sub: member.email.clone(),
            member_id: member.id,
            role: member.role,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Get member by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Member> {
        self.repository.members.get_by_id(id).await
    }

    /// Search members
    pub async fn search(&self, query: &MemberQuery) -> AppResult<(Vec<MemberShort>, i64)> {
        self.repository.members.search(query).await
    }

    /// Update a member's own profile
    pub async fn update_profile(&self, member_id: i32, profile: UpdateProfile) -> AppResult<Member> {
        profile
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let member = self.repository.members.get_by_id(member_id).await?;

        if let Some(ref email) = profile.email {
            if self.repository.members.email_exists(email, Some(member_id)).await? {
                return Err(AppError::Conflict("Email already registered".to_string()));
            }
        }

        // If changing password, verify current password first
        if let Some(ref new_password) = profile.new_password {
            let current = profile.current_password.as_ref().ok_or_else(|| {
                AppError::Validation("Current password required to change password".to_string())
            })?;

            if !self.verify_password(&member, current)? {
                return Err(AppError::Authentication(
                    "Current password is incorrect".to_string(),
                ));
            }

            let hash = self.hash_password(new_password)?;
            self.repository.members.update_password(member_id, &hash).await?;
        }

        self.repository
            .members
            .update_profile(
                member_id,
                profile.name.as_deref(),
                profile.email.as_deref(),
                profile.phone.as_deref(),
                profile.address.as_deref(),
            )
            .await
    }

    /// Activate or deactivate a member (admin action)
    pub async fn set_status(&self, member_id: i32, status: MemberStatus) -> AppResult<Member> {
        let member = self.repository.members.set_status(member_id, status).await?;
        tracing::info!(member_id, status = %status, "Member status changed");
        Ok(member)
    }

    /// Verify a member's password
    fn verify_password(&self, member: &Member, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&member.password)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }
}
