use chrono::Utc;
use sea_orm::*;
use tracing::{debug, info};

use crate::entity::user;
use crate::error::AppError;
use crate::models::auth::{RegisterRequest, normalize_email};
use crate::utils::hash;

pub struct AuthService<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> AuthService<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, AppError> {
        Ok(user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(self.conn)
            .await?)
    }

    /// Create an account. The request must already be validated.
    pub async fn register(&self, payload: &RegisterRequest) -> Result<user::Model, AppError> {
        let email = normalize_email(&payload.email);

        if self.find_by_email(&email).await?.is_some() {
            return Err(AppError::UserAlreadyExists);
        }

        let hash = hash::hash_password(&payload.password)
            .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

        let now = Utc::now();
        let new_user = user::ActiveModel {
            email: Set(email),
            password: Set(hash),
            first_name: Set(payload.first_name.trim().to_string()),
            last_name: Set(payload.last_name.trim().to_string()),
            is_active: Set(true),
            email_verified: Set(false),
            last_login_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let user = new_user.insert(self.conn).await.map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                debug!("Registration race condition: unique constraint caught on insert");
                AppError::UserAlreadyExists
            }
            _ => AppError::from(e),
        })?;

        info!(user_id = user.id, "User registered");
        Ok(user)
    }

    /// Check credentials and stamp `last_login_at`.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<user::Model, AppError> {
        let user = self
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let is_valid = hash::verify_password(password, &user.password)
            .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;
        if !is_valid {
            return Err(AppError::InvalidCredentials);
        }

        if !user.is_active {
            return Err(AppError::UserDisabled);
        }

        let now = Utc::now();
        let mut active: user::ActiveModel = user.into();
        active.last_login_at = Set(Some(now));
        active.updated_at = Set(now);
        Ok(active.update(self.conn).await?)
    }

    pub async fn find_user(&self, id: i32) -> Result<user::Model, AppError> {
        user::Entity::find_by_id(id)
            .one(self.conn)
            .await?
            .ok_or(AppError::UserNotFound)
    }
}
