//! User repository implementation

use sqlx::PgPool;
use chrono::Utc;
use crate::models::user::{CreateUserRequest, User, UserRole};
use crate::utils::errors::TicketDeskError;

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user
    pub async fn create(&self, request: CreateUserRequest) -> Result<User, TicketDeskError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, full_name, role, provider_customer_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, email, full_name, role, provider_customer_id, created_at, updated_at
            "#
        )
        .bind(request.email)
        .bind(request.full_name)
        .bind(request.role.unwrap_or(UserRole::User))
        .bind(request.provider_customer_id)
        .bind(Utc::now())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, TicketDeskError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, full_name, role, provider_customer_id, created_at, updated_at FROM users WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find user by the payment provider's customer reference
    pub async fn find_by_customer_reference(&self, customer_id: &str) -> Result<Option<User>, TicketDeskError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, full_name, role, provider_customer_id, created_at, updated_at FROM users WHERE provider_customer_id = $1"
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Update a user's role
    pub async fn set_role(&self, id: i64, role: UserRole) -> Result<User, TicketDeskError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET role = $2, updated_at = $3
            WHERE id = $1
            RETURNING id, email, full_name, role, provider_customer_id, created_at, updated_at
            "#
        )
        .bind(id)
        .bind(role)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Attach the payment provider's customer reference to a user
    pub async fn set_customer_reference(&self, id: i64, customer_id: &str) -> Result<User, TicketDeskError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET provider_customer_id = $2, updated_at = $3
            WHERE id = $1
            RETURNING id, email, full_name, role, provider_customer_id, created_at, updated_at
            "#
        )
        .bind(id)
        .bind(customer_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }
}
