//! PostgreSQL account repository

use super::AccountRepository;
use crate::error::AuthError;
use crate::models::{Account, NewAccount, Role};

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

const EMAIL_CONSTRAINT: &str = "members_email_key";
const NICKNAME_CONSTRAINT: &str = "members_nickname_key";

/// Run database migrations
pub async fn run_migrations(db: &PgPool) -> Result<(), AuthError> {
    tracing::info!("Running authentication database migrations");

    // Create member role enum
    sqlx::query(
        r#"
        DO $$ BEGIN
            CREATE TYPE member_role AS ENUM ('BASIC_USER', 'AUTH_USER', 'ADMIN');
        EXCEPTION
            WHEN duplicate_object THEN null;
        END $$;
        "#,
    )
    .execute(db)
    .await?;

    // Create member status enum
    sqlx::query(
        r#"
        DO $$ BEGIN
            CREATE TYPE member_status AS ENUM ('active', 'suspended', 'withdrawn');
        EXCEPTION
            WHEN duplicate_object THEN null;
        END $$;
        "#,
    )
    .execute(db)
    .await?;

    // Constraint names are matched in `translate_unique_violation`.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS members (
            id UUID PRIMARY KEY,
            email VARCHAR(255) NOT NULL,
            nickname VARCHAR(20) NOT NULL,
            password_hash VARCHAR(255) NOT NULL,
            role member_role NOT NULL DEFAULT 'BASIC_USER',
            status member_status NOT NULL DEFAULT 'active',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CONSTRAINT members_email_key UNIQUE (email),
            CONSTRAINT members_nickname_key UNIQUE (nickname)
        );
        "#,
    )
    .execute(db)
    .await?;

    tracing::info!("Authentication migrations completed successfully");
    Ok(())
}

/// Accounts stored in the `members` table
#[derive(Clone)]
pub struct PgAccountRepository {
    db: PgPool,
}

impl PgAccountRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Map a unique-constraint violation onto the matching duplicate error.
fn translate_unique_violation(err: sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.constraint() {
            Some(EMAIL_CONSTRAINT) => return AuthError::DuplicateEmail,
            Some(NICKNAME_CONSTRAINT) => return AuthError::DuplicateNickname,
            _ => {}
        }
    }
    AuthError::from(err)
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn create(&self, account: NewAccount) -> Result<Account, AuthError> {
        sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO members (id, email, nickname, password_hash, role, status)
            VALUES ($1, $2, $3, $4, $5, 'active')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&account.email)
        .bind(&account.nickname)
        .bind(&account.password_hash)
        .bind(account.role)
        .fetch_one(&self.db)
        .await
        .map_err(translate_unique_violation)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AuthError> {
        let account = sqlx::query_as("SELECT * FROM members WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AuthError> {
        let account = sqlx::query_as("SELECT * FROM members WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(account)
    }

    async fn find_by_nickname(&self, nickname: &str) -> Result<Option<Account>, AuthError> {
        let account = sqlx::query_as("SELECT * FROM members WHERE nickname = $1")
            .bind(nickname)
            .fetch_optional(&self.db)
            .await?;
        Ok(account)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AuthError> {
        let result = sqlx::query(
            "UPDATE members SET password_hash = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(password_hash)
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AuthError::AccountNotFound);
        }
        Ok(())
    }

    async fn update_role(&self, id: Uuid, role: Role) -> Result<Account, AuthError> {
        sqlx::query_as::<_, Account>(
            "UPDATE members SET role = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(role)
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AuthError::AccountNotFound)
    }
}
