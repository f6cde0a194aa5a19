//! Account persistence
//!
//! Email and nickname uniqueness is enforced by the store itself. Callers may
//! pre-check, but only the write decides: a duplicate insert fails with
//! [`AuthError::DuplicateEmail`] or [`AuthError::DuplicateNickname`].

mod memory;
mod postgres;

pub use memory::MemoryAccountRepository;
pub use postgres::{run_migrations, PgAccountRepository};

use crate::error::AuthError;
use crate::models::{Account, NewAccount, Role};

use async_trait::async_trait;
use uuid::Uuid;

/// Durable account storage
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Insert a new active account.
    async fn create(&self, account: NewAccount) -> Result<Account, AuthError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AuthError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AuthError>;

    async fn find_by_nickname(&self, nickname: &str) -> Result<Option<Account>, AuthError>;

    /// Replace the password hash. Fails with `AccountNotFound` for an unknown id.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AuthError>;

    /// Replace the role. Fails with `AccountNotFound` for an unknown id.
    async fn update_role(&self, id: Uuid, role: Role) -> Result<Account, AuthError>;
}
