//! In-memory account repository for tests and single-process setups

use super::AccountRepository;
use crate::error::AuthError;
use crate::models::{Account, AccountStatus, NewAccount, Role};

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryAccountRepository {
    accounts: RwLock<HashMap<Uuid, Account>>,
}

impl MemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the status of an account, e.g. to suspend it.
    pub async fn set_status(&self, id: Uuid, status: AccountStatus) -> Result<(), AuthError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(&id).ok_or(AuthError::AccountNotFound)?;
        account.status = status;
        account.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl AccountRepository for MemoryAccountRepository {
    async fn create(&self, new: NewAccount) -> Result<Account, AuthError> {
        // Check and insert under one write lock.
        let mut accounts = self.accounts.write().await;

        if accounts.values().any(|a| a.email == new.email) {
            return Err(AuthError::DuplicateEmail);
        }
        if accounts.values().any(|a| a.nickname == new.nickname) {
            return Err(AuthError::DuplicateNickname);
        }

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            email: new.email,
            nickname: new.nickname,
            password_hash: new.password_hash,
            role: new.role,
            status: AccountStatus::Active,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(account.id, account.clone());

        Ok(account)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AuthError> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AuthError> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn find_by_nickname(&self, nickname: &str) -> Result<Option<Account>, AuthError> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|a| a.nickname == nickname)
            .cloned())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AuthError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(&id).ok_or(AuthError::AccountNotFound)?;
        account.password_hash = password_hash.to_string();
        account.updated_at = Utc::now();
        Ok(())
    }

    async fn update_role(&self, id: Uuid, role: Role) -> Result<Account, AuthError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(&id).ok_or(AuthError::AccountNotFound)?;
        account.role = role;
        account.updated_at = Utc::now();
        Ok(account.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn new_account(email: &str, nickname: &str) -> NewAccount {
        NewAccount {
            email: email.into(),
            nickname: nickname.into(),
            password_hash: "hash".into(),
            role: Role::BasicUser,
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = MemoryAccountRepository::new();
        let account = repo.create(new_account("a@x.com", "nickA")).await.unwrap();

        assert_eq!(account.status, AccountStatus::Active);
        assert_eq!(
            repo.find_by_email("a@x.com").await.unwrap().unwrap().id,
            account.id
        );
        assert_eq!(
            repo.find_by_nickname("nickA").await.unwrap().unwrap().id,
            account.id
        );
        assert!(repo.find_by_id(account.id).await.unwrap().is_some());
        assert!(repo.find_by_email("b@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicates_rejected_at_write() {
        let repo = MemoryAccountRepository::new();
        repo.create(new_account("a@x.com", "nickA")).await.unwrap();

        assert!(matches!(
            repo.create(new_account("a@x.com", "nickB")).await,
            Err(AuthError::DuplicateEmail)
        ));
        assert!(matches!(
            repo.create(new_account("b@x.com", "nickA")).await,
            Err(AuthError::DuplicateNickname)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_creates_single_winner() {
        let repo = Arc::new(MemoryAccountRepository::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    repo.create(new_account("a@x.com", &format!("nick{i}"))).await
                })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(AuthError::DuplicateEmail) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn test_updates() {
        let repo = MemoryAccountRepository::new();
        let account = repo.create(new_account("a@x.com", "nickA")).await.unwrap();

        repo.update_password(account.id, "new-hash").await.unwrap();
        let updated = repo.update_role(account.id, Role::AuthUser).await.unwrap();

        assert_eq!(updated.password_hash, "new-hash");
        assert_eq!(updated.role, Role::AuthUser);
        assert!(matches!(
            repo.update_role(Uuid::new_v4(), Role::Admin).await,
            Err(AuthError::AccountNotFound)
        ));
    }
}
