use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::User;
use crate::repositories::{UserStore, UserStoreError};

/// インメモリのユーザーストア（テスト・ローカル開発用）
#[derive(Default, Clone)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 既存ユーザーをそのまま登録（ID・状態を含めて保持）
    pub async fn insert(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }

    pub async fn get(&self, user_id: Uuid) -> Option<User> {
        self.users.read().await.get(&user_id).cloned()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserStoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id_and_email(
        &self,
        user_id: Uuid,
        email: &str,
    ) -> Result<Option<User>, UserStoreError> {
        let users = self.users.read().await;
        Ok(users.get(&user_id).filter(|u| u.email == email).cloned())
    }

    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, UserStoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == email) {
            return Err(UserStoreError::EmailAlreadyExists);
        }
        if users.values().any(|u| u.username == username) {
            return Err(UserStoreError::UsernameAlreadyExists);
        }

        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: Some(password_hash.to_string()),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_password(
        &self,
        user_id: Uuid,
        new_password_hash: &str,
    ) -> Result<(), UserStoreError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&user_id).ok_or(UserStoreError::UserNotFound)?;
        user.password_hash = Some(new_password_hash.to_string());
        user.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_find_user() {
        let store = InMemoryUserStore::new();
        let user = store
            .create_user("alice", "alice@example.com", "hash")
            .await
            .unwrap();

        let found = store.find_by_email("alice@example.com").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));

        let found = store
            .find_by_id_and_email(user.id, "alice@example.com")
            .await
            .unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_find_by_id_requires_matching_email() {
        let store = InMemoryUserStore::new();
        let user = store
            .create_user("alice", "alice@example.com", "hash")
            .await
            .unwrap();

        let found = store
            .find_by_id_and_email(user.id, "mallory@example.com")
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let store = InMemoryUserStore::new();
        store
            .create_user("alice", "alice@example.com", "hash")
            .await
            .unwrap();

        let result = store
            .create_user("alice2", "alice@example.com", "hash")
            .await;
        assert!(matches!(result, Err(UserStoreError::EmailAlreadyExists)));
    }

    #[tokio::test]
    async fn test_update_password_for_missing_user() {
        let store = InMemoryUserStore::new();
        let result = store.update_password(Uuid::new_v4(), "hash").await;
        assert!(matches!(result, Err(UserStoreError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_update_password() {
        let store = InMemoryUserStore::new();
        let user = store
            .create_user("alice", "alice@example.com", "old")
            .await
            .unwrap();

        store.update_password(user.id, "new").await.unwrap();

        let updated = store.get(user.id).await.unwrap();
        assert_eq!(updated.password_hash.as_deref(), Some("new"));
    }
}
