pub mod memory;
pub mod user;

pub use memory::InMemoryUserStore;
pub use user::UserRepository;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::User;

#[derive(Debug, thiserror::Error)]
pub enum UserStoreError {
    #[error("このメールアドレスは既に使用されています")]
    EmailAlreadyExists,

    #[error("このユーザー名は既に使用されています")]
    UsernameAlreadyExists,

    #[error("ユーザーが見つかりません")]
    UserNotFound,

    #[error("データベースエラー")]
    Database(#[from] sqlx::Error),
}

/// ユーザーストア
///
/// パスワードリセットとユーザー登録が利用する操作のみを持つ。
/// PostgreSQL 実装（[`UserRepository`]）とインメモリ実装（[`InMemoryUserStore`]）がある。
#[async_trait]
pub trait UserStore: Send + Sync {
    /// メールアドレスでユーザーを検索
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserStoreError>;

    /// ユーザーIDとメールアドレスの組でユーザーを検索
    async fn find_by_id_and_email(
        &self,
        user_id: Uuid,
        email: &str,
    ) -> Result<Option<User>, UserStoreError>;

    /// 新しいユーザーを作成
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, UserStoreError>;

    /// パスワードハッシュを更新（単一行の更新）
    ///
    /// # Note
    /// password_hash はログに出力しないこと
    async fn update_password(
        &self,
        user_id: Uuid,
        new_password_hash: &str,
    ) -> Result<(), UserStoreError>;
}
