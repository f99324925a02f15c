use std::sync::Arc;

use crate::config::Config;
use crate::error::AppError;
use crate::repositories::UserStore;
use crate::services::{EmailSender, PasswordPolicy, PasswordResetService};

/// アプリケーション共有状態
///
/// axum の State として全ハンドラーで共有される。
/// Clone は必須（axum が内部で clone するため）。
#[derive(Clone)]
pub struct AppState {
    /// ユーザーストア
    pub user_store: Arc<dyn UserStore>,
    /// パスワードリセットサービス
    pub password_reset_service: PasswordResetService,
    /// パスワード強度ポリシー（ユーザー登録用）
    pub password_policy: PasswordPolicy,
}

impl AppState {
    /// 新しい AppState を作成
    pub fn new(
        config: Config,
        user_store: Arc<dyn UserStore>,
        email_sender: Arc<dyn EmailSender>,
    ) -> Result<Self, AppError> {
        let config = Arc::new(config);
        let password_policy = PasswordPolicy::new(config.password_min_length);
        let password_reset_service =
            PasswordResetService::new(user_store.clone(), email_sender, config)?;

        Ok(Self {
            user_store,
            password_reset_service,
            password_policy,
        })
    }
}
