use std::sync::Arc;

use askama::Template;
use garde::Validate;
use secrecy::ExposeSecret;
use time::OffsetDateTime;

use crate::config::Config;
use crate::error::AppError;
use crate::models::User;
use crate::repositories::UserStore;
use crate::services::auth::hash_password;
use crate::services::email::{EmailMessage, EmailSender, PasswordResetEmail};
use crate::services::password_policy::PasswordPolicy;
use crate::services::redirect::RedirectValidator;
use crate::services::reset_token::{ResetClaims, ResetTokenCodec};

/// メールアドレス形式の検証用
#[derive(Validate)]
struct ResetEmailAddress {
    #[garde(email)]
    email: String,
}

/// パスワードリセットサービス
///
/// リセットトークンはDBに保存しない（署名付きJWTが状態を持つ）。
/// そのため有効期限内のトークンは再利用できる。
#[derive(Clone)]
pub struct PasswordResetService {
    user_store: Arc<dyn UserStore>,
    email_sender: Arc<dyn EmailSender>,
    token_codec: ResetTokenCodec,
    redirect_validator: RedirectValidator,
    password_policy: PasswordPolicy,
    config: Arc<Config>,
}

impl PasswordResetService {
    /// 新しい PasswordResetService を作成
    ///
    /// 署名キー・許可リダイレクトURL・パスワードポリシーは設定から構築する
    pub fn new(
        user_store: Arc<dyn UserStore>,
        email_sender: Arc<dyn EmailSender>,
        config: Arc<Config>,
    ) -> Result<Self, AppError> {
        let token_codec = ResetTokenCodec::new(config.secret_key.expose_secret().as_bytes());
        let redirect_validator =
            RedirectValidator::new(&config.password_reset_allowed_url_patterns).map_err(|e| {
                tracing::error!(error = %e, "許可リダイレクトURLパターンのコンパイルに失敗");
                AppError::Internal(anyhow::anyhow!("invalid redirect url pattern: {}", e))
            })?;
        let password_policy = PasswordPolicy::new(config.password_min_length);

        Ok(Self {
            user_store,
            email_sender,
            token_codec,
            redirect_validator,
            password_policy,
            config,
        })
    }

    /// パスワードリセットをリクエスト
    ///
    /// # Security
    /// - ユーザーが存在しない場合も常に成功を返す（情報漏洩防止）
    /// - 無効化されたアカウントは `InactiveAccount` を返す（存在が判明する点に注意）
    /// - トークンはログに出力しない
    pub async fn request_reset(&self, email: &str, redirect_url: &str) -> Result<(), AppError> {
        let redirect_url = self.redirect_validator.validate(redirect_url)?;

        ResetEmailAddress {
            email: email.to_string(),
        }
        .validate()
        .map_err(|report| {
            tracing::debug!(report = %report, "メールアドレス形式エラー");
            AppError::Validation {
                field: "email",
                message: "有効なメールアドレスを入力してください".to_string(),
            }
        })?;

        tracing::info!(email = %email, "パスワードリセットリクエスト");

        let user = self.user_store.find_by_email(email).await.map_err(|e| {
            tracing::error!(error = ?e, "ユーザー検索エラー");
            AppError::ResetProcessingFailed
        })?;

        let Some(user) = user else {
            tracing::info!(email = %email, "パスワードリセット: ユーザー不在（成功レスポンス返却）");
            return Ok(());
        };

        if !user.is_active {
            tracing::warn!(user_id = %user.id, "パスワードリセット: 無効化されたアカウント");
            return Err(AppError::InactiveAccount);
        }

        self.send_reset_email(&user, redirect_url)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user.id, error = ?e, "パスワードリセット処理エラー");
                AppError::ResetProcessingFailed
            })?;

        tracing::info!(user_id = %user.id, email = %user.email, "パスワードリセットメール送信完了");

        Ok(())
    }

    /// パスワードを再設定
    ///
    /// # Security
    /// - トークン・新パスワードはログに出力しない
    /// - パスワード不一致はトークン検証より先に判定する
    pub async fn confirm_reset(
        &self,
        token: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<(), AppError> {
        if new_password != confirm_password {
            return Err(AppError::PasswordMismatch);
        }

        self.password_policy
            .check(new_password)
            .map_err(AppError::WeakPassword)?;

        let claims = self.token_codec.decode(token).inspect_err(|e| {
            tracing::warn!(reason = %e, "リセットトークン検証失敗");
        })?;

        // 改ざん対策: 埋め込まれたリダイレクトURLを再検証
        if self
            .redirect_validator
            .validate(&claims.redirect_url)
            .is_err()
        {
            tracing::warn!(user_id = %claims.user_id, "トークン内のリダイレクトURLが不正");
            return Err(AppError::TokenInvalid);
        }

        let user = self
            .user_store
            .find_by_id_and_email(claims.user_id, &claims.email)
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, "ユーザー検索エラー");
                AppError::ResetSaveFailed
            })?
            .ok_or_else(|| {
                tracing::warn!(user_id = %claims.user_id, "トークンに対応するユーザーが存在しない");
                AppError::TokenInvalid
            })?;

        if !user.is_active {
            tracing::warn!(user_id = %user.id, "パスワード再設定: 無効化されたアカウント");
            return Err(AppError::TokenAccountInactive);
        }

        let password_hash = hash_password(new_password).map_err(|_| AppError::ResetSaveFailed)?;

        self.user_store
            .update_password(user.id, &password_hash)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user.id, error = ?e, "パスワード更新エラー");
                AppError::ResetSaveFailed
            })?;

        tracing::info!(user_id = %user.id, email = %user.email, "パスワードリセット完了");

        Ok(())
    }

    /// トークン発行・メール本文生成・送信
    async fn send_reset_email(&self, user: &User, redirect_url: &str) -> anyhow::Result<()> {
        let claims = ResetClaims::new(
            user,
            redirect_url,
            OffsetDateTime::now_utc(),
            self.config.password_reset_ttl(),
        );
        let token = self.token_codec.encode(&claims)?;

        let reset_url = format!("{}?token={}", redirect_url, token);

        let body = PasswordResetEmail {
            user,
            reset_url: &reset_url,
            valid_hours: self.config.password_reset_valid_hours(),
        }
        .render()?;

        let message = EmailMessage {
            from: self.config.email_host_user.clone(),
            to: user.email.clone(),
            subject: self.config.password_reset_email_subject.clone(),
            body,
        };
        self.email_sender.send(&message).await?;

        Ok(())
    }
}
