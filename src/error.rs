use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::repositories::UserStoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("バリデーションエラー: {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("データベースエラー")]
    Database(#[from] sqlx::Error),

    #[error("内部エラー")]
    Internal(#[from] anyhow::Error),

    #[error("このメールアドレスは既に使用されています")]
    EmailAlreadyExists,

    // === リセット要求 ===
    #[error("リダイレクトURLは必須です")]
    MissingValue,

    #[error("リダイレクトURLの形式が無効です")]
    InvalidRedirect,

    #[error("このアカウントは無効化されています")]
    InactiveAccount,

    #[error("パスワードリセット要求を処理できませんでした")]
    ResetProcessingFailed,

    // === リセット確定 ===
    #[error("2つのパスワードが一致しません")]
    PasswordMismatch,

    #[error("パスワードが要件を満たしていません")]
    WeakPassword(Vec<String>),

    #[error("リセットトークンの有効期限が切れています")]
    TokenExpired,

    #[error("リセットトークンはまだ有効ではありません")]
    TokenImmature,

    #[error("無効なリセットトークンです")]
    TokenInvalid,

    /// トークンの対象アカウントが無効化されている（`token` キーで返す）
    #[error("このアカウントは無効化されています")]
    TokenAccountInactive,

    #[error("パスワードを再設定できませんでした")]
    ResetSaveFailed,
}

impl From<UserStoreError> for AppError {
    fn from(e: UserStoreError) -> Self {
        match e {
            UserStoreError::EmailAlreadyExists => Self::EmailAlreadyExists,
            UserStoreError::UsernameAlreadyExists => Self::Validation {
                field: "username",
                message: "このユーザー名は既に使用されています".to_string(),
            },
            UserStoreError::UserNotFound => Self::Internal(anyhow::anyhow!("user not found")),
            UserStoreError::Database(e) => Self::Database(e),
        }
    }
}

/// エラーレスポンス
///
/// `{"status": "error", "errors": {"<field>": ["<message>", ...]}}`
#[derive(Serialize)]
struct ErrorResponse {
    status: &'static str,
    errors: BTreeMap<&'static str, Vec<String>>,
}

const NON_FIELD_ERRORS: &str = "non_field_errors";
const INTERNAL_ERROR_MESSAGE: &str = "内部エラーが発生しました";

impl AppError {
    /// レスポンスのステータスコードとフィールド名を決定
    fn status_and_field(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation { field, .. } => (StatusCode::BAD_REQUEST, *field),
            Self::Database(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, NON_FIELD_ERRORS)
            }
            Self::EmailAlreadyExists => (StatusCode::CONFLICT, "email"),
            Self::MissingValue | Self::InvalidRedirect => (StatusCode::BAD_REQUEST, "redirect_url"),
            Self::InactiveAccount => (StatusCode::BAD_REQUEST, "email"),
            Self::ResetProcessingFailed | Self::ResetSaveFailed => {
                (StatusCode::BAD_REQUEST, NON_FIELD_ERRORS)
            }
            Self::PasswordMismatch => (StatusCode::BAD_REQUEST, "password_mismatch"),
            Self::WeakPassword(_) => (StatusCode::BAD_REQUEST, "password_validation"),
            Self::TokenExpired
            | Self::TokenImmature
            | Self::TokenInvalid
            | Self::TokenAccountInactive => (StatusCode::BAD_REQUEST, "token"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, field) = self.status_and_field();

        let messages = match self {
            Self::Validation { message, .. } => vec![message],
            Self::WeakPassword(messages) => messages,
            Self::Database(e) => {
                tracing::error!(error = ?e, "データベースエラー");
                vec![INTERNAL_ERROR_MESSAGE.to_string()]
            }
            Self::Internal(e) => {
                tracing::error!(error = ?e, "内部エラー");
                vec![INTERNAL_ERROR_MESSAGE.to_string()]
            }
            other => vec![other.to_string()],
        };

        let mut errors = BTreeMap::new();
        errors.insert(field, messages);

        (
            status,
            Json(ErrorResponse {
                status: "error",
                errors,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(error: AppError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_token_errors_are_keyed_by_token() {
        let (status, body) = body_json(AppError::TokenExpired).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert_eq!(
            body["errors"]["token"][0],
            "リセットトークンの有効期限が切れています"
        );
    }

    #[tokio::test]
    async fn test_weak_password_lists_every_message() {
        let (status, body) = body_json(AppError::WeakPassword(vec![
            "短すぎます".to_string(),
            "一般的すぎます".to_string(),
        ]))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"]["password_validation"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let (status, body) =
            body_json(AppError::Internal(anyhow::anyhow!("connection refused"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let rendered = body.to_string();
        assert!(!rendered.contains("connection refused"));
        assert_eq!(body["errors"]["non_field_errors"][0], INTERNAL_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_inactive_account_key_depends_on_flow() {
        let (_, body) = body_json(AppError::InactiveAccount).await;
        assert!(body["errors"]["email"].is_array());

        let (status, body) = body_json(AppError::TokenAccountInactive).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["errors"].get("email").is_none());
        assert_eq!(body["errors"]["token"][0], "このアカウントは無効化されています");
    }

    #[tokio::test]
    async fn test_reset_save_failed_is_generic() {
        let (status, body) = body_json(AppError::ResetSaveFailed).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["errors"]["non_field_errors"][0],
            "パスワードを再設定できませんでした"
        );
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let (status, body) = body_json(AppError::from(UserStoreError::EmailAlreadyExists)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["errors"]["email"].is_array());
    }
}
