use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

/// 成功レスポンス
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: &'static str,
}

// === リセットリクエスト ===

#[derive(Debug, Deserialize)]
pub struct ResetRequestRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub redirect_url: String,
}

/// POST /reset-password/
///
/// # Security
/// ユーザー不在でも200を返す（ユーザー存在有無を漏洩しない）
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(request): Json<ResetRequestRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    validate_reset_request(&request)?;

    state
        .password_reset_service
        .request_reset(request.email.trim(), request.redirect_url.trim())
        .await?;

    Ok(Json(StatusResponse {
        status: "success",
        message: "アカウントが存在する場合、パスワード再設定の手順をメールで送信しました",
    }))
}

// === パスワードリセット確定 ===

#[derive(Debug, Deserialize)]
pub struct ResetConfirmRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// POST /reset-password/confirm/
///
/// # Security
/// - token, new_password, confirm_password はログに出力しない
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(request): Json<ResetConfirmRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    validate_confirm_request(&request)?;

    state
        .password_reset_service
        .confirm_reset(
            &request.token,
            &request.new_password,
            &request.confirm_password,
        )
        .await?;

    Ok(Json(StatusResponse {
        status: "success",
        message: "パスワードを再設定しました",
    }))
}

fn required(field: &'static str) -> AppError {
    AppError::Validation {
        field,
        message: "この項目は必須です".to_string(),
    }
}

/// リセットリクエストの必須項目チェック
///
/// redirect_url の空チェックはサービス側（MissingValue）で行う
fn validate_reset_request(request: &ResetRequestRequest) -> Result<(), AppError> {
    if request.email.trim().is_empty() {
        return Err(required("email"));
    }
    Ok(())
}

/// リセット確定リクエストの必須項目チェック
fn validate_confirm_request(request: &ResetConfirmRequest) -> Result<(), AppError> {
    if request.token.trim().is_empty() {
        return Err(required("token"));
    }
    if request.new_password.is_empty() {
        return Err(required("new_password"));
    }
    if request.confirm_password.is_empty() {
        return Err(required("confirm_password"));
    }
    Ok(())
}
