use axum::{Json, extract::State, http::StatusCode};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::services::auth::hash_password;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[garde(length(min = 1, max = 150))]
    pub username: String,
    #[serde(default)]
    #[garde(email)]
    pub email: String,
    #[serde(default)]
    #[garde(skip)]
    pub password: String, // SecretBox不要（Deserialize後すぐハッシュ化）
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

/// ユーザー登録ハンドラー
///
/// POST /users/
///
/// # Security
/// - パスワードはログに出力しない
/// - パスワードは即座にハッシュ化
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    // バリデーション
    validate_register_request(&request)?;
    state
        .password_policy
        .check(&request.password)
        .map_err(AppError::WeakPassword)?;

    // パスワードハッシュ化
    let password_hash = hash_password(&request.password)?;

    // ユーザー作成
    let user = state
        .user_store
        .create_user(request.username.trim(), &request.email, &password_hash)
        .await?;

    tracing::info!(user_id = %user.id, email = %user.email, "ユーザー登録成功");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: user.id,
            username: user.username,
            email: user.email,
        }),
    ))
}

/// 登録リクエストのバリデーション
fn validate_register_request(request: &RegisterRequest) -> Result<(), AppError> {
    if request.username.trim().is_empty() {
        return Err(AppError::Validation {
            field: "username",
            message: "ユーザー名は必須です".to_string(),
        });
    }
    if request.email.trim().is_empty() {
        return Err(AppError::Validation {
            field: "email",
            message: "メールアドレスは必須です".to_string(),
        });
    }
    request.validate().map_err(|report| {
        let field = if report.iter().any(|(path, _)| path.to_string() == "email") {
            "email"
        } else {
            "username"
        };
        AppError::Validation {
            field,
            message: report.to_string(),
        }
    })
}
