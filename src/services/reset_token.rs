use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::User;

/// パスワードリセット用トークンの種別
pub const PASSWORD_RESET_TOKEN_TYPE: &str = "password_reset";

/// リセットトークンのクレーム
///
/// トークン自体が状態をすべて持つため、DBには保存しない
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetClaims {
    pub user_id: Uuid,
    pub email: String,
    pub redirect_url: String,
    /// 有効期限（UNIX秒）
    pub exp: i64,
    /// 発行時刻（UNIX秒）
    pub iat: i64,
    #[serde(rename = "type")]
    pub token_type: String,
}

impl ResetClaims {
    pub fn new(user: &User, redirect_url: &str, issued_at: OffsetDateTime, ttl: Duration) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            redirect_url: redirect_url.to_string(),
            exp: (issued_at + ttl).unix_timestamp(),
            iat: issued_at.unix_timestamp(),
            token_type: PASSWORD_RESET_TOKEN_TYPE.to_string(),
        }
    }
}

/// リセットトークンの署名・検証（HS256）
///
/// # Security
/// - 発行側と検証側で同一インスタンス（同一キー）を共有すること
/// - トークン文字列はログに出力しない
#[derive(Clone)]
pub struct ResetTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl ResetTokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// クレームに署名してトークン文字列を生成
    pub fn encode(&self, claims: &ResetClaims) -> Result<String, jsonwebtoken::errors::Error> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
    }

    /// トークンを検証してクレームを取り出す
    ///
    /// # Errors
    /// - `TokenExpired`: exp を過ぎている
    /// - `TokenImmature`: iat が未来（時計のずれ）
    /// - `TokenInvalid`: 署名不正・形式不正・種別違い
    pub fn decode(&self, token: &str) -> Result<ResetClaims, AppError> {
        let data = decode::<ResetClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => AppError::TokenExpired,
                ErrorKind::ImmatureSignature => AppError::TokenImmature,
                _ => {
                    tracing::debug!(error = ?e, "リセットトークンのデコード失敗");
                    AppError::TokenInvalid
                }
            },
        )?;
        let claims = data.claims;

        if claims.iat > OffsetDateTime::now_utc().unix_timestamp() {
            return Err(AppError::TokenImmature);
        }

        if claims.token_type != PASSWORD_RESET_TOKEN_TYPE {
            return Err(AppError::TokenInvalid);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-key";

    fn test_user() -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn claims_at(issued_at: OffsetDateTime, ttl: Duration) -> ResetClaims {
        ResetClaims::new(&test_user(), "http://localhost:3000/reset", issued_at, ttl)
    }

    #[test]
    fn test_encode_decode() {
        let codec = ResetTokenCodec::new(SECRET);
        let claims = claims_at(OffsetDateTime::now_utc(), Duration::days(1));

        let token = codec.encode(&claims).unwrap();
        let decoded = codec.decode(&token).unwrap();

        assert_eq!(decoded, claims);
        assert_eq!(decoded.exp - decoded.iat, 86_400);
    }

    #[test]
    fn test_claims_use_type_key() {
        let claims = claims_at(OffsetDateTime::now_utc(), Duration::days(1));
        let json = serde_json::to_value(&claims).unwrap();

        assert_eq!(json["type"], PASSWORD_RESET_TOKEN_TYPE);
        assert!(json.get("token_type").is_none());
    }

    #[test]
    fn test_expired_token() {
        let codec = ResetTokenCodec::new(SECRET);
        let issued_at = OffsetDateTime::now_utc() - Duration::days(3);
        let token = codec.encode(&claims_at(issued_at, Duration::days(1))).unwrap();

        assert!(matches!(codec.decode(&token), Err(AppError::TokenExpired)));
    }

    #[test]
    fn test_immature_token() {
        let codec = ResetTokenCodec::new(SECRET);
        let issued_at = OffsetDateTime::now_utc() + Duration::hours(1);
        let token = codec.encode(&claims_at(issued_at, Duration::days(1))).unwrap();

        assert!(matches!(codec.decode(&token), Err(AppError::TokenImmature)));
    }

    #[test]
    fn test_wrong_token_type() {
        let codec = ResetTokenCodec::new(SECRET);
        let mut claims = claims_at(OffsetDateTime::now_utc(), Duration::days(1));
        claims.token_type = "access".to_string();
        let token = codec.encode(&claims).unwrap();

        assert!(matches!(codec.decode(&token), Err(AppError::TokenInvalid)));
    }

    #[test]
    fn test_wrong_secret() {
        let issuer = ResetTokenCodec::new(SECRET);
        let verifier = ResetTokenCodec::new(b"another-secret");
        let token = issuer
            .encode(&claims_at(OffsetDateTime::now_utc(), Duration::days(1)))
            .unwrap();

        assert!(matches!(verifier.decode(&token), Err(AppError::TokenInvalid)));
    }

    #[test]
    fn test_garbage_token() {
        let codec = ResetTokenCodec::new(SECRET);
        assert!(matches!(
            codec.decode("not-a-token"),
            Err(AppError::TokenInvalid)
        ));
        assert!(matches!(codec.decode(""), Err(AppError::TokenInvalid)));
    }
}
