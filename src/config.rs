use secrecy::SecretBox;
use serde::Deserialize;
use serde::de::Error as _;
use time::Duration;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub database_url: SecretBox<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    /// JWT署名キー（リセットトークンの発行・検証で共有）
    pub secret_key: SecretBox<String>,

    // パスワードリセット設定
    /// リセットトークンの有効日数（1〜365）
    #[serde(default = "default_password_reset_timeout_days")]
    pub password_reset_timeout_days: u32,
    /// 許可するリダイレクトURLの正規表現（カンマ区切り、先頭一致）
    #[serde(default = "default_password_reset_allowed_url_patterns")]
    pub password_reset_allowed_url_patterns: Vec<String>,
    #[serde(default = "default_password_reset_email_subject")]
    pub password_reset_email_subject: String,
    #[serde(default = "default_password_min_length")]
    pub password_min_length: usize,

    // メール設定
    /// 送信元アドレス
    #[serde(default = "default_email_host_user")]
    pub email_host_user: String,
    // SMTP設定（オプション - email機能有効時のみ使用）
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_username: Option<SecretBox<String>>,
    pub smtp_password: Option<SecretBox<String>>,
}

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_PASSWORD_RESET_TIMEOUT_DAYS: u32 = 1;
const MAX_PASSWORD_RESET_TIMEOUT_DAYS: u32 = 365;
const DEFAULT_ALLOWED_URL_PATTERN: &str = r"^https?://localhost(:\d+)?/";
const DEFAULT_PASSWORD_RESET_EMAIL_SUBJECT: &str = "パスワード再設定のご案内";
const DEFAULT_PASSWORD_MIN_LENGTH: usize = 8;
const DEFAULT_EMAIL_HOST_USER: &str = "noreply@localhost";

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

fn default_password_reset_timeout_days() -> u32 {
    DEFAULT_PASSWORD_RESET_TIMEOUT_DAYS
}

fn default_password_reset_allowed_url_patterns() -> Vec<String> {
    vec![DEFAULT_ALLOWED_URL_PATTERN.to_string()]
}

fn default_password_reset_email_subject() -> String {
    DEFAULT_PASSWORD_RESET_EMAIL_SUBJECT.to_string()
}

fn default_password_min_length() -> usize {
    DEFAULT_PASSWORD_MIN_LENGTH
}

fn default_email_host_user() -> String {
    DEFAULT_EMAIL_HOST_USER.to_string()
}

impl Config {
    pub fn load() -> Result<Self, envy::Error> {
        envy::from_env::<Self>()?.validated()
    }

    /// 任意のキー/値の組から設定を読み込む（テスト・埋め込み用）
    pub fn from_vars<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Self>(vars)?.validated()
    }

    /// 値の範囲チェック（起動時に不正な設定を弾く）
    fn validated(self) -> Result<Self, envy::Error> {
        if !(1..=MAX_PASSWORD_RESET_TIMEOUT_DAYS).contains(&self.password_reset_timeout_days) {
            return Err(envy::Error::custom(format!(
                "PASSWORD_RESET_TIMEOUT_DAYS must be between 1 and {}, got {}",
                MAX_PASSWORD_RESET_TIMEOUT_DAYS, self.password_reset_timeout_days
            )));
        }
        Ok(self)
    }

    /// リセットトークンの有効期間
    pub fn password_reset_ttl(&self) -> Duration {
        Duration::days(i64::from(self.password_reset_timeout_days))
    }

    /// メール本文に表示する有効時間
    pub fn password_reset_valid_hours(&self) -> i64 {
        i64::from(self.password_reset_timeout_days) * 24
    }
}
