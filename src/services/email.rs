use std::sync::Arc;

use askama::Template;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::models::User;

/// 送信するメール
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    /// HTML本文（リセットURLを含むためログ出力禁止）
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("無効なメールアドレス: {0}")]
    InvalidAddress(String),

    #[error("メール送信エラー: {0}")]
    Transport(String),
}

/// メール送信の抽象
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

/// パスワードリセットメールのテンプレート
#[derive(Template)]
#[template(path = "password_reset_email.html")]
pub struct PasswordResetEmail<'a> {
    pub user: &'a User,
    pub reset_url: &'a str,
    pub valid_hours: i64,
}

/// メール送信サービス（開発環境: ログ出力のみ）
#[derive(Clone, Default)]
pub struct LogEmailSender;

impl LogEmailSender {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        // 開発モード: メール送信せずログ出力のみ（本文は出力しない）
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            "メール送信（開発モード）"
        );
        Ok(())
    }
}

/// 送信したメールをメモリに記録する（テスト用）
#[derive(Clone, Default)]
pub struct MemoryEmailSender {
    sent: Arc<Mutex<Vec<EmailMessage>>>,
}

impl MemoryEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl EmailSender for MemoryEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        self.sent.lock().await.push(message.clone());
        Ok(())
    }
}

#[cfg(feature = "email")]
pub use smtp::SmtpEmailSender;

#[cfg(feature = "email")]
mod smtp {
    use async_trait::async_trait;
    use lettre::message::{Mailbox, header::ContentType};
    use lettre::transport::smtp::authentication::Credentials;
    use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

    use super::{EmailError, EmailMessage, EmailSender};

    /// SMTP経由のメール送信（STARTTLS）
    pub struct SmtpEmailSender {
        transport: AsyncSmtpTransport<Tokio1Executor>,
    }

    impl SmtpEmailSender {
        pub fn new(
            host: &str,
            port: u16,
            username: Option<String>,
            password: Option<String>,
        ) -> Result<Self, EmailError> {
            let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| EmailError::Transport(e.to_string()))?
                .port(port);

            if let (Some(username), Some(password)) = (username, password) {
                builder = builder.credentials(Credentials::new(username, password));
            }

            Ok(Self {
                transport: builder.build(),
            })
        }
    }

    fn parse_mailbox(address: &str) -> Result<Mailbox, EmailError> {
        address
            .parse::<Mailbox>()
            .map_err(|e| EmailError::InvalidAddress(e.to_string()))
    }

    #[async_trait]
    impl EmailSender for SmtpEmailSender {
        async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
            let email = Message::builder()
                .from(parse_mailbox(&message.from)?)
                .to(parse_mailbox(&message.to)?)
                .subject(message.subject.clone())
                .header(ContentType::TEXT_HTML)
                .body(message.body.clone())
                .map_err(|e| EmailError::Transport(e.to_string()))?;

            self.transport
                .send(email)
                .await
                .map_err(|e| EmailError::Transport(e.to_string()))?;

            tracing::debug!(to = %message.to, "SMTPメール送信完了");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

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

    #[test]
    fn test_render_password_reset_email() {
        let user = test_user();
        let body = PasswordResetEmail {
            user: &user,
            reset_url: "http://localhost:3000/reset?token=abc.def.ghi",
            valid_hours: 24,
        }
        .render()
        .unwrap();

        assert!(body.contains("alice"));
        assert!(body.contains("http://localhost:3000/reset?token=abc.def.ghi"));
        assert!(body.contains("24 時間"));
    }

    #[tokio::test]
    async fn test_memory_sender_records_messages() {
        let sender = MemoryEmailSender::new();
        let message = EmailMessage {
            from: "noreply@example.com".to_string(),
            to: "alice@example.com".to_string(),
            subject: "件名".to_string(),
            body: "本文".to_string(),
        };

        sender.send(&message).await.unwrap();

        assert_eq!(sender.sent().await, vec![message]);
    }

    #[tokio::test]
    async fn test_log_sender_always_succeeds() {
        let message = EmailMessage {
            from: "noreply@example.com".to_string(),
            to: "alice@example.com".to_string(),
            subject: "件名".to_string(),
            body: "本文".to_string(),
        };
        assert!(LogEmailSender::new().send(&message).await.is_ok());
    }
}
