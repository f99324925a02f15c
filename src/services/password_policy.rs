/// よく使われるパスワード（小文字で比較）
const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "password1",
    "password123",
    "passw0rd",
    "12345678",
    "123456789",
    "1234567890",
    "qwerty123",
    "qwertyuiop",
    "iloveyou",
    "sunshine",
    "princess",
    "football",
    "baseball",
    "welcome1",
    "letmein1",
    "trustno1",
    "superman",
    "starwars",
    "abc12345",
    "11111111",
    "00000000",
    "admin123",
    "changeme",
];

/// パスワード強度ポリシー
///
/// 最低文字数・数字のみ禁止・よく使われるパスワード禁止の3条件を検査する。
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    min_length: usize,
}

impl PasswordPolicy {
    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }

    /// パスワードを検査し、違反した条件のメッセージをすべて返す
    pub fn check(&self, password: &str) -> Result<(), Vec<String>> {
        let mut messages = Vec::new();

        if password.chars().count() < self.min_length {
            messages.push(format!(
                "このパスワードは短すぎます。最低 {} 文字以上必要です。",
                self.min_length
            ));
        }

        let lowered = password.trim().to_lowercase();
        if COMMON_PASSWORDS.contains(&lowered.as_str()) {
            messages.push("このパスワードは一般的すぎます。".to_string());
        }

        if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
            messages.push("このパスワードは数字しか使われていません。".to_string());
        }

        if messages.is_empty() {
            Ok(())
        } else {
            Err(messages)
        }
    }
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::new(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strong_password() {
        assert!(PasswordPolicy::default().check("correct-horse-7").is_ok());
    }

    #[test]
    fn test_short_password() {
        let messages = PasswordPolicy::default().check("a1b2").unwrap_err();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains('8'));
    }

    #[test]
    fn test_common_password_is_case_insensitive() {
        let messages = PasswordPolicy::default().check("PassWord123").unwrap_err();
        assert_eq!(messages, vec!["このパスワードは一般的すぎます。".to_string()]);
    }

    #[test]
    fn test_numeric_password_reports_every_violation() {
        // 12345678 は一般的かつ数字のみ
        let messages = PasswordPolicy::default().check("12345678").unwrap_err();
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn test_custom_min_length() {
        let policy = PasswordPolicy::new(12);
        assert!(policy.check("river-stone9").is_ok());
        assert!(policy.check("river-ston9").is_err());
    }
}
