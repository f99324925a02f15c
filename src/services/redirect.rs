use std::sync::Arc;

use garde::Validate;
use regex::Regex;

use crate::error::AppError;

/// URL形式の検証用
#[derive(Validate)]
struct RedirectTarget {
    #[garde(url, custom(http_url))]
    redirect_url: String,
}

/// http(s) の絶対URLで、メール本文に埋め込めない文字を含まないこと
fn http_url(value: &str, _ctx: &()) -> garde::Result {
    let lower = value.to_ascii_lowercase();
    if !(lower.starts_with("http://") || lower.starts_with("https://")) {
        return Err(garde::Error::new("http または https のURLではありません"));
    }
    if value
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '<' | '>' | '"'))
    {
        return Err(garde::Error::new("URLに使用できない文字が含まれています"));
    }
    Ok(())
}

/// リダイレクトURLの許可リスト
///
/// 各パターンはURL先頭に固定して照合する（設定順、最初の一致で許可）。
#[derive(Clone)]
pub struct RedirectValidator {
    patterns: Arc<Vec<Regex>>,
}

impl RedirectValidator {
    /// パターンをコンパイルして作成
    ///
    /// # Errors
    /// 正規表現として不正なパターンが含まれる場合
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| Regex::new(&format!("^(?:{})", p.as_ref())))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            patterns: Arc::new(patterns),
        })
    }

    /// リダイレクトURLを検証し、許可されていればそのまま返す
    ///
    /// 空 → `MissingValue`、URLとして不正 → `Validation`、許可リスト外 → `InvalidRedirect`
    pub fn validate<'a>(&self, url: &'a str) -> Result<&'a str, AppError> {
        if url.trim().is_empty() {
            return Err(AppError::MissingValue);
        }

        RedirectTarget {
            redirect_url: url.to_string(),
        }
        .validate()
        .map_err(|report| {
            tracing::warn!(report = %report, "リダイレクトURL形式エラー");
            AppError::Validation {
                field: "redirect_url",
                message: "有効なURLを入力してください".to_string(),
            }
        })?;

        if self.patterns.iter().any(|p| p.is_match(url)) {
            return Ok(url);
        }

        tracing::warn!(redirect_url = %url, "許可されていないリダイレクトURL");
        Err(AppError::InvalidRedirect)
    }
}
