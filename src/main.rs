use std::net::SocketAddr;
use std::sync::Arc;

use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use quillgate::{
    config::Config,
    repositories::UserRepository,
    router::create_router,
    services::{EmailSender, LogEmailSender},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ログ初期化（JSON形式、環境変数でレベル制御）
    init_tracing();

    tracing::info!("quillgate 起動中...");

    // 設定読み込み
    let config = Config::load().map_err(|e| {
        tracing::error!(error = ?e, "設定の読み込みに失敗");
        anyhow::anyhow!("Failed to load config: {}", e)
    })?;

    tracing::info!(
        host = %config.host,
        port = %config.port,
        reset_timeout_days = config.password_reset_timeout_days,
        "設定読み込み完了"
    );

    // サーバーアドレスを先に構築（config が move される前に）
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| {
            tracing::error!(error = ?e, "アドレスのパースに失敗");
            anyhow::anyhow!("Failed to parse address: {}", e)
        })?;

    // データベース接続プール作成
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(config.database_url.expose_secret())
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "データベース接続に失敗");
            anyhow::anyhow!("Failed to connect to database: {}", e)
        })?;

    tracing::info!("データベース接続完了");

    let user_store = Arc::new(UserRepository::new(db_pool));
    let email_sender = build_email_sender(&config)?;

    // AppState 構築
    let state = AppState::new(config, user_store, email_sender).map_err(|e| {
        tracing::error!(error = ?e, "AppState の構築に失敗");
        anyhow::anyhow!("Failed to create AppState: {}", e)
    })?;

    let app = create_router(state);

    // サーバー起動
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        tracing::error!(error = ?e, addr = %addr, "ポートのバインドに失敗");
        anyhow::anyhow!("Failed to bind to {}: {}", addr, e)
    })?;

    tracing::info!(addr = %addr, "サーバー起動");

    // Graceful shutdown 対応
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "サーバーエラー");
            anyhow::anyhow!("Server error: {}", e)
        })?;

    tracing::info!("サーバー終了");

    Ok(())
}

/// tracing の初期化（JSON形式）
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,quillgate=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// メール送信手段の選択
///
/// email 機能有効かつ SMTP_HOST 設定時のみ SMTP を使い、それ以外はログ出力のみ
fn build_email_sender(config: &Config) -> anyhow::Result<Arc<dyn EmailSender>> {
    #[cfg(feature = "email")]
    if let Some(host) = &config.smtp_host {
        let sender = quillgate::services::email::SmtpEmailSender::new(
            host,
            config.smtp_port,
            config
                .smtp_username
                .as_ref()
                .map(|s| s.expose_secret().clone()),
            config
                .smtp_password
                .as_ref()
                .map(|s| s.expose_secret().clone()),
        )
        .map_err(|e| {
            tracing::error!(error = ?e, "SMTPクライアントの初期化に失敗");
            anyhow::anyhow!("Failed to build SMTP client: {}", e)
        })?;

        tracing::info!(smtp_host = %host, "SMTP メール送信を使用");
        return Ok(Arc::new(sender));
    }

    if config.smtp_host.is_some() {
        tracing::warn!("SMTP_HOST が設定されていますが email 機能が無効です（ログ出力のみ）");
    } else {
        tracing::info!("メール送信は開発モード（ログ出力のみ）");
    }

    Ok(Arc::new(LogEmailSender::new()))
}

/// Graceful shutdown シグナル待機
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = ?e, "Ctrl+C ハンドラーのインストールに失敗");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = ?e, "SIGTERM ハンドラーのインストールに失敗");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("SIGTERM received, starting graceful shutdown");
        }
    }
}
