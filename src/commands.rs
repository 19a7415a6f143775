//! CLI 子命令的實作

use crate::config::Settings;
use crate::http::{api_document, build_router, AppState};
use crate::utils::error::{AppError, Result};
use crate::utils::validation::validate_url;
use std::path::Path;
use std::time::Duration;
use tokio::net::TcpListener;

pub async fn serve(settings: Settings) -> Result<()> {
    let addr = settings.bind_addr()?;
    let state = AppState::from_settings(settings)?;
    let router = build_router(state)?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("🚀 Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("❌ Failed to listen for shutdown signal: {}", e);
    }
}

/// 帳號必須寫進快照檔，否則程序結束後就消失
pub async fn create_superuser(settings: Settings, email: &str, password: &str) -> Result<()> {
    if settings.storage.data_path.is_none() {
        return Err(AppError::ConfigError {
            message: "create-superuser needs storage.data_path (or RECIPE_API_DATA_PATH)"
                .to_string(),
        });
    }
    let state = AppState::from_settings(settings)?;
    if state.users.exists(email).await? {
        return Err(AppError::field("email", "user with this email already exists."));
    }
    let user = state.users.create_superuser(email, password).await?;
    println!("✅ Superuser created: {}", user);
    Ok(())
}

/// 輸出 OpenAPI 文件；停用文件時視為設定錯誤
pub fn write_schema(settings: &Settings, output: Option<&Path>) -> Result<()> {
    let document = api_document(settings)?.ok_or_else(|| AppError::ConfigError {
        message: "schema generation is disabled (schema.default_schema_class = \"none\")".to_string(),
    })?;
    let content = serde_json::to_string_pretty(&document)?;

    match output {
        Some(path) => {
            std::fs::write(path, content)?;
            tracing::info!("📁 Schema written to {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

/// 對 `/healthz` 發出請求，非 2xx 視為失敗
pub async fn run_healthcheck(url: &str, timeout: Duration) -> Result<()> {
    validate_url("url", url)?;

    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let response = client.get(url).send().await?;
    let status = response.status();

    if !status.is_success() {
        return Err(AppError::IoError(std::io::Error::other(format!(
            "health endpoint {} answered {}",
            url, status
        ))));
    }

    tracing::debug!("💚 {} answered {}", url, status);
    Ok(())
}
