use crate::config::Settings;
use crate::utils::error::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "recipe-api")]
#[command(about = "Recipe API server with token auth, admin pages and OpenAPI docs")]
pub struct Cli {
    #[arg(long, env = "RECIPE_API_CONFIG", help = "Path to a TOML settings file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// 省略時執行 `serve`
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeArgs),
    /// Create a staff account with every permission
    CreateSuperuser(CreateSuperuserArgs),
    /// Write the OpenAPI document
    Schema(SchemaArgs),
    /// Probe a running server's health endpoint
    Healthcheck(HealthcheckArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct ServeArgs {
    #[arg(long, help = "Address to listen on, overrides server.bind")]
    pub bind: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct CreateSuperuserArgs {
    #[arg(long)]
    pub email: String,

    #[arg(long, env = "RECIPE_API_SUPERUSER_PASSWORD")]
    pub password: String,
}

#[derive(Debug, Clone, Default, Args)]
pub struct SchemaArgs {
    #[arg(long, help = "Write to this file instead of stdout")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct HealthcheckArgs {
    #[arg(long, default_value = "http://127.0.0.1:8000/healthz")]
    pub url: String,

    #[arg(long, default_value = "5")]
    pub timeout_seconds: u64,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Serve(ServeArgs::default()))
    }

    /// 檔案 → 環境變數 → 命令列，後者覆蓋前者
    pub fn load_settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::from_file(path)?,
            None => Settings::default(),
        };
        settings.apply_env_overrides();

        if let Command::Serve(ServeArgs { bind: Some(bind) }) = self.command() {
            settings.server.bind = bind;
        }
        Ok(settings)
    }
}
