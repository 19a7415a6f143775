use clap::Parser;
use recipe_api::commands;
use recipe_api::utils::{logger, validation::Validate};
use recipe_api::{AppError, Cli, Command};
use std::time::Duration;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("❌ {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let settings = cli.load_settings()?;

    // 初始化日誌
    if settings.logging.json {
        logger::init_container_logger(&settings.logging.level, cli.verbose);
    } else {
        logger::init_cli_logger(&settings.logging.level, cli.verbose);
    }

    // 驗證配置
    settings.validate()?;
    if cli.verbose {
        tracing::debug!("Settings: {:?}", settings);
    }

    match cli.command() {
        Command::Serve(_) => {
            tracing::info!("Starting recipe-api {}", env!("CARGO_PKG_VERSION"));
            commands::serve(settings).await
        }
        Command::CreateSuperuser(args) => {
            commands::create_superuser(settings, &args.email, &args.password).await
        }
        Command::Schema(args) => commands::write_schema(&settings, args.output.as_deref()),
        Command::Healthcheck(args) => {
            commands::run_healthcheck(&args.url, Duration::from_secs(args.timeout_seconds)).await
        }
    }
}
