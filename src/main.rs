use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use filedeck::cli::{Cli, Command};
use filedeck::commands::{self, files, transfers, Context};
use filedeck::config;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Load configuration (embedded defaults -> filedeck.toml -> FILEDECK_CONFIG/--config -> env/.env)
    let app_cfg = config::load(cli.config.as_deref())?;

    // Logging (stderr + tägliche Datei-Rotation im konfigurierten Verzeichnis)
    std::fs::create_dir_all(&app_cfg.logging.dir).ok();
    let (stderr_nb, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());
    let file_appender = tracing_appender::rolling::daily(&app_cfg.logging.dir, "filedeck.log");
    let (file_nb, file_guard) = tracing_appender::non_blocking(file_appender);
    // Fortschrittszeile und Log teilen sich stderr; die Datei bekommt weiterhin alles
    let stderr_level = commands::stderr_log_level(&cli.command, commands::status_format(&app_cfg, cli.json));
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| app_cfg.logging.filter.as_str().into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(stderr_nb).with_filter(stderr_level))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file_nb))
        .init();
    // Guards am Leben halten (nicht fallen lassen), damit Non-Blocking Writer korrekt flushen
    let _log_guards = (stderr_guard, file_guard);

    let ctx = Context::new(app_cfg, cli.json)?;
    info!(base_url = %ctx.config.api.base_url, "using file manager API");

    let outcome = match &cli.command {
        Command::Ls { folder, sort, order, view } => files::list(&ctx, folder, *sort, *order, *view).await.map(|out| {
            print!("{}", out);
            true
        }),
        Command::Mkdir { name, folder } => files::mkdir(&ctx, name, folder).await.map(|msg| {
            println!("{}", msg);
            true
        }),
        Command::Rm { id, yes, parent } => files::remove(&ctx, *id, *yes, *parent).await.map(|msg| {
            println!("{}", msg);
            true
        }),
        Command::Upload { paths, folder } => transfers::upload(&ctx, paths, folder).await.map(|result| {
            if let Some(err) = &result.error {
                error!(completed = result.completed_count, error = %err, "upload batch failed");
            }
            result.is_success()
        }),
        Command::Download { ids, out, parent } => transfers::download(&ctx, ids, out, *parent).await.map(|result| {
            if let Some(err) = &result.error {
                error!(completed = result.completed_count, error = %err, "download batch failed");
            }
            result.is_success()
        }),
    };

    info!(metrics = ?ctx.metrics.get_snapshot(), "done");

    match outcome {
        Ok(true) => Ok(ExitCode::SUCCESS),
        Ok(false) => Ok(ExitCode::FAILURE),
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
