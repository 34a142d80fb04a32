mod cli;
mod format;
mod presenter;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;

use cli::{Cli, Commands};
use presenter::ConsolePresenter;
use tubecore::core::{config, init_logger};
use tubecore::{ClientConfig, FormatSelector, Notice, PollerState, PresentationPort, TaskController};

/// Entry point of the tubedeck CLI.
///
/// User-facing failures are printed by the presenter and turned into a
/// non-zero exit code; only setup errors (logging, configuration) bubble
/// up as `Err`.
#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment variables from .env if present
    let _ = dotenv();

    let cli = Cli::parse_args();

    let level = cli.log_level.clone().unwrap_or_else(config::log_level_from_env);
    init_logger(&level, config::log_file_from_env().as_deref())?;

    let mut client_config = ClientConfig::from_env()?;
    if let Some(server) = &cli.server {
        client_config = client_config.server_url(server)?;
    }

    let auto_confirm = matches!(cli.command, Commands::Delete { yes: true, .. });
    let presenter: Arc<dyn PresentationPort> = Arc::new(ConsolePresenter::new(auto_confirm));
    let controller = TaskController::from_config(&client_config, Arc::clone(&presenter))?;

    let ok = match cli.command {
        Commands::Info { url } => controller.fetch_info(&url).await.is_ok(),
        Commands::Download { url, format, audio } => run_download(&controller, &url, &format, audio).await,
        Commands::List => match controller.start().await {
            Ok(_) => true,
            Err(e) => {
                presenter.notify(&Notice::from_error(&e));
                false
            }
        },
        Commands::Delete { name, .. } => matches!(controller.delete_file(&name).await, Ok(true)),
        Commands::Link { name } => match controller.artifact_url(&name) {
            Ok(url) => {
                println!("{}", url);
                true
            }
            Err(e) => {
                presenter.notify(&Notice::from_error(&e));
                false
            }
        },
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Submits the task and follows it until it settles or the user hits Ctrl-C.
async fn run_download(controller: &TaskController, url: &str, format: &str, audio_only: bool) -> bool {
    let task_id = match controller
        .start_download(url, FormatSelector::parse(format), audio_only)
        .await
    {
        Ok(id) => id,
        Err(_) => return false,
    };
    println!("Task {} started", task_id);

    let settled = tokio::select! {
        state = controller.poller().settled() => state,
        _ = tokio::signal::ctrl_c() => {
            log::info!("Interrupted, no longer following task {}", task_id);
            controller.cancel();
            println!("Stopped following task {}; the service keeps downloading", task_id);
            return false;
        }
    };

    match settled {
        PollerState::Completed { .. } => {
            if let Some(file) = controller.registry().listing().first() {
                if let Ok(link) = controller.artifact_url(&file.name) {
                    println!("Latest file: {} ({})", file.name, link);
                }
            }
            true
        }
        PollerState::Errored { .. } | PollerState::Idle | PollerState::Polling { .. } => false,
    }
}
