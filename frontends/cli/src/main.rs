use admirror::{FileSyncStateStore, MemoryMirror, SyncConfig, SyncService};
use admirror_api::{EntityKind, SyncEvent};
use admirror_upstream::HttpFetcherFactory;
use anyhow::{Context, Result};
use futures::StreamExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const CONFIG_ENV: &str = "ADMIRROR_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Stream,
    Blocking,
    Status,
}

fn default_log_path() -> PathBuf {
    // ~/.config/admirror/admirror.log or ./admirror.log
    if let Some(home) = std::env::var_os("HOME") {
        let mut path = PathBuf::from(home);
        path.push(".config");
        path.push("admirror");
        std::fs::create_dir_all(&path).ok();
        path.push("admirror.log");
        path
    } else {
        PathBuf::from("admirror.log")
    }
}

fn open_log_file(path: &Path) -> Option<File> {
    OpenOptions::new().create(true).append(true).open(path).ok()
}

/// File logging; stderr when the file cannot be opened
fn init_logging(log_file: Option<&Path>) {
    let log_file_path = log_file
        .map(Path::to_path_buf)
        .unwrap_or_else(default_log_path);

    // Default to INFO level, can be overridden with RUST_LOG env var
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match open_log_file(&log_file_path) {
        Some(file) => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(file).with_ansi(false))
            .init(),
        None => {
            eprintln!(
                "Warning: Could not open log file {:?}, logging to stderr",
                log_file_path
            );
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn parse_args() -> (Option<PathBuf>, Mode) {
    let mut config_path: Option<PathBuf> = None;
    let mut mode = Mode::Stream;

    // Simple argument parsing: --blocking | --status | <config_path>
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--blocking" | "-b" => mode = Mode::Blocking,
            "--status" | "-s" => mode = Mode::Status,
            other if !other.starts_with('-') => config_path = Some(PathBuf::from(other)),
            other => eprintln!("Ignoring unknown option {}", other),
        }
    }

    if config_path.is_none() {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            config_path = Some(PathBuf::from(env_path));
        }
    }
    (config_path, mode)
}

fn load_config(path: Option<&Path>) -> Result<SyncConfig> {
    let mut config = match path {
        Some(path) => SyncConfig::load_from_file(path)?,
        None => SyncConfig::default(),
    };
    config.apply_env_overrides()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let (config_path, mode) = parse_args();
    let config = load_config(config_path.as_deref()).context("Failed to load configuration")?;
    init_logging(config.log_file.as_deref());
    info!(
        "[admirror] Starting in {:?} mode against {}",
        mode, config.api_base_url
    );

    let mirror = Arc::new(MemoryMirror::new());
    let service = SyncService::new(
        config.rate_limit(),
        mirror.clone(),
        Arc::new(HttpFetcherFactory::new(config.clone())),
        Arc::new(FileSyncStateStore::new(config.state_file.clone())),
    )
    .await
    .context("Failed to initialize sync service")?;

    match mode {
        Mode::Status => {
            println!("{}", serde_json::to_string_pretty(&service.status().await)?);
        }
        Mode::Blocking => {
            config.validate()?;
            let response = service.run_blocking().await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            print_mirror_summary(&mirror).await;
        }
        Mode::Stream => {
            config.validate()?;
            // The stream ends once the background run has also persisted its state
            let mut events = service.run_streaming().await?;
            let mut overall_success = false;
            while let Some(event) = events.next().await {
                print!("{}", event.to_sse_frame()?);
                if let SyncEvent::Complete {
                    overall_success: success,
                    ..
                } = event
                {
                    overall_success = success;
                }
            }
            print_mirror_summary(&mirror).await;
            if !overall_success {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

async fn print_mirror_summary(mirror: &MemoryMirror) {
    for kind in EntityKind::ALL {
        eprintln!("{:>16}: {}", kind.key(), mirror.count(kind).await);
    }
}
