use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use readr::api::{build_http_client, ApiClient};
use readr::app::{App, AppEvent};
use readr::config::Config;
use readr::keybindings::KeybindingRegistry;
use readr::sync::Route;

#[derive(Parser, Debug)]
#[command(name = "readr", version, about = "Terminal client for a Readr feed reader")]
struct Args {
    /// Config file [default: ~/.config/readr/config.toml]
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// API base URL; overrides the config file and READR_API_URL
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// Route to open, e.g. `feed/7`, `tag/news/123` or an entry id
    route: Option<String>,
}

/// Warn when a config file holding a token is readable by others.
#[cfg(unix)]
fn check_config_permissions(path: &Path, config: &Config) {
    use std::os::unix::fs::PermissionsExt;
    if config.api_token.is_none() {
        return;
    }
    match std::fs::metadata(path) {
        Ok(meta) if meta.permissions().mode() & 0o077 != 0 => {
            tracing::warn!(
                path = %path.display(),
                mode = format!("{:o}", meta.permissions().mode() & 0o777),
                "Config file contains an API token but is accessible by other users"
            );
            eprintln!(
                "Warning: {} contains an API token and is readable by other users (chmod 600 recommended)",
                path.display()
            );
        }
        Ok(_) => {}
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Could not stat config file");
        }
    }
}

#[cfg(not(unix))]
fn check_config_permissions(_path: &Path, _config: &Config) {}

#[tokio::main]
async fn main() -> Result<()> {
    // The TUI owns stdout; logs go to stderr and are off unless RUST_LOG is set.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => Config::default_path().context("HOME environment variable not set")?,
    };
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    check_config_permissions(&config_path, &config);
    config.apply_env();
    if let Some(url) = args.api_url {
        config.api_url = url;
    }
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        eprintln!();
        eprintln!("Set the server address in {}:", config_path.display());
        eprintln!("  api_url = \"https://reader.example.com/api\"");
        eprintln!("or pass --api-url / set READR_API_URL.");
        std::process::exit(1);
    }

    let initial = match args.route.as_deref() {
        Some(raw) => raw
            .parse::<Route>()
            .with_context(|| format!("Invalid route '{}'", raw))?,
        None => Route::default(),
    };

    let mut keybindings = KeybindingRegistry::new();
    for warning in keybindings.apply_overrides(&config.keybindings) {
        tracing::warn!(warning = %warning, "Keybinding override ignored");
        eprintln!("Warning: keybindings: {}", warning);
    }

    let http = build_http_client(config.request_timeout()).context("Failed to build HTTP client")?;
    let api = ApiClient::new(http, config.api_options()).context("Invalid API configuration")?;
    tracing::info!(api_url = %api.api_url(), "Starting readr");

    let mut app = App::new(
        api,
        keybindings,
        config.sync_options(),
        config.collapsed.iter().cloned(),
    );

    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(64);
    readr::ui::run(&mut app, initial, event_tx, event_rx).await?;

    println!("Goodbye!");
    Ok(())
}
