use super::Host;
use super::common::{LogLevel, init_logging};
use super::config::Config;
use crate::Result;
use crate::facts::key_selector::key_selector;
use crate::facts::resilient_http::ResilientClient;
use crate::facts::{Collector, Gateways};
use crate::service::{ServiceState, router};
use axum::Router;
use camino::Utf8PathBuf;
use clap::Parser;
use core::net::SocketAddr;
use ohno::IntoAppError;
use std::io::Write;
use tokio::net::TcpListener;

const LOG_TARGET: &str = "     serve";

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, value_name = "ADDR", default_value = "127.0.0.1:3000", env = "PKGSCOPE_LISTEN")]
    pub listen: SocketAddr,

    /// Path to configuration file (default is `pkgscope.toml`)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// GitHub personal access token
    #[arg(long, value_name = "TOKEN", env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// socket.dev API keys, comma separated
    #[arg(long, value_name = "KEYS", env = "SOCKET_DEV_API_KEYS", value_delimiter = ',', hide_env_values = true)]
    pub socket_api_keys: Vec<String>,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    pub log_level: LogLevel,
}

/// Build the fully wired service router from a configuration and the secrets.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be constructed
pub fn build_app(config: &Config, github_token: Option<&str>, api_keys: Vec<String>) -> Result<Router> {
    let client = ResilientClient::new(config.http_settings())?;
    let keys = key_selector(config.vulnerability.key_rotation, api_keys);

    if github_token.is_none_or(|t| t.trim().is_empty()) {
        log::warn!(target: LOG_TARGET, "No GitHub token configured, GitHub data will be reported as missing");
    }

    let gateways = Gateways::new(&client, &config.upstreams, github_token, keys, config.downloads.max_days_per_request);
    let collector = Collector::new(gateways, config.aggregate.soft_deadline);

    Ok(router(ServiceState::new(collector, config.downloads.first_available_date)))
}

pub async fn serve<H: Host>(host: &mut H, args: &ServeArgs) -> Result<()> {
    init_logging(args.log_level);

    let config = Config::load(args.config.as_deref())?;
    let app = build_app(&config, args.github_token.as_deref(), args.socket_api_keys.clone())?;

    let listener = TcpListener::bind(args.listen)
        .await
        .into_app_err_with(|| format!("binding to {}", args.listen))?;
    let local = listener.local_addr().into_app_err("reading the bound address")?;

    let _ = writeln!(host.output(), "Listening on http://{local}");
    log::info!(target: LOG_TARGET, "Listening on http://{local}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .into_app_err("running the HTTP server")?;

    log::info!(target: LOG_TARGET, "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!(target: LOG_TARGET, "Could not listen for the shutdown signal: {e}");
        core::future::pending::<()>().await;
    }

    log::info!(target: LOG_TARGET, "Shutdown signal received, draining connections");
}
