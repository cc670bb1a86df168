//! Command-line interface for pkgscope
//!
//! # Implementation Model
//!
//! ## Commands
//!
//! - **serve**: Load the configuration, wire the gateways and the collector, and
//!   serve the HTTP API until interrupted
//! - **init**: Generate a default configuration file
//! - **validate**: Check configuration file syntax and values
//!
//! ## Execution Flow
//!
//! The `run` function parses command-line arguments using clap and routes
//! to the appropriate command handler. Secrets (the GitHub token and the
//! socket.dev API keys) only ever arrive through arguments or the environment;
//! everything else comes from the TOML configuration file.

mod common;
mod config;
mod host;
mod init;
mod run;
mod serve;
mod validate;

pub use common::{LogLevel, init_logging};
pub use config::{AggregateConfig, Config, DownloadsConfig, HttpConfig, RetryConfig, VulnerabilityConfig};
pub use host::Host;
pub use init::{InitArgs, init_config};
pub use run::run;
pub use serve::{ServeArgs, build_app, serve};
pub use validate::{ValidateArgs, validate_config};
