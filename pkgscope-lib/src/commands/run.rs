//! Command dispatch logic for pkgscope

use super::{InitArgs, ServeArgs, ValidateArgs, init_config, serve, validate_config};
use crate::{Host, Result};
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "pkgscope", author, version, long_about = None)]
#[command(about = "Aggregated npm package insights over HTTP")]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(subcommand)]
    command: PkgscopeSubcommand,
}

#[derive(Subcommand, Debug)]
enum PkgscopeSubcommand {
    /// Start the HTTP service
    Serve(Box<ServeArgs>),
    /// Generate a default configuration file
    Init(InitArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

/// Dispatch command-line arguments to the appropriate handler
///
/// # Arguments
///
/// * `args` - An iterator of command-line arguments (typically from `std::env::args()`)
///
/// # Errors
///
/// Returns an error if command parsing fails or if the executed command fails
pub async fn run<I, T, H>(host: &mut H, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    let cli = Cli::parse_from(args);

    match &cli.command {
        PkgscopeSubcommand::Serve(serve_args) => serve(host, serve_args).await,
        PkgscopeSubcommand::Init(init_args) => init_config(host, init_args),
        PkgscopeSubcommand::Validate(validate_args) => validate_config(host, validate_args),
    }
}
