use super::Host;
use super::config::Config;
use crate::Result;
use camino::Utf8PathBuf;
use clap::Parser;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file (default is `pkgscope.toml`)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,
}

pub fn validate_config<H: Host>(host: &mut H, args: &ValidateArgs) -> Result<()> {
    let config_path = args.config.as_deref();

    match Config::load(config_path) {
        Ok(config) => {
            let _ = writeln!(host.output(), "Configuration file is valid");
            if let Some(path) = config_path {
                let _ = writeln!(host.output(), "Config file: {path}");
            } else {
                let _ = writeln!(host.output(), "Using default configuration (no config file given)");
            }

            for (name, url) in config.upstreams.iter() {
                let _ = writeln!(host.output(), "  {name:<13} {url}");
            }

            Ok(())
        }
        Err(e) => {
            host.fail("Configuration validation failed", &e);
            Err(e)
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::commands::host::TestHost;
    use crate::commands::init::{InitArgs, init_config};

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_default_config_is_valid() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = Utf8PathBuf::try_from(tmp.path().join("pkgscope.toml")).unwrap();

        let mut init_host = TestHost::new();
        let init_args = InitArgs {
            output: Some(config_path.clone()),
            force: false,
        };
        init_config(&mut init_host, &init_args).expect("init_config should succeed");

        let mut host = TestHost::new();
        let args = ValidateArgs { config: Some(config_path) };
        validate_config(&mut host, &args).unwrap();

        let output = host.output_text();
        assert!(output.starts_with("Configuration file is valid\nConfig file: "));
        for (name, url) in Config::default().upstreams.iter() {
            assert!(output.contains(&format!("  {name:<13} {url}\n")), "missing {name} in {output}");
        }
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_invalid_config_reports_error() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = Utf8PathBuf::try_from(tmp.path().join("bad.toml")).unwrap();
        std::fs::write(&config_path, "[retry]\nbackoff_multiplier = 0.1\n").unwrap();

        let mut host = TestHost::new();
        let args = ValidateArgs { config: Some(config_path) };
        assert!(validate_config(&mut host, &args).is_err());

        let error = host.error_text();
        assert!(error.contains("backoff_multiplier"));
        assert_eq!(host.exit_code, Some(1));
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let mut host = TestHost::new();
        let args = ValidateArgs {
            config: Some(Utf8PathBuf::from("/definitely/not/here/pkgscope.toml")),
        };
        assert!(validate_config(&mut host, &args).is_err());
    }
}
