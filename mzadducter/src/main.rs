use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mzadducter::{MZAdducter, MZAdducterError};

fn configure_log(log_file: Option<&Path>) -> Result<Option<WorkerGuard>, MZAdducterError> {
    let (file_layer, guard) = match log_file {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(fs::File::create(path)?);
            let layer = fmt::layer()
                .compact()
                .with_ansi(false)
                .with_timer(fmt::time::ChronoLocal::rfc_3339())
                .with_writer(writer)
                .with_filter(
                    EnvFilter::builder()
                        .with_default_directive(tracing::Level::DEBUG.into())
                        .from_env_lossy(),
                );
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .compact()
                .with_timer(fmt::time::ChronoLocal::rfc_3339())
                .with_writer(io::stderr)
                .with_filter(
                    EnvFilter::builder()
                        .with_default_directive(tracing::Level::INFO.into())
                        .from_env_lossy(),
                ),
        )
        .with(file_layer);

    tracing_log::LogTracer::init().map_err(|e| MZAdducterError::LoggingError(e.to_string()))?;
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| MZAdducterError::LoggingError(e.to_string()))?;
    Ok(guard)
}

/// Read `mzadducter.toml`, the `--config-file` and `MZADDUCTER_` environment variables.
/// Arguments given on the command line take precedence over all of them.
fn configure() -> Result<MZAdducter, MZAdducterError> {
    let matches = MZAdducter::command().get_matches();
    let mut config = Figment::new().merge(Toml::file("mzadducter.toml"));
    if let Some(path) = matches.get_one::<PathBuf>("config_file") {
        config = config.merge(Toml::file_exact(path));
    }
    config = config.merge(Env::prefixed("MZADDUCTER_"));
    MZAdducter::configure(&matches, config)
}

fn main() -> Result<(), MZAdducterError> {
    let args = configure()?;
    let _guard = configure_log(args.log_file.as_deref())?;
    args.main()?;
    Ok(())
}
