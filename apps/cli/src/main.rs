#![allow(clippy::print_stderr, clippy::print_stdout)]

mod app;
mod args;

use crate::args::Cli;
use anyhow::{Context, Result};
use clap::Parser;
use linkfix_kernel::config::{AppConfig, LoggingConfig, load_config};
use linkfix_logger::{LevelFilter, LogFormat, Logger};
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg: AppConfig =
        load_config(cli.config.as_deref()).context("Critical: Configuration is malformed")?;
    if let Some(db) = &cli.db {
        override_data_file(&mut cfg, db)?;
    }

    let _log = init_logger(&cfg.logging)?;

    app::run(cli.command, &cfg).await
}

fn override_data_file(cfg: &mut AppConfig, db: &Path) -> Result<()> {
    let file_name = db
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("--db needs a file path, got {}", db.display()))?;

    cfg.storage.file_name = file_name.to_owned();
    cfg.storage.data_dir = match db.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    Ok(())
}

fn init_logger(cfg: &LoggingConfig) -> Result<Option<Logger>> {
    if !cfg.console && cfg.directory.is_none() {
        return Ok(None);
    }

    let level: LevelFilter =
        cfg.level.parse().with_context(|| format!("Invalid log level '{}'", cfg.level))?;

    let mut builder = Logger::builder()
        .name(env!("CARGO_BIN_NAME"))
        .level(level)
        .console(cfg.console)
        .console_format(cfg.format.to_string().parse::<LogFormat>()?);

    if let Some(filter) = &cfg.filter {
        builder = builder.env_filter(filter);
    }
    if let Some(directory) = &cfg.directory {
        builder = builder
            .directory(directory)
            .file_format(cfg.file_format.to_string().parse::<LogFormat>()?)
            .max_files(cfg.max_files);
    }

    Ok(Some(builder.init()?))
}
