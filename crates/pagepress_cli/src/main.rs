//! Pagepress command-line front end.

mod cli;
mod config;
mod render;

use std::io;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use pagepress_core::{Msg, Phase};
use pagepress_engine::{resolve_artifact_ref, EngineConfig, JobDriver};
use pagepress_logging::{press_debug, press_info};

use crate::cli::{Cli, Command};
use crate::config::{build_engine_config, load_file_config, FileConfig};
use crate::render::Renderer;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    pagepress_logging::initialize(cli.log_destination(), cli.log_level());

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let file = match &cli.config {
        Some(path) => load_file_config(path)?,
        None => FileConfig::default(),
    };
    let config = build_engine_config(file, cli.overrides());

    match cli.command {
        Command::Convert { url } => convert(&url, config).await,
        Command::Resolve { path } => {
            let link = resolve_artifact_ref(config.external_base.as_deref(), &path)?;
            println!("{link}");
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn convert(input: &str, config: EngineConfig) -> Result<ExitCode> {
    let source_url = validate_source_url(input)?;
    let endpoints = config.validate().context("invalid configuration")?;
    let mut driver = JobDriver::new(endpoints, &config.submit)?;
    let mut renderer = Renderer::new(io::stdout());

    driver.submit(source_url);
    loop {
        if driver.consume_dirty() {
            renderer.render(&driver.view())?;
        }
        if driver.is_settled() {
            break;
        }
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                press_info!("interrupted, resetting job");
                driver.reset();
                renderer.interrupted()?;
                return Ok(ExitCode::from(130));
            }
            _ = driver.next() => {}
        }
    }

    let view = driver.view();
    renderer.finish(&view)?;
    if view.phase == Phase::Succeeded {
        driver.dispatch(Msg::DownloadClicked);
        for link in driver.take_artifact_requests() {
            press_debug!("artifact ready {}", link);
            renderer.artifact(&link)?;
        }
    }
    driver.shutdown();

    Ok(match view.phase {
        Phase::Succeeded => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

/// The service expects an absolute http(s) URL.
fn validate_source_url(input: &str) -> Result<String> {
    let input = input.trim();
    if input.is_empty() {
        bail!("a URL is required");
    }
    match url::Url::parse(input) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(input.to_string()),
        _ => bail!("enter a valid URL (e.g. https://example.com), got {input:?}"),
    }
}
