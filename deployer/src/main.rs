//! fwfleet - Entry Point
//!
//! `fwfleet check-upstream` decides whether a scheduled run should rebuild.
//! `fwfleet deploy` pushes the built firmware and web assets to every device.

use std::env;

use fwfleet::app::options::{load_settings, log_options, CheckOptions, CliArgs, DeployOptions};
use fwfleet::app::run::{run_check_upstream, run_deploy, EXIT_FAILURE, EXIT_USAGE};
use fwfleet::logs::init_logging;
use fwfleet::utils::version_info;

use tracing::error;

const USAGE: &str = "\
Usage:
  fwfleet check-upstream [--revision=SHA] [--event=schedule|push|manual] [--marker=PATH]
                         [--repo=OWNER/NAME] [--branch=NAME] [--config=PATH]
  fwfleet deploy [--devices=IP1,IP2,...] [--firmware=PATH] [--www=PATH] [--concurrency=N]
                 [--max-attempts=N] [--device-timeout=SECS] [--port=N] [--report=PATH]
                 [--config=PATH]
  fwfleet --version

Common flags: --log-level=LEVEL --json-logs --log-dir=PATH
The device list falls back to the FWFLEET_DEVICES environment variable.";

#[tokio::main]
async fn main() {
    let cli = CliArgs::parse(env::args().skip(1));

    // Print version and exit
    if cli.has("version") {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(version) => println!("{}", version),
            Err(e) => eprintln!("Unable to render version info: {e}"),
        }
        return;
    }

    if cli.has("help") || cli.command.is_none() {
        eprintln!("{}", USAGE);
        std::process::exit(EXIT_USAGE);
    }

    let settings = match load_settings(&cli).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Unable to read settings file: {e}");
            std::process::exit(EXIT_FAILURE);
        }
    };

    let log_guard = match init_logging(log_options(&cli, &settings)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let env_var = |key: &str| env::var(key).ok();
    let code = match cli.command.as_deref() {
        Some("check-upstream") => {
            run_check_upstream(CheckOptions::resolve(&cli, &settings, env_var)).await
        }
        Some("deploy") => match DeployOptions::resolve(&cli, &settings, env_var) {
            Ok(options) => run_deploy(options).await,
            Err(e) => {
                error!("Deployment aborted: {}", e);
                EXIT_FAILURE
            }
        },
        Some(other) => {
            eprintln!("Unknown command: {other}\n\n{USAGE}");
            EXIT_USAGE
        }
        None => EXIT_USAGE,
    };

    // Flush file logs before exiting
    drop(log_guard);
    std::process::exit(code);
}
