mod cli_args;

use std::sync::Arc;

use clap::Parser;
use cli_args::Cli;
use punchrun_core::{
    LoggingDestination, ProgressCallback, apply_overrides, init_logging, load_config,
    run_config_from_preferences, run_with_config_with_progress, save_config,
};
use rpassword::prompt_password;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let load = load_config();
    let mut warnings = load.warnings;
    let mut config = load.config;

    let (overrides, mut override_warnings) = cli.run.to_overrides()?;
    warnings.append(&mut override_warnings);
    apply_overrides(&mut config.run, &overrides, &mut warnings);

    for warning in &warnings {
        eprintln!("Warning: {warning}");
    }

    if cli.save {
        save_config(&config).map_err(|err| err.to_string())?;
    }

    if config.run.username.is_empty() {
        return Err("No login ID configured; pass --user or save one with --save.".into());
    }

    if let Err(err) = init_logging(LoggingDestination::FileOnly) {
        eprintln!("Warning: logging unavailable: {err}");
    }

    let password = prompt_password(format!("Portal password for {}: ", config.run.username))
        .map_err(|err| format!("Failed to read password: {err}"))?;

    let run_config = run_config_from_preferences(&config.run, password)?;

    let callback: ProgressCallback = Arc::new(|event| match event {
        punchrun_core::RunEvent::Progress { message } => println!("{message}"),
        punchrun_core::RunEvent::Finished { summary } => println!("{summary}"),
    });

    run_with_config_with_progress(run_config, callback)
        .await
        .map(|_| ())
        .map_err(|err| err.to_string())
}
