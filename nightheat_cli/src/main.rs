mod cli;
mod error_fmt;
mod logging;
mod run;

use std::path::Path;

use clap::Parser;
use nightheat_config::Config;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{CliError, exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = try_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn try_main(cli: Cli) -> eyre::Result<()> {
    color_eyre::install()?;

    // `plan` works without a config file; everything else needs one.
    let allow_missing = matches!(cli.cmd, Commands::Plan { .. });
    let cfg = load_config(&cli.config, allow_missing)?;
    logging::init_logging(cli.json, &cli.log_level, &cfg.logging)?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(run::dispatch(cli.cmd, &cfg, cli.json))
}

fn load_config(path: &Path, allow_missing: bool) -> eyre::Result<Config> {
    if allow_missing && !path.exists() {
        return Ok(Config::default());
    }
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::Config(format!("read {}: {e}", path.display())))?;
    let cfg = nightheat_config::load_toml(&text)
        .map_err(|e| CliError::Config(format!("parse {}: {e}", path.display())))?;
    cfg.validate().map_err(|e| CliError::Config(e.to_string()))?;
    Ok(cfg)
}
