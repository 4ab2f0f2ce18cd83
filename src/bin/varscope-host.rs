use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use varscope::config::BridgeConfig;
use varscope::fixture::load_namespace;
use varscope::host::{serve_channel, Session};
use varscope::logging;

#[derive(Parser, Debug)]
#[command(name = "varscope-host")]
#[command(about = "Serve a fixture namespace over the varscope channel protocol")]
struct CliOptions {
    /// Namespace fixture (JSON or YAML)
    #[arg(long = "namespace", short = 'n')]
    namespace: PathBuf,

    /// Config file (TOML, YAML or JSON)
    #[arg(long = "config", short = 'c')]
    config: Option<PathBuf>,

    #[arg(long = "debug", action = ArgAction::SetTrue)]
    debug: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let opts = CliOptions::parse();
    let config = BridgeConfig::resolve(opts.config.as_deref())?;
    logging::init("host", opts.debug || config.debug)?;

    let globals = load_namespace(&opts.namespace)?;
    let mut session = Session::with_config(globals, &config);
    match session.ensure_debug_server() {
        Some(port) => log::debug!("host debug preview server port={port}"),
        None => log::warn!("host running without debug preview server"),
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    serve_channel(&mut session, stdin.lock(), stdout.lock()).context("channel stream failed")?;
    Ok(())
}
