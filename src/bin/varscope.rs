use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use serde_json::json;
use varscope::channel::KernelChannel;
use varscope::config::BridgeConfig;
use varscope::logging;
use varscope::router::{DebugPreviewClient, RequestRouter};

#[derive(Parser, Debug)]
#[command(name = "varscope")]
#[command(about = "Route variable listing and preview requests to a target session")]
struct CliOptions {
    /// Config file (TOML, YAML or JSON)
    #[arg(long = "config", short = 'c')]
    config: Option<PathBuf>,

    /// Emit debug logs on stderr, here and in the target
    #[arg(long = "debug", action = ArgAction::SetTrue)]
    debug: bool,

    /// Target host command, given after `--`
    #[arg(last = true, required = true)]
    host: Vec<String>,
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
    let debug = opts.debug || config.debug;
    logging::init("router", debug)?;

    let channel = match connect(&opts.host, &config, debug) {
        Ok(channel) => channel,
        Err(err) => {
            report_startup_failure(&format!("{err:#}"))?;
            return Err(err);
        }
    };
    let client = DebugPreviewClient::new(config.timeouts.socket);
    let mut router = RequestRouter::with_client(channel, client);

    let stdin = io::stdin();
    let stdout = io::stdout();
    router
        .serve(stdin.lock(), stdout.lock())
        .context("request stream failed")?;
    Ok(())
}

fn connect(host: &[String], config: &BridgeConfig, debug: bool) -> Result<KernelChannel> {
    let mut channel = KernelChannel::spawn(host, config.timeouts)?;
    let port = channel
        .connect(debug)
        .context("target session handshake failed")?;
    log::debug!("router connected debug_port={port:?}");
    Ok(channel)
}

/// The driver only reads stdout, so a failed start still answers there.
fn report_startup_failure(error: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", json!({ "id": "0", "ok": false, "error": error }))?;
    stdout.flush()?;
    Ok(())
}
