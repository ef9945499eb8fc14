#![forbid(unsafe_code)]

use anyhow::{bail, Result};
use rfs_harness::run_smoke;
use std::env;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let cmd = args.first().map(String::as_str);

    match cmd {
        Some("smoke") => {
            let report = run_smoke()?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Some("--help" | "-h" | "help") | None => {
            print_usage();
            Ok(())
        }
        Some(other) => {
            print_usage();
            bail!("unknown command: {other}")
        }
    }
}

fn print_usage() {
    eprintln!("usage: rfs-harness <command>");
    eprintln!();
    eprintln!("commands:");
    eprintln!("  smoke    run the end-to-end volume scenario, print a JSON report");
    eprintln!("  help     show this message");
}
