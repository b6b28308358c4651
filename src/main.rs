use std::process;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use fisco_k8s::cli::Cli;
use fisco_k8s::{logging, FailurePolicy, GeneratorConfig, Generator};

fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = GeneratorConfig::load(cli.config.as_deref()).context("Failed to load settings")?;
    let mut config = cli.apply(config);
    config.work_dir = std::path::absolute(&config.work_dir)
        .with_context(|| format!("Invalid work dir {}", config.work_dir.display()))?;

    let _guard = logging::init(&config.logging).context("Failed to initialize logging")?;
    info!("args: {:?}", config);

    let generator = Generator::new(config)?;
    let policy = if cli.keep_going {
        FailurePolicy::KeepGoing
    } else {
        FailurePolicy::Abort
    };

    let report = generator.run(policy)?;
    if !report.is_success() {
        let failed: Vec<_> = report.failed.iter().map(|e| e.to_string()).collect();
        error!("{} node(s) failed:\n  {}", failed.len(), failed.join("\n  "));
    }
    Ok(report.is_success())
}

fn main() {
    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}
