use anyhow::Context;
use clap::Parser;

use tunnel_dns::cli::Cli;
use tunnel_dns::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init(&cli.log_level).context("failed to initialise logging")?;

    let report = cli.execute().await.context("reconciliation aborted")?;
    println!("{report}");

    Ok(())
}
