use anyhow::Context;
use clap::Parser;
use rask_log_shipper::app::{Args, init_diagnostics};
use rask_log_shipper::{JsonStringLogMessageFormatter, Logger};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_diagnostics(&args.log_level, args.log_format)?;

    let configuration = args.configuration().context("invalid configuration")?;
    info!(
        "Shipping stdin to {}:{} ({})",
        configuration.logstash_host,
        configuration.logstash_port,
        if configuration.logstash_over_http { "http" } else { "socket" }
    );

    let formatter = JsonStringLogMessageFormatter::default()
        .with_app_info(Some(rask_log_shipper::VERSION.to_string()), None);
    let logger = Logger::new(configuration, Arc::new(formatter));
    logger.setup().context("failed to set up logger")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut count = 0usize;
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        logger.info(line);
        count += 1;
    }

    match logger.force_send()?.await {
        Ok(()) => info!("Shipped {} lines", count),
        Err(e) => warn!("Final flush incomplete: {}", e),
    }
    Ok(())
}
