mod cli;
mod config;
mod deadline;
mod engine;
mod error;
mod limiter;
mod probe;
mod random;
mod report;
mod target;
mod template;
mod wire;

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::ShooterConfig;
use crate::template::PacketTemplate;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	// RUST_LOG wins over the verbosity flags
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
	tracing_subscriber::fmt().with_env_filter(filter).init();

	let config = ShooterConfig::from_cli(&cli)?;
	let target = target::resolve_target(&config.server).await?;

	report::print_config_summary(&config, target);

	tracing::info!("building dns packet template");
	let mut rng = config.rng(0);
	let template = PacketTemplate::build(
		&config.parent,
		config.sub_label_len,
		config.qtype,
		config.random_type,
		&mut rng,
	)
	.context("failed to build query template")?;
	tracing::debug!(
		parent = template.parent(),
		len = template.len(),
		sub_label = ?template.sub_label_offset(),
		qtype_offset = template.qtype_offset(),
		sub_label_len = template.sub_label_len(),
		random_type = template.random_type(),
		"template ready"
	);

	if config.probe {
		match probe::probe(target, template.bytes(), Duration::from_secs(1)).await {
			Ok(Some(len)) => tracing::info!(%target, len, "server answered probe"),
			Ok(None) => tracing::warn!(%target, "no reply to probe within 1s"),
			Err(e) => tracing::warn!(%target, error = %e, "probe failed"),
		}
	}

	let report = engine::run(&config, target, &template).await?;

	tracing::info!(
		"Produce {} dns packet in {:.2} seconds",
		report.sent,
		report.elapsed.as_secs_f64()
	);
	report::print_summary(&report, target);

	Ok(())
}
