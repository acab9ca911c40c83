use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::config::ShooterConfig;
use crate::engine::{EmitReport, EmitState};
use crate::wire::TYPE_A;

/// One second's worth of counters as the reporter sees them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
	pub active: usize,
	pub sent: u64,
	pub last_second: u64,
}

impl Progress {
	pub fn sample(state: &EmitState, last: u64) -> Self {
		let sent = state.sent();
		Progress {
			active: state.active(),
			sent,
			last_second: sent.saturating_sub(last),
		}
	}
}

/// Log one progress line per second until every producer has exited.
///
/// Only reads the shared counters.
pub fn spawn_progress(state: Arc<EmitState>) -> JoinHandle<()> {
	tokio::spawn(async move {
		let period = Duration::from_secs(1);
		let mut ticker = interval_at(Instant::now() + period, period);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
		let mut last = 0;
		loop {
			ticker.tick().await;
			let progress = Progress::sample(&state, last);
			tracing::info!(
				active = progress.active,
				sent = progress.sent,
				last_second = progress.last_second,
				"progress"
			);
			last = progress.sent;
			if progress.active == 0 {
				break;
			}
		}
	})
}

/// Print a summary of the run configuration before shooting.
pub fn print_config_summary(config: &ShooterConfig, target: SocketAddr) {
	println!("DNS Shooter Configuration");
	println!("=========================");
	println!("Server:         {} ({})", config.server, target);
	println!("Domain:         {}", config.parent);
	println!("Random length:  {}", config.sub_label_len);
	let type_label = match (config.random_type, config.qtype) {
		(true, _) => "random".to_string(),
		(false, TYPE_A) => format!("A ({})", TYPE_A),
		(false, qtype) => qtype.to_string(),
	};
	println!("Query type:     {}", type_label);
	println!("Producers:      {}", config.workers);
	match config.total {
		0 => println!("Max packets:    unlimited"),
		total => println!("Max packets:    {}", total),
	}
	match config.qps {
		Some(qps) => println!("QPS:            {}", qps),
		None => println!("QPS:            unlimited"),
	}
	match config.timeout {
		Some(timeout) => println!("Timeout:        {} s", timeout.as_secs()),
		None => println!("Timeout:        none"),
	}
	println!();
}

/// Render the final run statistics as a table.
pub fn summary_table(report: &EmitReport, target: SocketAddr) -> Table {
	let mut table = Table::new();
	table.load_preset(UTF8_FULL);
	table.set_content_arrangement(ContentArrangement::Dynamic);
	table.set_header(vec!["Target", "Producers", "Failed", "Sent", "Refused", "Elapsed", "Avg QPS"]);
	table.add_row(vec![
		target.to_string(),
		report.producers.to_string(),
		report.failed_producers.to_string(),
		report.sent.to_string(),
		report.refused.to_string(),
		format!("{:.2} s", report.elapsed.as_secs_f64()),
		format!("{:.1}", report.rate()),
	]);
	table
}

pub fn print_summary(report: &EmitReport, target: SocketAddr) {
	println!("\nRun Summary");
	println!("===========\n");
	println!("{}", summary_table(report, target));
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_summary_table_contents() {
		let report = EmitReport {
			sent: 1500,
			refused: 3,
			producers: 4,
			failed_producers: 1,
			elapsed: Duration::from_millis(1500),
		};
		let target: SocketAddr = "127.0.0.1:10053".parse().unwrap();
		let rendered = summary_table(&report, target).to_string();
		assert!(rendered.contains("127.0.0.1:10053"));
		assert!(rendered.contains("1500"));
		assert!(rendered.contains("1.50 s"));
		assert!(rendered.contains("1000.0"));
	}

	#[tokio::test(start_paused = true)]
	async fn test_progress_exits_without_producers() {
		let state = Arc::new(EmitState::default());
		let reporter = spawn_progress(state);
		tokio::time::timeout(Duration::from_secs(5), reporter)
			.await
			.expect("reporter should stop once no producer is active")
			.unwrap();
	}

	#[tokio::test(start_paused = true)]
	async fn test_progress_follows_live_counters() {
		let state = Arc::new(EmitState::default());
		state.set_active(2);
		state.add_sent(42);
		let reporter = spawn_progress(state.clone());

		tokio::time::sleep(Duration::from_millis(1500)).await;
		assert!(!reporter.is_finished());
		assert_eq!(
			Progress::sample(&state, 0),
			Progress { active: 2, sent: 42, last_second: 42 }
		);

		state.add_sent(8);
		assert_eq!(Progress::sample(&state, 42).last_second, 8);

		state.set_active(0);
		tokio::time::timeout(Duration::from_secs(2), reporter)
			.await
			.expect("reporter should stop after the last producer exits")
			.unwrap();
	}
}
