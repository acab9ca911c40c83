use std::time::Duration;

use crate::cli::Cli;
use crate::error::ShooterError;
use crate::random::QueryRng;
use crate::wire::{check_name, fqdn, MAX_LABEL_LEN};

/// Validated run configuration
#[derive(Debug, Clone)]
pub struct ShooterConfig {
	/// `--server` as given; resolved to a target address before the run
	pub server: String,
	/// Total packet budget; 0 means unbounded
	pub total: u64,
	pub timeout: Option<Duration>,
	pub qps: Option<u32>,
	pub parent: String,
	pub sub_label_len: usize,
	pub qtype: u16,
	pub random_type: bool,
	pub workers: usize,
	pub seed: Option<u64>,
	pub probe: bool,
}

impl ShooterConfig {
	/// Build the run configuration, rejecting names DNS cannot carry.
	///
	/// Zero or negative timeout and qps disable the corresponding limit.
	pub fn from_cli(cli: &Cli) -> Result<Self, ShooterError> {
		if cli.randomlen > MAX_LABEL_LEN {
			return Err(ShooterError::LabelTooLong {
				label: "<random>".to_string(),
				len: cli.randomlen,
			});
		}
		// Check the longest name the run will produce
		let longest = if cli.randomlen == 0 {
			fqdn(&cli.domain)
		} else {
			fqdn(&format!("{}.{}", "x".repeat(cli.randomlen), cli.domain))
		};
		check_name(&longest)?;

		let timeout = (cli.timeout > 0).then(|| Duration::from_secs(cli.timeout as u64));
		let qps = (cli.qps > 0).then(|| u32::try_from(cli.qps).unwrap_or(u32::MAX));
		let workers = cli.workers.filter(|w| *w > 0).unwrap_or_else(default_workers);

		Ok(ShooterConfig {
			server: cli.server.clone(),
			total: cli.max,
			timeout,
			qps,
			parent: cli.domain.clone(),
			sub_label_len: cli.randomlen,
			qtype: cli.qtype,
			random_type: cli.randomtype,
			workers,
			seed: cli.seed,
			probe: cli.probe,
		})
	}

	/// Generator for one stream; stream 0 builds the template, producer `i` uses `i + 1`.
	pub fn rng(&self, stream: usize) -> QueryRng {
		match self.seed {
			Some(seed) => QueryRng::from_seed(seed.wrapping_add(stream as u64)),
			None => QueryRng::new(),
		}
	}

	/// Packets each producer sends in bounded mode; `None` when unbounded.
	///
	/// The remainder `total % workers` is never sent.
	pub fn per_worker_quota(&self) -> Option<u64> {
		(self.total > 0).then(|| self.total / self.workers as u64)
	}
}

/// Half the CPUs, never fewer than one producer.
pub fn default_workers() -> usize {
	(num_cpus::get() / 2).max(1)
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::Parser;

	fn config(args: &[&str]) -> Result<ShooterConfig, ShooterError> {
		let mut argv = vec!["dns-shooter"];
		argv.extend_from_slice(args);
		ShooterConfig::from_cli(&Cli::parse_from(argv))
	}

	#[test]
	fn test_defaults() {
		let cfg = config(&[]).unwrap();
		assert_eq!(cfg.total, 100);
		assert_eq!(cfg.qps, Some(10));
		assert!(cfg.timeout.is_none());
		assert_eq!(cfg.workers, default_workers());
		assert!(cfg.workers >= 1);
	}

	#[test]
	fn test_non_positive_limits_disable() {
		let cfg = config(&["--qps", "0", "--timeout", "-3"]).unwrap();
		assert!(cfg.qps.is_none());
		assert!(cfg.timeout.is_none());
		let cfg = config(&["--qps", "-7", "--timeout", "2"]).unwrap();
		assert!(cfg.qps.is_none());
		assert_eq!(cfg.timeout, Some(Duration::from_secs(2)));
	}

	#[test]
	fn test_quota() {
		let cfg = config(&["--max", "100", "--workers", "3"]).unwrap();
		assert_eq!(cfg.per_worker_quota(), Some(33));
		let cfg = config(&["--max", "0", "--workers", "3"]).unwrap();
		assert_eq!(cfg.per_worker_quota(), None);
		let cfg = config(&["--max", "2", "--workers", "4"]).unwrap();
		assert_eq!(cfg.per_worker_quota(), Some(0));
	}

	#[test]
	fn test_server_kept_unresolved() {
		let cfg = config(&["--server", "ns1.example.net:5353"]).unwrap();
		assert_eq!(cfg.server, "ns1.example.net:5353");
		assert_eq!(config(&[]).unwrap().server, "localhost:10053");
	}

	#[test]
	fn test_zero_workers_falls_back() {
		let cfg = config(&["--workers", "0"]).unwrap();
		assert_eq!(cfg.workers, default_workers());
	}

	#[test]
	fn test_rejects_long_labels() {
		assert!(matches!(
			config(&["--randomlen", "64"]),
			Err(ShooterError::LabelTooLong { len: 64, .. })
		));
		let domain = format!("{}.com", "a".repeat(70));
		assert!(matches!(
			config(&["--domain", &domain]),
			Err(ShooterError::LabelTooLong { len: 70, .. })
		));
	}

	#[test]
	fn test_rejects_long_names() {
		let domain = vec!["a".repeat(60); 4].join(".");
		assert!(matches!(
			config(&["--domain", &domain, "--randomlen", "10"]),
			Err(ShooterError::NameTooLong { .. })
		));
		assert!(config(&["--domain", &domain, "--randomlen", "0"]).is_ok());
	}
}
