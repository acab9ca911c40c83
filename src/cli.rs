use clap::Parser;

/// DNS query flood generator
#[derive(Parser, Debug)]
#[command(name = "dns-shooter")]
#[command(about = "Flood a DNS server with randomized UDP queries")]
pub struct Cli {
	/// Stop after this many seconds (0 = no time limit)
	#[arg(long = "timeout", default_value = "0", allow_negative_numbers = true)]
	pub timeout: i64,

	/// Total packets to send across all producers (0 = no limit)
	#[arg(long = "max", default_value = "100")]
	pub max: u64,

	/// Queries per second (0 or less = unlimited)
	#[arg(long = "qps", default_value = "10", allow_negative_numbers = true)]
	pub qps: i64,

	/// DNS server and port to shoot at
	#[arg(long = "server", default_value = "localhost:10053")]
	pub server: String,

	/// Parent domain, e.g. google.com to generate *****.google.com
	#[arg(long = "domain", default_value = "jsmean.com")]
	pub domain: String,

	/// Length of the random sub-domain label, e.g. 5 means *****.google.com
	#[arg(long = "randomlen", default_value = "5")]
	pub randomlen: usize,

	/// Randomize the query type of every packet
	#[arg(long = "randomtype")]
	pub randomtype: bool,

	/// Query type used when types are not randomized (1 = A)
	#[arg(long = "qtype", default_value = "1")]
	pub qtype: u16,

	/// Number of producers (defaults to half the CPU count)
	#[arg(short = 'w', long = "workers")]
	pub workers: Option<usize>,

	/// Random seed for reproducible query streams
	#[arg(short = 's', long = "seed")]
	pub seed: Option<u64>,

	/// Send one query and wait for a reply before the run
	#[arg(long = "probe")]
	pub probe: bool,

	/// Log debug output
	#[arg(short = 'v', long = "verbose", conflicts_with = "quiet")]
	pub verbose: bool,

	/// Only log warnings and errors
	#[arg(short = 'q', long = "quiet")]
	pub quiet: bool,
}

impl Cli {
	/// Default filter directive for the log subscriber.
	pub fn log_level(&self) -> &'static str {
		if self.verbose {
			"debug"
		} else if self.quiet {
			"warn"
		} else {
			"info"
		}
	}
}
