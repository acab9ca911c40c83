use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Errors raised while building or emitting query packets
#[derive(Debug, Error)]
pub enum ShooterError {
	/// The target buffer is too short for the field being packed.
	#[error("buffer overflow: need {needed} octets, {available} available")]
	BufferOverflow { needed: usize, available: usize },

	#[error("packet template used before it was built")]
	TemplateNotInitialized,

	#[error("label '{label}' is {len} octets, the limit is 63")]
	LabelTooLong { label: String, len: usize },

	#[error("packed domain name is {len} octets, the limit is 255")]
	NameTooLong { len: usize },

	#[error("failed to open UDP socket to {target}: {source}")]
	SocketOpen {
		target: SocketAddr,
		#[source]
		source: io::Error,
	},

	#[error("producer {producer} failed to send: {source}")]
	SocketWrite {
		producer: usize,
		#[source]
		source: io::Error,
	},

	#[error("failed to read udp message: {source}")]
	SocketRead {
		#[source]
		source: io::Error,
	},

	#[error("no producer could open a socket")]
	NoProducers,
}
