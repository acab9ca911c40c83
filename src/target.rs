use std::net::{IpAddr, SocketAddr};

use anyhow::{anyhow, Context, Result};
use tokio::net::lookup_host;

/// Port used when the server string carries none
pub const DEFAULT_DNS_PORT: u16 = 53;

/// Parse a literal IP address with optional port.
///
/// Supports formats:
///   "127.0.0.1"            -- IPv4, default port 53
///   "127.0.0.1:10053"      -- IPv4 with explicit port
///   "2606:4700::1111"      -- bare IPv6, default port 53
///   "[2606:4700::1111]:53" -- bracketed IPv6 with port
///
/// Returns None when the input is not an IP literal (e.g. a hostname).
pub fn parse_ip_target(input: &str) -> Option<SocketAddr> {
	let trimmed = input.trim();
	if let Ok(addr) = trimmed.parse::<SocketAddr>() {
		return Some(addr);
	}
	let bare = trimmed.trim_start_matches('[').trim_end_matches(']');
	bare.parse::<IpAddr>()
		.ok()
		.map(|ip| SocketAddr::new(ip, DEFAULT_DNS_PORT))
}

/// Resolve the `server` string to the socket address producers connect to.
///
/// IP literals are parsed directly; anything else is looked up as
/// `host:port` (port 53 when missing) and the first address wins.
pub async fn resolve_target(input: &str) -> Result<SocketAddr> {
	let trimmed = input.trim();
	if trimmed.is_empty() {
		return Err(anyhow!("empty server address"));
	}
	if let Some(addr) = parse_ip_target(trimmed) {
		return Ok(addr);
	}

	let host_port = if trimmed.rsplit_once(':').is_some_and(|(_, port)| port.parse::<u16>().is_ok()) {
		trimmed.to_string()
	} else {
		format!("{}:{}", trimmed, DEFAULT_DNS_PORT)
	};
	let mut addrs = lookup_host(&host_port)
		.await
		.with_context(|| format!("failed to resolve server '{}'", trimmed))?;
	addrs.next()
		.ok_or_else(|| anyhow!("server '{}' resolved to no addresses", trimmed))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_ipv4_no_port() {
		let addr = parse_ip_target("1.1.1.1").unwrap();
		assert_eq!(addr.port(), 53);
		assert_eq!(addr.ip().to_string(), "1.1.1.1");
	}

	#[test]
	fn test_ipv4_with_port() {
		let addr = parse_ip_target("127.0.0.1:10053").unwrap();
		assert_eq!(addr.port(), 10053);
		assert_eq!(addr.ip().to_string(), "127.0.0.1");
	}

	#[test]
	fn test_ipv6_bare() {
		let addr = parse_ip_target("2606:4700::1111").unwrap();
		assert_eq!(addr.port(), 53);
		assert!(addr.is_ipv6());
	}

	#[test]
	fn test_ipv6_bracketed() {
		let addr = parse_ip_target("[2606:4700::1111]:5353").unwrap();
		assert_eq!(addr.port(), 5353);
	}

	#[test]
	fn test_hostname_is_not_literal() {
		assert!(parse_ip_target("localhost:10053").is_none());
	}

	#[tokio::test]
	async fn test_resolve_localhost() {
		let addr = resolve_target("localhost:10053").await.unwrap();
		assert_eq!(addr.port(), 10053);
		assert!(addr.ip().is_loopback());
	}

	#[tokio::test]
	async fn test_resolve_localhost_default_port() {
		let addr = resolve_target("localhost").await.unwrap();
		assert_eq!(addr.port(), 53);
	}

	#[tokio::test]
	async fn test_resolve_empty() {
		assert!(resolve_target("  ").await.is_err());
	}
}
