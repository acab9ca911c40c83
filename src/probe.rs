use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::engine::open_socket;

/// Send one query and wait for any reply.
///
/// Returns the reply length, or None if nothing arrived within `wait`.
/// The reply is not decoded.
pub async fn probe(target: SocketAddr, datagram: &[u8], wait: Duration) -> Result<Option<usize>> {
	let socket = open_socket(target).await?;
	socket.send(datagram)
		.await
		.with_context(|| format!("failed to send probe to {}", target))?;

	let mut buf = vec![0u8; 4096];
	match tokio::time::timeout(wait, socket.recv(&mut buf)).await {
		Ok(Ok(len)) => Ok(Some(len)),
		Ok(Err(e)) => Err(e).with_context(|| format!("failed to read probe reply from {}", target)),
		Err(_) => Ok(None),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tokio::net::UdpSocket;

	#[tokio::test]
	async fn test_probe_gets_reply() {
		let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
		let addr = server.local_addr().unwrap();
		let echo = tokio::spawn(async move {
			let mut buf = [0u8; 512];
			let (len, peer) = server.recv_from(&mut buf).await.unwrap();
			server.send_to(&buf[..len], peer).await.unwrap();
		});
		let reply = probe(addr, b"hello", Duration::from_secs(2)).await.unwrap();
		assert_eq!(reply, Some(5));
		echo.await.unwrap();
	}

	#[tokio::test]
	async fn test_probe_silent_server() {
		let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
		let addr = server.local_addr().unwrap();
		let reply = probe(addr, b"hello", Duration::from_millis(200)).await.unwrap();
		assert_eq!(reply, None);
		drop(server);
	}
}
