use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::ShooterConfig;
use crate::deadline::{DeadlineWatch, StopFlag};
use crate::error::ShooterError;
use crate::limiter::RateLimiter;
use crate::random::QueryRng;
use crate::report::spawn_progress;
use crate::template::PacketTemplate;

/// Where a producer writes its datagrams
pub trait DatagramSink: Send + Sync + 'static {
	fn send(&self, datagram: &[u8]) -> impl Future<Output = io::Result<usize>> + Send;
}

impl DatagramSink for UdpSocket {
	fn send(&self, datagram: &[u8]) -> impl Future<Output = io::Result<usize>> + Send {
		UdpSocket::send(self, datagram)
	}
}

/// Counters shared by the producers and the progress reporter
#[derive(Debug, Default)]
pub struct EmitState {
	sent: AtomicU64,
	refused: AtomicU64,
	active: AtomicUsize,
	stop: Arc<StopFlag>,
}

impl EmitState {
	pub fn sent(&self) -> u64 {
		self.sent.load(Ordering::Relaxed)
	}

	pub fn refused(&self) -> u64 {
		self.refused.load(Ordering::Relaxed)
	}

	/// Producers that have not exited yet
	pub fn active(&self) -> usize {
		self.active.load(Ordering::Acquire)
	}
}

#[cfg(test)]
impl EmitState {
	pub fn add_sent(&self, n: u64) {
		self.sent.fetch_add(n, Ordering::Relaxed);
	}

	pub fn set_active(&self, n: usize) {
		self.active.store(n, Ordering::Release);
	}
}

/// Decrements the active producer count on every exit path
struct ActiveGuard(Arc<EmitState>);

impl ActiveGuard {
	fn enter(state: Arc<EmitState>) -> Self {
		state.active.fetch_add(1, Ordering::AcqRel);
		ActiveGuard(state)
	}
}

impl Drop for ActiveGuard {
	fn drop(&mut self) {
		self.0.active.fetch_sub(1, Ordering::AcqRel);
	}
}

/// Outcome of a finished run
#[derive(Debug, Clone)]
pub struct EmitReport {
	/// Send calls issued, refused ones included
	pub sent: u64,
	/// Part of `sent` rejected because the target answered an earlier datagram with port-unreachable
	pub refused: u64,
	pub producers: usize,
	pub failed_producers: usize,
	pub elapsed: Duration,
}

impl EmitReport {
	pub fn rate(&self) -> f64 {
		let secs = self.elapsed.as_secs_f64();
		if secs > 0.0 {
			self.sent as f64 / secs
		} else {
			0.0
		}
	}
}

/// Open a UDP socket connected to `target`.
pub async fn open_socket(target: SocketAddr) -> Result<UdpSocket, ShooterError> {
	let bind_addr = if target.is_ipv4() {
		"0.0.0.0:0"
	} else {
		"[::]:0"
	};
	let socket = UdpSocket::bind(bind_addr)
		.await
		.map_err(|source| ShooterError::SocketOpen { target, source })?;
	socket.connect(target)
		.await
		.map_err(|source| ShooterError::SocketOpen { target, source })?;
	Ok(socket)
}

/// Read and drop whatever the server sends back so the receive buffer never fills.
fn spawn_discarder(producer: usize, socket: Arc<UdpSocket>) -> JoinHandle<()> {
	tokio::spawn(async move {
		let mut buf = vec![0u8; 1024];
		loop {
			match socket.recv(&mut buf).await {
				Ok(len) => tracing::trace!(producer, len, "discarded reply"),
				Err(source) => {
					let e = ShooterError::SocketRead { source };
					tracing::debug!(producer, error = %e, "read failed, continuing");
				}
			}
		}
	})
}

/// Shoot queries at `target` until the count or time budget runs out.
///
/// One connected socket and one discarder per producer. Producers whose
/// socket fails to open are skipped; the run aborts only if none opened.
pub async fn run(
	config: &ShooterConfig,
	target: SocketAddr,
	template: &PacketTemplate,
) -> Result<EmitReport> {
	let mut sinks = Vec::with_capacity(config.workers);
	let mut discarders = Vec::with_capacity(config.workers);
	for producer in 0..config.workers {
		match open_socket(target).await {
			Ok(socket) => {
				tracing::debug!(producer, %target, "opened connection to dns server");
				let socket = Arc::new(socket);
				discarders.push(spawn_discarder(producer, socket.clone()));
				sinks.push(socket);
			}
			Err(e) => tracing::error!(producer, error = %e, "producer will not run"),
		}
	}
	if sinks.is_empty() {
		return Err(ShooterError::NoProducers.into());
	}

	tracing::info!(producers = sinks.len(), %target, "starting producers");
	let report = emit(config, template, sinks).await;

	for discarder in discarders {
		discarder.abort();
	}
	Ok(report)
}

/// Drive one producer per sink until every producer has exited.
pub async fn emit<S: DatagramSink>(
	config: &ShooterConfig,
	template: &PacketTemplate,
	sinks: Vec<Arc<S>>,
) -> EmitReport {
	let start = Instant::now();
	let state = Arc::new(EmitState::default());
	let limiter = Arc::new(RateLimiter::start(config.qps.unwrap_or(0)));
	let deadline = DeadlineWatch::start(config.timeout, state.stop.clone());
	let quota = config.per_worker_quota();
	tracing::debug!(
		rate_limited = limiter.is_enabled(),
		deadline = deadline.is_armed(),
		?quota,
		"emission limits"
	);
	let producers = sinks.len();

	let mut handles = Vec::with_capacity(producers);
	for (producer, sink) in sinks.into_iter().enumerate() {
		// Count the producer before it is spawned so the reporter never sees zero early
		let guard = ActiveGuard::enter(state.clone());
		let template = template.clone();
		let rng = config.rng(producer + 1);
		let limiter = limiter.clone();
		let state = state.clone();
		handles.push(tokio::spawn(async move {
			let _guard = guard;
			produce(producer, template, rng, sink.as_ref(), &limiter, &state, quota).await
		}));
	}
	let reporter = spawn_progress(state.clone());

	let mut failed_producers = 0;
	for (producer, handle) in handles.into_iter().enumerate() {
		match handle.await {
			Ok(Ok(sent)) => tracing::debug!(producer, sent, "producer finished"),
			Ok(Err(e)) => {
				failed_producers += 1;
				tracing::error!(producer, error = %e, "producer stopped");
			}
			Err(e) => {
				failed_producers += 1;
				tracing::warn!(producer, error = %e, "producer task failed");
			}
		}
	}

	limiter.shutdown();
	deadline.cancel();
	reporter.abort();

	EmitReport {
		sent: state.sent(),
		refused: state.refused(),
		producers,
		failed_producers,
		elapsed: start.elapsed(),
	}
}

/// Producer loop: permit, mutate, send, count, then check the stop flag.
///
/// Runs `quota` iterations in bounded mode and forever otherwise.
async fn produce<S: DatagramSink>(
	producer: usize,
	mut template: PacketTemplate,
	mut rng: QueryRng,
	sink: &S,
	limiter: &RateLimiter,
	state: &EmitState,
	quota: Option<u64>,
) -> Result<u64, ShooterError> {
	let mut iterations = 0u64;
	let mut sent = 0u64;
	loop {
		if quota.is_some_and(|q| iterations >= q) {
			break;
		}
		if limiter.is_enabled() {
			tokio::select! {
				granted = limiter.acquire() => {
					if !granted {
						break;
					}
				}
				_ = state.stop.wait() => break,
			}
		}

		let datagram = template.mutate(&mut rng)?;
		iterations += 1;
		match sink.send(datagram).await {
			Ok(_) => {
				state.sent.fetch_add(1, Ordering::Relaxed);
				sent += 1;
			}
			// ICMP port-unreachable for an earlier datagram, reported on this send
			Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
				state.sent.fetch_add(1, Ordering::Relaxed);
				state.refused.fetch_add(1, Ordering::Relaxed);
				sent += 1;
				tracing::trace!(producer, "send refused by target");
			}
			Err(source) => return Err(ShooterError::SocketWrite { producer, source }),
		}

		if state.stop.is_set() {
			break;
		}
	}
	Ok(sent)
}
