use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Hands out at most `qps` send permits per one-second tick.
///
/// Each tick tops the bucket back up to `qps`; permits left over from the
/// previous second are not stacked on top, so surplus is dropped. A
/// disabled limiter never blocks.
#[derive(Debug)]
pub struct RateLimiter {
	permits: Option<Arc<Semaphore>>,
	refill: Option<JoinHandle<()>>,
}

impl RateLimiter {
	/// Start the refill task. `qps == 0` yields a disabled limiter.
	///
	/// The first bucket of `qps` permits is filled at start-up, then once per second.
	pub fn start(qps: u32) -> Self {
		if qps == 0 {
			return Self::disabled();
		}
		let qps = qps as usize;
		let permits = Arc::new(Semaphore::new(0));
		let bucket = permits.clone();
		let refill = tokio::spawn(async move {
			let mut ticker = interval(Duration::from_secs(1));
			ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
			loop {
				ticker.tick().await;
				// Producers only ever take permits, so this never overshoots qps
				let missing = qps.saturating_sub(bucket.available_permits());
				if missing > 0 {
					bucket.add_permits(missing);
				}
				tracing::trace!(missing, "refilled rate limiter");
			}
		});
		RateLimiter {
			permits: Some(permits),
			refill: Some(refill),
		}
	}

	pub fn disabled() -> Self {
		RateLimiter { permits: None, refill: None }
	}

	pub fn is_enabled(&self) -> bool {
		self.permits.is_some()
	}

	/// Wait for one permit. Returns false once the limiter has been shut down.
	pub async fn acquire(&self) -> bool {
		match &self.permits {
			None => true,
			Some(permits) => match permits.acquire().await {
				Ok(permit) => {
					permit.forget();
					true
				}
				Err(_) => false,
			},
		}
	}

	/// Permits currently waiting to be taken.
	#[cfg(test)]
	pub fn available(&self) -> usize {
		self.permits.as_ref().map_or(0, |p| p.available_permits())
	}

	/// Stop refilling and wake every waiter.
	pub fn shutdown(&self) {
		if let Some(refill) = &self.refill {
			refill.abort();
		}
		if let Some(permits) = &self.permits {
			permits.close();
		}
	}
}

impl Drop for RateLimiter {
	fn drop(&mut self) {
		self.shutdown();
	}
}
