use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Shared cooperative termination flag
#[derive(Debug, Default)]
pub struct StopFlag {
	stopped: AtomicBool,
	notify: Notify,
}

impl StopFlag {
	pub fn trigger(&self) {
		self.stopped.store(true, Ordering::Release);
		self.notify.notify_waiters();
	}

	pub fn is_set(&self) -> bool {
		self.stopped.load(Ordering::Acquire)
	}

	/// Resolve once the flag has been set.
	pub async fn wait(&self) {
		loop {
			// Register before checking so a concurrent trigger is not missed
			let notified = self.notify.notified();
			if self.is_set() {
				return;
			}
			notified.await;
		}
	}
}

/// One-shot timer that sets the stop flag when the time budget runs out
#[derive(Debug)]
pub struct DeadlineWatch {
	timer: Option<JoinHandle<()>>,
}

impl DeadlineWatch {
	/// Arm the watch. `None` means no time budget and nothing is spawned.
	pub fn start(timeout: Option<Duration>, stop: Arc<StopFlag>) -> Self {
		let timer = timeout.map(|timeout| {
			tokio::spawn(async move {
				tokio::time::sleep(timeout).await;
				tracing::info!(seconds = timeout.as_secs_f64(), "time budget elapsed, stopping producers");
				stop.trigger();
			})
		});
		DeadlineWatch { timer }
	}

	pub fn is_armed(&self) -> bool {
		self.timer.is_some()
	}

	pub fn cancel(&self) {
		if let Some(timer) = &self.timer {
			timer.abort();
		}
	}
}

impl Drop for DeadlineWatch {
	fn drop(&mut self) {
		self.cancel();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tokio::time::{sleep, Instant};

	#[tokio::test(start_paused = true)]
	async fn test_deadline_sets_flag() {
		let stop = Arc::new(StopFlag::default());
		let _watch = DeadlineWatch::start(Some(Duration::from_secs(2)), stop.clone());
		sleep(Duration::from_millis(1900)).await;
		assert!(!stop.is_set());
		sleep(Duration::from_millis(200)).await;
		assert!(stop.is_set());
	}

	#[tokio::test(start_paused = true)]
	async fn test_wait_returns_at_deadline() {
		let stop = Arc::new(StopFlag::default());
		let start = Instant::now();
		let _watch = DeadlineWatch::start(Some(Duration::from_secs(3)), stop.clone());
		stop.wait().await;
		assert_eq!(start.elapsed().as_secs(), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn test_no_timeout_never_stops() {
		let stop = Arc::new(StopFlag::default());
		let watch = DeadlineWatch::start(None, stop.clone());
		assert!(!watch.is_armed());
		sleep(Duration::from_secs(3600)).await;
		assert!(!stop.is_set());
	}

	#[tokio::test(start_paused = true)]
	async fn test_cancelled_watch_does_not_fire() {
		let stop = Arc::new(StopFlag::default());
		let watch = DeadlineWatch::start(Some(Duration::from_secs(1)), stop.clone());
		watch.cancel();
		sleep(Duration::from_secs(2)).await;
		assert!(!stop.is_set());
	}

	#[tokio::test]
	async fn test_wait_after_trigger() {
		let stop = StopFlag::default();
		stop.trigger();
		stop.wait().await;
		assert!(stop.is_set());
	}
}
