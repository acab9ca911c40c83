use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::{OsRng, SmallRng};
use rand::{Rng, SeedableRng};

/// Alphabet random sub-labels are drawn from
pub const LETTERS: &[u8; 36] = b"1234567890abcdefghijklmnopqrstuvwxyz";

/// Random QTYPEs are drawn from `0..RANDOM_TYPE_LIMIT`
pub const RANDOM_TYPE_LIMIT: u16 = 10;

/// ID handed out when dynamic IDs are off
pub const STATIC_ID: u16 = 0xfffe;

static ID_RNG: OnceLock<Mutex<SmallRng>> = OnceLock::new();

/// Seed a fast generator from the OS entropy source, or the clock if that fails.
pub fn seeded_rng() -> SmallRng {
	match SmallRng::from_rng(OsRng) {
		Ok(rng) => rng,
		Err(e) => {
			tracing::debug!(error = %e, "entropy source unavailable, seeding from clock");
			let nanos = SystemTime::now()
				.duration_since(UNIX_EPOCH)
				.map(|d| d.as_nanos() as u64)
				.unwrap_or_default();
			SmallRng::seed_from_u64(nanos)
		}
	}
}

/// Draw a transaction ID from the process-wide generator.
///
/// The generator is seeded lazily on first use and guarded by a lock.
/// With `dynamic == false` the fixed value 0xfffe is returned.
pub fn random_id(dynamic: bool) -> u16 {
	if !dynamic {
		return STATIC_ID;
	}
	let rng = ID_RNG.get_or_init(|| Mutex::new(seeded_rng()));
	let mut guard = match rng.lock() {
		Ok(guard) => guard,
		Err(poisoned) => poisoned.into_inner(),
	};
	guard.gen()
}

/// Per-producer randomness, so the hot path never takes a lock
#[derive(Debug, Clone)]
pub struct QueryRng {
	rng: SmallRng,
}

impl QueryRng {
	pub fn new() -> Self {
		QueryRng { rng: seeded_rng() }
	}

	/// Deterministic generator for reproducible runs and tests.
	pub fn from_seed(seed: u64) -> Self {
		QueryRng { rng: SmallRng::seed_from_u64(seed) }
	}

	pub fn id(&mut self) -> u16 {
		self.rng.gen()
	}

	/// Fill `out` with characters from the sub-label alphabet.
	pub fn fill_sub_label(&mut self, out: &mut [u8]) {
		for b in out.iter_mut() {
			*b = LETTERS[self.rng.gen_range(0..LETTERS.len())];
		}
	}

	pub fn sub_label(&mut self, len: usize) -> String {
		let mut label = vec![0u8; len];
		self.fill_sub_label(&mut label);
		// LETTERS is ASCII
		label.into_iter().map(char::from).collect()
	}

	/// Most commonly defined record types sit at the low end of the range.
	pub fn record_type(&mut self) -> u16 {
		self.rng.gen_range(0..RANDOM_TYPE_LIMIT)
	}

	/// `<len random chars>.<parent>`, or just the parent when `len == 0`.
	pub fn domain(&mut self, len: usize, parent: &str) -> String {
		if len == 0 {
			return parent.to_string();
		}
		let label = self.sub_label(len);
		if parent == "." {
			return label;
		}
		format!("{}.{}", label, parent)
	}
}

impl Default for QueryRng {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashSet;

	#[test]
	fn test_static_id() {
		assert_eq!(random_id(false), 0xfffe);
	}

	#[test]
	fn test_dynamic_id_spread() {
		let mut high = HashSet::new();
		let mut low = HashSet::new();
		for _ in 0..10_000 {
			let [h, l] = random_id(true).to_be_bytes();
			high.insert(h);
			low.insert(l);
		}
		assert!(high.len() >= 200, "only {} distinct high bytes", high.len());
		assert!(low.len() >= 200, "only {} distinct low bytes", low.len());
	}

	#[test]
	fn test_sub_label_alphabet() {
		let mut rng = QueryRng::from_seed(7);
		for len in [0, 1, 5, 63] {
			let label = rng.sub_label(len);
			assert_eq!(label.len(), len);
			assert!(label.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_lowercase()));
		}
	}

	#[test]
	fn test_random_domain_shape() {
		let mut rng = QueryRng::new();
		let domain = rng.domain(5, "jsmean.com");
		assert_eq!(domain.len(), 16);
		assert!(domain.ends_with(".jsmean.com"));
		assert!(domain[..5].bytes().all(|b| LETTERS.contains(&b)));
	}

	#[test]
	fn test_random_domain_edge_cases() {
		let mut rng = QueryRng::from_seed(1);
		assert_eq!(rng.domain(0, "jsmean.com"), "jsmean.com");
		let rooted = rng.domain(4, ".");
		assert_eq!(rooted.len(), 4);
		assert!(!rooted.contains('.'));
	}

	#[test]
	fn test_record_type_range() {
		let mut rng = QueryRng::from_seed(42);
		let seen: HashSet<u16> = (0..1000).map(|_| rng.record_type()).collect();
		assert!(seen.iter().all(|t| *t < RANDOM_TYPE_LIMIT));
		assert!(seen.len() > 1);
	}

	#[test]
	fn test_seeded_rngs_reproduce() {
		let mut a = QueryRng::from_seed(99);
		let mut b = QueryRng::from_seed(99);
		assert_eq!(a.sub_label(8), b.sub_label(8));
		assert_eq!(a.id(), b.id());
	}
}
