//! Per-client RPC state: request-id generation and the per-session entropy
//! carried across envelopes.
//!
//! One [`RpcState`] lives as long as its logical client and is shared by
//! the short-lived envelope builders, so everything mutable sits behind
//! atomics or a mutex.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use parking_lot::Mutex;
use rand::Rng;

use crate::sample;

const LEHMER_MULTIPLIER: u64 = 16807;
const LEHMER_MODULUS: u64 = 0x7fff_ffff;

/// Long-lived state of one logical client.
pub struct RpcState {
    /// Epoch ms of the simulated app start; 0 until first use.
    start_time_ms: AtomicU64,
    session_hash: [u8; 16],
    request_counter: AtomicU32,
    lehmer_seed: Mutex<u64>,
    mag_x_range: (f64, f64),
    mag_y_range: (f64, f64),
    mag_z_range: (f64, f64),
    course: Mutex<f64>,
    message8: Mutex<Option<String>>,
}

impl Default for RpcState {
    fn default() -> Self {
        Self::new()
    }
}

impl RpcState {
    /// Creates fresh per-session state.
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();
        let mag_x_min = sample::uniform(&mut rng, -80.0, 60.0);
        let mag_y_min = sample::uniform(&mut rng, -120.0, 90.0);
        let mag_z_min = sample::uniform(&mut rng, -70.0, 40.0);
        Self {
            start_time_ms: AtomicU64::new(0),
            session_hash: rng.r#gen(),
            request_counter: AtomicU32::new(1),
            lehmer_seed: Mutex::new(LEHMER_MULTIPLIER),
            mag_x_range: (mag_x_min, mag_x_min + 20.0),
            mag_y_range: (mag_y_min, mag_y_min + 30.0),
            // the z ceiling tracks the y floor, matching the reference
            // client's generator on the wire
            mag_z_range: (mag_z_min, mag_y_min + 15.0),
            course: Mutex::new(sample::uniform(&mut rng, 0.0, 359.99)),
            message8: Mutex::new(None),
        }
    }

    /// The stable 16-byte session hash.
    pub fn session_hash(&self) -> &[u8; 16] {
        &self.session_hash
    }

    /// Next envelope id: a Lehmer draw in the high half, the serialized
    /// request counter in the low half. The low half is what the server
    /// relies on for replay detection.
    pub fn next_request_id(&self) -> u64 {
        let high = {
            let mut seed = self.lehmer_seed.lock();
            *seed = (*seed * LEHMER_MULTIPLIER) % LEHMER_MODULUS;
            *seed
        };
        let low = self.request_counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        (high << 32) | u64::from(low)
    }

    /// Simulated app-start time; initialized on first use to 6–10 s before
    /// `now_ms`.
    pub(crate) fn start_time_ms(&self, now_ms: u64, rng: &mut impl Rng) -> u64 {
        let current = self.start_time_ms.load(Ordering::Relaxed);
        if current != 0 {
            return current;
        }
        let candidate = now_ms - rng.gen_range(6000..=10000);
        match self.start_time_ms.compare_exchange(
            0,
            candidate,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => candidate,
            Err(existing) => existing,
        }
    }

    /// Advances the heading by a triangular walk around its previous value.
    pub(crate) fn next_course(&self, rng: &mut impl Rng) -> f64 {
        let mut course = self.course.lock();
        *course = sample::triangular(rng, 0.0, 359.99, *course);
        *course
    }

    /// One magnetometer reading drawn from the per-session ranges.
    pub(crate) fn magnetic_field(&self, rng: &mut impl Rng) -> (f64, f64, f64) {
        (
            sample::uniform(rng, self.mag_x_range.0, self.mag_x_range.1),
            sample::uniform(rng, self.mag_y_range.0, self.mag_y_range.1),
            sample::uniform(rng, self.mag_z_range.0, self.mag_z_range.1),
        )
    }

    /// The cached type-8 platform blob, if one has been seen.
    pub fn message8(&self) -> Option<String> {
        self.message8.lock().clone()
    }

    pub(crate) fn set_message8(&self, value: String) {
        *self.message8.lock() = Some(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn request_id_low_half_is_monotone() {
        let state = RpcState::new();
        let mut previous = 0u32;
        for _ in 0..100 {
            let id = state.next_request_id();
            let low = (id & 0xffff_ffff) as u32;
            assert!(low > previous, "{low} not above {previous}");
            previous = low;
        }
        // counter starts at 1 and is pre-incremented
        assert_eq!(previous, 101);
    }

    #[test]
    fn lehmer_sequence_matches_reference() {
        let state = RpcState::new();
        let first = state.next_request_id() >> 32;
        let second = state.next_request_id() >> 32;
        assert_eq!(first, 282_475_249);
        assert_eq!(second, (282_475_249 * 16807) % 0x7fff_ffff);
    }

    #[test]
    fn start_time_is_sticky_and_in_window() {
        let state = RpcState::new();
        let mut rng = StdRng::seed_from_u64(3);
        let now = 1_700_000_000_000;
        let start = state.start_time_ms(now, &mut rng);
        assert!((now - 10_000..=now - 6_000).contains(&start));
        assert_eq!(state.start_time_ms(now + 60_000, &mut rng), start);
    }

    #[test]
    fn course_walks_within_range() {
        let state = RpcState::new();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..1000 {
            let course = state.next_course(&mut rng);
            assert!((0.0..=359.99).contains(&course), "{course} out of range");
        }
    }

    #[test]
    fn magnetic_field_draws_stay_in_session_ranges() {
        let state = RpcState::new();
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..1000 {
            let (x, y, z) = state.magnetic_field(&mut rng);
            let in_range = |value: f64, range: (f64, f64)| {
                let (lo, hi) = if range.0 <= range.1 {
                    (range.0, range.1)
                } else {
                    (range.1, range.0)
                };
                (lo..=hi).contains(&value)
            };
            assert!(in_range(x, state.mag_x_range));
            assert!(in_range(y, state.mag_y_range));
            assert!(in_range(z, state.mag_z_range));
        }
    }
}
