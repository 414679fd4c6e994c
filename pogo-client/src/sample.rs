//! Random samplers used by the envelope and signal-log builders.
//!
//! The distributions here reproduce what real clients send, so their
//! shapes matter more than their elegance. `triangular` uses the classic
//! inverse-CDF closed form with the swap-and-mirror trick, and `uniform`
//! tolerates inverted bounds.

use rand::Rng;

/// Uniform draw over `[low, high)`; bounds may be inverted.
pub(crate) fn uniform(rng: &mut impl Rng, low: f64, high: f64) -> f64 {
    low + (high - low) * rng.r#gen::<f64>()
}

/// Triangular draw over `[low, high]` with the given mode.
pub(crate) fn triangular(rng: &mut impl Rng, low: f64, high: f64, mode: f64) -> f64 {
    let mut u: f64 = rng.r#gen();
    if high == low {
        return low;
    }
    let mut c = (mode - low) / (high - low);
    let (mut low, mut high) = (low, high);
    if u > c {
        u = 1.0 - u;
        c = 1.0 - c;
        std::mem::swap(&mut low, &mut high);
    }
    low + (high - low) * (u * c).sqrt()
}

/// Triangular draw rounded down to an integer.
pub(crate) fn triangular_int(rng: &mut impl Rng, low: i64, high: i64, mode: i64) -> i64 {
    triangular(rng, low as f64, high as f64, mode as f64).floor() as i64
}

/// Draws one entry from `(value, weight)` pairs.
pub(crate) fn weighted<T: Copy>(rng: &mut impl Rng, table: &[(T, u32)]) -> T {
    let total: u32 = table.iter().map(|(_, weight)| weight).sum();
    let mut roll = rng.gen_range(0..total);
    for (value, weight) in table {
        if roll < *weight {
            return *value;
        }
        roll -= weight;
    }
    table[table.len() - 1].0
}

/// Envelope accuracy, tagged with how it was drawn: later tables key on
/// whether the value came from the uniform float bucket.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Accuracy {
    /// One of the fixed integer buckets.
    Fixed(u32),
    /// The uniform `[65, 200)` float bucket.
    Float(f64),
}

impl Accuracy {
    pub(crate) fn value(self) -> f64 {
        match self {
            Accuracy::Fixed(value) => f64::from(value),
            Accuracy::Float(value) => value,
        }
    }
}

/// Accuracy distribution observed from real clients:
/// `(5:43, 10:30, 30:5, 50:4, 65:10, 200:1, uniform(65,200):7)` percent.
pub(crate) fn accuracy(rng: &mut impl Rng) -> Accuracy {
    let roll: u32 = rng.gen_range(0..100);
    match roll {
        0..=42 => Accuracy::Fixed(5),
        43..=72 => Accuracy::Fixed(10),
        73..=77 => Accuracy::Fixed(30),
        78..=81 => Accuracy::Fixed(50),
        82..=91 => Accuracy::Fixed(65),
        92 => Accuracy::Fixed(200),
        _ => Accuracy::Float(uniform(rng, 65.0, 200.0)),
    }
}

/// `auth_info.token.unknown2`: 59 half the time, the rest of the observed
/// set at 5% each.
pub(crate) fn token_unknown2(rng: &mut impl Rng) -> i32 {
    const OTHERS: [i32; 10] = [4, 19, 22, 26, 30, 44, 45, 50, 57, 58];
    if rng.gen_bool(0.5) {
        59
    } else {
        OTHERS[rng.gen_range(0..OTHERS.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn triangular_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let v = triangular(&mut rng, -1.4, 0.9, 0.0);
            assert!((-1.4..=0.9).contains(&v), "{v} out of bounds");
        }
    }

    #[test]
    fn triangular_degenerate_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(triangular(&mut rng, 3.0, 3.0, 3.0), 3.0);
    }

    #[test]
    fn triangular_int_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..10_000 {
            let v = triangular_int(&mut rng, 93, 4900, 3000);
            assert!((93..=4900).contains(&v), "{v} out of bounds");
        }
    }

    #[test]
    fn uniform_accepts_inverted_bounds() {
        let mut rng = StdRng::seed_from_u64(13);
        for _ in 0..1000 {
            let v = uniform(&mut rng, 40.0, -105.0);
            assert!((-105.0..=40.0).contains(&v), "{v} out of bounds");
        }
    }

    #[test]
    fn weighted_respects_zero_weight() {
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..1000 {
            assert_eq!(weighted(&mut rng, &[(1, 0), (2, 5)]), 2);
        }
    }

    #[test]
    fn accuracy_float_bucket_frequency() {
        let mut rng = StdRng::seed_from_u64(19);
        let mut floats = 0u32;
        for _ in 0..10_000 {
            match accuracy(&mut rng) {
                Accuracy::Float(v) => {
                    assert!((65.0..200.0).contains(&v));
                    floats += 1;
                }
                Accuracy::Fixed(v) => assert!([5, 10, 30, 50, 65, 200].contains(&v)),
            }
        }
        let share = f64::from(floats) / 10_000.0;
        assert!((0.06..=0.08).contains(&share), "float share {share}");
    }

    #[test]
    fn token_unknown2_stays_in_observed_set() {
        let mut rng = StdRng::seed_from_u64(23);
        let mut at_59 = 0u32;
        for _ in 0..10_000 {
            let v = token_unknown2(&mut rng);
            assert!([4, 19, 22, 26, 30, 44, 45, 50, 57, 58, 59].contains(&v));
            if v == 59 {
                at_59 += 1;
            }
        }
        let share = f64::from(at_59) / 10_000.0;
        assert!((0.47..=0.53).contains(&share), "59 share {share}");
    }
}
