use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Deterministic generator for one step, derived from the run seed and the
/// step name so steps do not share a random stream.
pub fn step_rng(seed: &str, step: &str) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(hash_seed(hash_seed(0, seed), step))
}

fn hash_seed(seed: u64, key: &str) -> u64 {
    let mut hash = seed ^ 0xcbf29ce484222325;
    for byte in key.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Sample a triangular distribution on `[low, high]` peaking at `mode`.
pub fn triangular<R: Rng + ?Sized>(rng: &mut R, low: f64, high: f64, mode: f64) -> f64 {
    if high <= low {
        return low;
    }
    let u: f64 = rng.random();
    let split = (mode - low) / (high - low);
    if u < split {
        low + (u * (high - low) * (mode - low)).sqrt()
    } else {
        high - ((1.0 - u) * (high - low) * (high - mode)).sqrt()
    }
}

/// Round to cents.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
