//! Thread-local random number generation.
//!
//! Each worker thread owns one `ChaCha20Rng`. Seed it explicitly with
//! [`seed`] for reproducible runs or with [`seed_from_entropy`]; unseeded
//! threads start from seed 0.
//!
//! The `sample_*` functions take any `Rng` and back the thread-local helpers,
//! so tests can drive them from a local seeded generator.

use std::cell::RefCell;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_distr::{Distribution, Gamma};

thread_local! {
    static RNG: RefCell<ChaCha20Rng> = RefCell::new(ChaCha20Rng::seed_from_u64(0));
}

/// Reseed this thread's generator.
pub fn seed(seed: u64) {
    RNG.with(|rng| *rng.borrow_mut() = ChaCha20Rng::seed_from_u64(seed));
}

/// Reseed this thread's generator from OS entropy.
pub fn seed_from_entropy() {
    RNG.with(|rng| *rng.borrow_mut() = ChaCha20Rng::from_entropy());
}

/// Run `f` with this thread's generator.
pub fn with_rng<T>(f: impl FnOnce(&mut ChaCha20Rng) -> T) -> T {
    RNG.with(|rng| f(&mut rng.borrow_mut()))
}

/// Uniform integer in `[0, upper)`. Returns 0 when `upper == 0`.
pub fn uniform_int(upper: usize) -> usize {
    if upper == 0 {
        return 0;
    }
    with_rng(|rng| rng.gen_range(0..upper))
}

/// Uniform real in `[0, upper)`. Returns 0 when `upper <= 0`.
pub fn uniform_real(upper: f32) -> f32 {
    with_rng(|rng| sample_uniform_real(rng, upper))
}

/// `k` samples of a symmetric Dirichlet(`alpha`) distribution.
pub fn dirichlet(alpha: f32, k: usize) -> Vec<f32> {
    with_rng(|rng| sample_dirichlet(rng, alpha, k))
}

/// `k` standard Gumbel samples.
pub fn gumbel(k: usize) -> Vec<f32> {
    with_rng(|rng| sample_gumbel(rng, k))
}

pub fn sample_uniform_real<R: Rng + ?Sized>(rng: &mut R, upper: f32) -> f32 {
    if !(upper > 0.0) {
        return 0.0;
    }
    rng.gen::<f32>() * upper
}

/// Dirichlet samples built from normalized Gamma(`alpha`, 1) variates.
///
/// Falls back to the uniform distribution if `alpha` is not positive or all
/// variates underflow to zero.
pub fn sample_dirichlet<R: Rng + ?Sized>(rng: &mut R, alpha: f32, k: usize) -> Vec<f32> {
    if k == 0 {
        return Vec::new();
    }
    let uniform = vec![1.0 / k as f32; k];
    let Ok(gamma) = Gamma::new(alpha as f64, 1.0) else {
        return uniform;
    };

    let mut samples: Vec<f32> = (0..k).map(|_| gamma.sample(rng) as f32).collect();

    // Normalize
    let sum: f32 = samples.iter().sum();
    if !(sum > 0.0) || !sum.is_finite() {
        return uniform;
    }
    for s in &mut samples {
        *s /= sum;
    }
    samples
}

/// Gumbel samples `-ln(-ln(u))`, redrawing any non-finite value.
pub fn sample_gumbel<R: Rng + ?Sized>(rng: &mut R, k: usize) -> Vec<f32> {
    (0..k)
        .map(|_| loop {
            let u: f32 = rng.gen();
            let g = -(-u.ln()).ln();
            if g.is_finite() {
                break g;
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_is_reproducible() {
        seed(42);
        let a: Vec<usize> = (0..8).map(|_| uniform_int(100)).collect();
        seed(42);
        let b: Vec<usize> = (0..8).map(|_| uniform_int(100)).collect();
        assert_eq!(a, b);
        assert!(a.iter().all(|&x| x < 100));
    }

    #[test]
    fn test_uniform_real_range() {
        seed(3);
        for _ in 0..1000 {
            let x = uniform_real(2.5);
            assert!((0.0..2.5).contains(&x));
        }
        assert_eq!(uniform_real(0.0), 0.0);
        assert_eq!(uniform_int(0), 0);
    }

    #[test]
    fn test_dirichlet_sums_to_one() {
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        for alpha in [0.03, 0.3, 1.0] {
            let d = sample_dirichlet(&mut rng, alpha, 9);
            assert_eq!(d.len(), 9);
            assert!(d.iter().all(|&x| x >= 0.0));
            let sum: f32 = d.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "alpha {alpha}: sum {sum}");
        }
    }

    #[test]
    fn test_dirichlet_invalid_alpha_is_uniform() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        assert_eq!(sample_dirichlet(&mut rng, 0.0, 4), vec![0.25; 4]);
        assert!(sample_dirichlet(&mut rng, 0.3, 0).is_empty());
    }

    #[test]
    fn test_gumbel_samples_are_finite() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let g = sample_gumbel(&mut rng, 1000);
        assert_eq!(g.len(), 1000);
        assert!(g.iter().all(|x| x.is_finite()));
        // Standard Gumbel mean is the Euler-Mascheroni constant
        let mean = g.iter().sum::<f32>() / g.len() as f32;
        assert!((mean - 0.5772).abs() < 0.15, "mean {mean}");
    }

    #[test]
    fn test_threads_have_independent_generators() {
        seed(5);
        let here = uniform_int(1_000_000);
        let there = std::thread::spawn(|| {
            seed(5);
            uniform_int(1_000_000)
        })
        .join()
        .unwrap();
        assert_eq!(here, there);
    }
}
