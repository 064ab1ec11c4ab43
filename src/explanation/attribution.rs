//! Shapley attribution by permutation sampling
//!
//! For each background row `b` and each feature permutation, features are
//! switched from `b` to the explained sample `x` one at a time and the change
//! in model output is credited to the switched feature. Each walk telescopes
//! from `f(b)` to `f(x)`, so the averaged contributions always sum to
//! `f(x) - mean_b f(b)`.
//!
//! Background rows are processed in parallel and reduced in row order, which
//! keeps the result bit-identical between runs.

use rayon::prelude::*;

/// Signed contributions plus the two endpoints they connect
#[derive(Debug, Clone, PartialEq)]
pub struct ShapleyValues<const N: usize> {
    pub base_value: f64,
    pub prediction: f64,
    pub contributions: [f64; N],
}

/// Permutation-sampled Shapley values of `f` at `x`
///
/// `background` and `permutations` must both be non-empty, and every
/// permutation must contain each index in `0..N` exactly once.
pub fn shapley_values<const N: usize, F>(
    x: &[f64; N],
    background: &[[f64; N]],
    permutations: &[[usize; N]],
    f: F,
) -> ShapleyValues<N>
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    let per_row: Vec<([f64; N], f64)> = background
        .par_iter()
        .map(|b| {
            let mut phi = [0.0; N];
            let base = f(&b[..]);
            for perm in permutations {
                let mut z = *b;
                let mut prev = base;
                for &j in perm {
                    z[j] = x[j];
                    let cur = f(&z[..]);
                    phi[j] += cur - prev;
                    prev = cur;
                }
            }
            (phi, base)
        })
        .collect();

    let mut contributions = [0.0; N];
    let mut base_sum = 0.0;
    for (phi, base) in &per_row {
        for (c, p) in contributions.iter_mut().zip(phi) {
            *c += p;
        }
        base_sum += base;
    }

    let walks = (background.len() * permutations.len()) as f64;
    contributions.iter_mut().for_each(|c| *c /= walks);

    ShapleyValues {
        base_value: base_sum / background.len() as f64,
        prediction: f(&x[..]),
        contributions,
    }
}
