//! Multi-scalar multiplication `sum_i s_i * P_i`.
//!
//! [`msm`] is the entry point used by the prover and the verifier. It checks the input
//! lengths, splits the terms into chunks that are processed independently on the rayon
//! pool and adds up the partial results. Every chunk runs the bucket method
//! ([`msm_pippenger`]) unless it is shorter than [`NAIVE_MSM_THRESHOLD`], in which
//! case the per-term [`msm_naive`] is cheaper.

use ark_ec::CurveGroup;
use ark_ff::{BigInteger, One, PrimeField, Zero};
use rayon::prelude::*;

use crate::{Groth16Error, Result};

/// Below this many terms the naive sum of scalar multiplications is used.
pub const NAIVE_MSM_THRESHOLD: usize = 16;

// chunks are never smaller than this, so small inputs stay on one thread
const MIN_PARALLEL_CHUNK: usize = 1 << 10;

/// Computes `sum_i scalars[i] * bases[i]`.
///
/// Fails with [`Groth16Error::MsmLengthMismatch`] if the slices differ in length.
pub fn msm<G: CurveGroup>(bases: &[G::Affine], scalars: &[G::ScalarField]) -> Result<G> {
    if bases.len() != scalars.len() {
        return Err(Groth16Error::MsmLengthMismatch {
            bases: bases.len(),
            scalars: scalars.len(),
        });
    }
    let n = bases.len();
    if n < NAIVE_MSM_THRESHOLD {
        return Ok(msm_naive(bases, scalars));
    }
    let chunk_size = n
        .div_ceil(rayon::current_num_threads())
        .max(MIN_PARALLEL_CHUNK);
    Ok(bases
        .par_chunks(chunk_size)
        .zip(scalars.par_chunks(chunk_size))
        .map(|(bases, scalars)| msm_pippenger::<G>(bases, scalars))
        .reduce(G::zero, |acc, partial| acc + partial))
}

/// Multiplies every base with its scalar and adds up the products.
///
/// Extra elements of the longer slice are ignored.
pub fn msm_naive<G: CurveGroup>(bases: &[G::Affine], scalars: &[G::ScalarField]) -> G {
    bases
        .iter()
        .zip(scalars)
        .filter(|(_, scalar)| !scalar.is_zero())
        .map(|(base, scalar)| *base * *scalar)
        .sum()
}

// ceil(log2(n)) * ln(2), without floating point
fn ln_without_floats(n: usize) -> usize {
    (n.next_power_of_two().trailing_zeros() as usize * 69) / 100
}

/// The bucket method of Pippenger.
///
/// Scalars are cut into windows of `c` bits. Within a window every base is added to the
/// bucket of its digit, the buckets are combined with a running sum, and the window
/// sums are merged from the highest window down with `c` doublings in between.
///
/// Extra elements of the longer slice are ignored.
pub fn msm_pippenger<G: CurveGroup>(bases: &[G::Affine], scalars: &[G::ScalarField]) -> G {
    let scalars = scalars
        .iter()
        .map(|scalar| scalar.into_bigint())
        .collect::<Vec<_>>();
    let terms = scalars
        .iter()
        .zip(bases)
        .filter(|(scalar, _)| !scalar.is_zero())
        .collect::<Vec<_>>();
    if terms.is_empty() {
        return G::zero();
    }

    let c = if terms.len() < 32 {
        3
    } else {
        ln_without_floats(terms.len()) + 2
    };
    let num_bits = G::ScalarField::MODULUS_BIT_SIZE as usize;
    let one = G::ScalarField::one().into_bigint();
    let mask = (1u64 << c) - 1;

    let window_sums = (0..num_bits)
        .step_by(c)
        .map(|w_start| {
            let mut res = G::zero();
            // no bucket for digit zero
            let mut buckets = vec![G::zero(); (1 << c) - 1];
            for &(scalar, base) in &terms {
                if *scalar == one {
                    // unit scalars only count in the lowest window
                    if w_start == 0 {
                        res += *base;
                    }
                    continue;
                }
                let mut scalar = *scalar;
                scalar.divn(w_start as u32);
                let digit = scalar.as_ref()[0] & mask;
                if digit != 0 {
                    buckets[(digit - 1) as usize] += *base;
                }
            }
            let mut running_sum = G::zero();
            for bucket in buckets.into_iter().rev() {
                running_sum += bucket;
                res += running_sum;
            }
            res
        })
        .collect::<Vec<_>>();

    let (lowest, higher) = match window_sums.split_first() {
        Some(split) => split,
        None => return G::zero(),
    };
    *lowest
        + higher.iter().rev().fold(G::zero(), |mut total, sum| {
            total += sum;
            for _ in 0..c {
                total.double_in_place();
            }
            total
        })
}
