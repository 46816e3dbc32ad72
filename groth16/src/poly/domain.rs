use ark_ff::{FftField, batch_inversion};
use rayon::prelude::*;

use super::DensePolynomial;
use crate::field::pow_vartime;
use crate::{Groth16Error, Result};

// from this size on, the butterflies of a stage run on the rayon pool
const PARALLEL_FFT_THRESHOLD: usize = 1 << 12;

/// A multiplicative subgroup `{offset * g^i}` of size `2^k`, or a coset of one.
///
/// FFTs over the domain map coefficients to evaluations at the domain elements in
/// order, inverse FFTs map them back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Radix2Domain<F: FftField> {
    size: usize,
    log_size: u32,
    group_gen: F,
    group_gen_inv: F,
    size_inv: F,
    offset: F,
    offset_inv: F,
    offset_pow_size: F,
}

impl<F: FftField> Radix2Domain<F> {
    /// The largest domain the field supports.
    pub fn max_size() -> usize {
        1usize << F::TWO_ADICITY.min(usize::BITS - 1)
    }

    /// The smallest domain with at least `num_coeffs` elements.
    pub fn new(num_coeffs: usize) -> Result<Self> {
        Self::with_max_size(num_coeffs, Self::max_size())
    }

    /// Like [`Radix2Domain::new`], with an additional caller supplied upper bound.
    pub fn with_max_size(num_coeffs: usize, max: usize) -> Result<Self> {
        let max = max.min(Self::max_size());
        let size = num_coeffs
            .max(1)
            .checked_next_power_of_two()
            .filter(|size| *size <= max)
            .ok_or(Groth16Error::DomainSizeExceeded {
                required: num_coeffs,
                max,
            })?;
        let group_gen = F::get_root_of_unity(size as u64).ok_or(
            Groth16Error::DomainSizeExceeded {
                required: num_coeffs,
                max,
            },
        )?;
        let group_gen_inv = group_gen.inverse().ok_or(Groth16Error::DivisionByZero)?;
        let size_inv = F::from(size as u64)
            .inverse()
            .ok_or(Groth16Error::DivisionByZero)?;
        Ok(Self {
            size,
            log_size: size.trailing_zeros(),
            group_gen,
            group_gen_inv,
            size_inv,
            offset: F::one(),
            offset_inv: F::one(),
            offset_pow_size: F::one(),
        })
    }

    /// The coset `offset * H` of this domain's subgroup `H`.
    pub fn get_coset(&self, offset: F) -> Result<Self> {
        let offset_inv = offset.inverse().ok_or(Groth16Error::DivisionByZero)?;
        Ok(Self {
            offset,
            offset_inv,
            offset_pow_size: pow_vartime(&offset, &[self.size as u64]),
            ..*self
        })
    }

    /// Number of elements, a power of two.
    pub fn size(&self) -> usize {
        self.size
    }

    /// `log2` of [`Radix2Domain::size`].
    pub fn log_size(&self) -> u32 {
        self.log_size
    }

    /// The generator of the subgroup.
    pub fn group_gen(&self) -> F {
        self.group_gen
    }

    /// The coset offset, one for the subgroup itself.
    pub fn offset(&self) -> F {
        self.offset
    }

    /// Whether this is a proper coset.
    pub fn is_coset(&self) -> bool {
        !self.offset.is_one()
    }

    /// `offset * g^i`.
    pub fn element(&self, i: usize) -> F {
        self.offset * pow_vartime(&self.group_gen, &[i as u64])
    }

    /// All elements in order.
    pub fn elements(&self) -> Vec<F> {
        powers(self.offset, self.group_gen, self.size)
    }

    /// Evaluates `Z(X) = X^n - offset^n`, which vanishes exactly on the domain.
    pub fn evaluate_vanishing_polynomial(&self, tau: &F) -> F {
        pow_vartime(tau, &[self.size as u64]) - self.offset_pow_size
    }

    /// `X^n - offset^n` in coefficient form.
    pub fn vanishing_polynomial(&self) -> DensePolynomial<F> {
        let mut coeffs = vec![F::zero(); self.size + 1];
        coeffs[0] = -self.offset_pow_size;
        coeffs[self.size] = F::one();
        DensePolynomial::from_coefficients_vec(coeffs)
    }

    /// The values `L_i(tau)` of all Lagrange basis polynomials of the domain.
    pub fn evaluate_all_lagrange_coefficients(&self, tau: &F) -> Vec<F> {
        let z_tau = self.evaluate_vanishing_polynomial(tau);
        let elements = self.elements();
        if z_tau.is_zero() {
            // tau is one of the domain elements
            return elements
                .iter()
                .map(|x| if x == tau { F::one() } else { F::zero() })
                .collect();
        }
        // L_i(tau) = Z(tau) * x_i / (n * offset^n * (tau - x_i))
        let Some(scale) = (F::from(self.size as u64) * self.offset_pow_size).inverse() else {
            return vec![F::zero(); self.size];
        };
        let scale = z_tau * scale;
        let mut denominators = elements.iter().map(|x| *tau - x).collect::<Vec<_>>();
        batch_inversion(&mut denominators);
        elements
            .iter()
            .zip(denominators)
            .map(|(x, inv)| scale * x * inv)
            .collect()
    }

    /// Evaluates the polynomial with coefficients `coeffs` on the domain.
    ///
    /// `coeffs` is padded with zeros to the domain size; more coefficients than domain
    /// elements are rejected.
    pub fn fft_in_place(&self, coeffs: &mut Vec<F>) -> Result<()> {
        self.fit(coeffs)?;
        if self.is_coset() {
            distribute_powers(coeffs, self.offset);
        }
        radix2_in_place(coeffs, self.group_gen);
        Ok(())
    }

    /// Interpolates the evaluations on the domain into coefficients.
    pub fn ifft_in_place(&self, evals: &mut Vec<F>) -> Result<()> {
        self.fit(evals)?;
        radix2_in_place(evals, self.group_gen_inv);
        if self.is_coset() {
            let scale = self.size_inv;
            let offset_inv = self.offset_inv;
            let mut power = scale;
            for value in evals.iter_mut() {
                *value *= power;
                power *= offset_inv;
            }
        } else {
            scale_in_place(evals, self.size_inv);
        }
        Ok(())
    }

    /// Evaluates on the coset `offset * H` of this domain.
    pub fn coset_fft_in_place(&self, offset: F, coeffs: &mut Vec<F>) -> Result<()> {
        self.get_coset(offset)?.fft_in_place(coeffs)
    }

    /// Interpolates evaluations given on the coset `offset * H` of this domain.
    pub fn coset_ifft_in_place(&self, offset: F, evals: &mut Vec<F>) -> Result<()> {
        self.get_coset(offset)?.ifft_in_place(evals)
    }

    /// Out-of-place [`Radix2Domain::fft_in_place`].
    pub fn fft(&self, coeffs: &[F]) -> Result<Vec<F>> {
        let mut values = coeffs.to_vec();
        self.fft_in_place(&mut values)?;
        Ok(values)
    }

    /// Out-of-place [`Radix2Domain::ifft_in_place`].
    pub fn ifft(&self, evals: &[F]) -> Result<Vec<F>> {
        let mut values = evals.to_vec();
        self.ifft_in_place(&mut values)?;
        Ok(values)
    }

    fn fit(&self, values: &mut Vec<F>) -> Result<()> {
        if values.len() > self.size {
            return Err(Groth16Error::DomainSizeExceeded {
                required: values.len(),
                max: self.size,
            });
        }
        values.resize(self.size, F::zero());
        Ok(())
    }
}

/// Multiplies `values[i]` by `g^i`.
pub fn distribute_powers<F: FftField>(values: &mut [F], g: F) {
    let mut power = F::one();
    for value in values.iter_mut() {
        *value *= power;
        power *= g;
    }
}

fn scale_in_place<F: FftField>(values: &mut [F], factor: F) {
    if values.len() >= PARALLEL_FFT_THRESHOLD {
        values.par_iter_mut().for_each(|value| *value *= factor);
    } else {
        values.iter_mut().for_each(|value| *value *= factor);
    }
}

fn powers<F: FftField>(first: F, g: F, count: usize) -> Vec<F> {
    let mut values = Vec::with_capacity(count);
    let mut current = first;
    for _ in 0..count {
        values.push(current);
        current *= g;
    }
    values
}

fn bit_reverse_permutation<F>(values: &mut [F]) {
    let n = values.len();
    if n <= 2 {
        return;
    }
    let shift = usize::BITS - n.trailing_zeros();
    for i in 0..n {
        let j = i.reverse_bits() >> shift;
        if i < j {
            values.swap(i, j);
        }
    }
}

// iterative Cooley-Tukey, values.len() must be a power of two and omega of that order
fn radix2_in_place<F: FftField>(values: &mut [F], omega: F) {
    let n = values.len();
    if n <= 1 {
        return;
    }
    bit_reverse_permutation(values);
    let roots = powers(F::one(), omega, n / 2);

    let mut len = 2;
    while len <= n {
        let half = len / 2;
        let stride = n / len;
        let butterflies = |chunk: &mut [F]| {
            let (lo, hi) = chunk.split_at_mut(half);
            for (j, (u, v)) in lo.iter_mut().zip(hi.iter_mut()).enumerate() {
                let t = *v * roots[j * stride];
                *v = *u - t;
                *u += t;
            }
        };
        if n >= PARALLEL_FFT_THRESHOLD {
            values.par_chunks_mut(len).for_each(butterflies);
        } else {
            values.chunks_mut(len).for_each(butterflies);
        }
        len <<= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use ark_bn254::Fr;
    use ark_ff::{Field, One, UniformRand, Zero};
    use ark_poly::{EvaluationDomain, GeneralEvaluationDomain};

    fn random_vec(n: usize) -> Vec<Fr> {
        let mut rng = ark_std::test_rng();
        (0..n).map(|_| Fr::rand(&mut rng)).collect()
    }

    #[test]
    fn sizes_round_up_to_powers_of_two() {
        assert_eq!(Radix2Domain::<Fr>::new(0).unwrap().size(), 1);
        assert_eq!(Radix2Domain::<Fr>::new(5).unwrap().size(), 8);
        assert_eq!(Radix2Domain::<Fr>::new(8).unwrap().size(), 8);
        assert_eq!(Radix2Domain::<Fr>::max_size(), 1 << 28);
    }

    #[test]
    fn domain_size_exceeded() {
        let err = Radix2Domain::<Fr>::new((1 << 28) + 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DomainSizeExceeded);
        let err = Radix2Domain::<Fr>::with_max_size(17, 16).unwrap_err();
        assert_eq!(
            err,
            Groth16Error::DomainSizeExceeded {
                required: 17,
                max: 16
            }
        );
        let domain = Radix2Domain::<Fr>::new(4).unwrap();
        let mut too_long = vec![Fr::one(); 5];
        assert!(domain.fft_in_place(&mut too_long).is_err());
    }

    #[test]
    fn fft_matches_naive_evaluation() {
        let domain = Radix2Domain::<Fr>::new(16).unwrap();
        let coeffs = random_vec(13);
        let poly = DensePolynomial::from_coefficients_slice(&coeffs);
        let evals = domain.fft(&coeffs).unwrap();
        for (i, x) in domain.elements().iter().enumerate() {
            assert_eq!(evals[i], poly.evaluate(x));
        }
        assert_eq!(domain.element(5), domain.group_gen().pow([5u64]));
    }

    #[test]
    fn round_trips() {
        for size in [1, 2, 8, 64, 1 << 13] {
            let domain = Radix2Domain::<Fr>::new(size).unwrap();
            let evals = random_vec(size);
            let coeffs = domain.ifft(&evals).unwrap();
            assert_eq!(domain.fft(&coeffs).unwrap(), evals);

            let coset = domain.get_coset(Fr::GENERATOR).unwrap();
            let coset_evals = coset.fft(&coeffs).unwrap();
            assert_eq!(coset.ifft(&coset_evals).unwrap(), coeffs);
        }
    }

    #[test]
    fn agrees_with_ark_poly() {
        let coeffs = random_vec(32);
        let ours = Radix2Domain::<Fr>::new(32).unwrap();
        let theirs = GeneralEvaluationDomain::<Fr>::new(32).unwrap();
        assert_eq!(ours.fft(&coeffs).unwrap(), theirs.fft(&coeffs));
        assert_eq!(ours.ifft(&coeffs).unwrap(), theirs.ifft(&coeffs));

        let mut ours_coset = coeffs.clone();
        ours.coset_fft_in_place(Fr::GENERATOR, &mut ours_coset)
            .unwrap();
        let theirs_coset = theirs
            .get_coset(Fr::GENERATOR)
            .unwrap()
            .fft(&coeffs);
        assert_eq!(ours_coset, theirs_coset);
    }

    #[test]
    fn lagrange_coefficients() {
        let domain = Radix2Domain::<Fr>::new(8).unwrap();
        let mut rng = ark_std::test_rng();
        let tau = Fr::rand(&mut rng);
        let evals = random_vec(8);
        let poly = DensePolynomial::from_coefficients_vec(domain.ifft(&evals).unwrap());
        let lagrange = domain.evaluate_all_lagrange_coefficients(&tau);
        let interpolated = lagrange
            .iter()
            .zip(&evals)
            .map(|(l, e)| *l * e)
            .sum::<Fr>();
        assert_eq!(interpolated, poly.evaluate(&tau));

        let coset = domain.get_coset(Fr::from(7u64)).unwrap();
        let coset_poly = DensePolynomial::from_coefficients_vec(coset.ifft(&evals).unwrap());
        let interpolated = coset
            .evaluate_all_lagrange_coefficients(&tau)
            .iter()
            .zip(&evals)
            .map(|(l, e)| *l * e)
            .sum::<Fr>();
        assert_eq!(interpolated, coset_poly.evaluate(&tau));

        let on_domain = domain.evaluate_all_lagrange_coefficients(&domain.element(3));
        assert_eq!(on_domain[3], Fr::one());
        assert!(on_domain.iter().enumerate().all(|(i, l)| i == 3 || l.is_zero()));
    }

    #[test]
    fn vanishing_polynomial() {
        let domain = Radix2Domain::<Fr>::new(8).unwrap();
        let coset = domain.get_coset(Fr::from(3u64)).unwrap();
        for d in [domain, coset] {
            let z = d.vanishing_polynomial();
            assert!(d.elements().iter().all(|x| z.evaluate(x).is_zero()));
            let tau = Fr::from(11u64);
            assert_eq!(z.evaluate(&tau), d.evaluate_vanishing_polynomial(&tau));
        }
    }
}
