use std::ops::{Add, Mul, Sub};

use ark_ff::{FftField, Field};

use super::Radix2Domain;
use crate::field::pow_vartime;

/// A univariate polynomial in coefficient form, lowest degree first.
///
/// Trailing zero coefficients are removed, the zero polynomial has no coefficients.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DensePolynomial<F: Field> {
    coeffs: Vec<F>,
}

impl<F: Field> DensePolynomial<F> {
    /// Takes ownership of `coeffs`, lowest degree first, and trims trailing zeros.
    pub fn from_coefficients_vec(mut coeffs: Vec<F>) -> Self {
        while coeffs.last().is_some_and(|coeff| coeff.is_zero()) {
            coeffs.pop();
        }
        Self { coeffs }
    }

    /// Like [`DensePolynomial::from_coefficients_vec`].
    pub fn from_coefficients_slice(coeffs: &[F]) -> Self {
        Self::from_coefficients_vec(coeffs.to_vec())
    }

    /// The coefficients, lowest degree first.
    pub fn coeffs(&self) -> &[F] {
        &self.coeffs
    }

    /// Consumes the polynomial.
    pub fn into_coeffs(self) -> Vec<F> {
        self.coeffs
    }

    /// Whether this is the zero polynomial.
    pub fn is_zero(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// The degree, `0` for the zero polynomial.
    pub fn degree(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    /// Horner evaluation at `x`.
    pub fn evaluate(&self, x: &F) -> F {
        self.coeffs
            .iter()
            .rev()
            .fold(F::zero(), |acc, coeff| acc * x + coeff)
    }

    /// Divides by the vanishing polynomial `X^n - c` of `domain` and returns quotient and
    /// remainder.
    pub fn divide_by_vanishing_poly(&self, domain: &Radix2Domain<F>) -> (Self, Self)
    where
        F: FftField,
    {
        let n = domain.size();
        if self.coeffs.len() <= n {
            return (Self::default(), self.clone());
        }
        // X^i = X^(i-n) * (X^n - c) + c * X^(i-n), highest degree first so that the
        // reduced terms are reduced again
        let c = pow_vartime(&domain.offset(), &[n as u64]);
        let mut remainder = self.coeffs.clone();
        let mut quotient = vec![F::zero(); self.coeffs.len() - n];
        for i in (n..remainder.len()).rev() {
            let coeff = remainder[i];
            quotient[i - n] = coeff;
            remainder[i] = F::zero();
            remainder[i - n] += coeff * c;
        }
        (
            Self::from_coefficients_vec(quotient),
            Self::from_coefficients_vec(remainder),
        )
    }
}

impl<F: Field> Add for &DensePolynomial<F> {
    type Output = DensePolynomial<F>;

    fn add(self, other: Self) -> DensePolynomial<F> {
        let len = self.coeffs.len().max(other.coeffs.len());
        let coeffs = (0..len)
            .map(|i| {
                self.coeffs.get(i).copied().unwrap_or_default()
                    + other.coeffs.get(i).copied().unwrap_or_default()
            })
            .collect();
        DensePolynomial::from_coefficients_vec(coeffs)
    }
}

impl<F: Field> Sub for &DensePolynomial<F> {
    type Output = DensePolynomial<F>;

    fn sub(self, other: Self) -> DensePolynomial<F> {
        let len = self.coeffs.len().max(other.coeffs.len());
        let coeffs = (0..len)
            .map(|i| {
                self.coeffs.get(i).copied().unwrap_or_default()
                    - other.coeffs.get(i).copied().unwrap_or_default()
            })
            .collect();
        DensePolynomial::from_coefficients_vec(coeffs)
    }
}

impl<F: Field> Mul for &DensePolynomial<F> {
    type Output = DensePolynomial<F>;

    // schoolbook, only used off the proving path
    fn mul(self, other: Self) -> DensePolynomial<F> {
        if self.is_zero() || other.is_zero() {
            return DensePolynomial::default();
        }
        let mut coeffs = vec![F::zero(); self.coeffs.len() + other.coeffs.len() - 1];
        for (i, a) in self.coeffs.iter().enumerate() {
            for (j, b) in other.coeffs.iter().enumerate() {
                coeffs[i + j] += *a * b;
            }
        }
        DensePolynomial::from_coefficients_vec(coeffs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bn254::Fr;
    use ark_ff::{One, UniformRand, Zero};

    fn poly(coeffs: &[u64]) -> DensePolynomial<Fr> {
        DensePolynomial::from_coefficients_vec(coeffs.iter().map(|c| Fr::from(*c)).collect())
    }

    #[test]
    fn trims_trailing_zeros() {
        let p = poly(&[1, 2, 0, 0]);
        assert_eq!(p.coeffs().len(), 2);
        assert_eq!(p.degree(), 1);
        assert!(poly(&[0, 0]).is_zero());
        assert!((&p - &p).is_zero());
    }

    #[test]
    fn arithmetic() {
        // (1 + x)(1 - x) = 1 - x^2
        let a = poly(&[1, 1]);
        let b = &poly(&[1]) - &poly(&[0, 1]);
        let product = &a * &b;
        assert_eq!(
            product.coeffs(),
            &[Fr::one(), Fr::zero(), -Fr::one()][..]
        );
        assert_eq!((&a + &b).coeffs(), &[Fr::from(2u64)][..]);
        assert_eq!(product.evaluate(&Fr::from(3u64)), -Fr::from(8u64));
    }

    #[test]
    fn division_by_vanishing_polynomial() {
        let mut rng = ark_std::test_rng();
        let domain = Radix2Domain::<Fr>::new(4).unwrap();
        for len in [3, 4, 5, 9, 12, 17] {
            let p = DensePolynomial::from_coefficients_vec(
                (0..len).map(|_| Fr::rand(&mut rng)).collect(),
            );
            for d in [domain, domain.get_coset(Fr::from(5u64)).unwrap()] {
                let (q, r) = p.divide_by_vanishing_poly(&d);
                assert!(r.is_zero() || r.degree() < d.size());
                let back = &(&q * &d.vanishing_polynomial()) + &r;
                assert_eq!(back, p);
            }
        }
    }
}
