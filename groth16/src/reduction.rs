//! Reductions from an R1CS witness to the quotient polynomial of the QAP.
//!
//! Both reductions extend the `m` constraint rows with one row per instance variable,
//! `a[m + i] = w_i`, and work on the radix-2 domain of size `next_pow2(m + num_inputs)`.
//! They differ in how the quotient `h = (A*B - C) / Z` is handed to the prover, and
//! therefore in the `h_query` of a matching proving key.

use ark_ff::PrimeField;
use ark_relations::r1cs::ConstraintMatrices;
use rayon::prelude::*;
use tracing::instrument;

use crate::field::inverse;
use crate::poly::Radix2Domain;
use crate::r1cs::{check_witness, evaluate_lc, row};
use crate::{Groth16Error, Result};

/// Maps a witness to the scalars multiplied with the `h_query` of the proving key.
pub trait R1CSToQAP {
    /// Number of `h_query` elements a proving key needs for a domain of `domain_size`.
    fn h_query_size(domain_size: usize) -> usize;

    /// Computes the `h_query` scalars for a witness.
    fn witness_map<F: PrimeField>(
        matrices: &ConstraintMatrices<F>,
        witness: &[F],
    ) -> Result<Vec<F>>;

    /// The discrete logarithms of the `h_query` elements for the toxic waste `tau` and
    /// `delta`, used by the development setup.
    fn h_query_scalars<F: PrimeField>(
        domain: &Radix2Domain<F>,
        tau: F,
        delta_inverse: F,
    ) -> Result<Vec<F>>;
}

/// The evaluation domain of the QAP of `matrices`.
pub fn qap_domain<F: PrimeField>(matrices: &ConstraintMatrices<F>) -> Result<Radix2Domain<F>> {
    Radix2Domain::new(matrices.num_constraints + matrices.num_instance_variables)
}

// <A_i, w> and <B_i, w> for every row, followed by the instance rows and zero padding
fn evaluate_rows<F: PrimeField>(
    matrices: &ConstraintMatrices<F>,
    witness: &[F],
    domain_size: usize,
) -> (Vec<F>, Vec<F>) {
    let m = matrices.num_constraints;
    let num_inputs = matrices.num_instance_variables;
    let mut a = vec![F::zero(); domain_size];
    let mut b = vec![F::zero(); domain_size];
    a[..m]
        .par_iter_mut()
        .zip(b[..m].par_iter_mut())
        .enumerate()
        .for_each(|(i, (a, b))| {
            *a = evaluate_lc(row(&matrices.a, i), witness);
            *b = evaluate_lc(row(&matrices.b, i), witness);
        });
    a[m..m + num_inputs].copy_from_slice(&witness[..num_inputs]);
    (a, b)
}

/// The reduction of snarkjs and circom.
///
/// `C` is evaluated as `A*B` on the domain, and `A*B - C` is evaluated on the coset of the
/// domain by a primitive `2n`-th root of unity. The division by the vanishing polynomial,
/// which is the constant `-2` on that coset, is folded into the `h_query` of the key.
pub struct CircomReduction;

impl CircomReduction {
    fn coset_offset<F: PrimeField>(domain: &Radix2Domain<F>) -> Result<F> {
        let double = 2 * domain.size();
        F::get_root_of_unity(double as u64).ok_or(Groth16Error::DomainSizeExceeded {
            required: double,
            max: Radix2Domain::<F>::max_size(),
        })
    }
}

impl R1CSToQAP for CircomReduction {
    fn h_query_size(domain_size: usize) -> usize {
        domain_size
    }

    #[instrument(level = "debug", name = "CircomReduction", skip_all)]
    fn witness_map<F: PrimeField>(
        matrices: &ConstraintMatrices<F>,
        witness: &[F],
    ) -> Result<Vec<F>> {
        check_witness(matrices, witness)?;
        let domain = qap_domain(matrices)?;
        let coset = domain.get_coset(Self::coset_offset(&domain)?)?;

        let (mut a, mut b) = evaluate_rows(matrices, witness, domain.size());
        let mut c = a
            .par_iter()
            .zip(b.par_iter())
            .map(|(a, b)| *a * b)
            .collect::<Vec<_>>();

        [&mut a, &mut b, &mut c]
            .into_par_iter()
            .try_for_each(|values| {
                domain.ifft_in_place(values)?;
                coset.fft_in_place(values)
            })?;

        a.par_iter_mut()
            .zip(b.par_iter())
            .zip(c.par_iter())
            .for_each(|((a, b), c)| {
                *a *= b;
                *a -= c;
            });
        Ok(a)
    }

    fn h_query_scalars<F: PrimeField>(
        domain: &Radix2Domain<F>,
        tau: F,
        delta_inverse: F,
    ) -> Result<Vec<F>> {
        let offset = Self::coset_offset(domain)?;
        let coset = domain.get_coset(offset)?;
        // h(tau) * Z(tau) interpolated from the values of h on the coset, where the
        // prover supplies Z(x) * h(x) instead of h(x)
        let scale = domain.evaluate_vanishing_polynomial(&tau)
            * inverse(&domain.evaluate_vanishing_polynomial(&offset))?
            * delta_inverse;
        Ok(coset
            .evaluate_all_lagrange_coefficients(&tau)
            .into_par_iter()
            .map(|l| l * scale)
            .collect())
    }
}

/// The reduction of arkworks and libsnark.
///
/// The witness map returns the coefficients of `h`, obtained by dividing `A*B - C` by
/// the vanishing polynomial pointwise on the coset `g * H` with `g` the multiplicative
/// generator of the field.
pub struct LibSnarkReduction;

impl R1CSToQAP for LibSnarkReduction {
    fn h_query_size(domain_size: usize) -> usize {
        domain_size - 1
    }

    #[instrument(level = "debug", name = "LibSnarkReduction", skip_all)]
    fn witness_map<F: PrimeField>(
        matrices: &ConstraintMatrices<F>,
        witness: &[F],
    ) -> Result<Vec<F>> {
        check_witness(matrices, witness)?;
        let domain = qap_domain(matrices)?;
        let coset = domain.get_coset(F::GENERATOR)?;

        let (mut a, mut b) = evaluate_rows(matrices, witness, domain.size());
        let mut c = vec![F::zero(); domain.size()];
        c[..matrices.num_constraints]
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, c)| *c = evaluate_lc(row(&matrices.c, i), witness));

        [&mut a, &mut b, &mut c]
            .into_par_iter()
            .try_for_each(|values| {
                domain.ifft_in_place(values)?;
                coset.fft_in_place(values)
            })?;

        // Z(g * w^i) = g^n - 1 for all i
        let vanishing_inv = inverse(&domain.evaluate_vanishing_polynomial(&F::GENERATOR))?;
        a.par_iter_mut()
            .zip(b.par_iter())
            .zip(c.par_iter())
            .for_each(|((a, b), c)| {
                *a *= b;
                *a -= c;
                *a *= vanishing_inv;
            });
        coset.ifft_in_place(&mut a)?;
        a.truncate(Self::h_query_size(domain.size()));
        Ok(a)
    }

    fn h_query_scalars<F: PrimeField>(
        domain: &Radix2Domain<F>,
        tau: F,
        delta_inverse: F,
    ) -> Result<Vec<F>> {
        let scale = domain.evaluate_vanishing_polynomial(&tau) * delta_inverse;
        let mut scalars = Vec::with_capacity(Self::h_query_size(domain.size()));
        let mut power = scale;
        for _ in 0..Self::h_query_size(domain.size()) {
            scalars.push(power);
            power *= tau;
        }
        Ok(scalars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poly::DensePolynomial;
    use crate::r1cs::tests::{square_chain, square_chain_witness};
    use ark_bn254::Fr;
    use ark_ff::{One, UniformRand};

    // A(tau) * B(tau) - C(tau) for the QAP polynomials interpolated from the rows
    fn qap_at(matrices: &ConstraintMatrices<Fr>, witness: &[Fr], tau: &Fr) -> Fr {
        let domain = qap_domain(matrices).unwrap();
        let (a, b) = evaluate_rows(matrices, witness, domain.size());
        let mut c = vec![Fr::from(0u64); domain.size()];
        for (i, c) in c.iter_mut().enumerate().take(matrices.num_constraints) {
            *c = evaluate_lc(row(&matrices.c, i), witness);
        }
        let eval = |values: Vec<Fr>| {
            DensePolynomial::from_coefficients_vec(domain.ifft(&values).unwrap()).evaluate(tau)
        };
        eval(a) * eval(b) - eval(c)
    }

    fn h_contribution<R: R1CSToQAP>(
        matrices: &ConstraintMatrices<Fr>,
        witness: &[Fr],
        tau: Fr,
    ) -> Fr {
        let domain = qap_domain(matrices).unwrap();
        let h = R::witness_map(matrices, witness).unwrap();
        let query = R::h_query_scalars(&domain, tau, Fr::one()).unwrap();
        assert_eq!(h.len(), R::h_query_size(domain.size()));
        assert_eq!(query.len(), h.len());
        h.iter().zip(&query).map(|(h, q)| *h * q).sum()
    }

    #[test]
    fn both_reductions_realise_the_qap() {
        let mut rng = ark_std::test_rng();
        let matrices = square_chain();
        let witness = square_chain_witness(3);
        for _ in 0..4 {
            let tau = Fr::rand(&mut rng);
            let expected = qap_at(&matrices, &witness, &tau);
            assert_eq!(
                h_contribution::<CircomReduction>(&matrices, &witness, tau),
                expected
            );
            assert_eq!(
                h_contribution::<LibSnarkReduction>(&matrices, &witness, tau),
                expected
            );
        }
    }

    #[test]
    fn libsnark_quotient_has_no_remainder() {
        let matrices = square_chain();
        let witness = square_chain_witness(5);
        let domain = qap_domain(&matrices).unwrap();
        let h = DensePolynomial::from_coefficients_vec(
            LibSnarkReduction::witness_map(&matrices, &witness).unwrap(),
        );

        let (a, b) = evaluate_rows(&matrices, &witness, domain.size());
        let mut c = vec![Fr::from(0u64); domain.size()];
        for (i, c) in c.iter_mut().enumerate().take(matrices.num_constraints) {
            *c = evaluate_lc(row(&matrices.c, i), &witness);
        }
        let [a, b, c] = [a, b, c]
            .map(|values| DensePolynomial::from_coefficients_vec(domain.ifft(&values).unwrap()));
        let (quotient, remainder) = (&(&a * &b) - &c).divide_by_vanishing_poly(&domain);
        assert!(remainder.is_zero());
        assert_eq!(quotient, h);
    }

    #[test]
    fn rejects_short_witness() {
        let matrices = square_chain();
        let witness = square_chain_witness(3);
        assert!(CircomReduction::witness_map(&matrices, &witness[..2]).is_err());
        assert!(LibSnarkReduction::witness_map(&matrices, &witness[..2]).is_err());
    }
}
