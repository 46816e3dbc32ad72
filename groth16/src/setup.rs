//! A single-party setup for tests and benchmarks.
//!
//! Whoever runs it knows the toxic waste and can forge proofs for the generated key.
//! Production keys come out of a multi-party ceremony and are loaded from a `.zkey`.

use ark_ec::pairing::Pairing;
use ark_ec::{CurveGroup, PrimeGroup};
use ark_ff::{Field, Zero};
use ark_groth16::{ProvingKey, VerifyingKey};
use ark_relations::r1cs::ConstraintMatrices;
use rand::{CryptoRng, Rng};
use rayon::prelude::*;
use tracing::instrument;

use crate::curve::scalar_mul;
use crate::field::inverse;
use crate::r1cs::{check_indices, num_variables};
use crate::reduction::{R1CSToQAP, qap_domain};
use crate::{Groth16, Result};

/// The secret values of a setup.
#[derive(Debug, Clone, Copy)]
pub struct Trapdoor<F> {
    /// Evaluation point of the QAP polynomials.
    pub tau: F,
    /// `alpha`.
    pub alpha: F,
    /// `beta`.
    pub beta: F,
    /// Divides the public input terms.
    pub gamma: F,
    /// Divides the private input and quotient terms.
    pub delta: F,
}

fn nonzero<F: Field, R: Rng>(rng: &mut R) -> F {
    loop {
        let value = F::rand(rng);
        if !value.is_zero() {
            return value;
        }
    }
}

impl<F: Field> Trapdoor<F> {
    fn sample<R: Rng + CryptoRng>(rng: &mut R) -> Self {
        Self {
            tau: nonzero(rng),
            alpha: nonzero(rng),
            beta: nonzero(rng),
            gamma: nonzero(rng),
            delta: nonzero(rng),
        }
    }
}

fn batch_mul<G: CurveGroup>(generator: G, scalars: &[G::ScalarField]) -> Vec<G::Affine> {
    let points = scalars
        .par_iter()
        .map(|s| scalar_mul(&generator, s))
        .collect::<Vec<_>>();
    G::normalize_batch(&points)
}

impl<E: Pairing> Groth16<E> {
    /// Generates a proving key for `matrices` from freshly sampled toxic waste.
    ///
    /// Not for production use, see the module documentation.
    pub fn insecure_setup<R: R1CSToQAP, Rn: Rng + CryptoRng>(
        matrices: &ConstraintMatrices<E::ScalarField>,
        rng: &mut Rn,
    ) -> Result<ProvingKey<E>> {
        let domain = qap_domain(matrices)?;
        loop {
            let trapdoor = Trapdoor::sample(rng);
            // tau on the domain would reveal the vanishing polynomial as zero
            if !domain.evaluate_vanishing_polynomial(&trapdoor.tau).is_zero() {
                return Self::setup_with_trapdoor::<R>(matrices, &trapdoor);
            }
        }
    }

    /// Generates the proving key for a known trapdoor.
    #[instrument(level = "debug", skip_all, fields(constraints = matrices.num_constraints))]
    pub fn setup_with_trapdoor<R: R1CSToQAP>(
        matrices: &ConstraintMatrices<E::ScalarField>,
        trapdoor: &Trapdoor<E::ScalarField>,
    ) -> Result<ProvingKey<E>> {
        let num_vars = num_variables(matrices);
        let num_inputs = matrices.num_instance_variables;
        check_indices(matrices, num_vars)?;

        let domain = qap_domain(matrices)?;
        let Trapdoor {
            tau,
            alpha,
            beta,
            gamma,
            delta,
        } = *trapdoor;
        let lagrange = domain.evaluate_all_lagrange_coefficients(&tau);

        // u_i(tau), v_i(tau), w_i(tau) for every wire
        let mut u = vec![E::ScalarField::zero(); num_vars];
        let mut v = vec![E::ScalarField::zero(); num_vars];
        let mut w = vec![E::ScalarField::zero(); num_vars];
        for (i, l) in lagrange.iter().enumerate().take(matrices.num_constraints) {
            for (polys, matrix) in [
                (&mut u, &matrices.a),
                (&mut v, &matrices.b),
                (&mut w, &matrices.c),
            ] {
                for (coeff, wire) in matrix.get(i).into_iter().flatten() {
                    polys[*wire] += *coeff * l;
                }
            }
        }
        for (i, l) in lagrange[matrices.num_constraints..]
            .iter()
            .take(num_inputs)
            .enumerate()
        {
            u[i] += l;
        }

        let gamma_inverse = inverse(&gamma)?;
        let delta_inverse = inverse(&delta)?;
        let combined = (0..num_vars)
            .into_par_iter()
            .map(|i| beta * u[i] + alpha * v[i] + w[i])
            .collect::<Vec<_>>();
        let gamma_abc = combined[..num_inputs]
            .iter()
            .map(|x| *x * gamma_inverse)
            .collect::<Vec<_>>();
        let l = combined[num_inputs..]
            .iter()
            .map(|x| *x * delta_inverse)
            .collect::<Vec<_>>();
        let h = R::h_query_scalars(&domain, tau, delta_inverse)?;

        let g1 = E::G1::generator();
        let g2 = E::G2::generator();
        let vk = VerifyingKey {
            alpha_g1: scalar_mul(&g1, &alpha).into_affine(),
            beta_g2: scalar_mul(&g2, &beta).into_affine(),
            gamma_g2: scalar_mul(&g2, &gamma).into_affine(),
            delta_g2: scalar_mul(&g2, &delta).into_affine(),
            gamma_abc_g1: batch_mul(g1, &gamma_abc),
        };
        Ok(ProvingKey {
            vk,
            beta_g1: scalar_mul(&g1, &beta).into_affine(),
            delta_g1: scalar_mul(&g1, &delta).into_affine(),
            a_query: batch_mul(g1, &u),
            b_g1_query: batch_mul(g1, &v),
            b_g2_query: batch_mul(g2, &v),
            h_query: batch_mul(g1, &h),
            l_query: batch_mul(g1, &l),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::r1cs::tests::square_chain;
    use crate::reduction::{CircomReduction, LibSnarkReduction};
    use ark_bn254::{Bn254, Fr};

    #[test]
    fn key_dimensions_follow_the_reduction() {
        let matrices = square_chain();
        let mut rng = crate::test_rng();
        // 2 constraints + 2 instance variables
        let domain_size = 4;
        let circom =
            Groth16::<Bn254>::insecure_setup::<CircomReduction, _>(&matrices, &mut rng).unwrap();
        assert_eq!(circom.h_query.len(), domain_size);
        let libsnark =
            Groth16::<Bn254>::insecure_setup::<LibSnarkReduction, _>(&matrices, &mut rng)
                .unwrap();
        assert_eq!(libsnark.h_query.len(), domain_size - 1);
        for pk in [circom, libsnark] {
            assert_eq!(pk.a_query.len(), 4);
            assert_eq!(pk.b_g2_query.len(), 4);
            assert_eq!(pk.l_query.len(), 2);
            assert_eq!(pk.vk.gamma_abc_g1.len(), 2);
        }
    }

    #[test]
    fn fixed_trapdoor_is_deterministic() {
        let matrices = square_chain();
        let trapdoor = Trapdoor {
            tau: Fr::from(17u64),
            alpha: Fr::from(2u64),
            beta: Fr::from(3u64),
            gamma: Fr::from(5u64),
            delta: Fr::from(7u64),
        };
        let a = Groth16::<Bn254>::setup_with_trapdoor::<CircomReduction>(&matrices, &trapdoor)
            .unwrap();
        let b = Groth16::<Bn254>::setup_with_trapdoor::<CircomReduction>(&matrices, &trapdoor)
            .unwrap();
        assert_eq!(a, b);
        let zero_gamma = Trapdoor {
            gamma: Fr::zero(),
            ..trapdoor
        };
        assert!(
            Groth16::<Bn254>::setup_with_trapdoor::<CircomReduction>(&matrices, &zero_gamma)
                .is_err()
        );
    }
}
