use ark_ec::pairing::Pairing;
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::UniformRand;
use ark_groth16::{Proof, ProvingKey};
use ark_relations::r1cs::ConstraintMatrices;
use rand::{CryptoRng, Rng};
use tracing::instrument;

use crate::curve::pairing_product_is_one;
use crate::msm::msm;
use crate::r1cs::{check_witness, num_variables};
use crate::reduction::{R1CSToQAP, qap_domain};
use crate::{Groth16, Groth16Error, Result};

fn expect_len(what: &str, actual: usize, expected: usize) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(Groth16Error::ProvingKeyMismatch(format!(
            "{what} has {actual} elements, the constraint system needs {expected}"
        )))
    }
}

/// Checks that `pk` was generated for `matrices` with the reduction `R`.
pub fn check_proving_key<E: Pairing, R: R1CSToQAP>(
    pk: &ProvingKey<E>,
    matrices: &ConstraintMatrices<E::ScalarField>,
) -> Result<()> {
    let num_vars = num_variables(matrices);
    let domain = qap_domain(matrices)?;
    expect_len("a_query", pk.a_query.len(), num_vars)?;
    expect_len("b_g1_query", pk.b_g1_query.len(), num_vars)?;
    expect_len("b_g2_query", pk.b_g2_query.len(), num_vars)?;
    expect_len("l_query", pk.l_query.len(), matrices.num_witness_variables)?;
    expect_len(
        "gamma_abc_g1",
        pk.vk.gamma_abc_g1.len(),
        matrices.num_instance_variables,
    )?;
    expect_len("h_query", pk.h_query.len(), R::h_query_size(domain.size()))
}

/// Checks that the G1 and G2 copies of `beta` and `delta` in `pk` encode the same
/// scalars, `e(x_1, g_2) = e(g_1, x_2)`.
pub fn check_key_consistency<E: Pairing>(pk: &ProvingKey<E>) -> Result<()> {
    let g1 = E::G1Affine::generator();
    let g2 = E::G2Affine::generator();
    for (what, x1, x2) in [
        ("beta", pk.beta_g1, pk.vk.beta_g2),
        ("delta", pk.delta_g1, pk.vk.delta_g2),
    ] {
        let neg_g1 = (-g1.into_group()).into_affine();
        if !pairing_product_is_one::<E>(&[x1, neg_g1], &[g2, x2]) {
            return Err(Groth16Error::ProvingKeyMismatch(format!(
                "{what} in G1 and G2 do not match"
            )));
        }
    }
    Ok(())
}

impl<E: Pairing> Groth16<E> {
    /// Creates a proof with the blinding factors `r` and `s`.
    ///
    /// The witness is the full assignment, the constant one first, followed by the
    /// public and the private signals. It is not checked against the constraints, a
    /// witness that violates them yields a proof that does not verify.
    #[instrument(level = "debug", name = "Groth16::prove", skip_all, fields(constraints = matrices.num_constraints))]
    pub fn prove<R: R1CSToQAP>(
        pk: &ProvingKey<E>,
        r: E::ScalarField,
        s: E::ScalarField,
        matrices: &ConstraintMatrices<E::ScalarField>,
        witness: &[E::ScalarField],
    ) -> Result<Proof<E>> {
        check_witness(matrices, witness)?;
        check_proving_key::<E, R>(pk, matrices)?;

        let h = R::witness_map(matrices, witness)?;
        let private = &witness[matrices.num_instance_variables..];

        let ((a_acc, b_g1_acc), (b_g2_acc, (l_acc, h_acc))) = rayon::join(
            || {
                rayon::join(
                    || msm_span::<E::G1>("a_query", &pk.a_query, witness),
                    || msm_span::<E::G1>("b_g1_query", &pk.b_g1_query, witness),
                )
            },
            || {
                rayon::join(
                    || msm_span::<E::G2>("b_g2_query", &pk.b_g2_query, witness),
                    || {
                        rayon::join(
                            || msm_span::<E::G1>("l_query", &pk.l_query, private),
                            || msm_span::<E::G1>("h_query", &pk.h_query, &h),
                        )
                    },
                )
            },
        );

        let _span = tracing::debug_span!("assemble").entered();
        let delta_g1 = pk.delta_g1.into_group();
        let g_a = a_acc? + pk.vk.alpha_g1 + delta_g1 * r;
        let g1_b = b_g1_acc? + pk.beta_g1 + delta_g1 * s;
        let g2_b = b_g2_acc? + pk.vk.beta_g2 + pk.vk.delta_g2 * s;
        let g_c = g_a * s + g1_b * r - delta_g1 * (r * s) + l_acc? + h_acc?;

        Ok(Proof {
            a: g_a.into_affine(),
            b: g2_b.into_affine(),
            c: g_c.into_affine(),
        })
    }

    /// Creates a proof with blinding factors drawn from `rng`.
    pub fn prove_with_rng<R: R1CSToQAP, Rn: Rng + CryptoRng>(
        pk: &ProvingKey<E>,
        matrices: &ConstraintMatrices<E::ScalarField>,
        witness: &[E::ScalarField],
        rng: &mut Rn,
    ) -> Result<Proof<E>> {
        let r = E::ScalarField::rand(rng);
        let s = E::ScalarField::rand(rng);
        Self::prove::<R>(pk, r, s, matrices, witness)
    }
}

fn msm_span<G: CurveGroup>(name: &str, bases: &[G::Affine], scalars: &[G::ScalarField]) -> Result<G> {
    let _span = tracing::debug_span!("msm", query = name, len = bases.len()).entered();
    msm::<G>(bases, scalars).map_err(|err| {
        Groth16Error::ProvingKeyMismatch(format!("{name}: {err}"))
    })
}
