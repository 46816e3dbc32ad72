use ark_ec::pairing::Pairing;
use ark_ec::{AffineRepr, CurveGroup};
use ark_groth16::{Proof, VerifyingKey};
use tracing::instrument;

use crate::curve::{final_exponentiation, miller_loop, pairing};
use crate::msm::msm;
use crate::{Groth16, Groth16Error, Result};

/// A verifying key with `e(alpha, beta)` and the negated, prepared `gamma` and `delta`.
#[derive(Clone, Debug)]
pub struct PreparedVerifyingKey<E: Pairing> {
    /// The key itself.
    pub vk: VerifyingKey<E>,
    /// `e(alpha, beta)`.
    pub alpha_g1_beta_g2: E::TargetField,
    /// `-gamma`, prepared for the Miller loop.
    pub gamma_g2_neg_pc: E::G2Prepared,
    /// `-delta`, prepared for the Miller loop.
    pub delta_g2_neg_pc: E::G2Prepared,
}

impl<E: Pairing> From<VerifyingKey<E>> for PreparedVerifyingKey<E> {
    fn from(vk: VerifyingKey<E>) -> Self {
        Groth16::prepare_verifying_key(vk)
    }
}

impl<E: Pairing> Groth16<E> {
    /// Precomputes the parts of the verification equation that only depend on `vk`.
    pub fn prepare_verifying_key(vk: VerifyingKey<E>) -> PreparedVerifyingKey<E> {
        PreparedVerifyingKey {
            alpha_g1_beta_g2: pairing::<E>(vk.alpha_g1, vk.beta_g2).0,
            gamma_g2_neg_pc: (-vk.gamma_g2.into_group()).into_affine().into(),
            delta_g2_neg_pc: (-vk.delta_g2.into_group()).into_affine().into(),
            vk,
        }
    }

    /// Verifies `proof` for `public_inputs`, the values of the instance wires after the
    /// constant one.
    ///
    /// Returns `Ok(false)` for a proof that does not verify and an error if the number
    /// of public inputs does not match the key.
    pub fn verify(
        vk: &VerifyingKey<E>,
        proof: &Proof<E>,
        public_inputs: &[E::ScalarField],
    ) -> Result<bool> {
        check_input_count(vk, public_inputs)?;
        let pvk = Self::prepare_verifying_key(vk.clone());
        Self::verify_prepared(&pvk, proof, public_inputs)
    }

    /// Checks `e(A, B) = e(alpha, beta) * e(vk_x, gamma) * e(C, delta)` as a single
    /// multi-Miller loop.
    #[instrument(level = "debug", name = "Groth16::verify", skip_all, fields(inputs = public_inputs.len()))]
    pub fn verify_prepared(
        pvk: &PreparedVerifyingKey<E>,
        proof: &Proof<E>,
        public_inputs: &[E::ScalarField],
    ) -> Result<bool> {
        check_input_count(&pvk.vk, public_inputs)?;
        let vk_x = msm::<E::G1>(&pvk.vk.gamma_abc_g1[1..], public_inputs)?
            + pvk.vk.gamma_abc_g1[0];

        let miller = miller_loop::<E>(
            [proof.a, vk_x.into_affine(), proof.c],
            [
                proof.b.into(),
                pvk.gamma_g2_neg_pc.clone(),
                pvk.delta_g2_neg_pc.clone(),
            ],
        );
        Ok(final_exponentiation(miller).is_some_and(|product| product.0 == pvk.alpha_g1_beta_g2))
    }
}

fn check_input_count<E: Pairing>(
    vk: &VerifyingKey<E>,
    public_inputs: &[E::ScalarField],
) -> Result<()> {
    let expected = vk.gamma_abc_g1.len().saturating_sub(1);
    if vk.gamma_abc_g1.is_empty() || public_inputs.len() != expected {
        return Err(Groth16Error::PublicInputCountMismatch {
            expected,
            actual: public_inputs.len(),
        });
    }
    Ok(())
}
