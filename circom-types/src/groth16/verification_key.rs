//! The snarkjs `verification_key.json` layout.

use ark_bn254::{Bn254, Fq12, G1Affine, G2Affine};
use ark_ec::pairing::Pairing;
use ark_groth16::VerifyingKey;
use serde::{Deserialize, Serialize};

use crate::traits::CircomArkworksPairingBridge;

/// A Groth16 verification key as exported by `snarkjs zkey export verificationkey`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationKey {
    /// Always `groth16`.
    pub protocol: String,
    /// Always `bn128`.
    pub curve: String,
    /// Number of public signals.
    #[serde(rename = "nPublic")]
    pub n_public: usize,
    /// `alpha` in G1.
    #[serde(serialize_with = "ark_serde_compat::bn254::serialize_g1")]
    #[serde(deserialize_with = "ark_serde_compat::bn254::deserialize_g1")]
    pub vk_alpha_1: G1Affine,
    /// `beta` in G2.
    #[serde(serialize_with = "ark_serde_compat::bn254::serialize_g2")]
    #[serde(deserialize_with = "ark_serde_compat::bn254::deserialize_g2")]
    pub vk_beta_2: G2Affine,
    /// `gamma` in G2.
    #[serde(serialize_with = "ark_serde_compat::bn254::serialize_g2")]
    #[serde(deserialize_with = "ark_serde_compat::bn254::deserialize_g2")]
    pub vk_gamma_2: G2Affine,
    /// `delta` in G2.
    #[serde(serialize_with = "ark_serde_compat::bn254::serialize_g2")]
    #[serde(deserialize_with = "ark_serde_compat::bn254::deserialize_g2")]
    pub vk_delta_2: G2Affine,
    /// `e(alpha, beta)`.
    #[serde(serialize_with = "ark_serde_compat::bn254::serialize_gt")]
    #[serde(deserialize_with = "ark_serde_compat::bn254::deserialize_gt")]
    pub vk_alphabeta_12: Fq12,
    /// Commitments to the public signals, the constant wire first.
    #[serde(rename = "IC")]
    #[serde(serialize_with = "ark_serde_compat::bn254::serialize_g1_seq")]
    #[serde(deserialize_with = "ark_serde_compat::bn254::deserialize_g1_seq")]
    pub ic: Vec<G1Affine>,
}

impl From<VerifyingKey<Bn254>> for VerificationKey {
    fn from(vk: VerifyingKey<Bn254>) -> Self {
        let alpha_beta = Bn254::pairing(vk.alpha_g1, vk.beta_g2).0;
        Self {
            protocol: "groth16".to_owned(),
            curve: Bn254::get_circom_name(),
            n_public: vk.gamma_abc_g1.len().saturating_sub(1),
            vk_alpha_1: vk.alpha_g1,
            vk_beta_2: vk.beta_g2,
            vk_gamma_2: vk.gamma_g2,
            vk_delta_2: vk.delta_g2,
            vk_alphabeta_12: alpha_beta,
            ic: vk.gamma_abc_g1,
        }
    }
}

impl From<VerificationKey> for VerifyingKey<Bn254> {
    fn from(vk: VerificationKey) -> Self {
        Self {
            alpha_g1: vk.vk_alpha_1,
            beta_g2: vk.vk_beta_2,
            gamma_g2: vk.vk_gamma_2,
            delta_g2: vk.vk_delta_2,
            gamma_abc_g1: vk.ic,
        }
    }
}
