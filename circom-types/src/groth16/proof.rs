//! The snarkjs `proof.json` layout.

use ark_bn254::{Bn254, G1Affine, G2Affine};
use ark_groth16::Proof;
use serde::{Deserialize, Serialize};

use crate::traits::CircomArkworksPairingBridge;

/// A Groth16 proof in the JSON layout of snarkjs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Groth16Proof {
    /// Proof element A.
    #[serde(serialize_with = "ark_serde_compat::bn254::serialize_g1")]
    #[serde(deserialize_with = "ark_serde_compat::bn254::deserialize_g1")]
    pub pi_a: G1Affine,
    /// Proof element B.
    #[serde(serialize_with = "ark_serde_compat::bn254::serialize_g2")]
    #[serde(deserialize_with = "ark_serde_compat::bn254::deserialize_g2")]
    pub pi_b: G2Affine,
    /// Proof element C.
    #[serde(serialize_with = "ark_serde_compat::bn254::serialize_g1")]
    #[serde(deserialize_with = "ark_serde_compat::bn254::deserialize_g1")]
    pub pi_c: G1Affine,
    /// Always `groth16`.
    pub protocol: String,
    /// Always `bn128`.
    pub curve: String,
}

impl From<Proof<Bn254>> for Groth16Proof {
    fn from(proof: Proof<Bn254>) -> Self {
        Self {
            pi_a: proof.a,
            pi_b: proof.b,
            pi_c: proof.c,
            protocol: "groth16".to_owned(),
            curve: Bn254::get_circom_name(),
        }
    }
}

impl From<Groth16Proof> for Proof<Bn254> {
    fn from(proof: Groth16Proof) -> Self {
        Self {
            a: proof.pi_a,
            b: proof.pi_b,
            c: proof.pi_c,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ec::{AffineRepr, CurveGroup};

    #[test]
    fn snarkjs_layout() {
        let proof = Proof::<Bn254> {
            a: G1Affine::generator(),
            b: G2Affine::generator(),
            c: (G1Affine::generator() * ark_bn254::Fr::from(3u64)).into_affine(),
        };
        let json = serde_json::to_value(Groth16Proof::from(proof.clone())).unwrap();
        assert_eq!(json["protocol"], "groth16");
        assert_eq!(json["curve"], "bn128");
        assert_eq!(json["pi_a"], serde_json::json!(["1", "2", "1"]));
        assert_eq!(json["pi_b"].as_array().unwrap().len(), 3);

        let back: Groth16Proof = serde_json::from_value(json).unwrap();
        assert_eq!(Proof::<Bn254>::from(back), proof);
    }
}
