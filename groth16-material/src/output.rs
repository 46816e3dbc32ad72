//! Serialized proofs.
//!
//! [`ProvingOutput`] is the JSON returned by [`ProvingContext::prove`](crate::ProvingContext::prove),
//! [`ProofEnvelope`] a compact binary form of the same data.

use std::io::Read;

use ark_bn254::{Bn254, Fr};
use ark_groth16::Proof;
use ark_serialize::CanonicalSerialize;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use groth16::curve::point_from_compressed;
use groth16::field::{fr_from_decimal_strict, fr_from_le_bytes_strict, fr_to_le_bytes};
use groth16::{Groth16Error, Result};
use serde::{Deserialize, Serialize};

/// Length of a compressed proof: `A` (32 bytes), `B` (64 bytes) and `C` (32 bytes).
pub const PROOF_SIZE: usize = 128;

const FR_SIZE: usize = 32;

/// Decodes a compressed proof of exactly [`PROOF_SIZE`] bytes, checking that every point
/// is on the curve and in the prime order subgroup.
pub(crate) fn proof_from_bytes(bytes: &[u8]) -> Result<Proof<Bn254>> {
    if bytes.len() != PROOF_SIZE {
        return Err(Groth16Error::InvalidEncoding(format!(
            "expected a proof of {PROOF_SIZE} bytes, got {}",
            bytes.len()
        )));
    }
    Ok(Proof {
        a: point_from_compressed(&bytes[..32])?,
        b: point_from_compressed(&bytes[32..96])?,
        c: point_from_compressed(&bytes[96..])?,
    })
}

pub(crate) fn proof_to_bytes(proof: &Proof<Bn254>) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(PROOF_SIZE);
    proof.serialize_compressed(&mut bytes)?;
    Ok(bytes)
}

/// A proof with its public inputs, as returned to callers of the prover.
///
/// ```json
/// { "public_inputs": ["9"], "proof": "<256 hex digits>" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvingOutput {
    /// Public inputs as canonical decimal strings.
    pub public_inputs: Vec<String>,
    /// Hex of the compressed proof.
    pub proof: String,
}

impl ProvingOutput {
    /// Encodes a proof and its public inputs.
    pub fn new(public_inputs: &[Fr], proof: &Proof<Bn254>) -> Result<Self> {
        Ok(Self {
            public_inputs: public_inputs.iter().map(ToString::to_string).collect(),
            proof: hex::encode(proof_to_bytes(proof)?),
        })
    }

    /// Parses the JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| Groth16Error::InvalidEncoding(err.to_string()))
    }

    /// The JSON form.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|err| Groth16Error::InvalidEncoding(err.to_string()))
    }

    /// Decodes the public inputs and the proof.
    pub fn decode(&self) -> Result<(Vec<Fr>, Proof<Bn254>)> {
        let public_inputs = self
            .public_inputs
            .iter()
            .map(|input| fr_from_decimal_strict(input))
            .collect::<Result<Vec<_>>>()?;
        let bytes = hex::decode(&self.proof)
            .map_err(|err| Groth16Error::InvalidEncoding(format!("proof is not hex: {err}")))?;
        Ok((public_inputs, proof_from_bytes(&bytes)?))
    }
}

/// Public inputs and proof in one binary blob.
///
/// Layout: the number of public inputs as `u32` little endian, every input as 32 byte
/// little endian canonical field element, then the 128 byte compressed proof.
#[derive(Debug, Clone, PartialEq)]
pub struct ProofEnvelope {
    /// The public inputs.
    pub public_inputs: Vec<Fr>,
    /// The proof.
    pub proof: Proof<Bn254>,
}

impl ProofEnvelope {
    /// Serializes the envelope.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let count = u32::try_from(self.public_inputs.len()).map_err(|_| {
            Groth16Error::InvalidEncoding("too many public inputs".to_owned())
        })?;
        let mut bytes = Vec::with_capacity(4 + self.public_inputs.len() * FR_SIZE + PROOF_SIZE);
        bytes
            .write_u32::<LittleEndian>(count)
            .map_err(|err| Groth16Error::InvalidEncoding(err.to_string()))?;
        for input in &self.public_inputs {
            bytes.extend(fr_to_le_bytes(input));
        }
        bytes.extend(proof_to_bytes(&self.proof)?);
        Ok(bytes)
    }

    /// Parses an envelope, rejecting truncated input, trailing bytes and non-canonical
    /// field elements.
    pub fn from_bytes(mut bytes: &[u8]) -> Result<Self> {
        let truncated = |_| Groth16Error::InvalidEncoding("truncated proof envelope".to_owned());
        let count = bytes.read_u32::<LittleEndian>().map_err(truncated)? as usize;
        let expected = count
            .checked_mul(FR_SIZE)
            .and_then(|len| len.checked_add(PROOF_SIZE));
        if expected != Some(bytes.len()) {
            return Err(Groth16Error::InvalidEncoding(format!(
                "envelope with {count} public inputs has {} bytes after the count",
                bytes.len()
            )));
        }
        let mut public_inputs = Vec::with_capacity(count);
        let mut chunk = [0u8; FR_SIZE];
        for _ in 0..count {
            bytes.read_exact(&mut chunk).map_err(truncated)?;
            public_inputs.push(fr_from_le_bytes_strict(&chunk)?);
        }
        let proof = proof_from_bytes(bytes)?;
        Ok(Self {
            public_inputs,
            proof,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bn254::{G1Affine, G2Affine};
    use ark_ec::AffineRepr;
    use ark_ff::PrimeField;
    use groth16::ErrorKind;

    fn proof() -> Proof<Bn254> {
        let g1 = G1Affine::generator();
        Proof {
            a: g1,
            b: G2Affine::generator(),
            c: (g1 + g1).into(),
        }
    }

    #[test]
    fn proving_output_json() {
        let output = ProvingOutput::new(&[Fr::from(9u64)], &proof()).unwrap();
        assert_eq!(output.proof.len(), 2 * PROOF_SIZE);
        let json = output.to_json().unwrap();
        assert!(json.contains(r#""public_inputs":["9"]"#));
        let parsed = ProvingOutput::from_json(&json).unwrap();
        assert_eq!(parsed.decode().unwrap(), (vec![Fr::from(9u64)], proof()));
    }

    #[test]
    fn proving_output_rejects_bad_fields() {
        let valid = ProvingOutput::new(&[Fr::from(9u64)], &proof()).unwrap();

        let mut bad_input = valid.clone();
        bad_input.public_inputs = vec![Fr::MODULUS.to_string()];
        assert_eq!(
            bad_input.decode().unwrap_err().kind(),
            ErrorKind::InvalidFieldElement
        );

        let mut bad_hex = valid.clone();
        bad_hex.proof.replace_range(0..2, "zz");
        assert_eq!(bad_hex.decode().unwrap_err().kind(), ErrorKind::InvalidEncoding);

        let mut short = valid;
        short.proof.truncate(2 * PROOF_SIZE - 2);
        assert_eq!(short.decode().unwrap_err().kind(), ErrorKind::InvalidEncoding);

        assert!(ProvingOutput::from_json(r#"{"proof": "00"}"#).is_err());
    }

    #[test]
    fn envelope_layout() {
        let envelope = ProofEnvelope {
            public_inputs: vec![Fr::from(1u64), Fr::from(2u64)],
            proof: proof(),
        };
        let bytes = envelope.to_bytes().unwrap();
        assert_eq!(bytes.len(), 4 + 2 * 32 + PROOF_SIZE);
        assert_eq!(&bytes[..4], &[2, 0, 0, 0]);
        assert_eq!(bytes[4], 1);
        assert_eq!(bytes[36], 2);
        assert_eq!(ProofEnvelope::from_bytes(&bytes).unwrap(), envelope);

        assert!(ProofEnvelope::from_bytes(&bytes[..bytes.len() - 1]).is_err());
        let mut trailing = bytes.clone();
        trailing.push(0);
        assert!(ProofEnvelope::from_bytes(&trailing).is_err());
        assert!(ProofEnvelope::from_bytes(&[1, 0]).is_err());

        let mut non_canonical = bytes;
        non_canonical[4..36].fill(0xff);
        assert_eq!(
            ProofEnvelope::from_bytes(&non_canonical).unwrap_err().kind(),
            ErrorKind::InvalidFieldElement
        );
    }
}
