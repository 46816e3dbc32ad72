//! Verification from serialized keys and proofs.

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Proof, VerifyingKey};
use ark_serialize::CanonicalDeserialize;
use groth16::field::fr_from_le_bytes_strict;
use groth16::{Groth16, Groth16Error, Result};

use crate::output::{ProofEnvelope, ProvingOutput, proof_from_bytes};

/// Outcome of [`verify_bn254`], with the integer codes of the C-style interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum VerifyStatus {
    /// The proof is valid.
    Valid = 0,
    /// Everything decoded but the proof does not verify.
    Invalid = -1,
    /// The key, an input or the proof could not be decoded.
    InvalidEncoding = -2,
    /// The number of public inputs does not match the key.
    PublicInputCountMismatch = -3,
}

impl VerifyStatus {
    /// The integer code.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Whether the proof is valid.
    pub fn is_valid(self) -> bool {
        self == VerifyStatus::Valid
    }
}

impl From<Result<bool>> for VerifyStatus {
    fn from(result: Result<bool>) -> Self {
        match result {
            Ok(true) => VerifyStatus::Valid,
            Ok(false) => VerifyStatus::Invalid,
            Err(Groth16Error::PublicInputCountMismatch { .. }) => {
                VerifyStatus::PublicInputCountMismatch
            }
            Err(_) => VerifyStatus::InvalidEncoding,
        }
    }
}

// Decodes the compressed verifying key, rejecting trailing bytes.
fn vk_from_bytes(mut bytes: &[u8]) -> Result<VerifyingKey<Bn254>> {
    let vk = VerifyingKey::deserialize_compressed(&mut bytes)?;
    if !bytes.is_empty() {
        return Err(Groth16Error::InvalidEncoding(format!(
            "{} trailing bytes after the verifying key",
            bytes.len()
        )));
    }
    Ok(vk)
}

fn verify_decoded(
    vk: &VerifyingKey<Bn254>,
    proof: &Proof<Bn254>,
    public_inputs: &[Fr],
) -> Result<bool> {
    let valid = Groth16::verify(vk, proof, public_inputs)?;
    if !valid {
        tracing::warn!(public_inputs = public_inputs.len(), "proof rejected");
    }
    Ok(valid)
}

/// Verifies the [`ProvingOutput`] JSON against the hex encoded compressed verifying key.
///
/// Decoding failures and a wrong number of public inputs are errors, a proof that does
/// not verify is `Ok(false)`.
pub fn verify(vk_hex: &str, proving_output: &str) -> Result<bool> {
    let vk_bytes = hex::decode(vk_hex.trim())
        .map_err(|err| Groth16Error::InvalidEncoding(format!("verifying key is not hex: {err}")))?;
    let vk = vk_from_bytes(&vk_bytes)?;
    let (public_inputs, proof) = ProvingOutput::from_json(proving_output)?.decode()?;
    verify_decoded(&vk, &proof, &public_inputs)
}

/// Verifies a compressed proof against a compressed verifying key and public inputs given
/// as 32 byte little endian canonical field elements.
///
/// Every input is decoded, with curve, subgroup and range checks, before any pairing is
/// computed.
pub fn verify_bn254(vk: &[u8], public_inputs: &[&[u8]], proof: &[u8]) -> VerifyStatus {
    let result = (|| {
        let vk = vk_from_bytes(vk)?;
        let public_inputs = public_inputs
            .iter()
            .map(|chunk| fr_from_le_bytes_strict(chunk))
            .collect::<Result<Vec<_>>>()?;
        let proof = proof_from_bytes(proof)?;
        verify_decoded(&vk, &proof, &public_inputs)
    })();
    if let Err(err) = &result {
        tracing::warn!(%err, "could not verify proof");
    }
    VerifyStatus::from(result)
}

/// Like [`verify_bn254`], with public inputs and proof in a [`ProofEnvelope`].
pub fn verify_envelope(vk: &[u8], envelope: &[u8]) -> VerifyStatus {
    let result = vk_from_bytes(vk).and_then(|vk| {
        let envelope = ProofEnvelope::from_bytes(envelope)?;
        verify_decoded(&vk, &envelope.proof, &envelope.public_inputs)
    });
    if let Err(err) = &result {
        tracing::warn!(%err, "could not verify proof envelope");
    }
    VerifyStatus::from(result)
}
