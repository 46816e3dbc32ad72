//! Groth16 proof generation and verification for compiled circuits over BN254.
//!
//! A circuit is loaded once into a [`ProvingContext`] from three artefacts: the compiled
//! witness program, the `.r1cs` constraint system and the proving key (a snarkjs `.zkey`
//! or an [`ArkZkey`] cache). The context computes witnesses from JSON inputs, proves them
//! with the native prover of the `g16-groth16` crate and hands out the verifying key.
//!
//! Verification only needs serialized data, see [`verify`] and [`verify_bn254`].
#![warn(missing_docs)]

mod context;
mod input;
mod output;
mod verify;
pub mod witness;

use groth16::{ErrorKind, Groth16Error};

pub use ark_groth16::{Proof, VerifyingKey};
pub use ark_serialize::{Compress, Validate};
pub use circom_types::groth16::ArkZkey;
pub use context::{ProvingContext, ProvingContextBuilder, QapReduction};
pub use input::{ProofInput, parse_inputs};
pub use output::{PROOF_SIZE, ProofEnvelope, ProvingOutput};
pub use verify::{VerifyStatus, verify, verify_bn254, verify_envelope};
pub use witness::{BlackBoxFunction, WitnessError, WitnessProgram};

/// Errors that can occur while loading the artefacts of a circuit.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The SHA-256 fingerprint of the proving key did not match the expected value.
    #[error("invalid proving key - wrong sha256 fingerprint: {0}")]
    ZkeyFingerprintMismatch(String),
    /// The SHA-256 fingerprint of the `.r1cs` did not match the expected value.
    #[error("invalid r1cs - wrong sha256 fingerprint: {0}")]
    R1csFingerprintMismatch(String),
    /// The SHA-256 fingerprint of the witness program did not match the expected value.
    #[error("invalid witness program - wrong sha256 fingerprint: {0}")]
    ProgramFingerprintMismatch(String),
    /// Could not parse the proving key.
    #[error("Could not parse proving key - see wrapped error")]
    ZkeyInvalid(#[source] eyre::Report),
    /// Could not parse the `.r1cs`.
    #[error("Could not parse r1cs - see wrapped error")]
    R1csInvalid(#[source] eyre::Report),
    /// Could not parse or validate the witness program.
    #[error("Could not parse witness program - see wrapped error")]
    ProgramInvalid(#[source] eyre::Report),
    /// The artefacts were parsed but do not describe the same circuit.
    #[error(transparent)]
    Mismatch(#[from] Groth16Error),
    /// Could not build the worker pool.
    #[error("could not build the worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    /// Any I/O error encountered while reading the artefacts.
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

impl From<circom_types::groth16::ZKeyParserError> for LoadError {
    fn from(value: circom_types::groth16::ZKeyParserError) -> Self {
        Self::ZkeyInvalid(eyre::eyre!(value))
    }
}

impl From<ark_serialize::SerializationError> for LoadError {
    fn from(value: ark_serialize::SerializationError) -> Self {
        Self::ZkeyInvalid(eyre::eyre!(value))
    }
}

impl From<circom_types::R1CSParserError> for LoadError {
    fn from(value: circom_types::R1CSParserError) -> Self {
        Self::R1csInvalid(eyre::eyre!(value))
    }
}

/// Errors of the [`ProvingContext`] API.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// The context was released.
    #[error("proving context was released")]
    ContextClosed,
    /// Witness calculation failed.
    #[error(transparent)]
    Witness(#[from] WitnessError),
    /// Proving or verification failed.
    #[error(transparent)]
    Groth16(#[from] Groth16Error),
}

impl ContextError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ContextError::ContextClosed => ErrorKind::ContextClosed,
            ContextError::Witness(err) => err.kind(),
            ContextError::Groth16(err) => err.kind(),
        }
    }
}

/// Deterministic `StdRng` with the same seed as `ark_std::test_rng`, usable where a
/// `CryptoRng` is required.
#[cfg(test)]
pub(crate) fn test_rng() -> rand::rngs::StdRng {
    use rand::SeedableRng;
    rand::rngs::StdRng::from_seed([
        1, 0, 0, 0, 23, 0, 0, 0, 200, 1, 0, 0, 210, 30, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        0, 0, 0, 0,
    ])
}
