#![warn(missing_docs)]
//! A native implementation of the [Groth16](https://eprint.iacr.org/2016/260.pdf) zkSNARK.
//!
//! The crate contains everything between a satisfied R1CS witness and a verified proof:
//!
//! - checked field and curve encodings ([`field`], [`curve`]),
//! - multi-scalar multiplication ([`msm`]),
//! - radix-2 FFTs and the QAP quotient ([`poly`], [`CircomReduction`], [`LibSnarkReduction`]),
//! - the prover ([`Groth16::prove`]) and the verifier ([`Groth16::verify`]).
//!
//! Keys and proofs are the `arkworks` types from `ark-groth16`, so proving keys parsed from
//! snarkjs `.zkey` files can be used directly with [`CircomReduction`].
//!
//! ```no_run
//! # use ark_bn254::{Bn254, Fr};
//! # use ark_groth16::ProvingKey;
//! # use ark_relations::r1cs::ConstraintMatrices;
//! # use g16_groth16::{CircomReduction, Groth16};
//! # fn load() -> (ProvingKey<Bn254>, ConstraintMatrices<Fr>, Vec<Fr>) { unimplemented!() }
//! let (pk, matrices, witness) = load();
//! let mut rng = rand::thread_rng();
//! let proof =
//!     Groth16::prove_with_rng::<CircomReduction, _>(&pk, &matrices, &witness, &mut rng)?;
//! let public_inputs = &witness[1..matrices.num_instance_variables];
//! assert!(Groth16::verify(&pk.vk, &proof, public_inputs)?);
//! # Ok::<(), g16_groth16::Groth16Error>(())
//! ```

use std::marker::PhantomData;

use ark_ec::pairing::Pairing;

pub mod curve;
mod error;
pub mod field;
pub mod msm;
pub mod poly;
mod prover;
pub mod r1cs;
mod reduction;
mod setup;
mod verifier;

pub use error::{ErrorKind, Groth16Error, Result};
pub use prover::{check_key_consistency, check_proving_key};
pub use reduction::{CircomReduction, LibSnarkReduction, R1CSToQAP, qap_domain};
pub use setup::Trapdoor;
pub use verifier::PreparedVerifyingKey;

/// The Groth16 proof system over the pairing `E`.
///
/// All functionality lives in associated functions, the type itself carries no data.
pub struct Groth16<E: Pairing> {
    _marker: PhantomData<E>,
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
