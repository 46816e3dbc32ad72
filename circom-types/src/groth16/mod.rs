//! Groth16 artefacts as produced by snarkjs, and their arkworks counterparts.
mod ark_zkey;
mod proof;
mod public_input;
mod verification_key;
mod zkey;

pub use ark_zkey::ArkZkey;
pub use proof::Groth16Proof;
pub use public_input::PublicInput;
pub use verification_key::VerificationKey;
pub use zkey::{ZKey, ZKeyParserError};
