#![warn(missing_docs)]
//! Rust representations of the artefacts produced by circom and snarkjs, and parsers
//! that load them into arkworks types.
//!
//! Binary formats: `.r1cs` constraint systems, `.wtns` witnesses and Groth16 `.zkey`
//! proving keys. JSON formats: proofs, verification keys and public inputs.
mod binfile;
pub mod groth16;
mod r1cs;
pub mod traits;
mod witness;

pub use binfile::BinFileError;
pub use r1cs::{Constraint, R1CS, R1CSParserError};
pub use witness::{Witness, WitnessParserError};

pub use ark_serde_compat::CheckElement;

pub(crate) mod reader_utils {
    use ark_ff::{BigInteger, PrimeField};
    use std::{io::Read, str::Utf8Error};
    use thiserror::Error;

    /// Error type describing errors during reading circom file headers
    #[derive(Debug, Error)]
    pub enum InvalidHeaderError {
        /// Error during IO operations (reading/opening file, etc.)
        #[error(transparent)]
        IoError(#[from] std::io::Error),
        /// File header is not valid UTF-8
        #[error(transparent)]
        Utf8Error(#[from] Utf8Error),
        /// File header does not match the expected header
        #[error("Wrong header. Expected {0} but got {1}")]
        WrongHeader(String, String),
    }

    pub(crate) fn read_header<R: Read>(
        mut reader: R,
        should_header: &str,
    ) -> Result<(), InvalidHeaderError> {
        let mut buf = [0_u8; 4];
        reader.read_exact(&mut buf)?;
        let is_header = std::str::from_utf8(&buf[..])?;
        if is_header == should_header {
            Ok(())
        } else {
            Err(InvalidHeaderError::WrongHeader(
                should_header.to_owned(),
                is_header.to_owned(),
            ))
        }
    }

    /// Reads a little-endian field element in standard form, reducing mod p.
    pub(crate) fn prime_field_from_reader<F: PrimeField>(
        mut reader: impl Read,
        size: usize,
    ) -> std::io::Result<F> {
        let mut buf = vec![0u8; size];
        reader.read_exact(&mut buf[..])?;
        Ok(F::from_le_bytes_mod_order(&buf))
    }

    /// Reads an `n8`-prefixed prime and checks it is the modulus of `F`.
    pub(crate) fn is_modulus_of<F: PrimeField>(
        mut reader: impl Read,
        n8: usize,
    ) -> std::io::Result<bool> {
        let mut buf = vec![0u8; n8];
        reader.read_exact(&mut buf)?;
        let expected = F::MODULUS.to_bytes_le();
        Ok(n8 == expected.len() && buf == expected)
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    #![allow(unused)]

    macro_rules! to_g1_bn254 {
        ($x: expr, $y: expr) => {{
            use std::str::FromStr;
            ark_bn254::G1Affine::new(
                ark_bn254::Fq::from_str($x).unwrap(),
                ark_bn254::Fq::from_str($y).unwrap(),
            )
        }};
    }

    macro_rules! to_g2_bn254 {
        ({$x1: expr, $x2: expr}, {$y1: expr, $y2: expr}) => {{
            use std::str::FromStr;
            ark_bn254::G2Affine::new(
                ark_bn254::Fq2::new(
                    ark_bn254::Fq::from_str($x1).unwrap(),
                    ark_bn254::Fq::from_str($x2).unwrap(),
                ),
                ark_bn254::Fq2::new(
                    ark_bn254::Fq::from_str($y1).unwrap(),
                    ark_bn254::Fq::from_str($y2).unwrap(),
                ),
            )
        }};
    }

    pub(crate) use to_g1_bn254;
    pub(crate) use to_g2_bn254;
}
