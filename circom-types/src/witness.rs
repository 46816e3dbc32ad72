//! Witness files (`.wtns`) as written by snarkjs and the circom witness generators.

use std::io::{Read, Write};

use ark_ff::{BigInteger, PrimeField};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

use crate::binfile::{BinFile, BinFileError, write_bin_file};
use crate::reader_utils::{is_modulus_of, prime_field_from_reader};

const WITNESS_VERSION: u32 = 2;
const HEADER_SECTION: u32 = 1;
const VALUES_SECTION: u32 = 2;

/// Error type describing errors during parsing witness files
#[derive(Debug, Error)]
pub enum WitnessParserError {
    /// Error during IO operations (reading/opening file, etc.)
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    /// Malformed container.
    #[error(transparent)]
    BinFile(#[from] BinFileError),
    /// Field of witness file does not match the expected field
    #[error("Witness file is defined over a different field than expected")]
    WrongField,
    /// The value section does not hold the declared number of values.
    #[error("expected {expected} witness values but the section holds {actual} bytes")]
    WrongLength {
        /// Declared number of values.
        expected: usize,
        /// Section length in bytes.
        actual: usize,
    },
}

/// A full assignment of all wires of a circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Witness<F> {
    /// The values, wire 0 first.
    pub values: Vec<F>,
}

impl<F: PrimeField> Witness<F> {
    /// Reads a `.wtns` file.
    pub fn from_reader(mut reader: impl Read) -> Result<Self, WitnessParserError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let file = BinFile::parse(&bytes, "wtns")?;
        if file.version() != WITNESS_VERSION {
            return Err(BinFileError::UnsupportedVersion {
                kind: "wtns",
                version: file.version(),
            }
            .into());
        }
        let mut header = file.section(HEADER_SECTION)?;
        let n8 = header.read_u32::<LittleEndian>()? as usize;
        if !is_modulus_of::<F>(&mut header, n8)? {
            return Err(WitnessParserError::WrongField);
        }
        let num_values = header.read_u32::<LittleEndian>()? as usize;

        let mut section = file.section(VALUES_SECTION)?;
        if section.len() != num_values * n8 {
            return Err(WitnessParserError::WrongLength {
                expected: num_values,
                actual: section.len(),
            });
        }
        let values = (0..num_values)
            .map(|_| prime_field_from_reader(&mut section, n8))
            .collect::<Result<Vec<F>, _>>()?;
        Ok(Self { values })
    }

    /// Writes the witness as a version 2 `.wtns` file.
    pub fn to_writer<W: Write>(&self, writer: W) -> std::io::Result<()> {
        let modulus = F::MODULUS.to_bytes_le();
        let mut header = Vec::new();
        header.write_u32::<LittleEndian>(modulus.len() as u32)?;
        header.write_all(&modulus)?;
        header.write_u32::<LittleEndian>(self.values.len() as u32)?;
        let mut values = Vec::with_capacity(self.values.len() * modulus.len());
        for v in &self.values {
            values.write_all(&v.into_bigint().to_bytes_le())?;
        }
        write_bin_file(
            writer,
            "wtns",
            WITNESS_VERSION,
            &[(HEADER_SECTION, header), (VALUES_SECTION, values)],
        )
    }
}
