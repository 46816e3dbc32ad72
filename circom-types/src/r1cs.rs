//! Parser for the iden3 `.r1cs` binary format written by the circom compiler.

use std::io::{Read, Write};

use ark_ff::{BigInteger, PrimeField};
use ark_relations::r1cs::ConstraintMatrices;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

use crate::binfile::{BinFile, BinFileError, write_bin_file};
use crate::reader_utils::{is_modulus_of, prime_field_from_reader};

const R1CS_VERSION: u32 = 1;
const HEADER_SECTION: u32 = 1;
const CONSTRAINT_SECTION: u32 = 2;
const WIRE2LABEL_SECTION: u32 = 3;

/// Error type describing errors during parsing R1CS files
#[derive(Debug, Error)]
pub enum R1CSParserError {
    /// Error during IO operations (reading/opening file, etc.)
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    /// Malformed container.
    #[error(transparent)]
    BinFile(#[from] BinFileError),
    /// Field of R1CS file does not match the expected field
    #[error("R1CS file is defined over a different field than expected")]
    WrongField,
    /// A constraint references a wire outside `0..num_wires`.
    #[error("constraint {constraint} references wire {wire} but the circuit has {num_wires} wires")]
    WireOutOfRange {
        /// Constraint index.
        constraint: usize,
        /// Offending wire.
        wire: usize,
        /// Declared wire count.
        num_wires: usize,
    },
    /// Trailing bytes after the last constraint.
    #[error("constraint section has {0} trailing bytes")]
    TrailingBytes(usize),
    /// The wire-to-label section does not hold one label per wire.
    #[error("wire map has {len} bytes but the header declares {num_wires} wires")]
    WireMapLength {
        /// Declared wire count.
        num_wires: usize,
        /// Section length in bytes.
        len: usize,
    },
}

/// One sparse linear combination: `(wire, coefficient)` pairs.
pub type LinearCombination<F> = Vec<(usize, F)>;

/// A rank-1 constraint `<A, w> * <B, w> = <C, w>`.
pub type Constraint<F> = (
    LinearCombination<F>,
    LinearCombination<F>,
    LinearCombination<F>,
);

/// A constraint system as compiled by circom.
///
/// Wire 0 is the constant one, followed by public outputs, public inputs and private
/// inputs. Everything after that are intermediate signals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct R1CS<F: PrimeField> {
    /// Wires that are part of the statement, including the constant one.
    pub num_inputs: usize,
    /// Wires that stay private.
    pub num_aux: usize,
    /// `num_inputs + num_aux`.
    pub num_variables: usize,
    /// Number of public outputs.
    pub n_pub_out: usize,
    /// Number of public inputs.
    pub n_pub_in: usize,
    /// Number of private inputs.
    pub n_prv_in: usize,
    /// Number of labels (signals before optimisation).
    pub n_labels: u64,
    /// The constraints.
    pub constraints: Vec<Constraint<F>>,
    /// Label id of every wire.
    pub wire_mapping: Vec<u64>,
}

impl<F: PrimeField> R1CS<F> {
    /// Reads an `.r1cs` file.
    pub fn from_reader(mut reader: impl Read) -> Result<Self, R1CSParserError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    /// Parses an in-memory `.r1cs` file.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, R1CSParserError> {
        let file = BinFile::parse(bytes, "r1cs")?;
        if file.version() != R1CS_VERSION {
            return Err(BinFileError::UnsupportedVersion {
                kind: "r1cs",
                version: file.version(),
            }
            .into());
        }
        let mut header = file.section(HEADER_SECTION)?;
        let n8 = header.read_u32::<LittleEndian>()? as usize;
        if !is_modulus_of::<F>(&mut header, n8)? {
            return Err(R1CSParserError::WrongField);
        }
        let num_wires = header.read_u32::<LittleEndian>()? as usize;
        let n_pub_out = header.read_u32::<LittleEndian>()? as usize;
        let n_pub_in = header.read_u32::<LittleEndian>()? as usize;
        let n_prv_in = header.read_u32::<LittleEndian>()? as usize;
        let n_labels = header.read_u64::<LittleEndian>()?;
        let num_constraints = header.read_u32::<LittleEndian>()? as usize;

        let mut section = file.section(CONSTRAINT_SECTION)?;
        let mut constraints = Vec::with_capacity(num_constraints.min(1 << 20));
        for constraint in 0..num_constraints {
            let a = read_lc(&mut section, n8, constraint, num_wires)?;
            let b = read_lc(&mut section, n8, constraint, num_wires)?;
            let c = read_lc(&mut section, n8, constraint, num_wires)?;
            constraints.push((a, b, c));
        }
        if !section.is_empty() {
            return Err(R1CSParserError::TrailingBytes(section.len()));
        }

        let section = file.section(WIRE2LABEL_SECTION)?;
        if section.len() as u64 != num_wires as u64 * 8 {
            return Err(R1CSParserError::WireMapLength {
                num_wires,
                len: section.len(),
            });
        }
        let wire_mapping = section
            .chunks_exact(8)
            .map(|mut label| label.read_u64::<LittleEndian>())
            .collect::<Result<Vec<_>, _>>()?;

        let num_inputs = 1 + n_pub_out + n_pub_in;
        tracing::debug!(
            num_wires,
            num_constraints,
            num_inputs,
            "loaded r1cs"
        );
        Ok(Self {
            num_inputs,
            num_aux: num_wires.saturating_sub(num_inputs),
            num_variables: num_wires,
            n_pub_out,
            n_pub_in,
            n_prv_in,
            n_labels,
            constraints,
            wire_mapping,
        })
    }

    /// Writes the constraint system in the `.r1cs` format.
    pub fn to_writer<W: Write>(&self, writer: W) -> std::io::Result<()> {
        let modulus = F::MODULUS.to_bytes_le();
        let n8 = modulus.len();

        let mut header = Vec::new();
        header.write_u32::<LittleEndian>(n8 as u32)?;
        header.write_all(&modulus)?;
        header.write_u32::<LittleEndian>(self.num_variables as u32)?;
        header.write_u32::<LittleEndian>(self.n_pub_out as u32)?;
        header.write_u32::<LittleEndian>(self.n_pub_in as u32)?;
        header.write_u32::<LittleEndian>(self.n_prv_in as u32)?;
        header.write_u64::<LittleEndian>(self.n_labels)?;
        header.write_u32::<LittleEndian>(self.constraints.len() as u32)?;

        let mut body = Vec::new();
        for (a, b, c) in &self.constraints {
            for lc in [a, b, c] {
                body.write_u32::<LittleEndian>(lc.len() as u32)?;
                for (wire, coeff) in lc {
                    body.write_u32::<LittleEndian>(*wire as u32)?;
                    body.write_all(&coeff.into_bigint().to_bytes_le())?;
                }
            }
        }

        let mut labels = Vec::with_capacity(self.wire_mapping.len() * 8);
        for label in &self.wire_mapping {
            labels.write_u64::<LittleEndian>(*label)?;
        }

        write_bin_file(
            writer,
            "r1cs",
            R1CS_VERSION,
            &[
                (HEADER_SECTION, header),
                (CONSTRAINT_SECTION, body),
                (WIRE2LABEL_SECTION, labels),
            ],
        )
    }

    /// Converts the constraints into the row-major matrices used by the prover.
    pub fn to_matrices(&self) -> ConstraintMatrices<F> {
        let to_row = |lc: &LinearCombination<F>| -> Vec<(F, usize)> {
            lc.iter().map(|(wire, coeff)| (*coeff, *wire)).collect()
        };
        let a: Vec<_> = self.constraints.iter().map(|(a, _, _)| to_row(a)).collect();
        let b: Vec<_> = self.constraints.iter().map(|(_, b, _)| to_row(b)).collect();
        let c: Vec<_> = self.constraints.iter().map(|(_, _, c)| to_row(c)).collect();
        ConstraintMatrices {
            num_instance_variables: self.num_inputs,
            num_witness_variables: self.num_aux,
            num_constraints: self.constraints.len(),
            a_num_non_zero: a.iter().map(Vec::len).sum(),
            b_num_non_zero: b.iter().map(Vec::len).sum(),
            c_num_non_zero: c.iter().map(Vec::len).sum(),
            a,
            b,
            c,
        }
    }
}

fn read_lc<F: PrimeField>(
    reader: &mut &[u8],
    n8: usize,
    constraint: usize,
    num_wires: usize,
) -> Result<LinearCombination<F>, R1CSParserError> {
    let len = reader.read_u32::<LittleEndian>()? as usize;
    let mut lc = Vec::with_capacity(len.min(reader.len() / (4 + n8).max(1)));
    for _ in 0..len {
        let wire = reader.read_u32::<LittleEndian>()? as usize;
        if wire >= num_wires {
            return Err(R1CSParserError::WireOutOfRange {
                constraint,
                wire,
                num_wires,
            });
        }
        let coeff = prime_field_from_reader(&mut *reader, n8)?;
        lc.push((wire, coeff));
    }
    Ok(lc)
}
