//! Parser for Groth16 proving keys in the snarkjs `.zkey` format.
//!
//! Sections: 1 key type, 2 Groth16 header, 3 IC, 4 A/B coefficients, 5 A, 6 B in G1,
//! 7 B in G2, 8 C (the private wires), 9 H. Section 10 (contributions) is ignored.

use std::io::{Read, Write};

use ark_ec::pairing::Pairing;
use ark_ff::{BigInteger, PrimeField};
use ark_groth16::{ProvingKey, VerifyingKey};
use ark_relations::r1cs::{ConstraintMatrices, Matrix};
use ark_serialize::SerializationError;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

use crate::CheckElement;
use crate::binfile::{BinFile, BinFileError, write_bin_file};
use crate::reader_utils::is_modulus_of;
use crate::traits::CircomArkworksPairingBridge;

const GROTH16_KEY_TYPE: u32 = 1;

/// Error type describing errors during parsing zkey files
#[derive(Debug, Error)]
pub enum ZKeyParserError {
    /// Error during IO operations (reading/opening file, etc.)
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    /// Malformed container.
    #[error(transparent)]
    BinFile(#[from] BinFileError),
    /// Invalid point or scalar encoding.
    #[error(transparent)]
    SerializationError(#[from] SerializationError),
    /// The key was generated for another proof system.
    #[error("zkey is for protocol {0}, only groth16 (1) is supported")]
    UnsupportedProtocol(u32),
    /// The key uses other base or scalar fields.
    #[error("zkey is defined over a different curve than expected")]
    WrongCurve,
    /// The coefficient section is inconsistent with the header.
    #[error("corrupted coefficient section: {0}")]
    CorruptedCoefficients(String),
    /// The header is inconsistent.
    #[error("corrupted header: {0}")]
    CorruptedHeader(String),
}

/// A parsed snarkjs Groth16 proving key.
#[derive(Debug, Clone)]
pub struct ZKey<P: Pairing> {
    /// Total number of wires.
    pub n_vars: usize,
    /// Number of public signals, without the constant wire.
    pub n_public: usize,
    /// Size of the evaluation domain.
    pub domain_size: usize,
    /// Number of circuit constraints, without the input consistency rows.
    pub num_constraints: usize,
    /// The A matrix, row-major.
    pub a_matrix: Matrix<P::ScalarField>,
    /// The B matrix, row-major.
    pub b_matrix: Matrix<P::ScalarField>,
    /// The proving key.
    pub pk: ProvingKey<P>,
}

impl<P: Pairing + CircomArkworksPairingBridge> ZKey<P> {
    /// Reads a `.zkey` file.
    pub fn from_reader(mut reader: impl Read, check: CheckElement) -> Result<Self, ZKeyParserError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes, check)
    }

    /// Parses an in-memory `.zkey` file.
    #[tracing::instrument(level = "debug", skip_all, fields(len = bytes.len()))]
    pub fn from_bytes(bytes: &[u8], check: CheckElement) -> Result<Self, ZKeyParserError> {
        let file = BinFile::parse(bytes, "zkey")?;

        let key_type = file.section(1)?.read_u32::<LittleEndian>()?;
        if key_type != GROTH16_KEY_TYPE {
            return Err(ZKeyParserError::UnsupportedProtocol(key_type));
        }

        let mut header = file.section(2)?;
        let n8q = header.read_u32::<LittleEndian>()? as usize;
        if !is_modulus_of::<P::BaseField>(&mut header, n8q)? {
            return Err(ZKeyParserError::WrongCurve);
        }
        let n8r = header.read_u32::<LittleEndian>()? as usize;
        if !is_modulus_of::<P::ScalarField>(&mut header, n8r)? {
            return Err(ZKeyParserError::WrongCurve);
        }
        let n_vars = header.read_u32::<LittleEndian>()? as usize;
        let n_public = header.read_u32::<LittleEndian>()? as usize;
        let domain_size = header.read_u32::<LittleEndian>()? as usize;
        if !domain_size.is_power_of_two() {
            return Err(ZKeyParserError::CorruptedHeader(format!(
                "domain size {domain_size} is not a power of two"
            )));
        }
        if n_vars < n_public + 1 {
            return Err(ZKeyParserError::CorruptedHeader(format!(
                "{n_vars} wires cannot hold {n_public} public signals"
            )));
        }

        let g1_size = P::G1_SERIALIZED_BYTE_SIZE_UNCOMPRESSED;
        let g2_size = P::G2_SERIALIZED_BYTE_SIZE_UNCOMPRESSED;
        // the point sections hold one element per wire and per domain point
        for (id, count, what) in [(5, n_vars, "wires"), (9, domain_size, "domain points")] {
            let available = file.section(id)?.len() / g1_size;
            if available < count {
                return Err(ZKeyParserError::CorruptedHeader(format!(
                    "header declares {count} {what} but section {id} holds {available} points"
                )));
            }
        }
        let alpha_g1 = P::g1_from_bytes(split_off(&mut header, g1_size)?, check)?;
        let beta_g1 = P::g1_from_bytes(split_off(&mut header, g1_size)?, check)?;
        let beta_g2 = P::g2_from_bytes(split_off(&mut header, g2_size)?, check)?;
        let gamma_g2 = P::g2_from_bytes(split_off(&mut header, g2_size)?, check)?;
        let delta_g1 = P::g1_from_bytes(split_off(&mut header, g1_size)?, check)?;
        let delta_g2 = P::g2_from_bytes(split_off(&mut header, g2_size)?, check)?;

        let gamma_abc_g1 = P::g1_vec_from_bytes(file.section(3)?, n_public + 1, check)?;
        let (a_matrix, b_matrix, num_constraints) =
            read_coefficients::<P>(file.section(4)?, n8r, n_vars, n_public, domain_size)?;
        let a_query = P::g1_vec_from_bytes(file.section(5)?, n_vars, check)?;
        let b_g1_query = P::g1_vec_from_bytes(file.section(6)?, n_vars, check)?;
        let b_g2_query = P::g2_vec_from_bytes(file.section(7)?, n_vars, check)?;
        let l_query = P::g1_vec_from_bytes(file.section(8)?, n_vars - n_public - 1, check)?;
        let h_query = P::g1_vec_from_bytes(file.section(9)?, domain_size, check)?;

        tracing::debug!(n_vars, n_public, domain_size, num_constraints, "parsed zkey");
        Ok(Self {
            n_vars,
            n_public,
            domain_size,
            num_constraints,
            a_matrix,
            b_matrix,
            pk: ProvingKey {
                vk: VerifyingKey {
                    alpha_g1,
                    beta_g2,
                    gamma_g2,
                    delta_g2,
                    gamma_abc_g1,
                },
                beta_g1,
                delta_g1,
                a_query,
                b_g1_query,
                b_g2_query,
                h_query,
                l_query,
            },
        })
    }
}

impl<P: Pairing> ZKey<P> {
    /// Splits the key into constraint matrices and an arkworks proving key.
    ///
    /// The zkey only stores A and B, so the C matrix of the result is empty. That is
    /// enough for the circom QAP reduction, which derives C from A and B.
    pub fn into_ark(self) -> (ConstraintMatrices<P::ScalarField>, ProvingKey<P>) {
        let matrices = ConstraintMatrices {
            num_instance_variables: self.n_public + 1,
            num_witness_variables: self.n_vars - self.n_public - 1,
            num_constraints: self.num_constraints,
            a_num_non_zero: self.a_matrix.iter().map(Vec::len).sum(),
            b_num_non_zero: self.b_matrix.iter().map(Vec::len).sum(),
            c_num_non_zero: 0,
            a: self.a_matrix,
            b: self.b_matrix,
            c: vec![Vec::new(); self.num_constraints],
        };
        (matrices, self.pk)
    }
}

impl<P: Pairing + CircomArkworksPairingBridge> ZKey<P> {
    /// Wraps an arkworks proving key for the circom QAP reduction, whose `h_query` has
    /// one element per domain point.
    pub fn from_ark(matrices: &ConstraintMatrices<P::ScalarField>, pk: ProvingKey<P>) -> Self {
        Self {
            n_vars: matrices.num_instance_variables + matrices.num_witness_variables,
            n_public: matrices.num_instance_variables - 1,
            domain_size: pk.h_query.len(),
            num_constraints: matrices.num_constraints,
            a_matrix: matrices.a.clone(),
            b_matrix: matrices.b.clone(),
            pk,
        }
    }

    /// Writes the key in the snarkjs `.zkey` layout, without contribution history.
    pub fn to_writer<W: Write>(&self, writer: W) -> std::io::Result<()> {
        let mut header = Vec::new();
        for modulus in [
            P::BaseField::MODULUS.to_bytes_le(),
            P::ScalarField::MODULUS.to_bytes_le(),
        ] {
            header.write_u32::<LittleEndian>(modulus.len() as u32)?;
            header.extend(modulus);
        }
        for v in [self.n_vars, self.n_public, self.domain_size] {
            header.write_u32::<LittleEndian>(v as u32)?;
        }
        let pk = &self.pk;
        header.extend(P::g1_to_bytes(&pk.vk.alpha_g1));
        header.extend(P::g1_to_bytes(&pk.beta_g1));
        header.extend(P::g2_to_bytes(&pk.vk.beta_g2));
        header.extend(P::g2_to_bytes(&pk.vk.gamma_g2));
        header.extend(P::g1_to_bytes(&pk.delta_g1));
        header.extend(P::g2_to_bytes(&pk.vk.delta_g2));

        let one = P::ScalarField::from(1u64);
        let public_rows = (0..=self.n_public).map(|i| (0u32, self.num_constraints + i, i, &one));
        let entries = [(0u32, &self.a_matrix), (1u32, &self.b_matrix)]
            .into_iter()
            .flat_map(|(id, matrix)| {
                matrix.iter().enumerate().flat_map(move |(row, lc)| {
                    lc.iter().map(move |(coeff, wire)| (id, row, *wire, coeff))
                })
            })
            .chain(public_rows)
            .collect::<Vec<_>>();
        let mut coeffs = Vec::new();
        coeffs.write_u32::<LittleEndian>(entries.len() as u32)?;
        for (id, row, wire, coeff) in entries {
            coeffs.write_u32::<LittleEndian>(id)?;
            coeffs.write_u32::<LittleEndian>(row as u32)?;
            coeffs.write_u32::<LittleEndian>(wire as u32)?;
            coeffs.extend(P::fr_to_zkey_bytes(coeff));
        }

        let g1s = |points: &[P::G1Affine]| -> Vec<u8> {
            points.iter().flat_map(P::g1_to_bytes).collect()
        };
        write_bin_file(
            writer,
            "zkey",
            1,
            &[
                (1, GROTH16_KEY_TYPE.to_le_bytes().to_vec()),
                (2, header),
                (3, g1s(&pk.vk.gamma_abc_g1)),
                (4, coeffs),
                (5, g1s(&pk.a_query)),
                (6, g1s(&pk.b_g1_query)),
                (7, pk.b_g2_query.iter().flat_map(P::g2_to_bytes).collect()),
                (8, g1s(&pk.l_query)),
                (9, g1s(&pk.h_query)),
            ],
        )
    }
}

fn split_off<'a>(bytes: &mut &'a [u8], len: usize) -> Result<&'a [u8], SerializationError> {
    let current: &'a [u8] = *bytes;
    let (head, rest) = current
        .split_at_checked(len)
        .ok_or(SerializationError::NotEnoughSpace)?;
    *bytes = rest;
    Ok(head)
}

type Coefficients<F> = (Matrix<F>, Matrix<F>, usize);

fn read_coefficients<P: CircomArkworksPairingBridge>(
    mut section: &[u8],
    n8r: usize,
    n_vars: usize,
    n_public: usize,
    domain_size: usize,
) -> Result<Coefficients<P::ScalarField>, ZKeyParserError> {
    let num_coeffs = section.read_u32::<LittleEndian>()? as usize;
    // every entry takes 12 + n8r bytes, so the section bounds the allocation
    let mut entries = Vec::with_capacity(num_coeffs.min(section.len() / (12 + n8r)));
    for _ in 0..num_coeffs {
        let matrix = section.read_u32::<LittleEndian>()? as usize;
        let row = section.read_u32::<LittleEndian>()? as usize;
        let wire = section.read_u32::<LittleEndian>()? as usize;
        let value = P::fr_from_zkey_bytes(split_off(&mut section, n8r)?)?;

        if matrix > 1 {
            return Err(ZKeyParserError::CorruptedCoefficients(format!(
                "matrix id {matrix}"
            )));
        }
        if row >= domain_size || wire >= n_vars {
            return Err(ZKeyParserError::CorruptedCoefficients(format!(
                "entry ({row}, {wire}) outside of {domain_size}x{n_vars}"
            )));
        }
        entries.push((matrix, row, wire, value));
    }

    // The last n_public + 1 rows bind the public wires; they are re-added by the QAP
    // reduction and must not count as circuit constraints.
    let num_constraints = entries
        .iter()
        .map(|(_, row, _, _)| *row)
        .max()
        .and_then(|max| (max + 1).checked_sub(n_public + 1))
        .ok_or_else(|| {
            ZKeyParserError::CorruptedCoefficients("missing public input rows".to_owned())
        })?;
    let mut matrices: [Matrix<P::ScalarField>; 2] =
        [vec![Vec::new(); num_constraints], vec![Vec::new(); num_constraints]];
    for (matrix, row, wire, value) in entries {
        if row < num_constraints {
            matrices[matrix][row].push((value, wire));
        }
    }
    let [a, b] = matrices;
    Ok((a, b, num_constraints))
}
