//! A proving key together with its constraint matrices in arkworks' canonical encoding.
//!
//! Loading this is considerably faster than parsing a `.zkey`, because points can be read
//! compressed and without Montgomery conversion. Use it as a cache next to the original key.

use ark_ec::pairing::Pairing;
use ark_ff::{PrimeField, Zero};
use ark_groth16::ProvingKey;
use ark_relations::r1cs::{ConstraintMatrices, Matrix};
use ark_serialize::{
    CanonicalDeserialize, CanonicalSerialize, Compress, Read, SerializationError, Valid, Validate,
    Write,
};

use super::ZKey;

// Upper bound for pre-allocation while reading untrusted lengths.
const MAX_PREALLOC: usize = 1 << 16;

/// Constraint matrices and proving key of a circuit.
#[derive(Clone)]
pub struct ArkZkey<P: Pairing> {
    /// The constraint matrices.
    pub matrices: ConstraintMatrices<P::ScalarField>,
    /// The proving key.
    pub pk: ProvingKey<P>,
}

impl<P: Pairing> ArkZkey<P> {
    /// Borrows matrices and proving key.
    pub fn as_inner(&self) -> (&ConstraintMatrices<P::ScalarField>, &ProvingKey<P>) {
        (&self.matrices, &self.pk)
    }

    /// Consumes `self` and returns matrices and proving key.
    pub fn into_inner(self) -> (ConstraintMatrices<P::ScalarField>, ProvingKey<P>) {
        (self.matrices, self.pk)
    }
}

impl<P: Pairing> From<ZKey<P>> for ArkZkey<P> {
    fn from(zkey: ZKey<P>) -> Self {
        let (matrices, pk) = zkey.into_ark();
        Self { matrices, pk }
    }
}

fn serialize_matrix<F: PrimeField, W: Write>(
    matrix: &Matrix<F>,
    mut writer: W,
    compress: Compress,
) -> Result<(), SerializationError> {
    (matrix.len() as u64).serialize_with_mode(&mut writer, compress)?;
    for row in matrix {
        (row.len() as u64).serialize_with_mode(&mut writer, compress)?;
        for (coeff, wire) in row {
            coeff.serialize_with_mode(&mut writer, compress)?;
            (*wire as u64).serialize_with_mode(&mut writer, compress)?;
        }
    }
    Ok(())
}

fn matrix_size<F: PrimeField>(matrix: &Matrix<F>, compress: Compress) -> usize {
    let entry = F::zero().serialized_size(compress) + 8;
    8 + matrix.iter().map(|row| 8 + row.len() * entry).sum::<usize>()
}

fn read_len<R: Read>(
    mut reader: R,
    compress: Compress,
    validate: Validate,
) -> Result<usize, SerializationError> {
    let len = u64::deserialize_with_mode(&mut reader, compress, validate)?;
    usize::try_from(len).map_err(|_| SerializationError::InvalidData)
}

fn deserialize_matrix<F: PrimeField, R: Read>(
    mut reader: R,
    compress: Compress,
    validate: Validate,
) -> Result<Matrix<F>, SerializationError> {
    let rows = read_len(&mut reader, compress, validate)?;
    let mut matrix = Vec::with_capacity(rows.min(MAX_PREALLOC));
    for _ in 0..rows {
        let len = read_len(&mut reader, compress, validate)?;
        let mut row = Vec::with_capacity(len.min(MAX_PREALLOC));
        for _ in 0..len {
            let coeff = F::deserialize_with_mode(&mut reader, compress, validate)?;
            let wire = read_len(&mut reader, compress, validate)?;
            row.push((coeff, wire));
        }
        matrix.push(row);
    }
    Ok(matrix)
}

impl<P: Pairing> CanonicalSerialize for ArkZkey<P> {
    fn serialize_with_mode<W: Write>(
        &self,
        mut writer: W,
        compress: Compress,
    ) -> Result<(), SerializationError> {
        let m = &self.matrices;
        for v in [
            m.num_instance_variables,
            m.num_witness_variables,
            m.num_constraints,
        ] {
            (v as u64).serialize_with_mode(&mut writer, compress)?;
        }
        for matrix in [&m.a, &m.b, &m.c] {
            serialize_matrix(matrix, &mut writer, compress)?;
        }
        self.pk.serialize_with_mode(&mut writer, compress)
    }

    fn serialized_size(&self, compress: Compress) -> usize {
        let m = &self.matrices;
        3 * 8
            + [&m.a, &m.b, &m.c]
                .iter()
                .map(|matrix| matrix_size(matrix, compress))
                .sum::<usize>()
            + self.pk.serialized_size(compress)
    }
}

fn check_matrices<F: PrimeField>(m: &ConstraintMatrices<F>) -> Result<(), SerializationError> {
    let num_variables = m.num_instance_variables + m.num_witness_variables;
    let wires_in_range = [&m.a, &m.b, &m.c]
        .iter()
        .flat_map(|matrix| matrix.iter().flatten())
        .all(|(_, wire)| *wire < num_variables);
    let rows_consistent = m.a.len() == m.num_constraints && m.b.len() == m.num_constraints;
    if wires_in_range && rows_consistent {
        Ok(())
    } else {
        Err(SerializationError::InvalidData)
    }
}

impl<P: Pairing> Valid for ArkZkey<P> {
    fn check(&self) -> Result<(), SerializationError> {
        check_matrices(&self.matrices)?;
        self.pk.check()
    }
}

impl<P: Pairing> CanonicalDeserialize for ArkZkey<P> {
    fn deserialize_with_mode<R: Read>(
        mut reader: R,
        compress: Compress,
        validate: Validate,
    ) -> Result<Self, SerializationError> {
        let num_instance_variables = read_len(&mut reader, compress, validate)?;
        let num_witness_variables = read_len(&mut reader, compress, validate)?;
        let num_constraints = read_len(&mut reader, compress, validate)?;
        let a: Matrix<P::ScalarField> = deserialize_matrix(&mut reader, compress, validate)?;
        let b: Matrix<P::ScalarField> = deserialize_matrix(&mut reader, compress, validate)?;
        let c: Matrix<P::ScalarField> = deserialize_matrix(&mut reader, compress, validate)?;
        let pk = ProvingKey::<P>::deserialize_with_mode(&mut reader, compress, validate)?;
        let zkey = Self {
            matrices: ConstraintMatrices {
                num_instance_variables,
                num_witness_variables,
                num_constraints,
                a_num_non_zero: a.iter().map(Vec::len).sum(),
                b_num_non_zero: b.iter().map(Vec::len).sum(),
                c_num_non_zero: c.iter().map(Vec::len).sum(),
                a,
                b,
                c,
            },
            pk,
        };
        // points were already validated while reading the proving key
        check_matrices(&zkey.matrices)?;
        Ok(zkey)
    }
}
