//! Rank-1 constraint systems in the sparse matrix form of `ark-relations`.
//!
//! Row `i` of the matrices `A`, `B`, `C` is the constraint
//! `<A_i, w> * <B_i, w> = <C_i, w>`. Rows are lists of `(coefficient, wire)` pairs,
//! missing rows are empty linear combinations.

use ark_ff::Field;
use ark_relations::r1cs::ConstraintMatrices;
use rayon::prelude::*;
use tracing::instrument;

use crate::{Groth16Error, Result};

/// Number of wires including the constant one at index 0.
pub fn num_variables<F: Field>(matrices: &ConstraintMatrices<F>) -> usize {
    matrices.num_instance_variables + matrices.num_witness_variables
}

/// Row `index` of `matrix`, empty if the matrix has fewer rows.
pub(crate) fn row<F>(matrix: &[Vec<(F, usize)>], index: usize) -> &[(F, usize)] {
    matrix.get(index).map(Vec::as_slice).unwrap_or_default()
}

/// Evaluates `sum coeff * witness[wire]`.
///
/// All wires must index into `witness`, see [`check_indices`].
pub fn evaluate_lc<F: Field>(lc: &[(F, usize)], witness: &[F]) -> F {
    lc.iter()
        .map(|(coeff, wire)| *coeff * witness[*wire])
        .sum()
}

/// Checks that every wire the matrices reference exists in a witness of `witness_len`.
pub fn check_indices<F: Field>(matrices: &ConstraintMatrices<F>, witness_len: usize) -> Result<()> {
    let highest = [&matrices.a, &matrices.b, &matrices.c]
        .into_iter()
        .flat_map(|matrix| matrix.iter().flatten())
        .map(|(_, wire)| *wire)
        .max();
    match highest {
        Some(wire) if wire >= witness_len => Err(Groth16Error::WitnessSizeMismatch {
            expected: wire + 1,
            actual: witness_len,
        }),
        _ => Ok(()),
    }
}

/// Checks the witness length and that all wires are in range.
pub fn check_witness<F: Field>(matrices: &ConstraintMatrices<F>, witness: &[F]) -> Result<()> {
    let expected = num_variables(matrices);
    if witness.len() != expected {
        return Err(Groth16Error::WitnessSizeMismatch {
            expected,
            actual: witness.len(),
        });
    }
    check_indices(matrices, witness.len())
}

/// Checks every constraint against `witness`.
///
/// Fails with [`Groth16Error::ConstraintUnsatisfied`] naming the lowest violated row.
#[instrument(level = "debug", skip_all, fields(constraints = matrices.num_constraints))]
pub fn is_satisfied<F: Field>(matrices: &ConstraintMatrices<F>, witness: &[F]) -> Result<()> {
    check_witness(matrices, witness)?;
    let violated = (0..matrices.num_constraints)
        .into_par_iter()
        .find_first(|&i| {
            let a = evaluate_lc(row(&matrices.a, i), witness);
            let b = evaluate_lc(row(&matrices.b, i), witness);
            let c = evaluate_lc(row(&matrices.c, i), witness);
            a * b != c
        });
    match violated {
        Some(index) => Err(Groth16Error::ConstraintUnsatisfied { index }),
        None => Ok(()),
    }
}
