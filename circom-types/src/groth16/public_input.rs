//! Public signals in the JSON layout written by snarkjs (`public.json`).

use ark_ff::PrimeField;
use serde::{Deserialize, Serialize};

/// The public signals of a statement, in wire order (outputs first, then public inputs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicInput<F: PrimeField>(
    /// The values.
    #[serde(serialize_with = "ark_serde_compat::serialize_f_seq")]
    #[serde(deserialize_with = "ark_serde_compat::deserialize_f_seq")]
    pub Vec<F>,
);

impl<F: PrimeField> PublicInput<F> {
    /// Consumes `self` and returns the inner values.
    pub fn into_inner(self) -> Vec<F> {
        self.0
    }
}

impl<F: PrimeField> AsRef<[F]> for PublicInput<F> {
    fn as_ref(&self) -> &[F] {
        &self.0
    }
}

impl<F: PrimeField> From<Vec<F>> for PublicInput<F> {
    fn from(values: Vec<F>) -> Self {
        Self(values)
    }
}
