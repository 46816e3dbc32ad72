//! # ark-serde-compat
//!
//! Serde helpers that encode BN254 arkworks types the way snarkjs writes them to JSON:
//! field elements become decimal strings and curve points become arrays of coordinate
//! strings in projective form.
//!
//! ```ignore
//! use serde::{Deserialize, Serialize};
//! use ark_bn254::{Fr, G1Affine};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Commitment {
//!     #[serde(serialize_with = "g16_serde_compat::serialize_f")]
//!     #[serde(deserialize_with = "g16_serde_compat::deserialize_f")]
//!     blinding: Fr,
//!     #[serde(serialize_with = "g16_serde_compat::bn254::serialize_g1")]
//!     #[serde(deserialize_with = "g16_serde_compat::bn254::deserialize_g1")]
//!     point: G1Affine,
//! }
//! ```

#![deny(missing_docs)]
use std::marker::PhantomData;

use ark_ff::PrimeField;
use serde::{Serializer, de, ser::SerializeSeq as _};

pub mod bn254;

/// Marker error for failed string to element conversions. Callers map it into
/// their own serde error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SerdeCompatError;

/// Whether deserialized points must be checked for curve and subgroup membership.
///
/// `No` is orders of magnitude faster for large proving keys but must only be
/// used for trusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckElement {
    /// Perform curve and subgroup checks.
    Yes,
    /// Skip all checks.
    No,
}

impl CheckElement {
    pub(crate) fn enabled(self) -> bool {
        matches!(self, CheckElement::Yes)
    }
}

/// Serializes a prime field element as a decimal string.
pub fn serialize_f<S: Serializer>(p: &impl PrimeField, ser: S) -> Result<S::Ok, S::Error> {
    ser.serialize_str(&p.to_string())
}

/// Serializes a slice of prime field elements as an array of decimal strings.
pub fn serialize_f_seq<S: Serializer, F: PrimeField>(ps: &[F], ser: S) -> Result<S::Ok, S::Error> {
    let mut seq = ser.serialize_seq(Some(ps.len()))?;
    for p in ps {
        seq.serialize_element(&p.to_string())?;
    }
    seq.end()
}

/// Deserializes a prime field element from a canonical decimal string.
///
/// Values that are not smaller than the modulus are rejected.
pub fn deserialize_f<'de, F, D>(deserializer: D) -> Result<F, D::Error>
where
    D: de::Deserializer<'de>,
    F: PrimeField,
{
    deserializer.deserialize_str(PrimeFieldVisitor::<F>(PhantomData))
}

/// Deserializes an array of canonical decimal strings into field elements.
pub fn deserialize_f_seq<'de, D, F>(deserializer: D) -> Result<Vec<F>, D::Error>
where
    D: de::Deserializer<'de>,
    F: PrimeField,
{
    deserializer.deserialize_seq(PrimeFieldSeqVisitor::<F>(PhantomData))
}

/// Parses a canonical decimal string into a prime field element.
pub(crate) fn f_from_str<F: PrimeField>(s: &str) -> Result<F, SerdeCompatError> {
    // leading '+' or whitespace is accepted by the arkworks parser but not by snarkjs
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SerdeCompatError);
    }
    F::from_str(s).map_err(|_| SerdeCompatError)
}

struct PrimeFieldVisitor<F>(PhantomData<F>);

struct PrimeFieldSeqVisitor<F>(PhantomData<F>);

impl<'de, F: PrimeField> de::Visitor<'de> for PrimeFieldVisitor<F> {
    type Value = F;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            formatter,
            "a decimal string representing an element of F_{}",
            F::MODULUS
        )
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        f_from_str(v).map_err(|_| E::custom(format!("invalid field element: {v}")))
    }
}

impl<'de, F: PrimeField> de::Visitor<'de> for PrimeFieldSeqVisitor<F> {
    type Value = Vec<F>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            formatter,
            "a sequence of decimal strings representing elements of F_{}",
            F::MODULUS
        )
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: de::SeqAccess<'de>,
    {
        let mut values = Vec::with_capacity(seq.size_hint().unwrap_or_default());
        while let Some(s) = seq.next_element::<String>()? {
            values.push(
                f_from_str(&s)
                    .map_err(|_| de::Error::custom(format!("invalid field element: {s}")))?,
            );
        }
        Ok(values)
    }
}
