//! Checked conversions and the few operations on prime fields that arkworks does not
//! expose in the shape the engine needs.
//!
//! Addition, subtraction and multiplication are the Montgomery arithmetic of `ark-ff`
//! and always stay reduced into `[0, p)`. The functions here add the fallible edges:
//! inversion of zero, decoding of untrusted encodings and exponentiation with a fixed
//! operation sequence.

use ark_bn254::{Fq, Fr};
use ark_ff::{BigInteger, Field, PrimeField};
use num_bigint::BigUint;

use crate::{Groth16Error, Result};

/// Inverts `x`, failing with [`Groth16Error::DivisionByZero`] for zero.
pub fn inverse<F: Field>(x: &F) -> Result<F> {
    x.inverse().ok_or(Groth16Error::DivisionByZero)
}

/// Computes `a / b`, failing with [`Groth16Error::DivisionByZero`] if `b` is zero.
pub fn div<F: Field>(a: &F, b: &F) -> Result<F> {
    Ok(*a * inverse(b)?)
}

/// Binary square-and-multiply. Only for public exponents, the running time depends on
/// the bits of `exp`.
pub fn pow_vartime<F: Field>(base: &F, exp: &[u64]) -> F {
    base.pow(exp)
}

/// Square-and-multiply with one squaring and one multiplication per exponent bit.
///
/// The multiplied value is selected arithmetically, so the sequence of field operations
/// does not depend on the exponent. `exp` is little-endian in its limbs.
pub fn pow_ct<F: Field>(base: &F, exp: &[u64]) -> F {
    let mut acc = F::one();
    for limb in exp.iter().rev() {
        for i in (0..64).rev() {
            acc.square_in_place();
            let bit = F::from((limb >> i) & 1);
            let candidate = acc * base;
            acc += (candidate - acc) * bit;
        }
    }
    acc
}

/// Returns the number of bytes of the canonical little-endian encoding of `F`.
pub fn byte_size<F: PrimeField>() -> usize {
    F::MODULUS_BIT_SIZE.div_ceil(8) as usize
}

fn parse_digits(s: &str) -> Result<BigUint> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Groth16Error::InvalidFieldElement(format!(
            "not a decimal number: {s:?}"
        )));
    }
    s.parse::<BigUint>()
        .map_err(|err| Groth16Error::InvalidFieldElement(err.to_string()))
}

fn from_biguint_strict<F: PrimeField>(value: BigUint) -> Result<F> {
    let modulus: BigUint = F::MODULUS.into();
    if value >= modulus {
        return Err(Groth16Error::InvalidFieldElement(format!(
            "{value} is not smaller than the modulus"
        )));
    }
    Ok(F::from(value))
}

/// Parses a canonical decimal string, rejecting values not smaller than the modulus.
pub fn from_decimal_strict<F: PrimeField>(s: &str) -> Result<F> {
    from_biguint_strict(parse_digits(s)?)
}

/// Parses a decimal big integer with an optional leading `-` and reduces it modulo `p`.
pub fn from_decimal_reduced<F: PrimeField>(s: &str) -> Result<F> {
    match s.strip_prefix('-') {
        Some(digits) => Ok(-F::from(parse_digits(digits)?)),
        None => Ok(F::from(parse_digits(s)?)),
    }
}

/// Decodes the canonical little-endian encoding of a field element.
pub fn from_le_bytes_strict<F: PrimeField>(bytes: &[u8]) -> Result<F> {
    let expected = byte_size::<F>();
    if bytes.len() != expected {
        return Err(Groth16Error::InvalidFieldElement(format!(
            "expected {expected} bytes, got {}",
            bytes.len()
        )));
    }
    from_biguint_strict(BigUint::from_bytes_le(bytes))
}

/// The canonical little-endian encoding of `f`.
pub fn to_le_bytes<F: PrimeField>(f: &F) -> Vec<u8> {
    f.into_bigint().to_bytes_le()
}

/// The canonical value of `f` as a big integer.
pub fn to_biguint<F: PrimeField>(f: &F) -> BigUint {
    f.into_bigint().into()
}

/// [`from_decimal_strict`] for the BN254 scalar field.
pub fn fr_from_decimal_strict(s: &str) -> Result<Fr> {
    from_decimal_strict(s)
}

/// [`from_decimal_reduced`] for the BN254 scalar field.
pub fn fr_from_decimal_reduced(s: &str) -> Result<Fr> {
    from_decimal_reduced(s)
}

/// [`from_le_bytes_strict`] for the BN254 scalar field.
pub fn fr_from_le_bytes_strict(bytes: &[u8]) -> Result<Fr> {
    from_le_bytes_strict(bytes)
}

/// 32 byte little-endian canonical encoding.
pub fn fr_to_le_bytes(f: &Fr) -> Vec<u8> {
    to_le_bytes(f)
}

/// [`from_le_bytes_strict`] for the BN254 base field.
pub fn fq_from_le_bytes_strict(bytes: &[u8]) -> Result<Fq> {
    from_le_bytes_strict(bytes)
}

/// 32 byte little-endian canonical encoding.
pub fn fq_to_le_bytes(f: &Fq) -> Vec<u8> {
    to_le_bytes(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use ark_ff::{One, UniformRand, Zero};
    use proptest::prelude::*;

    const FR_MODULUS: &str =
        "21888242871839275222246405745257275088548364400416034343698204186575808495617";

    #[test]
    fn decimal_strict_bounds() {
        assert_eq!(fr_from_decimal_strict("0").unwrap(), Fr::zero());
        let max = fr_from_decimal_strict(
            "21888242871839275222246405745257275088548364400416034343698204186575808495616",
        )
        .unwrap();
        assert_eq!(max, -Fr::one());
        let err = fr_from_decimal_strict(FR_MODULUS).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFieldElement);
        for bad in ["", "-1", "0x10", "1 2", "1_000"] {
            assert!(fr_from_decimal_strict(bad).is_err(), "{bad:?} accepted");
        }
    }

    #[test]
    fn decimal_reduced_wraps_and_negates() {
        assert_eq!(fr_from_decimal_reduced(FR_MODULUS).unwrap(), Fr::zero());
        assert_eq!(fr_from_decimal_reduced("-1").unwrap(), -Fr::one());
        assert_eq!(fr_from_decimal_reduced("-0").unwrap(), Fr::zero());
        assert!(fr_from_decimal_reduced("abc").is_err());
        assert!(fr_from_decimal_reduced("--1").is_err());
    }

    #[test]
    fn le_bytes_strict() {
        let mut rng = ark_std::test_rng();
        let f = Fr::rand(&mut rng);
        let bytes = fr_to_le_bytes(&f);
        assert_eq!(bytes.len(), 32);
        assert_eq!(fr_from_le_bytes_strict(&bytes).unwrap(), f);
        assert!(fr_from_le_bytes_strict(&bytes[..31]).is_err());
        assert!(fr_from_le_bytes_strict(&[0xff; 32]).is_err());
        let q = Fq::rand(&mut rng);
        assert_eq!(fq_from_le_bytes_strict(&fq_to_le_bytes(&q)).unwrap(), q);
    }

    #[test]
    fn inverse_of_zero() {
        assert_eq!(inverse(&Fr::zero()), Err(Groth16Error::DivisionByZero));
        assert_eq!(
            div(&Fr::one(), &Fr::zero()).unwrap_err().kind(),
            ErrorKind::DivisionByZero
        );
        let two = Fr::from(2u64);
        assert_eq!(div(&Fr::one(), &two).unwrap() * two, Fr::one());
    }

    proptest! {
        #[test]
        fn pow_ct_matches_pow(base in any::<u64>(), e0 in any::<u64>(), e1 in any::<u64>()) {
            let base = Fr::from(base);
            let exp = [e0, e1];
            prop_assert_eq!(pow_ct(&base, &exp), pow_vartime(&base, &exp));
        }

        #[test]
        fn field_laws(a in any::<u128>(), b in any::<u128>(), c in any::<u128>()) {
            let (a, b, c) = (Fr::from(a), Fr::from(b), Fr::from(c));
            prop_assert_eq!(a * (b + c), a * b + a * c);
            prop_assert_eq!((a - b) + b, a);
            if !b.is_zero() {
                prop_assert_eq!(div(&a, &b).unwrap() * b, a);
            }
        }
    }
}
