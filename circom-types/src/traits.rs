//! Conversions between the raw point and scalar encodings inside circom binary files and
//! their arkworks representation.
//!
//! Circom writes coordinates in Montgomery form, little-endian, uncompressed. The point at
//! infinity is encoded as all-zero coordinates.

use ark_bn254::{Bn254, Fq, Fq2, Fr};
use ark_ec::{AffineRepr, pairing::Pairing};
use ark_ff::{BigInteger, PrimeField, Zero};
use ark_serialize::{CanonicalDeserialize, SerializationError};

use crate::CheckElement;

type SerResult<T> = Result<T, SerializationError>;

/// Bridge between circom's binary encodings and a [`Pairing`].
pub trait CircomArkworksPairingBridge: Pairing {
    /// Size of an uncompressed G1 element in bytes.
    const G1_SERIALIZED_BYTE_SIZE_UNCOMPRESSED: usize;
    /// Size of an uncompressed G2 element in bytes.
    const G2_SERIALIZED_BYTE_SIZE_UNCOMPRESSED: usize;
    /// Size of a scalar field element in bytes.
    const SCALAR_FIELD_BYTE_SIZE: usize;
    /// Size of a base field element in bytes.
    const BASE_FIELD_BYTE_SIZE: usize;

    /// Name of the curve as written by snarkjs.
    fn get_circom_name() -> String;

    /// Decodes a G1 element whose coordinates are already in Montgomery form.
    fn g1_from_bytes(bytes: &[u8], check: CheckElement) -> SerResult<Self::G1Affine>;

    /// Decodes a G2 element whose coordinates are already in Montgomery form.
    fn g2_from_bytes(bytes: &[u8], check: CheckElement) -> SerResult<Self::G2Affine>;

    /// Encodes a G1 element the way circom does.
    fn g1_to_bytes(p: &Self::G1Affine) -> Vec<u8>;

    /// Encodes a G2 element the way circom does.
    fn g2_to_bytes(p: &Self::G2Affine) -> Vec<u8>;

    /// Decodes a scalar from a zkey coefficient section. These carry an additional
    /// Montgomery factor, so two reductions are needed.
    fn fr_from_zkey_bytes(bytes: &[u8]) -> SerResult<Self::ScalarField>;

    /// Inverse of [`Self::fr_from_zkey_bytes`].
    fn fr_to_zkey_bytes(f: &Self::ScalarField) -> Vec<u8>;

    /// Decodes `num` consecutive G1 elements.
    fn g1_vec_from_bytes(
        bytes: &[u8],
        num: usize,
        check: CheckElement,
    ) -> SerResult<Vec<Self::G1Affine>> {
        let size = Self::G1_SERIALIZED_BYTE_SIZE_UNCOMPRESSED;
        let bytes = bytes
            .get(..size * num)
            .ok_or(SerializationError::NotEnoughSpace)?;

        #[cfg(feature = "parallel")]
        use rayon::prelude::*;

        #[cfg(feature = "parallel")]
        let chunks = bytes.par_chunks_exact(size);
        #[cfg(not(feature = "parallel"))]
        let chunks = bytes.chunks_exact(size);

        chunks
            .map(|chunk| Self::g1_from_bytes(chunk, check))
            .collect::<SerResult<Vec<_>>>()
    }

    /// Decodes `num` consecutive G2 elements.
    fn g2_vec_from_bytes(
        bytes: &[u8],
        num: usize,
        check: CheckElement,
    ) -> SerResult<Vec<Self::G2Affine>> {
        let size = Self::G2_SERIALIZED_BYTE_SIZE_UNCOMPRESSED;
        let bytes = bytes
            .get(..size * num)
            .ok_or(SerializationError::NotEnoughSpace)?;

        #[cfg(feature = "parallel")]
        use rayon::prelude::*;

        #[cfg(feature = "parallel")]
        let chunks = bytes.par_chunks_exact(size);
        #[cfg(not(feature = "parallel"))]
        let chunks = bytes.chunks_exact(size);

        chunks
            .map(|chunk| Self::g2_from_bytes(chunk, check))
            .collect::<SerResult<Vec<_>>>()
    }
}

fn fq_from_montgomery(bytes: &[u8]) -> SerResult<Fq> {
    let bigint = <Fq as PrimeField>::BigInt::deserialize_uncompressed(bytes)?;
    if bigint >= Fq::MODULUS {
        return Err(SerializationError::InvalidData);
    }
    Ok(Fq::new_unchecked(bigint))
}

fn fr_from_montgomery(bytes: &[u8]) -> SerResult<Fr> {
    let bigint = <Fr as PrimeField>::BigInt::deserialize_uncompressed(bytes)?;
    if bigint >= Fr::MODULUS {
        return Err(SerializationError::InvalidData);
    }
    Ok(Fr::new_unchecked(bigint))
}

impl CircomArkworksPairingBridge for Bn254 {
    const G1_SERIALIZED_BYTE_SIZE_UNCOMPRESSED: usize = 64;
    const G2_SERIALIZED_BYTE_SIZE_UNCOMPRESSED: usize = 128;
    const SCALAR_FIELD_BYTE_SIZE: usize = 32;
    const BASE_FIELD_BYTE_SIZE: usize = 32;

    fn get_circom_name() -> String {
        "bn128".to_owned()
    }

    fn g1_from_bytes(bytes: &[u8], check: CheckElement) -> SerResult<Self::G1Affine> {
        if bytes.len() != Self::G1_SERIALIZED_BYTE_SIZE_UNCOMPRESSED {
            return Err(SerializationError::InvalidData);
        }
        let x = fq_from_montgomery(&bytes[..32])?;
        let y = fq_from_montgomery(&bytes[32..])?;
        if x.is_zero() && y.is_zero() {
            return Ok(Self::G1Affine::zero());
        }
        let p = Self::G1Affine::new_unchecked(x, y);
        if matches!(check, CheckElement::Yes)
            && (!p.is_on_curve() || !p.is_in_correct_subgroup_assuming_on_curve())
        {
            return Err(SerializationError::InvalidData);
        }
        Ok(p)
    }

    fn g2_from_bytes(bytes: &[u8], check: CheckElement) -> SerResult<Self::G2Affine> {
        if bytes.len() != Self::G2_SERIALIZED_BYTE_SIZE_UNCOMPRESSED {
            return Err(SerializationError::InvalidData);
        }
        let x = Fq2::new(
            fq_from_montgomery(&bytes[..32])?,
            fq_from_montgomery(&bytes[32..64])?,
        );
        let y = Fq2::new(
            fq_from_montgomery(&bytes[64..96])?,
            fq_from_montgomery(&bytes[96..])?,
        );
        if x.is_zero() && y.is_zero() {
            return Ok(Self::G2Affine::zero());
        }
        let p = Self::G2Affine::new_unchecked(x, y);
        if matches!(check, CheckElement::Yes)
            && (!p.is_on_curve() || !p.is_in_correct_subgroup_assuming_on_curve())
        {
            return Err(SerializationError::InvalidData);
        }
        Ok(p)
    }

    fn g1_to_bytes(p: &Self::G1Affine) -> Vec<u8> {
        let (x, y) = p.xy().unwrap_or_default();
        [x.0.to_bytes_le(), y.0.to_bytes_le()].concat()
    }

    fn g2_to_bytes(p: &Self::G2Affine) -> Vec<u8> {
        let (x, y) = p.xy().unwrap_or_default();
        [x.c0, x.c1, y.c0, y.c1]
            .iter()
            .flat_map(|c| c.0.to_bytes_le())
            .collect()
    }

    fn fr_from_zkey_bytes(bytes: &[u8]) -> SerResult<Self::ScalarField> {
        if bytes.len() != Self::SCALAR_FIELD_BYTE_SIZE {
            return Err(SerializationError::InvalidData);
        }
        Ok(Fr::new_unchecked(fr_from_montgomery(bytes)?.into_bigint()))
    }

    fn fr_to_zkey_bytes(f: &Self::ScalarField) -> Vec<u8> {
        // f.0 = f*R < p; lifting it to a field element and taking its Montgomery form
        // yields f*R^2.
        Fr::from_le_bytes_mod_order(&f.0.to_bytes_le())
            .0
            .to_bytes_le()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bn254::{G1Affine, G2Affine};
    use ark_ec::CurveGroup;
    use ark_ff::{Field, UniformRand};

    use crate::test_utils::{to_g1_bn254, to_g2_bn254};

    #[test]
    fn generators_round_trip_through_montgomery_bytes() {
        let g1 = to_g1_bn254!("1", "2");
        let g2 = to_g2_bn254!(
            {
                "10857046999023057135944570762232829481370756359578518086990519993285655852781",
                "11559732032986387107991004021392285783925812861821192530917403151452391805634"
            },
            {
                "8495653923123431417604973247489272438418190587263600148770280649306958101930",
                "4082367875863433681332203403145435568316851327593401208105741076214120093531"
            }
        );
        assert_eq!(g1, G1Affine::generator());
        assert_eq!(g2, G2Affine::generator());

        let bytes = Bn254::g1_to_bytes(&g1);
        assert_eq!(bytes.len(), 64);
        assert_eq!(Bn254::g1_from_bytes(&bytes, CheckElement::Yes).unwrap(), g1);
        let bytes = Bn254::g2_to_bytes(&g2);
        assert_eq!(bytes.len(), 128);
        assert_eq!(Bn254::g2_from_bytes(&bytes, CheckElement::Yes).unwrap(), g2);
    }

    #[test]
    fn zero_bytes_are_the_identity() {
        assert!(
            Bn254::g1_from_bytes(&[0; 64], CheckElement::Yes)
                .unwrap()
                .is_zero()
        );
        assert!(
            Bn254::g2_from_bytes(&[0; 128], CheckElement::Yes)
                .unwrap()
                .is_zero()
        );
        assert_eq!(Bn254::g1_to_bytes(&G1Affine::zero()), vec![0; 64]);
    }

    #[test]
    fn off_curve_is_rejected_only_when_checking() {
        let mut bytes = Bn254::g1_to_bytes(&G1Affine::generator());
        bytes[32] ^= 1;
        assert!(Bn254::g1_from_bytes(&bytes, CheckElement::Yes).is_err());
        assert!(Bn254::g1_from_bytes(&bytes, CheckElement::No).is_ok());
    }

    #[test]
    fn zkey_scalars_carry_double_montgomery_factor() {
        let mut rng = ark_std::test_rng();
        for _ in 0..16 {
            let f = Fr::rand(&mut rng);
            let bytes = Bn254::fr_to_zkey_bytes(&f);
            assert_eq!(Bn254::fr_from_zkey_bytes(&bytes).unwrap(), f);
        }
        // 1 is stored as R^2 mod r
        let r = Fr::from(2u64).pow([256u64]);
        let r_squared = r * r;
        assert_eq!(
            Bn254::fr_to_zkey_bytes(&Fr::from(1u64)),
            r_squared.into_bigint().to_bytes_le()
        );
    }

    #[test]
    fn vec_decoding_checks_length() {
        let p = (G1Affine::generator() * Fr::from(5u64)).into_affine();
        let bytes = [Bn254::g1_to_bytes(&p), Bn254::g1_to_bytes(&p)].concat();
        let points = Bn254::g1_vec_from_bytes(&bytes, 2, CheckElement::Yes).unwrap();
        assert_eq!(points, vec![p, p]);
        assert!(Bn254::g1_vec_from_bytes(&bytes, 3, CheckElement::Yes).is_err());
    }
}
